//! 浏览器端测试，使用 `wasm-pack test --headless --chrome` 运行。
#![cfg(target_arch = "wasm32")]

use serde_json::Value;
use tictactoe_wasm::{
    choose_move, compute_ai_move, evaluate_status, validate_board, GameEngine,
};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn js_board(cells: [&str; 9]) -> JsValue {
    serde_wasm_bindgen::to_value(&cells).expect("board converts")
}

fn parse(json: &str) -> Value {
    serde_json::from_str(json).expect("engine returns JSON")
}

#[wasm_bindgen_test]
fn free_status_reports_winner() {
    let board = js_board(["X", "X", "X", "O", "O", "", "", "", ""]);
    let status: Value =
        serde_wasm_bindgen::from_value(evaluate_status(board).expect("status")).expect("json");
    assert_eq!(status["type"], "Win");
    assert_eq!(status["winner"], "X");
}

#[wasm_bindgen_test]
fn free_choose_move_prefers_own_win() {
    let board = js_board(["X", "X", "", "O", "O", "", "", "", ""]);
    let index = choose_move(board, "medium", "O", None).expect("valid arguments");
    assert_eq!(index, Some(5));
}

#[wasm_bindgen_test]
fn compute_ai_move_honours_strategy_override() {
    let cells = ["X", "", "", "", "", "", "", "", ""];
    let medium: Value = serde_wasm_bindgen::from_value(
        compute_ai_move(js_board(cells), "medium", "O", None, None).expect("decision"),
    )
    .expect("json");
    assert_eq!(medium["index"], 1);
    assert_eq!(medium["strategy"], "greedy");

    let searched: Value = serde_wasm_bindgen::from_value(
        compute_ai_move(js_board(cells), "medium", "O", None, Some("minimax".into()))
            .expect("decision"),
    )
    .expect("json");
    assert_eq!(searched["index"], 4);
    assert_eq!(searched["strategy"], "minimax");

    assert!(compute_ai_move(js_board(cells), "medium", "O", None, Some("oracle".into())).is_err());
}

#[wasm_bindgen_test]
async fn think_ai_uses_requested_strategy() {
    let mut engine = GameEngine::new(None).expect("default engine");
    engine.apply_move(0, None).expect("human move");

    let result = JsFuture::from(engine.think_ai(Some("perfect".into()), None))
        .await
        .expect("decision resolves");
    let decision = parse(&result.as_string().expect("json string"));
    assert_eq!(decision["index"], 4);
    assert_eq!(decision["strategy"], "minimax");
}

#[wasm_bindgen_test]
fn free_choose_move_rejects_unknown_difficulty() {
    let board = js_board(["", "", "", "", "", "", "", "", ""]);
    assert!(choose_move(board, "nightmare", "O", None).is_err());
}

#[wasm_bindgen_test]
fn validate_board_flags_unbalanced_marks() {
    assert!(validate_board(js_board(["X", "X", "", "", "", "", "", "", ""])).is_err());
    assert!(validate_board(js_board(["X", "O", "", "", "", "", "", "", ""])).is_ok());
}

#[wasm_bindgen_test]
fn engine_rejects_occupied_cell_silently() {
    let mut engine =
        GameEngine::new(Some(r#"{"mode":"human_vs_human"}"#.into())).expect("engine builds");
    engine.apply_move(0, None).expect("first move");
    let second = parse(&engine.apply_move(0, None).expect("call succeeds"));
    assert_eq!(second["rejected"]["type"], "CellOccupied");
    assert_eq!(second["state"]["active"], "O");
}

#[wasm_bindgen_test]
async fn scheduled_ai_move_plays_after_delay() {
    let mut engine = GameEngine::new(Some(r#"{"difficulty":"hard","ai_delay_ms":10}"#.into()))
        .expect("engine builds");
    engine.apply_move(4, None).expect("human move");
    assert!(engine.needs_ai_move());

    let result = JsFuture::from(engine.schedule_ai_move(None))
        .await
        .expect("promise resolves");
    let resolution = parse(&result.as_string().expect("json string"));
    assert_eq!(resolution["state"]["board"][0], "O");
    assert!(!engine.needs_ai_move());
}

#[wasm_bindgen_test]
async fn scheduled_reset_keeps_score() {
    let mut engine = GameEngine::new(Some(
        r#"{"mode":"human_vs_human","reset_delay_ms":5}"#.into(),
    ))
    .expect("engine builds");
    for index in [0, 3, 1, 4, 2] {
        engine.apply_move(index, None).expect("scripted move");
    }
    assert_eq!(engine.scoreboard_text(), "X: 1 | O: 0 | Draws: 0");

    let result = JsFuture::from(engine.schedule_reset(None))
        .await
        .expect("promise resolves");
    let snapshot = parse(&result.as_string().expect("json string"));
    assert_eq!(snapshot["status"]["type"], "InProgress");
    assert_eq!(snapshot["scoreboard"]["x_wins"], 1);
    assert_eq!(snapshot["settings_locked"], false);
}
