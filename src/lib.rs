pub mod ai;
pub mod game;
pub mod utils;

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use gloo_timers::future::TimeoutFuture;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{AiAgent, AiConfig, AiDecision, AiDifficulty, AiStrategy};
pub use game::{
    Board, Cell, GameError, GameEvent, GameMode, GameSession, GameState, GameStatus,
    IntegrityError, MoveResolution, ParseBoardError, RuleEngine, Scoreboard, SessionConfig,
    SessionSnapshot, Symbol, BOARD_CELLS, WIN_LINES,
};

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
}

fn to_js_error(error: GameError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn parse_symbol(value: &str) -> Result<Symbol, JsValue> {
    Symbol::from_str(value).map_err(|_| {
        to_js_error(GameError::InvalidSymbol {
            value: value.to_string(),
        })
    })
}

fn parse_difficulty(value: &str) -> Result<AiDifficulty, JsValue> {
    AiDifficulty::from_str(value).map_err(|_| {
        to_js_error(GameError::InvalidDifficulty {
            value: value.to_string(),
        })
    })
}

/// 未指定策略时沿用难度对应的默认策略。
fn strategy_config(difficulty: AiDifficulty, strategy: Option<&str>) -> Result<AiConfig, JsValue> {
    let config = AiConfig::from_difficulty(difficulty);
    match strategy {
        Some(value) => {
            let strategy = AiStrategy::from_str(value).map_err(|_| {
                to_js_error(GameError::InvalidStrategy {
                    value: value.to_string(),
                })
            })?;
            Ok(config.with_strategy(strategy))
        }
        None => Ok(config),
    }
}

fn parse_mode(value: &str) -> Result<GameMode, JsValue> {
    GameMode::from_str(value).map_err(|_| {
        to_js_error(GameError::InvalidMode {
            value: value.to_string(),
        })
    })
}

/// 未指定玩家标记时取 AI 的对手方。
fn parse_sides(ai_symbol: &str, human_symbol: Option<String>) -> Result<(Symbol, Symbol), JsValue> {
    let ai = parse_symbol(ai_symbol)?;
    let human = match human_symbol.as_deref() {
        Some(value) => parse_symbol(value)?,
        None => ai.other(),
    };
    Ok((ai, human))
}

/// 暴露给前端的 [`GameSession`] 句柄，结果以 JSON 返回。
#[wasm_bindgen]
pub struct GameEngine {
    session: Rc<RefCell<GameSession>>,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<GameEngine, JsValue> {
        let config = if let Some(json) = config_json {
            serde_json::from_str(&json).map_err(serde_to_js_error)?
        } else {
            SessionConfig::default()
        };
        Ok(GameEngine {
            session: Rc::new(RefCell::new(GameSession::new(config))),
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.borrow().state()).map_err(serde_to_js_error)
    }

    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.borrow().snapshot()).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        self.session
            .borrow_mut()
            .restore_state(state)
            .map_err(to_js_error)
    }

    /// 以 `""`、`"X"`、`"O"` 组成的数组返回棋盘。
    pub fn board(&self) -> Result<JsValue, JsValue> {
        to_value(&self.session.borrow().state().board).map_err(JsValue::from)
    }

    pub fn is_cell_empty(&self, index: usize) -> bool {
        self.session.borrow().state().board.is_cell_empty(index)
    }

    /// 在 `index` 处落下 `symbol`（默认当前行动方）。
    /// 非法落子不改变对局，并在 `rejected` 中给出原因。
    pub fn apply_move(&mut self, index: usize, symbol: Option<String>) -> Result<String, JsValue> {
        let symbol = symbol.as_deref().map(parse_symbol).transpose()?;
        let mut session = self.session.borrow_mut();
        let resolution = match symbol {
            Some(symbol) => session.apply_move_as(index, symbol),
            None => session.apply_move(index),
        };
        serde_json::to_string(&resolution).map_err(serde_to_js_error)
    }

    pub fn evaluate_status(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.borrow().status()).map_err(serde_to_js_error)
    }

    pub fn reset(&mut self) -> Result<String, JsValue> {
        let mut session = self.session.borrow_mut();
        session.reset();
        serde_json::to_string(&session.snapshot()).map_err(serde_to_js_error)
    }

    pub fn set_mode(&mut self, mode: &str) -> Result<(), JsValue> {
        let mode = parse_mode(mode)?;
        self.session.borrow_mut().set_mode(mode).map_err(to_js_error)
    }

    pub fn set_difficulty(&mut self, difficulty: &str) -> Result<(), JsValue> {
        let difficulty = parse_difficulty(difficulty)?;
        self.session
            .borrow_mut()
            .set_difficulty(difficulty)
            .map_err(to_js_error)
    }

    pub fn needs_ai_move(&self) -> bool {
        self.session.borrow().needs_ai_move()
    }

    pub fn apply_ai_move(&mut self) -> Result<String, JsValue> {
        let resolution = self.session.borrow_mut().play_ai_move();
        serde_json::to_string(&resolution).map_err(serde_to_js_error)
    }

    pub fn scoreboard_text(&self) -> String {
        self.session.borrow().scoreboard().to_string()
    }

    /// 异步返回 AI 对当前棋盘的决策，不实际落子。
    pub fn think_ai(&self, strategy: Option<String>, delay_ms: Option<u32>) -> Promise {
        let session = self.session.borrow();
        let board = session.state().board;
        let ai = session.ai_symbol();
        let human = session.human_symbol();
        let config = strategy_config(session.config().difficulty, strategy.as_deref());
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            let config = config?;
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut agent = AiAgent::new(config);
            let decision = agent.decide_move(&board, ai, human);
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    /// 延迟结束后执行 AI 落子，无法取消。
    /// 触发时按当时的会话状态处理，若已不轮到 AI 则不做任何改动。
    pub fn schedule_ai_move(&self, delay_ms: Option<u32>) -> Promise {
        let session = Rc::clone(&self.session);
        let delay = delay_ms.unwrap_or_else(|| session.borrow().config().ai_delay_ms);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let resolution = session.borrow_mut().play_ai_move();
            let json = serde_json::to_string(&resolution).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }

    /// 延迟结束后开始新的一局，不论届时棋盘如何。
    pub fn schedule_reset(&self, delay_ms: Option<u32>) -> Promise {
        let session = Rc::clone(&self.session);
        let delay = delay_ms.unwrap_or_else(|| session.borrow().config().reset_delay_ms);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut session = session.borrow_mut();
            session.reset();
            let json = serde_json::to_string(&session.snapshot()).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }
}

/// 计算由九个 `""`/`"X"`/`"O"` 字符串组成的棋盘的状态。
#[wasm_bindgen(js_name = "evaluateStatus")]
pub fn evaluate_status(board: JsValue) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    to_value(&board.evaluate_status()).map_err(JsValue::from)
}

/// 返回 AI 的落点下标，棋盘已满时返回 `undefined`。
#[wasm_bindgen(js_name = "chooseMove")]
pub fn choose_move(
    board: JsValue,
    difficulty: &str,
    ai_symbol: &str,
    human_symbol: Option<String>,
) -> Result<Option<u8>, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    let difficulty = parse_difficulty(difficulty)?;
    let (ai, human) = parse_sides(ai_symbol, human_symbol)?;
    Ok(ai::choose_move(&board, difficulty, ai, human).map(|index| index as u8))
}

/// 与 `chooseMove` 相同，但返回包含搜索统计的完整决策。
#[wasm_bindgen(js_name = "computeAiMove")]
pub fn compute_ai_move(
    board: JsValue,
    difficulty: &str,
    ai_symbol: &str,
    human_symbol: Option<String>,
    strategy: Option<String>,
) -> Result<JsValue, JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    let difficulty = parse_difficulty(difficulty)?;
    let (ai, human) = parse_sides(ai_symbol, human_symbol)?;
    let mut agent = AiAgent::new(strategy_config(difficulty, strategy.as_deref())?);
    to_value(&agent.decide_move(&board, ai, human)).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateBoard")]
pub fn validate_board(board: JsValue) -> Result<(), JsValue> {
    let board: Board = from_value(board).map_err(JsValue::from)?;
    GameState::from_board(board)
        .integrity_check()
        .map_err(|error| to_js_error(GameError::IntegrityViolation { error }))?;
    Ok(())
}
