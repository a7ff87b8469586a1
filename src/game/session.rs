use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::rules::{GameError, MoveResolution, RuleEngine};
use super::state::{GameEvent, GameState, GameStatus, Symbol};
use crate::ai::{AiAgent, AiConfig, AiDecision, AiDifficulty};

pub const DEFAULT_AI_DELAY_MS: u32 = 500;
pub const DEFAULT_RESET_DELAY_MS: u32 = 2_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    HumanVsHuman,
    #[default]
    HumanVsAi,
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pvp" | "human" | "local" | "human_vs_human" => Ok(GameMode::HumanVsHuman),
            "ai" | "pve" | "computer" | "human_vs_ai" => Ok(GameMode::HumanVsAi),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    pub mode: GameMode,
    pub difficulty: AiDifficulty,
    /// [`GameMode::HumanVsAi`] 模式下电脑使用的标记。
    pub ai_symbol: Symbol,
    pub ai_delay_ms: u32,
    pub reset_delay_ms: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::default(),
            difficulty: AiDifficulty::default(),
            ai_symbol: Symbol::O,
            ai_delay_ms: DEFAULT_AI_DELAY_MS,
            reset_delay_ms: DEFAULT_RESET_DELAY_MS,
        }
    }
}

/// 整个会话期间的比分统计。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Scoreboard {
    pub x_wins: u32,
    pub o_wins: u32,
    pub draws: u32,
}

impl Scoreboard {
    pub fn record(&mut self, status: GameStatus) {
        match status.winner() {
            Some(Symbol::X) => self.x_wins += 1,
            Some(Symbol::O) => self.o_wins += 1,
            None if status == GameStatus::Draw => self.draws += 1,
            None => {}
        }
    }

    pub fn rounds(&self) -> u32 {
        self.x_wins + self.o_wins + self.draws
    }
}

impl fmt::Display for Scoreboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X: {} | O: {} | Draws: {}",
            self.x_wins, self.o_wins, self.draws
        )
    }
}

/// 供前端展示的会话快照。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: GameState,
    pub status: GameStatus,
    pub scoreboard: Scoreboard,
    pub config: SessionConfig,
    pub settings_locked: bool,
    pub needs_ai_move: bool,
}

/// 一局游戏会话：棋盘、比分、设置与 AI 对手。
pub struct GameSession {
    config: SessionConfig,
    state: GameState,
    scoreboard: Scoreboard,
    settings_locked: bool,
    engine: RuleEngine,
    agent: AiAgent,
}

impl GameSession {
    pub fn new(config: SessionConfig) -> Self {
        let agent = AiAgent::new(AiConfig::from_difficulty(config.difficulty));
        Self::with_agent(config, agent)
    }

    pub fn with_seed(config: SessionConfig, seed: u64) -> Self {
        let agent = AiAgent::with_seed(AiConfig::from_difficulty(config.difficulty), seed);
        Self::with_agent(config, agent)
    }

    fn with_agent(config: SessionConfig, agent: AiAgent) -> Self {
        Self {
            config,
            state: GameState::new(),
            scoreboard: Scoreboard::default(),
            settings_locked: false,
            engine: RuleEngine::new(),
            agent,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn status(&self) -> GameStatus {
        self.engine.evaluate_status(&self.state)
    }

    pub fn scoreboard(&self) -> Scoreboard {
        self.scoreboard
    }

    pub fn settings_locked(&self) -> bool {
        self.settings_locked
    }

    pub fn ai_symbol(&self) -> Symbol {
        self.config.ai_symbol
    }

    pub fn human_symbol(&self) -> Symbol {
        self.config.ai_symbol.other()
    }

    fn ensure_unlocked(&self) -> Result<(), GameError> {
        if self.settings_locked {
            return Err(GameError::SettingsLocked);
        }
        Ok(())
    }

    pub fn set_mode(&mut self, mode: GameMode) -> Result<(), GameError> {
        self.ensure_unlocked()?;
        self.config.mode = mode;
        Ok(())
    }

    pub fn set_difficulty(&mut self, difficulty: AiDifficulty) -> Result<(), GameError> {
        self.ensure_unlocked()?;
        self.config.difficulty = difficulty;
        self.agent.set_config(AiConfig::from_difficulty(difficulty));
        Ok(())
    }

    /// 以当前行动方在 `index` 处落子。
    pub fn apply_move(&mut self, index: usize) -> MoveResolution {
        let symbol = self.state.active;
        self.apply_move_as(index, symbol)
    }

    /// 非法落子会被忽略：结果中带有原因，会话保持原样。
    pub fn apply_move_as(&mut self, index: usize, symbol: Symbol) -> MoveResolution {
        let attempt = self.engine.apply_move(&mut self.state, index, symbol);
        match &attempt {
            Ok(_) => {
                self.settings_locked = true;
                let status = self.state.status();
                if status.is_terminal() {
                    self.scoreboard.record(status);
                    crate::console_log!("round over: {:?} ({})", status, self.scoreboard);
                }
            }
            Err(error) => {
                crate::utils::warn(&format!("move {symbol} at {index} ignored: {error}"));
            }
        }
        MoveResolution::from_attempt(&self.state, attempt)
    }

    pub fn needs_ai_move(&self) -> bool {
        self.config.mode == GameMode::HumanVsAi
            && !self.state.is_finished()
            && self.state.active == self.config.ai_symbol
    }

    /// 只向 AI 询问落点，不实际落子。
    pub fn think(&mut self) -> AiDecision {
        let ai = self.ai_symbol();
        let human = self.human_symbol();
        self.agent.decide_move(&self.state.board, ai, human)
    }

    pub fn play_ai_move(&mut self) -> MoveResolution {
        if !self.needs_ai_move() {
            return MoveResolution::rejected(self.state.clone(), GameError::NotAiTurn);
        }
        let decision = self.think();
        match decision.index {
            Some(index) => self.apply_move_as(usize::from(index), self.config.ai_symbol),
            None => MoveResolution::rejected(self.state.clone(), GameError::GameFinished),
        }
    }

    /// 开始新的一局：保留比分，解锁设置。
    pub fn reset(&mut self) -> Vec<GameEvent> {
        let events = self.engine.reset(&mut self.state);
        self.settings_locked = false;
        crate::console_log!("board reset ({})", self.scoreboard);
        events
    }

    /// 用之前保存的状态替换当前对局。
    pub fn restore_state(&mut self, state: GameState) -> Result<(), GameError> {
        state
            .integrity_check()
            .map_err(|error| GameError::IntegrityViolation { error })?;
        self.settings_locked = state.board.empty_cells().count() < state.board.cells().len();
        self.state = state;
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            status: self.status(),
            scoreboard: self.scoreboard,
            config: self.config.clone(),
            settings_locked: self.settings_locked,
            needs_ai_move: self.needs_ai_move(),
        }
    }
}

impl Default for GameSession {
    fn default() -> Self {
        GameSession::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Board, Cell};

    fn session(mode: GameMode, difficulty: AiDifficulty) -> GameSession {
        let config = SessionConfig {
            mode,
            difficulty,
            ..SessionConfig::default()
        };
        GameSession::with_seed(config, 42)
    }

    #[test]
    fn ai_replies_after_human_move() {
        let mut session = session(GameMode::HumanVsAi, AiDifficulty::Hard);
        assert!(!session.needs_ai_move());

        let human = session.apply_move(4);
        assert!(human.accepted());
        assert!(session.needs_ai_move());

        let reply = session.play_ai_move();
        assert!(reply.accepted());
        assert_eq!(session.state().board.get(0), Some(Cell::O));
        assert_eq!(session.state().active, Symbol::X);
        assert!(!session.needs_ai_move());
    }

    #[test]
    fn ai_move_refused_out_of_turn() {
        let mut session = session(GameMode::HumanVsHuman, AiDifficulty::Hard);
        session.apply_move(0);
        let resolution = session.play_ai_move();
        assert_eq!(resolution.rejected, Some(GameError::NotAiTurn));
        assert_eq!(session.state().board.empty_cells().count(), 8);
    }

    #[test]
    fn ai_playing_x_moves_first() {
        let config = SessionConfig {
            ai_symbol: Symbol::X,
            difficulty: AiDifficulty::Medium,
            ..SessionConfig::default()
        };
        let mut session = GameSession::with_seed(config, 3);
        assert_eq!(session.human_symbol(), Symbol::O);
        assert!(session.needs_ai_move());
        let resolution = session.play_ai_move();
        assert_eq!(resolution.state.board.get(0), Some(Cell::X));
    }

    #[test]
    fn settings_lock_after_first_move_until_reset() {
        let mut session = session(GameMode::HumanVsAi, AiDifficulty::Easy);
        session
            .set_difficulty(AiDifficulty::Hard)
            .expect("settings open before play");

        let rejected = session.apply_move(12);
        assert!(!rejected.accepted());
        assert!(!session.settings_locked(), "ignored move does not lock");

        session.apply_move(0);
        assert!(session.settings_locked());
        assert_eq!(
            session.set_mode(GameMode::HumanVsHuman),
            Err(GameError::SettingsLocked)
        );
        assert_eq!(
            session.set_difficulty(AiDifficulty::Easy),
            Err(GameError::SettingsLocked)
        );
        assert_eq!(session.config().difficulty, AiDifficulty::Hard);

        session.reset();
        assert!(!session.settings_locked());
        session
            .set_mode(GameMode::HumanVsHuman)
            .expect("settings reopen after reset");
    }

    #[test]
    fn scoreboard_survives_reset() {
        let mut session = session(GameMode::HumanVsHuman, AiDifficulty::Easy);
        for index in [0, 3, 1, 4, 2] {
            session.apply_move(index);
        }
        assert_eq!(session.status(), GameStatus::Win { winner: Symbol::X });

        let late = session.apply_move(8);
        assert_eq!(late.rejected, Some(GameError::GameFinished));
        assert_eq!(session.scoreboard().x_wins, 1, "tally counted once");

        let events = session.reset();
        assert_eq!(events, vec![GameEvent::BoardReset]);
        assert_eq!(session.state().board, Board::new());
        assert_eq!(session.state().active, Symbol::X);

        for index in [0, 1, 2, 4, 3, 5, 7, 6, 8] {
            session.apply_move(index);
        }
        assert_eq!(session.status(), GameStatus::Draw);

        let score = session.scoreboard();
        assert_eq!(score.x_wins, 1);
        assert_eq!(score.o_wins, 0);
        assert_eq!(score.draws, 1);
        assert_eq!(score.rounds(), 2);
        assert_eq!(score.to_string(), "X: 1 | O: 0 | Draws: 1");
    }

    #[test]
    fn hard_ai_holds_against_scripted_human() {
        let mut session = session(GameMode::HumanVsAi, AiDifficulty::Hard);
        let preferences = [0, 8, 2, 6, 1, 3, 5, 7, 4];
        while !session.state().is_finished() {
            if session.needs_ai_move() {
                assert!(session.play_ai_move().accepted());
            } else {
                let index = preferences
                    .iter()
                    .copied()
                    .find(|&i| session.state().board.is_cell_empty(i))
                    .expect("unfinished board has an empty cell");
                session.apply_move(index);
            }
        }
        assert_ne!(session.status(), GameStatus::Win { winner: Symbol::X });
    }

    #[test]
    fn config_fills_missing_fields() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"mode":"human_vs_human","difficulty":"hard"}"#)
                .expect("partial config should parse");
        assert_eq!(config.mode, GameMode::HumanVsHuman);
        assert_eq!(config.difficulty, AiDifficulty::Hard);
        assert_eq!(config.ai_symbol, Symbol::O);
        assert_eq!(config.ai_delay_ms, DEFAULT_AI_DELAY_MS);
        assert_eq!(config.reset_delay_ms, DEFAULT_RESET_DELAY_MS);
    }

    #[test]
    fn mode_parses_select_values() {
        assert_eq!("ai".parse(), Ok(GameMode::HumanVsAi));
        assert_eq!("PvP".parse(), Ok(GameMode::HumanVsHuman));
        assert_eq!("online".parse::<GameMode>(), Err(()));
    }

    #[test]
    fn restore_state_validates() {
        let mut session = session(GameMode::HumanVsAi, AiDifficulty::Hard);
        let bad = GameState::with_board("XX. ... ...".parse().expect("board"), Symbol::O);
        assert!(matches!(
            session.restore_state(bad),
            Err(GameError::IntegrityViolation { .. })
        ));

        let good = GameState::with_board("X.. ... ...".parse().expect("board"), Symbol::O);
        session.restore_state(good).expect("balanced state restores");
        assert!(session.settings_locked());
        assert!(session.needs_ai_move());
    }

    #[test]
    fn snapshot_reflects_session() {
        let mut session = session(GameMode::HumanVsAi, AiDifficulty::Medium);
        session.apply_move(4);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.status, GameStatus::InProgress);
        assert!(snapshot.settings_locked);
        assert!(snapshot.needs_ai_move);
        let json = serde_json::to_string(&snapshot).expect("snapshot serializes");
        assert!(json.contains(r#""needs_ai_move":true"#));
    }
}
