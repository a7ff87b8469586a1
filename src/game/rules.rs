use serde::{Deserialize, Serialize};

use super::state::{Cell, GameEvent, GameState, GameStatus, IntegrityError, Symbol};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type")]
pub enum GameError {
    #[error("the game is already over")]
    GameFinished,
    #[error("cell {index} is already taken")]
    CellOccupied { index: usize },
    #[error("cell {index} is off the board")]
    CellOutOfRange { index: usize },
    #[error("mode and difficulty are locked until the next round")]
    SettingsLocked,
    #[error("it is not the AI's turn")]
    NotAiTurn,
    #[error("unknown symbol {value:?}")]
    InvalidSymbol { value: String },
    #[error("unknown difficulty {value:?}")]
    InvalidDifficulty { value: String },
    #[error("unknown AI strategy {value:?}")]
    InvalidStrategy { value: String },
    #[error("unknown game mode {value:?}")]
    InvalidMode { value: String },
    #[error("integrity violation: {error}")]
    IntegrityViolation { error: IntegrityError },
}

/// 一次落子尝试的结果。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveResolution {
    pub state: GameState,
    pub status: GameStatus,
    pub events: Vec<GameEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<GameError>,
}

impl MoveResolution {
    pub fn new(state: GameState, events: Vec<GameEvent>) -> Self {
        let status = state.status();
        Self {
            state,
            status,
            events,
            rejected: None,
        }
    }

    /// 被忽略的落子：状态不变，没有事件。
    pub fn rejected(state: GameState, error: GameError) -> Self {
        let status = state.status();
        Self {
            state,
            status,
            events: Vec::new(),
            rejected: Some(error),
        }
    }

    pub fn from_attempt(state: &GameState, attempt: Result<Vec<GameEvent>, GameError>) -> Self {
        match attempt {
            Ok(events) => Self::new(state.clone(), events),
            Err(error) => Self::rejected(state.clone(), error),
        }
    }

    pub fn accepted(&self) -> bool {
        self.rejected.is_none()
    }
}

/// 规则引擎：校验落子并维护 [`GameState`] 的回合。
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    fn ensure_in_progress(state: &GameState) -> Result<(), GameError> {
        if state.is_finished() {
            return Err(GameError::GameFinished);
        }
        Ok(())
    }

    fn ensure_cell_empty(state: &GameState, index: usize) -> Result<(), GameError> {
        match state.board.get(index) {
            None => Err(GameError::CellOutOfRange { index }),
            Some(Cell::Empty) => Ok(()),
            Some(_) => Err(GameError::CellOccupied { index }),
        }
    }

    /// 在 `index` 处落下 `symbol`，出错时状态保持不变。
    ///
    /// 只有对局继续时才轮换行动方；分出胜负或平局后保留最后落子的一方。
    pub fn apply_move(
        &self,
        state: &mut GameState,
        index: usize,
        symbol: Symbol,
    ) -> Result<Vec<GameEvent>, GameError> {
        Self::ensure_in_progress(state)?;
        Self::ensure_cell_empty(state, index)?;

        state.board.set(index, symbol.into());
        let mut events = vec![GameEvent::MovePlaced {
            index: index as u8,
            symbol,
        }];

        match state.status() {
            GameStatus::InProgress => {
                state.active = state.active.other();
                events.push(GameEvent::TurnPassed { next: state.active });
            }
            GameStatus::Win { winner } => events.push(GameEvent::GameWon { winner }),
            GameStatus::Draw => events.push(GameEvent::GameDrawn),
        }

        Ok(events)
    }

    pub fn evaluate_status(&self, state: &GameState) -> GameStatus {
        state.status()
    }

    pub fn reset(&self, state: &mut GameState) -> Vec<GameEvent> {
        state.reset();
        vec![GameEvent::BoardReset]
    }
}
