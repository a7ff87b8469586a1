//! 游戏核心逻辑模块（棋盘状态、规则引擎、对局流程）。

pub mod rules;
pub mod session;
pub mod state;

pub use rules::{GameError, MoveResolution, RuleEngine};
pub use session::{GameMode, GameSession, Scoreboard, SessionConfig, SessionSnapshot};
pub use state::{
    Board,
    Cell,
    GameEvent,
    GameState,
    GameStatus,
    IntegrityError,
    ParseBoardError,
    Symbol,
    BOARD_CELLS,
    WIN_LINES,
};
