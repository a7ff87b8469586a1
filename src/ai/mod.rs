//! AI 落子模块（随机、启发式、minimax 搜索）。

pub mod minimax;

pub use minimax::{choose_move, AiAgent, AiConfig, AiDecision, AiDifficulty, AiStrategy};
