use std::collections::HashMap;
use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::game::{Board, Cell, Symbol, BOARD_CELLS};

const WIN_SCORE: i8 = 10;
const LOSS_SCORE: i8 = -10;
const DRAW_SCORE: i8 = 0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl FromStr for AiDifficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(AiDifficulty::Easy),
            "medium" | "normal" => Ok(AiDifficulty::Medium),
            "hard" | "expert" | "impossible" => Ok(AiDifficulty::Hard),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiStrategy {
    /// 在空格中均匀随机落子。
    Random,
    /// 能赢先赢，其次封堵，否则取第一个空格。
    Greedy,
    /// 穷举搜索直到终局。
    Minimax,
}

impl FromStr for AiStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(AiStrategy::Random),
            "greedy" | "heuristic" => Ok(AiStrategy::Greedy),
            "minimax" | "perfect" => Ok(AiStrategy::Minimax),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiConfig {
    pub strategy: AiStrategy,
    /// 按局面缓存精确的 minimax 值，不影响所选落点。
    pub transposition: bool,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: AiDifficulty) -> Self {
        match difficulty {
            AiDifficulty::Easy => Self {
                strategy: AiStrategy::Random,
                transposition: false,
            },
            AiDifficulty::Medium => Self {
                strategy: AiStrategy::Greedy,
                transposition: false,
            },
            AiDifficulty::Hard => Self {
                strategy: AiStrategy::Minimax,
                transposition: true,
            },
        }
    }

    pub fn with_strategy(mut self, strategy: AiStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_transposition(mut self, enabled: bool) -> Self {
        self.transposition = enabled;
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_difficulty(AiDifficulty::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    /// 仅当棋盘已满时为 `None`。
    pub index: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<i8>,
    pub nodes: u64,
    pub strategy: AiStrategy,
}

struct SearchStats {
    nodes: u64,
}

impl SearchStats {
    fn new() -> Self {
        Self { nodes: 0 }
    }
}

pub struct AiAgent {
    config: AiConfig,
    rng: SmallRng,
    table: HashMap<u32, i8>,
}

impl AiAgent {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
            table: HashMap::new(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
            table: HashMap::new(),
        }
    }

    pub fn set_config(&mut self, config: AiConfig) {
        self.config = config;
    }

    pub fn cached_positions(&self) -> usize {
        self.table.len()
    }

    /// 为 `ai` 选择落点。在副本上搜索，不会修改 `board`。
    pub fn decide_move(&mut self, board: &Board, ai: Symbol, human: Symbol) -> AiDecision {
        let mut working = *board;
        let decision = match self.config.strategy {
            AiStrategy::Random => self.random_decision(&working),
            AiStrategy::Greedy => greedy_decision(&mut working, ai, human),
            AiStrategy::Minimax => self.minimax_decision(&mut working, ai, human),
        };

        crate::console_log!(
            "ai {} ({:?}) picked {:?} after {} nodes",
            ai,
            decision.strategy,
            decision.index,
            decision.nodes
        );
        decision
    }

    pub fn choose_move(&mut self, board: &Board, ai: Symbol, human: Symbol) -> Option<usize> {
        self.decide_move(board, ai, human).index.map(usize::from)
    }

    fn random_decision(&mut self, board: &Board) -> AiDecision {
        let available: Vec<usize> = board.empty_cells().collect();
        let index = available.choose(&mut self.rng).copied();
        AiDecision {
            index: index.map(|i| i as u8),
            evaluation: None,
            nodes: 1,
            strategy: AiStrategy::Random,
        }
    }

    fn minimax_decision(&mut self, board: &mut Board, ai: Symbol, human: Symbol) -> AiDecision {
        let mut stats = SearchStats::new();
        stats.nodes += 1;

        // 根节点总是展开（即使胜负已分），只要有空格就返回落点
        let mut best: Option<(usize, i8)> = None;
        for index in 0..BOARD_CELLS {
            if !board.is_cell_empty(index) {
                continue;
            }
            board.set(index, ai.into());
            let score = self.minimax_rec(board, human, ai, human, &mut stats);
            board.set(index, Cell::Empty);

            // 只接受严格更优，同分保留最小下标
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((index, score));
            }
        }

        AiDecision {
            index: best.map(|(index, _)| index as u8),
            evaluation: best.map(|(_, score)| score),
            nodes: stats.nodes,
            strategy: AiStrategy::Minimax,
        }
    }

    fn minimax_rec(
        &mut self,
        board: &mut Board,
        to_move: Symbol,
        ai: Symbol,
        human: Symbol,
        stats: &mut SearchStats,
    ) -> i8 {
        stats.nodes += 1;

        if board.has_won(human) {
            return LOSS_SCORE;
        }
        if board.has_won(ai) {
            return WIN_SCORE;
        }
        if board.is_full() {
            return DRAW_SCORE;
        }

        let key = transposition_key(board, to_move, ai, human);
        if self.config.transposition {
            if let Some(&score) = self.table.get(&key) {
                return score;
            }
        }

        let maximizing = to_move == ai;
        let next = if maximizing { human } else { ai };
        let mut value = if maximizing { i8::MIN } else { i8::MAX };

        for index in 0..BOARD_CELLS {
            if !board.is_cell_empty(index) {
                continue;
            }
            board.set(index, to_move.into());
            let score = self.minimax_rec(board, next, ai, human, stats);
            board.set(index, Cell::Empty);

            value = if maximizing {
                value.max(score)
            } else {
                value.min(score)
            };
        }

        if self.config.transposition {
            self.table.insert(key, value);
        }
        value
    }
}

impl Default for AiAgent {
    fn default() -> Self {
        AiAgent::new(AiConfig::default())
    }
}

fn greedy_decision(board: &mut Board, ai: Symbol, human: Symbol) -> AiDecision {
    let mut nodes = 0;
    let index = completing_move(board, ai, &mut nodes)
        .or_else(|| completing_move(board, human, &mut nodes))
        .or_else(|| board.first_empty());

    AiDecision {
        index: index.map(|i| i as u8),
        evaluation: None,
        nodes,
        strategy: AiStrategy::Greedy,
    }
}

/// 按下标顺序找到 `symbol` 能连成一线的第一个空格。
fn completing_move(board: &mut Board, symbol: Symbol, nodes: &mut u64) -> Option<usize> {
    for index in 0..BOARD_CELLS {
        if !board.is_cell_empty(index) {
            continue;
        }
        *nodes += 1;
        board.set(index, symbol.into());
        let wins = board.has_won(symbol);
        board.set(index, Cell::Empty);
        if wins {
            return Some(index);
        }
    }
    None
}

fn transposition_key(board: &Board, to_move: Symbol, ai: Symbol, human: Symbol) -> u32 {
    let bit = |symbol: Symbol| u32::from(symbol == Symbol::O);
    (board.key() << 3) | (bit(to_move) << 2) | (bit(ai) << 1) | bit(human)
}

/// 用新建的 AI 代理做一次性选点。
pub fn choose_move(
    board: &Board,
    difficulty: AiDifficulty,
    ai: Symbol,
    human: Symbol,
) -> Option<usize> {
    AiAgent::new(AiConfig::from_difficulty(difficulty)).choose_move(board, ai, human)
}
