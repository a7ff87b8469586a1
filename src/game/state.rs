use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 棋盘格数。
pub const BOARD_CELLS: usize = 9;

/// 八条获胜连线，依次为行、列、对角线。
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// 玩家标记。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Symbol {
    #[default]
    X,
    O,
}

impl Symbol {
    pub fn other(self) -> Self {
        match self {
            Symbol::X => Symbol::O,
            Symbol::O => Symbol::X,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::X => "X",
            Symbol::O => "O",
        }
    }
}

impl FromStr for Symbol {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(Symbol::X),
            "O" => Ok(Symbol::O),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个格子的内容，序列化为 `""`、`"X"` 或 `"O"`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    #[serde(rename = "")]
    Empty,
    X,
    O,
}

impl Cell {
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(Symbol::X),
            Cell::O => Some(Symbol::O),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

impl From<Symbol> for Cell {
    fn from(symbol: Symbol) -> Self {
        match symbol {
            Symbol::X => Cell::X,
            Symbol::O => Cell::O,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseBoardError {
    #[error("expected 9 cells, found {found}")]
    WrongLength { found: usize },
    #[error("unrecognized cell marker {marker:?}")]
    UnknownMarker { marker: char },
}

/// 按行优先排列的 3x3 棋盘。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct Board {
    cells: [Cell; BOARD_CELLS],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cells(&self) -> &[Cell; BOARD_CELLS] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// 越界下标一律视为非空。
    pub fn is_cell_empty(&self, index: usize) -> bool {
        matches!(self.get(index), Some(Cell::Empty))
    }

    pub(crate) fn set(&mut self, index: usize, cell: Cell) {
        self.cells[index] = cell;
    }

    pub fn clear(&mut self) {
        self.cells = [Cell::Empty; BOARD_CELLS];
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_empty())
            .map(|(index, _)| index)
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.empty_cells().next()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| !cell.is_empty())
    }

    pub fn count(&self, symbol: Symbol) -> usize {
        let target = Cell::from(symbol);
        self.cells.iter().filter(|cell| **cell == target).count()
    }

    /// `symbol` 是否占满任意一条连线。
    pub fn has_won(&self, symbol: Symbol) -> bool {
        let target = Cell::from(symbol);
        WIN_LINES
            .iter()
            .any(|line| line.iter().all(|&index| self.cells[index] == target))
    }

    /// 依次扫描所有连线；双方都有连线时以最后扫描到的为准。
    pub fn winner(&self) -> Option<Symbol> {
        let mut winner = None;
        for [a, b, c] in WIN_LINES {
            if let Some(symbol) = self.cells[a].symbol() {
                if self.cells[b] == self.cells[a] && self.cells[c] == self.cells[a] {
                    winner = Some(symbol);
                }
            }
        }
        winner
    }

    pub fn evaluate_status(&self) -> GameStatus {
        if let Some(winner) = self.winner() {
            GameStatus::Win { winner }
        } else if self.is_full() {
            GameStatus::Draw
        } else {
            GameStatus::InProgress
        }
    }

    /// 棋盘的三进制编码，每种局面唯一。
    pub fn key(&self) -> u32 {
        self.cells.iter().fold(0, |acc, cell| {
            acc * 3
                + match cell {
                    Cell::Empty => 0,
                    Cell::X => 1,
                    Cell::O => 2,
                }
        })
    }
}

impl FromStr for Board {
    type Err = ParseBoardError;

    /// 接受 `X`/`O`（不区分大小写），空格用 `.`、`_` 或 `-` 表示。
    /// 空白、`|` 和 `/` 会被忽略，便于按行排版。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cells = Vec::with_capacity(BOARD_CELLS);
        for marker in s.chars() {
            let cell = match marker {
                'X' | 'x' => Cell::X,
                'O' | 'o' => Cell::O,
                '.' | '_' | '-' => Cell::Empty,
                '|' | '/' => continue,
                c if c.is_whitespace() => continue,
                other => return Err(ParseBoardError::UnknownMarker { marker: other }),
            };
            cells.push(cell);
        }
        let cells: [Cell; BOARD_CELLS] = cells
            .try_into()
            .map_err(|rest: Vec<Cell>| ParseBoardError::WrongLength { found: rest.len() })?;
        Ok(Self { cells })
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.cells.chunks(3).enumerate() {
            if row > 0 {
                writeln!(f)?;
            }
            for cell in chunk {
                let marker = match cell {
                    Cell::Empty => '.',
                    Cell::X => 'X',
                    Cell::O => 'O',
                };
                write!(f, "{marker}")?;
            }
        }
        Ok(())
    }
}

/// 由棋盘推导出的对局结果，不单独存储。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameStatus {
    InProgress,
    Win { winner: Symbol },
    Draw,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }

    pub fn winner(&self) -> Option<Symbol> {
        match self {
            GameStatus::Win { winner } => Some(*winner),
            _ => None,
        }
    }
}

/// 每步落子返回给调用方的事件流。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    MovePlaced { index: u8, symbol: Symbol },
    TurnPassed { next: Symbol },
    GameWon { winner: Symbol },
    GameDrawn,
    BoardReset,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("mark counts out of balance: {x} X against {o} O")]
    UnbalancedMarks { x: u8, o: u8 },
    #[error("{expected} should be to move, found {actual}")]
    WrongActiveSymbol { expected: Symbol, actual: Symbol },
    #[error("both symbols hold a winning line")]
    ConflictingWinners,
}

/// 游戏整体状态：棋盘与当前行动方。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GameState {
    #[serde(default)]
    pub board: Board,
    #[serde(default)]
    pub active: Symbol,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_board(board: Board, active: Symbol) -> Self {
        Self { board, active }
    }

    /// 根据双方棋子数推断行动方（X 先手）。
    pub fn from_board(board: Board) -> Self {
        let active = if board.count(Symbol::X) > board.count(Symbol::O) {
            Symbol::O
        } else {
            Symbol::X
        };
        Self { board, active }
    }

    pub fn status(&self) -> GameStatus {
        self.board.evaluate_status()
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn reset(&mut self) {
        self.board.clear();
        self.active = Symbol::X;
    }

    /// 检查该状态能否由 X 先手、轮流落子得到。
    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let x = self.board.count(Symbol::X) as u8;
        let o = self.board.count(Symbol::O) as u8;
        if x < o || x - o > 1 {
            return Err(IntegrityError::UnbalancedMarks { x, o });
        }

        if self.board.has_won(Symbol::X) && self.board.has_won(Symbol::O) {
            return Err(IntegrityError::ConflictingWinners);
        }

        if !self.is_finished() {
            let expected = if x == o { Symbol::X } else { Symbol::O };
            if self.active != expected {
                return Err(IntegrityError::WrongActiveSymbol {
                    expected,
                    actual: self.active,
                });
            }
        }

        Ok(())
    }
}
