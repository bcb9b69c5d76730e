//! Levels: text codec, solvability check and seeded generation
//!
//! A [`Level`] is everything a level string carries: the board (tile layout
//! plus exits) and the faucet and goal endpoints.

pub mod codec;
pub mod generator;
pub mod verify;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use codec::{decode, encode};
pub use generator::{builtin_pack, generate_batch, generate_level, pick_level};
pub use verify::{is_level_string_solvable, is_traversable};

use crate::error::LevelError;
use crate::sim::{Board, Direction, EMPTY, Endpoint, Exits, TileId, cell_count};

/// Generator difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }

    /// Square board size used when no generated level is available
    pub fn fallback_size(&self) -> usize {
        match self {
            Difficulty::Easy => 3,
            Difficulty::Normal => 4,
            Difficulty::Hard => 5,
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" | "med" | "medium" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty {other:?} (expected easy, normal or hard)")),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete puzzle: board, faucet and goal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub board: Board,
    pub faucet: Endpoint,
    pub goal: Endpoint,
}

impl Level {
    /// Straight pipe along the top row from a left faucet to a right goal,
    /// vertical pipes elsewhere, empty slot in the last cell.
    pub fn straight(width: usize, height: usize) -> Result<Self, LevelError> {
        // faucet and goal need distinct cells, the empty slot its own row
        if width < 2 || height < 2 {
            return Err(LevelError::InvalidDimensions { width, height });
        }
        let horizontal = Exits::from_directions([Direction::Left, Direction::Right]);
        let vertical = Exits::from_directions([Direction::Up, Direction::Down]);

        let total = cell_count(width, height)?;
        let mut cells = Vec::with_capacity(total);
        let mut exits = BTreeMap::new();
        for idx in 0..total {
            let id = idx as TileId + 1;
            if idx + 1 == total {
                cells.push(EMPTY);
                continue;
            }
            cells.push(id);
            exits.insert(id, if idx < width { horizontal } else { vertical });
        }

        let board = Board::from_parts(width, height, cells, exits)?;
        Ok(Self {
            faucet: Endpoint {
                x: 0,
                y: 0,
                side: Direction::Left,
            },
            goal: Endpoint {
                x: width as i32 - 1,
                y: 0,
                side: Direction::Right,
            },
            board,
        })
    }

    /// Topology, faucet and goal can be traversed in the current arrangement
    pub fn is_solvable(&self) -> bool {
        is_traversable(
            self.board.width(),
            self.board.height(),
            &self.board.topology(),
            &self.faucet,
            &self.goal,
        )
    }

    /// Same puzzle up to tile numbering: dimensions, per-cell exits, empty
    /// slot, faucet and goal all match
    pub fn same_puzzle(&self, other: &Level) -> bool {
        self.board.width() == other.board.width()
            && self.board.height() == other.board.height()
            && self.board.topology() == other.board.topology()
            && self.board.empty_cell() == other.board.empty_cell()
            && self.faucet == other.faucet
            && self.goal == other.goal
    }
}

impl FromStr for Level {
    type Err = LevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self))
    }
}
