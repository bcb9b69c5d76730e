//! Grid and tile model
//!
//! The board owns both the row-major cell array (tile IDs, 0 = empty slot)
//! and the per-tile exit sets. Exits are keyed by tile ID so they travel with
//! a piece when it slides.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::direction::{Direction, Exits};
use crate::error::LevelError;

/// Stable identifier of a physical piece. `0` is the empty slot.
pub type TileId = u32;

/// The empty slot's tile ID
pub const EMPTY: TileId = 0;

/// Scan order used when looking for the empty neighbor of a clicked cell
const SLIDE_SCAN: [Direction; 4] = [
    Direction::Down,
    Direction::Right,
    Direction::Up,
    Direction::Left,
];

/// Side of the board a boundary cell sits on.
///
/// Columns win over rows at corners; interior coordinates fall back to `Left`.
pub fn edge_side(x: i32, y: i32, width: usize, height: usize) -> Direction {
    let (w, h) = (width as i32, height as i32);
    if x == 0 {
        Direction::Left
    } else if x == w - 1 {
        Direction::Right
    } else if y == 0 {
        Direction::Up
    } else if y == h - 1 {
        Direction::Down
    } else {
        Direction::Left
    }
}

/// A faucet or goal: a boundary cell plus the edge it faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub x: i32,
    pub y: i32,
    pub side: Direction,
}

impl Endpoint {
    /// Endpoint at `(x, y)` with its side derived from the board edges
    pub fn on_edge(x: i32, y: i32, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            side: edge_side(x, y, width, height),
        }
    }

    /// The off-board coordinate one step outward along `side`
    pub fn external_point(&self) -> (i32, i32) {
        self.side.step_from(self.x, self.y)
    }

    pub fn in_bounds(&self, width: usize, height: usize) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as usize) < width && (self.y as usize) < height
    }
}

/// A completed slide: `tile` moved from `from` into the empty cell at `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideMove {
    pub tile: TileId,
    pub from: (usize, usize),
    pub to: (usize, usize),
}

/// Puzzle grid: fixed size, exactly one empty cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    width: usize,
    height: usize,
    /// Row-major tile IDs
    cells: Vec<TileId>,
    exits: BTreeMap<TileId, Exits>,
}

/// Number of cells on a `width` x `height` board. Boards need at least two
/// cells and a product that fits in `usize`.
pub fn cell_count(width: usize, height: usize) -> Result<usize, LevelError> {
    width
        .checked_mul(height)
        .filter(|&total| total >= 2)
        .ok_or(LevelError::InvalidDimensions { width, height })
}

/// Row-major IDs `1..w*h-1` with the empty slot in the last cell
pub fn default_grid(width: usize, height: usize) -> Vec<TileId> {
    let total = width * height;
    (0..total)
        .map(|idx| if idx + 1 == total { EMPTY } else { idx as TileId + 1 })
        .collect()
}

impl Board {
    /// Solved default arrangement with no exits assigned (blank pieces)
    pub fn default_layout(width: usize, height: usize) -> Result<Self, LevelError> {
        cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            cells: default_grid(width, height),
            exits: BTreeMap::new(),
        })
    }

    /// Default arrangement where every piece gets random exits:
    /// two distinct directions, 30% chance of a third, then 30% of a fourth.
    pub fn with_random_exits<R: Rng>(
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Result<Self, LevelError> {
        let mut board = Self::default_layout(width, height)?;
        let ids: Vec<TileId> = board.cells.iter().copied().filter(|&id| id != EMPTY).collect();
        for id in ids {
            board.exits.insert(id, random_exits(rng));
        }
        Ok(board)
    }

    /// Build a board from raw parts, enforcing the model invariants
    pub fn from_parts(
        width: usize,
        height: usize,
        cells: Vec<TileId>,
        exits: BTreeMap<TileId, Exits>,
    ) -> Result<Self, LevelError> {
        let expected = cell_count(width, height)?;
        if cells.len() != expected {
            return Err(LevelError::MissingCells {
                expected,
                found: cells.len(),
            });
        }
        let empties = cells.iter().filter(|&&id| id == EMPTY).count();
        if empties != 1 {
            return Err(LevelError::EmptyCellCount { found: empties });
        }
        let mut seen = BTreeSet::new();
        for (index, &id) in cells.iter().enumerate() {
            if id == EMPTY {
                continue;
            }
            if !seen.insert(id) {
                return Err(LevelError::DuplicateTile { id });
            }
            if let Some(single) = exits.get(&id).filter(|e| e.is_single_arm()) {
                return Err(LevelError::SingleArmTile {
                    token: single.to_hex().to_string(),
                    index,
                });
            }
        }
        let exits = exits.into_iter().filter(|(id, _)| seen.contains(id)).collect();
        Ok(Self {
            width,
            height,
            cells,
            exits,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major tile IDs
    pub fn cells(&self) -> &[TileId] {
        &self.cells
    }

    pub fn exits(&self) -> &BTreeMap<TileId, Exits> {
        &self.exits
    }

    /// Exits of a piece; unknown IDs and the empty slot have none
    pub fn exits_of(&self, id: TileId) -> Exits {
        self.exits.get(&id).copied().unwrap_or_default()
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Tile ID at column `x`, row `y`, panicking outside the board
    pub fn cell(&self, x: usize, y: usize) -> TileId {
        self.cells[self.index(x, y)]
    }

    /// Bounds-checked lookup; off-board and the empty slot are both "no tile"
    pub fn tile_at(&self, x: i32, y: i32) -> Option<TileId> {
        if !self.in_bounds(x, y) {
            return None;
        }
        match self.cells[self.index(x as usize, y as usize)] {
            EMPTY => None,
            id => Some(id),
        }
    }

    /// Exits of whatever piece occupies `(x, y)`
    pub fn exits_at(&self, x: i32, y: i32) -> Exits {
        self.tile_at(x, y).map(|id| self.exits_of(id)).unwrap_or_default()
    }

    /// Coordinates of a piece
    pub fn position_of(&self, id: TileId) -> Option<(usize, usize)> {
        self.cells
            .iter()
            .position(|&c| c == id)
            .map(|idx| (idx % self.width, idx / self.width))
    }

    /// Coordinates of the empty slot
    pub fn empty_cell(&self) -> (usize, usize) {
        self.position_of(EMPTY).unwrap_or((self.width - 1, self.height - 1))
    }

    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|&&id| id == EMPTY).count()
    }

    /// First orthogonal neighbor of `(i, j)` holding the empty slot,
    /// scanning down, right, up, left
    pub fn adjacent_empty(&self, i: usize, j: usize) -> Option<(usize, usize)> {
        if i >= self.width || j >= self.height {
            return None;
        }
        SLIDE_SCAN.iter().find_map(|dir| {
            let (ni, nj) = dir.step_from(i as i32, j as i32);
            (self.in_bounds(ni, nj) && self.cells[self.index(ni as usize, nj as usize)] == EMPTY)
                .then_some((ni as usize, nj as usize))
        })
    }

    /// Slide the piece at `(i, j)` into the adjacent empty slot.
    ///
    /// Returns `None` (and leaves the board untouched) when there is no
    /// adjacent empty cell.
    pub fn slide(&mut self, i: usize, j: usize) -> Option<SlideMove> {
        let (ei, ej) = self.adjacent_empty(i, j)?;
        let from = self.index(i, j);
        let to = self.index(ei, ej);
        let tile = self.cells[from];
        self.cells.swap(from, to);
        Some(SlideMove {
            tile,
            from: (i, j),
            to: (ei, ej),
        })
    }

    /// Shuffle by `moves` random legal slides, never immediately undoing the
    /// previous one. Returns the number of slides performed.
    pub fn scramble<R: Rng>(&mut self, moves: usize, rng: &mut R) -> usize {
        let mut previous: Option<(usize, usize)> = None;
        let mut done = 0;
        for _ in 0..moves {
            let (ex, ey) = self.empty_cell();
            let candidates: Vec<(usize, usize)> = Direction::ALL
                .iter()
                .map(|d| d.step_from(ex as i32, ey as i32))
                .filter(|&(x, y)| self.in_bounds(x, y))
                .map(|(x, y)| (x as usize, y as usize))
                .filter(|&pos| Some(pos) != previous)
                .collect();
            let Some(&(x, y)) = candidates.choose(rng) else {
                break;
            };
            if self.slide(x, y).is_some() {
                previous = Some((ex, ey));
                done += 1;
            }
        }
        done
    }

    /// Per-cell exit sets in row-major order (empty slot has none)
    pub fn topology(&self) -> Vec<Exits> {
        self.cells.iter().map(|&id| self.exits_of(id)).collect()
    }
}

fn random_direction<R: Rng>(rng: &mut R, exclude: &[Direction]) -> Direction {
    let choices: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|d| !exclude.contains(d))
        .collect();
    choices.choose(rng).copied().unwrap_or(Direction::None)
}

fn random_exits<R: Rng>(rng: &mut R) -> Exits {
    let mut dirs = vec![random_direction(rng, &[])];
    dirs.push(random_direction(rng, &dirs));
    if rng.random_bool(0.3) {
        dirs.push(random_direction(rng, &dirs));
        if rng.random_bool(0.3) {
            dirs.push(random_direction(rng, &dirs));
        }
    }
    Exits::from_directions(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn board_3x3() -> Board {
        let mut rng = Pcg32::seed_from_u64(7);
        Board::with_random_exits(3, 3, &mut rng).unwrap()
    }

    #[test]
    fn test_default_grid_layout() {
        assert_eq!(default_grid(3, 2), vec![1, 2, 3, 4, 5, 0]);
        let board = Board::default_layout(4, 4).unwrap();
        assert_eq!(board.cell(0, 0), 1);
        assert_eq!(board.cell(3, 3), EMPTY);
        assert_eq!(board.empty_cell(), (3, 3));
        assert!(Board::default_layout(1, 1).is_err());
        assert!(Board::default_layout(0, 3).is_err());
    }

    #[test]
    fn test_random_exits_never_single_arm() {
        let mut rng = Pcg32::seed_from_u64(99);
        let board = Board::with_random_exits(5, 5, &mut rng).unwrap();
        assert_eq!(board.exits().len(), 24);
        for exits in board.exits().values() {
            assert!(exits.len() >= 2, "{exits:?}");
        }
    }

    #[test]
    fn test_edge_side_derivation() {
        assert_eq!(edge_side(0, 1, 3, 3), Direction::Left);
        assert_eq!(edge_side(2, 1, 3, 3), Direction::Right);
        assert_eq!(edge_side(1, 0, 3, 3), Direction::Up);
        assert_eq!(edge_side(1, 2, 3, 3), Direction::Down);
        assert_eq!(edge_side(1, 1, 3, 3), Direction::Left);
        // columns win at corners
        assert_eq!(edge_side(2, 0, 3, 3), Direction::Right);
        let goal = Endpoint::on_edge(2, 0, 3, 3);
        assert_eq!(goal.external_point(), (3, 0));
    }

    #[test]
    fn test_tile_at_is_bounds_checked() {
        let board = board_3x3();
        assert_eq!(board.tile_at(0, 0), Some(1));
        assert_eq!(board.tile_at(-1, 0), None);
        assert_eq!(board.tile_at(3, 0), None);
        assert_eq!(board.tile_at(2, 2), None);
        assert!(board.exits_at(2, 2).is_empty());
    }

    #[test]
    fn test_adjacent_empty_scan() {
        let board = board_3x3();
        assert_eq!(board.adjacent_empty(2, 1), Some((2, 2)));
        assert_eq!(board.adjacent_empty(1, 2), Some((2, 2)));
        assert_eq!(board.adjacent_empty(0, 0), None);
        assert_eq!(board.adjacent_empty(9, 9), None);
    }

    #[test]
    fn test_slide_non_adjacent_is_noop() {
        let mut board = board_3x3();
        let before = board.clone();
        assert!(board.slide(0, 0).is_none());
        assert_eq!(board, before);
    }

    #[test]
    fn test_slide_moves_piece_with_exits() {
        let mut board = board_3x3();
        let exits = board.exits_of(8);
        let mv = board.slide(1, 2).unwrap();
        assert_eq!(mv.tile, 8);
        assert_eq!(mv.to, (2, 2));
        assert_eq!(board.cell(2, 2), 8);
        assert_eq!(board.cell(1, 2), EMPTY);
        assert_eq!(board.exits_at(2, 2), exits);
    }

    #[test]
    fn test_from_parts_validation() {
        let exits: BTreeMap<TileId, Exits> =
            [(1, Exits::from_bits(0xC).unwrap()), (2, Exits::from_bits(3).unwrap())].into();
        assert!(Board::from_parts(3, 1, vec![1, 2, 0], exits.clone()).is_ok());
        assert_eq!(
            Board::from_parts(3, 1, vec![1, 2, 3], exits.clone()),
            Err(LevelError::EmptyCellCount { found: 0 })
        );
        assert_eq!(
            Board::from_parts(3, 1, vec![1, 1, 0], exits.clone()),
            Err(LevelError::DuplicateTile { id: 1 })
        );
        let single: BTreeMap<TileId, Exits> = [(1, Exits::from_bits(8).unwrap())].into();
        assert!(matches!(
            Board::from_parts(2, 1, vec![1, 0], single),
            Err(LevelError::SingleArmTile { index: 0, .. })
        ));
    }

    #[test]
    fn test_oversized_dimensions_are_rejected() {
        assert_eq!(cell_count(3, 1), Ok(3));
        assert!(cell_count(1, 1).is_err());
        assert!(cell_count(0, 7).is_err());
        let huge = LevelError::InvalidDimensions { width: usize::MAX, height: 2 };
        assert_eq!(cell_count(usize::MAX, 2), Err(huge.clone()));
        assert_eq!(Board::default_layout(usize::MAX, 2), Err(huge.clone()));
        assert_eq!(Board::from_parts(usize::MAX, 2, vec![1, 0], BTreeMap::new()), Err(huge));
    }

    #[test]
    fn test_scramble_keeps_single_empty() {
        let mut board = board_3x3();
        let mut rng = Pcg32::seed_from_u64(3);
        let done = board.scramble(40, &mut rng);
        assert_eq!(done, 40);
        assert_eq!(board.empty_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_slide_twice_restores(seed in any::<u64>(), w in 2usize..6, h in 2usize..6, x in 0usize..6, y in 0usize..6) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut board = Board::with_random_exits(w, h, &mut rng).unwrap();
            board.scramble(10, &mut rng);
            let original = board.clone();
            if let Some(mv) = board.slide(x, y) {
                prop_assert_eq!(board.empty_count(), 1);
                let back = board.slide(mv.to.0, mv.to.1);
                prop_assert!(back.is_some());
                prop_assert_eq!(&board, &original);
            } else {
                prop_assert_eq!(&board, &original);
            }
        }

        #[test]
        fn prop_single_empty_survives_random_clicks(seed in any::<u64>(), clicks in prop::collection::vec((0usize..5, 0usize..5), 0..60)) {
            let mut rng = Pcg32::seed_from_u64(seed);
            let mut board = Board::with_random_exits(5, 5, &mut rng).unwrap();
            for (x, y) in clicks {
                board.slide(x, y);
                prop_assert_eq!(board.empty_count(), 1);
            }
        }
    }
}
