//! Seeded level generator
//!
//! Every level is built around a guaranteed route: a shortest faucet-to-goal
//! path, lengthened with detours, whose cells carry exactly the route's
//! connections. All other cells get random multi-arm pieces.

use std::collections::BTreeMap;

use petgraph::algo::astar;
use petgraph::graphmap::UnGraphMap;
use rand::Rng;
use rand::SeedableRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand_pcg::Pcg32;

use super::{Difficulty, Level, encode};
use crate::error::LevelError;
use crate::sim::flow::{self, FlowContext, FlowOutcome, FlowRules};
use crate::sim::{Board, Direction, EMPTY, Endpoint, Exits, TileId};

type Cell = (usize, usize);

/// Number of levels in each built-in pack
pub const PACK_SIZE: usize = 16;

/// Detour insertion attempts per level
const DETOUR_ATTEMPTS: u32 = 200;

/// Regeneration attempts per slot when a batch must survive no-spill rules
const NO_SPILL_ATTEMPTS: u32 = 32;

impl Difficulty {
    /// Fixed seed of the built-in pack for this tier
    pub fn pack_seed(&self) -> u32 {
        match self {
            Difficulty::Easy => 12345,
            Difficulty::Normal => 23456,
            Difficulty::Hard => 34567,
        }
    }

    /// Target route length `(min, max)` in cells for a board of `total` cells
    fn path_range(&self, total: usize) -> (usize, usize) {
        let (min, cap): (usize, usize) = match self {
            Difficulty::Easy => (3, 5),
            Difficulty::Normal => (5, 10),
            Difficulty::Hard => (8, 14),
        };
        let max = cap.min(total.saturating_sub(2));
        if min > max {
            (2usize.max(max.saturating_sub(1)), max)
        } else {
            (min, max)
        }
    }
}

fn step(cell: Cell, dir: Direction, width: usize, height: usize) -> Option<Cell> {
    let (x, y) = dir.step_from(cell.0 as i32, cell.1 as i32);
    (x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height)
        .then_some((x as usize, y as usize))
}

/// In-bounds neighbor directions in left, right, up, down order
fn open_directions(cell: Cell, width: usize, height: usize) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|&d| step(cell, d, width, height).is_some())
        .collect()
}

fn direction_between(a: Cell, b: Cell) -> Option<Direction> {
    Direction::ALL
        .into_iter()
        .find(|&d| d.step_from(a.0 as i32, a.1 as i32) == (b.0 as i32, b.1 as i32))
}

fn perpendicular(dir: Direction) -> [Direction; 2] {
    match dir {
        Direction::Left | Direction::Right => [Direction::Up, Direction::Down],
        _ => [Direction::Left, Direction::Right],
    }
}

/// Random boundary cell on one of the four edges (left, right, top, bottom)
fn edge_cell<R: Rng>(edge: usize, width: usize, height: usize, rng: &mut R) -> Cell {
    match edge {
        0 => (0, rng.random_range(0..height)),
        1 => (width - 1, rng.random_range(0..height)),
        2 => (rng.random_range(0..width), 0),
        _ => (rng.random_range(0..width), height - 1),
    }
}

/// Shortest route over the open grid
fn shortest_path(start: Cell, end: Cell, width: usize, height: usize) -> Option<Vec<Cell>> {
    let mut graph: UnGraphMap<Cell, ()> = UnGraphMap::with_capacity(width * height, 2 * width * height);
    for y in 0..height {
        for x in 0..width {
            graph.add_node((x, y));
            if x + 1 < width {
                graph.add_edge((x, y), (x + 1, y), ());
            }
            if y + 1 < height {
                graph.add_edge((x, y), (x, y + 1), ());
            }
        }
    }
    astar(
        &graph,
        start,
        |cell| cell == end,
        |_| 1usize,
        |(x, y): Cell| x.abs_diff(end.0) + y.abs_diff(end.1),
    )
    .map(|(_, path)| path)
}

/// Splice two-cell bumps into the route until it reaches `min_len`.
///
/// Edge `A -> B` becomes `A -> A' -> B' -> B` with `A'`, `B'` unused cells
/// beside the edge, so consecutive cells stay adjacent.
fn lengthen<R: Rng>(
    path: &mut Vec<Cell>,
    width: usize,
    height: usize,
    (min_len, max_len): (usize, usize),
    rng: &mut R,
) {
    let mut attempts = 0;
    while path.len() < min_len && path.len() + 2 <= max_len && attempts < DETOUR_ATTEMPTS {
        attempts += 1;
        let k = rng.random_range(0..path.len() - 1);
        let (a, b) = (path[k], path[k + 1]);
        let Some(dir) = direction_between(a, b) else {
            continue;
        };
        let mut sides = perpendicular(dir);
        sides.shuffle(rng);
        for side in sides {
            let (Some(a2), Some(b2)) = (step(a, side, width, height), step(b, side, width, height))
            else {
                continue;
            };
            if path.contains(&a2) || path.contains(&b2) {
                continue;
            }
            path.splice(k + 1..k + 1, [a2, b2]);
            break;
        }
    }
}

/// Build one level from the generator stream
pub fn generate_level<R: Rng>(rng: &mut R, difficulty: Difficulty) -> Result<Level, LevelError> {
    let (width, height) = match difficulty {
        Difficulty::Easy => (3, 3),
        Difficulty::Normal => (4, if rng.random_bool(0.5) { 4 } else { 3 }),
        Difficulty::Hard => (5, 5),
    };
    let total = width * height;

    // faucet and goal on different edges
    let faucet_edge = rng.random_range(0..4);
    let goal_edge = (faucet_edge + 1 + rng.random_range(0..3)) % 4;
    let start = edge_cell(faucet_edge, width, height, rng);
    let mut end = edge_cell(goal_edge, width, height, rng);
    if start == end {
        end.0 = if end.0 < width - 1 { end.0 + 1 } else { end.0 - 1 };
    }

    let faucet = Endpoint::on_edge(start.0 as i32, start.1 as i32, width, height);
    let goal = Endpoint::on_edge(end.0 as i32, end.1 as i32, width, height);

    let range = difficulty.path_range(total);
    let mut path = shortest_path(start, end, width, height).unwrap_or_else(|| vec![start, end]);
    lengthen(&mut path, width, height, range, rng);
    // shortest routes fit every tier and bumps stop at the maximum
    debug_assert!(
        path.len() <= range.1,
        "route of {} cells exceeds the {difficulty} maximum of {}",
        path.len(),
        range.1
    );

    let mut bits = vec![Exits::EMPTY; total];
    let idx = |(x, y): Cell| y * width + x;

    // route connections
    for pair in path.windows(2) {
        if let Some(dir) = direction_between(pair[0], pair[1]) {
            bits[idx(pair[0])].insert(dir);
            bits[idx(pair[1])].insert(dir.opposite());
        }
    }
    bits[idx(start)].insert(faucet.side);
    bits[idx(end)].insert(goal.side);

    // everything off the route gets two or three random arms
    for y in 0..height {
        for x in 0..width {
            if path.contains(&(x, y)) {
                continue;
            }
            let mut choices = open_directions((x, y), width, height);
            choices.shuffle(rng);
            let take = 2usize.max(choices.len().min(2 + rng.random_range(0..2)));
            bits[idx((x, y))] = choices.into_iter().take(take).collect();
        }
    }

    for (pos, &cell) in path.iter().enumerate() {
        if !bits[idx(cell)].is_empty() {
            continue;
        }
        let linked: Exits = [pos.checked_sub(1), Some(pos + 1)]
            .into_iter()
            .flatten()
            .filter_map(|p| path.get(p))
            .filter_map(|&other| direction_between(cell, other))
            .collect();
        bits[idx(cell)] = if linked.is_empty() {
            open_directions(cell, width, height).into_iter().take(1).collect()
        } else {
            linked
        };
    }

    // exactly one empty slot, off the route when possible
    let free: Vec<Cell> = (0..total)
        .map(|i| (i % width, i / width))
        .filter(|cell| !path.contains(cell))
        .collect();
    let empty = match free.choose(rng) {
        Some(&cell) => cell,
        None => path[path.len().saturating_sub(2)],
    };
    bits[idx(empty)] = Exits::EMPTY;

    // no single-arm pieces: pair each with a neighbor, never the empty slot
    for i in 0..total {
        if !bits[i].is_single_arm() {
            continue;
        }
        let cell = (i % width, i / width);
        let partner = open_directions(cell, width, height).into_iter().find_map(|d| {
            step(cell, d, width, height)
                .filter(|&n| n != empty && !bits[i].contains(d))
                .map(|n| (d, n))
        });
        if let Some((dir, neighbor)) = partner {
            bits[i].insert(dir);
            bits[idx(neighbor)].insert(dir.opposite());
        }
    }

    let mut cells = Vec::with_capacity(total);
    let mut exits = BTreeMap::new();
    for (i, value) in bits.into_iter().enumerate() {
        if i == idx(empty) {
            cells.push(EMPTY);
        } else {
            let id = i as TileId + 1;
            cells.push(id);
            exits.insert(id, value);
        }
    }
    let board = Board::from_parts(width, height, cells, exits)?;
    Ok(Level {
        board,
        faucet,
        goal,
    })
}

fn wins_without_spill(level: &Level) -> bool {
    let ctx = FlowContext {
        board: &level.board,
        faucet: level.faucet,
        goal: level.goal,
        rules: FlowRules { no_spill: true },
    };
    flow::run_to_completion(&ctx).1 == FlowOutcome::Won
}

/// Generate `count` level strings. The same `(count, difficulty, seed,
/// no_spill)` always yields the same strings.
///
/// With `no_spill` set, a candidate whose unscrambled arrangement would spill
/// is replaced by the next one from the stream.
pub fn generate_batch(count: usize, difficulty: Difficulty, seed: u32, no_spill: bool) -> Vec<String> {
    let mut rng = Pcg32::seed_from_u64(seed as u64);
    let mut out = Vec::with_capacity(count);

    for n in 0..count {
        let mut chosen = None;
        for _ in 0..NO_SPILL_ATTEMPTS {
            match generate_level(&mut rng, difficulty) {
                Ok(level) => {
                    let accept = !no_spill || wins_without_spill(&level);
                    chosen = Some(level);
                    if accept {
                        break;
                    }
                }
                Err(e) => log::warn!("discarding generated {difficulty} level: {e}"),
            }
        }
        match chosen {
            Some(level) => out.push(encode(&level)),
            None => log::warn!("no {difficulty} level for slot {n} (seed {seed})"),
        }
    }

    log::debug!("generated {} {} levels from seed {}", out.len(), difficulty, seed);
    out
}

/// The fixed level pack shipped for a tier
pub fn builtin_pack(difficulty: Difficulty) -> Vec<String> {
    generate_batch(PACK_SIZE, difficulty, difficulty.pack_seed(), false)
}

/// First solvable level of a freshly generated batch, or the straight
/// fallback board when none passes.
pub fn pick_level(
    difficulty: Difficulty,
    seed: u32,
    no_spill: bool,
    batch: usize,
) -> Result<Level, LevelError> {
    let found = generate_batch(batch, difficulty, seed, no_spill)
        .iter()
        .filter_map(|text| text.parse::<Level>().ok())
        .find(Level::is_solvable);
    match found {
        Some(level) => {
            log::info!("picked {difficulty} level {level}");
            Ok(level)
        }
        None => {
            log::warn!("no solvable {difficulty} level from seed {seed}, using straight board");
            let size = difficulty.fallback_size();
            Level::straight(size, size)
        }
    }
}
