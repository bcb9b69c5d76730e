//! Flow propagation
//!
//! Water spreads as a breadth-first wave, one wavefront per tick. Every tick
//! reads the previous [`FlowState`] snapshot and returns a new one, so sibling
//! tiles in the same wavefront never observe each other's additions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::direction::Direction;
use super::grid::{Board, EMPTY, Endpoint, TileId};

/// Ruleset switches for a flow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowRules {
    /// Any water leaving the pipe network loses the run
    pub no_spill: bool,
}

/// Water leaving the network at `(x, y)`, travelling in from `incoming`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spill {
    pub x: i32,
    pub y: i32,
    pub incoming: Direction,
}

/// Faucet state, independent of flow ticking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaucetStatus {
    /// Ready to open
    #[default]
    Closed,
    /// The faucet cell has no exit on the faucet side
    Blocked,
    /// Flow started; cannot be closed until the board is reset
    Open,
}

impl FaucetStatus {
    /// Closed or blocked, depending on the piece in front of the faucet
    pub fn evaluate(board: &Board, faucet: &Endpoint) -> Self {
        if board.exits_at(faucet.x, faucet.y).contains(faucet.side) {
            FaucetStatus::Closed
        } else {
            FaucetStatus::Blocked
        }
    }
}

/// Immutable snapshot of one flow run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    flowing: BTreeSet<TileId>,
    incoming: BTreeMap<TileId, Direction>,
    spills: Vec<Spill>,
    goal_reached: bool,
    ticks: u32,
}

impl FlowState {
    pub fn is_flowing(&self, id: TileId) -> bool {
        self.flowing.contains(&id)
    }

    /// Direction water first entered `id` from (`None` if dry)
    pub fn incoming(&self, id: TileId) -> Direction {
        self.incoming.get(&id).copied().unwrap_or(Direction::None)
    }

    pub fn flowing(&self) -> impl Iterator<Item = TileId> + '_ {
        self.flowing.iter().copied()
    }

    pub fn flowing_count(&self) -> usize {
        self.flowing.len()
    }

    pub fn spills(&self) -> &[Spill] {
        &self.spills
    }

    pub fn spilled(&self) -> bool {
        !self.spills.is_empty()
    }

    /// Water has left the board through the goal's external point
    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    /// Ticks processed so far
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    fn record_spill(&mut self, spill: Spill) -> bool {
        if self.spills.iter().any(|s| s.x == spill.x && s.y == spill.y) {
            return false;
        }
        self.spills.push(spill);
        true
    }
}

/// Everything a tick reads besides the flow snapshot
#[derive(Debug, Clone, Copy)]
pub struct FlowContext<'a> {
    pub board: &'a Board,
    pub faucet: Endpoint,
    pub goal: Endpoint,
    pub rules: FlowRules,
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub state: FlowState,
    /// At least one tile started flowing
    pub advanced: bool,
    /// Tiles that started flowing this tick, in scan order
    pub new_tiles: Vec<TileId>,
    /// Spills first recorded this tick
    pub new_spills: Vec<Spill>,
}

/// How a completed run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowOutcome {
    Won,
    Lost,
}

/// Open the faucet: the piece in front of it starts flowing, provided it has
/// an exit on the faucet side. `None` means the faucet is blocked.
pub fn start(ctx: &FlowContext) -> Option<FlowState> {
    let faucet = ctx.faucet;
    let id = ctx.board.tile_at(faucet.x, faucet.y)?;
    if !ctx.board.exits_of(id).contains(faucet.side) {
        return None;
    }
    let mut state = FlowState::default();
    state.flowing.insert(id);
    state.incoming.insert(id, faucet.side);
    Some(state)
}

/// Advance the wavefront by one step
pub fn tick(ctx: &FlowContext, prev: &FlowState) -> TickOutcome {
    let board = ctx.board;
    let goal_exit = ctx.goal.external_point();
    let faucet_exit = ctx.faucet.external_point();

    let mut next = prev.clone();
    let mut new_tiles = Vec::new();
    let mut new_spills = Vec::new();

    for y in 0..board.height() {
        for x in 0..board.width() {
            let id = board.cell(x, y);
            if id == EMPTY || !prev.is_flowing(id) {
                continue;
            }

            for dir in board.exits_of(id).iter() {
                let (nx, ny) = dir.step_from(x as i32, y as i32);
                let entry = dir.opposite();
                let in_bounds =
                    nx >= 0 && ny >= 0 && (nx as usize) < board.width() && (ny as usize) < board.height();

                if in_bounds {
                    let neighbor = board.tile_at(nx, ny);
                    match neighbor.filter(|&n| board.exits_of(n).contains(entry)) {
                        Some(n) => {
                            if !prev.is_flowing(n) && next.flowing.insert(n) {
                                next.incoming.insert(n, entry);
                                new_tiles.push(n);
                            }
                        }
                        None if ctx.rules.no_spill => {
                            let spill = Spill { x: nx, y: ny, incoming: entry };
                            if next.record_spill(spill) {
                                new_spills.push(spill);
                            }
                        }
                        None => {}
                    }
                    continue;
                }

                if (nx, ny) == goal_exit {
                    next.goal_reached = true;
                    continue;
                }
                if ctx.rules.no_spill && (nx, ny) != faucet_exit {
                    let spill = Spill { x: nx, y: ny, incoming: entry };
                    if next.record_spill(spill) {
                        new_spills.push(spill);
                    }
                }
            }
        }
    }

    next.ticks += 1;
    log::debug!(
        "flow tick {}: +{} tiles, +{} spills",
        next.ticks,
        new_tiles.len(),
        new_spills.len()
    );

    TickOutcome {
        state: next,
        advanced: !new_tiles.is_empty(),
        new_tiles,
        new_spills,
    }
}

/// The piece on the goal cell is flowing and open toward the goal edge
pub fn is_goal_reached(ctx: &FlowContext, state: &FlowState) -> bool {
    let goal = ctx.goal;
    ctx.board
        .tile_at(goal.x, goal.y)
        .is_some_and(|id| ctx.board.exits_of(id).contains(goal.side) && state.is_flowing(id))
}

/// Final verdict once a tick stops advancing
pub fn conclude(ctx: &FlowContext, state: &FlowState) -> FlowOutcome {
    let reached = state.goal_reached() || is_goal_reached(ctx, state);
    let spoiled = ctx.rules.no_spill && state.spilled();
    if reached && !spoiled {
        FlowOutcome::Won
    } else {
        FlowOutcome::Lost
    }
}

/// Run a whole flow synchronously: start, tick until nothing advances, conclude.
/// A blocked faucet loses immediately with an empty state.
pub fn run_to_completion(ctx: &FlowContext) -> (FlowState, FlowOutcome) {
    let Some(mut state) = start(ctx) else {
        return (FlowState::default(), FlowOutcome::Lost);
    };
    loop {
        let outcome = tick(ctx, &state);
        state = outcome.state;
        if !outcome.advanced {
            break;
        }
    }
    let verdict = conclude(ctx, &state);
    (state, verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use proptest::prelude::*;

    fn ctx_for(level: &Level, no_spill: bool) -> FlowContext<'_> {
        FlowContext {
            board: &level.board,
            faucet: level.faucet,
            goal: level.goal,
            rules: FlowRules { no_spill },
        }
    }

    #[test]
    fn test_straight_connector_reaches_goal() {
        // two horizontal pipes from the left faucet to the right goal
        let level: Level = "2 2 0 0 1 0 C C 0 3".parse().unwrap();
        let ctx = ctx_for(&level, false);

        let state = start(&ctx).unwrap();
        assert!(state.is_flowing(1));
        assert_eq!(state.incoming(1), Direction::Left);

        let first = tick(&ctx, &state);
        assert!(first.advanced);
        assert_eq!(first.new_tiles, vec![2]);
        assert_eq!(first.state.incoming(2), Direction::Left);

        let second = tick(&ctx, &first.state);
        assert!(!second.advanced);
        assert!(second.state.goal_reached());
        assert!(is_goal_reached(&ctx, &second.state));
        assert_eq!(conclude(&ctx, &second.state), FlowOutcome::Won);
    }

    #[test]
    fn test_blocked_faucet_never_starts() {
        // first piece is a vertical pipe, no exit toward the left faucet
        let level: Level = "2 2 0 0 1 0 3 C 0 3".parse().unwrap();
        let ctx = ctx_for(&level, false);
        assert!(start(&ctx).is_none());
        assert_eq!(FaucetStatus::evaluate(ctx.board, &ctx.faucet), FaucetStatus::Blocked);
        let (state, outcome) = run_to_completion(&ctx);
        assert_eq!(state.flowing_count(), 0);
        assert_eq!(outcome, FlowOutcome::Lost);
    }

    #[test]
    fn test_dead_end_loses_without_spill_rules() {
        // second piece is vertical: water stops at the first pipe
        let level: Level = "2 2 0 0 1 0 C 3 0 3".parse().unwrap();
        let ctx = ctx_for(&level, false);
        let (state, outcome) = run_to_completion(&ctx);
        assert_eq!(state.flowing_count(), 1);
        assert!(state.spills().is_empty());
        assert_eq!(outcome, FlowOutcome::Lost);
    }

    #[test]
    fn test_no_spill_records_spill_into_mismatched_neighbor() {
        let level: Level = "2 2 0 0 1 0 C 3 0 3".parse().unwrap();
        let ctx = ctx_for(&level, true);
        let state = start(&ctx).unwrap();
        let outcome = tick(&ctx, &state);
        assert!(!outcome.advanced);
        assert_eq!(
            outcome.new_spills,
            vec![Spill { x: 1, y: 0, incoming: Direction::Left }]
        );
        // the left exit points back into the faucet and never spills
        assert_eq!(outcome.state.spills().len(), 1);
        assert_eq!(conclude(&ctx, &outcome.state), FlowOutcome::Lost);
    }

    #[test]
    fn test_no_spill_side_branch_loses_even_when_goal_reached() {
        // second piece is a T open downward into the empty cell
        let level: Level = "2 2 0 0 1 0 C D 3 0".parse().unwrap();
        let lenient = ctx_for(&level, false);
        assert_eq!(run_to_completion(&lenient).1, FlowOutcome::Won);

        let strict = ctx_for(&level, true);
        let (state, outcome) = run_to_completion(&strict);
        assert!(state.goal_reached());
        assert_eq!(state.spills(), &[Spill { x: 1, y: 1, incoming: Direction::Up }]);
        assert_eq!(outcome, FlowOutcome::Lost);
    }

    #[test]
    fn test_off_board_spill_is_deduplicated() {
        // cross piece at the faucet: up exit leaves the board away from the goal
        let level: Level = "2 2 0 0 1 0 F C 0 3".parse().unwrap();
        let ctx = ctx_for(&level, true);
        let (state, outcome) = run_to_completion(&ctx);
        let off_board: Vec<_> = state.spills().iter().filter(|s| s.y < 0).collect();
        assert_eq!(off_board.len(), 1);
        assert_eq!(off_board[0].incoming, Direction::Down);
        assert_eq!(outcome, FlowOutcome::Lost);
    }

    #[test]
    fn test_wavefront_commits_atomically() {
        // top row of three horizontal pipes, vertical pipes and the gap below
        let level: Level = "3 2 0 0 2 0 C C C 3 3 0".parse().unwrap();
        let ctx = ctx_for(&level, false);
        let state = start(&ctx).unwrap();
        let one = tick(&ctx, &state);
        assert_eq!(one.new_tiles, vec![2]);
        assert!(!one.state.is_flowing(3));
        let two = tick(&ctx, &one.state);
        assert_eq!(two.new_tiles, vec![3]);
    }

    proptest! {
        #[test]
        fn prop_flow_is_monotonic(seed in any::<u32>(), no_spill in any::<bool>()) {
            let levels = crate::level::generate_batch(1, crate::level::Difficulty::Normal, seed, false);
            let level: Level = levels[0].parse().unwrap();
            let ctx = ctx_for(&level, no_spill);
            if let Some(mut state) = start(&ctx) {
                loop {
                    let outcome = tick(&ctx, &state);
                    for id in state.flowing() {
                        prop_assert!(outcome.state.is_flowing(id));
                    }
                    prop_assert!(outcome.state.spills().len() >= state.spills().len());
                    state = outcome.state;
                    if !outcome.advanced {
                        break;
                    }
                }
            }
        }
    }
}
