//! Deterministic simulation module
//!
//! All puzzle logic lives here. This module must be pure and deterministic:
//! - Simulated clock only (timers are fired by the caller)
//! - Seeded RNG only
//! - Stable iteration order (row-major cells, ordered maps by tile ID)
//! - No rendering or platform dependencies

pub mod direction;
pub mod flow;
pub mod grid;
pub mod state;
pub mod tick;

pub use direction::{Direction, Exits};
pub use flow::{FaucetStatus, FlowContext, FlowOutcome, FlowRules, FlowState, Spill, TickOutcome};
pub use grid::{Board, EMPTY, Endpoint, SlideMove, TileId, cell_count, default_grid, edge_side};
pub use state::{GameEvent, Phase, PuzzleState, Snapshot, TileView, TimerHandle};
pub use tick::{TickInput, tick};
