//! Pipe Slide - a sliding-tile pipe routing puzzle
//!
//! Core modules:
//! - `sim`: Deterministic simulation (grid, sliding, flow propagation, session state)
//! - `level`: Level strings, solvability check and seeded generation
//! - `geometry`: Pipe polylines for renderers
//! - `settings`: Player preferences

pub mod error;
pub mod geometry;
pub mod level;
pub mod settings;
pub mod sim;

pub use error::LevelError;
pub use level::{Difficulty, Level};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Delay between flow wavefronts (ms)
    pub const FLOW_TICK_MS: u64 = 500;
    /// Movement lock after a slide while the piece settles (ms)
    pub const SLIDE_SETTLE_MS: u64 = 300;

    /// How far a two-arm pipe's control point is pulled toward the tile center
    pub const TURN_CURVATURE: f32 = 0.5;
    /// Default polyline resolution per pipe
    pub const PIPE_SEGMENTS: usize = 24;
}
