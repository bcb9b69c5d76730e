//! Level validation errors

/// Reasons a level string or raw board is rejected.
///
/// A rejected level never replaces the one currently loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    #[error("level string too short: {found} tokens (need at least 3)")]
    TooFewTokens { found: usize },
    #[error("expected a number, got {token:?}")]
    InvalidNumber { token: String },
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    #[error("level string missing cells: expected {expected}, got {found}")]
    MissingCells { expected: usize, found: usize },
    #[error("level must contain exactly one empty cell, found {found}")]
    EmptyCellCount { found: usize },
    #[error("single-arm pipe {token:?} at cell {index}")]
    SingleArmTile { token: String, index: usize },
    #[error("invalid cell token {token:?} at cell {index}")]
    InvalidCell { token: String, index: usize },
    #[error("tile {id} appears more than once")]
    DuplicateTile { id: u32 },
}
