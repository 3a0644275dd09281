//! Error types shared by the grid builder crates.

use thiserror::Error;

/// Result type alias using ChessError.
pub type ChessResult<T> = Result<T, ChessError>;

/// Errors raised while constructing or validating shared types.
#[derive(Debug, Error)]
pub enum ChessError {
    #[error("Invalid coordinate axes: {0}")]
    InvalidAxes(String),

    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),

    #[error("Unknown coastal classification value: {0}")]
    UnknownCoastalValue(i32),

    #[error("Unknown coastal classification label: {0}")]
    UnknownCoastalLabel(String),

    #[error("Cell ({row}, {col}) is flagged in both bias-corrected and non-bias-corrected sources")]
    AmbiguousSource { row: usize, col: usize },

    #[error("Invalid identifier '{0}': only lowercase letters, digits and '_' are allowed")]
    InvalidIdentifier(String),

    #[error("Unknown boundary: {0}")]
    UnknownBoundary(String),
}
