//! Error types for grid processing.

use chess_common::ChessError;
use thiserror::Error;

/// Errors that can occur while deriving the labelled grid.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The run did not supply one raster per source.
    #[error("expected 2 rasters (bias-corrected and non-bias-corrected), got {0}")]
    RasterCount(usize),

    /// The two rasters do not describe the same grid.
    #[error("raster shapes differ: {bias:?} vs {non_bias:?}")]
    ShapeMismatch {
        bias: (usize, usize),
        non_bias: (usize, usize),
    },

    /// A cell has data in both sources.
    #[error("cell ({row}, {col}) has data in both bias-corrected and non-bias-corrected rasters")]
    AmbiguousSource { row: usize, col: usize },

    /// Axes unusable for cell geometry.
    #[error("invalid axes: {0}")]
    InvalidAxes(String),
}

impl GridProcessorError {
    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<ChessError> for GridProcessorError {
    fn from(err: ChessError) -> Self {
        match err {
            ChessError::AmbiguousSource { row, col } => Self::AmbiguousSource { row, col },
            ChessError::InvalidAxes(msg) => Self::InvalidAxes(msg),
            other => Self::Config(other.to_string()),
        }
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
