//! Error types for the ingestion crate.

use chess_common::ChessError;
use grid_processor::GridProcessorError;
use netcdf_parser::NetCdfError;
use storage::StorageError;
use thiserror::Error;

/// Errors that can occur while running a pipeline stage.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read raster: {0}")]
    Raster(#[from] NetCdfError),

    #[error("Failed to derive grid: {0}")]
    Grid(#[from] GridProcessorError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The expanding search gave up before finding any grid cell.
    #[error(
        "No grid cell found near region {gid} of {boundary} after {attempts} attempts (scale factor {scale_factor})"
    )]
    NearestCellNotFound {
        boundary: String,
        gid: i32,
        attempts: u32,
        scale_factor: f64,
    },

    /// Regions still without an overlap row after processing.
    #[error("{boundary}: {} regions have no overlap row (first: {:?})", missing.len(), missing.first())]
    IncompleteOverlaps { boundary: String, missing: Vec<i32> },

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<ChessError> for IngestionError {
    fn from(err: ChessError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
