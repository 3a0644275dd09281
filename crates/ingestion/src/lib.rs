//! Pipeline stages of the CHESS-SCAPE grid builder.
//!
//! This crate wires the pure grid derivation to the stores:
//! - [`GridBuilder`]: raster pair → labelled grid → grid table
//! - [`OverlapResolver`]: per-boundary overlap tables with nearest-cell fallback
//! - [`CoastalTagger`]: `is_coastal` flag on boundary tables
//! - [`BoundaryDetailsWriter`]: the `boundary_details` registry table
//!
//! Stages take their store as a trait object, so the same code runs against
//! PostGIS and the in-memory store.

pub mod coastal;
pub mod config;
pub mod details;
pub mod error;
pub mod grid;
pub mod overlap;
pub mod report;

pub use coastal::CoastalTagger;
pub use config::{select_boundaries, CoastalTagConfig, NearestSearchConfig};
pub use details::BoundaryDetailsWriter;
pub use error::{IngestionError, Result};
pub use grid::{summarize, GridBuilder, RasterSources};
pub use overlap::OverlapResolver;
pub use report::{BoundaryOverlapReport, CoastalTagReport, FallbackRecord, GridBuildReport, OverlapReport};
