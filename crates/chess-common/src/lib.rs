//! Common types shared across the CHESS-SCAPE grid builder crates.

pub mod bbox;
pub mod boundary;
pub mod cell;
pub mod error;
pub mod grid;
pub mod raster;

pub use bbox::BoundingBox;
pub use boundary::{default_boundaries, validate_identifier, BoundaryDefinition, QueryMethod};
pub use cell::{CellSource, CoastalClass};
pub use error::{ChessError, ChessResult};
pub use grid::{cell_polygon, GridAxes};
pub use raster::{PresenceRaster, RasterKind};

/// SRID of the British National Grid, used for every persisted geometry.
pub const BRITISH_NATIONAL_GRID: i32 = 27700;
