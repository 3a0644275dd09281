//! Labelled grid derivation for the CHESS-SCAPE 1km raster.
//!
//! This crate is the pure, I/O-free core of the grid builder:
//!
//! ```text
//! raster pair ──► MaskBuilder ──► LabelledGrid
//!                                     │
//!                                     ├─► CoastalClassifier ──► CoastalMask
//!                                     │                              │
//!                                     └──────► GridMaterializer ◄────┘
//!                                                    │
//!                                                    ▼
//!                                             Vec<GridCellRow>
//! ```
//!
//! Each stage takes the previous stage's output by reference and returns a
//! new value, so stages can be tested in isolation.
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{derive_grid, GridProcessorConfig};
//!
//! let rasters = netcdf_parser::read_raster_pair(&bias, &non_bias, &Default::default())?;
//! let derived = derive_grid(&rasters, &GridProcessorConfig::default())?;
//! println!("{} cells", derived.rows.len());
//! ```

pub mod coastal;
pub mod config;
pub mod error;
pub mod mask;
pub mod materialize;
pub mod types;

// Re-export commonly used types at crate root
pub use coastal::{
    classify, coastline_mask, fill_holes, fill_small_holes, inland_band, neighbour_count,
    squared_distance_to_water, CoastalClassifier,
};
pub use config::{Connectivity, GridProcessorConfig, RestrictionRegion};
pub use error::{GridProcessorError, Result};
pub use mask::{build_labelled_mask, MaskBuilder};
pub use materialize::{polygon_wkt, GridCellRow, GridMaterializer};
pub use types::{CoastalMask, LabelledGrid, LandMask, Mask};

use chess_common::PresenceRaster;

/// All intermediate products of one grid derivation.
#[derive(Debug, Clone)]
pub struct DerivedGrid {
    pub labelled: LabelledGrid,
    pub coastal: CoastalMask,
    pub rows: Vec<GridCellRow>,
}

/// Run mask building, coastal classification and materialization.
pub fn derive_grid(rasters: &[PresenceRaster], config: &GridProcessorConfig) -> Result<DerivedGrid> {
    let labelled = build_labelled_mask(rasters, config)?;
    let coastal = CoastalClassifier::from_config(config).classify(&labelled.land_mask());
    let rows = GridMaterializer.rows(&labelled, &coastal)?;

    Ok(DerivedGrid {
        labelled,
        coastal,
        rows,
    })
}
