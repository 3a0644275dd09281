//! NetCDF reader for CHESS-SCAPE climate projections.
//!
//! This crate reads NetCDF-4 files with the native `netcdf` library and
//! reduces them to [`PresenceRaster`]s: a data/no-data flag per 1km cell plus
//! the `x`/`y` coordinate axes on the British National Grid (EPSG:27700).
//!
//! # CHESS-SCAPE Data Structure
//!
//! Each file holds one variable (e.g. `tas`) for one scenario, ensemble member
//! and aggregation period, dimensioned `(time, y, x)`. Cells over the sea and
//! outside the modelled domain hold the fill value. The bias-corrected and
//! non-bias-corrected products share one grid but differ in coverage.

pub mod error;
pub mod native;

use std::path::Path;

use chess_common::{PresenceRaster, RasterKind};

pub use error::{NetCdfError, NetCdfResult};
pub use native::{parse_time_origin, presence_flags, read_presence_raster, silence_hdf5_errors, ReadOptions};

/// Read the bias-corrected and non-bias-corrected rasters for one variable.
///
/// Both files are fully read and closed before returning.
pub fn read_raster_pair(
    bias_corrected: &Path,
    non_bias_corrected: &Path,
    options: &ReadOptions,
) -> NetCdfResult<Vec<PresenceRaster>> {
    Ok(vec![
        read_presence_raster(bias_corrected, RasterKind::BiasCorrected, options)?,
        read_presence_raster(non_bias_corrected, RasterKind::NonBiasCorrected, options)?,
    ])
}
