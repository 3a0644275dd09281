//! Tests against real CHESS-SCAPE files.
//!
//! These are skipped unless the files are available under `TEST_DATA_DIR` or
//! `crates/netcdf-parser/testdata/`.

use chess_common::RasterKind;
use netcdf_parser::{read_presence_raster, read_raster_pair, ReadOptions};
use test_utils::{require_test_file, require_test_files};

const BIAS_CORRECTED: &str = "chess-scape_rcp60_bias-corrected_01_tas_uk_1km_annual_19801201-20801130.nc";
const NON_BIAS_CORRECTED: &str = "chess-scape_rcp60_01_tas_uk_1km_annual_19801201-20801130.nc";

#[test]
fn test_bias_corrected_raster_shape() {
    let path = require_test_file!(BIAS_CORRECTED);
    let raster = read_presence_raster(&path, RasterKind::BiasCorrected, &ReadOptions::default())
        .expect("Failed to read raster");

    // 1km grid over the UK
    assert_eq!(raster.width(), 656);
    assert_eq!(raster.height(), 1057);
    assert_eq!(raster.axes.dx(), 1000.0);
    assert!(raster.present_count() > 0);
    assert!(raster.present_count() < raster.width() * raster.height());
}

#[test]
fn test_pair_shares_axes() {
    let paths = require_test_files!(BIAS_CORRECTED, NON_BIAS_CORRECTED);
    let rasters = read_raster_pair(&paths[0], &paths[1], &ReadOptions::default())
        .expect("Failed to read raster pair");

    assert_eq!(rasters.len(), 2);
    assert_eq!(rasters[0].axes, rasters[1].axes);
    assert_eq!(rasters[1].kind, RasterKind::NonBiasCorrected);
}

#[test]
fn test_unknown_variable_is_rejected() {
    let path = require_test_file!(BIAS_CORRECTED);
    let options = ReadOptions {
        variable: "not_a_variable".to_string(),
        time_index: 0,
    };
    assert!(read_presence_raster(&path, RasterKind::BiasCorrected, &options).is_err());
}
