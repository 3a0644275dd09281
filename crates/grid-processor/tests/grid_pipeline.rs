//! End-to-end tests of the raster pair → grid rows pipeline on synthetic data.

use chess_common::{CellSource, CoastalClass, GridAxes, PresenceRaster, RasterKind};
use geo::{Area, BoundingRect};
use grid_processor::{
    derive_grid, GridProcessorConfig, GridProcessorError, MaskBuilder, RestrictionRegion,
};
use test_utils::{assert_approx_eq, island_mask, km_axes, scattered_mask};

const WIDTH: usize = 40;
const HEIGHT: usize = 30;

fn axes() -> GridAxes {
    let (x, y) = km_axes(WIDTH, HEIGHT);
    GridAxes::new(x, y).unwrap()
}

/// Bias-corrected island in the middle, scattered non-bias-corrected cells
/// everywhere, restriction region over the top-left 6x6 corner.
fn scenario() -> (Vec<PresenceRaster>, GridProcessorConfig) {
    let bias = island_mask(WIDTH, HEIGHT, 8);
    let non_bias = scattered_mask(WIDTH, HEIGHT, 0.5, 42);

    let rasters = vec![
        PresenceRaster::new(RasterKind::BiasCorrected, axes(), bias).unwrap(),
        PresenceRaster::new(RasterKind::NonBiasCorrected, axes(), non_bias).unwrap(),
    ];

    let config = GridProcessorConfig {
        restriction_regions: vec![RestrictionRegion {
            name: "corner".to_string(),
            provenance: "test".to_string(),
            vertices: vec![[0.0, 0.0], [5.0, 0.0], [5.0, 5.0], [0.0, 5.0]],
        }],
        ..Default::default()
    };

    (rasters, config)
}

// ============================================================================
// Labelled mask
// ============================================================================

#[test]
fn test_label_matches_source_flags() {
    let (rasters, config) = scenario();
    let builder = MaskBuilder::new(&config).unwrap();
    let labelled = builder.build(&rasters).unwrap();
    let values = labelled.label_values();

    for row in 0..HEIGHT {
        for col in 0..WIDTH {
            let value = *values.get(row, col);
            assert!(value <= 2);

            let bias = rasters[0].is_present(row, col);
            let restricted = rasters[1].is_present(row, col) && builder.in_restriction(row, col);
            assert_eq!(value == 1, bias && !restricted, "cell ({}, {})", row, col);
            assert_eq!(value == 2, restricted, "cell ({}, {})", row, col);
        }
    }
}

#[test]
fn test_non_bias_cells_outside_regions_are_dropped() {
    let (rasters, config) = scenario();
    let derived = derive_grid(&rasters, &config).unwrap();

    for (row, col, source) in derived.labelled.mask.indexed() {
        if *source == CellSource::NonBiasCorrected {
            assert!(row <= 5 && col <= 5, "cell ({}, {})", row, col);
        }
    }
}

#[test]
fn test_single_raster_is_a_configuration_error() {
    let (mut rasters, config) = scenario();
    rasters.truncate(1);
    assert!(matches!(
        derive_grid(&rasters, &config),
        Err(GridProcessorError::RasterCount(1))
    ));
}

// ============================================================================
// Materialized rows
// ============================================================================

#[test]
fn test_rows_cover_exactly_the_cells_with_data() {
    let (rasters, config) = scenario();
    let derived = derive_grid(&rasters, &config).unwrap();

    let expected = derived.labelled.mask.count(|s| s.has_data());
    assert_eq!(derived.rows.len(), expected);

    for row in &derived.rows {
        let (r, c) = derived.labelled.axes.cell_position(row.grid_cell_id).unwrap();
        let source = *derived.labelled.mask.get(r, c);
        assert_ne!(source, CellSource::NoData);
        assert_eq!(Some(row.bias_corrected), source.bias_corrected());
        assert_ne!(row.coastal, CoastalClass::Ocean);
    }
}

#[test]
fn test_cell_area_and_shared_edges() {
    let (rasters, config) = scenario();
    let derived = derive_grid(&rasters, &config).unwrap();
    let axes = &derived.labelled.axes;

    for row in &derived.rows {
        assert_approx_eq!(row.polygon.unsigned_area(), (axes.dx() * axes.dy()).abs(), 1e-9);
    }

    let by_id: std::collections::HashMap<i64, _> = derived
        .rows
        .iter()
        .map(|row| (row.grid_cell_id, row.polygon.bounding_rect().unwrap()))
        .collect();

    for (&id, rect) in &by_id {
        let right = by_id.get(&(id + 1)).filter(|_| (id + 1) % WIDTH as i64 != 0);
        if let Some(right) = right {
            assert_eq!(rect.max().x, right.min().x);
            assert_eq!(rect.min().y, right.min().y);
        }
        if let Some(below) = by_id.get(&(id + WIDTH as i64)) {
            assert_eq!(rect.max().y, below.min().y);
            assert_eq!(rect.min().x, below.min().x);
        }
    }
}

#[test]
fn test_coastal_labels_on_island() {
    let (rasters, config) = scenario();
    let derived = derive_grid(&rasters, &config).unwrap();

    // Island spans rows 8..=21, cols 8..=31.
    assert_eq!(*derived.coastal.get(8, 20), CoastalClass::Coastline);
    assert_eq!(*derived.coastal.get(10, 20), CoastalClass::Within10Km);
    assert_eq!(*derived.coastal.get(15, 20), CoastalClass::Within10Km);
    assert_eq!(*derived.coastal.get(0, 39), CoastalClass::Ocean);
}

#[test]
fn test_rebuild_is_identical() {
    let (rasters, config) = scenario();
    let first = derive_grid(&rasters, &config).unwrap();
    let second = derive_grid(&rasters, &config).unwrap();

    assert_eq!(first.rows, second.rows);
    let wkt = |rows: &[grid_processor::GridCellRow]| -> Vec<String> {
        rows.iter().map(|r| r.ewkt(27700)).collect()
    };
    assert_eq!(wkt(&first.rows), wkt(&second.rows));
}
