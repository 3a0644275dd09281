//! Common test fixtures for grid and boundary tests.
//!
//! Regions are built in projected metres on the same 1km spacing as
//! [`crate::km_axes`], so a cell `(row, col)` spans
//! `[col*1000, (col+1)*1000] x [row*1000, (row+1)*1000]`.

use geo::{coord, LineString, MultiPolygon, Polygon};

/// Axis-aligned rectangle polygon.
pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            coord! { x: min_x, y: min_y },
            coord! { x: max_x, y: min_y },
            coord! { x: max_x, y: max_y },
            coord! { x: min_x, y: max_y },
            coord! { x: min_x, y: min_y },
        ]),
        vec![],
    )
}

/// Square region of side `size` with its lower-left corner at `(x, y)`.
pub fn square_region(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![rect(x, y, x + size, y + size)])
}

/// Region strictly inside cells `(row, col)` and `(row, col + 1)`, touching
/// no other cell.
pub fn two_cell_region(row: usize, col: usize) -> MultiPolygon<f64> {
    let (x, y) = (col as f64 * 1000.0, row as f64 * 1000.0);
    MultiPolygon::new(vec![rect(x + 250.0, y + 250.0, x + 1750.0, y + 750.0)])
}

/// Region strictly inside cell `(row, col)`.
pub fn one_cell_region(row: usize, col: usize) -> MultiPolygon<f64> {
    let (x, y) = (col as f64 * 1000.0, row as f64 * 1000.0);
    MultiPolygon::new(vec![rect(x + 100.0, y + 100.0, x + 900.0, y + 900.0)])
}
