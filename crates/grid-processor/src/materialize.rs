//! Conversion of the classified grid into persistable cell rows.

use std::fmt::Write;

use geo::Polygon;
use tracing::{debug, instrument};

use chess_common::{cell_polygon, CellSource, CoastalClass};

use crate::error::{GridProcessorError, Result};
use crate::types::{CoastalMask, LabelledGrid};

/// One row of the grid table.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCellRow {
    pub grid_cell_id: i64,
    pub polygon: Polygon<f64>,
    pub bias_corrected: bool,
    pub coastal: CoastalClass,
}

impl GridCellRow {
    /// `POLYGON((x y, ...))` for the cell rectangle.
    pub fn wkt(&self) -> String {
        polygon_wkt(&self.polygon)
    }

    /// `SRID=<srid>;POLYGON(...)`, as accepted by PostGIS geometry input.
    pub fn ewkt(&self, srid: i32) -> String {
        format!("SRID={};{}", srid, self.wkt())
    }
}

/// Turns a labelled grid and its coastal classes into cell rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct GridMaterializer;

impl GridMaterializer {
    /// One row per cell with data, in `grid_cell_id` order.
    ///
    /// Cells with no data are skipped. Ocean cells with data cannot occur
    /// since the coastal classes are derived from the same mask; such a pair
    /// is rejected as a shape error.
    #[instrument(skip_all)]
    pub fn rows(&self, grid: &LabelledGrid, coastal: &CoastalMask) -> Result<Vec<GridCellRow>> {
        if grid.mask.shape() != coastal.shape() {
            return Err(GridProcessorError::config(format!(
                "coastal mask shape {:?} does not match labelled mask {:?}",
                coastal.shape(),
                grid.mask.shape()
            )));
        }

        let (height, width) = grid.mask.shape();
        if (height, width) != (grid.axes.height(), grid.axes.width()) {
            return Err(GridProcessorError::InvalidAxes(format!(
                "axes are {}x{} but mask is {}x{}",
                grid.axes.width(),
                grid.axes.height(),
                width,
                height
            )));
        }

        let x_edges = grid.axes.x_edges();
        let y_edges = grid.axes.y_edges();

        let mut rows = Vec::with_capacity(grid.mask.count(|s| s.has_data()));
        for (row, col, source) in grid.mask.indexed() {
            let bias_corrected = match source {
                CellSource::NoData => continue,
                CellSource::BiasCorrected => true,
                CellSource::NonBiasCorrected => false,
            };

            let coastal_class = *coastal.get(row, col);
            if coastal_class == CoastalClass::Ocean {
                return Err(GridProcessorError::config(format!(
                    "cell ({}, {}) has data but is classified as ocean",
                    row, col
                )));
            }

            rows.push(GridCellRow {
                grid_cell_id: grid.axes.cell_id(row, col),
                polygon: cell_polygon(&x_edges, &y_edges, row, col),
                bias_corrected,
                coastal: coastal_class,
            });
        }

        debug!(rows = rows.len(), "Materialized grid cells");
        Ok(rows)
    }
}

/// Format a polygon as WKT. Coordinates use Rust's shortest round-trip
/// float formatting, so identical input yields identical text.
pub fn polygon_wkt(polygon: &Polygon<f64>) -> String {
    let mut out = String::from("POLYGON(");
    let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());

    for (i, ring) in rings.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('(');
        for (j, coord) in ring.coords().enumerate() {
            if j > 0 {
                out.push(',');
            }
            let _ = write!(out, "{} {}", coord.x, coord.y);
        }
        out.push(')');
    }

    out.push(')');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mask;
    use chess_common::GridAxes;

    fn grid(width: usize, height: usize, sources: Vec<CellSource>) -> LabelledGrid {
        LabelledGrid {
            axes: GridAxes::regular(width, height, 500.0, 500.0, 1000.0, 1000.0).unwrap(),
            mask: Mask::from_vec(width, height, sources).unwrap(),
        }
    }

    #[test]
    fn test_polygon_wkt() {
        let axes = GridAxes::regular(2, 2, 500.0, 500.0, 1000.0, 1000.0).unwrap();
        let polygon = cell_polygon(&axes.x_edges(), &axes.y_edges(), 0, 1);
        assert_eq!(
            polygon_wkt(&polygon),
            "POLYGON((1000 0,2000 0,2000 1000,1000 1000,1000 0))"
        );
    }

    #[test]
    fn test_rows_skip_cells_without_data() {
        use CellSource::*;
        let grid = grid(3, 1, vec![BiasCorrected, NoData, NonBiasCorrected]);
        let coastal = Mask::from_vec(
            3,
            1,
            vec![CoastalClass::Coastline, CoastalClass::Ocean, CoastalClass::Within10Km],
        )
        .unwrap();

        let rows = GridMaterializer.rows(&grid, &coastal).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].grid_cell_id, 0);
        assert!(rows[0].bias_corrected);
        assert_eq!(rows[1].grid_cell_id, 2);
        assert!(!rows[1].bias_corrected);
        assert_eq!(rows[1].coastal, CoastalClass::Within10Km);
        assert_eq!(
            rows[1].ewkt(27700),
            "SRID=27700;POLYGON((2000 0,3000 0,3000 1000,2000 1000,2000 0))"
        );
    }

    #[test]
    fn test_rows_reject_mismatched_masks() {
        let grid = grid(2, 1, vec![CellSource::BiasCorrected; 2]);
        let coastal = Mask::filled(1, 2, CoastalClass::Land);
        assert!(GridMaterializer.rows(&grid, &coastal).is_err());

        let ocean = Mask::filled(2, 1, CoastalClass::Ocean);
        assert!(GridMaterializer.rows(&grid, &ocean).is_err());
    }
}
