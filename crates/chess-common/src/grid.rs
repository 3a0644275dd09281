//! Coordinate axes of the fixed 1km CHESS-SCAPE raster.

use geo::{coord, LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{ChessError, ChessResult};

/// Relative tolerance when checking that an axis is uniformly spaced.
const SPACING_TOLERANCE: f64 = 1e-6;

/// The `x` and `y` coordinate axes of a raster, holding cell-centre
/// coordinates. Row index `i` follows `y`, column index `j` follows `x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAxes")]
pub struct GridAxes {
    x: Vec<f64>,
    y: Vec<f64>,
}

/// Unchecked wire form; deserialization goes through [`GridAxes::new`].
#[derive(Deserialize)]
struct RawAxes {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TryFrom<RawAxes> for GridAxes {
    type Error = ChessError;

    fn try_from(raw: RawAxes) -> ChessResult<Self> {
        Self::new(raw.x, raw.y)
    }
}

impl GridAxes {
    /// Build axes from cell-centre coordinates.
    ///
    /// Both axes need at least two points and uniform spacing, since the
    /// outer cell edges are extrapolated by half the spacing.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> ChessResult<Self> {
        check_uniform("x", &x)?;
        check_uniform("y", &y)?;
        Ok(Self { x, y })
    }

    /// Axes with `width` x `height` cells of the given spacing, whose first
    /// cell centre sits at `(x0, y0)`.
    pub fn regular(width: usize, height: usize, x0: f64, y0: f64, dx: f64, dy: f64) -> ChessResult<Self> {
        let x = (0..width).map(|j| x0 + j as f64 * dx).collect();
        let y = (0..height).map(|i| y0 + i as f64 * dy).collect();
        Self::new(x, y)
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.x.len()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.y.len()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Spacing along `x`.
    pub fn dx(&self) -> f64 {
        self.x[1] - self.x[0]
    }

    /// Spacing along `y`. Negative when the axis runs north to south.
    pub fn dy(&self) -> f64 {
        self.y[1] - self.y[0]
    }

    /// Cell edges along `x`: `width + 1` values.
    pub fn x_edges(&self) -> Vec<f64> {
        edges(&self.x, self.dx())
    }

    /// Cell edges along `y`: `height + 1` values.
    pub fn y_edges(&self) -> Vec<f64> {
        edges(&self.y, self.dy())
    }

    /// Deterministic cell identity: `row * width + col`.
    pub fn cell_id(&self, row: usize, col: usize) -> i64 {
        (row * self.width() + col) as i64
    }

    /// Inverse of [`GridAxes::cell_id`].
    pub fn cell_position(&self, cell_id: i64) -> Option<(usize, usize)> {
        let id = usize::try_from(cell_id).ok()?;
        let (row, col) = (id / self.width(), id % self.width());
        (row < self.height()).then_some((row, col))
    }

    /// Envelope of the whole raster, edges included.
    pub fn extent(&self) -> BoundingBox {
        let xe = self.x_edges();
        let ye = self.y_edges();
        let (x0, x1) = (xe[0], xe[xe.len() - 1]);
        let (y0, y1) = (ye[0], ye[ye.len() - 1]);
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

/// Rectangle for cell `(row, col)` from precomputed edges, ring order
/// `(xe[j], ye[i]) (xe[j+1], ye[i]) (xe[j+1], ye[i+1]) (xe[j], ye[i+1])`.
pub fn cell_polygon(x_edges: &[f64], y_edges: &[f64], row: usize, col: usize) -> Polygon<f64> {
    let (x0, x1) = (x_edges[col], x_edges[col + 1]);
    let (y0, y1) = (y_edges[row], y_edges[row + 1]);

    Polygon::new(
        LineString::from(vec![
            coord! { x: x0, y: y0 },
            coord! { x: x1, y: y0 },
            coord! { x: x1, y: y1 },
            coord! { x: x0, y: y1 },
            coord! { x: x0, y: y0 },
        ]),
        vec![],
    )
}

fn edges(centres: &[f64], spacing: f64) -> Vec<f64> {
    let mut out: Vec<f64> = centres.iter().map(|c| c - spacing / 2.0).collect();
    out.push(centres[centres.len() - 1] + spacing / 2.0);
    out
}

fn check_uniform(name: &str, axis: &[f64]) -> ChessResult<()> {
    if axis.len() < 2 {
        return Err(ChessError::InvalidAxes(format!(
            "{} axis needs at least 2 points, got {}",
            name,
            axis.len()
        )));
    }

    let spacing = axis[1] - axis[0];
    if spacing == 0.0 || !spacing.is_finite() {
        return Err(ChessError::InvalidAxes(format!(
            "{} axis has zero or non-finite spacing",
            name
        )));
    }

    for (k, pair) in axis.windows(2).enumerate() {
        let step = pair[1] - pair[0];
        if ((step - spacing) / spacing).abs() > SPACING_TOLERANCE {
            return Err(ChessError::InvalidAxes(format!(
                "{} axis is not uniformly spaced at index {}: expected {}, got {}",
                name,
                k + 1,
                spacing,
                step
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    #[test]
    fn test_edges_extrapolate_half_spacing() {
        let axes = GridAxes::new(vec![500.0, 1500.0, 2500.0], vec![500.0, 1500.0]).unwrap();
        assert_eq!(axes.x_edges(), vec![0.0, 1000.0, 2000.0, 3000.0]);
        assert_eq!(axes.y_edges(), vec![0.0, 1000.0, 2000.0]);
    }

    #[test]
    fn test_descending_axis() {
        let axes = GridAxes::new(vec![0.0, 10.0], vec![100.0, 90.0, 80.0]).unwrap();
        assert_eq!(axes.dy(), -10.0);
        assert_eq!(axes.y_edges(), vec![105.0, 95.0, 85.0, 75.0]);
        assert_eq!(axes.extent(), BoundingBox::new(-5.0, 75.0, 15.0, 105.0));
    }

    #[test]
    fn test_rejects_short_and_irregular_axes() {
        assert!(GridAxes::new(vec![0.0], vec![0.0, 1.0]).is_err());
        assert!(GridAxes::new(vec![0.0, 1.0, 3.0], vec![0.0, 1.0]).is_err());
        assert!(GridAxes::new(vec![0.0, 0.0], vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_cell_id_roundtrip() {
        let axes = GridAxes::regular(4, 3, 0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(axes.cell_id(2, 3), 11);
        assert_eq!(axes.cell_position(11), Some((2, 3)));
        assert_eq!(axes.cell_position(12), None);
        assert_eq!(axes.cell_position(-1), None);
    }

    #[test]
    fn test_cell_polygon_area() {
        let axes = GridAxes::regular(2, 2, 500.0, 500.0, 1000.0, 1000.0).unwrap();
        let poly = cell_polygon(&axes.x_edges(), &axes.y_edges(), 1, 0);
        assert_eq!(poly.unsigned_area(), 1_000_000.0);
    }

    #[test]
    fn test_deserialize_validates_axes() {
        let axes: GridAxes = serde_json::from_str(r#"{"x": [500.0, 1500.0], "y": [2500.0, 1500.0]}"#).unwrap();
        assert_eq!(axes.dy(), -1000.0);

        let err = serde_json::from_str::<GridAxes>(r#"{"x": [500.0], "y": [500.0, 1500.0]}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid coordinate axes"));
        assert!(serde_json::from_str::<GridAxes>(r#"{"x": [0.0, 1.0, 3.0], "y": [0.0, 1.0]}"#).is_err());
    }
}
