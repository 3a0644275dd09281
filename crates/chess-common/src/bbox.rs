//! Axis-aligned envelopes in projected (British National Grid) coordinates.

use geo::{coord, BoundingRect, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{ChessError, ChessResult};

/// An axis-aligned envelope, in metres on EPSG:27700.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Envelope of any geometry with a bounding rectangle.
    ///
    /// Fails for empty geometries, which have no envelope.
    pub fn of<G>(geometry: &G) -> ChessResult<Self>
    where
        G: BoundingRect<f64, Output = Option<Rect<f64>>>,
    {
        geometry
            .bounding_rect()
            .map(Self::from)
            .ok_or_else(|| ChessError::InvalidBbox("geometry is empty".to_string()))
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Area of the box.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Centre point of the box.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Check if this bbox intersects another. Boxes that only touch along an
    /// edge or corner intersect, matching PostGIS `ST_Intersects`.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Compute the intersection of two bounding boxes.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }

        Some(BoundingBox {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Scale the box by `factor` about the fixed point `(cx, cy)`.
    ///
    /// The envelope of a geometry scaled about a point equals the envelope
    /// scaled about that point, so this is how the nearest-cell search grows
    /// a region's envelope around its centroid.
    pub fn scale_about(&self, cx: f64, cy: f64, factor: f64) -> BoundingBox {
        let xs = [cx + (self.min_x - cx) * factor, cx + (self.max_x - cx) * factor];
        let ys = [cy + (self.min_y - cy) * factor, cy + (self.max_y - cy) * factor];

        BoundingBox {
            min_x: xs[0].min(xs[1]),
            min_y: ys[0].min(ys[1]),
            max_x: xs[0].max(xs[1]),
            max_y: ys[0].max(ys[1]),
        }
    }

    /// Convert to a `geo` rectangle.
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min_x, y: self.min_y },
            coord! { x: self.max_x, y: self.max_y },
        )
    }
}

impl From<Rect<f64>> for BoundingBox {
    fn from(rect: Rect<f64>) -> Self {
        Self::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));

        let intersection = a.intersection(&b).unwrap();
        assert_eq!(intersection.min_x, 5.0);
        assert_eq!(intersection.min_y, 5.0);
        assert_eq!(intersection.max_x, 10.0);
        assert_eq!(intersection.max_y, 10.0);
    }

    #[test]
    fn test_touching_boxes_intersect() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        assert!(a.intersects(&b));
    }

    #[test]
    fn test_scale_about_centroid() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 4.0);
        let scaled = bbox.scale_about(5.0, 2.0, 1.5);

        assert_eq!(scaled, BoundingBox::new(-2.5, -1.0, 12.5, 5.0));
        assert_eq!(bbox.scale_about(5.0, 2.0, 1.0), bbox);
    }

    #[test]
    fn test_scale_about_off_centre_point() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let scaled = bbox.scale_about(0.0, 0.0, 2.0);
        assert_eq!(scaled, BoundingBox::new(0.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn test_envelope_of_polygon() {
        let poly = polygon![(x: 1.0, y: 2.0), (x: 4.0, y: 2.0), (x: 3.0, y: 7.0)];
        let bbox = BoundingBox::of(&poly).unwrap();
        assert_eq!(bbox, BoundingBox::new(1.0, 2.0, 4.0, 7.0));
        assert_eq!(bbox.area(), 15.0);
    }
}
