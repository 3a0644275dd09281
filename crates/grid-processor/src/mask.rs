//! Labelled mask construction from the two presence rasters.
//!
//! Bias-corrected data is used wherever it exists. Non-bias-corrected data is
//! only kept inside the configured restriction regions; elsewhere it is
//! treated as spurious.

use geo::{BoundingRect, Intersects, Point, Polygon, Rect};
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use chess_common::{CellSource, PresenceRaster, RasterKind};

use crate::config::GridProcessorConfig;
use crate::error::{GridProcessorError, Result};
use crate::types::{LabelledGrid, LandMask, Mask};

/// Builds the labelled mask from a bias-corrected / non-bias-corrected pair.
#[derive(Debug, Clone)]
pub struct MaskBuilder {
    regions: Vec<(Polygon<f64>, Option<Rect<f64>>)>,
}

impl MaskBuilder {
    /// Create a builder from validated configuration.
    pub fn new(config: &GridProcessorConfig) -> Result<Self> {
        config.validate().map_err(GridProcessorError::Config)?;

        let regions = config
            .restriction_regions
            .iter()
            .map(|region| {
                let polygon = region.polygon();
                let bounds = polygon.bounding_rect();
                (polygon, bounds)
            })
            .collect();

        Ok(Self { regions })
    }

    /// Whether raster index `(row, col)` lies in a restriction region.
    ///
    /// The cell is tested as the point `(x = col, y = row)`; points on a
    /// region's boundary count as inside.
    pub fn in_restriction(&self, row: usize, col: usize) -> bool {
        let (x, y) = (col as f64, row as f64);
        let point = Point::new(x, y);

        self.regions.iter().any(|(polygon, bounds)| {
            let in_bounds = bounds.map_or(false, |b| {
                x >= b.min().x && x <= b.max().x && y >= b.min().y && y <= b.max().y
            });
            in_bounds && polygon.intersects(&point)
        })
    }

    /// Restriction membership for every cell of a `width` x `height` raster.
    pub fn restriction_mask(&self, width: usize, height: usize) -> LandMask {
        let mut data = vec![false; width * height];
        if width > 0 {
            data.par_chunks_mut(width)
                .enumerate()
                .for_each(|(row, cells)| {
                    for (col, cell) in cells.iter_mut().enumerate() {
                        *cell = self.in_restriction(row, col);
                    }
                });
        }

        Mask::from_parts(width, height, data)
    }

    /// Combine the two rasters into one source per cell.
    ///
    /// Exactly one raster of each kind is required, on identical axes.
    #[instrument(skip_all, fields(rasters = rasters.len()))]
    pub fn build(&self, rasters: &[PresenceRaster]) -> Result<LabelledGrid> {
        let (bias, non_bias) = pick_pair(rasters)?;

        if bias.shape() != non_bias.shape() {
            return Err(GridProcessorError::ShapeMismatch {
                bias: bias.shape(),
                non_bias: non_bias.shape(),
            });
        }
        if bias.axes != non_bias.axes {
            return Err(GridProcessorError::InvalidAxes(
                "bias-corrected and non-bias-corrected rasters have different coordinates"
                    .to_string(),
            ));
        }

        let (height, width) = bias.shape();
        let restriction = self.restriction_mask(width, height);

        let mut sources = Vec::with_capacity(width * height);
        let mut discarded = 0usize;
        for row in 0..height {
            for col in 0..width {
                let raw_non_bias = non_bias.is_present(row, col);
                let kept_non_bias = raw_non_bias && *restriction.get(row, col);
                if raw_non_bias && !kept_non_bias {
                    discarded += 1;
                }
                sources.push(CellSource::from_flags(
                    bias.is_present(row, col),
                    kept_non_bias,
                    row,
                    col,
                )?);
            }
        }

        let mask = Mask::from_vec(width, height, sources)
            .ok_or_else(|| GridProcessorError::config("labelled mask size mismatch"))?;

        debug!(discarded, "Non-bias-corrected cells outside restriction regions");
        info!(
            width,
            height,
            bias_corrected = mask.count(|s| *s == CellSource::BiasCorrected),
            non_bias_corrected = mask.count(|s| *s == CellSource::NonBiasCorrected),
            "Built labelled mask"
        );

        Ok(LabelledGrid {
            axes: bias.axes.clone(),
            mask,
        })
    }
}

/// Build the labelled mask in one call.
pub fn build_labelled_mask(
    rasters: &[PresenceRaster],
    config: &GridProcessorConfig,
) -> Result<LabelledGrid> {
    MaskBuilder::new(config)?.build(rasters)
}

fn pick_pair(rasters: &[PresenceRaster]) -> Result<(&PresenceRaster, &PresenceRaster)> {
    if rasters.len() != 2 {
        return Err(GridProcessorError::RasterCount(rasters.len()));
    }

    let find = |kind: RasterKind| {
        rasters.iter().find(|r| r.kind == kind).ok_or_else(|| {
            GridProcessorError::config(format!("no {} raster supplied", kind.as_str()))
        })
    };

    Ok((find(RasterKind::BiasCorrected)?, find(RasterKind::NonBiasCorrected)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RestrictionRegion;
    use chess_common::GridAxes;

    fn raster(kind: RasterKind, width: usize, height: usize, present: Vec<bool>) -> PresenceRaster {
        let axes = GridAxes::regular(width, height, 500.0, 500.0, 1000.0, 1000.0).unwrap();
        PresenceRaster::new(kind, axes, present).unwrap()
    }

    fn square_config(x0: f64, y0: f64, x1: f64, y1: f64) -> GridProcessorConfig {
        GridProcessorConfig {
            restriction_regions: vec![RestrictionRegion {
                name: "test".to_string(),
                provenance: String::new(),
                vertices: vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_boundary_points_are_inside() {
        let builder = MaskBuilder::new(&square_config(1.0, 1.0, 3.0, 2.0)).unwrap();
        assert!(builder.in_restriction(1, 1));
        assert!(builder.in_restriction(2, 3));
        assert!(builder.in_restriction(1, 2));
        assert!(!builder.in_restriction(0, 1));
        assert!(!builder.in_restriction(1, 4));
    }

    #[test]
    fn test_default_regions() {
        let builder = MaskBuilder::new(&GridProcessorConfig::default()).unwrap();
        // Northern Ireland
        assert!(builder.in_restriction(500, 100));
        assert!(builder.in_restriction(600, 0));
        assert!(!builder.in_restriction(600, 180));
        // Isles of Scilly
        assert!(builder.in_restriction(10, 80));
        // Mainland
        assert!(!builder.in_restriction(300, 400));
    }

    #[test]
    fn test_requires_two_rasters() {
        let builder = MaskBuilder::new(&GridProcessorConfig::default()).unwrap();
        let one = vec![raster(RasterKind::BiasCorrected, 2, 2, vec![true; 4])];
        assert!(matches!(builder.build(&one), Err(GridProcessorError::RasterCount(1))));
        assert!(matches!(builder.build(&[]), Err(GridProcessorError::RasterCount(0))));

        let same_kind = vec![
            raster(RasterKind::BiasCorrected, 2, 2, vec![true; 4]),
            raster(RasterKind::BiasCorrected, 2, 2, vec![true; 4]),
        ];
        assert!(matches!(builder.build(&same_kind), Err(GridProcessorError::Config(_))));
    }

    #[test]
    fn test_shape_mismatch() {
        let builder = MaskBuilder::new(&GridProcessorConfig::default()).unwrap();
        let rasters = vec![
            raster(RasterKind::BiasCorrected, 2, 2, vec![true; 4]),
            raster(RasterKind::NonBiasCorrected, 3, 2, vec![false; 6]),
        ];
        assert!(matches!(
            builder.build(&rasters),
            Err(GridProcessorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_restricted_non_bias_cells() {
        // Region covers columns 0..=1 of every row.
        let builder = MaskBuilder::new(&square_config(0.0, 0.0, 1.0, 2.0)).unwrap();
        let rasters = vec![
            raster(
                RasterKind::BiasCorrected,
                4,
                3,
                vec![
                    false, false, true, true, //
                    false, false, true, false, //
                    false, false, false, false,
                ],
            ),
            raster(
                RasterKind::NonBiasCorrected,
                4,
                3,
                vec![
                    true, false, false, false, //
                    true, true, false, true, //
                    false, false, false, false,
                ],
            ),
        ];

        let grid = builder.build(&rasters).unwrap();
        assert_eq!(
            grid.label_values().as_slice(),
            &[
                2, 0, 1, 1, //
                2, 2, 1, 0, //
                0, 0, 0, 0,
            ]
        );
    }

    #[test]
    fn test_ambiguous_cell_is_rejected() {
        let builder = MaskBuilder::new(&square_config(0.0, 0.0, 5.0, 5.0)).unwrap();
        let rasters = vec![
            raster(RasterKind::NonBiasCorrected, 2, 1, vec![false, true]),
            raster(RasterKind::BiasCorrected, 2, 1, vec![false, true]),
        ];
        assert!(matches!(
            builder.build(&rasters),
            Err(GridProcessorError::AmbiguousSource { row: 0, col: 1 })
        ));
    }
}
