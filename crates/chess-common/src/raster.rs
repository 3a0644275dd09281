//! In-memory presence rasters read from the climate projection files.

use serde::{Deserialize, Serialize};

use crate::error::{ChessError, ChessResult};
use crate::grid::GridAxes;

/// Which of the two CHESS-SCAPE products a raster came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterKind {
    BiasCorrected,
    NonBiasCorrected,
}

impl RasterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BiasCorrected => "bias_corrected",
            Self::NonBiasCorrected => "non_bias_corrected",
        }
    }
}

/// A row-major "has data" flag per raster cell, plus the coordinate axes.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceRaster {
    pub kind: RasterKind,
    pub axes: GridAxes,
    present: Vec<bool>,
}

impl PresenceRaster {
    /// Wrap row-major presence flags; the length must match the axes.
    pub fn new(kind: RasterKind, axes: GridAxes, present: Vec<bool>) -> ChessResult<Self> {
        let expected = axes.width() * axes.height();
        if present.len() != expected {
            return Err(ChessError::InvalidAxes(format!(
                "{} raster has {} cells but axes describe {}x{}",
                kind.as_str(),
                present.len(),
                axes.width(),
                axes.height()
            )));
        }

        Ok(Self {
            kind,
            axes,
            present,
        })
    }

    pub fn width(&self) -> usize {
        self.axes.width()
    }

    pub fn height(&self) -> usize {
        self.axes.height()
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn is_present(&self, row: usize, col: usize) -> bool {
        self.present[row * self.width() + col]
    }

    pub fn flags(&self) -> &[bool] {
        &self.present
    }

    pub fn present_count(&self) -> usize {
        self.present.iter().filter(|&&p| p).count()
    }
}
