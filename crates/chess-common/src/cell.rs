//! Per-cell classifications: data source and coastal proximity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ChessError, ChessResult};

/// Which climate source supplies a grid cell.
///
/// Replaces the `bias + 2 * non_bias` integer encoding, which silently
/// produced 3 for cells flagged in both sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellSource {
    /// No data in either source; the cell is excluded from the grid.
    #[default]
    NoData,
    /// Bias-corrected data (England, Wales, Scotland).
    BiasCorrected,
    /// Non-bias-corrected data (Northern Ireland, Isles of Scilly).
    NonBiasCorrected,
}

impl CellSource {
    /// Combine the two presence flags of a cell.
    ///
    /// A cell flagged in both sources is rejected rather than guessed at.
    pub fn from_flags(bias: bool, non_bias: bool, row: usize, col: usize) -> ChessResult<Self> {
        match (bias, non_bias) {
            (false, false) => Ok(Self::NoData),
            (true, false) => Ok(Self::BiasCorrected),
            (false, true) => Ok(Self::NonBiasCorrected),
            (true, true) => Err(ChessError::AmbiguousSource { row, col }),
        }
    }

    /// Legacy integer label: 0 no data, 1 bias-corrected, 2 non-bias-corrected.
    pub fn label_value(self) -> u8 {
        match self {
            Self::NoData => 0,
            Self::BiasCorrected => 1,
            Self::NonBiasCorrected => 2,
        }
    }

    pub fn has_data(self) -> bool {
        self != Self::NoData
    }

    /// The persisted `bias_corrected` flag, or `None` for cells without data.
    pub fn bias_corrected(self) -> Option<bool> {
        match self {
            Self::NoData => None,
            Self::BiasCorrected => Some(true),
            Self::NonBiasCorrected => Some(false),
        }
    }
}

/// Coastal proximity of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum CoastalClass {
    /// Open water, never persisted.
    #[default]
    Ocean,
    Coastline,
    /// Land further than the widest band from the coast.
    Land,
    Within10Km,
    Within20Km,
    Within30Km,
    Within40Km,
    Within50Km,
}

impl CoastalClass {
    /// Inland bands from narrowest to widest.
    pub const BANDS: [CoastalClass; 5] = [
        Self::Within10Km,
        Self::Within20Km,
        Self::Within30Km,
        Self::Within40Km,
        Self::Within50Km,
    ];

    /// Integer code: 0, 1, 2, 10, 20, 30, 40, 50.
    pub fn value(self) -> i32 {
        match self {
            Self::Ocean => 0,
            Self::Coastline => 1,
            Self::Land => 2,
            Self::Within10Km => 10,
            Self::Within20Km => 20,
            Self::Within30Km => 30,
            Self::Within40Km => 40,
            Self::Within50Km => 50,
        }
    }

    pub fn from_value(value: i32) -> ChessResult<Self> {
        match value {
            0 => Ok(Self::Ocean),
            1 => Ok(Self::Coastline),
            2 => Ok(Self::Land),
            10 => Ok(Self::Within10Km),
            20 => Ok(Self::Within20Km),
            30 => Ok(Self::Within30Km),
            40 => Ok(Self::Within40Km),
            50 => Ok(Self::Within50Km),
            other => Err(ChessError::UnknownCoastalValue(other)),
        }
    }

    /// Label stored in the `coastal_info` column.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ocean => "ocean",
            Self::Coastline => "coastline",
            Self::Land => "land",
            Self::Within10Km => "10km from coast",
            Self::Within20Km => "20km from coast",
            Self::Within30Km => "30km from coast",
            Self::Within40Km => "40km from coast",
            Self::Within50Km => "50km from coast",
        }
    }

    pub fn from_label(label: &str) -> ChessResult<Self> {
        [
            Self::Ocean,
            Self::Coastline,
            Self::Land,
            Self::Within10Km,
            Self::Within20Km,
            Self::Within30Km,
            Self::Within40Km,
            Self::Within50Km,
        ]
        .into_iter()
        .find(|class| class.label() == label)
        .ok_or_else(|| ChessError::UnknownCoastalLabel(label.to_string()))
    }

    /// Erosion radius in cells for an inland band; one cell is 1km.
    pub fn band_radius(self) -> Option<u32> {
        Self::BANDS
            .contains(&self)
            .then(|| self.value() as u32)
    }
}

impl fmt::Display for CoastalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
