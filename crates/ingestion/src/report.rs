//! Summaries returned by each pipeline stage.

use std::collections::BTreeMap;

use serde::Serialize;

/// Outcome of a grid rebuild.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridBuildReport {
    /// Raster width in cells.
    pub width: usize,
    /// Raster height in cells.
    pub height: usize,
    /// Cells labelled bias-corrected.
    pub bias_corrected: usize,
    /// Cells labelled non-bias-corrected after the restriction filter.
    pub non_bias_corrected: usize,
    /// Rows written to the grid table.
    pub rows_loaded: u64,
    /// Persisted cells per coastal label.
    pub coastal_counts: BTreeMap<String, usize>,
    /// True when no database was touched.
    pub dry_run: bool,
}

/// A region that received a nearest-cell row instead of true overlaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackRecord {
    pub gid: i32,
    pub name: Option<String>,
    pub grid_cell_id: i64,
    /// Envelope scale factor at which the first candidate appeared.
    pub scale_factor: f64,
    pub attempts: u32,
    pub distance: f64,
}

/// Overlap processing of one boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryOverlapReport {
    pub boundary: String,
    /// Rows from the bulk intersect, all `is_overlap = true`.
    pub overlap_rows: u64,
    pub fallbacks: Vec<FallbackRecord>,
    /// Regions left without rows because the fallback was skipped.
    pub unresolved: Vec<i32>,
}

/// Overlap processing of every selected boundary, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlapReport {
    pub boundaries: Vec<BoundaryOverlapReport>,
}

impl OverlapReport {
    pub fn total_overlap_rows(&self) -> u64 {
        self.boundaries.iter().map(|b| b.overlap_rows).sum()
    }

    pub fn total_fallbacks(&self) -> usize {
        self.boundaries.iter().map(|b| b.fallbacks.len()).sum()
    }
}

/// Coastal tagging of every selected boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoastalTagReport {
    /// (boundary, regions tagged coastal)
    pub tagged: Vec<(String, u64)>,
    /// (boundary, error message); tagging continued past these.
    pub failed: Vec<(String, String)>,
}

impl CoastalTagReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
