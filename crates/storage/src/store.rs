//! Persistence contracts used by the ingestion pipeline.
//!
//! Two implementations exist: [`crate::PostgisStore`] for the real database
//! and [`crate::MemoryStore`] for tests and dry runs. Table names are derived
//! from validated identifiers only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use chess_common::{validate_identifier, BoundaryDefinition, CoastalClass, BRITISH_NATIONAL_GRID};
use grid_processor::GridCellRow;

use crate::error::StorageResult;

/// Name and SRID of the grid table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridTable {
    pub name: String,
    pub srid: i32,
}

impl Default for GridTable {
    fn default() -> Self {
        Self {
            name: "chess_scape_grid".to_string(),
            srid: BRITISH_NATIONAL_GRID,
        }
    }
}

impl GridTable {
    pub fn validate(&self) -> StorageResult<()> {
        validate_identifier(&self.name)?;
        Ok(())
    }
}

/// One row of an overlap table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlapRecord {
    pub gid: i32,
    pub grid_cell_id: i64,
    /// `false` for a nearest-cell fallback row.
    pub is_overlap: bool,
    pub bias_corrected: bool,
}

/// A grid cell found near a region during the fallback search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateCell {
    pub grid_cell_id: i64,
    pub bias_corrected: bool,
    /// Distance from the cell to the region geometry, in SRID units.
    pub distance: f64,
}

/// The canonical grid table.
#[async_trait]
pub trait GridStore: Send + Sync {
    /// Drop, recreate and bulk-load the grid table in one transaction.
    /// Returns the number of rows loaded.
    async fn replace_grid(&self, rows: &[GridCellRow]) -> StorageResult<u64>;

    /// Number of rows currently in the grid table.
    async fn grid_cell_count(&self) -> StorageResult<u64>;
}

/// Per-boundary overlap tables.
#[async_trait]
pub trait OverlapStore: Send + Sync {
    /// Make sure spatial indexes exist on the grid and boundary geometries.
    async fn ensure_indexes(&self, boundary: &BoundaryDefinition) -> StorageResult<()>;

    /// Recreate the overlap table and fill it with every intersecting
    /// (region, cell) pair, `is_overlap = true`. Returns rows inserted.
    async fn rebuild_overlaps(&self, boundary: &BoundaryDefinition) -> StorageResult<u64>;

    /// Region gids with no row in the overlap table, ascending.
    async fn regions_without_overlap(&self, boundary: &BoundaryDefinition) -> StorageResult<Vec<i32>>;

    /// Cells intersecting the region's envelope scaled by `scale_factor`
    /// about the region centroid, nearest first, ties by `grid_cell_id`.
    async fn candidate_cells(
        &self,
        boundary: &BoundaryDefinition,
        gid: i32,
        scale_factor: f64,
    ) -> StorageResult<Vec<CandidateCell>>;

    async fn insert_overlap(
        &self,
        boundary: &BoundaryDefinition,
        record: &OverlapRecord,
    ) -> StorageResult<()>;

    /// Every region gid in the boundary table, ascending.
    async fn region_ids(&self, boundary: &BoundaryDefinition) -> StorageResult<Vec<i32>>;

    /// Display name of a region, from the boundary's name column.
    async fn region_name(&self, boundary: &BoundaryDefinition, gid: i32) -> StorageResult<Option<String>>;

    /// Overlap rows of one region, ordered by `grid_cell_id`.
    async fn overlapping_cells(
        &self,
        boundary: &BoundaryDefinition,
        gid: i32,
    ) -> StorageResult<Vec<OverlapRecord>>;
}

/// Columns added to boundary tables and the boundary registry table.
#[async_trait]
pub trait BoundaryStore: Send + Sync {
    /// Set `is_coastal` on every region of the boundary in one transaction.
    ///
    /// A region is coastal when any overlapping cell has a class in
    /// `coastal`, or unconditionally when the boundary is `all_coastal`.
    /// Returns the number of regions tagged coastal.
    async fn tag_coastal(
        &self,
        boundary: &BoundaryDefinition,
        coastal: &[CoastalClass],
    ) -> StorageResult<u64>;

    /// `is_coastal` of one region, `None` if untagged or unknown.
    async fn is_coastal(&self, boundary: &BoundaryDefinition, gid: i32) -> StorageResult<Option<bool>>;

    /// Drop, recreate and fill the `boundary_details` table.
    async fn replace_boundary_details(&self, boundaries: &[BoundaryDefinition]) -> StorageResult<u64>;
}

/// Whether any of `labels` is in the coastal set.
pub fn is_coastal<'a>(labels: impl IntoIterator<Item = &'a CoastalClass>, coastal: &[CoastalClass]) -> bool {
    labels.into_iter().any(|label| coastal.contains(label))
}
