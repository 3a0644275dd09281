//! In-process implementation of the store traits.
//!
//! Geometry predicates come from the `geo` crate and mirror the PostGIS
//! queries: the same envelope pre-filter, exact intersection (touching
//! counts) and distance ordering with ties broken by `grid_cell_id`. Used by
//! tests and by dry runs of the grid builder.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use geo::{Centroid, EuclideanDistance, Intersects, MultiPolygon};
use tokio::sync::RwLock;
use tracing::debug;

use chess_common::{BoundaryDefinition, BoundingBox, CoastalClass};
use grid_processor::GridCellRow;

use crate::error::{StorageError, StorageResult};
use crate::store::{self, BoundaryStore, CandidateCell, GridStore, OverlapRecord, OverlapStore};

/// A region of a boundary table.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub is_coastal: Option<bool>,
}

#[derive(Debug, Default)]
struct MemoryState {
    grid: BTreeMap<i64, (GridCellRow, BoundingBox)>,
    boundaries: HashMap<String, BTreeMap<i32, MemoryRegion>>,
    overlaps: HashMap<String, Vec<OverlapRecord>>,
    details: Vec<BoundaryDefinition>,
}

impl MemoryState {
    fn regions(&self, boundary: &BoundaryDefinition) -> StorageResult<&BTreeMap<i32, MemoryRegion>> {
        self.boundaries
            .get(&boundary.identifier)
            .ok_or_else(|| StorageError::NotFound(boundary.boundary_table()))
    }

    fn overlaps(&self, boundary: &BoundaryDefinition) -> StorageResult<&Vec<OverlapRecord>> {
        self.overlaps
            .get(&boundary.identifier)
            .ok_or_else(|| StorageError::NotFound(boundary.overlap_table()))
    }
}

/// Store holding every table in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region to a boundary table, creating the table if needed.
    pub async fn insert_region(
        &self,
        boundary: &str,
        gid: i32,
        name: &str,
        geometry: MultiPolygon<f64>,
    ) {
        let mut state = self.state.write().await;
        state.boundaries.entry(boundary.to_string()).or_default().insert(
            gid,
            MemoryRegion {
                name: name.to_string(),
                geometry,
                is_coastal: None,
            },
        );
    }

    /// Snapshot of the grid table, ordered by `grid_cell_id`.
    pub async fn grid_rows(&self) -> Vec<GridCellRow> {
        let state = self.state.read().await;
        state.grid.values().map(|(row, _)| row.clone()).collect()
    }

    /// Snapshot of an overlap table in insertion order.
    pub async fn overlap_rows(&self, boundary: &str) -> Vec<OverlapRecord> {
        let state = self.state.read().await;
        state.overlaps.get(boundary).cloned().unwrap_or_default()
    }

    /// Snapshot of the boundary details table.
    pub async fn boundary_details(&self) -> Vec<BoundaryDefinition> {
        self.state.read().await.details.clone()
    }
}

#[async_trait]
impl GridStore for MemoryStore {
    async fn replace_grid(&self, rows: &[GridCellRow]) -> StorageResult<u64> {
        let mut grid = BTreeMap::new();
        for row in rows {
            let bounds = BoundingBox::of(&row.polygon)?;
            if grid.insert(row.grid_cell_id, (row.clone(), bounds)).is_some() {
                return Err(StorageError::BulkLoad(format!(
                    "duplicate grid_cell_id {}",
                    row.grid_cell_id
                )));
            }
        }

        let loaded = grid.len() as u64;
        self.state.write().await.grid = grid;
        debug!(rows = loaded, "Grid replaced in memory");
        Ok(loaded)
    }

    async fn grid_cell_count(&self) -> StorageResult<u64> {
        Ok(self.state.read().await.grid.len() as u64)
    }
}

#[async_trait]
impl OverlapStore for MemoryStore {
    async fn ensure_indexes(&self, boundary: &BoundaryDefinition) -> StorageResult<()> {
        self.state.read().await.regions(boundary)?;
        Ok(())
    }

    async fn rebuild_overlaps(&self, boundary: &BoundaryDefinition) -> StorageResult<u64> {
        let mut state = self.state.write().await;
        let regions = state.regions(boundary)?;

        let mut records = Vec::new();
        for (&gid, region) in regions {
            let Ok(region_bounds) = BoundingBox::of(&region.geometry) else {
                continue;
            };

            for (row, cell_bounds) in state.grid.values() {
                if cell_bounds.intersects(&region_bounds) && region.geometry.intersects(&row.polygon) {
                    records.push(OverlapRecord {
                        gid,
                        grid_cell_id: row.grid_cell_id,
                        is_overlap: true,
                        bias_corrected: row.bias_corrected,
                    });
                }
            }
        }

        let inserted = records.len() as u64;
        state.overlaps.insert(boundary.identifier.clone(), records);
        Ok(inserted)
    }

    async fn regions_without_overlap(&self, boundary: &BoundaryDefinition) -> StorageResult<Vec<i32>> {
        let state = self.state.read().await;
        let covered: HashSet<i32> = state.overlaps(boundary)?.iter().map(|r| r.gid).collect();

        Ok(state
            .regions(boundary)?
            .keys()
            .copied()
            .filter(|gid| !covered.contains(gid))
            .collect())
    }

    async fn candidate_cells(
        &self,
        boundary: &BoundaryDefinition,
        gid: i32,
        scale_factor: f64,
    ) -> StorageResult<Vec<CandidateCell>> {
        let state = self.state.read().await;
        let region = state
            .regions(boundary)?
            .get(&gid)
            .ok_or_else(|| StorageError::NotFound(format!("{} gid {}", boundary.boundary_table(), gid)))?;

        let (Some(centroid), Ok(bounds)) =
            (region.geometry.centroid(), BoundingBox::of(&region.geometry))
        else {
            return Ok(Vec::new());
        };
        let search = bounds.scale_about(centroid.x(), centroid.y(), scale_factor);

        let mut candidates: Vec<CandidateCell> = state
            .grid
            .values()
            .filter(|(_, cell_bounds)| cell_bounds.intersects(&search))
            .map(|(row, _)| CandidateCell {
                grid_cell_id: row.grid_cell_id,
                bias_corrected: row.bias_corrected,
                distance: region
                    .geometry
                    .iter()
                    .map(|polygon| row.polygon.euclidean_distance(polygon))
                    .fold(f64::INFINITY, f64::min),
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.grid_cell_id.cmp(&b.grid_cell_id))
        });
        Ok(candidates)
    }

    async fn insert_overlap(
        &self,
        boundary: &BoundaryDefinition,
        record: &OverlapRecord,
    ) -> StorageResult<()> {
        let mut state = self.state.write().await;
        state
            .overlaps
            .get_mut(&boundary.identifier)
            .ok_or_else(|| StorageError::NotFound(boundary.overlap_table()))?
            .push(*record);
        Ok(())
    }

    async fn region_ids(&self, boundary: &BoundaryDefinition) -> StorageResult<Vec<i32>> {
        let state = self.state.read().await;
        Ok(state.regions(boundary)?.keys().copied().collect())
    }

    async fn region_name(&self, boundary: &BoundaryDefinition, gid: i32) -> StorageResult<Option<String>> {
        let state = self.state.read().await;
        Ok(state.regions(boundary)?.get(&gid).map(|r| r.name.clone()))
    }

    async fn overlapping_cells(
        &self,
        boundary: &BoundaryDefinition,
        gid: i32,
    ) -> StorageResult<Vec<OverlapRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<OverlapRecord> = state
            .overlaps(boundary)?
            .iter()
            .filter(|r| r.gid == gid)
            .copied()
            .collect();
        records.sort_by_key(|r| r.grid_cell_id);
        Ok(records)
    }
}

#[async_trait]
impl BoundaryStore for MemoryStore {
    async fn tag_coastal(
        &self,
        boundary: &BoundaryDefinition,
        coastal: &[CoastalClass],
    ) -> StorageResult<u64> {
        let mut state = self.state.write().await;
        state.regions(boundary)?;

        let flags: BTreeMap<i32, bool> = if boundary.all_coastal {
            state.regions(boundary)?.keys().map(|&gid| (gid, true)).collect()
        } else {
            let mut labels: HashMap<i32, Vec<CoastalClass>> = HashMap::new();
            for record in state.overlaps(boundary)? {
                if let Some((row, _)) = state.grid.get(&record.grid_cell_id) {
                    labels.entry(record.gid).or_default().push(row.coastal);
                }
            }

            state
                .regions(boundary)?
                .keys()
                .map(|gid| {
                    let flag = labels
                        .get(gid)
                        .map_or(false, |l| store::is_coastal(l, coastal));
                    (*gid, flag)
                })
                .collect()
        };

        let tagged = flags.values().filter(|&&f| f).count() as u64;
        if let Some(regions) = state.boundaries.get_mut(&boundary.identifier) {
            for (gid, region) in regions.iter_mut() {
                region.is_coastal = flags.get(gid).copied();
            }
        }

        Ok(tagged)
    }

    async fn is_coastal(&self, boundary: &BoundaryDefinition, gid: i32) -> StorageResult<Option<bool>> {
        let state = self.state.read().await;
        Ok(state.regions(boundary)?.get(&gid).and_then(|r| r.is_coastal))
    }

    async fn replace_boundary_details(&self, boundaries: &[BoundaryDefinition]) -> StorageResult<u64> {
        let mut seen = HashSet::new();
        for boundary in boundaries {
            boundary.validate()?;
            if !seen.insert(boundary.identifier.as_str()) {
                return Err(StorageError::BulkLoad(format!(
                    "duplicate boundary_identifier {}",
                    boundary.identifier
                )));
            }
        }

        self.state.write().await.details = boundaries.to_vec();
        Ok(boundaries.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_common::{cell_polygon, GridAxes, QueryMethod};
    use test_utils::{one_cell_region, square_region, two_cell_region};

    fn boundary() -> BoundaryDefinition {
        BoundaryDefinition::new("lsoa", "LSOA", "LSOA21NM", QueryMethod::Cell)
    }

    /// 4x3 cells of 1km, first cell at the origin, classes by column.
    fn rows() -> Vec<GridCellRow> {
        let axes = GridAxes::regular(4, 3, 500.0, 500.0, 1000.0, 1000.0).unwrap();
        let (xe, ye) = (axes.x_edges(), axes.y_edges());
        let classes = [
            CoastalClass::Coastline,
            CoastalClass::Within10Km,
            CoastalClass::Within30Km,
            CoastalClass::Land,
        ];

        let mut rows = Vec::new();
        for row in 0..3 {
            for col in 0..4 {
                rows.push(GridCellRow {
                    grid_cell_id: axes.cell_id(row, col),
                    polygon: cell_polygon(&xe, &ye, row, col),
                    bias_corrected: col != 0,
                    coastal: classes[col],
                });
            }
        }
        rows
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.replace_grid(&rows()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_replace_grid_rejects_duplicates() {
        let store = store().await;
        let mut duplicated = rows();
        duplicated.push(duplicated[0].clone());

        assert!(matches!(
            store.replace_grid(&duplicated).await,
            Err(StorageError::BulkLoad(_))
        ));
        // Previous contents survive the failed load.
        assert_eq!(store.grid_cell_count().await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_rebuild_overlaps() {
        let store = store().await;
        store.insert_region("lsoa", 1, "Two cells", two_cell_region(1, 1)).await;
        store.insert_region("lsoa", 2, "Offshore", square_region(10_000.0, 10_000.0, 500.0)).await;

        let inserted = store.rebuild_overlaps(&boundary()).await.unwrap();
        assert_eq!(inserted, 2);

        let cells: Vec<i64> = store
            .overlapping_cells(&boundary(), 1)
            .await
            .unwrap()
            .iter()
            .map(|r| r.grid_cell_id)
            .collect();
        assert_eq!(cells, vec![5, 6]);
        assert_eq!(store.regions_without_overlap(&boundary()).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_missing_tables_are_not_found() {
        let store = store().await;
        assert!(matches!(
            store.rebuild_overlaps(&boundary()).await,
            Err(StorageError::NotFound(_))
        ));

        store.insert_region("lsoa", 1, "A", one_cell_region(0, 0)).await;
        assert!(matches!(
            store.regions_without_overlap(&boundary()).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_candidates_are_ordered_by_distance() {
        let store = store().await;
        // Just right of the grid, level with row 1.
        store
            .insert_region("lsoa", 7, "East", square_region(4_500.0, 1_250.0, 500.0))
            .await;

        let none = store.candidate_cells(&boundary(), 7, 1.0).await.unwrap();
        assert!(none.is_empty());

        let found = store.candidate_cells(&boundary(), 7, 3.0).await.unwrap();
        assert_eq!(found[0].grid_cell_id, 7);
        assert_eq!(found[0].distance, 500.0);
        assert!(found.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_tag_coastal() {
        let store = store().await;
        store.insert_region("lsoa", 1, "Coast", one_cell_region(0, 1)).await;
        store.insert_region("lsoa", 2, "Inland", one_cell_region(0, 2)).await;
        store.rebuild_overlaps(&boundary()).await.unwrap();

        let coastal = [CoastalClass::Coastline, CoastalClass::Within10Km, CoastalClass::Within20Km];
        assert_eq!(store.tag_coastal(&boundary(), &coastal).await.unwrap(), 1);
        assert_eq!(store.is_coastal(&boundary(), 1).await.unwrap(), Some(true));
        assert_eq!(store.is_coastal(&boundary(), 2).await.unwrap(), Some(false));

        let mut all = boundary();
        all.all_coastal = true;
        assert_eq!(store.tag_coastal(&all, &coastal).await.unwrap(), 2);
        assert_eq!(store.is_coastal(&all, 2).await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_boundary_details() {
        let store = MemoryStore::new();
        let defs = chess_common::default_boundaries();
        assert_eq!(store.replace_boundary_details(&defs).await.unwrap(), 8);
        assert_eq!(store.boundary_details().await, defs);

        let duplicated = vec![boundary(), boundary()];
        assert!(store.replace_boundary_details(&duplicated).await.is_err());
    }
}
