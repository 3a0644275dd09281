//! Boundary/grid overlap resolution.
//!
//! Each boundary goes through three states:
//!
//! 1. **Bulk intersect**: one set-based spatial join fills the overlap
//!    table with every intersecting (region, cell) pair.
//! 2. **No-overlap detection**: regions with no row after the join.
//! 3. **Nearest-cell fallback**: for each such region, search an envelope
//!    scaled about the region centroid, growing the scale factor until a
//!    cell is found, and insert the closest cell with `is_overlap = false`.
//!
//! The search in step 3 is bounded by [`NearestSearchConfig::max_attempts`];
//! running out of attempts is an error rather than a silent skip.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use chess_common::BoundaryDefinition;
use storage::{CandidateCell, OverlapRecord, OverlapStore};

use crate::config::NearestSearchConfig;
use crate::error::{IngestionError, Result};
use crate::report::{BoundaryOverlapReport, FallbackRecord, OverlapReport};

/// Runs the overlap state machine over a list of boundaries.
pub struct OverlapResolver {
    store: Arc<dyn OverlapStore>,
    search: NearestSearchConfig,
    skip_fallback: bool,
}

impl OverlapResolver {
    pub fn new(store: Arc<dyn OverlapStore>, search: NearestSearchConfig) -> Self {
        Self {
            store,
            search,
            skip_fallback: false,
        }
    }

    /// Stop after the bulk intersect; regions without overlaps are reported
    /// as unresolved instead of receiving a fallback row.
    pub fn with_skip_fallback(mut self, skip: bool) -> Self {
        self.skip_fallback = skip;
        self
    }

    /// Process boundaries sequentially, in the given order.
    pub async fn resolve_all<'a>(
        &self,
        boundaries: impl IntoIterator<Item = &'a BoundaryDefinition>,
    ) -> Result<OverlapReport> {
        let mut report = OverlapReport::default();
        for boundary in boundaries {
            report.boundaries.push(self.resolve_boundary(boundary).await?);
        }

        info!(
            boundaries = report.boundaries.len(),
            overlap_rows = report.total_overlap_rows(),
            fallbacks = report.total_fallbacks(),
            "Overlap processing complete"
        );
        Ok(report)
    }

    /// Rebuild one boundary's overlap table.
    #[instrument(skip_all, fields(boundary = %boundary.identifier))]
    pub async fn resolve_boundary(&self, boundary: &BoundaryDefinition) -> Result<BoundaryOverlapReport> {
        boundary.validate()?;

        self.store.ensure_indexes(boundary).await?;
        let overlap_rows = self.store.rebuild_overlaps(boundary).await?;
        info!(rows = overlap_rows, "Bulk intersect complete");

        let missing = self.store.regions_without_overlap(boundary).await?;
        let mut report = BoundaryOverlapReport {
            boundary: boundary.identifier.clone(),
            overlap_rows,
            fallbacks: Vec::new(),
            unresolved: Vec::new(),
        };

        if missing.is_empty() {
            debug!("Every region overlaps the grid");
            return Ok(report);
        }

        if self.skip_fallback {
            warn!(regions = missing.len(), "Skipping nearest-cell fallback");
            report.unresolved = missing;
            return Ok(report);
        }

        info!(regions = missing.len(), "Resolving regions without overlap");
        for gid in missing {
            let fallback = self.assign_nearest(boundary, gid).await?;
            report.fallbacks.push(fallback);
        }

        self.verify_complete(boundary).await?;
        Ok(report)
    }

    /// Find the nearest cell to a region and insert it as a fallback row.
    pub async fn assign_nearest(&self, boundary: &BoundaryDefinition, gid: i32) -> Result<FallbackRecord> {
        let (cell, scale_factor, attempts) = self.nearest_cell(boundary, gid).await?;

        self.store
            .insert_overlap(
                boundary,
                &OverlapRecord {
                    gid,
                    grid_cell_id: cell.grid_cell_id,
                    is_overlap: false,
                    bias_corrected: cell.bias_corrected,
                },
            )
            .await?;

        let name = self.store.region_name(boundary, gid).await?;
        info!(
            gid,
            name = name.as_deref().unwrap_or("<unnamed>"),
            grid_cell_id = cell.grid_cell_id,
            scale_factor,
            attempts,
            distance = cell.distance,
            "Assigned nearest grid cell"
        );

        Ok(FallbackRecord {
            gid,
            name,
            grid_cell_id: cell.grid_cell_id,
            scale_factor,
            attempts,
            distance: cell.distance,
        })
    }

    /// Expanding envelope search; returns the closest cell, the scale factor
    /// that found it and the number of attempts used.
    pub async fn nearest_cell(
        &self,
        boundary: &BoundaryDefinition,
        gid: i32,
    ) -> Result<(CandidateCell, f64, u32)> {
        let mut scale_factor = self.search.initial_scale;

        for attempt in 1..=self.search.max_attempts {
            let candidates = self.store.candidate_cells(boundary, gid, scale_factor).await?;

            if let Some(cell) = closest(candidates) {
                return Ok((cell, scale_factor, attempt));
            }

            debug!(gid, attempt, scale_factor, "No candidate cells, expanding envelope");
            scale_factor *= self.search.expansion_factor;
        }

        Err(IngestionError::NearestCellNotFound {
            boundary: boundary.identifier.clone(),
            gid,
            attempts: self.search.max_attempts,
            scale_factor: self.search.scale_for_attempt(self.search.max_attempts),
        })
    }

    /// Check that every region of the boundary has at least one row.
    pub async fn verify_complete(&self, boundary: &BoundaryDefinition) -> Result<()> {
        let missing = self.store.regions_without_overlap(boundary).await?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(IngestionError::IncompleteOverlaps {
                boundary: boundary.identifier.clone(),
                missing,
            })
        }
    }
}

/// Smallest distance, ties broken by lowest `grid_cell_id`.
fn closest(candidates: Vec<CandidateCell>) -> Option<CandidateCell> {
    candidates.into_iter().min_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.grid_cell_id.cmp(&b.grid_cell_id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, distance: f64) -> CandidateCell {
        CandidateCell {
            grid_cell_id: id,
            bias_corrected: true,
            distance,
        }
    }

    #[test]
    fn test_closest_prefers_distance_then_id() {
        let picked = closest(vec![candidate(9, 2.0), candidate(7, 1.0), candidate(3, 1.0)]).unwrap();
        assert_eq!(picked.grid_cell_id, 3);

        let picked = closest(vec![candidate(1, 5.0), candidate(2, 0.5)]).unwrap();
        assert_eq!(picked.grid_cell_id, 2);

        assert!(closest(Vec::new()).is_none());
    }
}
