//! The `boundary_details` registry table.

use std::sync::Arc;

use tracing::info;

use chess_common::BoundaryDefinition;
use storage::BoundaryStore;

use crate::error::Result;

/// Rebuilds `boundary_details` from the boundary registry.
pub struct BoundaryDetailsWriter {
    store: Arc<dyn BoundaryStore>,
}

impl BoundaryDetailsWriter {
    pub fn new(store: Arc<dyn BoundaryStore>) -> Self {
        Self { store }
    }

    /// Drop, recreate and fill the table; returns rows written.
    pub async fn write(&self, boundaries: &[BoundaryDefinition]) -> Result<u64> {
        for boundary in boundaries {
            boundary.validate()?;
        }

        let rows = self.store.replace_boundary_details(boundaries).await?;
        info!(rows, "Boundary details written");
        Ok(rows)
    }
}
