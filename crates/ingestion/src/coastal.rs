//! Coastal tagging of boundary regions.

use std::sync::Arc;

use tracing::{error, info, instrument};

use chess_common::{BoundaryDefinition, CoastalClass};
use storage::BoundaryStore;

use crate::config::CoastalTagConfig;
use crate::error::Result;
use crate::report::CoastalTagReport;

/// Sets `is_coastal` on boundary tables from their overlapping cells.
///
/// Requires the overlap tables to be built. Boundaries marked
/// `all_coastal` are tagged wholesale.
pub struct CoastalTagger {
    store: Arc<dyn BoundaryStore>,
    coastal: Vec<CoastalClass>,
}

impl CoastalTagger {
    pub fn new(store: Arc<dyn BoundaryStore>, coastal: Vec<CoastalClass>) -> Self {
        Self { store, coastal }
    }

    pub fn from_config(store: Arc<dyn BoundaryStore>, config: &CoastalTagConfig) -> Result<Self> {
        Ok(Self::new(store, config.classes()?))
    }

    pub fn coastal_classes(&self) -> &[CoastalClass] {
        &self.coastal
    }

    /// Tag one boundary; returns the number of coastal regions.
    #[instrument(skip_all, fields(boundary = %boundary.identifier))]
    pub async fn tag_boundary(&self, boundary: &BoundaryDefinition) -> Result<u64> {
        boundary.validate()?;
        let tagged = self.store.tag_coastal(boundary, &self.coastal).await?;
        info!(coastal_regions = tagged, all_coastal = boundary.all_coastal, "Tagged coastal regions");
        Ok(tagged)
    }

    /// Tag every boundary. A failing boundary is logged and recorded, and
    /// the remaining boundaries are still processed.
    pub async fn tag_all<'a>(
        &self,
        boundaries: impl IntoIterator<Item = &'a BoundaryDefinition>,
    ) -> CoastalTagReport {
        let mut report = CoastalTagReport::default();

        for boundary in boundaries {
            match self.tag_boundary(boundary).await {
                Ok(tagged) => report.tagged.push((boundary.identifier.clone(), tagged)),
                Err(e) => {
                    error!(boundary = %boundary.identifier, error = %e, "Coastal tagging failed");
                    report.failed.push((boundary.identifier.clone(), e.to_string()));
                }
            }
        }

        report
    }
}
