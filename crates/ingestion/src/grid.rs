//! Grid table rebuild from a raster pair.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument};

use chess_common::{CellSource, PresenceRaster};
use grid_processor::{derive_grid, DerivedGrid, GridProcessorConfig};
use netcdf_parser::{read_raster_pair, ReadOptions};
use storage::GridStore;

use crate::error::{IngestionError, Result};
use crate::report::GridBuildReport;

/// Location of the bias-corrected and non-bias-corrected files.
#[derive(Debug, Clone)]
pub struct RasterSources {
    pub bias_corrected: PathBuf,
    pub non_bias_corrected: PathBuf,
    pub options: ReadOptions,
}

/// Derives the labelled grid and replaces the grid table with it.
pub struct GridBuilder {
    store: Arc<dyn GridStore>,
    config: GridProcessorConfig,
    dry_run: bool,
}

impl GridBuilder {
    pub fn new(store: Arc<dyn GridStore>, config: GridProcessorConfig) -> Self {
        Self {
            store,
            config,
            dry_run: false,
        }
    }

    /// Mark reports as dry runs; the caller supplies a non-persistent store.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Read both rasters from disk, then build.
    ///
    /// File reads and the mask derivation are CPU-bound and run on the
    /// blocking pool. Both files are closed before the grid is derived.
    #[instrument(skip_all, fields(
        bias_corrected = %sources.bias_corrected.display(),
        non_bias_corrected = %sources.non_bias_corrected.display()
    ))]
    pub async fn build_from_files(&self, sources: &RasterSources) -> Result<GridBuildReport> {
        let sources = sources.clone();
        let config = self.config.clone();

        let derived = tokio::task::spawn_blocking(move || -> Result<DerivedGrid> {
            let rasters = read_raster_pair(
                &sources.bias_corrected,
                &sources.non_bias_corrected,
                &sources.options,
            )?;
            Ok(derive_grid(&rasters, &config)?)
        })
        .await
        .map_err(|e| IngestionError::Task(e.to_string()))??;

        self.persist(derived).await
    }

    /// Build from rasters already in memory.
    #[instrument(skip_all, fields(rasters = rasters.len()))]
    pub async fn build(&self, rasters: &[PresenceRaster]) -> Result<GridBuildReport> {
        let derived = derive_grid(rasters, &self.config)?;
        self.persist(derived).await
    }

    async fn persist(&self, derived: DerivedGrid) -> Result<GridBuildReport> {
        let mut report = summarize(&derived);
        report.dry_run = self.dry_run;

        report.rows_loaded = self.store.replace_grid(&derived.rows).await?;

        info!(
            width = report.width,
            height = report.height,
            rows = report.rows_loaded,
            bias_corrected = report.bias_corrected,
            non_bias_corrected = report.non_bias_corrected,
            dry_run = report.dry_run,
            "Grid table rebuilt"
        );

        Ok(report)
    }
}

/// Counts per source and per coastal label.
pub fn summarize(derived: &DerivedGrid) -> GridBuildReport {
    let (height, width) = derived.labelled.mask.shape();

    let mut coastal_counts = BTreeMap::new();
    for row in &derived.rows {
        *coastal_counts.entry(row.coastal.label().to_string()).or_insert(0) += 1;
    }

    GridBuildReport {
        width,
        height,
        bias_corrected: derived.labelled.mask.count(|&s| s == CellSource::BiasCorrected),
        non_bias_corrected: derived.labelled.mask.count(|&s| s == CellSource::NonBiasCorrected),
        rows_loaded: 0,
        coastal_counts,
        dry_run: false,
    }
}
