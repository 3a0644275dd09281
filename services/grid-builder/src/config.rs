//! Grid builder configuration.
//!
//! Loaded from a YAML file. `${VAR}` references and a leading `~` are
//! expanded before parsing, and `DATABASE_URL` overrides the database
//! section when set.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use chess_common::{default_boundaries, BoundaryDefinition};
use grid_processor::GridProcessorConfig;
use ingestion::{CoastalTagConfig, NearestSearchConfig, RasterSources};
use netcdf_parser::ReadOptions;
use storage::GridTable;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub database: DatabaseConfig,
    /// Required by the `grid` command only.
    pub rasters: Option<RasterConfig>,
    pub grid: GridConfig,
    pub overlaps: OverlapConfig,
    pub coastal: CoastalTagConfig,
    pub boundaries: BoundaryRegistry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            name: "chess_scape".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgresql://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.name
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterConfig {
    pub bias_corrected: PathBuf,
    pub non_bias_corrected: PathBuf,
    #[serde(default = "default_variable")]
    pub variable: String,
    #[serde(default)]
    pub time_index: usize,
}

fn expand_home(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn default_variable() -> String {
    ReadOptions::default().variable
}

impl RasterConfig {
    pub fn sources(&self) -> RasterSources {
        RasterSources {
            bias_corrected: self.bias_corrected.clone(),
            non_bias_corrected: self.non_bias_corrected.clone(),
            options: ReadOptions {
                variable: self.variable.clone(),
                time_index: self.time_index,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(flatten)]
    pub table: GridTable,
    #[serde(flatten)]
    pub processing: GridProcessorConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapConfig {
    /// Boundaries processed by `overlaps` and `coastal`; empty means all.
    pub boundaries: Vec<String>,
    pub nearest_search: NearestSearchConfig,
}

/// Boundary datasets in processing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundaryRegistry(pub Vec<BoundaryDefinition>);

impl Default for BoundaryRegistry {
    fn default() -> Self {
        Self(default_boundaries())
    }
}

impl BuilderConfig {
    /// Read, expand and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;

        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path.as_ref()))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Expand variables, parse YAML and expand `~` in raster paths.
    ///
    /// Comment lines are blanked before expansion so they never reference the
    /// environment; line numbers in parse errors are preserved.
    pub fn parse(content: &str) -> Result<Self> {
        let stripped = strip_comment_lines(content);
        let expanded = shellexpand::env(&stripped).context("Variable substitution failed")?;
        let mut config: Self = serde_yaml::from_str(&expanded)?;

        if let Some(rasters) = config.rasters.as_mut() {
            rasters.bias_corrected = expand_home(&rasters.bias_corrected);
            rasters.non_bias_corrected = expand_home(&rasters.non_bias_corrected);
        }
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.database.max_connections > 0, "max_connections must be at least 1");

        self.grid.table.validate()?;
        self.grid
            .processing
            .validate()
            .map_err(|e| anyhow::anyhow!("grid: {}", e))?;
        self.overlaps
            .nearest_search
            .validate()
            .map_err(|e| anyhow::anyhow!("overlaps.nearest_search: {}", e))?;
        self.coastal
            .validate()
            .map_err(|e| anyhow::anyhow!("coastal: {}", e))?;

        anyhow::ensure!(!self.boundaries.0.is_empty(), "at least one boundary is required");
        for boundary in &self.boundaries.0 {
            boundary
                .validate()
                .with_context(|| format!("boundary {}", boundary.identifier))?;
        }
        ingestion::select_boundaries(&self.boundaries.0, &self.overlaps.boundaries)?;

        Ok(())
    }
}

fn strip_comment_lines(content: &str) -> String {
    content
        .lines()
        .map(|line| if line.trim_start().starts_with('#') { "" } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
database:
  host: db
  name: climate
  user: loader
  password: ${GRID_BUILDER_TEST_PASSWORD}
rasters:
  bias_corrected: /data/tas_bias.nc
  non_bias_corrected: /data/tas_raw.nc
grid:
  name: chess_scape_grid
  hole_fill_threshold: 20
  connectivity: 8
overlaps:
  boundaries: [lsoa, msoa]
  nearest_search:
    max_attempts: 10
coastal:
  labels: [coastline, 10km from coast]
"#;

    #[test]
    fn test_parse_sample() {
        std::env::set_var("GRID_BUILDER_TEST_PASSWORD", "s3cret");
        let config = BuilderConfig::parse(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.database.connection_url(), "postgresql://loader:s3cret@db:5432/climate");
        assert_eq!(config.grid.table.srid, 27700);
        assert_eq!(config.grid.processing.hole_fill_threshold, 20);
        assert_eq!(config.grid.processing.connectivity, grid_processor::Connectivity::Eight);
        assert_eq!(config.grid.processing.restriction_regions.len(), 2);
        assert_eq!(config.overlaps.nearest_search.max_attempts, 10);
        assert_eq!(config.overlaps.nearest_search.expansion_factor, 1.5);
        assert_eq!(config.coastal.labels.len(), 2);
        assert_eq!(config.boundaries.0.len(), 8);

        let sources = config.rasters.unwrap().sources();
        assert_eq!(sources.bias_corrected, PathBuf::from("/data/tas_bias.nc"));
        assert_eq!(sources.options.variable, "tas");
        assert_eq!(sources.options.time_index, 0);
    }

    #[test]
    fn test_home_is_expanded_in_raster_paths() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        let yaml = "rasters:\n  bias_corrected: ~/tas_bias.nc\n  non_bias_corrected: ~/tas_raw.nc\n";
        let rasters = BuilderConfig::parse(yaml).unwrap().rasters.unwrap();
        assert_eq!(rasters.bias_corrected, Path::new(&home).join("tas_bias.nc"));
    }

    #[test]
    fn test_missing_variable_fails() {
        std::env::remove_var("GRID_BUILDER_UNSET_VAR");
        let result = BuilderConfig::parse("database:\n  password: ${GRID_BUILDER_UNSET_VAR}\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = BuilderConfig::parse("{}").unwrap();
        config.validate().unwrap();
        assert!(config.rasters.is_none());
        assert_eq!(config.grid.table.name, "chess_scape_grid");
        assert_eq!(config.overlaps.nearest_search, NearestSearchConfig::default());
    }

    #[test]
    fn test_unknown_boundary_selection_fails() {
        let config = BuilderConfig::parse("overlaps:\n  boundaries: [wards]\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_boundary_registry() {
        let yaml = r#"
boundaries:
  - identifier: wards
    print_name: Electoral wards
    name_column: WD23NM
    method: cell
"#;
        let config = BuilderConfig::parse(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.boundaries.0.len(), 1);
        assert_eq!(config.boundaries.0[0].overlap_table(), "grid_overlaps_wards");
        assert!(!config.boundaries.0[0].all_coastal);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database:\n  url: postgresql://u:p@h/db\n  max_connections: 2").unwrap();

        let config = BuilderConfig::load(file.path()).unwrap();
        if std::env::var("DATABASE_URL").is_err() {
            assert_eq!(config.database.connection_url(), "postgresql://u:p@h/db");
        }
        assert_eq!(config.database.max_connections, 2);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(BuilderConfig::load("/nonexistent/grid-builder.yaml").is_err());
    }

    #[test]
    fn test_variables_in_comments_are_ignored() {
        std::env::remove_var("GRID_BUILDER_UNSET_VAR");
        let yaml = "# set ${GRID_BUILDER_UNSET_VAR} to override\n  # ${GRID_BUILDER_UNSET_VAR}\ngrid:\n  name: cells\n";
        let config = BuilderConfig::parse(yaml).unwrap();
        assert_eq!(config.grid.table.name, "cells");
    }

    #[test]
    fn test_shipped_config_needs_only_postgres_variables() {
        for (key, value) in [
            ("POSTGRES_HOST", "db"),
            ("POSTGRES_DB", "climate"),
            ("POSTGRES_USER", "loader"),
            ("POSTGRES_PASSWORD", "pw"),
        ] {
            std::env::set_var(key, value);
        }
        std::env::remove_var("VAR");

        let content = include_str!("../../../config/grid-builder.yaml");
        let config = BuilderConfig::parse(content).unwrap();
        config.validate().unwrap();

        assert_eq!(config.database.connection_url(), "postgresql://loader:pw@db:5432/climate");
        assert_eq!(config.grid.processing.hole_fill_threshold, 15);
        assert_eq!(config.coastal.labels.len(), 3);
        assert_eq!(config.boundaries.0.len(), 8);
        assert!(config.overlaps.boundaries.is_empty());
        assert!(config.rasters.is_some());
    }
}
