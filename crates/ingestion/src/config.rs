//! Configuration for the ingestion stages.

use serde::{Deserialize, Serialize};

use chess_common::{BoundaryDefinition, ChessError, ChessResult, CoastalClass};

/// Bounds of the expanding nearest-cell search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NearestSearchConfig {
    /// Envelope scale factor of the first attempt; 1.0 is the region's own envelope.
    pub initial_scale: f64,

    /// Multiplier applied to the scale factor after an empty attempt.
    pub expansion_factor: f64,

    /// Attempts before the search gives up.
    pub max_attempts: u32,
}

impl Default for NearestSearchConfig {
    fn default() -> Self {
        Self {
            initial_scale: 1.0,
            expansion_factor: 1.5,
            max_attempts: 25,
        }
    }
}

impl NearestSearchConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("NEAREST_SEARCH_INITIAL_SCALE") {
            if let Ok(scale) = val.parse() {
                config.initial_scale = scale;
            }
        }

        if let Ok(val) = std::env::var("NEAREST_SEARCH_EXPANSION") {
            if let Ok(factor) = val.parse() {
                config.expansion_factor = factor;
            }
        }

        if let Ok(val) = std::env::var("NEAREST_SEARCH_MAX_ATTEMPTS") {
            if let Ok(attempts) = val.parse() {
                config.max_attempts = attempts;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.initial_scale.is_finite() && self.initial_scale > 0.0) {
            return Err(format!("initial_scale must be positive, got {}", self.initial_scale));
        }

        if !(self.expansion_factor.is_finite() && self.expansion_factor > 1.0) {
            return Err(format!(
                "expansion_factor must be greater than 1, got {}",
                self.expansion_factor
            ));
        }

        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }

        Ok(())
    }

    /// Scale factor used on attempt `attempt` (1-based).
    pub fn scale_for_attempt(&self, attempt: u32) -> f64 {
        self.initial_scale * self.expansion_factor.powi(attempt.saturating_sub(1) as i32)
    }
}

/// Coastal classes that make a region coastal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoastalTagConfig {
    /// Labels as stored in `coastal_info`, e.g. `10km from coast`.
    pub labels: Vec<String>,
}

impl Default for CoastalTagConfig {
    fn default() -> Self {
        Self {
            labels: [CoastalClass::Coastline, CoastalClass::Within10Km, CoastalClass::Within20Km]
                .iter()
                .map(|c| c.label().to_string())
                .collect(),
        }
    }
}

impl CoastalTagConfig {
    /// Parse the configured labels.
    pub fn classes(&self) -> ChessResult<Vec<CoastalClass>> {
        self.labels.iter().map(|l| CoastalClass::from_label(l)).collect()
    }

    pub fn validate(&self) -> Result<(), String> {
        let classes = self.classes().map_err(|e| e.to_string())?;
        if classes.is_empty() {
            return Err("at least one coastal label is required".to_string());
        }
        if classes.contains(&CoastalClass::Ocean) {
            return Err("ocean cells are never persisted and cannot mark a region coastal".to_string());
        }
        Ok(())
    }
}

/// Resolve boundary identifiers against the registry, keeping the given order.
///
/// An empty selection means every registered boundary.
pub fn select_boundaries<'a>(
    registry: &'a [BoundaryDefinition],
    identifiers: &[String],
) -> ChessResult<Vec<&'a BoundaryDefinition>> {
    if identifiers.is_empty() {
        return Ok(registry.iter().collect());
    }

    identifiers
        .iter()
        .map(|id| {
            registry
                .iter()
                .find(|def| &def.identifier == id)
                .ok_or_else(|| ChessError::UnknownBoundary(id.clone()))
        })
        .collect()
}
