//! Configuration for the grid processor.

use geo::{LineString, Polygon};
use serde::{Deserialize, Serialize};

/// Configuration for mask building and coastal classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridProcessorConfig {
    /// Enclosed water bodies of at most this many cells are filled as land.
    pub hole_fill_threshold: usize,

    /// Connectivity used to group water cells into bodies.
    pub connectivity: Connectivity,

    /// Regions where the non-bias-corrected source is kept.
    pub restriction_regions: Vec<RestrictionRegion>,
}

impl Default for GridProcessorConfig {
    fn default() -> Self {
        Self {
            hole_fill_threshold: 15,
            connectivity: Connectivity::Four,
            restriction_regions: RestrictionRegion::defaults(),
        }
    }
}

impl GridProcessorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HOLE_FILL_THRESHOLD") {
            if let Ok(threshold) = val.parse() {
                config.hole_fill_threshold = threshold;
            }
        }

        if let Ok(val) = std::env::var("HOLE_FILL_CONNECTIVITY") {
            if let Some(connectivity) = val
                .parse::<u8>()
                .ok()
                .and_then(|n| Connectivity::try_from(n).ok())
            {
                config.connectivity = connectivity;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.restriction_regions.is_empty() {
            return Err("at least one restriction region is required".to_string());
        }

        for region in &self.restriction_regions {
            region.validate()?;
        }

        Ok(())
    }
}

/// Neighbourhood used when labelling connected water bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Connectivity {
    /// Edge neighbours only.
    #[default]
    Four,
    /// Edge and corner neighbours.
    Eight,
}

impl Connectivity {
    /// Row/column offsets of the neighbourhood.
    pub fn offsets(self) -> &'static [(isize, isize)] {
        const FOUR: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        const EIGHT: [(isize, isize); 8] = [
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ];

        match self {
            Self::Four => &FOUR,
            Self::Eight => &EIGHT,
        }
    }
}

impl TryFrom<u8> for Connectivity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            other => Err(format!("connectivity must be 4 or 8, got {}", other)),
        }
    }
}

impl From<Connectivity> for u8 {
    fn from(value: Connectivity) -> Self {
        match value {
            Connectivity::Four => 4,
            Connectivity::Eight => 8,
        }
    }
}

/// A named polygon in raster-index space.
///
/// Vertices are `[x, y]` pairs where `x` is the column and `y` the row of
/// the fixed 1km raster. They are only meaningful for that grid's extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictionRegion {
    pub name: String,

    /// Where the vertices came from.
    #[serde(default)]
    pub provenance: String,

    pub vertices: Vec<[f64; 2]>,
}

impl RestrictionRegion {
    /// Northern Ireland and the Isles of Scilly.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                name: "Northern Ireland".to_string(),
                provenance: "hand-traced on the CHESS-SCAPE 1km raster (656 x 1057)".to_string(),
                vertices: vec![
                    [0.0, 460.0],
                    [200.0, 460.0],
                    [200.0, 500.0],
                    [135.0, 620.0],
                    [0.0, 600.0],
                ],
            },
            Self {
                name: "Isles of Scilly".to_string(),
                provenance: "hand-traced on the CHESS-SCAPE 1km raster (656 x 1057)".to_string(),
                vertices: vec![[75.0, 0.0], [75.0, 50.0], [100.0, 50.0], [100.0, 0.0]],
            },
        ]
    }

    /// Closed polygon over the vertices.
    pub fn polygon(&self) -> Polygon<f64> {
        let ring: Vec<(f64, f64)> = self.vertices.iter().map(|v| (v[0], v[1])).collect();
        // LineString -> Polygon closes the ring.
        Polygon::new(LineString::from(ring), vec![])
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.vertices.len() < 3 {
            return Err(format!(
                "restriction region '{}' needs at least 3 vertices, got {}",
                self.name,
                self.vertices.len()
            ));
        }

        if self.vertices.iter().flatten().any(|v| !v.is_finite()) {
            return Err(format!(
                "restriction region '{}' has non-finite vertices",
                self.name
            ));
        }

        Ok(())
    }
}
