//! Registry of administrative boundary datasets.

use serde::{Deserialize, Serialize};

use crate::error::{ChessError, ChessResult};
use crate::BRITISH_NATIONAL_GRID;

/// How the web client queries climate data for a boundary type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMethod {
    /// Precomputed per-region cache tables (large regions).
    Cache,
    /// On-the-fly aggregation over the overlapping cells (small regions).
    Cell,
}

impl QueryMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Cell => "cell",
        }
    }
}

/// One boundary dataset, loaded externally into `boundary_{identifier}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryDefinition {
    /// Short identifier, e.g. `uk_counties`. Used to derive table names.
    pub identifier: String,
    /// Human readable name.
    pub print_name: String,
    /// Shapefile attribute column holding each region's display name.
    pub name_column: String,
    #[serde(default = "default_srid")]
    pub source_srid: i32,
    #[serde(default = "default_srid")]
    pub db_srid: i32,
    pub method: QueryMethod,
    /// Tag every region as coastal regardless of its overlapping cells.
    #[serde(default)]
    pub all_coastal: bool,
}

fn default_srid() -> i32 {
    BRITISH_NATIONAL_GRID
}

impl BoundaryDefinition {
    pub fn new(
        identifier: &str,
        print_name: &str,
        name_column: &str,
        method: QueryMethod,
    ) -> Self {
        Self {
            identifier: identifier.to_string(),
            print_name: print_name.to_string(),
            name_column: name_column.to_string(),
            source_srid: BRITISH_NATIONAL_GRID,
            db_srid: BRITISH_NATIONAL_GRID,
            method,
            all_coastal: false,
        }
    }

    /// Table the shapefile is imported into.
    pub fn boundary_table(&self) -> String {
        format!("boundary_{}", self.identifier)
    }

    /// Table holding this boundary's grid overlaps.
    pub fn overlap_table(&self) -> String {
        format!("grid_overlaps_{}", self.identifier)
    }

    /// Table and column names are interpolated into SQL, so the identifier
    /// must be a plain lowercase token and the name column must not contain
    /// quotes.
    pub fn validate(&self) -> ChessResult<()> {
        validate_identifier(&self.identifier)?;

        let name_ok = !self.name_column.is_empty()
            && self
                .name_column
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !name_ok {
            return Err(ChessError::InvalidIdentifier(self.name_column.clone()));
        }

        Ok(())
    }
}

/// Check a token is safe to interpolate into a quoted SQL identifier.
pub fn validate_identifier(identifier: &str) -> ChessResult<()> {
    let ok = !identifier.is_empty()
        && identifier
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if ok {
        Ok(())
    } else {
        Err(ChessError::InvalidIdentifier(identifier.to_string()))
    }
}

/// Boundary datasets in processing order.
pub fn default_boundaries() -> Vec<BoundaryDefinition> {
    use QueryMethod::*;

    let mut boundaries = vec![
        BoundaryDefinition::new("uk_counties", "UK counties and unitary authorities", "CTYUA23NM", Cache),
        BoundaryDefinition::new("la_districts", "Local authority districts", "LAD23NM", Cache),
        BoundaryDefinition::new("lsoa", "Lower layer super output areas", "LSOA21NM", Cell),
        BoundaryDefinition::new("msoa", "Middle layer super output areas", "MSOA21NM", Cell),
        BoundaryDefinition::new("parishes", "Parishes", "PAR23NM", Cell),
        BoundaryDefinition::new("sc_dz", "Scottish data zones", "Name", Cell),
        BoundaryDefinition::new("ni_dz", "Northern Ireland data zones", "DZ2021_nm", Cell),
        BoundaryDefinition::new("iom", "Isle of Man", "NAME_ENGLI", Cell),
    ];

    // The raster treats the land border with the Republic of Ireland as coast.
    for boundary in boundaries.iter_mut().filter(|b| b.identifier == "ni_dz") {
        boundary.all_coastal = true;
    }

    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        let def = BoundaryDefinition::new("lsoa", "LSOA", "LSOA21NM", QueryMethod::Cell);
        assert_eq!(def.boundary_table(), "boundary_lsoa");
        assert_eq!(def.overlap_table(), "grid_overlaps_lsoa");
    }

    #[test]
    fn test_default_boundaries_are_valid() {
        let defs = default_boundaries();
        assert_eq!(defs.len(), 8);
        assert_eq!(defs[0].identifier, "uk_counties");
        for def in &defs {
            def.validate().unwrap();
        }
        assert!(defs.iter().find(|d| d.identifier == "ni_dz").unwrap().all_coastal);
        assert!(!defs.iter().find(|d| d.identifier == "lsoa").unwrap().all_coastal);
    }

    #[test]
    fn test_rejects_unsafe_identifiers() {
        assert!(validate_identifier("lsoa; DROP TABLE x").is_err());
        assert!(validate_identifier("Counties").is_err());
        assert!(validate_identifier("").is_err());

        let mut def = BoundaryDefinition::new("lsoa", "LSOA", "LSOA21NM", QueryMethod::Cell);
        def.name_column = "name\"".to_string();
        assert!(def.validate().is_err());
    }
}
