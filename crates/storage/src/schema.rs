//! SQL text for the grid, overlap and boundary tables.
//!
//! Identifiers are interpolated, so every builder expects names that have
//! passed [`chess_common::validate_identifier`].

use chess_common::BoundaryDefinition;
use grid_processor::GridCellRow;

use crate::store::GridTable;

/// Column holding the coastal flag on boundary tables.
pub const COASTAL_COLUMN: &str = "is_coastal";

/// Registry of boundary datasets for the web client.
pub const BOUNDARY_DETAILS_TABLE: &str = "boundary_details";

pub fn drop_table(table: &str) -> String {
    format!(r#"DROP TABLE IF EXISTS "{}""#, table)
}

pub fn create_grid_table(grid: &GridTable) -> String {
    format!(
        r#"CREATE TABLE "{}" (
            grid_cell_id INTEGER PRIMARY KEY,
            geometry GEOMETRY(POLYGON, {}) NOT NULL,
            bias_corrected BOOLEAN NOT NULL,
            coastal_info VARCHAR(20)
        )"#,
        grid.name, grid.srid
    )
}

pub fn copy_grid(grid: &GridTable) -> String {
    format!(
        r#"COPY "{}" (grid_cell_id, geometry, bias_corrected, coastal_info) FROM STDIN"#,
        grid.name
    )
}

/// One line of `COPY ... FROM STDIN` text format: tab-separated, newline
/// terminated.
pub fn grid_copy_line(row: &GridCellRow, srid: i32) -> String {
    format!(
        "{}\t{}\t{}\t{}\n",
        row.grid_cell_id,
        row.ewkt(srid),
        if row.bias_corrected { "t" } else { "f" },
        row.coastal.label()
    )
}

pub fn create_overlap_table(boundary: &BoundaryDefinition) -> String {
    format!(
        r#"CREATE TABLE "{}" (
            gid INTEGER NOT NULL,
            grid_cell_id INTEGER NOT NULL,
            is_overlap BOOLEAN NOT NULL,
            bias_corrected BOOLEAN NOT NULL
        )"#,
        boundary.overlap_table()
    )
}

pub fn create_gist_index(table: &str, column: &str) -> String {
    format!(
        r#"CREATE INDEX IF NOT EXISTS "{table}_{column}_gist" ON "{table}" USING GIST ({column})"#,
        table = table,
        column = column
    )
}

/// Every intersecting (region, cell) pair. The `&&` envelope test runs
/// first and can use the GIST indexes; `ST_Intersects` is the exact test.
pub fn bulk_intersect(grid: &GridTable, boundary: &BoundaryDefinition) -> String {
    format!(
        r#"INSERT INTO "{overlaps}" (gid, grid_cell_id, is_overlap, bias_corrected)
        SELECT s.gid, g.grid_cell_id, TRUE, g.bias_corrected
        FROM "{grid}" g
        JOIN "{regions}" s ON g.geometry && s.geom
        WHERE ST_Intersects(g.geometry, s.geom)"#,
        overlaps = boundary.overlap_table(),
        grid = grid.name,
        regions = boundary.boundary_table()
    )
}

pub fn regions_without_overlap(boundary: &BoundaryDefinition) -> String {
    format!(
        r#"SELECT s.gid
        FROM "{regions}" s
        WHERE NOT EXISTS (SELECT 1 FROM "{overlaps}" o WHERE o.gid = s.gid)
        ORDER BY s.gid"#,
        regions = boundary.boundary_table(),
        overlaps = boundary.overlap_table()
    )
}

/// Bind `$1` = gid, `$2` = scale factor.
pub fn candidate_cells(grid: &GridTable, boundary: &BoundaryDefinition) -> String {
    format!(
        r#"WITH region AS (
            SELECT geom, ST_Centroid(geom) AS c FROM "{regions}" WHERE gid = $1
        ), search AS (
            SELECT geom,
                ST_Envelope(ST_Translate(
                    ST_Scale(ST_Translate(ST_Envelope(geom), -ST_X(c), -ST_Y(c)), $2, $2),
                    ST_X(c), ST_Y(c)
                )) AS area
            FROM region
        )
        SELECT g.grid_cell_id, g.bias_corrected, ST_Distance(g.geometry, search.geom) AS distance
        FROM "{grid}" g, search
        WHERE ST_Intersects(g.geometry, search.area)
        ORDER BY g.geometry <-> search.geom, g.grid_cell_id"#,
        regions = boundary.boundary_table(),
        grid = grid.name
    )
}

pub fn insert_overlap(boundary: &BoundaryDefinition) -> String {
    format!(
        r#"INSERT INTO "{}" (gid, grid_cell_id, is_overlap, bias_corrected) VALUES ($1, $2, $3, $4)"#,
        boundary.overlap_table()
    )
}

pub fn region_ids(boundary: &BoundaryDefinition) -> String {
    format!(r#"SELECT gid FROM "{}" ORDER BY gid"#, boundary.boundary_table())
}

/// The name column is left unquoted so it folds to lower case, matching
/// how the shapefile importer names columns.
pub fn region_name(boundary: &BoundaryDefinition) -> String {
    format!(
        r#"SELECT {}::TEXT FROM "{}" WHERE gid = $1"#,
        boundary.name_column,
        boundary.boundary_table()
    )
}

pub fn overlapping_cells(boundary: &BoundaryDefinition) -> String {
    format!(
        r#"SELECT gid, grid_cell_id, is_overlap, bias_corrected FROM "{}" WHERE gid = $1 ORDER BY grid_cell_id"#,
        boundary.overlap_table()
    )
}

pub fn add_coastal_column(boundary: &BoundaryDefinition) -> String {
    format!(
        r#"ALTER TABLE "{}" ADD COLUMN IF NOT EXISTS "{}" BOOLEAN"#,
        boundary.boundary_table(),
        COASTAL_COLUMN
    )
}

/// Bind `$1` = coastal labels (`TEXT[]`).
pub fn tag_coastal(grid: &GridTable, boundary: &BoundaryDefinition) -> String {
    format!(
        r#"UPDATE "{regions}" b
        SET "{column}" = EXISTS (
            SELECT 1
            FROM "{overlaps}" o
            JOIN "{grid}" g ON o.grid_cell_id = g.grid_cell_id
            WHERE o.gid = b.gid AND g.coastal_info = ANY($1)
        )"#,
        regions = boundary.boundary_table(),
        column = COASTAL_COLUMN,
        overlaps = boundary.overlap_table(),
        grid = grid.name
    )
}

pub fn tag_all_coastal(boundary: &BoundaryDefinition) -> String {
    format!(
        r#"UPDATE "{}" SET "{}" = TRUE"#,
        boundary.boundary_table(),
        COASTAL_COLUMN
    )
}

pub fn count_coastal(boundary: &BoundaryDefinition) -> String {
    format!(
        r#"SELECT COUNT(*) FROM "{}" WHERE "{}""#,
        boundary.boundary_table(),
        COASTAL_COLUMN
    )
}

pub fn region_is_coastal(boundary: &BoundaryDefinition) -> String {
    format!(
        r#"SELECT "{}" FROM "{}" WHERE gid = $1"#,
        COASTAL_COLUMN,
        boundary.boundary_table()
    )
}

pub fn create_boundary_details() -> String {
    format!(
        r#"CREATE TABLE "{}" (
            boundary_identifier TEXT PRIMARY KEY,
            print_name TEXT NOT NULL,
            shapefile_name_col TEXT NOT NULL,
            source_srid INTEGER NOT NULL,
            db_srid INTEGER NOT NULL,
            boundary_table_name TEXT NOT NULL,
            overlap_table_name TEXT NOT NULL,
            method TEXT NOT NULL CHECK (method IN ('cache', 'cell'))
        )"#,
        BOUNDARY_DETAILS_TABLE
    )
}

pub fn insert_boundary_details() -> String {
    format!(
        r#"INSERT INTO "{}" (
            boundary_identifier, print_name, shapefile_name_col, source_srid, db_srid,
            boundary_table_name, overlap_table_name, method
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        BOUNDARY_DETAILS_TABLE
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_common::{cell_polygon, CoastalClass, GridAxes, QueryMethod};

    fn lsoa() -> BoundaryDefinition {
        BoundaryDefinition::new("lsoa", "LSOA", "LSOA21NM", QueryMethod::Cell)
    }

    #[test]
    fn test_copy_line() {
        let axes = GridAxes::regular(2, 1, 500.0, 500.0, 1000.0, 1000.0).unwrap();
        let row = GridCellRow {
            grid_cell_id: 1,
            polygon: cell_polygon(&axes.x_edges(), &axes.y_edges(), 0, 1),
            bias_corrected: false,
            coastal: CoastalClass::Within20Km,
        };
        assert_eq!(
            grid_copy_line(&row, 27700),
            "1\tSRID=27700;POLYGON((1000 0,2000 0,2000 1000,1000 1000,1000 0))\tf\t20km from coast\n"
        );
    }

    #[test]
    fn test_tables_are_quoted() {
        let sql = bulk_intersect(&GridTable::default(), &lsoa());
        assert!(sql.contains(r#"INSERT INTO "grid_overlaps_lsoa""#));
        assert!(sql.contains(r#"FROM "chess_scape_grid" g"#));
        assert!(sql.contains(r#"JOIN "boundary_lsoa" s ON g.geometry && s.geom"#));
    }

    #[test]
    fn test_region_name_uses_name_column() {
        assert_eq!(
            region_name(&lsoa()),
            r#"SELECT LSOA21NM::TEXT FROM "boundary_lsoa" WHERE gid = $1"#
        );
    }

    #[test]
    fn test_gist_index_name() {
        assert_eq!(
            create_gist_index("boundary_iom", "geom"),
            r#"CREATE INDEX IF NOT EXISTS "boundary_iom_geom_gist" ON "boundary_iom" USING GIST (geom)"#
        );
    }
}
