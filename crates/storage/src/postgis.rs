//! PostgreSQL/PostGIS implementation of the store traits.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use tracing::{debug, error, info, instrument, warn};

use chess_common::{BoundaryDefinition, CoastalClass};
use grid_processor::GridCellRow;

use crate::error::{StorageError, StorageResult};
use crate::schema;
use crate::store::{BoundaryStore, CandidateCell, GridStore, GridTable, OverlapRecord, OverlapStore};

/// Rows per `COPY` data message.
const COPY_BATCH_ROWS: usize = 10_000;

/// Store backed by a PostGIS database.
pub struct PostgisStore {
    pool: PgPool,
    grid: GridTable,
}

impl PostgisStore {
    /// Create a new store from a database URL.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        grid: GridTable,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(StorageError::database("Connection failed"))?;

        Self::new(pool, grid)
    }

    pub fn new(pool: PgPool, grid: GridTable) -> StorageResult<Self> {
        grid.validate()?;
        Ok(Self { pool, grid })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn grid_table(&self) -> &GridTable {
        &self.grid
    }

    /// Enable the PostGIS extension if it is not already.
    pub async fn ensure_postgis(&self) -> StorageResult<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis")
            .execute(&self.pool)
            .await
            .map_err(StorageError::database("Enabling PostGIS failed"))?;
        Ok(())
    }

    async fn load_grid(
        tx: &mut Transaction<'_, Postgres>,
        grid: &GridTable,
        rows: &[GridCellRow],
    ) -> StorageResult<u64> {
        let drop = schema::drop_table(&grid.name);
        sqlx::query(&drop)
            .execute(&mut **tx)
            .await
            .map_err(StorageError::database("Drop grid table failed"))?;

        let create = schema::create_grid_table(grid);
        sqlx::query(&create)
            .execute(&mut **tx)
            .await
            .map_err(StorageError::database("Create grid table failed"))?;

        let statement = schema::copy_grid(grid);
        let mut copy = tx
            .copy_in_raw(&statement)
            .await
            .map_err(|e| StorageError::BulkLoad(format!("COPY start failed: {}", e)))?;

        let mut buffer = String::with_capacity(COPY_BATCH_ROWS * 128);
        for chunk in rows.chunks(COPY_BATCH_ROWS) {
            buffer.clear();
            for row in chunk {
                buffer.push_str(&schema::grid_copy_line(row, grid.srid));
            }

            let sent = copy.send(buffer.as_bytes()).await.map(|_| ());
            if let Err(e) = sent {
                let message = format!("COPY send failed: {}", e);
                if let Err(abort) = copy.abort(message.clone()).await {
                    warn!(error = %abort, "COPY abort failed");
                }
                return Err(StorageError::BulkLoad(message));
            }
        }

        copy.finish()
            .await
            .map_err(|e| StorageError::BulkLoad(format!("COPY finish failed: {}", e)))
    }

    async fn rebuild_overlap_table(
        tx: &mut Transaction<'_, Postgres>,
        grid: &GridTable,
        boundary: &BoundaryDefinition,
    ) -> StorageResult<u64> {
        let drop = schema::drop_table(&boundary.overlap_table());
        sqlx::query(&drop)
            .execute(&mut **tx)
            .await
            .map_err(StorageError::database("Drop overlap table failed"))?;

        let create = schema::create_overlap_table(boundary);
        sqlx::query(&create)
            .execute(&mut **tx)
            .await
            .map_err(StorageError::database("Create overlap table failed"))?;

        let insert = schema::bulk_intersect(grid, boundary);
        let result = sqlx::query(&insert)
            .execute(&mut **tx)
            .await
            .map_err(|e| StorageError::BulkLoad(format!("Bulk intersect failed: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn tag_regions(
        tx: &mut Transaction<'_, Postgres>,
        grid: &GridTable,
        boundary: &BoundaryDefinition,
        coastal: &[CoastalClass],
    ) -> StorageResult<u64> {
        let alter = schema::add_coastal_column(boundary);
        sqlx::query(&alter)
            .execute(&mut **tx)
            .await
            .map_err(StorageError::database("Adding coastal column failed"))?;

        if boundary.all_coastal {
            let update = schema::tag_all_coastal(boundary);
            sqlx::query(&update)
                .execute(&mut **tx)
                .await
                .map_err(StorageError::database("Coastal update failed"))?;
        } else {
            let labels: Vec<String> = coastal.iter().map(|c| c.label().to_string()).collect();
            let update = schema::tag_coastal(grid, boundary);
            sqlx::query(&update)
                .bind(labels)
                .execute(&mut **tx)
                .await
                .map_err(StorageError::database("Coastal update failed"))?;
        }

        let count = schema::count_coastal(boundary);
        let tagged: i64 = sqlx::query_scalar(&count)
            .fetch_one(&mut **tx)
            .await
            .map_err(StorageError::database("Counting coastal regions failed"))?;

        Ok(tagged as u64)
    }

    async fn write_details(
        tx: &mut Transaction<'_, Postgres>,
        boundaries: &[BoundaryDefinition],
    ) -> StorageResult<u64> {
        let drop = schema::drop_table(schema::BOUNDARY_DETAILS_TABLE);
        sqlx::query(&drop)
            .execute(&mut **tx)
            .await
            .map_err(StorageError::database("Drop boundary_details failed"))?;

        let create = schema::create_boundary_details();
        sqlx::query(&create)
            .execute(&mut **tx)
            .await
            .map_err(StorageError::database("Create boundary_details failed"))?;

        let insert = schema::insert_boundary_details();
        for boundary in boundaries {
            sqlx::query(&insert)
                .bind(&boundary.identifier)
                .bind(&boundary.print_name)
                .bind(&boundary.name_column)
                .bind(boundary.source_srid)
                .bind(boundary.db_srid)
                .bind(boundary.boundary_table())
                .bind(boundary.overlap_table())
                .bind(boundary.method.as_str())
                .execute(&mut **tx)
                .await
                .map_err(StorageError::database("Insert boundary_details failed"))?;
        }

        Ok(boundaries.len() as u64)
    }
}

/// Commit on success; roll back and log on failure.
async fn finish<T>(
    tx: Transaction<'_, Postgres>,
    result: StorageResult<T>,
    operation: &str,
) -> StorageResult<T> {
    match result {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(StorageError::database("Commit failed"))?;
            Ok(value)
        }
        Err(e) => {
            error!(error = %e, operation, "Rolling back transaction");
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, operation, "Rollback failed");
            }
            Err(e)
        }
    }
}

fn db_cell_id(grid_cell_id: i64) -> StorageResult<i32> {
    i32::try_from(grid_cell_id)
        .map_err(|_| StorageError::OutOfRange(format!("grid_cell_id {}", grid_cell_id)))
}

#[async_trait]
impl GridStore for PostgisStore {
    #[instrument(skip_all, fields(table = %self.grid.name, rows = rows.len()))]
    async fn replace_grid(&self, rows: &[GridCellRow]) -> StorageResult<u64> {
        if let Some(row) = rows.iter().find(|r| i32::try_from(r.grid_cell_id).is_err()) {
            return Err(StorageError::OutOfRange(format!("grid_cell_id {}", row.grid_cell_id)));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(StorageError::database("Begin transaction failed"))?;

        let result = Self::load_grid(&mut tx, &self.grid, rows).await;
        let loaded = finish(tx, result, "replace_grid").await?;

        info!(table = %self.grid.name, rows = loaded, "Grid table loaded");
        Ok(loaded)
    }

    async fn grid_cell_count(&self) -> StorageResult<u64> {
        let sql = format!(r#"SELECT COUNT(*) FROM "{}""#, self.grid.name);
        let count: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::database("Count grid cells failed"))?;
        Ok(count as u64)
    }
}

#[async_trait]
impl OverlapStore for PostgisStore {
    async fn ensure_indexes(&self, boundary: &BoundaryDefinition) -> StorageResult<()> {
        boundary.validate()?;
        for (table, column) in [
            (self.grid.name.clone(), "geometry"),
            (boundary.boundary_table(), "geom"),
        ] {
            let sql = schema::create_gist_index(&table, column);
            sqlx::query(&sql)
                .execute(&self.pool)
                .await
                .map_err(StorageError::database("Create spatial index failed"))?;
            debug!(table = %table, column, "Spatial index ensured");
        }
        Ok(())
    }

    #[instrument(skip_all, fields(boundary = %boundary.identifier))]
    async fn rebuild_overlaps(&self, boundary: &BoundaryDefinition) -> StorageResult<u64> {
        boundary.validate()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(StorageError::database("Begin transaction failed"))?;

        let result = Self::rebuild_overlap_table(&mut tx, &self.grid, boundary).await;
        finish(tx, result, "rebuild_overlaps").await
    }

    async fn regions_without_overlap(&self, boundary: &BoundaryDefinition) -> StorageResult<Vec<i32>> {
        boundary.validate()?;
        let sql = schema::regions_without_overlap(boundary);
        sqlx::query_scalar::<_, i32>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::database("No-overlap query failed"))
    }

    async fn candidate_cells(
        &self,
        boundary: &BoundaryDefinition,
        gid: i32,
        scale_factor: f64,
    ) -> StorageResult<Vec<CandidateCell>> {
        boundary.validate()?;
        let sql = schema::candidate_cells(&self.grid, boundary);
        let rows: Vec<(i32, bool, f64)> = sqlx::query_as(&sql)
            .bind(gid)
            .bind(scale_factor)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::database("Candidate cell query failed"))?;

        Ok(rows
            .into_iter()
            .map(|(grid_cell_id, bias_corrected, distance)| CandidateCell {
                grid_cell_id: i64::from(grid_cell_id),
                bias_corrected,
                distance,
            })
            .collect())
    }

    async fn insert_overlap(
        &self,
        boundary: &BoundaryDefinition,
        record: &OverlapRecord,
    ) -> StorageResult<()> {
        boundary.validate()?;
        let sql = schema::insert_overlap(boundary);
        sqlx::query(&sql)
            .bind(record.gid)
            .bind(db_cell_id(record.grid_cell_id)?)
            .bind(record.is_overlap)
            .bind(record.bias_corrected)
            .execute(&self.pool)
            .await
            .map_err(StorageError::database("Insert overlap failed"))?;
        Ok(())
    }

    async fn region_ids(&self, boundary: &BoundaryDefinition) -> StorageResult<Vec<i32>> {
        boundary.validate()?;
        let sql = schema::region_ids(boundary);
        sqlx::query_scalar::<_, i32>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::database("Region id query failed"))
    }

    async fn region_name(&self, boundary: &BoundaryDefinition, gid: i32) -> StorageResult<Option<String>> {
        boundary.validate()?;
        let sql = schema::region_name(boundary);
        let name: Option<Option<String>> = sqlx::query_scalar(&sql)
            .bind(gid)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::database("Region name query failed"))?;
        Ok(name.flatten())
    }

    async fn overlapping_cells(
        &self,
        boundary: &BoundaryDefinition,
        gid: i32,
    ) -> StorageResult<Vec<OverlapRecord>> {
        boundary.validate()?;
        let sql = schema::overlapping_cells(boundary);
        let rows: Vec<(i32, i32, bool, bool)> = sqlx::query_as(&sql)
            .bind(gid)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::database("Overlap query failed"))?;

        Ok(rows
            .into_iter()
            .map(|(gid, grid_cell_id, is_overlap, bias_corrected)| OverlapRecord {
                gid,
                grid_cell_id: i64::from(grid_cell_id),
                is_overlap,
                bias_corrected,
            })
            .collect())
    }
}

#[async_trait]
impl BoundaryStore for PostgisStore {
    #[instrument(skip_all, fields(boundary = %boundary.identifier))]
    async fn tag_coastal(
        &self,
        boundary: &BoundaryDefinition,
        coastal: &[CoastalClass],
    ) -> StorageResult<u64> {
        boundary.validate()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(StorageError::database("Begin transaction failed"))?;

        let result = Self::tag_regions(&mut tx, &self.grid, boundary, coastal).await;
        finish(tx, result, "tag_coastal").await
    }

    async fn is_coastal(&self, boundary: &BoundaryDefinition, gid: i32) -> StorageResult<Option<bool>> {
        boundary.validate()?;
        let sql = schema::region_is_coastal(boundary);
        let flag: Option<Option<bool>> = sqlx::query_scalar(&sql)
            .bind(gid)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::database("Coastal flag query failed"))?;
        Ok(flag.flatten())
    }

    async fn replace_boundary_details(&self, boundaries: &[BoundaryDefinition]) -> StorageResult<u64> {
        for boundary in boundaries {
            boundary.validate()?;
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(StorageError::database("Begin transaction failed"))?;

        let result = Self::write_details(&mut tx, boundaries).await;
        finish(tx, result, "replace_boundary_details").await
    }
}
