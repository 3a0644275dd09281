//! Persistence for the grid builder.
//!
//! Provides:
//! - Store contracts for the grid table, overlap tables and boundary tables
//! - A PostGIS implementation using `sqlx` with `COPY` bulk loads
//! - An in-memory implementation used by tests and dry runs

pub mod error;
pub mod memory;
pub mod postgis;
pub mod schema;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use memory::{MemoryRegion, MemoryStore};
pub use postgis::PostgisStore;
pub use store::{
    is_coastal, BoundaryStore, CandidateCell, GridStore, GridTable, OverlapRecord, OverlapStore,
};
