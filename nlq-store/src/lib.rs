//! Execution seam: runs synthesized statements and introspects the live
//! database into a catalog.

use async_trait::async_trait;
use nlq_schema::{Catalog, CatalogError};
use nlq_types::{ResultSet, Statement};
use thiserror::Error;

pub mod seed;
pub mod sqlite;

pub use seed::DEMO_SEED_SQL;
pub use sqlite::SqliteEngine;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("statement rejected: {0}")]
    Rejected(String),
    #[error("parameter mismatch: statement expects {expected}, got {given}")]
    ParamMismatch { expected: usize, given: usize },
    #[error("loaded catalog is invalid: {0}")]
    Catalog(#[from] CatalogError),
    #[error("catalog loading is not supported by `{0}`")]
    Unsupported(&'static str),
    #[error("worker task failed: {0}")]
    Task(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Runs parameterized, read-only statements.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn execute(&self, statement: &Statement) -> Result<ResultSet, StoreError>;

    /// Short label for logs and health output.
    fn name(&self) -> &'static str;
}

/// Builds a catalog from the live database.
#[async_trait]
pub trait CatalogLoader: Send + Sync {
    async fn load_catalog(&self) -> Result<Catalog, StoreError>;
}

/// Dry-run engine: every statement yields an empty result.
pub struct NullEngine;

#[async_trait]
impl QueryEngine for NullEngine {
    async fn execute(&self, _statement: &Statement) -> Result<ResultSet, StoreError> {
        Ok(ResultSet::default())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

#[async_trait]
impl CatalogLoader for NullEngine {
    async fn load_catalog(&self) -> Result<Catalog, StoreError> {
        Err(StoreError::Unsupported("null"))
    }
}
