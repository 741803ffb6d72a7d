//! Database context for managing connections and repository access.
//!
//! The DbContext is the entry point for database work: it holds the
//! connection pool and hands out repositories that share it.

use std::path::Path;

use super::books::DieselBookRepository;
use super::meta::DieselMetaRepository;
use super::migrations::run_migrations;
use super::pool::{DbError, DbPool};

/// Database context that manages the connection pool and provides repository access.
#[derive(Clone, Debug)]
pub struct DbContext {
    pool: DbPool,
}

impl DbContext {
    /// Create a context from a database file path.
    pub fn new(db_path: &Path) -> Self {
        Self {
            pool: DbPool::from_path(db_path),
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Bring the schema up to date.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        run_migrations(self.pool.database_url()).await
    }

    pub fn books(&self) -> DieselBookRepository {
        DieselBookRepository::new(self.pool.clone())
    }

    pub fn meta(&self) -> DieselMetaRepository {
        DieselMetaRepository::new(self.pool.clone())
    }
}
