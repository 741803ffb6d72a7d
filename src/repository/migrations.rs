//! Database migrations using diesel_migrations.
//!
//! Embeds migrations at compile time and runs them via a blocking task
//! to work with async connections.

use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{debug, info};

use super::pool::DbError;
use super::util::to_diesel_error;

pub const SQLITE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

/// Run pending migrations for a database URL.
///
/// Creating the schema is idempotent: an up-to-date database is left alone.
pub async fn run_migrations(database_url: &str) -> Result<(), DbError> {
    // diesel expects just the file path
    let url = database_url
        .strip_prefix("sqlite:")
        .unwrap_or(database_url)
        .to_string();

    tokio::task::spawn_blocking(move || {
        let mut conn = diesel::SqliteConnection::establish(&url).map_err(to_diesel_error)?;

        let applied = conn
            .run_pending_migrations(SQLITE_MIGRATIONS)
            .map_err(DbError::QueryBuilderError)?;

        for migration in &applied {
            info!("Applied migration: {}", migration);
        }
        if applied.is_empty() {
            debug!("No pending migrations");
        }

        Ok(())
    })
    .await
    .map_err(|e| DbError::QueryBuilderError(Box::new(e)))?
}
