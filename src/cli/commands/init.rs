//! Initialize command.

use console::style;

use super::super::helpers::open_database;
use crate::config::Settings;

/// Create the data directories and bring the database schema up to date.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    open_database(settings).await?;

    println!(
        "{} Database ready at {}",
        style("✓").green(),
        settings.database_path.display()
    );
    println!(
        "  Cover cache: {}",
        style(settings.cover_cache_dir.display()).dim()
    );
    Ok(())
}
