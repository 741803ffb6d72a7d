//! Web server command.

use std::sync::Arc;

use console::style;

use super::super::helpers::{
    build_bot, build_cleanup_worker, build_sync_worker, open_database, shutdown_signal,
};
use crate::config::Settings;
use crate::server::{self, AppState};
use crate::services::BackgroundWorkers;

/// Migrate, start the background workers and serve until interrupted.
pub async fn cmd_serve(settings: Settings, bind: &str) -> anyhow::Result<()> {
    settings.warn_disabled_features();

    println!("{} Running database migrations...", style("→").cyan());
    let db = match open_database(&settings).await {
        Ok(db) => {
            println!("  {} Database ready", style("✓").green());
            db
        }
        Err(e) => {
            eprintln!("  {} Migration failed: {:#}", style("✗").red(), e);
            return Err(e);
        }
    };

    let bot = build_bot(&settings)?;
    let sync = build_sync_worker(&settings, &db, bot.as_ref());
    let cleanup = if settings.cleanup_enabled() {
        build_cleanup_worker(&settings, &db, bot.as_ref())
    } else {
        None
    };

    let workers = BackgroundWorkers::spawn(
        sync.clone().map(|w| (w, settings.sync.poll_interval)),
        cleanup.map(|w| (w, settings.cleanup.interval)),
    );
    if workers.is_empty() {
        println!(
            "  {} Telegram workers disabled; serving the existing catalog only",
            style("!").yellow()
        );
    }

    let state = AppState::new(&db, Arc::new(settings), bot, sync);

    println!(
        "{} Starting ThaiGL server at http://{}",
        style("→").cyan(),
        bind
    );
    println!("  Press Ctrl+C to stop");

    let result = server::serve(state, bind, shutdown_signal()).await;

    workers.shutdown().await;
    println!("{} Server stopped", style("✓").green());
    result
}
