//! Wiring shared by the commands: bot client and worker construction.

use std::sync::Arc;

use anyhow::Context;

use crate::config::Settings;
use crate::repository::DbContext;
use crate::services::cleanup::ProbeOptions;
use crate::services::{CleanupWorker, GonePolicy, SyncWorker};
use crate::telegram::{BotApi, BotClient};

/// Bot API client, when a token is configured.
pub fn build_bot(settings: &Settings) -> anyhow::Result<Option<Arc<dyn BotApi>>> {
    let Some(token) = settings.telegram.bot_token.as_deref() else {
        return Ok(None);
    };
    let client = BotClient::new(&settings.telegram.api_base, token)
        .context("failed to build Telegram client")?;
    Ok(Some(Arc::new(client)))
}

/// Sync worker, when both a bot and the tracked group are configured.
pub fn build_sync_worker(
    settings: &Settings,
    db: &DbContext,
    bot: Option<&Arc<dyn BotApi>>,
) -> Option<Arc<SyncWorker>> {
    let bot = bot?;
    let chat_id = settings.telegram.book_chat_id.as_deref()?;
    Some(Arc::new(SyncWorker::new(
        bot.clone(),
        db,
        chat_id,
        &settings.default_source,
        settings.sync.poll_timeout_secs,
    )))
}

/// Cleanup worker, when a bot and the maintenance chat are configured.
///
/// The interval is not checked here so a one-off pass can run even when the
/// periodic loop is off.
pub fn build_cleanup_worker(
    settings: &Settings,
    db: &DbContext,
    bot: Option<&Arc<dyn BotApi>>,
) -> Option<Arc<CleanupWorker>> {
    let bot = bot?;
    let maint_chat_id = settings.telegram.maint_chat_id.as_deref()?;
    let cleanup = &settings.cleanup;
    Some(Arc::new(CleanupWorker::new(
        bot.clone(),
        db,
        maint_chat_id,
        GonePolicy::new(cleanup.gone_signatures.clone()),
        ProbeOptions {
            delay: cleanup.probe_delay,
            timeout: cleanup.probe_timeout,
            purge_copies: cleanup.purge_probe_copies,
        },
    )))
}

/// Prepare directories and bring the schema up to date.
pub async fn open_database(settings: &Settings) -> anyhow::Result<DbContext> {
    settings.ensure_directories()?;
    let db = DbContext::new(&settings.database_path);
    db.init_schema()
        .await
        .with_context(|| format!("migrating {}", settings.database_path.display()))?;
    Ok(db)
}

/// Resolves on Ctrl-C (and SIGTERM on Unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
