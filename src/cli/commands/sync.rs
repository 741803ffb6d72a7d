//! One-shot sync command.

use anyhow::bail;
use console::style;

use super::super::helpers::{build_bot, build_sync_worker, open_database};
use crate::config::Settings;

/// Fetch pending updates once and apply them.
pub async fn cmd_sync(settings: &Settings) -> anyhow::Result<()> {
    let db = open_database(settings).await?;
    let bot = build_bot(settings)?;
    let Some(worker) = build_sync_worker(settings, &db, bot.as_ref()) else {
        bail!("sync needs TG_BOT_TOKEN and TG_BOOK_CHAT_ID");
    };

    let report = worker.poll_once().await?;

    println!(
        "{} {} update(s): {} upserted, {} removed, {} skipped",
        style("✓").green(),
        report.updates,
        report.upserted,
        report.removed,
        report.skipped
    );
    Ok(())
}
