//! One-shot cleanup command.

use anyhow::bail;
use console::style;

use super::super::helpers::{build_bot, build_cleanup_worker, open_database};
use crate::config::Settings;

/// Probe every book once and drop the ones whose message is gone.
pub async fn cmd_cleanup(settings: &Settings) -> anyhow::Result<()> {
    let db = open_database(settings).await?;
    let bot = build_bot(settings)?;
    let Some(worker) = build_cleanup_worker(settings, &db, bot.as_ref()) else {
        bail!("cleanup needs TG_BOT_TOKEN and TG_MAINT_CHAT_ID");
    };

    println!("{} Probing books...", style("→").cyan());
    let report = worker.run_pass().await?;

    println!(
        "{} Checked {}: {} live, {} removed, {} ambiguous, {} failed",
        style("✓").green(),
        report.checked,
        report.live,
        report.removed,
        report.ambiguous,
        report.failed
    );
    if report.ambiguous + report.failed > 0 {
        println!(
            "  {} Books with ambiguous or failed probes were kept; see the log",
            style("!").yellow()
        );
    }
    Ok(())
}
