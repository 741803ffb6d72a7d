//! Reconciles the store with the tracked group.
//!
//! The Bot API offers no way to ask whether a message still exists, so each
//! record is probed by copying its message into a maintenance chat. Only a
//! failure whose text matches a known "gone" signature removes the record;
//! anything else leaves it in place.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::WorkerError;
use crate::repository::{BookRef, DbContext, DieselBookRepository};
use crate::telegram::{BotApi, MessageId, TelegramError};

/// Records fetched per keyset page.
pub const BATCH_SIZE: i64 = 200;

/// Wait applied after a 429 that carries no `retry_after`.
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(5);

/// Result of probing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Live,
    /// The source message is known to be deleted.
    ConfirmedGone(String),
    /// The probe failed for another reason; the record is kept.
    Ambiguous(String),
}

/// Decides which probe failures prove a message is gone.
#[derive(Debug, Clone)]
pub struct GonePolicy {
    signatures: Vec<String>,
}

impl GonePolicy {
    pub fn new(signatures: Vec<String>) -> Self {
        Self { signatures }
    }

    /// Classify a failed probe. Only API errors can confirm a deletion;
    /// transport failures and rate limits are always ambiguous.
    pub fn classify(&self, err: &TelegramError) -> ProbeOutcome {
        let description = err.description();
        let gone = matches!(err, TelegramError::Api { .. })
            && self
                .signatures
                .iter()
                .any(|sig| description.contains(sig.as_str()));

        if gone {
            ProbeOutcome::ConfirmedGone(description)
        } else {
            ProbeOutcome::Ambiguous(description)
        }
    }
}

/// Tally of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub checked: usize,
    pub live: usize,
    pub removed: usize,
    pub ambiguous: usize,
    /// Confirmed gone, but the store refused the delete.
    pub failed: usize,
}

/// Probe tuning.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Pause between consecutive probes.
    pub delay: Duration,
    /// Limit for a single probe; zero means no limit.
    pub timeout: Duration,
    /// Delete the copy a successful probe leaves in the maintenance chat.
    pub purge_copies: bool,
}

pub struct CleanupWorker {
    bot: Arc<dyn BotApi>,
    books: DieselBookRepository,
    maint_chat_id: String,
    policy: GonePolicy,
    options: ProbeOptions,
}

impl CleanupWorker {
    pub fn new(
        bot: Arc<dyn BotApi>,
        db: &DbContext,
        maint_chat_id: &str,
        policy: GonePolicy,
        options: ProbeOptions,
    ) -> Self {
        Self {
            bot,
            books: db.books(),
            maint_chat_id: maint_chat_id.to_string(),
            policy,
            options,
        }
    }

    /// Probe every record once, in id order, deleting the confirmed-gone ones.
    ///
    /// Paging is keyed on the last seen id so deletions made during the pass
    /// never cause a record to be skipped.
    pub async fn run_pass(&self) -> Result<CleanupReport, WorkerError> {
        let mut report = CleanupReport::default();
        let mut last_id = 0;

        loop {
            let batch = self.books.ids_after(last_id, BATCH_SIZE).await?;
            let Some(last) = batch.last() else {
                break;
            };
            last_id = last.id;

            for book in &batch {
                if report.checked > 0 && !self.options.delay.is_zero() {
                    tokio::time::sleep(self.options.delay).await;
                }
                report.checked += 1;

                match self.probe(book).await {
                    ProbeOutcome::Live => report.live += 1,
                    ProbeOutcome::ConfirmedGone(reason) => {
                        match self.books.delete(book.id).await {
                            Ok(true) => {
                                report.removed += 1;
                                info!(
                                    id = book.id,
                                    message_id = book.tg_message_id,
                                    %reason,
                                    "Removed book whose message was deleted"
                                );
                            }
                            Ok(false) => {}
                            Err(e) => {
                                report.failed += 1;
                                warn!(
                                    id = book.id,
                                    message_id = book.tg_message_id,
                                    error = %e,
                                    "Could not remove book"
                                );
                            }
                        }
                    }
                    ProbeOutcome::Ambiguous(reason) => {
                        report.ambiguous += 1;
                        warn!(
                            id = book.id,
                            message_id = book.tg_message_id,
                            %reason,
                            "Probe failed; keeping book"
                        );
                    }
                }
            }

            if (batch.len() as i64) < BATCH_SIZE {
                break;
            }
        }

        info!(
            checked = report.checked,
            live = report.live,
            removed = report.removed,
            ambiguous = report.ambiguous,
            failed = report.failed,
            "Cleanup pass finished"
        );
        Ok(report)
    }

    /// Probe one record. A rate-limited probe waits out `retry_after` and is
    /// tried once more; if that is limited too the wait is served before
    /// returning so the next probe does not hit the same limit.
    async fn probe(&self, book: &BookRef) -> ProbeOutcome {
        let mut result = self.copy(book).await;
        for attempt in 0..2 {
            let Err(TelegramError::RateLimited { retry_after }) = &result else {
                break;
            };
            let wait = retry_after
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RATE_LIMIT_WAIT);
            warn!(
                id = book.id,
                wait_secs = wait.as_secs(),
                "Probe rate limited; backing off"
            );
            tokio::time::sleep(wait).await;
            if attempt == 0 {
                result = self.copy(book).await;
            }
        }

        match result {
            Ok(copied) => {
                if self.options.purge_copies {
                    if let Err(e) = self
                        .bot
                        .delete_message(&self.maint_chat_id, copied.message_id)
                        .await
                    {
                        debug!(message_id = copied.message_id, "Could not purge probe copy: {}", e);
                    }
                }
                ProbeOutcome::Live
            }
            Err(e) => self.policy.classify(&e),
        }
    }

    async fn copy(&self, book: &BookRef) -> Result<MessageId, TelegramError> {
        let copy = self.bot.copy_message(
            &self.maint_chat_id,
            &book.tg_chat_id,
            book.tg_message_id,
        );
        if self.options.timeout.is_zero() {
            return copy.await;
        }
        tokio::time::timeout(self.options.timeout, copy)
            .await
            .unwrap_or(Err(TelegramError::Timeout))
    }

    /// Run a pass every `interval`, measured start to start, until `shutdown`
    /// fires. The first pass starts immediately.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        if interval.is_zero() {
            return;
        }
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            let result = tokio::select! {
                result = self.run_pass() => result,
                _ = shutdown.changed() => break,
            };
            if let Err(e) = result {
                warn!("Cleanup pass failed: {}", e);
            }
        }
        debug!("Cleanup loop stopped");
    }
}
