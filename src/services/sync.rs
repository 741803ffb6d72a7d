//! Pulls updates from the tracked group into the metadata store.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::WorkerError;
use crate::caption::{parse_caption, CaptionDefaults};
use crate::models::NewBook;
use crate::repository::{DbContext, DieselBookRepository, DieselMetaRepository};
use crate::telegram::{BotApi, Document, Message, Update};

/// Summary of one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub updates: usize,
    pub upserted: usize,
    pub removed: usize,
    pub skipped: usize,
}

enum UpdateOutcome {
    Upserted,
    Removed,
    Skipped,
}

/// Long-polls the Bot API and mirrors document messages into the store.
pub struct SyncWorker {
    bot: Arc<dyn BotApi>,
    books: DieselBookRepository,
    meta: DieselMetaRepository,
    book_chat_id: String,
    default_source: String,
    poll_timeout_secs: u64,
    /// Serializes polls from the background loop and manual triggers.
    poll_lock: Mutex<()>,
}

impl SyncWorker {
    pub fn new(
        bot: Arc<dyn BotApi>,
        db: &DbContext,
        book_chat_id: &str,
        default_source: &str,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            bot,
            books: db.books(),
            meta: db.meta(),
            book_chat_id: book_chat_id.to_string(),
            default_source: default_source.to_string(),
            poll_timeout_secs,
            poll_lock: Mutex::new(()),
        }
    }

    /// Fetch one batch of updates and apply it.
    ///
    /// The stored offset advances past every handled update, including the
    /// ones that are ignored, so nothing is fetched twice.
    pub async fn poll_once(&self) -> Result<SyncReport, WorkerError> {
        let _guard = self.poll_lock.lock().await;

        let offset = self.meta.update_offset().await?;
        let updates = self.bot.get_updates(offset, self.poll_timeout_secs).await?;

        let mut report = SyncReport {
            updates: updates.len(),
            ..Default::default()
        };
        for update in &updates {
            match self.handle_update(update).await? {
                UpdateOutcome::Upserted => report.upserted += 1,
                UpdateOutcome::Removed => report.removed += 1,
                UpdateOutcome::Skipped => report.skipped += 1,
            }
            self.meta.set_update_offset(update.update_id + 1).await?;
        }

        if report.updates > 0 {
            info!(
                updates = report.updates,
                upserted = report.upserted,
                removed = report.removed,
                "Applied Telegram updates"
            );
        }
        Ok(report)
    }

    async fn handle_update(&self, update: &Update) -> Result<UpdateOutcome, WorkerError> {
        let Some(message) = update.message() else {
            return Ok(UpdateOutcome::Skipped);
        };
        if message.chat.id.to_string() != self.book_chat_id {
            debug!(chat_id = message.chat.id, "Ignoring update from untracked chat");
            return Ok(UpdateOutcome::Skipped);
        }

        if is_remove_command(message) {
            return match remove_target(message) {
                Some(target) => self.remove(target).await,
                None => Ok(UpdateOutcome::Skipped),
            };
        }

        match &message.document {
            Some(document) => {
                self.upsert(message, document).await?;
                Ok(UpdateOutcome::Upserted)
            }
            None => Ok(UpdateOutcome::Skipped),
        }
    }

    async fn upsert(&self, message: &Message, document: &Document) -> Result<(), WorkerError> {
        let defaults = CaptionDefaults {
            file_name: document.file_name.as_deref(),
            sender: message.from.as_ref().and_then(|u| u.username.as_deref()),
            source_label: &self.default_source,
        };
        let metadata = parse_caption(message.caption.as_deref().unwrap_or_default(), &defaults);

        let book = NewBook {
            tg_chat_id: self.book_chat_id.clone(),
            tg_message_id: message.message_id,
            file_id: document.file_id.clone(),
            file_unique_id: document.file_unique_id.clone(),
            file_name: document.file_name.clone(),
            mime_type: document.mime_type.clone(),
            file_size: document.file_size,
            cover_file_id: document.thumbnail_file_id().map(str::to_string),
            metadata,
        };

        let stored = self.books.upsert_from_message(&book).await?;
        debug!(id = stored.id, message_id = message.message_id, title = %stored.title, "Upserted book");
        Ok(())
    }

    async fn remove(&self, message_id: i64) -> Result<UpdateOutcome, WorkerError> {
        let chat_id = &self.book_chat_id;
        let removed = self.books.delete_by_message(chat_id, message_id).await?;

        if let Err(e) = self.bot.delete_message(chat_id, message_id).await {
            debug!(message_id, "Could not delete source message: {}", e);
        }

        if !removed {
            return Ok(UpdateOutcome::Skipped);
        }

        info!(message_id, "Removed book by command");
        let reply = format!("Removed book {message_id}.");
        if let Err(e) = self.bot.send_message(chat_id, &reply).await {
            warn!(message_id, "Could not confirm removal: {}", e);
        }
        Ok(UpdateOutcome::Removed)
    }

    /// Poll until `shutdown` fires, sleeping `interval` between polls.
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        loop {
            let result = tokio::select! {
                result = self.poll_once() => result,
                _ = shutdown.changed() => break,
            };
            if let Err(e) = result {
                warn!("Sync poll failed: {}", e);
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => break,
            }
        }
        debug!("Sync loop stopped");
    }
}

/// `/remove` or `/remove@botname`, as the first word of a text message.
fn is_remove_command(message: &Message) -> bool {
    let Some(command) = message.text.as_deref().and_then(|t| t.split_whitespace().next()) else {
        return false;
    };
    command == "/remove" || command.starts_with("/remove@")
}

/// The message a `/remove` command points at: the replied-to message, or
/// else a numeric first argument.
fn remove_target(message: &Message) -> Option<i64> {
    if let Some(reply) = &message.reply_to_message {
        return Some(reply.message_id);
    }
    message
        .text
        .as_deref()?
        .split_whitespace()
        .nth(1)
        .and_then(|arg| arg.parse::<i64>().ok())
        .filter(|id| *id > 0)
}
