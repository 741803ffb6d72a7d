//! Telegram Bot API access.
//!
//! [`BotApi`] is the seam the workers and the HTTP proxy talk to;
//! [`BotClient`] is the reqwest implementation.

mod client;
mod error;
pub mod types;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

pub use client::BotClient;
pub use error::TelegramError;
pub use types::{Document, File, Message, MessageId, Update};

/// Body of a downloaded file, yielded chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, TelegramError>>;

/// The Bot API calls this crate makes.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Long-poll for updates starting at `offset`.
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError>;

    /// Resolve a file id to a downloadable path.
    async fn get_file(&self, file_id: &str) -> Result<File, TelegramError>;

    /// Stream the bytes at a path returned by [`BotApi::get_file`].
    async fn download_file(&self, file_path: &str) -> Result<ByteStream, TelegramError>;

    /// Copy a message into another chat. Fails when the source is gone.
    async fn copy_message(
        &self,
        to_chat_id: &str,
        from_chat_id: &str,
        message_id: i64,
    ) -> Result<MessageId, TelegramError>;

    async fn delete_message(&self, chat_id: &str, message_id: i64) -> Result<(), TelegramError>;

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TelegramError>;

    /// Resolve and download a file in one step.
    async fn open_file(&self, file_id: &str) -> Result<ByteStream, TelegramError> {
        let file = self.get_file(file_id).await?;
        let path = file.file_path.ok_or(TelegramError::MissingResult)?;
        self.download_file(&path).await
    }
}
