//! HTTP client for the Telegram Bot API.

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use super::types::{ApiResponse, File, MessageId, Update};
use super::{BotApi, ByteStream, TelegramError};

/// Timeout for ordinary API calls. Long polls add their poll timeout on top.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct GetUpdatesParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

/// Bot API client bound to one bot token.
#[derive(Clone)]
pub struct BotClient {
    client: Client,
    api_base: String,
    token: String,
}

impl BotClient {
    /// Create a client for `api_base` (e.g. `https://api.telegram.org`).
    ///
    /// No overall timeout is set on the underlying client so file downloads
    /// can stream for as long as they need; API calls set their own.
    pub fn new(api_base: &str, token: &str) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(TelegramError::Http)?;
        Ok(Self::with_client(client, api_base, token))
    }

    /// Create a client with a custom HTTP client.
    pub fn with_client(client: Client, api_base: &str, token: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    /// Call a Bot API method and unwrap its `result`.
    ///
    /// The JSON envelope is read even on non-2xx statuses, since that is where
    /// Telegram puts the error description.
    async fn call<T, P>(&self, method: &str, params: &P, timeout: Duration) -> Result<T, TelegramError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        debug!(method, "calling Telegram");

        let response = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(params)
            .send()
            .await
            .map_err(TelegramError::from_transport)?;

        let status = response.status();
        let envelope: ApiResponse<T> = match response.json().await {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => return Err(TelegramError::from_transport(e)),
            Err(_) => {
                return Err(TelegramError::Api {
                    code: i64::from(status.as_u16()),
                    description: status.to_string(),
                })
            }
        };

        if envelope.ok {
            return envelope.result.ok_or(TelegramError::MissingResult);
        }

        let code = envelope
            .error_code
            .unwrap_or_else(|| i64::from(status.as_u16()));
        if status == StatusCode::TOO_MANY_REQUESTS || code == 429 {
            let retry_after = envelope.parameters.and_then(|p| p.retry_after);
            warn!(method, ?retry_after, "Telegram rate limit hit");
            return Err(TelegramError::RateLimited { retry_after });
        }

        Err(TelegramError::Api {
            code,
            description: envelope.description.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl BotApi for BotClient {
    async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdatesParams {
            offset,
            timeout: timeout_secs,
            allowed_updates: &["message", "edited_message"],
        };
        self.call(
            "getUpdates",
            &params,
            REQUEST_TIMEOUT + Duration::from_secs(timeout_secs),
        )
        .await
    }

    async fn get_file(&self, file_id: &str) -> Result<File, TelegramError> {
        self.call("getFile", &json!({ "file_id": file_id }), REQUEST_TIMEOUT)
            .await
    }

    async fn download_file(&self, file_path: &str) -> Result<ByteStream, TelegramError> {
        let response = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(TelegramError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelegramError::Api {
                code: i64::from(status.as_u16()),
                description: format!("file download failed: {status}"),
            });
        }

        Ok(response
            .bytes_stream()
            .map_err(TelegramError::from_transport)
            .boxed())
    }

    async fn copy_message(
        &self,
        to_chat_id: &str,
        from_chat_id: &str,
        message_id: i64,
    ) -> Result<MessageId, TelegramError> {
        let params = json!({
            "chat_id": to_chat_id,
            "from_chat_id": from_chat_id,
            "message_id": message_id,
            "disable_notification": true,
        });
        self.call("copyMessage", &params, REQUEST_TIMEOUT).await
    }

    async fn delete_message(&self, chat_id: &str, message_id: i64) -> Result<(), TelegramError> {
        let params = json!({ "chat_id": chat_id, "message_id": message_id });
        let _: bool = self.call("deleteMessage", &params, REQUEST_TIMEOUT).await?;
        Ok(())
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), TelegramError> {
        let params = json!({ "chat_id": chat_id, "text": text });
        let _: serde_json::Value = self.call("sendMessage", &params, REQUEST_TIMEOUT).await?;
        Ok(())
    }
}
