use thiserror::Error;

/// Errors returned by the Bot API client.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Transport-level failure (connect, TLS, body decode).
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("request to Telegram timed out")]
    Timeout,

    /// The Bot API answered with `ok: false`.
    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("rate limited by Telegram")]
    RateLimited { retry_after: Option<u64> },

    /// `ok: true` without a `result`, or a file without a download path.
    #[error("Telegram response carried no result")]
    MissingResult,
}

impl TelegramError {
    /// Classify a reqwest failure, keeping timeouts distinct.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }

    /// Human-readable failure text, used to recognize known API errors.
    pub fn description(&self) -> String {
        match self {
            Self::Api { description, .. } => description.clone(),
            other => other.to_string(),
        }
    }
}
