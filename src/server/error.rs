//! JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::repository::DbError;
use crate::services::{CoverError, WorkerError};
use crate::telegram::TelegramError;

/// An API failure, rendered as `{"detail": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    /// Telegram failed while serving the request.
    #[error("{0}")]
    Upstream(String),

    /// The request needs Telegram settings that are missing.
    #[error("{0}")]
    NotConfigured(&'static str),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn upstream(context: &str, err: &TelegramError) -> Self {
        ApiError::Upstream(format!("{context}: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(cause) => tracing::error!("Request failed: {}", cause),
            ApiError::Upstream(cause) => tracing::warn!("Telegram request failed: {}", cause),
            _ => {}
        }
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        ApiError::Internal(format!("database error: {err}"))
    }
}

impl From<WorkerError> for ApiError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::Telegram(e) => ApiError::upstream("Telegram sync failed", &e),
            WorkerError::Database(e) => e.into(),
        }
    }
}

impl From<CoverError> for ApiError {
    fn from(err: CoverError) -> Self {
        match err {
            CoverError::Telegram(e) => ApiError::upstream("Telegram cover fetch failed", &e),
            CoverError::Io(e) => ApiError::Internal(format!("cover cache: {e}")),
        }
    }
}
