//! Manual sync trigger.

use axum::{extract::State, Json};
use serde::Serialize;

use super::super::error::ApiError;
use super::super::AppState;
use super::admin::AdminGuard;
use crate::services::SyncReport;

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub report: SyncReport,
}

/// Run one sync poll now. Waits for a poll already in flight to finish first.
pub async fn trigger_sync(
    _admin: AdminGuard,
    State(state): State<AppState>,
) -> Result<Json<SyncResponse>, ApiError> {
    let worker = state
        .sync
        .as_ref()
        .ok_or(ApiError::NotConfigured("Bot not configured"))?;
    let report = worker.poll_once().await?;
    Ok(Json(SyncResponse {
        status: "ok",
        report,
    }))
}
