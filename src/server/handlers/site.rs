//! Health and branding endpoints.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use super::super::error::ApiError;
use super::super::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Branding for the frontend, with fallbacks already resolved.
pub async fn site_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.settings.branding.clone())
}

/// Unknown paths under `/api`.
pub async fn api_not_found() -> ApiError {
    ApiError::NotFound("Not found")
}
