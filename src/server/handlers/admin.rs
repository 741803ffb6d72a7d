//! Shared-secret check for the admin endpoints.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::super::error::ApiError;
use super::super::AppState;

/// Header accepted in place of the `key` query parameter.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

#[derive(Debug, Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

/// Extractor that admits a request only when it carries the admin key.
///
/// When no key is configured every request is admitted.
#[derive(Debug, Clone, Copy)]
pub struct AdminGuard;

#[async_trait]
impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.settings.admin_key.as_deref() else {
            return Ok(AdminGuard);
        };

        let header = parts
            .headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let provided = match header {
            Some(key) => Some(key),
            None => Query::<KeyQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(q)| q.key),
        };

        match provided {
            Some(key) if keys_match(&key, expected) => Ok(AdminGuard),
            _ => Err(ApiError::Forbidden),
        }
    }
}

/// Compare digests rather than the raw strings so timing does not depend on
/// how much of the key matches.
fn keys_match(provided: &str, expected: &str) -> bool {
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}
