//! File proxy: downloads and cover images, streamed from Telegram.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::super::error::ApiError;
use super::super::AppState;
use super::books_api::find_book;

const COVER_CACHE_CONTROL: &str = "public, max-age=86400";

/// Stream a book's file through to the client.
pub async fn download_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let book = find_book(&state, id).await?;
    let bot = state.bot()?;

    let file = bot
        .get_file(&book.file_id)
        .await
        .map_err(|e| ApiError::upstream("Telegram getFile failed", &e))?;
    let file_path = file
        .file_path
        .ok_or_else(|| ApiError::Upstream("Telegram getFile returned no file_path".to_string()))?;
    let stream = bot
        .download_file(&file_path)
        .await
        .map_err(|e| ApiError::upstream("Telegram download failed", &e))?;

    let filename = book
        .download_name()
        .map(str::to_string)
        .unwrap_or_else(|| leaf_name(&file_path).to_string());
    let content_type = book
        .mime_type
        .as_deref()
        .and_then(|m| HeaderValue::from_str(m).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition_attachment(&filename))
        .map_err(|e| ApiError::Internal(format!("content disposition: {e}")))?;

    debug!(id, file = %filename, "Proxying download");
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// Serve a book's cover: the admin override as a redirect, else the cached
/// Telegram thumbnail.
pub async fn cover_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let book = find_book(&state, id).await?;

    if let Some(url) = book.cover.as_deref() {
        return Ok(Redirect::temporary(url).into_response());
    }

    let file_id = book
        .cover_file_id
        .as_deref()
        .ok_or(ApiError::NotFound("Cover not found"))?;
    let bot = state.bot()?;
    let cover = state.covers.fetch(bot.as_ref(), file_id).await?;

    let body = tokio::fs::read(&cover.path)
        .await
        .map_err(|e| ApiError::Internal(format!("reading {}: {e}", cover.path.display())))?;

    Ok((
        [
            (header::CONTENT_TYPE, cover.content_type),
            (header::CACHE_CONTROL, COVER_CACHE_CONTROL.to_string()),
        ],
        body,
    )
        .into_response())
}

/// Build an RFC 6266 `Content-Disposition` value with an ASCII `filename`
/// fallback and the exact name as RFC 5987 `filename*`.
pub fn content_disposition_attachment(filename: &str) -> String {
    let name = leaf_name(filename)
        .replace(['\r', '\n'], " ")
        .trim()
        .to_string();
    let name = if name.is_empty() {
        "download".to_string()
    } else {
        name
    };

    let fallback: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ' ' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let fallback = match fallback.trim() {
        "" => "download",
        trimmed => trimmed,
    };

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(&name)
    )
}

fn leaf_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
