//! Book search, detail and admin edit endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::super::error::ApiError;
use super::super::AppState;
use super::admin::AdminGuard;
use crate::models::{BookFilter, BookPage, BookPatch, BookRecord};

pub const DEFAULT_PAGE_SIZE: i64 = 60;
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct BooksQuery {
    pub query: Option<String>,
    pub lang: Option<String>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    /// Also delete the backing Telegram message.
    #[serde(default)]
    pub also_tg: bool,
}

/// Search/list books.
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<BooksQuery>,
) -> Result<Json<BookPage>, ApiError> {
    let filter = BookFilter::new(
        params.query.as_deref(),
        params.lang.as_deref(),
        params.category.as_deref(),
    );
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let items = state.books.list(&filter, limit, offset).await?;
    let total = state.books.count(&filter).await?;
    Ok(Json(BookPage { total, items }))
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BookRecord>, ApiError> {
    Ok(Json(find_book(&state, id).await?))
}

/// Edit a book's descriptive fields.
pub async fn patch_book(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<BookPatch>,
) -> Result<Json<BookRecord>, ApiError> {
    find_book(&state, id).await?;
    let changes = patch
        .into_changes()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let updated = state
        .books
        .update(id, &changes)
        .await?
        .ok_or(ApiError::NotFound("Book not found"))?;
    info!(id, "Book edited");
    Ok(Json(updated))
}

/// Remove a book, optionally deleting its Telegram message too.
pub async fn delete_book(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<DeleteQuery>,
) -> Result<Json<Value>, ApiError> {
    let book = find_book(&state, id).await?;

    if params.also_tg {
        match &state.bot {
            Some(bot) => {
                if let Err(e) = bot
                    .delete_message(&book.tg_chat_id, book.tg_message_id)
                    .await
                {
                    warn!(id, message_id = book.tg_message_id, "Could not delete Telegram message: {}", e);
                }
            }
            None => warn!(id, "also_tg requested but no bot token is configured"),
        }
    }

    let removed = state.books.delete(id).await?;
    if removed {
        info!(id, "Book deleted");
    }
    Ok(Json(json!({ "removed": removed })))
}

pub(super) async fn find_book(state: &AppState, id: i64) -> Result<BookRecord, ApiError> {
    state
        .books
        .get(id)
        .await?
        .ok_or(ApiError::NotFound("Book not found"))
}
