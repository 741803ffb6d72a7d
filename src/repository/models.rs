//! Diesel row types for the books and meta tables.

use diesel::prelude::*;

use super::util::parse_datetime;
use crate::models::{BookChanges, BookRecord, NewBook};
use crate::schema::{books, meta};

/// A full `books` row.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = books)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BookRow {
    pub id: i64,
    pub tg_chat_id: String,
    pub tg_message_id: i64,
    pub file_id: String,
    pub file_unique_id: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub title: String,
    pub author: String,
    pub lang: String,
    pub tags: String,
    pub category: Option<String>,
    pub cover: Option<String>,
    pub cover_file_id: Option<String>,
    pub source: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<BookRow> for BookRecord {
    fn from(row: BookRow) -> Self {
        BookRecord {
            id: row.id,
            tg_chat_id: row.tg_chat_id,
            tg_message_id: row.tg_message_id,
            file_id: row.file_id,
            file_unique_id: row.file_unique_id,
            file_name: row.file_name,
            mime_type: row.mime_type,
            file_size: row.file_size,
            title: row.title,
            author: row.author,
            lang: row.lang,
            tags: row.tags,
            category: row.category,
            cover: row.cover,
            cover_file_id: row.cover_file_id,
            source: row.source,
            created_at: parse_datetime(&row.created_at),
            updated_at: parse_datetime(&row.updated_at),
        }
    }
}

/// Insert payload for a newly observed document message.
#[derive(Debug, Insertable)]
#[diesel(table_name = books)]
pub struct NewBookRow<'a> {
    pub tg_chat_id: &'a str,
    pub tg_message_id: i64,
    pub file_id: &'a str,
    pub file_unique_id: Option<&'a str>,
    pub file_name: Option<&'a str>,
    pub mime_type: Option<&'a str>,
    pub file_size: Option<i64>,
    pub title: &'a str,
    pub author: &'a str,
    pub lang: &'a str,
    pub tags: String,
    pub category: Option<&'a str>,
    pub cover_file_id: Option<&'a str>,
    pub source: &'a str,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

impl<'a> NewBookRow<'a> {
    pub fn new(book: &'a NewBook, now: &'a str) -> Self {
        Self {
            tg_chat_id: &book.tg_chat_id,
            tg_message_id: book.tg_message_id,
            file_id: &book.file_id,
            file_unique_id: book.file_unique_id.as_deref(),
            file_name: book.file_name.as_deref(),
            mime_type: book.mime_type.as_deref(),
            file_size: book.file_size,
            title: &book.metadata.title,
            author: &book.metadata.author,
            lang: &book.metadata.lang,
            tags: book.metadata.tags_joined(),
            category: book.metadata.category.as_deref(),
            cover_file_id: book.cover_file_id.as_deref(),
            source: &book.metadata.source,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Columns refreshed when a known message is seen again.
///
/// `None` leaves the stored value in place, so an edit that drops the
/// category or thumbnail keeps the one already on file. `cover` and
/// `created_at` are never touched here.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = books)]
pub struct BookSyncChangeset<'a> {
    pub file_id: &'a str,
    pub file_unique_id: Option<&'a str>,
    pub file_name: Option<&'a str>,
    pub mime_type: Option<&'a str>,
    pub file_size: Option<i64>,
    pub title: &'a str,
    pub author: &'a str,
    pub lang: &'a str,
    pub tags: String,
    pub category: Option<&'a str>,
    pub cover_file_id: Option<&'a str>,
    pub source: &'a str,
    pub updated_at: &'a str,
}

impl<'a> BookSyncChangeset<'a> {
    pub fn new(book: &'a NewBook, now: &'a str) -> Self {
        Self {
            file_id: &book.file_id,
            file_unique_id: book.file_unique_id.as_deref(),
            file_name: book.file_name.as_deref(),
            mime_type: book.mime_type.as_deref(),
            file_size: book.file_size,
            title: &book.metadata.title,
            author: &book.metadata.author,
            lang: &book.metadata.lang,
            tags: book.metadata.tags_joined(),
            category: book.metadata.category.as_deref(),
            cover_file_id: book.cover_file_id.as_deref(),
            source: &book.metadata.source,
            updated_at: now,
        }
    }
}

/// Columns changed by an admin edit.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = books)]
pub struct BookEditChangeset<'a> {
    pub title: Option<&'a str>,
    pub author: Option<&'a str>,
    pub source: Option<&'a str>,
    pub lang: Option<&'a str>,
    pub tags: Option<&'a str>,
    pub category: Option<Option<&'a str>>,
    pub cover: Option<Option<&'a str>>,
    pub updated_at: &'a str,
}

impl<'a> BookEditChangeset<'a> {
    pub fn new(changes: &'a BookChanges, now: &'a str) -> Self {
        Self {
            title: changes.title.as_deref(),
            author: changes.author.as_deref(),
            source: changes.source.as_deref(),
            lang: changes.lang.as_deref(),
            tags: changes.tags.as_deref(),
            category: changes.category.as_ref().map(|c| c.as_deref()),
            cover: changes.cover.as_ref().map(|c| c.as_deref()),
            updated_at: now,
        }
    }
}

/// A `meta` key/value row.
#[derive(Debug, Insertable)]
#[diesel(table_name = meta)]
pub struct NewMeta<'a> {
    pub key: &'a str,
    pub value: &'a str,
}
