//! Diesel-based book repository for SQLite.
//!
//! Plain lookups and writes use the query builder. Search goes through raw
//! SQL because the FTS5 `MATCH` operator has no DSL counterpart.

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::Sqlite;
use diesel_async::RunQueryDsl;

use super::models::{BookEditChangeset, BookRow, BookSyncChangeset, NewBookRow};
use super::pool::{DbError, DbPool};
use super::util::now_timestamp;
use crate::models::{BookChanges, BookFilter, BookRecord, NewBook};
use crate::schema::books;

/// The identity of a record as the cleanup worker needs it.
#[derive(Debug, Clone, PartialEq, Eq, Queryable)]
pub struct BookRef {
    pub id: i64,
    pub tg_chat_id: String,
    pub tg_message_id: i64,
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    total: i64,
}

/// Diesel-based book repository.
#[derive(Clone)]
pub struct DieselBookRepository {
    pool: DbPool,
}

impl DieselBookRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a book for a newly seen message, or refresh the existing one.
    ///
    /// On conflict the file fields and parsed metadata are replaced while the
    /// admin cover override and `created_at` are kept.
    pub async fn upsert_from_message(&self, book: &NewBook) -> Result<BookRecord, DbError> {
        let mut conn = self.pool.get().await?;
        let now = now_timestamp();

        diesel::insert_into(books::table)
            .values(NewBookRow::new(book, &now))
            .on_conflict((books::tg_chat_id, books::tg_message_id))
            .do_update()
            .set(BookSyncChangeset::new(book, &now))
            .execute(&mut conn)
            .await?;

        books::table
            .filter(books::tg_chat_id.eq(&book.tg_chat_id))
            .filter(books::tg_message_id.eq(book.tg_message_id))
            .select(BookRow::as_select())
            .first(&mut conn)
            .await
            .map(BookRecord::from)
    }

    /// Get a book by ID.
    pub async fn get(&self, id: i64) -> Result<Option<BookRecord>, DbError> {
        let mut conn = self.pool.get().await?;

        books::table
            .find(id)
            .select(BookRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|row| row.map(BookRecord::from))
    }

    /// One page of books matching `filter`, most recently updated first.
    pub async fn list(
        &self,
        filter: &BookFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookRecord>, DbError> {
        let mut conn = self.pool.get().await?;
        let (clause, binds) = where_clause(filter);

        let sql = format!(
            "SELECT * FROM books{clause} ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut query = diesel::sql_query(sql).into_boxed::<Sqlite>();
        for value in binds {
            query = query.bind::<Text, _>(value);
        }

        query
            .bind::<BigInt, _>(limit)
            .bind::<BigInt, _>(offset)
            .load::<BookRow>(&mut conn)
            .await
            .map(|rows| rows.into_iter().map(BookRecord::from).collect())
    }

    /// Number of books matching `filter`, ignoring paging.
    pub async fn count(&self, filter: &BookFilter) -> Result<i64, DbError> {
        let mut conn = self.pool.get().await?;
        let (clause, binds) = where_clause(filter);

        let mut query =
            diesel::sql_query(format!("SELECT COUNT(*) AS total FROM books{clause}"))
                .into_boxed::<Sqlite>();
        for value in binds {
            query = query.bind::<Text, _>(value);
        }

        let row: CountRow = query.get_result(&mut conn).await?;
        Ok(row.total)
    }

    /// Apply an admin edit. Returns `None` when the book does not exist.
    pub async fn update(
        &self,
        id: i64,
        changes: &BookChanges,
    ) -> Result<Option<BookRecord>, DbError> {
        let mut conn = self.pool.get().await?;
        let now = now_timestamp();

        let rows = diesel::update(books::table.find(id))
            .set(BookEditChangeset::new(changes, &now))
            .execute(&mut conn)
            .await?;
        if rows == 0 {
            return Ok(None);
        }

        books::table
            .find(id)
            .select(BookRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map(|row| row.map(BookRecord::from))
    }

    /// Delete a book. Returns whether a row was removed.
    pub async fn delete(&self, id: i64) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::delete(books::table.find(id))
            .execute(&mut conn)
            .await?;

        Ok(rows > 0)
    }

    /// Delete the book backed by a given message.
    pub async fn delete_by_message(&self, chat_id: &str, message_id: i64) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::delete(
            books::table
                .filter(books::tg_chat_id.eq(chat_id))
                .filter(books::tg_message_id.eq(message_id)),
        )
        .execute(&mut conn)
        .await?;

        Ok(rows > 0)
    }

    /// Up to `limit` records with an id greater than `last_id`, in id order.
    pub async fn ids_after(&self, last_id: i64, limit: i64) -> Result<Vec<BookRef>, DbError> {
        let mut conn = self.pool.get().await?;

        books::table
            .filter(books::id.gt(last_id))
            .order(books::id.asc())
            .limit(limit)
            .select((books::id, books::tg_chat_id, books::tg_message_id))
            .load::<BookRef>(&mut conn)
            .await
    }
}

/// Build the `WHERE` clause shared by `list` and `count`, plus its text binds.
fn where_clause(filter: &BookFilter) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut binds = Vec::new();

    if let Some(expr) = filter.query.as_deref().and_then(fts_match_expression) {
        conditions.push("id IN (SELECT rowid FROM books_fts WHERE books_fts MATCH ?)");
        binds.push(expr);
    }
    if let Some(lang) = &filter.lang {
        conditions.push("lang = ?");
        binds.push(lang.clone());
    }
    if let Some(category) = &filter.category {
        conditions.push("category = ?");
        binds.push(category.clone());
    }

    if conditions.is_empty() {
        (String::new(), binds)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), binds)
    }
}

/// Turn free text into an FTS5 expression: every whitespace separated term
/// becomes a quoted prefix match, and terms are ANDed.
///
/// Quoting keeps FTS5 operators and punctuation in user input from being
/// interpreted as query syntax.
pub fn fts_match_expression(raw: &str) -> Option<String> {
    let terms: Vec<String> = raw
        .split_whitespace()
        .map(|term| format!("\"{}\"*", term.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}
