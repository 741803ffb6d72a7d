//! Schema tests
//!
//! Runs the embedded migrations against a fresh SQLite file and inspects the
//! result with an independent connection.

use std::collections::BTreeSet;

use rusqlite::{Connection, Result as SqliteResult};
use tempfile::tempdir;

fn objects(conn: &Connection, kind: &str) -> SqliteResult<BTreeSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%'",
    )?;
    let names = stmt
        .query_map([kind], |row| row.get(0))?
        .collect::<SqliteResult<BTreeSet<String>>>()?;
    Ok(names)
}

fn columns(conn: &Connection, table: &str) -> SqliteResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
    let names = stmt
        .query_map([], |row| row.get(1))?
        .collect::<SqliteResult<Vec<String>>>()?;
    Ok(names)
}

#[tokio::test]
async fn test_migrations_create_catalog_schema() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("books.db");
    let url = format!("sqlite:{}", path.display());

    thaigl::repository::migrations::run_migrations(&url)
        .await
        .unwrap();

    let conn = Connection::open(&path).unwrap();
    let tables = objects(&conn, "table").unwrap();
    assert!(tables.contains("books"));
    assert!(tables.contains("books_fts"));
    assert!(tables.contains("meta"));

    let triggers = objects(&conn, "trigger").unwrap();
    for name in ["books_ai", "books_au", "books_ad"] {
        assert!(triggers.contains(name), "missing trigger {}", name);
    }

    let book_columns = columns(&conn, "books").unwrap();
    for name in [
        "tg_chat_id",
        "tg_message_id",
        "file_id",
        "title",
        "author",
        "lang",
        "tags",
        "category",
        "cover",
        "cover_file_id",
        "source",
        "created_at",
        "updated_at",
    ] {
        assert!(book_columns.iter().any(|c| c == name), "missing column {}", name);
    }
}

#[tokio::test]
async fn test_fts_index_follows_book_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("books.db");

    thaigl::repository::migrations::run_migrations(path.to_str().unwrap())
        .await
        .unwrap();

    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "INSERT INTO books (tg_chat_id, tg_message_id, file_id, title, author, lang, tags, source, created_at, updated_at)
         VALUES ('-100', 1, 'f1', 'Siddhartha', 'Hesse', 'en', 'novel', 'alice', 'now', 'now')",
        [],
    )
    .unwrap();

    let hits = |term: &str| -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM books_fts WHERE books_fts MATCH ?1",
            [term],
            |row| row.get(0),
        )
        .unwrap()
    };
    assert_eq!(hits("siddhartha"), 1);

    conn.execute("UPDATE books SET title = 'Steppenwolf' WHERE tg_message_id = 1", [])
        .unwrap();
    assert_eq!(hits("siddhartha"), 0);
    assert_eq!(hits("steppenwolf"), 1);

    conn.execute("DELETE FROM books", []).unwrap();
    assert_eq!(hits("steppenwolf"), 0);
}

#[tokio::test]
async fn test_migrations_are_rerunnable() {
    let dir = tempdir().unwrap();
    let url = dir.path().join("books.db").display().to_string();

    thaigl::repository::migrations::run_migrations(&url)
        .await
        .unwrap();
    thaigl::repository::migrations::run_migrations(&url)
        .await
        .unwrap();
}
