//! Repository layer for database persistence.
//!
//! All database access uses Diesel with SQLite, wrapped for async use.

pub mod books;
pub mod context;
pub mod meta;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod util;

pub use books::{BookRef, DieselBookRepository};
pub use context::DbContext;
pub use meta::DieselMetaRepository;
pub use pool::{DbError, DbPool};
pub use util::parse_datetime;
