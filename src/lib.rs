//! ThaiGL - a book library backed by a Telegram group.
//!
//! Documents posted to the group are mirrored into a local SQLite catalog
//! using metadata parsed from their captions. The catalog is searchable over
//! HTTP and files are proxied from Telegram on demand.

pub mod caption;
pub mod cli;
pub mod config;
pub mod models;
pub mod repository;
pub mod schema;
pub mod server;
pub mod services;
pub mod telegram;
