//! HTTP request handlers for the web server.

mod admin;
mod books_api;
mod files;
mod site;
mod sync_api;

pub use admin::{AdminGuard, ADMIN_KEY_HEADER};
pub use books_api::{delete_book, get_book, list_books, patch_book};
pub use files::{content_disposition_attachment, cover_image, download_book};
pub use site::{api_not_found, health, site_config};
pub use sync_api::trigger_sync;
