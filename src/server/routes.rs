//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::site_config))
        // Books
        .route("/books", get(handlers::list_books))
        .route(
            "/books/:id",
            get(handlers::get_book)
                .patch(handlers::patch_book)
                .delete(handlers::delete_book),
        )
        .route("/books/:id/download", get(handlers::download_book))
        .route("/books/:id/cover", get(handlers::cover_image))
        // Admin
        .route("/sync", post(handlers::trigger_sync))
        .fallback(handlers::api_not_found);

    let router = Router::new().nest("/api", api);

    // Single-page frontend: unknown paths fall back to index.html
    let router = match state.settings.frontend_dist.clone() {
        Some(dist) => {
            let index = ServeFile::new(dist.join("index.html"));
            router.fallback_service(ServeDir::new(dist).fallback(index))
        }
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
