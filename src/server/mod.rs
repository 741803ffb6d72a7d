//! HTTP API for browsing the library, proxying files and admin edits.

mod error;
mod handlers;
mod routes;

pub use error::ApiError;
pub use handlers::{content_disposition_attachment, ADMIN_KEY_HEADER};
pub use routes::create_router;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;

use crate::config::Settings;
use crate::repository::{DbContext, DieselBookRepository};
use crate::services::{CoverCache, SyncWorker};
use crate::telegram::BotApi;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub books: Arc<DieselBookRepository>,
    pub settings: Arc<Settings>,
    /// Absent when no bot token is configured.
    pub bot: Option<Arc<dyn BotApi>>,
    pub covers: Arc<CoverCache>,
    /// Absent when sync is not configured.
    pub sync: Option<Arc<SyncWorker>>,
}

impl AppState {
    pub fn new(
        db: &DbContext,
        settings: Arc<Settings>,
        bot: Option<Arc<dyn BotApi>>,
        sync: Option<Arc<SyncWorker>>,
    ) -> Self {
        Self {
            books: Arc::new(db.books()),
            covers: Arc::new(CoverCache::new(settings.cover_cache_dir.clone())),
            settings,
            bot,
            sync,
        }
    }

    /// The bot client, or a 503 when Telegram access is not configured.
    pub fn bot(&self) -> Result<&Arc<dyn BotApi>, ApiError> {
        self.bot
            .as_ref()
            .ok_or(ApiError::NotConfigured("Bot token missing"))
    }
}

/// Serve the API on `bind` until `shutdown` resolves.
pub async fn serve<F>(state: AppState, bind: &str, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::caption::CaptionMetadata;
    use crate::models::NewBook;
    use crate::services::testing::FakeBot;

    struct TestApp {
        router: axum::Router,
        bot: Arc<FakeBot>,
        db: DbContext,
        _dir: tempfile::TempDir,
    }

    impl TestApp {
        async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> axum::response::Response {
            let mut builder = Request::builder().method(method).uri(uri);
            let body = match body {
                Some(json) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };
            self.router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap()
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn setup_test_app(admin_key: Option<&str>) -> TestApp {
        let dir = tempdir().unwrap();
        let db = DbContext::new(&dir.path().join("test.db"));
        db.init_schema().await.unwrap();

        let settings = Settings {
            admin_key: admin_key.map(str::to_string),
            cover_cache_dir: dir.path().join("covers"),
            ..Settings::default()
        };

        let bot = Arc::new(FakeBot::new());
        let bot_api: Arc<dyn BotApi> = bot.clone();
        let sync = Arc::new(SyncWorker::new(bot_api.clone(), &db, "-1001", "telegram", 0));
        let state = AppState::new(&db, Arc::new(settings), Some(bot_api), Some(sync));

        TestApp {
            router: create_router(state),
            bot,
            db,
            _dir: dir,
        }
    }

    async fn add_book(app: &TestApp, message_id: i64, title: &str, lang: &str) -> i64 {
        let book = NewBook {
            tg_chat_id: "-1001".to_string(),
            tg_message_id: message_id,
            file_id: format!("F{message_id}"),
            file_unique_id: None,
            file_name: Some(format!("{title}.pdf")),
            mime_type: Some("application/pdf".to_string()),
            file_size: Some(8),
            cover_file_id: Some(format!("T{message_id}")),
            metadata: CaptionMetadata {
                title: title.to_string(),
                author: "Someone".to_string(),
                lang: lang.to_string(),
                tags: vec!["tag".to_string()],
                category: None,
                source: "telegram".to_string(),
            },
        };
        app.db.books().upsert_from_message(&book).await.unwrap().id
    }

    #[tokio::test]
    async fn test_health_and_config() {
        let app = setup_test_app(None).await;

        let response = app.request("GET", "/api/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ok"}));

        let config = json_body(app.request("GET", "/api/config", None).await).await;
        assert_eq!(config["site_name"], "ThaiGL Library");
        assert_eq!(config["header_name"], "ThaiGL Library");
    }

    #[tokio::test]
    async fn test_list_and_search_books() {
        let app = setup_test_app(None).await;
        add_book(&app, 1, "Siddhartha", "en").await;
        add_book(&app, 2, "Steppenwolf", "de").await;

        let all = json_body(app.request("GET", "/api/books", None).await).await;
        assert_eq!(all["total"], 2);
        assert_eq!(all["items"][0]["title"], "Steppenwolf");

        let hits = json_body(app.request("GET", "/api/books?query=sidd&lang=%20", None).await).await;
        assert_eq!(hits["total"], 1);
        assert_eq!(hits["items"][0]["title"], "Siddhartha");

        let page = json_body(app.request("GET", "/api/books?limit=1&offset=1", None).await).await;
        assert_eq!(page["total"], 2);
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_book_is_404() {
        let app = setup_test_app(None).await;
        let response = app.request("GET", "/api/books/42", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["detail"], "Book not found");
    }

    #[tokio::test]
    async fn test_patch_requires_admin_key() {
        let app = setup_test_app(Some("s3cret")).await;
        let id = add_book(&app, 1, "Old", "en").await;
        let uri = format!("/api/books/{id}");

        let response = app
            .request("PATCH", &uri, Some(json!({"title": "New"})))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .request("PATCH", &format!("{uri}?key=wrong"), Some(json!({"title": "New"})))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .request(
                "PATCH",
                &format!("{uri}?key=s3cret"),
                Some(json!({"title": " New ", "lang": "English", "cover": ""})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let book = json_body(response).await;
        assert_eq!(book["title"], "New");
        assert_eq!(book["lang"], "en");
        assert_eq!(book["cover"], Value::Null);
    }

    #[tokio::test]
    async fn test_admin_key_header_is_accepted() {
        let app = setup_test_app(Some("s3cret")).await;
        let id = add_book(&app, 1, "Book", "en").await;

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/books/{id}"))
            .header(ADMIN_KEY_HEADER, "s3cret")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"removed": true}));
    }

    #[tokio::test]
    async fn test_empty_patch_is_400() {
        let app = setup_test_app(None).await;
        let id = add_book(&app, 1, "Book", "en").await;

        let response = app
            .request("PATCH", &format!("/api/books/{id}"), Some(json!({})))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["detail"], "No fields to update");
    }

    #[tokio::test]
    async fn test_patched_tags_read_back_verbatim() {
        let app = setup_test_app(None).await;
        let id = add_book(&app, 1, "Book", "en").await;
        let uri = format!("/api/books/{id}");

        let response = app
            .request("PATCH", &uri, Some(json!({"tags": "z, a, z"})))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let book = json_body(app.request("GET", &uri, None).await).await;
        assert_eq!(book["tags"], "z, a, z");
    }

    #[tokio::test]
    async fn test_delete_with_also_tg() {
        let app = setup_test_app(None).await;
        let id = add_book(&app, 7, "Book", "en").await;

        let response = app
            .request("DELETE", &format!("/api/books/{id}?also_tg=true"), None)
            .await;
        assert_eq!(json_body(response).await, json!({"removed": true}));
        assert_eq!(
            *app.bot.deleted.lock().unwrap(),
            vec![("-1001".to_string(), 7)]
        );

        let response = app
            .request("DELETE", &format!("/api/books/{id}"), None)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_streams_with_disposition() {
        let app = setup_test_app(None).await;
        let id = add_book(&app, 3, "Dune", "en").await;
        app.bot.add_file("F3", "documents/file_3.pdf", b"%PDF-1.7");

        let response = app
            .request("GET", &format!("/api/books/{id}/download"), None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Dune.pdf\"; filename*=UTF-8''Dune.pdf"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_download_upstream_failure_is_502() {
        let app = setup_test_app(None).await;
        let id = add_book(&app, 3, "Dune", "en").await;

        let response = app
            .request("GET", &format!("/api/books/{id}/download"), None)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_cover_from_cache_and_override() {
        let app = setup_test_app(None).await;
        let id = add_book(&app, 4, "Book", "en").await;
        app.bot.add_file("T4", "thumbnails/file_4.jpg", b"jpeg");

        let response = app
            .request("GET", &format!("/api/books/{id}/cover"), None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=86400"
        );

        let response = app
            .request(
                "PATCH",
                &format!("/api/books/{id}"),
                Some(json!({"cover": "https://img.example/c.png"})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .request("GET", &format!("/api/books/{id}/cover"), None)
            .await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://img.example/c.png"
        );
    }

    #[tokio::test]
    async fn test_manual_sync() {
        let app = setup_test_app(None).await;
        app.bot.push_updates(json!([{
            "update_id": 10,
            "message": {
                "message_id": 5,
                "chat": {"id": -1001},
                "caption": "Title: Synced",
                "document": {"file_id": "F5", "file_name": "s.epub"}
            }
        }]));

        let response = app.request("POST", "/api/sync", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let report = json_body(response).await;
        assert_eq!(report["status"], "ok");
        assert_eq!(report["upserted"], 1);

        let all = json_body(app.request("GET", "/api/books?query=synced", None).await).await;
        assert_eq!(all["total"], 1);
    }

    #[tokio::test]
    async fn test_unknown_api_path_is_json_404() {
        let app = setup_test_app(None).await;
        let response = app.request("GET", "/api/nope", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["detail"], "Not found");
    }

    #[tokio::test]
    async fn test_frontend_fallback_serves_index() {
        let dir = tempdir().unwrap();
        let dist = dir.path().join("dist");
        std::fs::create_dir_all(&dist).unwrap();
        std::fs::write(dist.join("index.html"), "<html>app</html>").unwrap();

        let db = DbContext::new(&dir.path().join("test.db"));
        db.init_schema().await.unwrap();
        let settings = Settings {
            frontend_dist: Some(dist),
            cover_cache_dir: dir.path().join("covers"),
            ..Settings::default()
        };
        let router = create_router(AppState::new(&db, Arc::new(settings), None, None));

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/books/12").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<html>app</html>");

        let response = router
            .oneshot(Request::builder().uri("/api/books/1/download").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
