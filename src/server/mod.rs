//! HTTP API for the diary store.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check endpoint (no auth required)
//! - `GET /items?date=`: Item for a date, or an empty placeholder
//! - `PUT /items`: Create or overwrite the item for a date
//! - `DELETE /items/{date}`: Delete the item for a date
//! - `GET /search?search=&tags=&date=`: Filtered item list
//! - `GET /sync/changes?since=&limit=`: One page of the change log
//! - `GET /sync/latest`: Latest change id for the user

pub mod auth;
pub mod error;
pub mod items;
pub mod sync;

pub use auth::{ApiKeyStore, AuthUser};
pub use error::ApiError;

use axum::{
    middleware,
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::store::Storage;
use crate::sync::SyncReader;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub sync: SyncReader,
    pub api_keys: Arc<ApiKeyStore>,
}

impl AppState {
    pub fn new(storage: Storage, sync: SyncReader, api_keys: ApiKeyStore) -> Self {
        Self {
            storage,
            sync,
            api_keys: Arc::new(api_keys),
        }
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint (no auth required)
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route("/items", get(items::get_item).put(items::put_item))
        .route("/items/{date}", delete(items::delete_item))
        .route("/search", get(items::search_items))
        .route("/sync/changes", get(sync::get_changes))
        .route("/sync/latest", get(sync::get_latest))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKeyEntry;
    use crate::db::test_pool;
    use crate::sync::SyncLimits;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const ALICE_KEY: &str = "alice-key";
    const BOB_KEY: &str = "bob-key";

    struct TestContext {
        app: Router,
        _temp_dir: TempDir,
    }

    async fn setup() -> TestContext {
        let (pool, temp_dir) = test_pool().await;
        let storage = Storage::new(pool);
        storage.users().create_user("alice", "h").await.unwrap();
        storage.users().create_user("bob", "h").await.unwrap();

        let keys = ApiKeyStore::new(&[
            ApiKeyEntry {
                key: ALICE_KEY.to_string(),
                login: "alice".to_string(),
            },
            ApiKeyEntry {
                key: BOB_KEY.to_string(),
                login: "bob".to_string(),
            },
            ApiKeyEntry {
                key: "ghost-key".to_string(),
                login: "ghost".to_string(),
            },
        ]);
        let sync = SyncReader::new(storage.changes().clone(), SyncLimits::default());

        TestContext {
            app: router(AppState::new(storage, sync, keys)),
            _temp_dir: temp_dir,
        }
    }

    async fn send(
        ctx: &TestContext,
        method: Method,
        uri: &str,
        key: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = ctx.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        // Extractor rejections come back as plain text
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    async fn put(ctx: &TestContext, key: &str, body: Value) -> (StatusCode, Value) {
        send(ctx, Method::PUT, "/items", Some(key), Some(body)).await
    }

    #[tokio::test]
    async fn test_health_needs_no_auth() {
        let ctx = setup().await;
        let (status, body) = send(&ctx, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_auth_rejections() {
        let ctx = setup().await;

        let (status, body) = send(&ctx, Method::GET, "/sync/latest", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "missing_auth");

        let request = Request::builder()
            .uri("/sync/latest")
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        let response = ctx.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let (status, body) = send(&ctx, Method::GET, "/sync/latest", Some("nope"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_key");

        // Key configured for a login that has no user row
        let (status, _) = send(&ctx, Method::GET, "/sync/latest", Some("ghost-key"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_get_missing_item_returns_placeholder() {
        let ctx = setup().await;

        let (status, body) =
            send(&ctx, Method::GET, "/items?date=2024-01-15", Some(ALICE_KEY), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"date": "2024-01-15", "title": "", "body": "", "tags": []})
        );
    }

    #[tokio::test]
    async fn test_put_trims_tags_and_records_change() {
        let ctx = setup().await;

        let (status, body) = put(
            &ctx,
            ALICE_KEY,
            json!({
                "date": "2024-01-15",
                "title": "Hello",
                "body": "World",
                "tags": [" work ", "", "fun"],
                "metadata": ["web"]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tags"], json!(["work", "fun"]));

        let (_, body) =
            send(&ctx, Method::GET, "/items?date=2024-01-15", Some(ALICE_KEY), None).await;
        assert_eq!(body["title"], "Hello");
        assert_eq!(body["tags"], json!(["work", "fun"]));

        let (status, page) =
            send(&ctx, Method::GET, "/sync/changes?since=0", Some(ALICE_KEY), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["hasMore"], false);
        assert_eq!(page["nextId"], 0);
        let change = &page["changes"][0];
        assert_eq!(change["operationType"], "created");
        assert_eq!(change["date"], "2024-01-15");
        assert_eq!(change["itemSnapshot"]["title"], "Hello");
        assert_eq!(change["metadata"], json!(["web"]));
    }

    #[tokio::test]
    async fn test_put_requires_date() {
        let ctx = setup().await;
        let (status, body) = put(&ctx, ALICE_KEY, json!({"date": " ", "title": "x"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_navigation_dates() {
        let ctx = setup().await;
        for date in ["2024-01-10", "2024-01-15", "2024-01-20"] {
            put(&ctx, ALICE_KEY, json!({"date": date, "title": date})).await;
        }

        let (_, body) =
            send(&ctx, Method::GET, "/items?date=2024-01-15", Some(ALICE_KEY), None).await;
        assert_eq!(body["previousDate"], "2024-01-10");
        assert_eq!(body["nextDate"], "2024-01-20");

        let (_, body) =
            send(&ctx, Method::GET, "/items?date=2024-01-10", Some(ALICE_KEY), None).await;
        assert!(body.get("previousDate").is_none());
        assert_eq!(body["nextDate"], "2024-01-15");
    }

    #[tokio::test]
    async fn test_delete_item() {
        let ctx = setup().await;
        put(&ctx, ALICE_KEY, json!({"date": "2024-01-15", "title": "Bye"})).await;

        let (status, _) = send(
            &ctx,
            Method::DELETE,
            "/items/2024-01-15?metadata=mobile,v2",
            Some(ALICE_KEY),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) =
            send(&ctx, Method::DELETE, "/items/2024-01-15", Some(ALICE_KEY), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, page) = send(&ctx, Method::GET, "/sync/changes", Some(ALICE_KEY), None).await;
        let changes = page["changes"].as_array().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1]["operationType"], "deleted");
        assert_eq!(changes[1]["itemSnapshot"]["title"], "Bye");
        assert_eq!(changes[1]["metadata"], json!(["mobile", "v2"]));
    }

    #[tokio::test]
    async fn test_search() {
        let ctx = setup().await;
        put(
            &ctx,
            ALICE_KEY,
            json!({"date": "2024-01-01", "title": "Ski trip", "tags": ["travel"]}),
        )
        .await;
        put(
            &ctx,
            ALICE_KEY,
            json!({"date": "2024-01-02", "title": "Work", "tags": ["office"]}),
        )
        .await;
        put(
            &ctx,
            ALICE_KEY,
            json!({"date": "2024-01-03", "title": "Home", "body": "ski wax", "tags": ["home"]}),
        )
        .await;

        let (_, body) = send(&ctx, Method::GET, "/search?search=SKI", Some(ALICE_KEY), None).await;
        assert_eq!(body["totalCount"], 2);
        assert_eq!(body["items"][0]["date"], "2024-01-03");

        let (_, body) = send(
            &ctx,
            Method::GET,
            "/search?tags=office,home",
            Some(ALICE_KEY),
            None,
        )
        .await;
        assert_eq!(body["totalCount"], 2);

        let (_, body) = send(&ctx, Method::GET, "/search", Some(BOB_KEY), None).await;
        assert_eq!(body["totalCount"], 0);
    }

    #[tokio::test]
    async fn test_sync_paging_and_isolation() {
        let ctx = setup().await;
        for day in 1..=3 {
            let date = format!("2024-01-0{}", day);
            put(&ctx, ALICE_KEY, json!({"date": date, "title": "alice"})).await;
            put(&ctx, BOB_KEY, json!({"date": date, "title": "bob"})).await;
        }

        let (_, first) = send(
            &ctx,
            Method::GET,
            "/sync/changes?since=0&limit=2",
            Some(ALICE_KEY),
            None,
        )
        .await;
        assert_eq!(first["changes"].as_array().unwrap().len(), 2);
        assert_eq!(first["hasMore"], true);
        let cursor = first["nextId"].as_i64().unwrap();
        assert_eq!(cursor, first["changes"][1]["id"].as_i64().unwrap());

        let (_, second) = send(
            &ctx,
            Method::GET,
            &format!("/sync/changes?since={}&limit=2", cursor),
            Some(ALICE_KEY),
            None,
        )
        .await;
        let rest = second["changes"].as_array().unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(second["hasMore"], false);
        assert_eq!(rest[0]["itemSnapshot"]["title"], "alice");

        let (_, latest) = send(&ctx, Method::GET, "/sync/latest", Some(ALICE_KEY), None).await;
        assert_eq!(latest["latestId"], rest[0]["id"]);
    }

    #[tokio::test]
    async fn test_sync_bad_query_is_rejected() {
        let ctx = setup().await;
        let (status, _) = send(
            &ctx,
            Method::GET,
            "/sync/changes?since=abc",
            Some(ALICE_KEY),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
