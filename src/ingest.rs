// src/ingest.rs

//! HTTP ingestion endpoint.
//!
//! Routes served by the ingest Lambda:
//! 1. `POST /sync` - feed upload, shared-secret guarded, runs a sync
//! 2. `PATCH /overrides` - admin override patch, shared-secret guarded
//! 3. `GET /export` - public listing feed
//!
//! Auth accepts the secret in either an `x-api-key` header or an
//! `Authorization: Bearer` header. A paused flag rejects sync uploads
//! outright so a bad feed source can be shut off without a deploy.

use serde::Deserialize;

use crate::error::AppError;
use crate::models::OverridePatch;

/// Endpoint configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Shared secret; an empty value rejects every guarded request
    pub api_key: String,
    /// When set, `POST /sync` answers 503 without touching the store
    pub paused: bool,
}

impl IngestConfig {
    /// Read `SYNC_API_KEY` and `SYNC_PAUSED` from the environment.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("SYNC_API_KEY").unwrap_or_default(),
            paused: std::env::var("SYNC_PAUSED")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }

    /// True when the presented key matches the configured secret.
    pub fn accepts(&self, presented: Option<&str>) -> bool {
        !self.api_key.is_empty() && presented == Some(self.api_key.as_str())
    }
}

/// Interpret an environment flag value.
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Pull the API key out of the request headers.
///
/// `x-api-key` wins; `Authorization: Bearer <key>` is the fallback.
pub fn extract_api_key<'a>(
    x_api_key: Option<&'a str>,
    authorization: Option<&'a str>,
) -> Option<&'a str> {
    if let Some(key) = x_api_key {
        let key = key.trim();
        if !key.is_empty() {
            return Some(key);
        }
    }
    authorization
        .and_then(|value| value.trim().strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Map an application error to an HTTP status code.
pub fn error_status(err: &AppError) -> u16 {
    match err {
        AppError::EmptyFeed { .. }
        | AppError::Csv(_)
        | AppError::Json(_)
        | AppError::Validation(_) => 400,
        AppError::NotFound { .. } => 404,
        _ => 500,
    }
}

/// `PATCH /overrides` payload.
#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub vin: String,
    pub overrides: OverridePatch,
}

#[cfg(feature = "lambda")]
mod routes {
    use std::borrow::Cow;

    use lambda_http::{Body, Error as LambdaError, Request, Response};
    use serde_json::json;
    use tracing::{error, info, instrument};

    use crate::config::FeedConfig;
    use crate::export::export_listings;
    use crate::models::VehicleStatus;
    use crate::pipeline::run_sync;
    use crate::storage::{DynamoStore, InventoryStore};

    use super::{IngestConfig, OverrideRequest, error_status, extract_api_key};

    type RouteResult = std::result::Result<Response<Body>, LambdaError>;

    /// Lambda entry point: build the store and dispatch the request.
    #[instrument(skip(event))]
    pub async fn handler(event: Request) -> RouteResult {
        let config = IngestConfig::from_env();
        let store = DynamoStore::from_env().await?;
        serve(event, &config, &store).await
    }

    /// Dispatch a request to its route.
    pub async fn serve(
        event: Request,
        config: &IngestConfig,
        store: &dyn InventoryStore,
    ) -> RouteResult {
        let method = event.method().as_str().to_string();
        let path = event.uri().path().to_string();
        info!("{} {}", method, path);

        match (method.as_str(), path.as_str()) {
            ("POST", "/sync") => post_sync(event, config, store).await,
            ("PATCH", "/overrides") => patch_overrides(event, config, store).await,
            ("GET", "/export") => get_export(store).await,
            _ => json_response(404, json!({ "error": "Not found" })),
        }
    }

    async fn post_sync(
        event: Request,
        config: &IngestConfig,
        store: &dyn InventoryStore,
    ) -> RouteResult {
        if !authorized(&event, config) {
            return json_response(401, json!({ "error": "Unauthorized" }));
        }
        if config.paused {
            return json_response(503, json!({ "error": "Sync is paused" }));
        }

        let body = body_text(event.body());
        if body.trim().is_empty() {
            return json_response(400, json!({ "error": "Empty request body" }));
        }

        let feed_config = FeedConfig::from_env();
        match run_sync(&body, &feed_config, store).await {
            Ok(summary) => json_response(200, json!({ "success": true, "summary": summary })),
            Err(e) => {
                error!("Sync failed: {}", e);
                json_response(error_status(&e), json!({ "error": e.to_string() }))
            }
        }
    }

    async fn patch_overrides(
        event: Request,
        config: &IngestConfig,
        store: &dyn InventoryStore,
    ) -> RouteResult {
        if !authorized(&event, config) {
            return json_response(401, json!({ "error": "Unauthorized" }));
        }

        let payload: OverrideRequest = match serde_json::from_slice(event.body()) {
            Ok(payload) => payload,
            Err(e) => {
                return json_response(400, json!({ "error": format!("Invalid payload: {e}") }));
            }
        };

        match store.apply_overrides(&payload.vin, &payload.overrides).await {
            Ok(vehicle) => json_response(200, json!({ "success": true, "vehicle": vehicle })),
            Err(e) => {
                error!("Override failed for {}: {}", payload.vin, e);
                json_response(error_status(&e), json!({ "error": e.to_string() }))
            }
        }
    }

    async fn get_export(store: &dyn InventoryStore) -> RouteResult {
        let mut vehicles = Vec::new();
        for status in VehicleStatus::active() {
            match store.get_by_status(status).await {
                Ok(batch) => vehicles.extend(batch),
                Err(e) => {
                    error!("Export read failed: {}", e);
                    return json_response(error_status(&e), json!({ "error": e.to_string() }));
                }
            }
        }

        let listings = export_listings(&vehicles);
        json_response(200, serde_json::to_value(listings)?)
    }

    fn authorized(event: &Request, config: &IngestConfig) -> bool {
        let headers = event.headers();
        let x_api_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
        let authorization = headers.get("authorization").and_then(|v| v.to_str().ok());
        config.accepts(extract_api_key(x_api_key, authorization))
    }

    fn body_text(body: &Body) -> Cow<'_, str> {
        match body {
            Body::Empty => Cow::Borrowed(""),
            Body::Text(text) => Cow::Borrowed(text.as_str()),
            Body::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    fn json_response(status: u16, body: serde_json::Value) -> RouteResult {
        Ok(Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Body::Text(body.to_string()))?)
    }
}

#[cfg(feature = "lambda")]
pub use routes::{handler, serve};


#[cfg(all(test, feature = "lambda"))]
mod route_tests {
    use super::*;
    use crate::models::VehicleStatus;
    use crate::storage::{InventoryStore, LocalStore};
    use lambda_http::{Body, Request, Response};
    use tempfile::TempDir;

    const FEED: &str = "Year,Make,Model,VIN,Price,Status\n\
                        2023,Ford,Bronco,1FMEE5DP1PLA00001,52000,Available";

    fn config() -> IngestConfig {
        IngestConfig {
            api_key: "sekrit".to_string(),
            paused: false,
        }
    }

    fn request(method: &str, path: &str, key: Option<&str>, body: Body) -> Request {
        let mut builder = lambda_http::http::Request::builder().method(method).uri(path);
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        builder.body(body).unwrap()
    }

    fn body_json(response: Response<Body>) -> serde_json::Value {
        match response.into_body() {
            Body::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sync_without_key_is_unauthorized() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        let event = request("POST", "/sync", None, Body::Text(FEED.to_string()));
        let response = serve(event, &config(), &store).await.unwrap();
        assert_eq!(response.status(), 401);
    }

    #[tokio::test]
    async fn paused_sync_answers_503() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        let mut config = config();
        config.paused = true;

        let event = request("POST", "/sync", Some("sekrit"), Body::Text(FEED.to_string()));
        let response = serve(event, &config, &store).await.unwrap();
        assert_eq!(response.status(), 503);
        assert!(store.get_by_vin("1FMEE5DP1PLA00001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sync_uploads_the_feed() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        let event = request("POST", "/sync", Some("sekrit"), Body::Text(FEED.to_string()));
        let response = serve(event, &config(), &store).await.unwrap();
        assert_eq!(response.status(), 200);

        let json = body_json(response);
        assert_eq!(json["success"], true);
        assert_eq!(json["summary"]["newInventoryCount"], 1);

        let stored = store.get_by_vin("1FMEE5DP1PLA00001").await.unwrap().unwrap();
        assert_eq!(stored.record.status, VehicleStatus::Available);
    }

    #[tokio::test]
    async fn headers_only_feed_is_a_bad_request() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        let event = request(
            "POST",
            "/sync",
            Some("sekrit"),
            Body::Text("Year,Make,Model,VIN,Price,Status".to_string()),
        );
        let response = serve(event, &config(), &store).await.unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn override_patch_flows_to_the_store() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        let seed = request("POST", "/sync", Some("sekrit"), Body::Text(FEED.to_string()));
        serve(seed, &config(), &store).await.unwrap();

        let patch = r#"{"vin": "1FMEE5DP1PLA00001", "overrides": {"featured": true}}"#;
        let event = request(
            "PATCH",
            "/overrides",
            Some("sekrit"),
            Body::Text(patch.to_string()),
        );
        let response = serve(event, &config(), &store).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(response)["vehicle"]["featured"], true);
    }

    #[tokio::test]
    async fn override_for_unknown_vin_is_404() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        let patch = r#"{"vin": "MISSING", "overrides": {"featured": true}}"#;
        let event = request(
            "PATCH",
            "/overrides",
            Some("sekrit"),
            Body::Text(patch.to_string()),
        );
        let response = serve(event, &config(), &store).await.unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn export_is_public_and_filtered() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        let seed = request("POST", "/sync", Some("sekrit"), Body::Text(FEED.to_string()));
        serve(seed, &config(), &store).await.unwrap();
        let patch = crate::models::OverridePatch {
            hidden: Some(true),
            ..Default::default()
        };
        store.apply_overrides("1FMEE5DP1PLA00001", &patch).await.unwrap();

        let event = request("GET", "/export", None, Body::Empty);
        let response = serve(event, &config(), &store).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(response), serde_json::json!([]));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        let event = request("GET", "/nope", None, Body::Empty);
        let response = serve(event, &config(), &store).await.unwrap();
        assert_eq!(response.status(), 404);
    }
}
