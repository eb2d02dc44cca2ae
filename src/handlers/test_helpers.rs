//! Shared test utilities for handler unit tests.
//!
//! Provides a [`TestHarness`] that sets up a `KnowledgeService` backed by a
//! fresh RocksDB in a temp directory, plus helpers for building requests and
//! reading JSON response bodies.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot()

use super::router::build_router;
use super::state::KnowledgeService;
use crate::config::ServerConfig;
use crate::knowledge::{AgentId, ChunkId};

/// API key used by handler tests that enable authentication.
pub const TEST_API_KEY: &str = "test-handler-key-2025";

/// A self-contained test environment with its own temp storage.
///
/// Holds `TempDir` so the directory isn't cleaned up until the harness drops.
pub struct TestHarness {
    pub service: Arc<KnowledgeService>,
    _temp_dir: TempDir,
}

impl TestHarness {
    /// Harness with default config (authentication disabled)
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Harness with a tweaked config
    pub fn with_config(tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let mut config = ServerConfig {
            storage_path: temp_dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        tweak(&mut config);

        let service = KnowledgeService::new(config).expect("failed to create test service");

        Self {
            service: Arc::new(service),
            _temp_dir: temp_dir,
        }
    }

    /// Build the full application router (public + protected routes).
    pub fn router(&self) -> Router {
        build_router(self.service.clone())
    }

    /// Ingest `text` for `agent` directly; returns the newest chunk id
    pub async fn ingest(&self, agent: &str, text: &str) -> ChunkId {
        let chunks = self
            .service
            .ingest(AgentId::new(agent), text.to_string())
            .await
            .expect("ingest failed");
        chunks.last().expect("no chunks created").id
    }
}

// ---------- Request builders ----------

/// Build a GET request to `uri` with the test API key header.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("x-api-key", TEST_API_KEY)
        .body(Body::empty())
        .unwrap()
}

/// Build a POST request to `uri` with a JSON body and the test API key.
pub fn post_json<T: serde::Serialize>(uri: &str, body: &T) -> Request<Body> {
    let json = serde_json::to_string(body).unwrap();
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", TEST_API_KEY)
        .body(Body::from(json))
        .unwrap()
}

/// Build a DELETE request to `uri` with the test API key.
pub fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .header("x-api-key", TEST_API_KEY)
        .body(Body::empty())
        .unwrap()
}

/// Build a GET request **without** an API key (for testing auth rejection).
pub fn get_unauthenticated(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// ---------- Response helpers ----------

/// Send a request through the router and return (status, JSON body).
///
/// Non-JSON bodies come back as a JSON string.
pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body_bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&body_bytes).to_string())
        })
    };
    (status, json)
}
