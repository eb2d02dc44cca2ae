//! End-to-end tests for the admin HTTP surface.
//!
//! Every test builds the router the way main.rs does (minus rate limiting)
//! over a fresh temp directory and drives it with `tower::ServiceExt`.
//!
//! Run with: `cargo test --test handler_tests`

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

use agent_knowledge::{
    config::ServerConfig,
    handlers::{build_protected_routes, build_public_routes, KnowledgeService},
};

// ═══════════════════════════════════════════════════════════════════════
// Test infrastructure
// ═══════════════════════════════════════════════════════════════════════

const TEST_KEY: &str = "handler-smoke-test-key";

/// Self-contained test harness with a fresh temp directory and RocksDB.
struct Harness {
    service: Arc<KnowledgeService>,
    _dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let mut cfg = ServerConfig {
            storage_path: dir.path().to_path_buf(),
            api_keys: vec![TEST_KEY.to_string()],
            ..ServerConfig::default()
        };
        tweak(&mut cfg);
        let service = KnowledgeService::new(cfg).expect("create KnowledgeService");
        Self {
            service: Arc::new(service),
            _dir: dir,
        }
    }

    fn app(&self) -> Router {
        let public = build_public_routes(self.service.clone());
        let protected = build_protected_routes(self.service.clone());
        Router::new().merge(public).merge(protected)
    }
}

// ── request helpers ──

fn authed(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", TEST_KEY)
        .body(Body::empty())
        .unwrap()
}

fn authed_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    let bytes = serde_json::to_vec(&body).unwrap();
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", TEST_KEY)
        .body(Body::from(bytes))
        .unwrap()
}

fn noauth(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// ── response helpers ──

async fn status_of(app: Router, req: Request<Body>) -> StatusCode {
    app.oneshot(req).await.unwrap().status()
}

async fn json_of(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let val = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&bytes).to_string())
        })
    };
    (status, val)
}

fn contents(list: &serde_json::Value) -> Vec<String> {
    list["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|item| item["content"].as_str().unwrap().to_string())
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// AUTH MIDDLEWARE
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn auth_public_routes_need_no_key() {
    let h = Harness::new();
    for uri in ["/health", "/health/live", "/health/ready", "/metrics"] {
        assert_eq!(
            status_of(h.app(), noauth(Method::GET, uri)).await,
            StatusCode::OK,
            "{uri} should be public"
        );
    }
}

#[tokio::test]
async fn auth_protected_routes_reject_missing_key() {
    let h = Harness::new();
    for (method, uri) in [
        (Method::GET, "/api/admin/knowledge?agentId=a"),
        (Method::DELETE, "/api/admin/knowledge?agentId=a"),
        (Method::GET, "/api/admin/knowledge/events?agentId=a"),
        (Method::POST, "/api/admin/ingest"),
    ] {
        assert_eq!(
            status_of(h.app(), noauth(method.clone(), uri)).await,
            StatusCode::UNAUTHORIZED,
            "{method} {uri} should require a key"
        );
    }
}

#[tokio::test]
async fn auth_rejects_wrong_key() {
    let h = Harness::new();
    let req = Request::builder()
        .method(Method::GET)
        .uri("/api/admin/knowledge?agentId=a")
        .header("x-api-key", "not-the-key")
        .body(Body::empty())
        .unwrap();
    assert_eq!(status_of(h.app(), req).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_disabled_without_keys() {
    let h = Harness::with_config(|c| c.api_keys.clear());
    let (status, body) = json_of(h.app(), noauth(Method::GET, "/api/admin/knowledge?agentId=a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
}

// ═══════════════════════════════════════════════════════════════════════
// KNOWLEDGE LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn ingest_list_delete_clear_lifecycle() {
    let h = Harness::new();

    let (status, body) = json_of(
        h.app(),
        authed_post(
            "/api/admin/ingest",
            json!({"text": "hello world", "agentId": "A"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chunks"], 1);

    let (status, list) = json_of(h.app(), authed(Method::GET, "/api/admin/knowledge?agentId=A")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contents(&list), vec!["hello world"]);
    let item = &list["items"][0];
    assert_eq!(item["agentId"], "A");
    assert!(item["id"].is_string());
    assert!(item["createdAt"].is_string());

    // Another agent sees nothing
    let (_, other) = json_of(h.app(), authed(Method::GET, "/api/admin/knowledge?agentId=B")).await;
    assert!(contents(&other).is_empty());

    let id = item["id"].as_str().unwrap().to_string();
    let (status, body) = json_of(
        h.app(),
        authed(
            Method::DELETE,
            &format!("/api/admin/knowledge?id={id}&agentId=A"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "deleted": 1}));

    let (_, list) = json_of(h.app(), authed(Method::GET, "/api/admin/knowledge?agentId=A")).await;
    assert!(contents(&list).is_empty());
}

#[tokio::test]
async fn list_is_newest_first() {
    let h = Harness::new();
    for text in ["first", "second", "third"] {
        let status = status_of(
            h.app(),
            authed_post("/api/admin/ingest", json!({"text": text, "agentId": "A"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, list) = json_of(h.app(), authed(Method::GET, "/api/admin/knowledge?agentId=A")).await;
    assert_eq!(contents(&list), vec!["third", "second", "first"]);
}

#[tokio::test]
async fn clear_reports_count_and_spares_other_agents() {
    let h = Harness::new();
    for (text, agent) in [("a1", "A"), ("a2", "A"), ("b1", "B")] {
        status_of(
            h.app(),
            authed_post("/api/admin/ingest", json!({"text": text, "agentId": agent})),
        )
        .await;
    }

    let (status, body) = json_of(h.app(), authed(Method::DELETE, "/api/admin/knowledge?agentId=A")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "deleted": 2}));

    let (_, list) = json_of(h.app(), authed(Method::GET, "/api/admin/knowledge?agentId=B")).await;
    assert_eq!(contents(&list), vec!["b1"]);

    // Clearing an empty partition is not an error
    let (status, body) = json_of(h.app(), authed(Method::DELETE, "/api/admin/knowledge?agentId=A")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 0);
}

#[tokio::test]
async fn delete_by_foreign_agent_is_refused() {
    let h = Harness::new();
    status_of(
        h.app(),
        authed_post("/api/admin/ingest", json!({"text": "secret", "agentId": "A"})),
    )
    .await;
    let (_, list) = json_of(h.app(), authed(Method::GET, "/api/admin/knowledge?agentId=A")).await;
    let id = list["items"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = json_of(
        h.app(),
        authed(
            Method::DELETE,
            &format!("/api/admin/knowledge?id={id}&agentId=B"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 0);

    let (_, list) = json_of(h.app(), authed(Method::GET, "/api/admin/knowledge?agentId=A")).await;
    assert_eq!(contents(&list), vec!["secret"]);
}

// ═══════════════════════════════════════════════════════════════════════
// VALIDATION
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn list_requires_agent_id() {
    let h = Harness::new();
    for uri in ["/api/admin/knowledge", "/api/admin/knowledge?agentId="] {
        let (status, body) = json_of(h.app(), authed(Method::GET, uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["message"], "Missing agentId");
    }
}

#[tokio::test]
async fn delete_requires_a_target() {
    let h = Harness::new();
    let (status, body) = json_of(h.app(), authed(Method::DELETE, "/api/admin/knowledge")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Provide either id or agentId");
}

#[tokio::test]
async fn ingest_rejects_blank_text_and_missing_agent() {
    let h = Harness::new();

    let (status, _) = json_of(
        h.app(),
        authed_post("/api/admin/ingest", json!({"text": "   ", "agentId": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = json_of(
        h.app(),
        authed_post("/api/admin/ingest", json!({"text": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing agentId");

    // Nothing was stored by the rejected requests
    let (_, list) = json_of(h.app(), authed(Method::GET, "/api/admin/knowledge?agentId=A")).await;
    assert!(contents(&list).is_empty());
}

#[tokio::test]
async fn health_counts_agents() {
    let h = Harness::new();
    status_of(
        h.app(),
        authed_post("/api/admin/ingest", json!({"text": "x", "agentId": "A"})),
    )
    .await;
    status_of(
        h.app(),
        authed_post("/api/admin/ingest", json!({"text": "y", "agentId": "B"})),
    )
    .await;

    let (status, body) = json_of(h.app(), noauth(Method::GET, "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["agents"], 2);
}
