//! Health and Infrastructure Handlers
//!
//! Kubernetes probes and the Prometheus scrape endpoint.

use axum::{extract::State, http::StatusCode, response::Json};

use super::router::AppState;
use super::types::HealthResponse;
use crate::errors::AppError;
use crate::metrics;

/// Main health check endpoint
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let agents = state.list_agents().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        agents: agents.len(),
    }))
}

/// Liveness probe - process is up and serving
pub async fn health_live() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

/// Readiness probe - 200 when the store answers reads, 503 otherwise
pub async fn health_ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.list_agents().await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unavailable",
                    "error": e.to_string(),
                    "timestamp": chrono::Utc::now().to_rfc3339()
                })),
            )
        }
    }
}

/// Prometheus metrics endpoint
pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    use prometheus::Encoder;

    if let Ok(agents) = state.list_agents().await {
        metrics::KNOWLEDGE_AGENTS.set(agents.len() as i64);
    }

    let encoder = prometheus::TextEncoder::new();
    let metric_families = metrics::METRICS_REGISTRY.gather();

    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::handlers::test_helpers::*;

    #[tokio::test]
    async fn test_health_endpoints_are_public() {
        let h = TestHarness::with_config(|c| c.api_keys = vec![TEST_API_KEY.to_string()]);
        h.ingest("agent-a", "one").await;

        let (status, body) = send(h.router(), get_unauthenticated("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["agents"], 1);

        let (status, _) = send(h.router(), get_unauthenticated("/health/live")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(h.router(), get_unauthenticated("/health/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        crate::metrics::register_metrics().unwrap();
        let h = TestHarness::new();
        h.ingest("agent-a", "one").await;

        let (status, body) = send(h.router(), get_unauthenticated("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_str().unwrap().contains("kb_knowledge_agents"));
    }
}
