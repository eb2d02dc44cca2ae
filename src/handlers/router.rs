//! Router Configuration - Centralized route definitions
//!
//! Routes are split into public (no auth) and protected (API key when
//! configured). Rate limiting is applied by the caller.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::state::KnowledgeService;
use super::{events, health, ingest, knowledge};
use crate::auth::auth_middleware;

/// Application state type alias
pub type AppState = Arc<KnowledgeService>;

/// Build the public routes (no authentication required)
///
/// Health probes and Prometheus scraping must always be reachable.
pub fn build_public_routes(state: AppState) -> Router {
    Router::new()
        // =================================================================
        // HEALTH & KUBERNETES PROBES
        // =================================================================
        .route("/health", get(health::health))
        .route("/health/live", get(health::health_live))
        .route("/health/ready", get(health::health_ready))
        // =================================================================
        // METRICS (PROMETHEUS)
        // =================================================================
        .route("/metrics", get(health::metrics_endpoint))
        .with_state(state)
}

/// Build the admin routes, guarded by the API key middleware
pub fn build_protected_routes(state: AppState) -> Router {
    let api_keys = state.api_keys();

    Router::new()
        // =================================================================
        // KNOWLEDGE
        // =================================================================
        .route(
            "/api/admin/knowledge",
            get(knowledge::list_knowledge).delete(knowledge::delete_knowledge),
        )
        .route(
            "/api/admin/knowledge/events",
            get(events::knowledge_events_sse),
        )
        // =================================================================
        // INGEST
        // =================================================================
        .route("/api/admin/ingest", post(ingest::ingest))
        .layer(middleware::from_fn_with_state(api_keys, auth_middleware))
        .with_state(state)
}

/// Build the complete router with both public and protected routes
///
/// Does NOT apply rate limiting, CORS or timeouts; main.rs layers those.
pub fn build_router(state: AppState) -> Router {
    let public = build_public_routes(state.clone());
    let protected = build_protected_routes(state);

    Router::new().merge(public).merge(protected)
}
