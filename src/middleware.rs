//! HTTP request tracking middleware

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Record latency and count of every HTTP request
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    crate::metrics::HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);

    crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Normalize path to prevent metric cardinality explosion
/// /api/admin/knowledge/550e8400-... -> /api/admin/knowledge/{id}
fn normalize_path(path: &str) -> String {
    let normalized: Vec<&str> = path
        .split('/')
        .filter(|part| !part.is_empty())
        .map(|part| if is_id(part) { "{id}" } else { part })
        .collect();

    format!("/{}", normalized.join("/"))
}

/// Check if a path segment looks like an ID (UUID, numeric, long token)
fn is_id(segment: &str) -> bool {
    if segment.contains('-') && segment.len() >= 32 {
        return true;
    }

    if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    segment.len() > 20
}
