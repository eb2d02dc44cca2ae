//! Ingestion handler

use axum::{extract::State, response::Json};

use super::knowledge::parse_agent_id;
use super::router::AppState;
use super::types::{IngestRequest, IngestResponse};
use crate::errors::{AppError, ValidationErrorExt};
use crate::validation;

/// POST /api/admin/ingest - chunk and store text for one agent
#[tracing::instrument(skip(state, req), fields(agent_id = %req.agent_id, bytes = req.text.len()))]
pub async fn ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    let agent = parse_agent_id(Some(req.agent_id))?;
    let max = state.server_config().max_text_length;
    if req.text.len() > max {
        return Err(AppError::ContentTooLarge {
            size: req.text.len(),
            max,
        });
    }
    validation::validate_text(&req.text, max).map_validation_err("text")?;

    let chunks = state.ingest(agent, req.text).await.map_err(|e| {
        tracing::warn!(error = %e, "Ingestion failed");
        AppError::from(e)
    })?;

    Ok(Json(IngestResponse {
        chunks: chunks.len(),
    }))
}
