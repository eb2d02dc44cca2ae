//! Knowledge listing and deletion handlers

use axum::{
    extract::{Query, State},
    response::Json,
};

use super::router::AppState;
use super::types::{DeleteQuery, DeleteResponse, ListQuery, ListResponse};
use crate::errors::AppError;
use crate::knowledge::AgentId;
use crate::validation::{self, non_empty};

pub(super) fn parse_agent_id(raw: Option<String>) -> Result<AgentId, AppError> {
    let raw = non_empty(raw).ok_or_else(|| AppError::missing("agentId"))?;
    validation::validate_agent_id(&raw).map_err(|e| AppError::InvalidAgentId(e.to_string()))
}

/// GET /api/admin/knowledge?agentId= - all chunks of one agent, newest first
#[tracing::instrument(skip(state))]
pub async fn list_knowledge(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let agent = parse_agent_id(query.agent_id)?;

    let items = state.list(agent).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch knowledge");
        AppError::from(e)
    })?;

    Ok(Json(ListResponse { items }))
}

/// DELETE /api/admin/knowledge
///
/// `?id=` deletes one chunk (with `agentId` as ownership check when present),
/// `?agentId=` alone clears the agent's partition.
#[tracing::instrument(skip(state))]
pub async fn delete_knowledge(
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = non_empty(query.id);
    let agent_id = non_empty(query.agent_id);

    match (id, agent_id) {
        (Some(id), owner) => {
            let chunk_id = validation::validate_chunk_id(&id)
                .map_err(|e| AppError::InvalidChunkId(e.to_string()))?;
            let owner = owner.map(|o| parse_agent_id(Some(o))).transpose()?;

            if owner.is_none() && state.server_config().strict_ownership {
                return Err(AppError::InvalidInput {
                    field: "agentId".to_string(),
                    reason: "agentId is required to delete a chunk".to_string(),
                });
            }

            let outcome = state.delete_one(chunk_id, owner).await.map_err(|e| {
                tracing::error!(error = %e, "Failed to delete chunk");
                AppError::from(e)
            })?;

            Ok(Json(DeleteResponse {
                success: true,
                deleted: outcome.deleted_count(),
            }))
        }
        (None, Some(agent_id)) => {
            let agent = parse_agent_id(Some(agent_id))?;

            let removed = state.clear_all(agent).await.map_err(|e| {
                tracing::error!(error = %e, "Failed to clear knowledge");
                AppError::from(e)
            })?;

            Ok(Json(DeleteResponse {
                success: true,
                deleted: removed,
            }))
        }
        (None, None) => Err(AppError::MissingTarget),
    }
}
