//! Input validation at the HTTP boundary
//!
//! Identifiers arriving from clients are checked here before they reach the
//! store; the store itself trusts its inputs.

use anyhow::{anyhow, Result};

use crate::knowledge::{AgentId, ChunkId};

pub const MAX_AGENT_ID_LENGTH: usize = 128;

/// Validate an agent identifier and wrap it
pub fn validate_agent_id(agent_id: &str) -> Result<AgentId> {
    if agent_id.is_empty() {
        return Err(anyhow!("agentId cannot be empty"));
    }

    // ASCII only: [A-Za-z0-9-_@.]
    if !agent_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '@' | '.'))
    {
        return Err(anyhow!(
            "agentId contains invalid characters (allowed: A-Z, a-z, 0-9, -, _, @, .)"
        ));
    }

    // Checked after the charset, so bytes and characters agree
    if agent_id.len() > MAX_AGENT_ID_LENGTH {
        return Err(anyhow!(
            "agentId too long: {} chars (max: {})",
            agent_id.len(),
            MAX_AGENT_ID_LENGTH
        ));
    }

    Ok(AgentId::new(agent_id))
}

/// Validate a chunk id (UUID format)
pub fn validate_chunk_id(chunk_id: &str) -> Result<ChunkId> {
    ChunkId::parse(chunk_id).map_err(|e| anyhow!("Invalid chunk id UUID format: {e}"))
}

/// Validate ingest text against a byte limit
pub fn validate_text(text: &str, max_length: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(anyhow!("text cannot be empty"));
    }

    if text.len() > max_length {
        return Err(anyhow!(
            "text too long: {} bytes (max: {})",
            text.len(),
            max_length
        ));
    }

    Ok(())
}

/// Treat an empty query value (`?agentId=`) the same as an absent one
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
