//! Request/response types for the admin API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::knowledge::{AgentId, ChunkId, KnowledgeChunk};

/// Query for GET /api/admin/knowledge and the event stream
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub agent_id: Option<String>,
}

/// Query for DELETE /api/admin/knowledge
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    pub id: Option<String>,
    pub agent_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub items: Vec<KnowledgeChunk>,
}

/// Delete and clear both answer `{ success, deleted }`; `deleted` is 0 for
/// a chunk that did not exist
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub agent_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub chunks: usize,
}

/// Kind of store mutation carried by a `KnowledgeEvent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KnowledgeEventType {
    Ingest,
    Delete,
    Clear,
}

impl KnowledgeEventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingest => "INGEST",
            Self::Delete => "DELETE",
            Self::Clear => "CLEAR",
        }
    }
}

/// Knowledge event for real-time admin surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEvent {
    pub event_type: KnowledgeEventType,
    pub agent_id: AgentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<ChunkId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub timestamp: DateTime<Utc>,
}

impl KnowledgeEvent {
    pub fn new(event_type: KnowledgeEventType, agent_id: AgentId) -> Self {
        Self {
            event_type,
            agent_id,
            chunk_id: None,
            count: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_chunk(mut self, chunk_id: ChunkId) -> Self {
        self.chunk_id = Some(chunk_id);
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub agents: usize,
}
