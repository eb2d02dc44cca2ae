//! Core types for the knowledge store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of the agent that owns a knowledge partition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Wrap a raw identifier. Callers on trust boundaries validate first
    /// (see `validation::validate_agent_id`).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Unique identifier of a stored chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub Uuid);

impl ChunkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable unit of ingested text, owned by exactly one agent.
///
/// This is the wire shape (`{ id, content, agentId, createdAt }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeChunk {
    pub id: ChunkId,
    pub content: String,
    pub agent_id: AgentId,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeChunk {
    /// First `max_chars` characters of the content, with an ellipsis when cut
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

/// Persisted record shape: `{ id, content, agent_id, created_at }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChunkRecord {
    pub id: ChunkId,
    pub content: String,
    pub agent_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChunkRecord> for KnowledgeChunk {
    fn from(record: ChunkRecord) -> Self {
        Self {
            id: record.id,
            content: record.content,
            agent_id: AgentId(record.agent_id),
            created_at: record.created_at,
        }
    }
}

impl From<&KnowledgeChunk> for ChunkRecord {
    fn from(chunk: &KnowledgeChunk) -> Self {
        Self {
            id: chunk.id,
            content: chunk.content.clone(),
            agent_id: chunk.agent_id.0.clone(),
            created_at: chunk.created_at,
        }
    }
}

/// Result of a single-chunk delete.
///
/// `NotFound` covers both a nonexistent id and a chunk owned by a different
/// agent than the one supplied for the ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

impl DeleteOutcome {
    pub fn deleted_count(self) -> usize {
        match self {
            Self::Deleted => 1,
            Self::NotFound => 0,
        }
    }
}
