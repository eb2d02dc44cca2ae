//! Ingestion: raw text in, stored chunks out

use std::sync::Arc;

use super::chunking::{chunk_text, ChunkConfig};
use super::storage::{KnowledgeStore, StoreError};
use super::types::{AgentId, KnowledgeChunk};

/// Errors raised while ingesting text
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("text cannot be empty")]
    EmptyText,

    #[error("text too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Converts raw text into stored knowledge chunks for one agent.
///
/// On `Ok`, every returned chunk is already visible to `KnowledgeStore::list`.
pub trait Ingestor: Send + Sync {
    fn ingest(&self, agent: &AgentId, text: &str) -> Result<Vec<KnowledgeChunk>, IngestError>;
}

/// Default ingestor: overlapping fixed-size chunks, one atomic write
pub struct ChunkingIngestor {
    store: Arc<KnowledgeStore>,
    config: ChunkConfig,
    max_text_length: usize,
}

impl ChunkingIngestor {
    pub fn new(store: Arc<KnowledgeStore>, config: ChunkConfig, max_text_length: usize) -> Self {
        Self {
            store,
            config,
            max_text_length,
        }
    }
}

impl Ingestor for ChunkingIngestor {
    fn ingest(&self, agent: &AgentId, text: &str) -> Result<Vec<KnowledgeChunk>, IngestError> {
        if text.len() > self.max_text_length {
            return Err(IngestError::TooLarge {
                size: text.len(),
                max: self.max_text_length,
            });
        }

        let pieces = chunk_text(text, &self.config);
        if pieces.is_empty() {
            return Err(IngestError::EmptyText);
        }

        let chunks = self.store.insert_chunks(agent, &pieces)?;

        tracing::info!(
            agent_id = %agent,
            chunks = chunks.len(),
            bytes = text.len(),
            "Ingested text"
        );

        Ok(chunks)
    }
}
