//! Store access as seen from a display surface
//!
//! Surfaces talk to the store through these traits so the same panel runs
//! against the HTTP client or an in-process service.

use std::future::Future;
use std::sync::Arc;

use crate::handlers::KnowledgeService;
use crate::knowledge::{AgentId, ChunkId, IngestError, KnowledgeChunk, StoreError};

/// Failure of a store call made on behalf of a surface
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// Request rejected (bad agent id, empty text, ...)
    #[error("{0}")]
    Validation(String),

    /// Store-side failure
    #[error("{0}")]
    Store(String),

    /// Network or protocol failure before a response was read
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("invalid response: {0}")]
    Decode(String),
}

impl SourceError {
    /// Message suitable for a status line: the server's own message when it
    /// sent one, a generic one otherwise
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Store(msg) => msg.clone(),
            Self::Transport(_) | Self::Decode(_) => "Something went wrong".to_string(),
        }
    }
}

impl From<StoreError> for SourceError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<IngestError> for SourceError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Store(e) => e.into(),
            other => Self::Validation(other.to_string()),
        }
    }
}

/// List/delete/clear operations a display component needs
pub trait KnowledgeSource: Send + Sync + 'static {
    /// All chunks of `agent`, newest first
    fn list(
        &self,
        agent: &AgentId,
    ) -> impl Future<Output = Result<Vec<KnowledgeChunk>, SourceError>> + Send;

    /// Delete one chunk, with `agent` as the ownership check; returns 0 or 1
    fn delete_one(
        &self,
        chunk_id: ChunkId,
        agent: &AgentId,
    ) -> impl Future<Output = Result<usize, SourceError>> + Send;

    /// Delete every chunk of `agent`; returns the number removed
    fn clear_all(&self, agent: &AgentId) -> impl Future<Output = Result<usize, SourceError>> + Send;
}

/// Ingestion as seen from an ingestion surface
pub trait IngestClient: Send + Sync + 'static {
    /// Ingest `text` for `agent`; returns the number of chunks created
    fn ingest(
        &self,
        agent: &AgentId,
        text: &str,
    ) -> impl Future<Output = Result<usize, SourceError>> + Send;
}

/// In-process access to a `KnowledgeService`, bypassing HTTP
#[derive(Clone)]
pub struct LocalKnowledgeSource {
    service: Arc<KnowledgeService>,
}

impl LocalKnowledgeSource {
    pub fn new(service: Arc<KnowledgeService>) -> Self {
        Self { service }
    }
}

impl KnowledgeSource for LocalKnowledgeSource {
    async fn list(&self, agent: &AgentId) -> Result<Vec<KnowledgeChunk>, SourceError> {
        Ok(self.service.list(agent.clone()).await?)
    }

    async fn delete_one(&self, chunk_id: ChunkId, agent: &AgentId) -> Result<usize, SourceError> {
        let outcome = self.service.delete_one(chunk_id, Some(agent.clone())).await?;
        Ok(outcome.deleted_count())
    }

    async fn clear_all(&self, agent: &AgentId) -> Result<usize, SourceError> {
        Ok(self.service.clear_all(agent.clone()).await?)
    }
}

impl IngestClient for LocalKnowledgeSource {
    async fn ingest(&self, agent: &AgentId, text: &str) -> Result<usize, SourceError> {
        let chunks = self.service.ingest(agent.clone(), text.to_string()).await?;
        Ok(chunks.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        assert_eq!(
            SourceError::Validation("Missing agentId".to_string()).user_message(),
            "Missing agentId"
        );
        assert_eq!(
            SourceError::Transport("connection refused".to_string()).user_message(),
            "Something went wrong"
        );
    }

    #[test]
    fn test_ingest_errors_classify() {
        let err: SourceError = IngestError::EmptyText.into();
        assert!(matches!(err, SourceError::Validation(_)));

        let err: SourceError = IngestError::Store(StoreError::Task("boom".to_string())).into();
        assert!(matches!(err, SourceError::Store(_)));
    }
}
