//! Shared application state
//!
//! `KnowledgeService` owns the store, the ingestion collaborator and the
//! event broadcaster. All RocksDB work goes through `spawn_blocking`.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::types::{KnowledgeEvent, KnowledgeEventType};
use crate::auth::ApiKeys;
use crate::config::ServerConfig;
use crate::knowledge::{
    AgentId, ChunkConfig, ChunkId, ChunkingIngestor, DeleteOutcome, IngestError, Ingestor,
    KnowledgeChunk, KnowledgeStore, StoreError,
};
use crate::metrics::{self, Timer};

/// Knowledge store plus everything the HTTP surface needs around it
pub struct KnowledgeService {
    store: Arc<KnowledgeStore>,
    ingestor: Arc<dyn Ingestor>,
    /// SSE event broadcaster for connected admin surfaces
    event_broadcaster: broadcast::Sender<KnowledgeEvent>,
    api_keys: ApiKeys,
    config: ServerConfig,
}

impl KnowledgeService {
    /// Open the store under `config.storage_path` with the default chunking ingestor
    pub fn new(config: ServerConfig) -> Result<Self, StoreError> {
        let store = Arc::new(KnowledgeStore::open(&config.storage_path)?);
        let ingestor = Arc::new(ChunkingIngestor::new(
            store.clone(),
            ChunkConfig::new(config.chunk_size, config.chunk_overlap),
            config.max_text_length,
        ));
        Ok(Self::with_ingestor(config, store, ingestor))
    }

    /// Assemble a service around an existing store and ingestion collaborator
    pub fn with_ingestor(
        config: ServerConfig,
        store: Arc<KnowledgeStore>,
        ingestor: Arc<dyn Ingestor>,
    ) -> Self {
        let (event_broadcaster, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            store,
            ingestor,
            event_broadcaster,
            api_keys: ApiKeys::new(config.api_keys.clone()),
            config,
        }
    }

    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.store
    }

    pub fn server_config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn api_keys(&self) -> ApiKeys {
        self.api_keys.clone()
    }

    /// Broadcast a knowledge event (no-op when nobody is subscribed)
    pub fn emit_event(&self, event: KnowledgeEvent) {
        let _ = self.event_broadcaster.send(event);
    }

    /// Subscribe to knowledge events
    pub fn subscribe_events(&self) -> broadcast::Receiver<KnowledgeEvent> {
        self.event_broadcaster.subscribe()
    }

    // =========================================================================
    // STORE OPERATIONS (async, blocking pool)
    // =========================================================================

    pub async fn list(&self, agent: AgentId) -> Result<Vec<KnowledgeChunk>, StoreError> {
        let store = self.store.clone();
        let result = run_blocking("list", move || store.list(&agent)).await;
        metrics::record_op("list", result.is_ok());
        result
    }

    pub async fn delete_one(
        &self,
        chunk_id: ChunkId,
        owner: Option<AgentId>,
    ) -> Result<DeleteOutcome, StoreError> {
        let store = self.store.clone();
        // Resolve the owner for the event before the chunk disappears
        let result = run_blocking("delete", move || {
            let agent = match owner {
                Some(owner) => Some(owner),
                None => store.get(&chunk_id)?.map(|c| c.agent_id),
            };
            let outcome = store.delete_one(&chunk_id, agent.as_ref())?;
            Ok((outcome, agent))
        })
        .await;
        metrics::record_op("delete", result.is_ok());

        let (outcome, agent) = result?;
        if let (DeleteOutcome::Deleted, Some(agent)) = (outcome, agent) {
            metrics::CHUNKS_DELETED_TOTAL.inc();
            self.emit_event(KnowledgeEvent::new(KnowledgeEventType::Delete, agent).with_chunk(chunk_id));
        }
        Ok(outcome)
    }

    pub async fn clear_all(&self, agent: AgentId) -> Result<usize, StoreError> {
        let store = self.store.clone();
        let target = agent.clone();
        let result = run_blocking("clear", move || store.clear_all(&target)).await;
        metrics::record_op("clear", result.is_ok());

        let removed = result?;
        if removed > 0 {
            metrics::CHUNKS_DELETED_TOTAL.inc_by(removed as u64);
        }
        self.emit_event(KnowledgeEvent::new(KnowledgeEventType::Clear, agent).with_count(removed));
        Ok(removed)
    }

    pub async fn ingest(&self, agent: AgentId, text: String) -> Result<Vec<KnowledgeChunk>, IngestError> {
        let ingestor = self.ingestor.clone();
        let target = agent.clone();
        let result = {
            let _timer = Timer::for_op("ingest");
            tokio::task::spawn_blocking(move || ingestor.ingest(&target, &text))
                .await
                .map_err(|e| IngestError::Store(StoreError::Task(e.to_string())))
                .and_then(|r| r)
        };
        metrics::record_op("ingest", result.is_ok());

        let chunks = result?;
        metrics::CHUNKS_INGESTED_TOTAL.inc_by(chunks.len() as u64);
        self.emit_event(KnowledgeEvent::new(KnowledgeEventType::Ingest, agent).with_count(chunks.len()));
        Ok(chunks)
    }

    pub async fn list_agents(&self) -> Result<Vec<AgentId>, StoreError> {
        let store = self.store.clone();
        run_blocking("list_agents", move || store.list_agents()).await
    }

    /// Flush the store to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.store.flush()
    }
}

async fn run_blocking<T, F>(op: &str, f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let _timer = Timer::for_op(op);
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Task(format!("{op} task failed: {e}")))?
}
