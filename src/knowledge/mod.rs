//! Agent-scoped knowledge store
//!
//! Chunks are partitioned by owning agent. Nothing in this module reads an
//! agent id from ambient state; every operation takes it explicitly.

pub mod chunking;
pub mod ingest;
pub mod storage;
pub mod types;

pub use chunking::{chunk_text, ChunkConfig};
pub use ingest::{ChunkingIngestor, IngestError, Ingestor};
pub use storage::{KnowledgeStore, StoreError};
pub use types::{AgentId, ChunkId, DeleteOutcome, KnowledgeChunk};
