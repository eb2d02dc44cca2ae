//! Storage backend for the knowledge store
//!
//! One RocksDB instance holds two key families:
//! - `agent:{id_len}:{agent_id}:{inverted_created_nanos}:{chunk_id}` -> encoded
//!   record. This is the partition index; a forward prefix scan yields newest
//!   first. The byte length makes the partition prefix unambiguous whatever
//!   bytes the agent id contains.
//! - `chunk:{chunk_id}` -> partition index key of that chunk.
//!
//! Every mutation is a single `WriteBatch`, and mutations of one agent
//! partition are serialized by a per-agent lock. Locks live only while some
//! operation on their partition is running.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

use super::types::{AgentId, ChunkId, ChunkRecord, DeleteOutcome, KnowledgeChunk};

const CHUNK_PREFIX: &[u8] = b"chunk:";
const AGENT_PREFIX: &[u8] = b"agent:";
const FIELD_SEPARATOR: u8 = b':';

/// Errors raised by the storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[from] rocksdb::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode chunk record: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode chunk record at {key}: {reason}")]
    Decode { key: String, reason: String },

    #[error("corrupt partition index entry: {0}")]
    CorruptIndex(String),

    #[error("storage task failed: {0}")]
    Task(String),
}

impl StoreError {
    fn corrupt_key(key: &[u8]) -> Self {
        Self::CorruptIndex(String::from_utf8_lossy(key).into_owned())
    }
}

/// Persistent, agent-partitioned chunk store
pub struct KnowledgeStore {
    db: Arc<DB>,
    /// One lock per agent partition with an operation in flight; serializes
    /// writes and snapshot reads
    partition_locks: DashMap<String, Arc<Mutex<()>>>,
    /// Last issued creation timestamp (monotonic clock)
    last_created: Mutex<DateTime<Utc>>,
}

impl KnowledgeStore {
    /// Open (or create) a knowledge store under `storage_path`
    pub fn open(storage_path: &Path) -> Result<Self, StoreError> {
        let db_path = storage_path.join("knowledge");
        std::fs::create_dir_all(&db_path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_max_write_buffer_number(2);
        opts.set_write_buffer_size(16 * 1024 * 1024);

        let db = Arc::new(DB::open(&opts, &db_path)?);

        tracing::info!(path = ?db_path, "Knowledge store initialized");

        Ok(Self {
            db,
            partition_locks: DashMap::new(),
            last_created: Mutex::new(DateTime::<Utc>::MIN_UTC),
        })
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// All chunks owned by `agent`, newest first.
    ///
    /// All-or-nothing: a single undecodable entry fails the whole call.
    pub fn list(&self, agent: &AgentId) -> Result<Vec<KnowledgeChunk>, StoreError> {
        let chunks = self.with_partition(agent, || -> Result<_, StoreError> {
            let prefix = partition_prefix(agent);
            let mut chunks = Vec::new();

            for item in self.db.prefix_iterator(&prefix) {
                let (key, value) = item?;
                if !key.starts_with(&prefix) {
                    break;
                }
                let record = decode_record(&key, &value)?;
                chunks.push(KnowledgeChunk::from(record));
            }
            Ok(chunks)
        })?;

        tracing::debug!(agent_id = %agent, count = chunks.len(), "Listed knowledge chunks");
        Ok(chunks)
    }

    /// Look up a single chunk by id
    pub fn get(&self, chunk_id: &ChunkId) -> Result<Option<KnowledgeChunk>, StoreError> {
        Ok(self
            .locate(chunk_id)?
            .map(|(_, record)| KnowledgeChunk::from(record)))
    }

    /// Number of chunks owned by `agent`
    pub fn count(&self, agent: &AgentId) -> Result<usize, StoreError> {
        let prefix = partition_prefix(agent);
        let mut count = 0;
        for item in self.db.prefix_iterator(&prefix) {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    /// Every agent that currently owns at least one chunk, in key order
    pub fn list_agents(&self) -> Result<Vec<AgentId>, StoreError> {
        let mut agents = Vec::new();
        let mut seek = AGENT_PREFIX.to_vec();

        loop {
            let next = {
                let mut iter = self
                    .db
                    .iterator(IteratorMode::From(seek.as_slice(), Direction::Forward));
                iter.next()
            };
            let Some(item) = next else { break };
            let (key, _) = item?;
            if !key.starts_with(AGENT_PREFIX) {
                break;
            }

            let (name, prefix_len) = parse_partition(&key)?;
            agents.push(AgentId::new(name));

            // Skip the remainder of this partition
            seek = key[..prefix_len].to_vec();
            if let Some(last) = seek.last_mut() {
                *last = FIELD_SEPARATOR + 1;
            }
        }

        Ok(agents)
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Store `contents` as new chunks of `agent` in one atomic batch.
    ///
    /// Creation timestamps are strictly increasing, so the last content of
    /// the slice is the newest chunk.
    pub fn insert_chunks(
        &self,
        agent: &AgentId,
        contents: &[String],
    ) -> Result<Vec<KnowledgeChunk>, StoreError> {
        let created = self.with_partition(agent, || -> Result<_, StoreError> {
            let mut batch = WriteBatch::default();
            let mut created = Vec::with_capacity(contents.len());

            for content in contents {
                let chunk = KnowledgeChunk {
                    id: ChunkId::new(),
                    content: content.clone(),
                    agent_id: agent.clone(),
                    created_at: self.next_timestamp(),
                };
                let index_key = index_key(agent, &chunk.id, chunk.created_at);
                let value = bincode::serde::encode_to_vec(
                    ChunkRecord::from(&chunk),
                    bincode::config::standard(),
                )?;

                batch.put(&index_key, &value);
                batch.put(chunk_key(&chunk.id), &index_key);
                created.push(chunk);
            }

            self.db.write(batch)?;
            Ok(created)
        })?;

        tracing::debug!(agent_id = %agent, count = created.len(), "Stored knowledge chunks");
        Ok(created)
    }

    /// Delete exactly one chunk.
    ///
    /// With `owner` supplied, a chunk belonging to another agent is left in
    /// place and reported as `NotFound`.
    pub fn delete_one(
        &self,
        chunk_id: &ChunkId,
        owner: Option<&AgentId>,
    ) -> Result<DeleteOutcome, StoreError> {
        let Some((_, record)) = self.locate(chunk_id)? else {
            return Ok(DeleteOutcome::NotFound);
        };

        if let Some(owner) = owner {
            if owner.as_str() != record.agent_id {
                tracing::warn!(
                    chunk_id = %chunk_id,
                    requested_by = %owner,
                    "Refusing to delete chunk owned by another agent"
                );
                return Ok(DeleteOutcome::NotFound);
            }
        }

        let agent = AgentId::new(record.agent_id);
        let outcome = self.with_partition(&agent, || -> Result<_, StoreError> {
            // Re-check under the partition lock: a concurrent clear may have won
            let Some((index_key, _)) = self.locate(chunk_id)? else {
                return Ok(DeleteOutcome::NotFound);
            };

            let mut batch = WriteBatch::default();
            batch.delete(&index_key);
            batch.delete(chunk_key(chunk_id));
            self.db.write(batch)?;
            Ok(DeleteOutcome::Deleted)
        })?;

        if outcome == DeleteOutcome::Deleted {
            tracing::debug!(chunk_id = %chunk_id, agent_id = %agent, "Deleted knowledge chunk");
        }
        Ok(outcome)
    }

    /// Delete every chunk of `agent`; other partitions are untouched
    pub fn clear_all(&self, agent: &AgentId) -> Result<usize, StoreError> {
        let removed = self.with_partition(agent, || -> Result<_, StoreError> {
            let prefix = partition_prefix(agent);
            let mut batch = WriteBatch::default();
            let mut removed = 0;

            for item in self.db.prefix_iterator(&prefix) {
                let (key, _) = item?;
                if !key.starts_with(&prefix) {
                    break;
                }
                let chunk_id = chunk_id_from_index_key(&key)?;
                batch.delete(&key);
                batch.delete(chunk_key(&chunk_id));
                removed += 1;
            }

            if removed > 0 {
                self.db.write(batch)?;
            }
            Ok(removed)
        })?;

        tracing::debug!(agent_id = %agent, removed, "Cleared knowledge partition");
        Ok(removed)
    }

    /// Flush memtables to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Run `f` holding the partition lock of `agent`.
    ///
    /// The lock entry is dropped again once no other operation holds it, so
    /// the map only ever contains partitions with work in flight.
    fn with_partition<T>(&self, agent: &AgentId, f: impl FnOnce() -> T) -> T {
        let lock = self
            .partition_locks
            .entry(agent.as_str().to_string())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock();
            f()
        };

        drop(lock);
        // Clones are only taken under the map's shard lock, so a count of one
        // means nobody is waiting on this mutex
        self.partition_locks
            .remove_if(agent.as_str(), |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    /// Resolve a chunk id to its partition index key and record
    fn locate(&self, chunk_id: &ChunkId) -> Result<Option<(Vec<u8>, ChunkRecord)>, StoreError> {
        let Some(index_key) = self.db.get(chunk_key(chunk_id))? else {
            return Ok(None);
        };
        let Some(value) = self.db.get(&index_key)? else {
            // Pointer without an index entry; treat as already gone
            tracing::warn!(chunk_id = %chunk_id, "Dangling chunk pointer");
            return Ok(None);
        };
        let record = decode_record(&index_key, &value)?;
        Ok(Some((index_key, record)))
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = self.last_created.lock();
        let mut now = Utc::now();
        if now <= *last {
            now = *last + Duration::nanoseconds(1);
        }
        *last = now;
        now
    }
}

fn chunk_key(chunk_id: &ChunkId) -> Vec<u8> {
    let mut key = CHUNK_PREFIX.to_vec();
    key.extend_from_slice(chunk_id.to_string().as_bytes());
    key
}

/// `agent:{len}:{id}:`; no partition prefix is a prefix of another
fn partition_prefix(agent: &AgentId) -> Vec<u8> {
    let id = agent.as_str().as_bytes();
    let mut prefix = AGENT_PREFIX.to_vec();
    prefix.extend_from_slice(id.len().to_string().as_bytes());
    prefix.push(FIELD_SEPARATOR);
    prefix.extend_from_slice(id);
    prefix.push(FIELD_SEPARATOR);
    prefix
}

/// Agent id of a partition index key and the length of its partition prefix
fn parse_partition(key: &[u8]) -> Result<(&str, usize), StoreError> {
    let rest = key
        .strip_prefix(AGENT_PREFIX)
        .ok_or_else(|| StoreError::corrupt_key(key))?;
    let digits = rest
        .iter()
        .position(|b| *b == FIELD_SEPARATOR)
        .ok_or_else(|| StoreError::corrupt_key(key))?;
    let id_len: usize = std::str::from_utf8(&rest[..digits])
        .ok()
        .and_then(|d| d.parse().ok())
        .ok_or_else(|| StoreError::corrupt_key(key))?;

    let id_start = AGENT_PREFIX.len() + digits + 1;
    let id_end = id_start + id_len;
    if key.get(id_end) != Some(&FIELD_SEPARATOR) {
        return Err(StoreError::corrupt_key(key));
    }
    let id = std::str::from_utf8(&key[id_start..id_end]).map_err(|_| StoreError::corrupt_key(key))?;
    Ok((id, id_end + 1))
}

fn index_key(agent: &AgentId, chunk_id: &ChunkId, created_at: DateTime<Utc>) -> Vec<u8> {
    let nanos = created_at.timestamp_nanos_opt().unwrap_or(i64::MAX).max(0);
    let inverted = (i64::MAX - nanos) as u64;
    let mut key = partition_prefix(agent);
    key.extend_from_slice(format!("{inverted:020}:{chunk_id}").as_bytes());
    key
}

fn chunk_id_from_index_key(key: &[u8]) -> Result<ChunkId, StoreError> {
    let text = std::str::from_utf8(key).map_err(|_| StoreError::corrupt_key(key))?;
    let id = text.rsplit(':').next().ok_or_else(|| StoreError::corrupt_key(key))?;
    ChunkId::parse(id).map_err(|_| StoreError::corrupt_key(key))
}

fn decode_record(key: &[u8], value: &[u8]) -> Result<ChunkRecord, StoreError> {
    bincode::serde::decode_from_slice::<ChunkRecord, _>(value, bincode::config::standard())
        .map(|(record, _)| record)
        .map_err(|e| StoreError::Decode {
            key: String::from_utf8_lossy(key).into_owned(),
            reason: e.to_string(),
        })
}
