//! Storage-level tests: agent partition isolation, ordering, atomic clear
//! and persistence across reopen.
//!
//! Run with: `cargo test --test store_isolation_tests`

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use agent_knowledge::knowledge::{
    AgentId, ChunkConfig, ChunkId, ChunkingIngestor, DeleteOutcome, IngestError, Ingestor,
    KnowledgeStore,
};

fn open_store() -> (Arc<KnowledgeStore>, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let store = KnowledgeStore::open(dir.path()).expect("open store");
    (Arc::new(store), dir)
}

fn texts(contents: &[&str]) -> Vec<String> {
    contents.iter().map(|s| s.to_string()).collect()
}

#[test]
fn partitions_never_leak() {
    let (store, _dir) = open_store();
    let a = AgentId::new("agent-a");
    let b = AgentId::new("agent-b");
    // Prefix of another agent id must not match
    let prefix = AgentId::new("agent");

    store.insert_chunks(&a, &texts(&["a1", "a2"])).unwrap();
    store.insert_chunks(&b, &texts(&["b1"])).unwrap();

    assert!(store.list(&a).unwrap().iter().all(|c| c.agent_id == a));
    assert!(store.list(&b).unwrap().iter().all(|c| c.agent_id == b));
    assert_eq!(store.list(&a).unwrap().len(), 2);
    assert!(store.list(&prefix).unwrap().is_empty());
}

#[test]
fn list_is_newest_first_within_a_batch() {
    let (store, _dir) = open_store();
    let a = AgentId::new("a");

    store.insert_chunks(&a, &texts(&["1", "2", "3"])).unwrap();
    store.insert_chunks(&a, &texts(&["4"])).unwrap();

    let listed: Vec<String> = store.list(&a).unwrap().into_iter().map(|c| c.content).collect();
    assert_eq!(listed, vec!["4", "3", "2", "1"]);

    let items = store.list(&a).unwrap();
    assert!(items.windows(2).all(|w| w[0].created_at > w[1].created_at));
}

#[test]
fn clear_removes_only_one_partition() {
    let (store, _dir) = open_store();
    let a = AgentId::new("a");
    let b = AgentId::new("b");
    let a_chunks = store.insert_chunks(&a, &texts(&["a1", "a2", "a3"])).unwrap();
    store.insert_chunks(&b, &texts(&["b1", "b2"])).unwrap();

    assert_eq!(store.clear_all(&a).unwrap(), 3);
    assert!(store.list(&a).unwrap().is_empty());
    assert_eq!(store.count(&b).unwrap(), 2);

    // Secondary index entries went with the partition
    for chunk in &a_chunks {
        assert!(store.get(&chunk.id).unwrap().is_none());
    }

    assert_eq!(store.clear_all(&a).unwrap(), 0);
}

#[test]
fn delete_is_idempotent_and_owner_checked() {
    let (store, _dir) = open_store();
    let a = AgentId::new("a");
    let b = AgentId::new("b");
    let chunk = store.insert_chunks(&a, &texts(&["only"])).unwrap().remove(0);

    assert_eq!(
        store.delete_one(&chunk.id, Some(&b)).unwrap(),
        DeleteOutcome::NotFound
    );
    assert_eq!(store.count(&a).unwrap(), 1);

    assert_eq!(
        store.delete_one(&chunk.id, Some(&a)).unwrap(),
        DeleteOutcome::Deleted
    );
    assert_eq!(
        store.delete_one(&chunk.id, Some(&a)).unwrap(),
        DeleteOutcome::NotFound
    );
    assert_eq!(
        store.delete_one(&ChunkId::new(), None).unwrap(),
        DeleteOutcome::NotFound
    );
}

#[test]
fn concurrent_ingestion_into_separate_agents() {
    let (store, _dir) = open_store();
    let per_thread = 50;

    let handles: Vec<_> = ["x", "y", "z"]
        .into_iter()
        .map(|name| {
            let store = store.clone();
            thread::spawn(move || {
                let agent = AgentId::new(name);
                for i in 0..per_thread {
                    store
                        .insert_chunks(&agent, &[format!("{name}-{i}")])
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for name in ["x", "y", "z"] {
        let agent = AgentId::new(name);
        let items = store.list(&agent).unwrap();
        assert_eq!(items.len(), per_thread);
        assert!(items.iter().all(|c| c.content.starts_with(name)));
        assert_eq!(items[0].content, format!("{name}-{}", per_thread - 1));
    }

    let mut agents = store.list_agents().unwrap();
    agents.sort();
    assert_eq!(
        agents,
        vec![AgentId::new("x"), AgentId::new("y"), AgentId::new("z")]
    );
}

#[test]
fn concurrent_clear_and_insert_leave_a_consistent_partition() {
    let (store, _dir) = open_store();
    let a = AgentId::new("a");
    store.insert_chunks(&a, &texts(&["seed"; 20])).unwrap();

    let writer = {
        let store = store.clone();
        let a = a.clone();
        thread::spawn(move || {
            for i in 0..20 {
                store.insert_chunks(&a, &[format!("late-{i}")]).unwrap();
            }
        })
    };
    let cleared = store.clear_all(&a).unwrap();
    writer.join().unwrap();

    // A clear is all-or-nothing relative to each insert batch
    let remaining = store.count(&a).unwrap();
    assert_eq!(cleared + remaining, 40);
    assert!(store.list(&a).unwrap().iter().all(|c| c.content.starts_with("late-")));
}

#[test]
fn concurrent_clear_and_delete_agree_on_one_chunk() {
    let (store, _dir) = open_store();
    let a = AgentId::new("a");
    let seeded = 5;

    for _ in 0..200 {
        let chunks = store.insert_chunks(&a, &texts(&["c"; 5])).unwrap();
        let target = chunks[2].id;

        let deleter = {
            let store = store.clone();
            let a = a.clone();
            thread::spawn(move || store.delete_one(&target, Some(&a)).unwrap())
        };
        let cleared = store.clear_all(&a).unwrap();
        let deleted = deleter.join().unwrap().deleted_count();

        // Exactly one of the two removed the target
        assert_eq!(cleared + deleted, seeded);
        assert!(store.get(&target).unwrap().is_none());
        assert_eq!(store.count(&a).unwrap(), 0);
    }
}

#[test]
fn data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let a = AgentId::new("a");

    let id = {
        let store = KnowledgeStore::open(dir.path()).unwrap();
        let chunk = store.insert_chunks(&a, &texts(&["persisted"])).unwrap().remove(0);
        store.flush().unwrap();
        chunk.id
    };

    let store = KnowledgeStore::open(dir.path()).unwrap();
    let chunk = store.get(&id).unwrap().expect("chunk after reopen");
    assert_eq!(chunk.content, "persisted");
    assert_eq!(chunk.agent_id, a);
}

#[test]
fn ingestor_splits_and_validates() {
    let (store, _dir) = open_store();
    let ingestor = ChunkingIngestor::new(store.clone(), ChunkConfig::new(20, 5), 1_000);
    let a = AgentId::new("a");

    let text = "The quick brown fox jumps over the lazy dog. ".repeat(4);
    let chunks = ingestor.ingest(&a, &text).unwrap();
    assert!(chunks.len() > 1);
    assert_eq!(store.count(&a).unwrap(), chunks.len());
    // The last returned chunk is the newest
    assert_eq!(store.list(&a).unwrap()[0].id, chunks.last().unwrap().id);

    assert!(matches!(
        ingestor.ingest(&a, "  \n\t "),
        Err(IngestError::EmptyText)
    ));
    assert!(matches!(
        ingestor.ingest(&a, &"x".repeat(1_001)),
        Err(IngestError::TooLarge { size: 1_001, max: 1_000 })
    ));
    assert_eq!(store.count(&a).unwrap(), chunks.len());
}
