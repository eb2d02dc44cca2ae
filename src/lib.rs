//! Agent Knowledge Store
//!
//! Per-agent knowledge for a retrieval-augmented assistant: text is ingested
//! into chunks owned by one agent, and admin surfaces list, delete and clear
//! them while staying in sync with each other.
//!
//! # Layout
//! - `knowledge`: RocksDB-backed, agent-partitioned chunk store and ingestion
//! - `handlers`: axum admin API and SSE event feed
//! - `client`: reqwest client for that API
//! - `panel`: display component and ingestion surface
//! - `identity`: agent identity providers

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod identity;
pub mod knowledge;
pub mod metrics;
pub mod middleware;
pub mod panel;
pub mod tracing_setup;
pub mod validation;

// Re-export dependencies to ensure tests/benchmarks use the same version
pub use chrono;
pub use uuid;
