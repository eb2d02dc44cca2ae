//! HTTP API Handlers
//!
//! Admin API over the knowledge store: list, delete, clear, ingest, plus an
//! SSE feed of mutations and the usual health/metrics endpoints.

// Core modules
pub mod router;
pub mod state;
pub mod types;

// Health and metrics
pub mod health;

// Knowledge operations
pub mod events;
pub mod ingest;
pub mod knowledge;

// Test utilities (compiled only in test builds)
#[cfg(test)]
pub mod test_helpers;

// Re-export commonly used items
pub use router::{build_protected_routes, build_public_routes, build_router, AppState};
pub use state::KnowledgeService;
pub use types::*;
