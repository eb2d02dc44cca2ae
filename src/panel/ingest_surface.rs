//! Ingestion surface: a text draft plus a submit action
//!
//! Panels that should follow ingestions register their `RefreshHandle`;
//! after every successful submit each registered handle is signalled once.

use std::fmt;
use std::sync::Arc;

use super::knowledge_panel::RefreshHandle;
use super::source::IngestClient;
use crate::knowledge::AgentId;

/// Outcome of the last submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStatus {
    Ingested(usize),
    Failed(String),
}

impl IngestStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingested(n) => write!(f, "Ingested {n} chunks successfully"),
            Self::Failed(msg) => f.write_str(msg),
        }
    }
}

pub struct IngestSurface<I> {
    client: Arc<I>,
    agent: AgentId,
    draft: String,
    submitting: bool,
    status: Option<IngestStatus>,
    observers: Vec<RefreshHandle>,
}

impl<I: IngestClient> IngestSurface<I> {
    pub fn new(client: Arc<I>, agent: AgentId) -> Self {
        Self {
            client,
            agent,
            draft: String::new(),
            submitting: false,
            status: None,
            observers: Vec::new(),
        }
    }

    /// Register a panel to re-fetch after each successful ingestion
    pub fn register(&mut self, handle: RefreshHandle) {
        self.observers.push(handle);
    }

    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    pub fn set_agent(&mut self, agent: AgentId) {
        self.agent = agent;
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn status(&self) -> Option<&IngestStatus> {
        self.status.as_ref()
    }

    /// Ingest the draft.
    ///
    /// A blank draft makes no call. On success the draft is cleared and every
    /// registered panel is signalled; on failure the draft is kept and no
    /// panel is signalled. Returns the number of chunks created.
    pub async fn submit(&mut self) -> Option<usize> {
        if self.draft.trim().is_empty() || self.submitting {
            return None;
        }

        self.submitting = true;
        self.status = None;

        let result = self.client.ingest(&self.agent, &self.draft).await;
        self.submitting = false;

        match result {
            Ok(chunks) => {
                self.status = Some(IngestStatus::Ingested(chunks));
                self.draft.clear();
                // Drop handles of panels that are gone
                self.observers.retain(RefreshHandle::refresh);
                Some(chunks)
            }
            Err(e) => {
                tracing::warn!(agent_id = %self.agent, error = %e, "Ingestion failed");
                self.status = Some(IngestStatus::Failed(e.user_message()));
                None
            }
        }
    }
}
