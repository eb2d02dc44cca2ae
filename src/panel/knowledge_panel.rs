//! Knowledge display component
//!
//! A `KnowledgePanel` is an actor task that owns the local list of chunks for
//! one agent. Renderers observe its `PanelView` through a `watch` receiver;
//! commands arrive over a channel and are applied strictly in order, each
//! awaiting its store call before the next one starts.
//!
//! Other surfaces that mutate the store keep the panel in sync by signalling
//! a [`RefreshHandle`]; every delivered signal causes exactly one re-fetch.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use super::confirm::{ConfirmPrompt, Confirmation};
use super::source::KnowledgeSource;
use crate::knowledge::{AgentId, ChunkId, KnowledgeChunk};

/// Advisory outcome of the last panel operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStatus {
    LoadFailed,
    ChunkDeleted,
    DeleteFailed,
    Cleared,
    ClearFailed,
}

impl PanelStatus {
    pub fn message(self) -> &'static str {
        match self {
            Self::LoadFailed => "Failed to load knowledge",
            Self::ChunkDeleted => "Chunk deleted",
            Self::DeleteFailed => "Failed to delete chunk",
            Self::Cleared => "All knowledge cleared",
            Self::ClearFailed => "Failed to clear knowledge",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Self::LoadFailed | Self::DeleteFailed | Self::ClearFailed)
    }
}

impl fmt::Display for PanelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// What a renderer draws
#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub agent: AgentId,
    /// Newest first, exactly as the store returned them
    pub items: Vec<KnowledgeChunk>,
    pub loading: bool,
    pub clearing: bool,
    pub status: Option<PanelStatus>,
}

impl PanelView {
    fn empty(agent: AgentId) -> Self {
        Self {
            agent,
            items: Vec::new(),
            loading: false,
            clearing: false,
            status: None,
        }
    }

    /// Whether the clear-all control is enabled
    pub fn can_clear(&self) -> bool {
        !self.items.is_empty() && !self.clearing
    }
}

#[derive(Debug)]
enum Command {
    Refresh,
    SetAgent(AgentId),
    Delete(ChunkId),
    ClearAll,
    Unmount,
}

struct Envelope {
    command: Command,
    done: Option<oneshot::Sender<()>>,
}

/// Cloneable re-synchronization handle for a mounted panel.
///
/// Holds no strong reference: once every `PanelHandle` is gone the panel
/// stops and `refresh()` returns `false`.
#[derive(Clone)]
pub struct RefreshHandle {
    tx: mpsc::WeakUnboundedSender<Envelope>,
}

impl RefreshHandle {
    /// Ask the panel to re-fetch its list; `false` if it is no longer mounted
    pub fn refresh(&self) -> bool {
        self.tx.upgrade().is_some_and(|tx| {
            tx.send(Envelope {
                command: Command::Refresh,
                done: None,
            })
            .is_ok()
        })
    }
}

impl fmt::Debug for RefreshHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshHandle").finish_non_exhaustive()
    }
}

/// Control handle of a mounted panel
#[derive(Clone)]
pub struct PanelHandle {
    tx: mpsc::UnboundedSender<Envelope>,
    view: watch::Receiver<PanelView>,
}

impl PanelHandle {
    /// Receiver that observes every view change
    pub fn view(&self) -> watch::Receiver<PanelView> {
        self.view.clone()
    }

    /// Current view
    pub fn snapshot(&self) -> PanelView {
        self.view.borrow().clone()
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle {
            tx: self.tx.downgrade(),
        }
    }

    /// Re-fetch and wait until the result is applied
    pub async fn refresh(&self) -> bool {
        self.call(Command::Refresh).await
    }

    /// Switch to another agent; the list is replaced wholesale
    pub async fn set_agent(&self, agent: AgentId) -> bool {
        self.call(Command::SetAgent(agent)).await
    }

    /// Delete one chunk after confirmation
    pub async fn delete(&self, chunk_id: ChunkId) -> bool {
        self.call(Command::Delete(chunk_id)).await
    }

    /// Clear every chunk of the current agent after confirmation
    pub async fn clear_all(&self) -> bool {
        self.call(Command::ClearAll).await
    }

    /// Queue a delete without waiting for it
    pub fn request_delete(&self, chunk_id: ChunkId) -> bool {
        self.post(Command::Delete(chunk_id), None)
    }

    /// Queue a clear-all without waiting for it
    pub fn request_clear_all(&self) -> bool {
        self.post(Command::ClearAll, None)
    }

    /// Stop the panel after the command currently in flight
    pub fn unmount(&self) {
        self.post(Command::Unmount, None);
    }

    pub fn is_mounted(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Resolves once the panel has stopped
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    async fn call(&self, command: Command) -> bool {
        let (done, ack) = oneshot::channel();
        self.post(command, Some(done)) && ack.await.is_ok()
    }

    fn post(&self, command: Command, done: Option<oneshot::Sender<()>>) -> bool {
        self.tx.send(Envelope { command, done }).is_ok()
    }
}

/// Display component for one agent's knowledge
pub struct KnowledgePanel<S, C> {
    source: Arc<S>,
    confirm: Arc<C>,
    agent: AgentId,
    view: watch::Sender<PanelView>,
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl<S, C> KnowledgePanel<S, C>
where
    S: KnowledgeSource,
    C: Confirmation,
{
    /// Spawn the panel and load `agent`'s knowledge
    pub fn mount(source: Arc<S>, confirm: Arc<C>, agent: AgentId) -> PanelHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (view, view_rx) = watch::channel(PanelView::empty(agent.clone()));

        let panel = Self {
            source,
            confirm,
            agent,
            view,
            rx,
        };
        tokio::spawn(panel.run());

        PanelHandle { tx, view: view_rx }
    }

    async fn run(mut self) {
        tracing::debug!(agent_id = %self.agent, "Knowledge panel mounted");
        self.load().await;

        while let Some(Envelope { command, done }) = self.rx.recv().await {
            match command {
                Command::Refresh => self.load().await,
                Command::SetAgent(agent) => self.switch_agent(agent).await,
                Command::Delete(chunk_id) => self.delete(chunk_id).await,
                Command::ClearAll => self.clear_all().await,
                Command::Unmount => break,
            }
            if let Some(done) = done {
                let _ = done.send(());
            }
        }

        tracing::debug!(agent_id = %self.agent, "Knowledge panel unmounted");
    }

    async fn load(&mut self) {
        self.view.send_modify(|v| {
            v.loading = true;
            v.status = None;
        });

        match self.source.list(&self.agent).await {
            Ok(items) => self.view.send_modify(|v| {
                v.items = items;
                v.loading = false;
            }),
            Err(e) => {
                tracing::warn!(agent_id = %self.agent, error = %e, "Failed to load knowledge");
                self.view.send_modify(|v| {
                    v.loading = false;
                    v.status = Some(PanelStatus::LoadFailed);
                });
            }
        }
    }

    async fn switch_agent(&mut self, agent: AgentId) {
        if agent == self.agent {
            return;
        }
        // Never show one agent's chunks under another agent
        self.agent = agent.clone();
        self.view.send_modify(|v| {
            v.agent = agent;
            v.items.clear();
        });
        self.load().await;
    }

    async fn delete(&mut self, chunk_id: ChunkId) {
        if !self.confirm.confirm(ConfirmPrompt::DeleteChunk).await {
            return;
        }

        match self.source.delete_one(chunk_id, &self.agent).await {
            Ok(deleted) => {
                if deleted == 0 {
                    tracing::debug!(chunk_id = %chunk_id, "Chunk was already gone");
                }
                self.view.send_modify(|v| {
                    v.items.retain(|c| c.id != chunk_id);
                    v.status = Some(PanelStatus::ChunkDeleted);
                });
            }
            Err(e) => {
                tracing::warn!(chunk_id = %chunk_id, error = %e, "Failed to delete chunk");
                self.view
                    .send_modify(|v| v.status = Some(PanelStatus::DeleteFailed));
            }
        }
    }

    async fn clear_all(&mut self) {
        if !self.view.borrow().can_clear() {
            return;
        }
        if !self.confirm.confirm(ConfirmPrompt::ClearAll).await {
            return;
        }

        self.view.send_modify(|v| v.clearing = true);

        let result = self.source.clear_all(&self.agent).await;
        self.view.send_modify(|v| {
            v.clearing = false;
            match &result {
                Ok(_) => {
                    v.items.clear();
                    v.status = Some(PanelStatus::Cleared);
                }
                Err(_) => v.status = Some(PanelStatus::ClearFailed),
            }
        });

        if let Err(e) = result {
            tracing::warn!(agent_id = %self.agent, error = %e, "Failed to clear knowledge");
        }
    }
}
