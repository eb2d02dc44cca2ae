use agent_knowledge::client::HttpKnowledgeClient;
use agent_knowledge::handlers::{KnowledgeEvent, KnowledgeEventType};
use agent_knowledge::knowledge::AgentId;
use agent_knowledge::panel::{PanelView, RefreshHandle};
use futures_util::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

/// Follows the server's knowledge event feed and re-syncs the panel on
/// mutations of the active agent. This is the panel's only refresh source.
pub struct KnowledgeStream {
    client: Arc<HttpKnowledgeClient>,
    agent: AgentId,
    refresh: RefreshHandle,
    view: watch::Receiver<PanelView>,
    connected: Arc<AtomicBool>,
}

impl KnowledgeStream {
    pub fn new(
        client: Arc<HttpKnowledgeClient>,
        agent: AgentId,
        refresh: RefreshHandle,
        view: watch::Receiver<PanelView>,
        connected: Arc<AtomicBool>,
    ) -> Self {
        Self {
            client,
            agent,
            refresh,
            view,
            connected,
        }
    }

    /// Runs until the panel is unmounted
    pub async fn run(&self) {
        loop {
            let panel_alive = self.connect().await.unwrap_or(true);
            self.connected.store(false, Ordering::Relaxed);
            if !panel_alive {
                return;
            }
            sleep(Duration::from_secs(3)).await;
            // Catch up on anything missed while disconnected
            if !self.refresh.refresh() {
                return;
            }
        }
    }

    /// `Ok(false)` once the panel is gone
    async fn connect(&self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut es = EventSource::new(self.client.events_request(&self.agent))?;
        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => self.connected.store(true, Ordering::Relaxed),
                Ok(Event::Message(msg)) => {
                    let Ok(event) = serde_json::from_str::<KnowledgeEvent>(&msg.data) else {
                        continue;
                    };
                    let stale = event.agent_id == self.agent
                        && needs_refresh(&event, &self.view.borrow());
                    if stale && !self.refresh.refresh() {
                        es.close();
                        return Ok(false);
                    }
                }
                Err(_) => {
                    es.close();
                    break;
                }
            }
        }
        Ok(true)
    }
}

/// Whether `event` describes a change the panel does not show yet.
///
/// Deletes and clears made by this panel are already applied locally, so
/// their echoes are skipped and the optimistic view is left alone.
fn needs_refresh(event: &KnowledgeEvent, view: &PanelView) -> bool {
    match event.event_type {
        KnowledgeEventType::Ingest => true,
        KnowledgeEventType::Delete => event
            .chunk_id
            .is_none_or(|id| view.items.iter().any(|c| c.id == id)),
        KnowledgeEventType::Clear => !view.items.is_empty(),
    }
}
