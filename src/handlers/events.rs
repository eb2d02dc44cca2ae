//! Server-sent knowledge events

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use super::router::AppState;
use super::types::ListQuery;
use crate::knowledge::AgentId;
use crate::metrics::EVENT_SUBSCRIBERS;
use crate::validation::{self, non_empty};

/// Decrements the subscriber gauge when the stream is dropped
struct SubscriberGuard;

impl SubscriberGuard {
    fn new() -> Self {
        EVENT_SUBSCRIBERS.inc();
        Self
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        EVENT_SUBSCRIBERS.dec();
    }
}

/// GET /api/admin/knowledge/events?agentId= - SSE stream of mutations of
/// one agent's knowledge. Without a valid agentId the stream stays silent.
pub async fn knowledge_events_sse(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let filter: Option<AgentId> = non_empty(query.agent_id)
        .and_then(|raw| validation::validate_agent_id(&raw).ok());
    let receiver = state.subscribe_events();
    let guard = SubscriberGuard::new();

    let stream = BroadcastStream::new(receiver).filter_map(move |result| {
        let filter = filter.clone();
        let _alive = &guard;
        let item = match result {
            Ok(event) => match filter {
                Some(agent) if event.agent_id == agent => serde_json::to_string(&event)
                    .ok()
                    .map(|json| Ok(Event::default().event(event.event_type.as_str()).data(json))),
                // No agentId: drop everything
                _ => None,
            },
            Err(e) => {
                tracing::debug!(error = %e, "Knowledge event subscriber lagged");
                None
            }
        };
        futures::future::ready(item)
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("heartbeat"),
    )
}
