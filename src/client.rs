//! HTTP client for the admin API
//!
//! Implements the surface-side traits so panels and ingest surfaces can run
//! against a remote server.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::auth::API_KEY_HEADER;
use crate::errors::ErrorResponse;
use crate::handlers::types::{DeleteResponse, IngestRequest, IngestResponse, ListResponse};
use crate::knowledge::{AgentId, ChunkId, KnowledgeChunk};
use crate::panel::{IngestClient, KnowledgeSource, SourceError};

const KNOWLEDGE_PATH: &str = "/api/admin/knowledge";
const EVENTS_PATH: &str = "/api/admin/knowledge/events";
const INGEST_PATH: &str = "/api/admin/ingest";

#[derive(Debug, Clone)]
pub struct HttpKnowledgeClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpKnowledgeClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3040`
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self::with_client(base_url, api_key, Client::new())
    }

    pub fn with_client(base_url: &str, api_key: Option<String>, client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request for the SSE event feed of `agent`, ready for an event source
    pub fn events_request(&self, agent: &AgentId) -> RequestBuilder {
        self.request(Method::GET, EVENTS_PATH)
            .query(&[("agentId", agent.as_str())])
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, SourceError> {
        let response = builder
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        decode(response).await
    }
}

/// Decode a success body, or turn an error body into a `SourceError`
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SourceError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            }
        });

    if status.is_client_error() {
        Err(SourceError::Validation(message))
    } else {
        Err(SourceError::Store(message))
    }
}

impl KnowledgeSource for HttpKnowledgeClient {
    async fn list(&self, agent: &AgentId) -> Result<Vec<KnowledgeChunk>, SourceError> {
        let builder = self
            .request(Method::GET, KNOWLEDGE_PATH)
            .query(&[("agentId", agent.as_str())]);
        let response: ListResponse = self.send(builder).await?;
        Ok(response.items)
    }

    async fn delete_one(&self, chunk_id: ChunkId, agent: &AgentId) -> Result<usize, SourceError> {
        let id = chunk_id.to_string();
        let builder = self
            .request(Method::DELETE, KNOWLEDGE_PATH)
            .query(&[("id", id.as_str()), ("agentId", agent.as_str())]);
        let response: DeleteResponse = self.send(builder).await?;
        Ok(response.deleted)
    }

    async fn clear_all(&self, agent: &AgentId) -> Result<usize, SourceError> {
        let builder = self
            .request(Method::DELETE, KNOWLEDGE_PATH)
            .query(&[("agentId", agent.as_str())]);
        let response: DeleteResponse = self.send(builder).await?;
        Ok(response.deleted)
    }
}

impl IngestClient for HttpKnowledgeClient {
    async fn ingest(&self, agent: &AgentId, text: &str) -> Result<usize, SourceError> {
        let builder = self.request(Method::POST, INGEST_PATH).json(&IngestRequest {
            text: text.to_string(),
            agent_id: agent.as_str().to_string(),
        });
        let response: IngestResponse = self.send(builder).await?;
        Ok(response.chunks)
    }
}
