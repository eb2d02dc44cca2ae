//! Structured API errors with machine-readable codes
//!
//! Nothing crosses the HTTP boundary as a panic or a bare string: every
//! handler failure becomes an `ErrorResponse` with a stable code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::knowledge::{IngestError, StoreError};

/// Structured error response for API clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional error context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application error types with proper categorization
#[derive(Debug)]
pub enum AppError {
    // Validation Errors (400)
    InvalidInput { field: String, reason: String },
    InvalidAgentId(String),
    InvalidChunkId(String),
    ContentTooLarge { size: usize, max: usize },
    MissingTarget,

    // Not Found Errors (404)
    ChunkNotFound(String),

    // Internal Errors (500)
    StorageError(String),
    SerializationError(String),

    // Service Errors (503)
    ServiceUnavailable(String),

    // Generic wrapper for external errors
    Internal(anyhow::Error),
}

impl AppError {
    /// Shorthand for a missing required query/body field
    pub fn missing(field: &str) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            reason: format!("Missing {field}"),
        }
    }

    /// Get error code for client identification
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::InvalidAgentId(_) => "INVALID_AGENT_ID",
            Self::InvalidChunkId(_) => "INVALID_CHUNK_ID",
            Self::ContentTooLarge { .. } => "CONTENT_TOO_LARGE",
            Self::MissingTarget => "MISSING_TARGET",
            Self::ChunkNotFound(_) => "CHUNK_NOT_FOUND",
            Self::StorageError(_) => "STORAGE_ERROR",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. }
            | Self::InvalidAgentId(_)
            | Self::InvalidChunkId(_)
            | Self::ContentTooLarge { .. }
            | Self::MissingTarget => StatusCode::BAD_REQUEST,

            Self::ChunkNotFound(_) => StatusCode::NOT_FOUND,

            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            Self::StorageError(_) | Self::SerializationError(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get detailed error message
    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput { reason, .. } => reason.clone(),
            Self::InvalidAgentId(msg) => format!("Invalid agentId: {msg}"),
            Self::InvalidChunkId(msg) => format!("Invalid chunk id: {msg}"),
            Self::ContentTooLarge { size, max } => {
                format!("Content too large: {size} bytes (max: {max} bytes)")
            }
            Self::MissingTarget => "Provide either id or agentId".to_string(),
            Self::ChunkNotFound(id) => format!("Chunk not found: {id}"),
            Self::StorageError(msg) => format!("Storage error: {msg}"),
            Self::SerializationError(msg) => format!("Serialization error: {msg}"),
            Self::ServiceUnavailable(msg) => format!("Service unavailable: {msg}"),
            Self::Internal(err) => format!("Internal error: {err}"),
        }
    }

    /// Convert to structured error response
    pub fn to_response(&self) -> ErrorResponse {
        let details = match self {
            Self::InvalidInput { field, .. } => Some(format!("field: {field}")),
            _ => None,
        };
        ErrorResponse {
            code: self.code().to_string(),
            message: self.message(),
            details,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Encode(_) | StoreError::Decode { .. } => {
                Self::SerializationError(err.to_string())
            }
            _ => Self::StorageError(err.to_string()),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::EmptyText => Self::InvalidInput {
                field: "text".to_string(),
                reason: "text cannot be empty".to_string(),
            },
            IngestError::TooLarge { size, max } => Self::ContentTooLarge { size, max },
            IngestError::Store(e) => e.into(),
        }
    }
}

/// Axum IntoResponse implementation for proper HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self.message());
        } else {
            tracing::debug!(code = self.code(), "{}", self.message());
        }
        let body = self.to_response();

        (status, Json(body)).into_response()
    }
}

/// Helper trait to convert validation errors
pub trait ValidationErrorExt<T> {
    fn map_validation_err(self, field: &str) -> Result<T>;
}

impl<T> ValidationErrorExt<T> for anyhow::Result<T> {
    fn map_validation_err(self, field: &str) -> Result<T> {
        self.map_err(|e| AppError::InvalidInput {
            field: field.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;
