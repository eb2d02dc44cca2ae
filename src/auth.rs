//! API key authentication for the admin routes

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// API Key authentication errors
#[derive(Debug)]
pub enum AuthError {
    MissingApiKey,
    InvalidApiKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingApiKey => "Missing X-API-Key header",
            AuthError::InvalidApiKey => "Invalid API key",
        };

        (StatusCode::UNAUTHORIZED, message).into_response()
    }
}

/// Accepted API keys. An empty set disables authentication.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys(Arc<Vec<String>>);

impl ApiKeys {
    pub fn new(keys: Vec<String>) -> Self {
        Self(Arc::new(keys))
    }

    pub fn is_enabled(&self) -> bool {
        !self.0.is_empty()
    }

    /// Validate a provided key against every configured key in constant time
    pub fn validate(&self, provided_key: &str) -> Result<(), AuthError> {
        // No early exit: every key is compared
        let found = self
            .0
            .iter()
            .fold(false, |found, key| constant_time_compare(key, provided_key) | found);

        if found {
            Ok(())
        } else {
            Err(AuthError::InvalidApiKey)
        }
    }
}

/// Constant-time string comparison to prevent timing attacks.
///
/// Leaks only the length of the shorter input.
fn constant_time_compare(a: &str, b: &str) -> bool {
    let mut result = u8::from(a.len() != b.len());
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Authentication middleware, installed with `from_fn_with_state`
pub async fn auth_middleware(
    State(keys): State<ApiKeys>,
    request: Request,
    next: Next,
) -> Response {
    if !keys.is_enabled() {
        return next.run(request).await;
    }

    let Some(provided) = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        return AuthError::MissingApiKey.into_response();
    };

    if let Err(e) = keys.validate(provided) {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid API key");
        return e.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_api_key() {
        let keys = ApiKeys::new(vec!["key1".to_string(), "key2".to_string()]);

        assert!(keys.validate("key1").is_ok());
        assert!(keys.validate("key2").is_ok());
        assert!(keys.validate("key").is_err());
        assert!(keys.validate("key11").is_err());
        assert!(keys.validate("").is_err());
    }

    #[test]
    fn test_empty_keys_disable_auth() {
        assert!(!ApiKeys::default().is_enabled());
        assert!(ApiKeys::new(vec!["k".to_string()]).is_enabled());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
