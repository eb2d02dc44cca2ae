//! Configuration management for the knowledge server
//!
//! Sensible defaults, every parameter overridable through `KB_*` environment
//! variables.

use std::env;
use std::path::PathBuf;
use tracing::info;

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins (empty = allow all)
    pub allowed_origins: Vec<String>,
    /// Allowed HTTP methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Whether to allow credentials
    pub allow_credentials: bool,
    /// Max age for preflight cache (seconds)
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "DELETE".to_string(),
                "OPTIONS".to_string(),
            ],
            allowed_headers: vec![
                "Content-Type".to_string(),
                "X-API-Key".to_string(),
                "X-Request-ID".to_string(),
            ],
            allow_credentials: false,
            max_age_seconds: 86400,
        }
    }
}

impl CorsConfig {
    /// Load from environment variables
    ///
    /// Warns when running in production with no origin restriction.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(origins) = env_list("KB_CORS_ORIGINS") {
            config.allowed_origins = origins;
        }

        if let Some(methods) = env_list("KB_CORS_METHODS") {
            config.allowed_methods = methods.into_iter().map(|m| m.to_uppercase()).collect();
        }

        if let Some(headers) = env_list("KB_CORS_HEADERS") {
            config.allowed_headers = headers;
        }

        if let Some(val) = env_flag("KB_CORS_CREDENTIALS") {
            config.allow_credentials = val;
        }

        if let Some(n) = env_parse("KB_CORS_MAX_AGE") {
            config.max_age_seconds = n;
        }

        if is_production_env() && config.allowed_origins.is_empty() {
            tracing::warn!(
                "PRODUCTION WARNING: CORS allows all origins. Set KB_CORS_ORIGINS to restrict."
            );
        }

        config
    }

    /// Check if any origin restrictions are configured
    pub fn is_restricted(&self) -> bool {
        !self.allowed_origins.is_empty()
    }

    /// Convert to tower-http CorsLayer
    pub fn to_layer(&self) -> tower_http::cors::CorsLayer {
        use tower_http::cors::{AllowOrigin, Any, CorsLayer};

        let mut layer = CorsLayer::new();

        if self.allowed_origins.is_empty() {
            layer = layer.allow_origin(Any);
        } else {
            let (valid, invalid): (Vec<_>, Vec<_>) = self
                .allowed_origins
                .iter()
                .map(|o| (o, o.parse::<axum::http::HeaderValue>()))
                .partition(|(_, parsed)| parsed.is_ok());

            for (origin, _) in &invalid {
                tracing::warn!("CORS: Invalid origin '{}' - skipping", origin);
            }

            let origins: Vec<axum::http::HeaderValue> =
                valid.into_iter().filter_map(|(_, parsed)| parsed.ok()).collect();

            if origins.is_empty() {
                // Misconfigured origins must not fall back to permissive
                tracing::error!(
                    "CORS: All {} configured origin(s) failed to parse. \
                     Rejecting all cross-origin requests. Fix KB_CORS_ORIGINS.",
                    self.allowed_origins.len()
                );
            }
            layer = layer.allow_origin(AllowOrigin::list(origins));
        }

        let methods: Vec<axum::http::Method> = self
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect();
        layer = if methods.is_empty() {
            layer.allow_methods(Any)
        } else {
            layer.allow_methods(methods)
        };

        let headers: Vec<axum::http::HeaderName> = self
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        layer = if headers.is_empty() {
            layer.allow_headers(Any)
        } else {
            layer.allow_headers(headers)
        };

        if self.allow_credentials {
            layer = layer.allow_credentials(true);
        }

        layer.max_age(std::time::Duration::from_secs(self.max_age_seconds))
    }
}

/// Server configuration loaded from environment with defaults
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: 127.0.0.1)
    pub host: String,

    /// Server port (default: 3040)
    pub port: u16,

    /// Storage path for RocksDB (default: ./knowledge_data)
    pub storage_path: PathBuf,

    /// Whether running in production mode
    pub is_production: bool,

    /// Accepted API keys; empty disables authentication (dev only)
    pub api_keys: Vec<String>,

    /// Reject single-chunk deletes that carry no owning agentId
    pub strict_ownership: bool,

    /// Maximum ingest text size in bytes (default: 1 MiB)
    pub max_text_length: usize,

    /// Target chunk size in bytes (default: 800)
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in bytes (default: 200)
    pub chunk_overlap: usize,

    /// Rate limit: requests per second, 0 disables (default: 500)
    pub rate_limit_per_second: u64,

    /// Rate limit: burst size (default: 1000)
    pub rate_limit_burst: u32,

    /// Maximum concurrent requests (default: 200)
    pub max_concurrent_requests: usize,

    /// Request timeout in seconds (default: 60)
    pub request_timeout_secs: u64,

    /// Capacity of the knowledge event broadcast channel (default: 256)
    pub event_buffer: usize,

    /// CORS configuration
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3040,
            storage_path: PathBuf::from("./knowledge_data"),
            is_production: false,
            api_keys: Vec::new(),
            strict_ownership: false,
            max_text_length: 1024 * 1024,
            chunk_size: 800,
            chunk_overlap: 200,
            rate_limit_per_second: 500,
            rate_limit_burst: 1000,
            max_concurrent_requests: 200,
            request_timeout_secs: 60,
            event_buffer: 256,
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    #[allow(clippy::field_reassign_with_default)]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.is_production = is_production_env();

        if let Ok(val) = env::var("KB_HOST") {
            config.host = val;
        }

        if let Some(port) = env_parse("KB_PORT") {
            config.port = port;
        }

        if let Ok(val) = env::var("KB_STORAGE_PATH") {
            config.storage_path = PathBuf::from(val);
        }

        if let Some(keys) = env_list("KB_API_KEYS") {
            config.api_keys = keys;
        }

        if let Some(val) = env_flag("KB_STRICT_OWNERSHIP") {
            config.strict_ownership = val;
        }

        if let Some(n) = env_parse::<usize>("KB_MAX_TEXT_LENGTH") {
            config.max_text_length = n.max(1);
        }

        if let Some(n) = env_parse("KB_CHUNK_SIZE") {
            config.chunk_size = n;
        }

        if let Some(n) = env_parse("KB_CHUNK_OVERLAP") {
            config.chunk_overlap = n;
        }

        if let Some(n) = env_parse("KB_RATE_LIMIT") {
            config.rate_limit_per_second = n;
        }

        if let Some(n) = env_parse("KB_RATE_BURST") {
            config.rate_limit_burst = n;
        }

        if let Some(n) = env_parse("KB_MAX_CONCURRENT") {
            config.max_concurrent_requests = n;
        }

        if let Some(n) = env_parse("KB_REQUEST_TIMEOUT") {
            config.request_timeout_secs = n;
        }

        if let Some(n) = env_parse::<usize>("KB_EVENT_BUFFER") {
            config.event_buffer = n.max(1);
        }

        config.cors = CorsConfig::from_env();

        if config.is_production && config.api_keys.is_empty() {
            tracing::warn!("PRODUCTION WARNING: no KB_API_KEYS set, admin routes are open");
        }

        config
    }

    /// Whether protected routes require an API key
    pub fn auth_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    /// Log the current configuration
    pub fn log(&self) {
        info!("Configuration:");
        info!(
            "   Mode: {}",
            if self.is_production {
                "PRODUCTION"
            } else {
                "Development"
            }
        );
        info!("   Bind: {}:{}", self.host, self.port);
        info!("   Storage: {:?}", self.storage_path);
        info!(
            "   Auth: {}",
            if self.auth_enabled() {
                "API key required"
            } else {
                "disabled"
            }
        );
        info!("   Strict ownership: {}", self.strict_ownership);
        info!(
            "   Chunking: {} bytes (overlap {}), max text {} bytes",
            self.chunk_size, self.chunk_overlap, self.max_text_length
        );
        if self.rate_limit_per_second > 0 {
            info!(
                "   Rate limit: {} req/sec (burst: {})",
                self.rate_limit_per_second, self.rate_limit_burst
            );
        } else {
            info!("   Rate limit: disabled");
        }
        info!("   Max concurrent: {}", self.max_concurrent_requests);
        info!("   Request timeout: {}s", self.request_timeout_secs);
        if self.cors.is_restricted() {
            info!("   CORS origins: {:?}", self.cors.allowed_origins);
        } else {
            info!("   CORS: Permissive (all origins allowed)");
        }
    }
}

fn is_production_env() -> bool {
    env::var("KB_ENV")
        .map(|v| {
            let v = v.to_lowercase();
            v == "production" || v == "prod"
        })
        .unwrap_or(false)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let val = env::var(key).ok()?;
    match val.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("Ignoring unparseable {}={}", key, val);
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_list(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().map(|v| {
        v.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

/// Environment variable documentation
pub fn print_env_help() {
    println!("Agent Knowledge Server Configuration Environment Variables:");
    println!();
    println!("  KB_ENV                 - Set to 'production' or 'prod' for production mode");
    println!("  KB_HOST                - Bind address (default: 127.0.0.1)");
    println!("  KB_PORT                - Server port (default: 3040)");
    println!("  KB_STORAGE_PATH        - Storage directory (default: ./knowledge_data)");
    println!("  KB_API_KEYS            - Comma-separated API keys (unset = no auth)");
    println!("  KB_STRICT_OWNERSHIP    - Require agentId on single-chunk delete (default: false)");
    println!("  KB_MAX_TEXT_LENGTH     - Max ingest text bytes (default: 1048576)");
    println!("  KB_CHUNK_SIZE          - Chunk size in bytes (default: 800)");
    println!("  KB_CHUNK_OVERLAP       - Chunk overlap in bytes (default: 200)");
    println!("  KB_RATE_LIMIT          - Requests per second, 0 disables (default: 500)");
    println!("  KB_RATE_BURST          - Burst size (default: 1000)");
    println!("  KB_MAX_CONCURRENT      - Max concurrent requests (default: 200)");
    println!("  KB_REQUEST_TIMEOUT     - Request timeout in seconds (default: 60)");
    println!("  KB_EVENT_BUFFER        - Knowledge event channel capacity (default: 256)");
    println!();
    println!("CORS Configuration:");
    println!("  KB_CORS_ORIGINS        - Comma-separated allowed origins (default: all)");
    println!("  KB_CORS_METHODS        - Comma-separated allowed methods (default: GET,POST,DELETE,OPTIONS)");
    println!("  KB_CORS_HEADERS        - Comma-separated allowed headers (default: Content-Type,X-API-Key,X-Request-ID)");
    println!("  KB_CORS_CREDENTIALS    - Allow credentials true/false (default: false)");
    println!("  KB_CORS_MAX_AGE        - Preflight cache seconds (default: 86400)");
    println!();
    println!("  RUST_LOG               - Log level (e.g., info, debug, trace)");
    println!();
}
