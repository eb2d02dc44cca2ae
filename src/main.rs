//! Agent knowledge server
//!
//! Standalone admin API over the agent-partitioned knowledge store.

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use agent_knowledge::config::{self, ServerConfig};
use agent_knowledge::handlers::{build_protected_routes, build_public_routes, KnowledgeService};
use agent_knowledge::{metrics, middleware, tracing_setup};

// Shutdown timeouts
const GRACEFUL_SHUTDOWN_TIMEOUT_SECS: u64 = 30; // Max time for cleanup
const DATABASE_FLUSH_TIMEOUT_SECS: u64 = 10; // Max time to flush RocksDB

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().skip(1).any(|a| a == "--help" || a == "-h") {
        config::print_env_help();
        return Ok(());
    }

    tracing_setup::init_tracing()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    metrics::register_metrics().context("failed to register metrics")?;
    info!("Metrics registered at /metrics");

    info!("Starting agent knowledge server...");

    let server_config = ServerConfig::from_env();
    server_config.log();

    let service = Arc::new(
        KnowledgeService::new(server_config.clone()).context("failed to open knowledge store")?,
    );
    let service_for_shutdown = Arc::clone(&service);

    // Protected routes carry auth (inside) and rate limiting (here)
    let protected_routes = if server_config.rate_limit_per_second > 0 {
        let governor_conf = GovernorConfigBuilder::default()
            .per_second(server_config.rate_limit_per_second)
            .burst_size(server_config.rate_limit_burst)
            .finish()
            .context("invalid rate limiter configuration")?;

        info!(
            "Rate limiting enabled: {} req/sec, burst of {}",
            server_config.rate_limit_per_second, server_config.rate_limit_burst
        );
        build_protected_routes(service.clone()).layer(GovernorLayer::new(governor_conf))
    } else {
        build_protected_routes(service.clone())
    };

    // Public routes are never rate limited: probes and scraping must get through
    let app = Router::new()
        .merge(build_public_routes(service.clone()))
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server_config.request_timeout_secs,
        )))
        .layer(ConcurrencyLimitLayer::new(
            server_config.max_concurrent_requests,
        ))
        .layer(server_config.cors.to_layer());

    let addr: SocketAddr = format!("{}:{}", server_config.host, server_config.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid bind address {}:{}",
                server_config.host, server_config.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutdown signal received, flushing knowledge store...");

    let cleanup_future = async {
        let flush_future = tokio::task::spawn_blocking(move || service_for_shutdown.flush());

        match tokio::time::timeout(
            Duration::from_secs(DATABASE_FLUSH_TIMEOUT_SECS),
            flush_future,
        )
        .await
        {
            Ok(Ok(Ok(()))) => info!("Knowledge store flushed successfully"),
            Ok(Ok(Err(e))) => tracing::error!("Failed to flush knowledge store: {}", e),
            Ok(Err(e)) => tracing::error!("Flush task failed: {}", e),
            Err(_) => tracing::error!(
                "Knowledge store flush timed out after {}s",
                DATABASE_FLUSH_TIMEOUT_SECS
            ),
        }
    };

    match tokio::time::timeout(
        Duration::from_secs(GRACEFUL_SHUTDOWN_TIMEOUT_SECS),
        cleanup_future,
    )
    .await
    {
        Ok(()) => info!("Server shutdown complete"),
        Err(_) => {
            tracing::error!(
                "Graceful shutdown timed out after {}s, forcing exit",
                GRACEFUL_SHUTDOWN_TIMEOUT_SECS
            );
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
