//! VM query server: answers questions over HTTP.
//!
//! `vmq-server [agent.toml]`. Listen address comes from `VMQ_HOST` / `VMQ_PORT`.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use vmq_agent::config::AgentConfig;
use vmq_agent::engine::QueryEngine;
use vmq_server::config::ApiConfig;
use vmq_server::routes::build_router;
use vmq_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "vmq-server starting");

    let config = ApiConfig::from_env();
    let agent_config = AgentConfig::load(std::env::args().nth(1).as_deref())?;
    let engine = QueryEngine::from_config(&agent_config).await?;

    let app = build_router(AppState::new(Arc::new(engine)));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(tokio::signal::ctrl_c()))
        .await?;

    Ok(())
}

/// Resolves once `signal` fires. If the handler can't be installed the
/// server keeps running and only a hard kill stops it.
async fn wait_for_shutdown(signal: impl Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            tracing::warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
