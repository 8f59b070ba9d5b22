//! Sealdesk Server
//!
//! Axum JSON API that stores envelopes in memory and serves them to signers
//! by access token.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::ServerConfig,
    handler::{AppState, router},
    service::database::Database,
};

mod config;
mod handler;
mod service;
mod util;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let addr = config.addr;
    let app = router(AppState {
        database: Database::new(),
        config,
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!("Server listening on {addr}");
    tracing::info!("  - Create: POST http://{addr}/api/envelopes");
    tracing::info!("  - Sign:   GET  http://{addr}/api/sign/{{token}}");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
