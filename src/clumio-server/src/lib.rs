//! Clumio bridge server.
//!
//! This crate provides:
//! - `/inventory` and `/restore`, answering API callers with plain JSON and
//!   Slack slash commands with Block Kit messages
//! - Slack webhooks for events, interactions and select options
//! - `/health`
//!
//! Parameters may arrive in the query string, a JSON body, a form body or
//! slash command text; see [`params`] for how they are merged.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod api;
pub mod config;
pub mod error;
pub mod params;
pub mod respond;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::ServerConfig;
pub use error::{AppError, AppResult};
pub use state::AppState;

/// Run the server with the given configuration.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    run_with_shutdown(config, std::future::pending()).await
}

/// Run the server with graceful shutdown support.
pub async fn run_with_shutdown<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = config.listen_addr.parse()?;
    let state = Arc::new(AppState::new(config).await?);
    let app = create_router_with_state(state);

    info!("Starting Clumio bridge on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutting down");
    Ok(())
}

/// Create the application router with an Arc-wrapped state.
pub fn create_router_with_state(state: Arc<AppState>) -> Router {
    let mut routes = api::routes();
    if state.slack.is_some() {
        routes = routes.merge(api::slack_routes());
    }

    routes
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
