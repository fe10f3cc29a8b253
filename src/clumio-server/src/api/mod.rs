//! HTTP routes and handlers.
//!
//! `/inventory`, `/restore` and `/health` are always served. The Slack
//! webhooks under `/slack` are only mounted when a bot token is configured.

mod health;
mod inventory;
mod restore;
mod slack;

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, Uri, header};
use axum::routing::{get, post};

use crate::params::RawRequest;
use crate::state::AppState;

pub use health::HealthResponse;

/// Routes available to every caller.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/health",
            get(health::health_check).post(health::health_check),
        )
        .route(
            "/inventory",
            get(inventory::inventory).post(inventory::inventory),
        )
        .route("/restore", get(restore::restore).post(restore::restore))
}

/// Slack webhooks.
pub fn slack_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/slack/events",
            get(slack::events_probe).post(slack::events),
        )
        .route("/slack/interactive", post(slack::interactive))
        .route("/slack/options", post(slack::options))
}

fn raw_request(uri: &Uri, headers: &HeaderMap, body: &Bytes) -> RawRequest {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    RawRequest::new(uri.query(), content_type, body)
}
