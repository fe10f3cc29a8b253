//! Application state shared across request handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clumio_client::ClumioClient;
use clumio_slack::{FlowQueue, InteractiveFlow, SlackApiClient};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};

/// Timeout for posts to Slack (`response_url`, Web API).
const SLACK_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state, built once at startup and never mutated.
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,
    /// Clumio API client.
    pub clumio: ClumioClient,
    /// Slack Web API client, present when a bot token is configured.
    pub slack: Option<SlackApiClient>,
    /// Queue for deferred interaction work, present with `slack`.
    pub flows: Option<FlowQueue>,
    /// Start time.
    start_time: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("slack", &self.slack.is_some())
            .field("start_time", &self.start_time)
            .finish()
    }
}

impl AppState {
    /// Create the state and start the interaction worker.
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        if config.clumio_api_token.expose_secret().is_empty() {
            warn!("CLUMIO_API_TOKEN is not set; Clumio will reject every call");
        }

        let clumio = ClumioClient::new(
            config.clumio_base_url.clone(),
            config.clumio_api_token.expose_secret(),
            config.clumio_timeout(),
        )?;

        let (slack, flows) = match &config.slack_bot_token {
            Some(token) => {
                let http = reqwest::Client::builder()
                    .timeout(SLACK_HTTP_TIMEOUT)
                    .build()
                    .map_err(|e| {
                        AppError::Internal(format!("Failed to create HTTP client: {}", e))
                    })?;
                let slack = SlackApiClient::new(
                    http.clone(),
                    token.clone(),
                    config.slack_api_base_url.clone(),
                )
                .map_err(|e| AppError::Internal(e.to_string()))?;
                let flow = InteractiveFlow::new(clumio.clone(), http, config.max_display, true);
                info!("Slack integration enabled");
                (Some(slack), Some(FlowQueue::start(Arc::new(flow))))
            }
            None => {
                info!("SLACK_BOT_TOKEN not set; Slack webhooks disabled");
                (None, None)
            }
        };

        Ok(Self {
            config,
            clumio,
            slack,
            flows,
            start_time: Instant::now(),
        })
    }

    /// Whether chat messages should carry interactive elements.
    pub fn interactive(&self) -> bool {
        self.slack.is_some()
    }

    /// Get server uptime.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
