//! Server configuration.
//!
//! Built once at startup from the environment, optionally overlaid by a
//! JSON file, and read-only afterwards.

use std::time::Duration;

use anyhow::Context;
use secrecy::SecretString;
use serde::Deserialize;

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    pub listen_addr: String,
    /// Clumio API base URL.
    pub clumio_base_url: String,
    /// Clumio bearer token.
    pub clumio_api_token: SecretString,
    /// Timeout for each Clumio call, in seconds.
    pub clumio_timeout_secs: u64,
    /// Slack bot token. Enables the `/slack/*` routes and buttons.
    pub slack_bot_token: Option<SecretString>,
    /// Slack Web API base URL.
    pub slack_api_base_url: String,
    /// Maximum number of backups listed in one message.
    pub max_display: usize,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen_addr", &self.listen_addr)
            .field("clumio_base_url", &self.clumio_base_url)
            .field("clumio_api_token", &"[REDACTED]")
            .field("clumio_timeout_secs", &self.clumio_timeout_secs)
            .field(
                "slack_bot_token",
                &self.slack_bot_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("slack_api_base_url", &self.slack_api_base_url)
            .field("max_display", &self.max_display)
            .finish()
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_clumio_base_url() -> String {
    clumio_client::DEFAULT_CLUMIO_URL.to_string()
}

fn default_clumio_timeout_secs() -> u64 {
    30
}

fn default_slack_api_base_url() -> String {
    clumio_slack::api::DEFAULT_SLACK_API_URL.to_string()
}

fn default_max_display() -> usize {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            clumio_base_url: default_clumio_base_url(),
            clumio_api_token: SecretString::from(String::new()),
            clumio_timeout_secs: default_clumio_timeout_secs(),
            slack_bot_token: None,
            slack_api_base_url: default_slack_api_base_url(),
            max_display: default_max_display(),
        }
    }
}

/// Configuration file contents. Every field is optional and overrides the
/// environment when present.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub listen_addr: Option<String>,
    pub clumio_base_url: Option<String>,
    pub clumio_api_token: Option<String>,
    pub clumio_timeout_secs: Option<u64>,
    pub slack_bot_token: Option<String>,
    pub slack_api_base_url: Option<String>,
    pub max_display: Option<usize>,
}

impl ServerConfig {
    /// Load from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load from the environment, then overlay a JSON configuration file.
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        let mut config = Self::from_env()?;
        config.apply(file);
        Ok(config)
    }

    /// Build from a variable lookup. Empty values count as unset.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("CLUMIO_BRIDGE_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(url) = get("CLUMIO_API_BASE_URL") {
            config.clumio_base_url = url;
        }
        if let Some(token) = get("CLUMIO_API_TOKEN") {
            config.clumio_api_token = SecretString::from(token);
        }
        if let Some(secs) = get("CLUMIO_TIMEOUT_SECS") {
            config.clumio_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("CLUMIO_TIMEOUT_SECS is not a number: {}", secs))?;
        }
        if let Some(token) = get("SLACK_BOT_TOKEN") {
            config.slack_bot_token = Some(SecretString::from(token));
        }
        if let Some(url) = get("SLACK_API_BASE_URL") {
            config.slack_api_base_url = url;
        }
        if let Some(max) = get("CLUMIO_BRIDGE_MAX_DISPLAY") {
            config.max_display = max
                .trim()
                .parse()
                .with_context(|| format!("CLUMIO_BRIDGE_MAX_DISPLAY is not a number: {}", max))?;
        }

        Ok(config)
    }

    /// Override fields set in `file`.
    pub fn apply(&mut self, file: ConfigFile) {
        if let Some(addr) = file.listen_addr {
            self.listen_addr = addr;
        }
        if let Some(url) = file.clumio_base_url {
            self.clumio_base_url = url;
        }
        if let Some(token) = file.clumio_api_token {
            self.clumio_api_token = SecretString::from(token);
        }
        if let Some(secs) = file.clumio_timeout_secs {
            self.clumio_timeout_secs = secs;
        }
        if let Some(token) = file.slack_bot_token.filter(|t| !t.is_empty()) {
            self.slack_bot_token = Some(SecretString::from(token));
        }
        if let Some(url) = file.slack_api_base_url {
            self.slack_api_base_url = url;
        }
        if let Some(max) = file.max_display {
            self.max_display = max;
        }
    }

    /// Get the Clumio timeout as Duration.
    pub fn clumio_timeout(&self) -> Duration {
        Duration::from_secs(self.clumio_timeout_secs)
    }
}
