//! Error types for the Slack surface.
//!
//! Covers Slack Web API failures, delivery to `response_url`, malformed
//! interaction payloads and backend failures bubbling up from the
//! interactive flow.

use thiserror::Error;

/// Errors that can occur during Slack operations.
#[derive(Error, Debug)]
pub enum SlackError {
    /// Configuration error (missing or invalid config).
    #[error("Configuration error: {0}")]
    Config(String),

    /// API request failed.
    #[error("Slack API error: {0}")]
    Api(String),

    /// API rate limited.
    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Invalid payload received from Slack (interaction JSON, button value).
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Clumio call made on behalf of a Slack interaction failed.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for SlackError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SlackError::Timeout(err.to_string())
        } else if err.is_connect() {
            SlackError::Network(format!("Connection failed: {}", err))
        } else {
            SlackError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SlackError {
    fn from(err: serde_json::Error) -> Self {
        SlackError::Json(err.to_string())
    }
}

impl From<clumio_client::ClumioError> for SlackError {
    fn from(err: clumio_client::ClumioError) -> Self {
        SlackError::Backend(err.to_string())
    }
}

/// Result type for Slack operations.
pub type SlackResult<T> = std::result::Result<T, SlackError>;

/// Represents a Slack API response error (`"ok": false`).
#[derive(Debug, Clone)]
pub struct SlackApiError {
    /// Error code from Slack (e.g., "channel_not_found").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl SlackApiError {
    /// Create a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<SlackApiError> for SlackError {
    fn from(err: SlackApiError) -> Self {
        match err.code.as_str() {
            "rate_limited" => SlackError::RateLimited {
                retry_after_secs: 30,
            },
            "invalid_auth" | "not_authed" | "account_inactive" => {
                SlackError::Config(format!("Slack rejected the bot token: {}", err.message))
            }
            _ => SlackError::Api(format!("{}: {}", err.code, err.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SlackError::InvalidPayload("missing actions".to_string());
        assert_eq!(err.to_string(), "Invalid payload: missing actions");

        let err = SlackError::RateLimited {
            retry_after_secs: 60,
        };
        assert_eq!(err.to_string(), "Rate limited: retry after 60 seconds");
    }

    #[test]
    fn test_api_error_conversion() {
        let slack_err: SlackError = SlackApiError::new("invalid_auth", "Token revoked").into();
        assert!(matches!(slack_err, SlackError::Config(_)));

        let slack_err: SlackError = SlackApiError::new("rate_limited", "slow down").into();
        assert!(matches!(slack_err, SlackError::RateLimited { .. }));

        let slack_err: SlackError =
            SlackApiError::new("channel_not_found", "Channel not found").into();
        assert_eq!(
            slack_err.to_string(),
            "Slack API error: channel_not_found: Channel not found"
        );
    }

    #[test]
    fn test_backend_error_conversion() {
        let err: SlackError =
            clumio_client::ClumioError::Timeout("deadline elapsed".to_string()).into();
        assert!(matches!(err, SlackError::Backend(_)));
        assert!(err.to_string().contains("deadline elapsed"));
    }
}
