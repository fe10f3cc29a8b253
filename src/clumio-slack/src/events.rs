//! Event handling for the Slack Events API.
//!
//! Handles:
//! - `url_verification` - the handshake Slack performs when the request URL is saved
//! - `event_callback` carrying `app_mention` - answered with usage help
//!
//! Events are received over HTTP; other callback kinds are accepted and ignored.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{SlackError, SlackResult};

/// Top-level Events API request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventsApiPayload {
    /// Request URL handshake; the challenge must be echoed back.
    UrlVerification { challenge: String },
    /// A subscribed event.
    EventCallback {
        #[serde(default)]
        team_id: Option<String>,
        #[serde(default)]
        event_id: Option<String>,
        event: serde_json::Value,
    },
    /// Unknown payload type (for forward compatibility).
    #[serde(other)]
    Unknown,
}

/// Slack event types that we handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    /// App mention event (@bridge in a channel).
    AppMention(AppMentionEvent),
    /// Unknown event type (for forward compatibility).
    #[serde(other)]
    Unknown,
}

/// Event payload for app mentions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMentionEvent {
    /// User who mentioned the bot.
    pub user: String,
    /// Text of the message (including the mention).
    pub text: String,
    /// Channel where the mention occurred.
    pub channel: String,
    /// Timestamp of the message.
    pub ts: String,
    /// Thread timestamp (if in a thread).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl AppMentionEvent {
    /// Thread to reply in: the existing thread, or a new one under this message.
    pub fn reply_thread(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

/// Parse an Events API request body.
pub fn parse_payload(body: &[u8]) -> SlackResult<EventsApiPayload> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("Failed to parse events payload: {}", e);
        SlackError::InvalidPayload(format!("events payload: {}", e))
    })
}

/// Parse the inner event of an `event_callback`.
pub fn parse_event(event: &serde_json::Value) -> SlackEvent {
    match serde_json::from_value(event.clone()) {
        Ok(event) => event,
        Err(e) => {
            debug!("Ignoring unparseable event: {}", e);
            SlackEvent::Unknown
        }
    }
}
