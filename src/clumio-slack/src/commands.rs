//! Slack slash command handling.
//!
//! Supports the following slash commands:
//! - `/inventory [s3|ec2] [account=<id>]` - List protected resources
//! - `/restore type=<s3|ec2> [bucket-name=..] [bucket-id=..] [object-key=..]` - Start a restore
//!
//! Slash commands arrive as form-encoded HTTP requests. Their free text is
//! parsed with [`parse_command_text`]; replies are sent inline and, for
//! interactive follow-ups, via `response_url`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{SlackError, SlackResult};
use crate::messages::{SlackBlock, SlackMessageContent};

/// Keys understood by the free-text parser, in canonical spelling.
pub const KNOWN_KEYS: [&str; 5] = ["type", "account", "bucket-name", "bucket-id", "object-key"];

/// Response type for slash command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Only visible to the user who invoked the command.
    #[default]
    Ephemeral,
    /// Visible to everyone in the channel.
    InChannel,
}

/// Immediate response to a slash command.
///
/// Must be sent within 3 seconds of receiving the command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlashCommandResponse {
    /// Response type (ephemeral or in_channel).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    /// Simple text response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Block Kit blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<SlackBlock>>,
}

impl SlashCommandResponse {
    /// Create a simple text response.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Set response type to ephemeral (only visible to invoker).
    pub fn ephemeral(mut self) -> Self {
        self.response_type = Some(ResponseType::Ephemeral);
        self
    }
}

impl From<SlackMessageContent> for SlashCommandResponse {
    fn from(content: SlackMessageContent) -> Self {
        Self {
            response_type: None,
            text: content.text,
            blocks: content.blocks,
        }
    }
}

/// Delayed response sent via response_url.
///
/// Can be sent up to 30 minutes after the original command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayedResponse {
    /// Response type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    /// Whether to replace the original message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace_original: Option<bool>,
    /// Text content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Block Kit blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<SlackBlock>>,
}

impl DelayedResponse {
    /// Replace the message the interaction came from.
    pub fn replace_original(mut self) -> Self {
        self.replace_original = Some(true);
        self
    }

    /// Post as a new ephemeral message, keeping the original.
    pub fn ephemeral(mut self) -> Self {
        self.response_type = Some(ResponseType::Ephemeral);
        self.replace_original = Some(false);
        self
    }
}

impl From<SlackMessageContent> for DelayedResponse {
    fn from(content: SlackMessageContent) -> Self {
        Self {
            response_type: None,
            replace_original: None,
            text: content.text,
            blocks: content.blocks,
        }
    }
}

/// Send a delayed response to the response_url.
pub async fn send_delayed_response(
    client: &reqwest::Client,
    response_url: &str,
    response: &DelayedResponse,
) -> SlackResult<()> {
    debug!("Sending delayed response to: {}", response_url);

    let resp = client.post(response_url).json(response).send().await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        error!("Failed to send delayed response: {} - {}", status, body);
        return Err(SlackError::Api(format!(
            "Failed to send delayed response: {} - {}",
            status, body
        )));
    }

    debug!("Delayed response sent successfully");
    Ok(())
}

/// Context information from a slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// The command (e.g., "/inventory").
    pub command: String,
    /// Text after the command.
    pub text: String,
    /// User ID who invoked the command.
    pub user_id: String,
    /// Channel ID where command was invoked.
    pub channel_id: String,
    /// Team ID.
    pub team_id: String,
    /// URL for delayed responses.
    pub response_url: String,
}

impl CommandContext {
    /// Recognise a slash command from decoded form fields.
    ///
    /// A request is a slash command when it carries `command` together with
    /// at least one of `response_url`, `team_id` or `user_id`. The first
    /// occurrence of each field is used.
    pub fn from_form(pairs: &[(String, String)]) -> Option<Self> {
        let field = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };

        let command = field("command");
        if command.is_empty() {
            return None;
        }

        let context = Self {
            command,
            text: field("text"),
            user_id: field("user_id"),
            channel_id: field("channel_id"),
            team_id: field("team_id"),
            response_url: field("response_url"),
        };

        if context.response_url.is_empty()
            && context.team_id.is_empty()
            && context.user_id.is_empty()
        {
            return None;
        }
        Some(context)
    }
}

/// Arguments parsed from slash command text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs(BTreeMap<&'static str, String>);

impl CommandArgs {
    /// Value for a canonical key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Insert unless the key is already set.
    fn assign(&mut self, key: &'static str, value: &str) {
        self.0.entry(key).or_insert_with(|| value.to_string());
    }
}

fn canonical_key(key: &str) -> Option<&'static str> {
    match key {
        "object_key" => Some("object-key"),
        other => KNOWN_KEYS.iter().copied().find(|k| *k == other),
    }
}

/// Parse the free text of a slash command.
///
/// ```rust
/// use clumio_slack::commands::parse_command_text;
///
/// let args = parse_command_text("s3 account=12345");
/// assert_eq!(args.get("type"), Some("s3"));
/// assert_eq!(args.get("account"), Some("12345"));
/// ```
///
/// Tokens of the form `key=value` assign recognised keys (split at the first
/// `=`, both sides trimmed); a bare `s3` or `ec2` assigns `type` when none is
/// set yet. The first assignment of a key wins, everything else is ignored.
pub fn parse_command_text(text: &str) -> CommandArgs {
    let mut args = CommandArgs::default();

    for token in text.split_whitespace() {
        if let Some((key, value)) = token.split_once('=') {
            let (key, value) = (key.trim(), value.trim());
            if value.is_empty() {
                continue;
            }
            if let Some(key) = canonical_key(key) {
                args.assign(key, value);
            }
        } else if args.get("type").is_none() && matches!(token, "s3" | "ec2") {
            args.assign("type", token);
        }
    }

    args
}
