//! Slack surface of the Clumio bridge.
//!
//! This crate provides:
//! - Slash command parsing (`/inventory`, `/restore`) and replies
//! - Block Kit rendering of inventories, backups and errors
//! - The interactive "View Backups" flow (ack now, update via `response_url`)
//! - Options for the object select and Events API payloads
//! - A minimal Slack Web API client
//!
//! # Configuration
//!
//! Interactive features are enabled by `SLACK_BOT_TOKEN` (`xoxb-...`).

pub mod api;
pub mod commands;
pub mod error;
pub mod events;
pub mod interactive;
pub mod messages;
pub mod options;

pub use api::SlackApiClient;
pub use commands::{CommandArgs, CommandContext, SlashCommandResponse, parse_command_text};
pub use error::{SlackError, SlackResult};
pub use interactive::{ButtonValue, FlowQueue, InteractiveFlow};
pub use messages::{SlackMessageBuilder, mask_identifier};
