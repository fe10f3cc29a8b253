//! Interactive components (buttons and menus).
//!
//! Slack requires an HTTP 200 within three seconds of a click, so the HTTP
//! handler only acknowledges and hands the raw payload to a [`FlowQueue`].
//! The queue worker runs each job as a detached task that calls Clumio and
//! posts a replacement message to the interaction's `response_url`.
//!
//! Jobs cannot be cancelled. A failed job is terminal and only visible
//! through the follow-up message or the logs. The queue is bounded and so is
//! the number of jobs running at once; a click that finds the queue full is
//! dropped with a warning.

use std::sync::Arc;

use clumio_client::{ClumioClient, InventoryItem};
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, warn};

use crate::commands::{DelayedResponse, send_delayed_response};
use crate::error::{SlackError, SlackResult};
use crate::messages::{format_backups_message, format_error_response, format_restore_hint};
use crate::options::bucket_id_from_block;

/// Action id of the per-bucket "View Backups" button.
pub const VIEW_BACKUPS_ACTION: &str = "view_backups";

/// Action id of the object select in a backups message.
pub const SELECT_OBJECT_ACTION: &str = "select_object";

/// Pending interactions held before new clicks are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Interaction jobs allowed to run at once.
pub const DEFAULT_MAX_RUNNING: usize = 16;

/// Target of a "View Backups" button, carried in the button's `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonValue {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub bucket_id: String,
    #[serde(default)]
    pub bucket_name: String,
}

impl ButtonValue {
    /// Encode as the JSON string Slack echoes back on click.
    pub fn encode(&self) -> String {
        serde_json::json!({
            "id": self.id,
            "bucket_id": self.bucket_id,
            "bucket_name": self.bucket_name,
        })
        .to_string()
    }

    /// Decode a button value. The asset id must be present.
    pub fn decode(raw: &str) -> SlackResult<Self> {
        let value: Self = serde_json::from_str(raw)
            .map_err(|e| SlackError::InvalidPayload(format!("button value: {}", e)))?;
        if value.id.is_empty() {
            return Err(SlackError::InvalidPayload(
                "button value has no asset id".to_string(),
            ));
        }
        Ok(value)
    }
}

impl From<&InventoryItem> for ButtonValue {
    fn from(item: &InventoryItem) -> Self {
        Self {
            id: item.id.clone(),
            bucket_id: item.bucket_id.clone(),
            bucket_name: item.bucket_name.clone(),
        }
    }
}

/// `block_actions` interaction payload (the `payload` form field).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionPayload {
    #[serde(rename = "type")]
    pub payload_type: String,
    #[serde(default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub user: Option<InteractionUser>,
    #[serde(default)]
    pub actions: Vec<BlockAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionUser {
    pub id: String,
}

/// One action of a `block_actions` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockAction {
    pub action_id: String,
    #[serde(default)]
    pub block_id: Option<String>,
    /// Button value.
    #[serde(default)]
    pub value: Option<String>,
    /// Select menu choice.
    #[serde(default)]
    pub selected_option: Option<SelectedOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedOption {
    pub value: String,
}

/// Parse an interaction payload; at least one action is required.
pub fn parse_interaction(raw: &str) -> SlackResult<InteractionPayload> {
    let payload: InteractionPayload = serde_json::from_str(raw)
        .map_err(|e| SlackError::InvalidPayload(format!("interaction payload: {}", e)))?;
    if payload.actions.is_empty() {
        return Err(SlackError::InvalidPayload(
            "interaction payload has no actions".to_string(),
        ));
    }
    Ok(payload)
}

/// `response_url` of a payload that may not parse as [`InteractionPayload`].
fn salvage_response_url(raw: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()?
        .get("response_url")?
        .as_str()
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Result posted to `response_url`.
    Notified,
    /// Error message posted to `response_url`.
    NotifiedError,
    /// No `response_url`; the outcome was only logged.
    LoggedOnly,
    /// Posting to `response_url` failed.
    DeliveryFailed,
}

/// Runs the deferred part of an interaction.
pub struct InteractiveFlow {
    clumio: ClumioClient,
    http: reqwest::Client,
    max_display: usize,
    interactive: bool,
}

impl InteractiveFlow {
    pub fn new(
        clumio: ClumioClient,
        http: reqwest::Client,
        max_display: usize,
        interactive: bool,
    ) -> Self {
        Self {
            clumio,
            http,
            max_display,
            interactive,
        }
    }

    /// Dispatch, fetch and notify for one raw interaction payload.
    pub async fn run(&self, raw: &str) -> FlowOutcome {
        let (response_url, keep_original, result) = match parse_interaction(raw) {
            Ok(payload) => {
                let url = payload.response_url.clone().filter(|u| !u.is_empty());
                let keep_original = payload
                    .actions
                    .first()
                    .is_some_and(|a| a.action_id == SELECT_OBJECT_ACTION);
                (url, keep_original, self.dispatch(&payload).await)
            }
            Err(e) => (salvage_response_url(raw), false, Err(e)),
        };

        let response = match &result {
            Ok(response) => response.clone(),
            Err(e) => {
                warn!("Interaction failed: {}", e);
                let reply = DelayedResponse::from(format_error_response(&e.to_string()));
                // Object picks answer beside the backups message, never over it.
                if keep_original {
                    reply.ephemeral()
                } else {
                    reply.replace_original()
                }
            }
        };

        let Some(url) = response_url else {
            info!("Interaction has no response_url; outcome logged only");
            return FlowOutcome::LoggedOnly;
        };

        match send_delayed_response(&self.http, &url, &response).await {
            Ok(()) if result.is_ok() => FlowOutcome::Notified,
            Ok(()) => FlowOutcome::NotifiedError,
            Err(e) => {
                error!("Failed to deliver interaction result: {}", e);
                FlowOutcome::DeliveryFailed
            }
        }
    }

    async fn dispatch(&self, payload: &InteractionPayload) -> SlackResult<DelayedResponse> {
        let action = payload
            .actions
            .first()
            .ok_or_else(|| SlackError::InvalidPayload("no actions".to_string()))?;
        debug!("Dispatching action: {}", action.action_id);

        match action.action_id.as_str() {
            VIEW_BACKUPS_ACTION => {
                let target = ButtonValue::decode(action.value.as_deref().unwrap_or_default())?;
                let backups = self.clumio.list_backups(&target.id).await?;
                info!("Fetched {} backups for asset {}", backups.len(), target.id);
                let message = format_backups_message(
                    &target,
                    &backups,
                    self.max_display,
                    self.interactive,
                );
                Ok(DelayedResponse::from(message).replace_original())
            }
            SELECT_OBJECT_ACTION => {
                let bucket_id = action
                    .block_id
                    .as_deref()
                    .and_then(bucket_id_from_block)
                    .ok_or_else(|| {
                        SlackError::InvalidPayload("object select without bucket".to_string())
                    })?;
                let key = action
                    .selected_option
                    .as_ref()
                    .map(|o| o.value.as_str())
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| {
                        SlackError::InvalidPayload("object select without a choice".to_string())
                    })?;
                Ok(DelayedResponse::from(format_restore_hint(bucket_id, key)).ephemeral())
            }
            other => Err(SlackError::InvalidPayload(format!(
                "unsupported action: {}",
                other
            ))),
        }
    }
}

/// Work queue feeding interaction jobs to detached tasks.
#[derive(Clone)]
pub struct FlowQueue {
    tx: mpsc::Sender<String>,
}

impl FlowQueue {
    /// Start the worker with default limits. Must be called from within a
    /// Tokio runtime.
    pub fn start(flow: Arc<InteractiveFlow>) -> Self {
        Self::with_limits(flow, DEFAULT_QUEUE_CAPACITY, DEFAULT_MAX_RUNNING)
    }

    /// Start the worker holding at most `capacity` pending payloads and
    /// running at most `max_running` jobs at once.
    pub fn with_limits(flow: Arc<InteractiveFlow>, capacity: usize, max_running: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));
        let running = Arc::new(Semaphore::new(max_running.max(1)));

        tokio::spawn(async move {
            loop {
                // Jobs wait in the channel while every slot is busy.
                let Ok(permit) = Arc::clone(&running).acquire_owned().await else {
                    break;
                };
                let Some(raw) = rx.recv().await else {
                    break;
                };
                let flow = Arc::clone(&flow);
                tokio::spawn(async move {
                    let outcome = flow.run(&raw).await;
                    debug!("Interaction job finished: {:?}", outcome);
                    drop(permit);
                });
            }
            debug!("Interaction queue closed");
        });

        Self { tx }
    }

    /// Enqueue a raw interaction payload. Never blocks; fails when the queue
    /// is full or the worker has stopped.
    pub fn submit(&self, raw: String) -> SlackResult<()> {
        self.tx.try_send(raw).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                warn!("Interaction queue is full; dropping click");
                SlackError::Internal("interaction queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                SlackError::Internal("interaction worker has stopped".to_string())
            }
        })
    }
}
