//! Options for the object select (`block_suggestion` requests).
//!
//! The select lives in a block whose id carries the bucket it browses, so the
//! request needs no other state.

use clumio_client::{ClumioClient, ObjectEntry};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SlackError, SlackResult};
use crate::messages::{SlackOption, SlackTextObject};

/// Slack displays at most this many options.
pub const MAX_OPTIONS: usize = 100;

/// Option values longer than this are rejected by Slack.
pub const MAX_OPTION_VALUE: usize = 150;

/// Option text longer than this is rejected by Slack.
pub const MAX_OPTION_TEXT: usize = 75;

const BLOCK_PREFIX: &str = "object_select:";

/// Block id of the object select for a bucket.
pub fn object_select_block_id(bucket_id: &str) -> String {
    format!("{}{}", BLOCK_PREFIX, bucket_id)
}

/// Bucket id encoded in an object select block id.
pub fn bucket_id_from_block(block_id: &str) -> Option<&str> {
    block_id
        .strip_prefix(BLOCK_PREFIX)
        .filter(|id| !id.is_empty())
}

/// `block_suggestion` payload (the `payload` form field).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSuggestionPayload {
    #[serde(rename = "type")]
    pub payload_type: String,
    pub action_id: String,
    pub block_id: String,
    /// Text typed into the select so far.
    #[serde(default)]
    pub value: String,
}

/// Body returned to Slack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsResponse {
    pub options: Vec<SlackOption>,
}

/// Parse a `block_suggestion` payload.
pub fn parse_suggestion(raw: &str) -> SlackResult<BlockSuggestionPayload> {
    serde_json::from_str(raw)
        .map_err(|e| SlackError::InvalidPayload(format!("suggestion payload: {}", e)))
}

/// Turn object listings into select options.
pub fn object_options(objects: &[ObjectEntry]) -> OptionsResponse {
    let options = objects
        .iter()
        .filter(|o| !o.key.is_empty() && o.key.chars().count() <= MAX_OPTION_VALUE)
        .take(MAX_OPTIONS)
        .map(|o| {
            let label = if o.key.chars().count() > MAX_OPTION_TEXT {
                let tail: String = o.key.chars().take(MAX_OPTION_TEXT - 1).collect();
                format!("{}…", tail)
            } else {
                o.key.clone()
            };
            SlackOption {
                text: SlackTextObject::plain(label),
                value: o.key.clone(),
            }
        })
        .collect();
    OptionsResponse { options }
}

/// Answer a suggestion request by listing objects under the typed prefix.
pub async fn suggest_objects(
    clumio: &ClumioClient,
    payload: &BlockSuggestionPayload,
) -> SlackResult<OptionsResponse> {
    let bucket_id = bucket_id_from_block(&payload.block_id).ok_or_else(|| {
        SlackError::InvalidPayload(format!("unexpected block: {}", payload.block_id))
    })?;

    let prefix = payload.value.trim();
    let objects = clumio
        .list_objects(bucket_id, Some(prefix).filter(|p| !p.is_empty()))
        .await?;
    debug!(
        "{} objects in bucket {} match {:?}",
        objects.len(),
        bucket_id,
        prefix
    );
    Ok(object_options(&objects))
}
