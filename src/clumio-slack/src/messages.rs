//! Message formatting for Slack.
//!
//! Provides utilities for:
//! - Building rich messages with Block Kit
//! - Rendering inventory, backup and restore results for chat callers
//! - Masking account identifiers

use clumio_client::{BackupRecord, InventoryItem};
use serde::{Deserialize, Serialize};

use crate::interactive::{ButtonValue, SELECT_OBJECT_ACTION, VIEW_BACKUPS_ACTION};
use crate::options::object_select_block_id;

/// Slack rejects section text longer than this.
pub const SECTION_TEXT_LIMIT: usize = 3000;

/// Slack rejects header text longer than this.
pub const HEADER_TEXT_LIMIT: usize = 150;

/// Slack rejects messages with more blocks than this.
pub const MAX_BLOCKS: usize = 50;

/// Character used in place of masked digits.
pub const MASK_CHAR: char = '*';

/// Separator between `Label: value` pairs in an item section.
pub const FIELD_SEPARATOR: &str = "  |  ";

/// Mask all but the last four characters of an identifier.
///
/// ```rust
/// use clumio_slack::messages::mask_identifier;
///
/// assert_eq!(mask_identifier("1234567890"), "******7890");
/// assert_eq!(mask_identifier("12"), "**");
/// ```
pub fn mask_identifier(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let n = chars.len();
    if n > 4 {
        let mut masked: String = std::iter::repeat_n(MASK_CHAR, n - 4).collect();
        masked.extend(&chars[n - 4..]);
        masked
    } else {
        std::iter::repeat_n(MASK_CHAR, n).collect()
    }
}

/// Render `*Label:* value` pairs joined by [`FIELD_SEPARATOR`].
pub fn field_line(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(label, value)| format!("*{}:* {}", label, value))
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

/// Wrap `content` in a preformatted block that fits in one section.
pub fn code_block(content: &str) -> String {
    format!("```{}```", truncate_chars(content, SECTION_TEXT_LIMIT - 6))
}

/// Slack Block Kit block types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackBlock {
    /// Header block.
    Header { text: SlackTextObject },
    /// Section block (main content).
    Section {
        text: SlackTextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<SlackBlockElement>,
    },
    /// Divider block.
    Divider {},
    /// Context block (small text).
    Context { elements: Vec<SlackContextElement> },
    /// Actions block (buttons, menus).
    Actions {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        elements: Vec<SlackBlockElement>,
    },
}

/// Slack text object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackTextObject {
    #[serde(rename = "type")]
    pub text_type: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<bool>,
}

impl SlackTextObject {
    /// Create a plain text object.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text_type: "plain_text".to_string(),
            text: text.into(),
            emoji: Some(true),
        }
    }

    /// Create a mrkdwn text object.
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            text_type: "mrkdwn".to_string(),
            text: text.into(),
            emoji: None,
        }
    }
}

/// Slack context element (for context blocks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackContextElement {
    /// Plain text.
    PlainText { text: String },
    /// Mrkdwn text.
    Mrkdwn { text: String },
}

/// Slack block element (buttons, menus).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackBlockElement {
    /// Button element.
    Button {
        text: SlackTextObject,
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<String>,
    },
    /// Select menu whose options are served by the options webhook.
    ExternalSelect {
        action_id: String,
        placeholder: SlackTextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        min_query_length: Option<u32>,
    },
}

impl SlackBlockElement {
    /// Create a button carrying an opaque value.
    pub fn button(
        text: impl Into<String>,
        action_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Button {
            text: SlackTextObject::plain(text),
            action_id: action_id.into(),
            value: Some(value.into()),
            style: None,
        }
    }
}

/// An option in a select menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlackOption {
    pub text: SlackTextObject,
    pub value: String,
}

/// Slack message content with blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackMessageContent {
    /// Fallback text for notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Block Kit blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<SlackBlock>>,
    /// Thread timestamp (for replies).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl SlackMessageContent {
    /// Create a new message content.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set fallback text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set blocks.
    pub fn with_blocks(mut self, blocks: Vec<SlackBlock>) -> Self {
        self.blocks = Some(blocks);
        self
    }

    /// Set thread timestamp (for replies).
    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }
}

/// Builder for creating rich Slack messages.
pub struct SlackMessageBuilder {
    blocks: Vec<SlackBlock>,
    fallback_text: Option<String>,
}

impl SlackMessageBuilder {
    /// Create a new message builder.
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            fallback_text: None,
        }
    }

    /// Set fallback text for notifications.
    pub fn fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback_text = Some(text.into());
        self
    }

    /// Add a header block.
    pub fn header(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(SlackBlock::Header {
            text: SlackTextObject::plain(truncate_chars(&text.into(), HEADER_TEXT_LIMIT)),
        });
        self
    }

    /// Add a section with mrkdwn text.
    pub fn section(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(SlackBlock::Section {
            text: SlackTextObject::mrkdwn(truncate_chars(&text.into(), SECTION_TEXT_LIMIT)),
            accessory: None,
        });
        self
    }

    /// Add a divider.
    pub fn divider(mut self) -> Self {
        self.blocks.push(SlackBlock::Divider {});
        self
    }

    /// Add a context block.
    pub fn context(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(SlackBlock::Context {
            elements: vec![SlackContextElement::Mrkdwn { text: text.into() }],
        });
        self
    }

    /// Add an actions block.
    pub fn actions(mut self, block_id: Option<String>, elements: Vec<SlackBlockElement>) -> Self {
        self.blocks.push(SlackBlock::Actions { block_id, elements });
        self
    }

    /// Number of blocks added so far.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Build the message content.
    pub fn build(self) -> SlackMessageContent {
        SlackMessageContent {
            text: self.fallback_text,
            blocks: Some(self.blocks),
            thread_ts: None,
        }
    }
}

impl Default for SlackMessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One rendered list entry: its section text and an optional actions row.
struct ItemRow {
    text: String,
    actions: Option<Vec<SlackBlockElement>>,
}

/// Append rows, a trailing divider and the total count.
///
/// Rows beyond `max_display` (or beyond what fits under [`MAX_BLOCKS`] with
/// `reserved` blocks kept free) are summarised as "…and N more".
fn push_rows(
    mut builder: SlackMessageBuilder,
    rows: Vec<ItemRow>,
    max_display: usize,
    reserved: usize,
    noun: &str,
) -> SlackMessageBuilder {
    let total = rows.len();
    let per_row = if rows.iter().any(|r| r.actions.is_some()) { 2 } else { 1 };
    // trailing divider, "more" line, summary
    let room = MAX_BLOCKS.saturating_sub(builder.block_count() + 3 + reserved) / per_row;
    let shown = total.min(max_display).min(room);

    for row in rows.into_iter().take(shown) {
        builder = builder.section(row.text);
        if let Some(elements) = row.actions {
            builder = builder.actions(None, elements);
        }
    }

    builder = builder.divider();
    if total > shown {
        builder = builder.context(format!("…and {} more", total - shown));
    }
    builder.section(format!("*Total:* {} {}", total, noun))
}

/// Render an S3 inventory for chat callers.
///
/// With `interactive` set, each bucket gets a "View Backups" button whose
/// value is the encoded [`ButtonValue`].
pub fn format_inventory_message(
    items: &[InventoryItem],
    account_id: Option<&str>,
    interactive: bool,
) -> SlackMessageContent {
    let title = match account_id {
        Some(account) => format!("Clumio S3 Inventory ({})", mask_identifier(account)),
        None => "Clumio S3 Inventory".to_string(),
    };

    let mut builder = SlackMessageBuilder::new()
        .fallback(format!("{} protected bucket(s)", items.len()))
        .header(title)
        .divider();

    if items.is_empty() {
        return builder
            .section(code_block("[]"))
            .divider()
            .section("*Total:* 0 buckets")
            .build();
    }

    let rows = items
        .iter()
        .map(|item| ItemRow {
            text: field_line(&[
                ("ID", &item.id),
                ("Bucket ID", &item.bucket_id),
                ("Bucket Name", &item.bucket_name),
            ]),
            actions: interactive.then(|| {
                vec![SlackBlockElement::button(
                    "View Backups",
                    VIEW_BACKUPS_ACTION,
                    ButtonValue::from(item).encode(),
                )]
            }),
        })
        .collect();

    builder = push_rows(builder, rows, usize::MAX, 0, "buckets");
    builder.build()
}

/// Render the backups of one bucket, replacing the inventory message.
pub fn format_backups_message(
    target: &ButtonValue,
    backups: &[BackupRecord],
    max_display: usize,
    interactive: bool,
) -> SlackMessageContent {
    let name = if target.bucket_name.is_empty() {
        target.id.as_str()
    } else {
        target.bucket_name.as_str()
    };

    let mut builder = SlackMessageBuilder::new()
        .fallback(format!("{} backup(s) for {}", backups.len(), name))
        .header(format!("Backups for {}", name))
        .divider();

    let with_select = interactive && !target.bucket_id.is_empty();

    if backups.is_empty() {
        builder = builder
            .section(code_block("[]"))
            .divider()
            .section("*Total:* 0 backups");
    } else {
        let rows = backups
            .iter()
            .map(|backup| ItemRow {
                text: field_line(&[
                    ("Backup ID", &backup.id),
                    ("Timestamp", &backup.timestamp),
                    ("Status", &backup.status),
                    ("Size", &backup.size),
                ]),
                actions: None,
            })
            .collect();
        builder = push_rows(
            builder,
            rows,
            max_display,
            usize::from(with_select),
            "backups",
        );
    }

    if with_select {
        builder = builder.actions(
            Some(object_select_block_id(&target.bucket_id)),
            vec![SlackBlockElement::ExternalSelect {
                action_id: SELECT_OBJECT_ACTION.to_string(),
                placeholder: SlackTextObject::plain("Pick an object to restore"),
                min_query_length: Some(0),
            }],
        );
    }

    builder.build()
}

/// Render an arbitrary JSON payload (EC2 inventory, restore results).
pub fn format_json_message(title: &str, value: &serde_json::Value) -> SlackMessageContent {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    SlackMessageBuilder::new()
        .fallback(title)
        .header(title)
        .divider()
        .section(code_block(&pretty))
        .build()
}

/// Suggest the restore command for a picked object.
pub fn format_restore_hint(bucket_id: &str, object_key: &str) -> SlackMessageContent {
    let command = format!(
        "/restore type=s3 bucket-id={} object-key={}",
        bucket_id, object_key
    );
    SlackMessageBuilder::new()
        .fallback(command.clone())
        .section(format!("Restore this object with:\n`{}`", command))
        .build()
}

/// Format the reply to an @mention.
pub fn format_help_message() -> SlackMessageContent {
    SlackMessageBuilder::new()
        .fallback("Clumio bridge usage")
        .header("Clumio Bridge")
        .section(
            "*Inventory:* `/inventory type=s3 account=<aws-account-id>` or `/inventory ec2`\n\
             *Restore:* `/restore type=s3 bucket-name=<name> bucket-id=<digits> object-key=<key>`",
        )
        .context("Use the View Backups buttons on an inventory to browse backups.")
        .build()
}

/// Format an error response for Slack.
pub fn format_error_response(error: &str) -> SlackMessageContent {
    SlackMessageBuilder::new()
        .fallback(error)
        .header("❌ Error")
        .section(code_block(error))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(n: usize) -> InventoryItem {
        InventoryItem {
            id: format!("asset-{n}"),
            bucket_id: format!("{}", 100 + n),
            bucket_name: format!("bucket-{n}"),
        }
    }

    fn backup(n: usize) -> BackupRecord {
        BackupRecord {
            id: format!("bk-{n}"),
            timestamp: "2024-05-01T10:00:00Z".to_string(),
            status: "completed".to_string(),
            size: "1024".to_string(),
        }
    }

    fn block_types(content: &SlackMessageContent) -> Vec<String> {
        let value = serde_json::to_value(content.blocks.as_ref().unwrap()).unwrap();
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["type"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_mask_identifier() {
        assert_eq!(mask_identifier("1234567890"), "******7890");
        assert_eq!(mask_identifier("12"), "**");
        assert_eq!(mask_identifier("1234"), "****");
        assert_eq!(mask_identifier("12345"), "*2345");
        assert_eq!(mask_identifier(""), "");
    }

    #[test]
    fn test_field_line() {
        assert_eq!(
            field_line(&[("ID", "a"), ("Bucket ID", "1")]),
            "*ID:* a  |  *Bucket ID:* 1"
        );
    }

    #[test]
    fn test_code_block_truncates() {
        let long = "x".repeat(5000);
        let block = code_block(&long);
        assert!(block.chars().count() <= SECTION_TEXT_LIMIT);
        assert!(block.starts_with("```"));
        assert!(block.ends_with("…```"));
        assert_eq!(code_block("[]"), "```[]```");
    }

    #[test]
    fn test_inventory_layout_with_buttons() {
        let message = format_inventory_message(&[item(1), item(2)], Some("761018876565"), true);
        assert_eq!(
            block_types(&message),
            vec![
                "header", "divider", "section", "actions", "section", "actions", "divider",
                "section"
            ]
        );

        let blocks = message.blocks.unwrap();
        match &blocks[0] {
            SlackBlock::Header { text } => {
                assert_eq!(text.text, "Clumio S3 Inventory (********6565)")
            }
            other => panic!("Expected header, got {other:?}"),
        }
        match &blocks[2] {
            SlackBlock::Section { text, .. } => assert_eq!(
                text.text,
                "*ID:* asset-1  |  *Bucket ID:* 101  |  *Bucket Name:* bucket-1"
            ),
            other => panic!("Expected section, got {other:?}"),
        }
        match &blocks[3] {
            SlackBlock::Actions { elements, .. } => match &elements[0] {
                SlackBlockElement::Button {
                    action_id, value, ..
                } => {
                    assert_eq!(action_id, VIEW_BACKUPS_ACTION);
                    let decoded = ButtonValue::decode(value.as_deref().unwrap()).unwrap();
                    assert_eq!(decoded, ButtonValue::from(&item(1)));
                }
                other => panic!("Expected button, got {other:?}"),
            },
            other => panic!("Expected actions, got {other:?}"),
        }
        match &blocks[7] {
            SlackBlock::Section { text, .. } => assert_eq!(text.text, "*Total:* 2 buckets"),
            other => panic!("Expected section, got {other:?}"),
        }
    }

    #[test]
    fn test_inventory_without_buttons() {
        let message = format_inventory_message(&[item(1)], None, false);
        assert_eq!(
            block_types(&message),
            vec!["header", "divider", "section", "divider", "section"]
        );
    }

    #[test]
    fn test_inventory_empty_renders_code_block() {
        let message = format_inventory_message(&[], Some("42"), true);
        let blocks = message.blocks.unwrap();
        match &blocks[2] {
            SlackBlock::Section { text, .. } => assert_eq!(text.text, "```[]```"),
            other => panic!("Expected section, got {other:?}"),
        }
    }

    #[test]
    fn test_inventory_respects_block_limit() {
        let items: Vec<_> = (0..40).map(item).collect();
        let message = format_inventory_message(&items, None, true);
        let blocks = message.blocks.unwrap();
        assert!(blocks.len() <= MAX_BLOCKS);
        assert!(blocks.iter().any(|b| matches!(
            b,
            SlackBlock::Context { elements } if matches!(&elements[0], SlackContextElement::Mrkdwn { text } if text.starts_with("…and "))
        )));
    }

    #[test]
    fn test_backups_truncated_to_max_display() {
        let target = ButtonValue::from(&item(1));
        let backups: Vec<_> = (0..8).map(backup).collect();
        let message = format_backups_message(&target, &backups, 5, false);

        let blocks = message.blocks.unwrap();
        let sections = blocks
            .iter()
            .filter(|b| {
                matches!(b, SlackBlock::Section { text, .. } if text.text.starts_with("*Backup ID:*"))
            })
            .count();
        assert_eq!(sections, 5);

        let more = blocks.iter().find_map(|b| match b {
            SlackBlock::Context { elements } => match &elements[0] {
                SlackContextElement::Mrkdwn { text } => Some(text.clone()),
                _ => None,
            },
            _ => None,
        });
        assert_eq!(more.as_deref(), Some("…and 3 more"));
        assert_eq!(message.text.as_deref(), Some("8 backup(s) for bucket-1"));
    }

    #[test]
    fn test_backups_include_object_select_when_interactive() {
        let target = ButtonValue::from(&item(1));
        let message = format_backups_message(&target, &[backup(1)], 10, true);
        let json = serde_json::to_value(&message).unwrap();
        let last = json["blocks"].as_array().unwrap().last().unwrap().clone();
        assert_eq!(last["type"], "actions");
        assert_eq!(last["block_id"], "object_select:101");
        assert_eq!(last["elements"][0]["type"], "external_select");
        assert_eq!(last["elements"][0]["action_id"], SELECT_OBJECT_ACTION);
    }

    #[test]
    fn test_format_json_message() {
        let value = serde_json::json!({"task_id": "t-1"});
        let message = format_json_message("Clumio Restore", &value);
        assert_eq!(block_types(&message), vec!["header", "divider", "section"]);
    }

    #[test]
    fn test_format_error_response() {
        let message = format_error_response("backend exploded");
        assert_eq!(message.text.as_deref(), Some("backend exploded"));
        let blocks = message.blocks.unwrap();
        assert!(
            matches!(&blocks[1], SlackBlock::Section { text, .. } if text.text == "```backend exploded```")
        );
    }

    #[test]
    fn test_header_truncated() {
        let message = SlackMessageBuilder::new().header("h".repeat(400)).build();
        match &message.blocks.unwrap()[0] {
            SlackBlock::Header { text } => assert_eq!(text.text.chars().count(), HEADER_TEXT_LIMIT),
            other => panic!("Expected header, got {other:?}"),
        }
    }

    #[test]
    fn test_divider_serialization() {
        let json = serde_json::to_value(SlackBlock::Divider {}).unwrap();
        assert_eq!(json, serde_json::json!({"type": "divider"}));
    }
}
