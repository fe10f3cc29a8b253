//! Typed requests and projections of Clumio payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ClumioError, Result};

/// Kind of protected resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    S3,
    Ec2,
}

impl ResourceType {
    /// Accepted spellings, in display order.
    pub const VALUES: [&'static str; 2] = ["s3", "ec2"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Ec2 => "ec2",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ClumioError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "s3" => Ok(Self::S3),
            "ec2" => Ok(Self::Ec2),
            other => Err(ClumioError::InvalidRequest(format!(
                "Invalid type value: {}. Accepted values: {}",
                other,
                Self::VALUES.join(", ")
            ))),
        }
    }
}

/// Returns true for a non-empty string of ASCII digits.
///
/// No width check is applied; see [`RestoreRequest::body`] for how oversized
/// ids are sent.
pub fn is_numeric_id(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Request for an inventory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRequest {
    pub resource_type: ResourceType,
    /// AWS account id. Required for S3, ignored for EC2.
    pub account_id: Option<String>,
}

/// Request for a restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    pub resource_type: ResourceType,
    pub bucket_name: Option<String>,
    /// Digits only, kept as text.
    pub bucket_id: Option<String>,
    pub object_key: Option<String>,
}

impl RestoreRequest {
    pub fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            bucket_name: None,
            bucket_id: None,
            object_key: None,
        }
    }

    /// JSON body for the restore call, containing only populated fields.
    ///
    /// `bucket_id` is sent as an integer when it fits in a `u64`, otherwise
    /// the digit string is forwarded untouched.
    pub fn body(&self) -> Value {
        let mut body = serde_json::Map::new();
        if let Some(name) = self.bucket_name.as_deref().filter(|n| !n.is_empty()) {
            body.insert("bucket_name".to_string(), Value::from(name));
        }
        if let Some(id) = self.bucket_id.as_deref().filter(|i| !i.is_empty()) {
            let value = id.parse::<u64>().map(Value::from).unwrap_or_else(|_| Value::from(id));
            body.insert("bucket_id".to_string(), value);
        }
        if let Some(key) = self.object_key.as_deref().filter(|k| !k.is_empty()) {
            body.insert("object_key".to_string(), Value::from(key));
        }
        Value::Object(body)
    }
}

/// Items of a Clumio list response (`_embedded.items`), or an empty slice.
pub fn embedded_items(value: &Value) -> &[Value] {
    value
        .get("_embedded")
        .and_then(|e| e.get("items"))
        .and_then(|i| i.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// First present field among `keys`, rendered as text.
fn field_text(raw: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

/// A protected S3 bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub bucket_id: String,
    pub bucket_name: String,
}

impl InventoryItem {
    pub fn from_raw(raw: &Value) -> Self {
        Self {
            id: field_text(raw, &["id"]),
            bucket_id: field_text(raw, &["bucket_id"]),
            bucket_name: field_text(raw, &["bucket_name"]),
        }
    }
}

/// A backup of an S3 asset. Display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: String,
    pub timestamp: String,
    pub status: String,
    pub size: String,
}

impl BackupRecord {
    pub fn from_raw(raw: &Value) -> Self {
        Self {
            id: field_text(raw, &["id"]),
            timestamp: field_text(raw, &["start_timestamp", "timestamp", "created_timestamp"]),
            status: field_text(raw, &["status", "type"]),
            size: field_text(raw, &["size", "total_size"]),
        }
    }
}

/// An object stored in a protected bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub key: String,
    pub size: String,
}

impl ObjectEntry {
    pub fn from_raw(raw: &Value) -> Self {
        Self {
            key: field_text(raw, &["object_key", "key", "name"]),
            size: field_text(raw, &["size"]),
        }
    }
}

/// Result of an inventory call.
#[derive(Debug, Clone, PartialEq)]
pub enum Inventory {
    /// S3 assets projected to [`InventoryItem`].
    Buckets(Vec<InventoryItem>),
    /// Anything else, passed through as returned by Clumio.
    Passthrough(Value),
}

impl Inventory {
    /// Plain JSON rendition for API callers.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Buckets(items) => serde_json::to_value(items).unwrap_or(Value::Array(Vec::new())),
            Self::Passthrough(raw) => raw.clone(),
        }
    }
}
