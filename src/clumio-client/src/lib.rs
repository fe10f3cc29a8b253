//! Clumio REST API client.
//!
//! This crate wraps the handful of Clumio endpoints the Slack bridge needs:
//! - S3 protection-group assets and EC2 protected items (inventory)
//! - Backups of an S3 asset
//! - Objects inside a protected bucket
//! - Restores of S3/EC2 resources
//!
//! Raw vendor items are projected into small typed records
//! ([`InventoryItem`], [`BackupRecord`], [`ObjectEntry`]); everything else in
//! the vendor payload is dropped.

mod client;
mod models;

pub use client::{ClumioClient, encode_filter};
pub use models::{
    BackupRecord, Inventory, InventoryItem, InventoryRequest, ObjectEntry, ResourceType,
    RestoreRequest, embedded_items, is_numeric_id,
};

/// Default Clumio API base URL.
pub const DEFAULT_CLUMIO_URL: &str = "https://api.clumio.com";

/// API version header value sent with every request.
pub const CLUMIO_API_VERSION: &str = "1.0";

/// Error types for Clumio operations.
#[derive(Debug, thiserror::Error)]
pub enum ClumioError {
    #[error("Clumio API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Clumio request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for ClumioError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClumioError::Timeout(err.to_string())
        } else if err.is_connect() {
            ClumioError::Network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            ClumioError::Network(format!("Invalid response body: {}", err))
        } else {
            ClumioError::Network(err.to_string())
        }
    }
}

/// Result type for Clumio operations.
pub type Result<T> = std::result::Result<T, ClumioError>;
