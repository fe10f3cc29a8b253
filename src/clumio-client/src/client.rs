//! Clumio client implementation

use std::time::Duration;

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, error};

use crate::models::{
    BackupRecord, Inventory, InventoryItem, InventoryRequest, ObjectEntry, ResourceType,
    RestoreRequest, embedded_items,
};
use crate::{CLUMIO_API_VERSION, ClumioError, Result};

/// Build a URL-encoded Clumio filter predicate, e.g.
/// `{"account_native_id":{"$eq":"123"}}`.
pub fn encode_filter(field: &str, op: &str, value: &str) -> String {
    let predicate = serde_json::json!({ field: { op: value } });
    urlencoding::encode(&predicate.to_string()).into_owned()
}

/// Client for the Clumio REST API.
#[derive(Clone)]
pub struct ClumioClient {
    client: reqwest::Client,
    base_url: String,
    api_token: SecretString,
}

impl std::fmt::Debug for ClumioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClumioClient")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl ClumioClient {
    /// Create a client for `base_url`. Every call is bounded by `timeout`.
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| ClumioError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: SecretString::new(api_token.into().into()),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header(
                "Authorization",
                format!("Bearer {}", self.api_token.expose_secret()),
            )
            .header("Accept", "application/json")
            .header("Clumio-Api-Version", CLUMIO_API_VERSION)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Clumio API returned {}: {}", status, body);
            return Err(ClumioError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value> {
        let url = self.url(endpoint);
        debug!("GET {}", url);
        self.send(self.client.get(&url)).await
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value> {
        let url = self.url(endpoint);
        debug!("POST {}", url);
        self.send(self.client.post(&url).json(body)).await
    }

    /// Fetch an inventory listing.
    ///
    /// S3 assets are projected to [`InventoryItem`]; EC2 is passed through.
    pub async fn inventory(&self, request: &InventoryRequest) -> Result<Inventory> {
        match request.resource_type {
            ResourceType::S3 => {
                let account_id = request.account_id.as_deref().ok_or_else(|| {
                    ClumioError::InvalidRequest("account is required for s3 inventory".to_string())
                })?;
                Ok(Inventory::Buckets(self.list_s3_assets(account_id).await?))
            }
            ResourceType::Ec2 => Ok(Inventory::Passthrough(
                self.get_json("/inventory/protected-items/aws/ec2").await?,
            )),
        }
    }

    /// List S3 protection-group assets of one AWS account.
    pub async fn list_s3_assets(&self, account_native_id: &str) -> Result<Vec<InventoryItem>> {
        let endpoint = format!(
            "/datasources/protection-groups/s3-assets?filter={}",
            encode_filter("account_native_id", "$eq", account_native_id)
        );
        let raw = self.get_json(&endpoint).await?;
        Ok(embedded_items(&raw)
            .iter()
            .map(InventoryItem::from_raw)
            .collect())
    }

    /// List backups of an S3 asset.
    pub async fn list_backups(&self, asset_id: &str) -> Result<Vec<BackupRecord>> {
        let endpoint = format!(
            "/backups/protection-groups/s3-assets?filter={}",
            encode_filter("protection_group_s3_asset_id", "$eq", asset_id)
        );
        let raw = self.get_json(&endpoint).await?;
        Ok(embedded_items(&raw)
            .iter()
            .map(BackupRecord::from_raw)
            .collect())
    }

    /// List objects of a protected bucket, optionally narrowed by key prefix.
    pub async fn list_objects(
        &self,
        bucket_id: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectEntry>> {
        let mut endpoint = format!(
            "/datasources/protection-groups/s3-assets/{}/objects",
            urlencoding::encode(bucket_id)
        );
        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            endpoint.push_str("?filter=");
            endpoint.push_str(&encode_filter("object_key", "$begins_with", prefix));
        }
        let raw = self.get_json(&endpoint).await?;
        Ok(embedded_items(&raw)
            .iter()
            .map(ObjectEntry::from_raw)
            .collect())
    }

    /// Start a restore. Returns the raw Clumio response.
    pub async fn restore(&self, request: &RestoreRequest) -> Result<Value> {
        let endpoint = format!("/restore/aws/{}", request.resource_type.as_str());
        self.post_json(&endpoint, &request.body()).await
    }
}
