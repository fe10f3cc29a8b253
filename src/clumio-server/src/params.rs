//! Parameter resolution for inbound requests.
//!
//! A request may carry its parameters in the query string, a JSON body, a
//! form body or the free text of a Slack slash command. Each field is looked
//! up through these sources in order and the first non-empty value wins:
//!
//! 1. query string
//! 2. JSON body (parse failures and non-objects contribute nothing)
//! 3. form fields by name, then the form `text` field parsed as command text
//! 4. query and form pairs together, then the first `text` among them
//!
//! Validation runs afterwards and reports every problem at once.

use std::fmt;

use clumio_client::{InventoryRequest, ResourceType, RestoreRequest, is_numeric_id};
use clumio_slack::commands::{CommandArgs, parse_command_text};
use serde::Serialize;
use serde_json::Value;

/// Request parameters known to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Type,
    Account,
    BucketName,
    BucketId,
    ObjectKey,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Type,
        Field::Account,
        Field::BucketName,
        Field::BucketId,
        Field::ObjectKey,
    ];

    /// Parameter name as it appears on the wire.
    pub fn key(self) -> &'static str {
        match self {
            Field::Type => "type",
            Field::Account => "account",
            Field::BucketName => "bucket-name",
            Field::BucketId => "bucket-id",
            Field::ObjectKey => "object-key",
        }
    }
}

/// An inbound request reduced to what resolution needs.
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    json: Option<serde_json::Map<String, Value>>,
}

impl RawRequest {
    /// Build from the raw query string, `Content-Type` header and body.
    ///
    /// The body is read as a form only when the content type says so; any
    /// body is tried as a JSON object.
    pub fn new(query: Option<&str>, content_type: Option<&str>, body: &[u8]) -> Self {
        let query = query.map(|q| decode_pairs(q.as_bytes())).unwrap_or_default();

        let is_form = content_type
            .map(|ct| {
                ct.trim()
                    .to_ascii_lowercase()
                    .starts_with("application/x-www-form-urlencoded")
            })
            .unwrap_or(false);
        let form = if is_form { decode_pairs(body) } else { Vec::new() };

        let json = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        };

        Self { query, form, json }
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn form_pairs(&self) -> &[(String, String)] {
        &self.form
    }

    /// First value of a form field.
    pub fn form_value(&self, name: &str) -> Option<&str> {
        first_value(&self.form, name)
    }
}

fn decode_pairs(input: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(input).into_owned().collect()
}

fn first_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, v)| k == name && !v.is_empty())
        .map(|(_, v)| v.as_str())
}

/// JSON scalars as text; objects, arrays and null count as absent.
fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parameters after resolution, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedParams {
    pub resource_type: Option<String>,
    pub account: Option<String>,
    pub bucket_name: Option<String>,
    pub bucket_id: Option<String>,
    pub object_key: Option<String>,
}

impl ResolvedParams {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Type => &self.resource_type,
            Field::Account => &self.account,
            Field::BucketName => &self.bucket_name,
            Field::BucketId => &self.bucket_id,
            Field::ObjectKey => &self.object_key,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Type => &mut self.resource_type,
            Field::Account => &mut self.account,
            Field::BucketName => &mut self.bucket_name,
            Field::BucketId => &mut self.bucket_id,
            Field::ObjectKey => &mut self.object_key,
        }
    }

    /// Set `field` unless it already has a value or `value` is empty.
    fn fill(&mut self, field: Field, value: Option<&str>) {
        let slot = self.slot_mut(field);
        if slot.is_none()
            && let Some(value) = value.filter(|v| !v.is_empty())
        {
            *slot = Some(value.to_string());
        }
    }

    fn fill_from_args(&mut self, args: &CommandArgs) {
        for field in Field::ALL {
            self.fill(field, args.get(field.key()));
        }
    }

    fn resource_type(&self, errors: &mut Vec<ValidationError>) -> Option<ResourceType> {
        let raw = self.resource_type.as_deref().unwrap_or("s3");
        match raw.parse() {
            Ok(resource_type) => Some(resource_type),
            Err(_) => {
                errors.push(ValidationError::invalid_type(raw));
                None
            }
        }
    }

    /// Validate for an inventory call.
    pub fn inventory_request(&self) -> Result<InventoryRequest, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let resource_type = self.resource_type(&mut errors);

        if resource_type == Some(ResourceType::S3) && self.account.is_none() {
            errors.push(ValidationError::missing_account());
        }

        match resource_type {
            Some(resource_type) if errors.is_empty() => Ok(InventoryRequest {
                resource_type,
                account_id: match resource_type {
                    ResourceType::S3 => self.account.clone(),
                    ResourceType::Ec2 => None,
                },
            }),
            _ => Err(errors),
        }
    }

    /// Validate for a restore call.
    pub fn restore_request(&self) -> Result<RestoreRequest, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let resource_type = self.resource_type(&mut errors);

        let bucket_id = self.bucket_id.as_deref();
        if let Some(id) = bucket_id.filter(|id| !is_numeric_id(id)) {
            errors.push(ValidationError::invalid_bucket_id(id));
        }

        let Some(resource_type) = resource_type.filter(|_| errors.is_empty()) else {
            return Err(errors);
        };

        let mut request = RestoreRequest::new(resource_type);
        request.bucket_name = self.bucket_name.clone();
        request.bucket_id = bucket_id.map(str::to_string);
        request.object_key = self.object_key.clone();
        Ok(request)
    }
}

/// Resolve parameters from every source.
pub fn resolve(request: &RawRequest) -> ResolvedParams {
    let mut params = ResolvedParams::default();

    for field in Field::ALL {
        params.fill(field, first_value(&request.query, field.key()));
    }

    if let Some(json) = &request.json {
        for field in Field::ALL {
            let value = json.get(field.key()).and_then(json_text);
            params.fill(field, value.as_deref());
        }
    }

    for field in Field::ALL {
        params.fill(field, first_value(&request.form, field.key()));
    }
    if let Some(text) = first_value(&request.form, "text") {
        params.fill_from_args(&parse_command_text(text));
    }

    let values: Vec<(String, String)> = request
        .query
        .iter()
        .chain(request.form.iter())
        .cloned()
        .collect();
    for field in Field::ALL {
        params.fill(field, first_value(&values, field.key()));
    }
    if let Some(text) = first_value(&values, "text") {
        params.fill_from_args(&parse_command_text(text));
    }

    params
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    InvalidType,
    MissingAccount,
    InvalidBucketId,
}

/// A rejected parameter, with a hint showing correct usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    #[serde(rename = "error")]
    pub message: String,
    pub kind: ValidationKind,
    pub field: &'static str,
    pub value: Option<String>,
    pub example: &'static str,
}

impl ValidationError {
    fn invalid_type(value: &str) -> Self {
        Self {
            message: format!(
                "Invalid type value: {}. Accepted values: {}",
                value,
                ResourceType::VALUES.join(", ")
            ),
            kind: ValidationKind::InvalidType,
            field: Field::Type.key(),
            value: Some(value.to_string()),
            example: "type=s3",
        }
    }

    fn missing_account() -> Self {
        Self {
            message: "Missing required parameter: account".to_string(),
            kind: ValidationKind::MissingAccount,
            field: Field::Account.key(),
            value: None,
            example: "/inventory type=s3 account=123456789012",
        }
    }

    fn invalid_bucket_id(value: &str) -> Self {
        Self {
            message: "bucket-id must be numeric".to_string(),
            kind: ValidationKind::InvalidBucketId,
            field: Field::BucketId.key(),
            value: Some(value.to_string()),
            example: "bucket-id=1234567890",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (example: {})", self.message, self.example)
    }
}
