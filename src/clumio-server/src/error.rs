//! Error types for the bridge server.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clumio_client::ClumioError;
use serde_json::json;
use thiserror::Error;

use crate::params::ValidationError;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// One or more parameters were rejected. Never reaches Clumio.
    #[error("{}", describe(.0))]
    Validation(Vec<ValidationError>),

    /// Clumio call failed (status, network, timeout, bad body).
    #[error(transparent)]
    Backend(#[from] ClumioError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Backend(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Backend(_) => "backend_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Plain JSON body for API callers.
    ///
    /// Validation failures put the first error at the top level and list all
    /// of them under `errors` when there is more than one.
    pub fn body(&self) -> serde_json::Value {
        match self {
            Self::Validation(errors) => {
                let mut body = errors
                    .first()
                    .and_then(|e| serde_json::to_value(e).ok())
                    .unwrap_or_else(|| json!({"error": "Validation failed"}));
                if errors.len() > 1 {
                    body["errors"] = json!(errors);
                }
                body
            }
            other => json!({
                "error": other.to_string(),
                "code": other.error_code(),
            }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.body())).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Internal(error.to_string())
    }
}

/// Result type for the bridge server.
pub type AppResult<T> = Result<T, AppError>;
