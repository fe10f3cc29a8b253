//! Caller detection and response envelopes.
//!
//! Whether a request came from a Slack slash command is decided by its form
//! fields alone, never by `Accept` headers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clumio_slack::commands::{CommandContext, SlashCommandResponse};
use clumio_slack::messages::format_error_response;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::params::RawRequest;

/// Who sent the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerKind {
    /// Programmatic caller; receives plain JSON and real status codes.
    Api,
    /// Slack slash command; always receives 200 with a message.
    Chat(CommandContext),
}

impl CallerKind {
    pub fn detect(request: &RawRequest) -> Self {
        match CommandContext::from_form(request.form_pairs()) {
            Some(context) => {
                debug!(
                    "Slash command {} from user {}",
                    context.command, context.user_id
                );
                Self::Chat(context)
            }
            None => Self::Api,
        }
    }

    pub fn is_chat(&self) -> bool {
        matches!(self, Self::Chat(_))
    }
}

/// A successful reply in the shape the caller expects.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    PlainJson(serde_json::Value),
    ChatBlocks(SlashCommandResponse),
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        match self {
            Self::PlainJson(value) => (StatusCode::OK, Json(value)).into_response(),
            Self::ChatBlocks(message) => (StatusCode::OK, Json(message)).into_response(),
        }
    }
}

/// Chat rendition of an error, visible only to the invoking user.
pub fn chat_error(error: &AppError) -> ResponseEnvelope {
    let text = match error {
        AppError::Validation(errors) => errors
            .iter()
            .map(|e| format!("{}\nExample: {}", e.message, e.example))
            .collect::<Vec<_>>()
            .join("\n\n"),
        other => other.to_string(),
    };
    ResponseEnvelope::ChatBlocks(
        SlashCommandResponse::from(format_error_response(&text)).ephemeral(),
    )
}

/// Turn a handler outcome into an HTTP response for `caller`.
pub fn respond(caller: &CallerKind, result: AppResult<ResponseEnvelope>) -> Response {
    match result {
        Ok(envelope) => envelope.into_response(),
        Err(error) => {
            warn!("Request failed: {}", error);
            if caller.is_chat() {
                chat_error(&error).into_response()
            } else {
                error.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clumio_client::ClumioError;
    use clumio_slack::commands::ResponseType;

    const FORM: &str = "application/x-www-form-urlencoded";

    #[test]
    fn test_detect_chat() {
        let request = RawRequest::new(
            None,
            Some(FORM),
            b"command=%2Finventory&text=s3&user_id=U1&response_url=https%3A%2F%2Fhooks.slack.com%2Fx",
        );
        match CallerKind::detect(&request) {
            CallerKind::Chat(context) => assert_eq!(context.command, "/inventory"),
            CallerKind::Api => panic!("Expected chat caller"),
        }
    }

    #[test]
    fn test_detect_api() {
        let request = RawRequest::new(Some("command=/inventory&user_id=U1"), None, b"");
        assert_eq!(CallerKind::detect(&request), CallerKind::Api);

        let request = RawRequest::new(None, Some(FORM), b"type=s3&account=1");
        assert_eq!(CallerKind::detect(&request), CallerKind::Api);
    }

    #[test]
    fn test_chat_error_is_ephemeral() {
        let error = AppError::from(ClumioError::Network("refused".to_string()));
        let ResponseEnvelope::ChatBlocks(message) = chat_error(&error) else {
            panic!("Expected chat blocks");
        };
        assert_eq!(message.response_type, Some(ResponseType::Ephemeral));
        assert!(message.text.unwrap().contains("refused"));
    }

    #[test]
    fn test_respond_status() {
        let error = || AppError::Internal("boom".to_string());
        assert_eq!(
            respond(&CallerKind::Api, Err(error())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let context = CommandContext {
            command: "/inventory".to_string(),
            text: String::new(),
            user_id: "U1".to_string(),
            channel_id: String::new(),
            team_id: String::new(),
            response_url: String::new(),
        };
        assert_eq!(
            respond(&CallerKind::Chat(context), Err(error())).status(),
            StatusCode::OK
        );
    }
}
