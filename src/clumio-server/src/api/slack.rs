//! Slack webhooks. Every handler answers 200; failures are logged or sent
//! back through `response_url`.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use clumio_slack::events::{EventsApiPayload, SlackEvent, parse_event, parse_payload};
use clumio_slack::interactive::parse_interaction;
use clumio_slack::messages::format_help_message;
use clumio_slack::options::{OptionsResponse, parse_suggestion, suggest_objects};
use tracing::{debug, error, info, warn};

use super::raw_request;
use crate::state::AppState;

/// Slack gives up on option requests after three seconds.
const OPTIONS_DEADLINE: Duration = Duration::from_millis(2500);

/// `GET /slack/events`, for reachability checks.
pub async fn events_probe() -> &'static str {
    "ok"
}

/// `POST /slack/events`: URL verification and app mentions.
pub async fn events(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let payload = match parse_payload(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Ignoring events request: {}", e);
            return StatusCode::OK.into_response();
        }
    };

    match payload {
        EventsApiPayload::UrlVerification { challenge } => {
            info!("Answering Slack URL verification");
            Json(serde_json::json!({ "challenge": challenge })).into_response()
        }
        EventsApiPayload::EventCallback { event, event_id, .. } => {
            debug!("Event callback {:?}", event_id);
            if let SlackEvent::AppMention(mention) = parse_event(&event)
                && let Some(slack) = state.slack.clone()
            {
                tokio::spawn(async move {
                    let help = format_help_message().in_thread(mention.reply_thread());
                    if let Err(e) = slack.post_message(&mention.channel, &help).await {
                        error!("Failed to answer mention in {}: {}", mention.channel, e);
                    }
                });
            }
            StatusCode::OK.into_response()
        }
        EventsApiPayload::Unknown => StatusCode::OK.into_response(),
    }
}

/// `POST /slack/interactive`: acknowledge at once, work in the background.
pub async fn interactive(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let request = raw_request(&uri, &headers, &body);
    let Some(payload) = request.form_value("payload") else {
        warn!("Interaction request without payload field");
        return StatusCode::OK;
    };

    if let Err(e) = parse_interaction(payload) {
        warn!("Acknowledging undecodable interaction: {}", e);
    }

    match &state.flows {
        Some(flows) => {
            if let Err(e) = flows.submit(payload.to_string()) {
                error!("Failed to queue interaction: {}", e);
            }
        }
        None => warn!("Interaction received but Slack support is disabled"),
    }

    StatusCode::OK
}

/// `POST /slack/options`: object choices for the restore select.
pub async fn options(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Json<OptionsResponse> {
    let request = raw_request(&uri, &headers, &body);
    let Some(raw) = request.form_value("payload") else {
        warn!("Options request without payload field");
        return Json(OptionsResponse::default());
    };

    let suggestion = match parse_suggestion(raw) {
        Ok(suggestion) => suggestion,
        Err(e) => {
            warn!("Ignoring options request: {}", e);
            return Json(OptionsResponse::default());
        }
    };

    let listing = suggest_objects(&state.clumio, &suggestion);
    match tokio::time::timeout(OPTIONS_DEADLINE, listing).await {
        Ok(Ok(options)) => Json(options),
        Ok(Err(e)) => {
            error!("Failed to list objects: {}", e);
            Json(OptionsResponse::default())
        }
        Err(_) => {
            warn!("Object listing exceeded the options deadline");
            Json(OptionsResponse::default())
        }
    }
}
