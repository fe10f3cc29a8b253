//! `/restore`: start a restore of an S3 bucket, object or EC2 resource.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use clumio_slack::messages::format_json_message;
use tracing::info;

use super::raw_request;
use crate::error::{AppError, AppResult};
use crate::params::{RawRequest, resolve};
use crate::respond::{CallerKind, ResponseEnvelope, respond};
use crate::state::AppState;

pub async fn restore(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = raw_request(&uri, &headers, &body);
    let caller = CallerKind::detect(&request);
    let result = start(&state, &request, &caller).await;
    respond(&caller, result)
}

async fn start(
    state: &AppState,
    request: &RawRequest,
    caller: &CallerKind,
) -> AppResult<ResponseEnvelope> {
    let restore_request = resolve(request)
        .restore_request()
        .map_err(AppError::Validation)?;
    info!(
        "Restore request: type={} bucket_id={:?}",
        restore_request.resource_type, restore_request.bucket_id
    );

    let result = state.clumio.restore(&restore_request).await?;

    Ok(if caller.is_chat() {
        ResponseEnvelope::ChatBlocks(
            format_json_message("Clumio Restore Started", &result).into(),
        )
    } else {
        ResponseEnvelope::PlainJson(result)
    })
}
