//! `/inventory`: protected S3 buckets or EC2 instances.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use clumio_client::Inventory;
use clumio_slack::messages::{format_inventory_message, format_json_message};
use tracing::info;

use super::raw_request;
use crate::error::{AppError, AppResult};
use crate::params::{RawRequest, resolve};
use crate::respond::{CallerKind, ResponseEnvelope, respond};
use crate::state::AppState;

pub async fn inventory(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = raw_request(&uri, &headers, &body);
    let caller = CallerKind::detect(&request);
    let result = list(&state, &request, &caller).await;
    respond(&caller, result)
}

async fn list(
    state: &AppState,
    request: &RawRequest,
    caller: &CallerKind,
) -> AppResult<ResponseEnvelope> {
    let inventory_request = resolve(request)
        .inventory_request()
        .map_err(AppError::Validation)?;
    info!(
        "Inventory request: type={}",
        inventory_request.resource_type
    );

    let inventory = state.clumio.inventory(&inventory_request).await?;

    if !caller.is_chat() {
        return Ok(ResponseEnvelope::PlainJson(inventory.to_json()));
    }

    let message = match &inventory {
        Inventory::Buckets(items) => format_inventory_message(
            items,
            inventory_request.account_id.as_deref(),
            state.interactive(),
        ),
        Inventory::Passthrough(raw) => format_json_message(
            &format!(
                "Clumio {} Inventory",
                inventory_request.resource_type.as_str().to_uppercase()
            ),
            raw,
        ),
    };
    Ok(ResponseEnvelope::ChatBlocks(message.into()))
}
