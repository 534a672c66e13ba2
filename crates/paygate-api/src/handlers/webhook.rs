//! Billing webhook receiver.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use paygate_billing::{SIGNATURE_HEADER, process_webhook};
use paygate_core::ports::EventClaim;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::provisioner::Provisioner;
use crate::state::AppState;

pub async fn receive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let event = state.webhooks.open(&body, signature).map_err(|e| {
        warn!(error = %e, "Webhook rejected");
        ApiError::new(StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let event_id = event.id.clone();
    if let Some(id) = &event_id {
        match state.events.begin(id).await? {
            EventClaim::Claimed => {}
            EventClaim::Done => {
                info!(event_id = %id, "Duplicate webhook ignored");
                return Ok(StatusCode::OK);
            }
            // Not acknowledged, so Stripe redelivers if the first attempt fails.
            EventClaim::InFlight => {
                info!(event_id = %id, "Webhook already being processed");
                return Err(ApiError::new(
                    StatusCode::CONFLICT,
                    "Event is already being processed",
                ));
            }
        }
    }

    let provisioner = Provisioner::from_state(&state);
    if let Err(e) = process_webhook(&provisioner, event).await {
        if let Some(id) = &event_id {
            state.events.release(id).await?;
        }

        let status = if e.is_rejection() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        warn!(error = %e, status = %status, "Webhook processing failed");
        return Err(ApiError::new(status, e.to_string()));
    }

    if let Some(id) = &event_id {
        state.events.complete(id).await?;
    }
    Ok(StatusCode::OK)
}
