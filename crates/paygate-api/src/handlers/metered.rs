//! The paid endpoint.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use paygate_core::billing::{RecordedUsage, UsageRecord};
use paygate_core::{AccessDecision, verify};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the customer's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Serialize)]
pub struct MeteredResponse {
    pub data: String,
    pub usage: RecordedUsage,
}

/// Serve paid data and bill one unit of usage for it.
pub async fn call_api(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MeteredResponse>, ApiError> {
    // Keys are hex; a header that is not even UTF-8 cannot match one.
    let presented = match headers.get(API_KEY_HEADER).map(|v| v.to_str()) {
        None => None,
        Some(Ok(key)) => Some(key),
        Some(Err(_)) => {
            warn!("Rejected non-UTF-8 x-api-key header");
            return Err(ApiError::new(StatusCode::FORBIDDEN, "Not authorized"));
        }
    };

    let record = match verify(state.store.as_ref(), presented).await? {
        AccessDecision::MissingCredential => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "Missing x-api-key header",
            ));
        }
        AccessDecision::UnknownKey | AccessDecision::Inactive(_) => {
            return Err(ApiError::new(StatusCode::FORBIDDEN, "Not authorized"));
        }
        AccessDecision::Granted(record) => record,
    };

    let usage = state
        .billing
        .create_usage_record(&UsageRecord::increment(
            record.subscription_item_id.clone(),
            1,
        ))
        .await?;

    info!(
        customer_id = %record.customer_id,
        usage_record = %usage.id,
        "Recorded API usage"
    );

    Ok(Json(MeteredResponse {
        data: "paid for information".to_string(),
        usage,
    }))
}
