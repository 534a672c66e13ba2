//! Checkout flow handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
};
use paygate_core::billing::CheckoutRequest;
use paygate_core::ids::CheckoutSessionId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Start a subscription checkout and send the browser to it.
pub async fn checkout(State(state): State<Arc<AppState>>) -> Result<Redirect, ApiError> {
    let request = CheckoutRequest {
        price_id: state.settings.price_id.clone(),
        success_url: state.settings.success_url(),
        cancel_url: state.settings.cancel_url(),
    };

    let session = state.billing.create_checkout_session(&request).await?;
    info!(session_id = %session.id, "Redirecting to checkout");
    Ok(Redirect::to(&session.url))
}

#[derive(Debug, Deserialize)]
pub struct SuccessParams {
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub data: SuccessData,
}

#[derive(Serialize)]
pub struct SuccessData {
    pub session_id: Option<String>,
    /// Present only on the first visit after the key was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

pub async fn success(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuccessParams>,
) -> Json<SuccessResponse> {
    let api_key = match &params.session_id {
        Some(id) => state
            .reveals
            .take(&CheckoutSessionId::new(id.as_str()))
            .await
            .map(|key| key.expose().to_string()),
        None => None,
    };

    Json(SuccessResponse {
        data: SuccessData {
            session_id: params.session_id,
            api_key,
        },
    })
}

pub async fn checkout_error() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "Error at checkout")
}
