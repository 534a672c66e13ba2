//! Liveness and readiness.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub webhooks_signed: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        webhooks_signed: state.webhooks.is_signed(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_records: Option<usize>,
}

/// Ready once the customer store answers.
pub async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadinessResponse>) {
    match state.store.snapshot().await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                customer_records: Some(snapshot.len()),
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Customer store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "unavailable",
                    customer_records: None,
                }),
            )
        }
    }
}
