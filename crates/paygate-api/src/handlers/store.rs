//! Store inspection for local development.

use axum::{Json, extract::State};
use paygate_core::StoreSnapshot;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// Dump every customer record. Fingerprints only, never raw keys.
pub async fn dump(State(state): State<Arc<AppState>>) -> Result<Json<StoreSnapshot>, ApiError> {
    Ok(Json(state.store.snapshot().await?))
}
