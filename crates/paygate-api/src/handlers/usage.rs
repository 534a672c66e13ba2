//! Usage reporting.

use axum::{
    Json,
    extract::{Path, State},
};
use paygate_core::Error;
use paygate_core::billing::UpcomingInvoice;
use paygate_core::ids::CustomerId;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// The customer's upcoming invoice, including metered usage so far.
///
/// Only customers this gateway has issued keys to are looked up.
pub async fn upcoming_invoice(
    State(state): State<Arc<AppState>>,
    Path(customer): Path<String>,
) -> Result<Json<UpcomingInvoice>, ApiError> {
    let customer_id = CustomerId::new(customer);
    if state.store.find_by_customer(&customer_id).await?.is_empty() {
        return Err(Error::CustomerNotFound(customer_id.to_string()).into());
    }

    let invoice = state.billing.upcoming_invoice(&customer_id).await?;
    Ok(Json(invoice))
}
