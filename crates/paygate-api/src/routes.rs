//! API route definitions.

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;

use crate::handlers::{checkout, health, metered, store, usage, webhook};
use crate::middleware;
use crate::state::AppState;

/// Create the main API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/api", get(metered::call_api))
        .route("/checkout", get(checkout::checkout))
        .route("/success", get(checkout::success))
        .route("/error", get(checkout::checkout_error))
        .route("/webhook", post(webhook::receive))
        .route("/usage/{customer}", get(usage::upcoming_invoice))
        .route("/health", get(health::health))
        .route("/ready", get(health::ready));

    if state.settings.expose_store {
        router = router.route("/mock/db", get(store::dump));
    }

    router.with_state(state)
}

/// Router with the middleware stack applied.
pub fn build_app(state: Arc<AppState>) -> Router {
    create_router(state)
        .layer(from_fn(middleware::request_id))
        .layer(middleware::trace_layer())
        .layer(middleware::sensitive_headers_layer())
        .layer(middleware::cors_layer())
}
