//! HTTP API server for Paygate.
//!
//! Serves the metered endpoint, the checkout flow and the billing webhook.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod provisioner;
pub mod reveals;
pub mod routes;
pub mod state;


pub use error::ApiError;
pub use provisioner::Provisioner;
pub use reveals::PendingReveals;
pub use routes::{build_app, create_router};
pub use state::{ApiSettings, AppState};
