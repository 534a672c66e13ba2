//! End-to-end test infrastructure for Paygate.
//!
//! Boots the real router on a local port with an in-memory store, and
//! points the billing client at a wiremock server standing in for Stripe.
//!
//! # Usage
//!
//! ```ignore
//! use paygate_tests::TestContext;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let ctx = TestContext::new().await.unwrap();
//!     // Use ctx.client, ctx.stripe, ctx.store, etc.
//! }
//! ```

pub mod context;
pub mod fixtures;
pub mod helpers;

pub use context::{PRICE_ID, TestContext, WEBHOOK_SECRET};
pub use fixtures::*;
pub use helpers::*;

/// Initialize test logging (call once per test binary).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,paygate_tests=debug")),
        )
        .with_test_writer()
        .try_init();
}
