//! Test context wiring the server to a fake Stripe.

use crate::helpers::{ApiTestClient, start_test_server};
use paygate_api::{ApiSettings, AppState};
use paygate_billing::{StripeClient, StripeConfig, WebhookVerifier};
use paygate_core::KeyManager;
use paygate_db::MemoryStore;
use std::net::SocketAddr;
use std::sync::Arc;
use wiremock::MockServer;

/// Webhook secret the context's server verifies against.
pub const WEBHOOK_SECRET: &str = "whsec_paygate_tests";

/// Price every checkout subscribes to.
pub const PRICE_ID: &str = "price_metered_test";

/// A running server plus the fake Stripe behind it.
///
/// Drop this to stop the server.
pub struct TestContext {
    pub stripe: MockServer,
    pub store: Arc<MemoryStore>,
    pub addr: SocketAddr,
    pub client: ApiTestClient,
    handle: tokio::task::JoinHandle<()>,
}

impl TestContext {
    /// Server with signed webhooks and the store dump disabled.
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_verifier(WebhookVerifier::signed(WEBHOOK_SECRET)).await
    }

    /// Server that trusts unsigned webhook payloads.
    pub async fn unsigned() -> anyhow::Result<Self> {
        Self::with_verifier(WebhookVerifier::Unsigned).await
    }

    async fn with_verifier(webhooks: WebhookVerifier) -> anyhow::Result<Self> {
        crate::init_test_logging();

        let stripe = MockServer::start().await;
        let billing =
            StripeClient::new(StripeConfig::new("sk_test_paygate").with_api_base(stripe.uri()))?;

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            store.clone(),
            store.clone(),
            Arc::new(billing),
            KeyManager::new(),
            webhooks,
            ApiSettings::new(PRICE_ID, "http://paygate.test"),
        );

        let (addr, handle) = start_test_server(state).await?;

        Ok(Self {
            stripe,
            store,
            addr,
            client: ApiTestClient::new(addr),
            handle,
        })
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
