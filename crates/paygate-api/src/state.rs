//! Application state shared across handlers.

use crate::reveals::{DEFAULT_MAX_PENDING, DEFAULT_REVEAL_TTL, PendingReveals};
use paygate_billing::WebhookVerifier;
use paygate_core::KeyManager;
use paygate_core::ids::PriceId;
use paygate_core::ports::{BillingService, CustomerStore, EventLedger};
use std::sync::Arc;
use std::time::Duration;

/// Settings the handlers need from configuration.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Price the checkout subscribes customers to.
    pub price_id: PriceId,
    /// Externally reachable base URL, used for checkout redirects.
    pub public_url: String,
    /// Mount `/mock/db`.
    pub expose_store: bool,
    /// How long a new key waits on the success page before it is dropped.
    pub reveal_ttl: Duration,
}

impl ApiSettings {
    pub fn new(price_id: impl Into<PriceId>, public_url: impl Into<String>) -> Self {
        Self {
            price_id: price_id.into(),
            public_url: public_url.into(),
            expose_store: false,
            reveal_ttl: DEFAULT_REVEAL_TTL,
        }
    }

    pub fn with_expose_store(mut self, expose: bool) -> Self {
        self.expose_store = expose;
        self
    }

    pub fn with_reveal_ttl(mut self, ttl: Duration) -> Self {
        self.reveal_ttl = ttl;
        self
    }

    fn base(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }

    /// Where checkout sends the customer on success. The provider fills in
    /// the session id placeholder.
    pub fn success_url(&self) -> String {
        format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", self.base())
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/error", self.base())
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CustomerStore>,
    pub events: Arc<dyn EventLedger>,
    pub billing: Arc<dyn BillingService>,
    pub keys: Arc<KeyManager>,
    pub webhooks: Arc<WebhookVerifier>,
    pub reveals: Arc<PendingReveals>,
    pub settings: ApiSettings,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CustomerStore>,
        events: Arc<dyn EventLedger>,
        billing: Arc<dyn BillingService>,
        keys: KeyManager,
        webhooks: WebhookVerifier,
        settings: ApiSettings,
    ) -> Self {
        Self {
            store,
            events,
            billing,
            keys: Arc::new(keys),
            webhooks: Arc::new(webhooks),
            reveals: Arc::new(PendingReveals::with_limits(
                settings.reveal_ttl,
                DEFAULT_MAX_PENDING,
            )),
            settings,
        }
    }
}
