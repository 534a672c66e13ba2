//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the core domain and external adapters.

use crate::Result;
use crate::billing::{
    CheckoutRequest, CheckoutSession, RecordedUsage, SubscriptionInfo, UpcomingInvoice,
    UsageRecord,
};
use crate::customer::{CustomerRecord, StoreSnapshot};
use crate::ids::{CustomerId, EventId, SubscriptionId};
use crate::keys::Fingerprint;
use async_trait::async_trait;

/// Set of fingerprints already issued.
#[async_trait]
pub trait FingerprintRegistry: Send + Sync {
    /// Check whether a fingerprint is already registered.
    async fn contains(&self, fingerprint: &Fingerprint) -> Result<bool>;
}

/// Storage for customer records, keyed by fingerprint.
#[async_trait]
pub trait CustomerStore: FingerprintRegistry {
    /// Look up a record by fingerprint.
    async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<CustomerRecord>>;

    /// Every record issued to a customer, oldest first.
    async fn find_by_customer(&self, customer_id: &CustomerId) -> Result<Vec<CustomerRecord>>;

    /// Insert a record. Fails with `FingerprintTaken` if the fingerprint exists.
    async fn insert(&self, record: CustomerRecord) -> Result<()>;

    /// Set the active flag on every record of a subscription.
    /// Returns the number of records changed.
    async fn set_active_for_subscription(
        &self,
        subscription_id: &SubscriptionId,
        active: bool,
    ) -> Result<usize>;

    /// Copy of every record.
    async fn snapshot(&self) -> Result<StoreSnapshot>;
}

/// Outcome of claiming a billing event for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClaim {
    /// First sighting; the caller owns processing.
    Claimed,
    /// Another delivery is processing it right now.
    InFlight,
    /// Already processed to completion.
    Done,
}

/// Ledger of billing events, tracking in-flight and completed ids.
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Claim an event id for processing.
    async fn begin(&self, event_id: &EventId) -> Result<EventClaim>;

    /// Mark a claimed event as fully processed.
    async fn complete(&self, event_id: &EventId) -> Result<()>;

    /// Drop a claim so a redelivery is processed again.
    async fn release(&self, event_id: &EventId) -> Result<()>;
}

/// Billing provider.
#[async_trait]
pub trait BillingService: Send + Sync {
    /// Create a hosted checkout page for a subscription.
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;

    /// Get subscription details.
    async fn retrieve_subscription(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<SubscriptionInfo>;

    /// Report usage for metered billing.
    async fn create_usage_record(&self, record: &UsageRecord) -> Result<RecordedUsage>;

    /// Preview the customer's next invoice.
    async fn upcoming_invoice(&self, customer_id: &CustomerId) -> Result<UpcomingInvoice>;
}
