//! Billing-provider request and response types.

use crate::ids::{CheckoutSessionId, CustomerId, PriceId, SubscriptionId, SubscriptionItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parameters for a subscription checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub price_id: PriceId,
    pub success_url: String,
    pub cancel_url: String,
}

/// A hosted checkout page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: CheckoutSessionId,
    pub url: String,
}

/// Subscription information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub customer_id: CustomerId,
    pub status: String,
    pub item_ids: Vec<SubscriptionItemId>,
}

impl SubscriptionInfo {
    /// The first item is the plan the customer subscribed to.
    pub fn primary_item(&self) -> Option<&SubscriptionItemId> {
        self.item_ids.first()
    }
}

/// Usage to add to a subscription item's running total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub subscription_item_id: SubscriptionItemId,
    pub quantity: u64,
    pub timestamp: DateTime<Utc>,
}

impl UsageRecord {
    /// One more unit of consumption, timestamped now.
    pub fn increment(subscription_item_id: SubscriptionItemId, quantity: u64) -> Self {
        Self {
            subscription_item_id,
            quantity,
            timestamp: Utc::now(),
        }
    }
}

/// Usage record as acknowledged by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedUsage {
    pub id: String,
    pub subscription_item_id: SubscriptionItemId,
    pub quantity: u64,
    pub timestamp: DateTime<Utc>,
    pub livemode: bool,
}

/// Preview of the next invoice for a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingInvoice {
    pub customer_id: CustomerId,
    pub subscription_id: Option<SubscriptionId>,
    pub currency: String,
    pub amount_due: i64,
    pub total: i64,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub lines: Vec<InvoiceLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: Option<String>,
    pub quantity: Option<u64>,
    pub amount: i64,
}
