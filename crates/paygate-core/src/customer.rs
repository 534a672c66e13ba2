//! Customer records.

use crate::ids::{CustomerId, SubscriptionId, SubscriptionItemId};
use crate::keys::Fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Links a key fingerprint to the subscription item that gets billed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub fingerprint: Fingerprint,
    pub customer_id: CustomerId,
    pub subscription_id: SubscriptionId,
    pub subscription_item_id: SubscriptionItemId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl CustomerRecord {
    /// Create an active record.
    pub fn new(
        fingerprint: Fingerprint,
        customer_id: CustomerId,
        subscription_id: SubscriptionId,
        subscription_item_id: SubscriptionItemId,
    ) -> Self {
        Self {
            fingerprint,
            customer_id,
            subscription_id,
            subscription_item_id,
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// Point-in-time view of the store, ordered by creation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub records: Vec<CustomerRecord>,
}

impl StoreSnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
