//! In-memory customer store.
//!
//! Suitable for development and tests. Contents are lost on restart.

use async_trait::async_trait;
use paygate_core::ids::{CustomerId, EventId, SubscriptionId};
use paygate_core::ports::{CustomerStore, EventClaim, EventLedger, FingerprintRegistry};
use paygate_core::{CustomerRecord, Error, Fingerprint, Result, StoreSnapshot};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventState {
    InFlight,
    Done,
}

/// Customer records and billing event states held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Fingerprint, CustomerRecord>>,
    events: RwLock<HashMap<EventId, EventState>>,
}

fn oldest_first(records: &mut [CustomerRecord]) {
    records.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl FingerprintRegistry for MemoryStore {
    async fn contains(&self, fingerprint: &Fingerprint) -> Result<bool> {
        Ok(self.records.read().await.contains_key(fingerprint))
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<CustomerRecord>> {
        Ok(self.records.read().await.get(fingerprint).cloned())
    }

    async fn find_by_customer(&self, customer_id: &CustomerId) -> Result<Vec<CustomerRecord>> {
        let mut found: Vec<CustomerRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| &r.customer_id == customer_id)
            .cloned()
            .collect();
        oldest_first(&mut found);
        Ok(found)
    }

    async fn insert(&self, record: CustomerRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.fingerprint) {
            return Err(Error::FingerprintTaken(record.fingerprint.short().to_string()));
        }

        debug!(
            customer_id = %record.customer_id,
            fingerprint = %record.fingerprint.short(),
            "Stored customer record"
        );
        records.insert(record.fingerprint.clone(), record);
        Ok(())
    }

    async fn set_active_for_subscription(
        &self,
        subscription_id: &SubscriptionId,
        active: bool,
    ) -> Result<usize> {
        let mut records = self.records.write().await;
        let mut changed = 0;
        for record in records
            .values_mut()
            .filter(|r| &r.subscription_id == subscription_id && r.active != active)
        {
            record.active = active;
            changed += 1;
        }

        info!(
            subscription_id = %subscription_id,
            active,
            changed,
            "Updated subscription records"
        );
        Ok(changed)
    }

    async fn snapshot(&self) -> Result<StoreSnapshot> {
        let mut records: Vec<CustomerRecord> =
            self.records.read().await.values().cloned().collect();
        oldest_first(&mut records);
        Ok(StoreSnapshot { records })
    }
}

#[async_trait]
impl EventLedger for MemoryStore {
    async fn begin(&self, event_id: &EventId) -> Result<EventClaim> {
        match self.events.write().await.entry(event_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(EventState::InFlight);
                Ok(EventClaim::Claimed)
            }
            Entry::Occupied(seen) => Ok(match seen.get() {
                EventState::InFlight => EventClaim::InFlight,
                EventState::Done => EventClaim::Done,
            }),
        }
    }

    async fn complete(&self, event_id: &EventId) -> Result<()> {
        self.events
            .write()
            .await
            .insert(event_id.clone(), EventState::Done);
        Ok(())
    }

    async fn release(&self, event_id: &EventId) -> Result<()> {
        let mut events = self.events.write().await;
        if events.get(event_id) == Some(&EventState::InFlight) {
            events.remove(event_id);
        }
        Ok(())
    }
}
