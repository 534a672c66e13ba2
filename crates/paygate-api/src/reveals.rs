//! One-time display of freshly issued keys.

use paygate_core::ApiKey;
use paygate_core::ids::CheckoutSessionId;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// How long an unclaimed key waits for its success page visit.
pub const DEFAULT_REVEAL_TTL: Duration = Duration::from_secs(15 * 60);

/// Most keys held at once.
pub const DEFAULT_MAX_PENDING: usize = 10_000;

/// Raw keys waiting to be shown on the checkout success page.
///
/// Each key can be taken exactly once. Keys nobody collects expire after
/// the TTL, and the oldest are dropped once `max_entries` is reached; the
/// customer record stays valid either way.
#[derive(Debug)]
pub struct PendingReveals {
    keys: Mutex<HashMap<CheckoutSessionId, (ApiKey, Instant)>>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for PendingReveals {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingReveals {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_REVEAL_TTL, DEFAULT_MAX_PENDING)
    }

    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    fn purge_expired(&self, keys: &mut HashMap<CheckoutSessionId, (ApiKey, Instant)>) {
        let before = keys.len();
        keys.retain(|_, (_, stashed)| stashed.elapsed() < self.ttl);
        let expired = before - keys.len();
        if expired > 0 {
            debug!(expired, "Dropped unclaimed API keys");
        }
    }

    pub async fn stash(&self, session_id: CheckoutSessionId, key: ApiKey) {
        let mut keys = self.keys.lock().await;
        self.purge_expired(&mut keys);

        while keys.len() >= self.max_entries && !keys.contains_key(&session_id) {
            let oldest = keys
                .iter()
                .min_by_key(|(_, (_, stashed))| *stashed)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    warn!(session_id = %id, "Pending key buffer full, dropping oldest");
                    keys.remove(&id);
                }
                None => break,
            }
        }

        keys.insert(session_id, (key, Instant::now()));
    }

    /// Remove and return the key for a session, unless it has expired.
    pub async fn take(&self, session_id: &CheckoutSessionId) -> Option<ApiKey> {
        let mut keys = self.keys.lock().await;
        self.purge_expired(&mut keys);
        keys.remove(session_id).map(|(key, _)| key)
    }

    pub async fn len(&self) -> usize {
        self.keys.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.lock().await.is_empty()
    }
}
