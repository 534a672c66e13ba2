//! Access decisions and key issuance against the in-memory store.

use async_trait::async_trait;
use paygate_core::ids::{CustomerId, SubscriptionId};
use paygate_core::ports::{CustomerStore, FingerprintRegistry};
use paygate_core::{
    AccessDecision, ApiKey, CustomerRecord, Fingerprint, KeyManager, KeySource, Result,
    StoreSnapshot, fingerprint, verify,
};
use paygate_db::MemoryStore;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts lookups on the wrapped store.
struct CountingStore {
    inner: MemoryStore,
    lookups: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FingerprintRegistry for CountingStore {
    async fn contains(&self, fingerprint: &Fingerprint) -> Result<bool> {
        self.inner.contains(fingerprint).await
    }
}

#[async_trait]
impl CustomerStore for CountingStore {
    async fn lookup(&self, fingerprint: &Fingerprint) -> Result<Option<CustomerRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(fingerprint).await
    }

    async fn find_by_customer(&self, customer_id: &CustomerId) -> Result<Vec<CustomerRecord>> {
        self.inner.find_by_customer(customer_id).await
    }

    async fn insert(&self, record: CustomerRecord) -> Result<()> {
        self.inner.insert(record).await
    }

    async fn set_active_for_subscription(
        &self,
        subscription_id: &SubscriptionId,
        active: bool,
    ) -> Result<usize> {
        self.inner
            .set_active_for_subscription(subscription_id, active)
            .await
    }

    async fn snapshot(&self) -> Result<StoreSnapshot> {
        self.inner.snapshot().await
    }
}

/// Hands out one fixed fill byte per draw.
struct SequenceSource(Mutex<Vec<u8>>);

impl KeySource for SequenceSource {
    fn fill(&self, buf: &mut [u8]) {
        let mut remaining = self.0.lock().unwrap();
        let next = remaining.remove(0);
        buf.fill(next);
    }
}

fn record_for(key: &str, subscription: &str) -> CustomerRecord {
    CustomerRecord::new(
        fingerprint(key),
        "cus_test".into(),
        subscription.into(),
        "si_test".into(),
    )
}

#[tokio::test]
async fn missing_credential_skips_lookup() {
    let store = CountingStore::new();

    assert_eq!(
        verify(&store, None).await.unwrap(),
        AccessDecision::MissingCredential
    );
    assert_eq!(
        verify(&store, Some("")).await.unwrap(),
        AccessDecision::MissingCredential
    );
    assert_eq!(store.lookups(), 0);
}

#[tokio::test]
async fn unknown_key_is_denied() {
    let store = CountingStore::new();
    store.insert(record_for("known", "sub_1")).await.unwrap();

    let decision = verify(&store, Some("unknown")).await.unwrap();
    assert_eq!(decision, AccessDecision::UnknownKey);
    assert_eq!(store.lookups(), 1);
}

#[tokio::test]
async fn inactive_customer_is_denied() {
    let store = CountingStore::new();
    store.insert(record_for("lapsed", "sub_1")).await.unwrap();
    store
        .set_active_for_subscription(&"sub_1".into(), false)
        .await
        .unwrap();

    let decision = verify(&store, Some("lapsed")).await.unwrap();
    assert!(matches!(decision, AccessDecision::Inactive(ref r) if !r.active));
    assert!(!decision.is_granted());
}

#[tokio::test]
async fn active_customer_is_granted() {
    let store = CountingStore::new();
    store.insert(record_for("good", "sub_1")).await.unwrap();

    let decision = verify(&store, Some("good")).await.unwrap();
    assert!(decision.is_granted());

    let record = decision.into_granted().unwrap();
    assert_eq!(record.subscription_item_id.as_str(), "si_test");
    assert_eq!(record.fingerprint, fingerprint("good"));
}

#[tokio::test]
async fn collision_yields_second_draw() {
    let store = CountingStore::new();
    let colliding = ApiKey::new(hex_fill(0x11));
    let expected = ApiKey::new(hex_fill(0x22));

    store
        .insert(record_for(colliding.expose(), "sub_old"))
        .await
        .unwrap();

    let manager = KeyManager::with_source(SequenceSource(Mutex::new(vec![0x11, 0x22])));
    let generated = manager.generate(&store).await.unwrap();

    assert_eq!(generated.api_key, expected);
    assert_ne!(generated.fingerprint, colliding.fingerprint());

    store
        .insert(CustomerRecord::new(
            generated.fingerprint.clone(),
            "cus_new".into(),
            "sub_new".into(),
            "si_new".into(),
        ))
        .await
        .unwrap();

    let accepted = store.lookup(&expected.fingerprint()).await.unwrap().unwrap();
    assert_eq!(accepted.customer_id.as_str(), "cus_new");

    let decision = verify(&store, Some(expected.expose())).await.unwrap();
    assert!(decision.is_granted());
}

fn hex_fill(byte: u8) -> String {
    format!("{:02x}", byte).repeat(16)
}

#[tokio::test]
async fn customer_keys_listed_together() {
    let store = CountingStore::new();
    store.insert(record_for("first", "sub_1")).await.unwrap();
    store.insert(record_for("second", "sub_2")).await.unwrap();
    store
        .set_active_for_subscription(&"sub_1".into(), false)
        .await
        .unwrap();

    let records = store.find_by_customer(&"cus_test".into()).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records.iter().filter(|r| r.active).count(), 1);

    // Only the live subscription's key opens the gate.
    assert!(!verify(&store, Some("first")).await.unwrap().is_granted());
    assert!(verify(&store, Some("second")).await.unwrap().is_granted());
}
