//! Stripe webhook handling.
//!
//! Payloads are authenticated with Stripe's detached signature scheme: the
//! `stripe-signature` header carries `t=<unix seconds>` and one or more
//! `v1=<hex>` entries, each an HMAC-SHA256 of `"<t>.<raw body>"` keyed by
//! the endpoint secret.

use chrono::Utc;
use hmac::{Hmac, Mac};
use paygate_core::ids::{CheckoutSessionId, CustomerId, EventId, SubscriptionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum age of a signed payload.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,
    #[error("Malformed signature header")]
    MalformedSignature,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Signature timestamp outside tolerance")]
    StaleTimestamp,
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Handler error: {0}")]
    HandlerError(String),
}

impl WebhookError {
    /// Whether the sender is at fault (as opposed to our handler).
    pub fn is_rejection(&self) -> bool {
        !matches!(self, WebhookError::HandlerError(_))
    }
}

impl From<paygate_core::Error> for WebhookError {
    fn from(err: paygate_core::Error) -> Self {
        WebhookError::HandlerError(err.to_string())
    }
}

/// Stripe webhook event types we handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StripeEventType {
    #[serde(rename = "checkout.session.completed")]
    CheckoutSessionCompleted,
    #[serde(rename = "customer.subscription.updated")]
    SubscriptionUpdated,
    #[serde(rename = "customer.subscription.deleted")]
    SubscriptionDeleted,
    #[serde(rename = "invoice.paid")]
    InvoicePaid,
    #[serde(rename = "invoice.payment_failed")]
    InvoicePaymentFailed,
    #[serde(other)]
    Unknown,
}

/// Stripe webhook event.
///
/// `id` is optional so that hand-built unsigned payloads still parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: Option<EventId>,
    #[serde(rename = "type")]
    pub event_type: StripeEventType,
    pub data: Value,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
}

/// `checkout.session.completed` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutCompletedData {
    pub session_id: CheckoutSessionId,
    pub customer_id: CustomerId,
    pub subscription_id: SubscriptionId,
}

/// Subscription event data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEventData {
    pub subscription_id: SubscriptionId,
    pub customer_id: CustomerId,
    pub status: String,
}

impl SubscriptionEventData {
    /// Whether the status still entitles the customer to API access.
    pub fn grants_access(&self) -> bool {
        matches!(self.status.as_str(), "active" | "trialing")
    }
}

/// Invoice event data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceEventData {
    pub invoice_id: String,
    pub customer_id: CustomerId,
    pub subscription_id: Option<SubscriptionId>,
    pub amount_due: i64,
    pub amount_paid: i64,
    pub currency: String,
}

/// Webhook handler trait.
#[async_trait::async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn on_checkout_completed(&self, data: CheckoutCompletedData) -> Result<(), WebhookError>;
    async fn on_subscription_updated(
        &self,
        data: SubscriptionEventData,
    ) -> Result<(), WebhookError>;
    async fn on_subscription_deleted(
        &self,
        data: SubscriptionEventData,
    ) -> Result<(), WebhookError>;
    async fn on_invoice_paid(&self, data: InvoiceEventData) -> Result<(), WebhookError>;
    async fn on_invoice_payment_failed(&self, data: InvoiceEventData) -> Result<(), WebhookError>;
}

/// Process a Stripe webhook event.
pub async fn process_webhook<H: WebhookHandler + ?Sized>(
    handler: &H,
    event: StripeEvent,
) -> Result<(), WebhookError> {
    info!(
        event_id = event.id.as_ref().map(|id| id.as_str()).unwrap_or("-"),
        event_type = ?event.event_type,
        livemode = event.livemode,
        "Processing Stripe webhook"
    );

    match event.event_type {
        StripeEventType::CheckoutSessionCompleted => {
            let data = parse_checkout_completed(&event.data)?;
            handler.on_checkout_completed(data).await
        }
        StripeEventType::SubscriptionUpdated => {
            let data = parse_subscription_data(&event.data)?;
            handler.on_subscription_updated(data).await
        }
        StripeEventType::SubscriptionDeleted => {
            let data = parse_subscription_data(&event.data)?;
            handler.on_subscription_deleted(data).await
        }
        StripeEventType::InvoicePaid => {
            let data = parse_invoice_data(&event.data)?;
            handler.on_invoice_paid(data).await
        }
        StripeEventType::InvoicePaymentFailed => {
            let data = parse_invoice_data(&event.data)?;
            handler.on_invoice_payment_failed(data).await
        }
        StripeEventType::Unknown => {
            warn!("Ignoring unknown event type");
            Ok(())
        }
    }
}

fn object(data: &Value) -> Result<&Value, WebhookError> {
    data.get("object")
        .ok_or_else(|| WebhookError::ParseError("Missing object".into()))
}

fn required_str<'a>(obj: &'a Value, field: &str) -> Result<&'a str, WebhookError> {
    obj[field]
        .as_str()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| WebhookError::ParseError(format!("Missing {}", field)))
}

fn parse_checkout_completed(data: &Value) -> Result<CheckoutCompletedData, WebhookError> {
    let obj = object(data)?;

    Ok(CheckoutCompletedData {
        session_id: required_str(obj, "id")?.into(),
        customer_id: required_str(obj, "customer")?.into(),
        subscription_id: required_str(obj, "subscription")?.into(),
    })
}

fn parse_subscription_data(data: &Value) -> Result<SubscriptionEventData, WebhookError> {
    let obj = object(data)?;

    Ok(SubscriptionEventData {
        subscription_id: required_str(obj, "id")?.into(),
        customer_id: obj["customer"].as_str().unwrap_or_default().into(),
        status: obj["status"].as_str().unwrap_or_default().to_string(),
    })
}

fn parse_invoice_data(data: &Value) -> Result<InvoiceEventData, WebhookError> {
    let obj = object(data)?;

    Ok(InvoiceEventData {
        invoice_id: obj["id"].as_str().unwrap_or_default().to_string(),
        customer_id: obj["customer"].as_str().unwrap_or_default().into(),
        subscription_id: obj["subscription"].as_str().map(Into::into),
        amount_due: obj["amount_due"].as_i64().unwrap_or(0),
        amount_paid: obj["amount_paid"].as_i64().unwrap_or(0),
        currency: obj["currency"].as_str().unwrap_or("usd").to_string(),
    })
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

/// Build a `stripe-signature` header value for a payload.
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let signature = mac_for(secret, timestamp, payload).finalize().into_bytes();
    format!("t={},v1={}", timestamp, hex::encode(signature))
}

/// Verify a Stripe webhook signature against `now` (unix seconds).
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedSignature)?,
                );
            }
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedSignature)?;
    if candidates.is_empty() {
        return Err(WebhookError::MalformedSignature);
    }

    let matched = candidates.into_iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac_for(secret, timestamp, payload).verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(WebhookError::InvalidSignature);
    }

    let age = now.saturating_sub(timestamp);
    if tolerance.as_secs() > 0 && age > tolerance.as_secs() as i64 {
        return Err(WebhookError::StaleTimestamp);
    }

    Ok(())
}

/// How inbound webhook payloads are authenticated.
#[derive(Clone)]
pub enum WebhookVerifier {
    /// Require a valid signature made with `secret`.
    Signed { secret: String, tolerance: Duration },
    /// INSECURE: trust any payload. For local development without a secret.
    Unsigned,
}

impl WebhookVerifier {
    pub fn signed(secret: impl Into<String>) -> Self {
        WebhookVerifier::Signed {
            secret: secret.into(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(self, tolerance: Duration) -> Self {
        match self {
            WebhookVerifier::Signed { secret, .. } => WebhookVerifier::Signed { secret, tolerance },
            unsigned => unsigned,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, WebhookVerifier::Signed { .. })
    }

    /// Authenticate and parse a raw payload.
    pub fn open(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<StripeEvent, WebhookError> {
        if let WebhookVerifier::Signed { secret, tolerance } = self {
            let header = signature.ok_or(WebhookError::MissingSignature)?;
            verify_signature(payload, header, secret, *tolerance, Utc::now().timestamp())?;
        }

        serde_json::from_slice(payload).map_err(|e| WebhookError::ParseError(e.to_string()))
    }
}

impl fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebhookVerifier::Signed { tolerance, .. } => f
                .debug_struct("Signed")
                .field("secret", &"<redacted>")
                .field("tolerance", tolerance)
                .finish(),
            WebhookVerifier::Unsigned => f.write_str("Unsigned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl WebhookHandler for Recorder {
        async fn on_checkout_completed(
            &self,
            data: CheckoutCompletedData,
        ) -> Result<(), WebhookError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("checkout:{}:{}", data.customer_id, data.subscription_id));
            Ok(())
        }

        async fn on_subscription_updated(
            &self,
            data: SubscriptionEventData,
        ) -> Result<(), WebhookError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("updated:{}:{}", data.subscription_id, data.status));
            Ok(())
        }

        async fn on_subscription_deleted(
            &self,
            data: SubscriptionEventData,
        ) -> Result<(), WebhookError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("deleted:{}", data.subscription_id));
            Ok(())
        }

        async fn on_invoice_paid(&self, data: InvoiceEventData) -> Result<(), WebhookError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("paid:{}", data.invoice_id));
            Ok(())
        }

        async fn on_invoice_payment_failed(
            &self,
            data: InvoiceEventData,
        ) -> Result<(), WebhookError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("failed:{}", data.invoice_id));
            Ok(())
        }
    }

    fn event(event_type: &str, object: Value) -> StripeEvent {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "data": { "object": object },
            "created": NOW,
            "livemode": false
        }))
        .unwrap()
    }

    #[test]
    fn test_event_type_serde() {
        let json = r#""checkout.session.completed""#;
        let event_type: StripeEventType = serde_json::from_str(json).unwrap();
        assert_eq!(event_type, StripeEventType::CheckoutSessionCompleted);
    }

    #[test]
    fn test_unknown_event_type() {
        let json = r#""some.unknown.event""#;
        let event_type: StripeEventType = serde_json::from_str(json).unwrap();
        assert_eq!(event_type, StripeEventType::Unknown);
    }

    #[test]
    fn test_signature_roundtrip() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = signature_header(payload, SECRET, NOW);
        assert!(header.starts_with(&format!("t={},v1=", NOW)));
        verify_signature(payload, &header, SECRET, DEFAULT_TOLERANCE, NOW + 10).unwrap();
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let header = signature_header(b"original", SECRET, NOW);
        let err =
            verify_signature(b"tampered", &header, SECRET, DEFAULT_TOLERANCE, NOW).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));

        let err = verify_signature(b"original", &header, "whsec_other", DEFAULT_TOLERANCE, NOW)
            .unwrap_err();
        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[test]
    fn test_signature_accepts_any_v1_entry() {
        let valid = signature_header(b"body", SECRET, NOW);
        let v1 = valid.split_once(",v1=").unwrap().1;
        let header = format!("t={},v1={},v0=ignored,v1={}", NOW, "00".repeat(32), v1);
        verify_signature(b"body", &header, SECRET, DEFAULT_TOLERANCE, NOW).unwrap();
    }

    #[test]
    fn test_signature_rejects_stale_timestamp() {
        let header = signature_header(b"body", SECRET, NOW);
        let err = verify_signature(b"body", &header, SECRET, DEFAULT_TOLERANCE, NOW + 301)
            .unwrap_err();
        assert!(matches!(err, WebhookError::StaleTimestamp));
    }

    #[test]
    fn test_signature_rejects_malformed_header() {
        for header in ["", "v1=abc", "t=notanumber,v1=abc", "t=123"] {
            let err = verify_signature(b"body", header, SECRET, DEFAULT_TOLERANCE, NOW)
                .unwrap_err();
            assert!(matches!(err, WebhookError::MalformedSignature), "{header}");
        }
    }

    #[test]
    fn test_signed_verifier_requires_header() {
        let verifier = WebhookVerifier::signed(SECRET);
        let err = verifier.open(b"{}", None).unwrap_err();
        assert!(matches!(err, WebhookError::MissingSignature));
        assert!(!format!("{:?}", verifier).contains(SECRET));
    }

    #[test]
    fn test_signed_verifier_opens_valid_payload() {
        let payload = serde_json::to_vec(&json!({
            "id": "evt_9",
            "type": "invoice.paid",
            "data": { "object": { "id": "in_1" } }
        }))
        .unwrap();
        let header = signature_header(&payload, SECRET, Utc::now().timestamp());

        let event = WebhookVerifier::signed(SECRET)
            .open(&payload, Some(&header))
            .unwrap();
        assert_eq!(event.event_type, StripeEventType::InvoicePaid);
        assert_eq!(event.id.unwrap().as_str(), "evt_9");
    }

    #[test]
    fn test_unsigned_verifier_trusts_payload() {
        let payload = br#"{"type":"invoice.paid","data":{"object":{}}}"#;
        let event = WebhookVerifier::Unsigned.open(payload, None).unwrap();
        assert!(event.id.is_none());
        assert!(!WebhookVerifier::Unsigned.is_signed());
    }

    #[tokio::test]
    async fn test_dispatch_checkout_completed() {
        let recorder = Recorder::default();
        let evt = event(
            "checkout.session.completed",
            json!({ "id": "cs_1", "customer": "cus_1", "subscription": "sub_1" }),
        );

        process_webhook(&recorder, evt).await.unwrap();
        assert_eq!(recorder.calls(), vec!["checkout:cus_1:sub_1"]);
    }

    #[tokio::test]
    async fn test_checkout_without_subscription_is_rejected() {
        let recorder = Recorder::default();
        let evt = event(
            "checkout.session.completed",
            json!({ "id": "cs_1", "customer": "cus_1", "subscription": null }),
        );

        let err = process_webhook(&recorder, evt).await.unwrap_err();
        assert!(matches!(err, WebhookError::ParseError(_)));
        assert!(err.is_rejection());
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_subscription_and_invoice_events() {
        let recorder = Recorder::default();
        let sub = json!({ "id": "sub_1", "customer": "cus_1", "status": "past_due" });

        process_webhook(&recorder, event("customer.subscription.updated", sub.clone()))
            .await
            .unwrap();
        process_webhook(&recorder, event("customer.subscription.deleted", sub))
            .await
            .unwrap();
        process_webhook(
            &recorder,
            event("invoice.paid", json!({ "id": "in_1", "customer": "cus_1" })),
        )
        .await
        .unwrap();
        process_webhook(
            &recorder,
            event("invoice.payment_failed", json!({ "id": "in_2", "customer": "cus_1" })),
        )
        .await
        .unwrap();
        process_webhook(&recorder, event("charge.refunded", json!({})))
            .await
            .unwrap();

        assert_eq!(
            recorder.calls(),
            vec![
                "updated:sub_1:past_due",
                "deleted:sub_1",
                "paid:in_1",
                "failed:in_2"
            ]
        );
    }

    #[test]
    fn test_grants_access() {
        let mut data = SubscriptionEventData {
            subscription_id: "sub_1".into(),
            customer_id: "cus_1".into(),
            status: "active".to_string(),
        };
        assert!(data.grants_access());
        data.status = "trialing".to_string();
        assert!(data.grants_access());
        data.status = "canceled".to_string();
        assert!(!data.grants_access());
    }
}
