//! Canned Stripe responses and webhook events.

use chrono::Utc;
use paygate_billing::signature_header;
use serde_json::{Value, json};

/// Factory for Stripe REST API response bodies.
pub struct StripeFixture;

impl StripeFixture {
    /// A checkout session pointing at a hosted payment page.
    pub fn checkout_session(session_id: &str) -> Value {
        json!({
            "id": session_id,
            "object": "checkout.session",
            "mode": "subscription",
            "url": format!("https://checkout.stripe.test/pay/{}", session_id),
        })
    }

    /// An active subscription with a single metered item.
    pub fn subscription(subscription_id: &str, customer_id: &str, item_id: &str) -> Value {
        json!({
            "id": subscription_id,
            "object": "subscription",
            "customer": customer_id,
            "status": "active",
            "items": {
                "object": "list",
                "data": [{ "id": item_id, "object": "subscription_item" }],
            },
        })
    }

    /// A usage record acknowledgement.
    pub fn usage_record(item_id: &str, quantity: u64) -> Value {
        json!({
            "id": format!("mbur_{}", item_id),
            "object": "usage_record",
            "quantity": quantity,
            "subscription_item": item_id,
            "timestamp": Utc::now().timestamp(),
            "livemode": false,
        })
    }

    /// An upcoming invoice with one metered line.
    pub fn upcoming_invoice(customer_id: &str, subscription_id: &str, quantity: u64) -> Value {
        let now = Utc::now().timestamp();
        json!({
            "object": "invoice",
            "customer": customer_id,
            "subscription": subscription_id,
            "currency": "usd",
            "amount_due": quantity * 10,
            "total": quantity * 10,
            "period_start": now - 86_400,
            "period_end": now,
            "lines": {
                "object": "list",
                "data": [{
                    "description": "Metered API calls",
                    "quantity": quantity,
                    "amount": quantity * 10,
                }],
            },
        })
    }
}

/// Factory for webhook event payloads.
pub struct WebhookFixture;

impl WebhookFixture {
    pub fn checkout_completed(
        event_id: &str,
        session_id: &str,
        customer_id: &str,
        subscription_id: &str,
    ) -> Value {
        json!({
            "id": event_id,
            "type": "checkout.session.completed",
            "created": Utc::now().timestamp(),
            "livemode": false,
            "data": {
                "object": {
                    "id": session_id,
                    "object": "checkout.session",
                    "customer": customer_id,
                    "subscription": subscription_id,
                }
            }
        })
    }

    pub fn subscription_deleted(event_id: &str, subscription_id: &str, customer_id: &str) -> Value {
        Self::subscription_event(
            event_id,
            "customer.subscription.deleted",
            subscription_id,
            customer_id,
            "canceled",
        )
    }

    pub fn subscription_updated(
        event_id: &str,
        subscription_id: &str,
        customer_id: &str,
        status: &str,
    ) -> Value {
        Self::subscription_event(
            event_id,
            "customer.subscription.updated",
            subscription_id,
            customer_id,
            status,
        )
    }

    fn subscription_event(
        event_id: &str,
        event_type: &str,
        subscription_id: &str,
        customer_id: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": event_id,
            "type": event_type,
            "created": Utc::now().timestamp(),
            "livemode": false,
            "data": {
                "object": {
                    "id": subscription_id,
                    "object": "subscription",
                    "customer": customer_id,
                    "status": status,
                }
            }
        })
    }

    /// Serialize an event and sign it the way Stripe does.
    pub fn signed(event: &Value, secret: &str) -> (Vec<u8>, String) {
        let body = event.to_string().into_bytes();
        let signature = signature_header(&body, secret, Utc::now().timestamp());
        (body, signature)
    }
}
