//! Stripe billing integration for Paygate.
//!
//! Provides the Stripe REST client used for checkout, subscriptions and
//! metered usage, plus webhook signature verification and event dispatch.

pub mod client;
pub mod webhooks;

pub use client::{StripeClient, StripeConfig, StripeError};
pub use webhooks::{
    CheckoutCompletedData, InvoiceEventData, SIGNATURE_HEADER, StripeEvent, StripeEventType,
    SubscriptionEventData, WebhookError, WebhookHandler, WebhookVerifier, process_webhook,
    signature_header, verify_signature,
};
