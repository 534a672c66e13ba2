//! Stripe API client.
//!
//! Built on `async-stripe`. Requests use the crate's typed parameters where
//! it has them; responses decode into narrow views holding only the fields
//! the gateway reads, so unrelated schema drift cannot fail a call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paygate_core::billing::{
    CheckoutRequest, CheckoutSession, InvoiceLine, RecordedUsage, SubscriptionInfo,
    UpcomingInvoice, UsageRecord,
};
use paygate_core::ids::{CustomerId, SubscriptionId};
use paygate_core::ports::BillingService;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stripe::{CheckoutSessionMode, CreateCheckoutSession, CreateCheckoutSessionLineItems};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<stripe::StripeError> for StripeError {
    fn from(err: stripe::StripeError) -> Self {
        match err {
            stripe::StripeError::Stripe(request_error) => {
                let status = request_error.http_status;
                let message = request_error
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{:?}", request_error.error_type));
                if status == 404 {
                    StripeError::NotFound(message)
                } else {
                    StripeError::Api { status, message }
                }
            }
            stripe::StripeError::Timeout => StripeError::Transport("request timed out".to_string()),
            stripe::StripeError::ClientError(msg) => StripeError::Transport(msg),
            other => StripeError::Decode(other.to_string()),
        }
    }
}

/// Stripe client configuration.
#[derive(Clone)]
pub struct StripeConfig {
    pub api_key: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct List<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionView {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionView {
    id: String,
    customer: String,
    status: String,
    items: List<SubscriptionItemView>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItemView {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UsageRecordView {
    id: String,
    quantity: u64,
    subscription_item: String,
    timestamp: i64,
    #[serde(default)]
    livemode: bool,
}

#[derive(Debug, Deserialize)]
struct InvoiceView {
    customer: String,
    subscription: Option<String>,
    currency: String,
    amount_due: i64,
    total: i64,
    period_start: Option<i64>,
    period_end: Option<i64>,
    lines: List<InvoiceLineView>,
}

#[derive(Debug, Deserialize)]
struct InvoiceLineView {
    description: Option<String>,
    quantity: Option<u64>,
    amount: i64,
}

/// Form body for a metered usage report. Usage always increments.
#[derive(Debug, Serialize)]
struct CreateUsageRecord {
    quantity: u64,
    timestamp: i64,
    action: &'static str,
}

#[derive(Debug, Serialize)]
struct UpcomingInvoiceQuery<'a> {
    customer: &'a str,
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// Stripe client wrapper.
pub struct StripeClient {
    client: stripe::Client,
    timeout: Duration,
}

impl StripeClient {
    /// Create a new Stripe client.
    pub fn new(config: StripeConfig) -> Result<Self, StripeError> {
        if config.api_key.is_empty() {
            return Err(StripeError::Config("api key is empty".to_string()));
        }

        // `Client::from_url` panics on a bad base URL.
        url::Url::parse(&config.api_base).map_err(|e| {
            StripeError::Config(format!("invalid api base {:?}: {}", config.api_base, e))
        })?;

        let client = stripe::Client::from_url(config.api_base.as_str(), config.api_key);
        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    async fn call<T, F>(&self, operation: &'static str, request: F) -> Result<T, StripeError>
    where
        T: DeserializeOwned,
        F: Future<Output = Result<T, stripe::StripeError>>,
    {
        let result = match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result.map_err(StripeError::from),
            Err(_) => Err(StripeError::Transport(format!(
                "no response within {:?}",
                self.timeout
            ))),
        };

        if let Err(e) = &result {
            warn!(operation, error = %e, "Stripe request failed");
        }
        result
    }

    /// Create a subscription checkout session.
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, StripeError> {
        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Subscription);
        params.success_url = Some(request.success_url.as_str());
        params.cancel_url = Some(request.cancel_url.as_str());
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            price: Some(request.price_id.to_string()),
            ..Default::default()
        }]);

        let session: CheckoutSessionView = self
            .call(
                "create_checkout_session",
                self.client.post_form("/checkout/sessions", &params),
            )
            .await?;

        let url = session
            .url
            .ok_or_else(|| StripeError::Decode("checkout session has no url".to_string()))?;

        debug!(session_id = %session.id, "Created checkout session");
        Ok(CheckoutSession {
            id: session.id.into(),
            url,
        })
    }

    /// Retrieve a subscription with its items.
    pub async fn retrieve_subscription(
        &self,
        subscription_id: &SubscriptionId,
    ) -> Result<SubscriptionInfo, StripeError> {
        let path = format!("/subscriptions/{}", subscription_id);
        let sub: SubscriptionView = self
            .call("retrieve_subscription", self.client.get(&path))
            .await?;

        Ok(SubscriptionInfo {
            id: sub.id.into(),
            customer_id: sub.customer.into(),
            status: sub.status,
            item_ids: sub.items.data.into_iter().map(|i| i.id.into()).collect(),
        })
    }

    /// Report metered usage on a subscription item.
    pub async fn create_usage_record(
        &self,
        record: &UsageRecord,
    ) -> Result<RecordedUsage, StripeError> {
        let path = format!(
            "/subscription_items/{}/usage_records",
            record.subscription_item_id
        );
        let form = CreateUsageRecord {
            quantity: record.quantity,
            timestamp: record.timestamp.timestamp(),
            action: "increment",
        };

        let usage: UsageRecordView = self
            .call("create_usage_record", self.client.post_form(&path, &form))
            .await?;

        let recorded_at = timestamp(usage.timestamp)
            .ok_or_else(|| StripeError::Decode(format!("bad timestamp {}", usage.timestamp)))?;

        Ok(RecordedUsage {
            id: usage.id,
            subscription_item_id: usage.subscription_item.into(),
            quantity: usage.quantity,
            timestamp: recorded_at,
            livemode: usage.livemode,
        })
    }

    /// Preview the next invoice for a customer.
    pub async fn upcoming_invoice(
        &self,
        customer_id: &CustomerId,
    ) -> Result<UpcomingInvoice, StripeError> {
        let query = UpcomingInvoiceQuery {
            customer: customer_id.as_str(),
        };
        let invoice: InvoiceView = self
            .call(
                "upcoming_invoice",
                self.client.get_query("/invoices/upcoming", &query),
            )
            .await?;

        Ok(UpcomingInvoice {
            customer_id: invoice.customer.into(),
            subscription_id: invoice.subscription.map(Into::into),
            currency: invoice.currency,
            amount_due: invoice.amount_due,
            total: invoice.total,
            period_start: invoice.period_start.and_then(timestamp),
            period_end: invoice.period_end.and_then(timestamp),
            lines: invoice
                .lines
                .data
                .into_iter()
                .map(|l| InvoiceLine {
                    description: l.description,
                    quantity: l.quantity,
                    amount: l.amount,
                })
                .collect(),
        })
    }
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn to_core(err: StripeError) -> paygate_core::Error {
    match err {
        StripeError::Transport(msg) => paygate_core::Error::Network(msg),
        other => paygate_core::Error::Billing(other.to_string()),
    }
}

#[async_trait]
impl BillingService for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> paygate_core::Result<CheckoutSession> {
        StripeClient::create_checkout_session(self, request)
            .await
            .map_err(to_core)
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &SubscriptionId,
    ) -> paygate_core::Result<SubscriptionInfo> {
        StripeClient::retrieve_subscription(self, subscription_id)
            .await
            .map_err(|e| match e {
                StripeError::NotFound(_) => {
                    paygate_core::Error::SubscriptionNotFound(subscription_id.to_string())
                }
                other => to_core(other),
            })
    }

    async fn create_usage_record(
        &self,
        record: &UsageRecord,
    ) -> paygate_core::Result<RecordedUsage> {
        StripeClient::create_usage_record(self, record)
            .await
            .map_err(to_core)
    }

    async fn upcoming_invoice(
        &self,
        customer_id: &CustomerId,
    ) -> paygate_core::Result<UpcomingInvoice> {
        StripeClient::upcoming_invoice(self, customer_id)
            .await
            .map_err(|e| match e {
                StripeError::NotFound(_) => {
                    paygate_core::Error::CustomerNotFound(customer_id.to_string())
                }
                other => to_core(other),
            })
    }
}
