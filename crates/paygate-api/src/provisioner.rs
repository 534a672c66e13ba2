//! Reacts to billing events by issuing and revoking API access.

use crate::reveals::PendingReveals;
use crate::state::AppState;
use async_trait::async_trait;
use paygate_billing::{
    CheckoutCompletedData, InvoiceEventData, SubscriptionEventData, WebhookError, WebhookHandler,
};
use paygate_core::ports::{BillingService, CustomerStore};
use paygate_core::{CustomerRecord, Error, KeyManager};
use std::sync::Arc;
use tracing::{info, warn};

/// Webhook handler that keeps customer records in step with billing.
pub struct Provisioner {
    store: Arc<dyn CustomerStore>,
    billing: Arc<dyn BillingService>,
    keys: Arc<KeyManager>,
    reveals: Arc<PendingReveals>,
}

impl Provisioner {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            billing: state.billing.clone(),
            keys: state.keys.clone(),
            reveals: state.reveals.clone(),
        }
    }
}

#[async_trait]
impl WebhookHandler for Provisioner {
    async fn on_checkout_completed(&self, data: CheckoutCompletedData) -> Result<(), WebhookError> {
        info!(
            customer_id = %data.customer_id,
            subscription_id = %data.subscription_id,
            "Customer subscribed"
        );

        let subscription = self.billing.retrieve_subscription(&data.subscription_id).await?;
        let item_id = subscription
            .primary_item()
            .cloned()
            .ok_or_else(|| Error::SubscriptionHasNoItems(data.subscription_id.to_string()))?;

        let generated = self.keys.generate(self.store.as_ref()).await?;
        self.store
            .insert(CustomerRecord::new(
                generated.fingerprint.clone(),
                data.customer_id.clone(),
                data.subscription_id.clone(),
                item_id.clone(),
            ))
            .await?;
        self.reveals
            .stash(data.session_id.clone(), generated.api_key)
            .await;

        info!(
            customer_id = %data.customer_id,
            subscription_item_id = %item_id,
            fingerprint = %generated.fingerprint.short(),
            "Issued API key"
        );
        Ok(())
    }

    async fn on_subscription_updated(
        &self,
        data: SubscriptionEventData,
    ) -> Result<(), WebhookError> {
        let active = data.grants_access();
        let changed = self
            .store
            .set_active_for_subscription(&data.subscription_id, active)
            .await?;
        info!(
            subscription_id = %data.subscription_id,
            status = %data.status,
            active,
            changed,
            "Subscription updated"
        );
        Ok(())
    }

    async fn on_subscription_deleted(
        &self,
        data: SubscriptionEventData,
    ) -> Result<(), WebhookError> {
        let changed = self
            .store
            .set_active_for_subscription(&data.subscription_id, false)
            .await?;
        info!(
            subscription_id = %data.subscription_id,
            changed,
            "Subscription ended, access revoked"
        );
        Ok(())
    }

    async fn on_invoice_paid(&self, data: InvoiceEventData) -> Result<(), WebhookError> {
        info!(
            invoice_id = %data.invoice_id,
            customer_id = %data.customer_id,
            amount_paid = data.amount_paid,
            currency = %data.currency,
            "Invoice paid"
        );
        Ok(())
    }

    async fn on_invoice_payment_failed(&self, data: InvoiceEventData) -> Result<(), WebhookError> {
        warn!(
            invoice_id = %data.invoice_id,
            customer_id = %data.customer_id,
            amount_due = data.amount_due,
            currency = %data.currency,
            "Invoice payment failed"
        );
        Ok(())
    }
}
