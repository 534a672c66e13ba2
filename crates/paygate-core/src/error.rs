//! Error types for Paygate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Key errors
    #[error("Invalid key configuration: {0}")]
    InvalidKeyConfig(String),

    #[error("Key generation gave up after {attempts} attempts")]
    KeyGenerationExhausted { attempts: u32 },

    #[error("Fingerprint already registered: {0}")]
    FingerprintTaken(String),

    // Customer errors
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    // Billing errors
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Subscription has no items: {0}")]
    SubscriptionHasNoItems(String),

    #[error("Billing provider error: {0}")]
    Billing(String),

    // Infrastructure errors
    #[error("Network error: {0}")]
    Network(String),
}

pub type Result<T> = std::result::Result<T, Error>;
