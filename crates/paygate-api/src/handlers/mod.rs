//! Request handlers organized by resource.

pub mod checkout;
pub mod health;
pub mod metered;
pub mod store;
pub mod usage;
pub mod webhook;
