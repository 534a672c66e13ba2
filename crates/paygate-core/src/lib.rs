//! Paygate Core
//!
//! Domain types, API key management, access verification and the port
//! traits that the store, billing and HTTP crates implement or consume.
//! Everything here is free of I/O; collaborators are injected through
//! the traits in [`ports`].

pub mod access;
pub mod billing;
pub mod customer;
pub mod error;
pub mod ids;
pub mod keys;
pub mod ports;

pub use access::{AccessDecision, verify};
pub use customer::{CustomerRecord, StoreSnapshot};
pub use error::{Error, Result};
pub use ids::*;
pub use keys::{ApiKey, Fingerprint, GeneratedKey, KeyManager, KeySource, OsKeySource, fingerprint};
