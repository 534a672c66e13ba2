//! API key issuance and fingerprinting.
//!
//! A raw [`ApiKey`] is handed to the customer once. Only its [`Fingerprint`]
//! (hex SHA-256) is stored and used for lookups.

use crate::ports::FingerprintRegistry;
use crate::{Error, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{debug, warn};

/// Smallest accepted amount of key material (128 bits).
pub const MIN_KEY_BYTES: usize = 16;

/// Upper bound on draws before [`KeyManager::generate`] gives up.
pub const MAX_GENERATE_ATTEMPTS: u32 = 1000;

/// A raw API key. Never logged: `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The key as shown to the customer.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// One-way digest of an API key, safe to store and log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading hex digits, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fingerprint a candidate key. Total over all inputs.
pub fn fingerprint(raw_key: &str) -> Fingerprint {
    Fingerprint(hex::encode(Sha256::digest(raw_key.as_bytes())))
}

/// A freshly issued key and the fingerprint to persist for it.
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    pub api_key: ApiKey,
    pub fingerprint: Fingerprint,
}

/// Source of random key material.
pub trait KeySource: Send + Sync {
    fn fill(&self, buf: &mut [u8]);
}

/// Operating-system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsKeySource;

impl KeySource for OsKeySource {
    fn fill(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}

/// Issues API keys that are unique against a fingerprint registry.
pub struct KeyManager {
    source: Box<dyn KeySource>,
    key_bytes: usize,
}

impl KeyManager {
    /// Create a key manager backed by the OS random source.
    pub fn new() -> Self {
        Self::with_source(OsKeySource)
    }

    /// Create a key manager drawing from a custom source.
    pub fn with_source(source: impl KeySource + 'static) -> Self {
        Self {
            source: Box::new(source),
            key_bytes: MIN_KEY_BYTES,
        }
    }

    /// Set the number of random bytes per key. Must be at least [`MIN_KEY_BYTES`].
    pub fn with_key_bytes(mut self, key_bytes: usize) -> Result<Self> {
        if key_bytes < MIN_KEY_BYTES {
            return Err(Error::InvalidKeyConfig(format!(
                "key_bytes must be at least {}, got {}",
                MIN_KEY_BYTES, key_bytes
            )));
        }
        self.key_bytes = key_bytes;
        Ok(self)
    }

    pub fn key_bytes(&self) -> usize {
        self.key_bytes
    }

    fn draw(&self) -> ApiKey {
        let mut buf = vec![0u8; self.key_bytes];
        self.source.fill(&mut buf);
        ApiKey(hex::encode(buf))
    }

    /// Draw a key whose fingerprint is not yet in `registry`.
    ///
    /// A colliding draw is discarded and a fresh one taken. Nothing is
    /// persisted; inserting the result is the caller's job.
    pub async fn generate<R>(&self, registry: &R) -> Result<GeneratedKey>
    where
        R: FingerprintRegistry + ?Sized,
    {
        for attempt in 1..=MAX_GENERATE_ATTEMPTS {
            let api_key = self.draw();
            let fingerprint = api_key.fingerprint();

            if registry.contains(&fingerprint).await? {
                warn!(
                    attempt,
                    fingerprint = %fingerprint.short(),
                    "Fingerprint collision, drawing a new key"
                );
                continue;
            }

            debug!(attempt, fingerprint = %fingerprint.short(), "Generated API key");
            return Ok(GeneratedKey {
                api_key,
                fingerprint,
            });
        }

        Err(Error::KeyGenerationExhausted {
            attempts: MAX_GENERATE_ATTEMPTS,
        })
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("key_bytes", &self.key_bytes)
            .finish_non_exhaustive()
    }
}
