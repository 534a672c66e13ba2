//! Request gating.

use crate::Result;
use crate::customer::CustomerRecord;
use crate::keys::fingerprint;
use crate::ports::CustomerStore;
use tracing::debug;

/// Outcome of checking a presented credential.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessDecision {
    /// No credential was presented.
    MissingCredential,
    /// No record matches the key.
    UnknownKey,
    /// The record exists but has been deactivated.
    Inactive(CustomerRecord),
    Granted(CustomerRecord),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted(_))
    }

    /// The granted record, if any.
    pub fn into_granted(self) -> Option<CustomerRecord> {
        match self {
            AccessDecision::Granted(record) => Some(record),
            _ => None,
        }
    }
}

/// Decide whether a presented key grants access.
///
/// Denials are returned as values. Only store failures are errors.
pub async fn verify<S>(store: &S, presented: Option<&str>) -> Result<AccessDecision>
where
    S: CustomerStore + ?Sized,
{
    let candidate = match presented {
        Some(key) if !key.is_empty() => key,
        _ => return Ok(AccessDecision::MissingCredential),
    };

    let fingerprint = fingerprint(candidate);
    let decision = match store.lookup(&fingerprint).await? {
        None => AccessDecision::UnknownKey,
        Some(record) if !record.active => AccessDecision::Inactive(record),
        Some(record) => AccessDecision::Granted(record),
    };

    debug!(
        fingerprint = %fingerprint.short(),
        granted = decision.is_granted(),
        "Verified API key"
    );
    Ok(decision)
}
