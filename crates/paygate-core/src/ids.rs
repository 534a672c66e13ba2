//! Strongly-typed identifiers for billing-provider entities.
//!
//! The provider owns these identifiers; we only carry them around, so each
//! one is an opaque string wrapper rather than a parsed value.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

define_id!(CustomerId);
define_id!(SubscriptionId);
define_id!(SubscriptionItemId);
define_id!(CheckoutSessionId);
define_id!(PriceId);
define_id!(EventId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_is_raw() {
        let id = CustomerId::new("cus_123");
        assert_eq!(id.to_string(), "cus_123");
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = SubscriptionItemId::from("si_abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"si_abc\"");

        let parsed: SubscriptionItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_empty_id() {
        assert!(EventId::new("").is_empty());
        assert!(!EventId::new("evt_1").is_empty());
    }
}
