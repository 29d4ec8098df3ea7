//! Newtype identifiers for the domain model's core entities.
//!
//! Each ID wraps a `String` so the compiler prevents e.g. passing a
//! `ChannelId` where a `ProductId` is expected, following the same newtype
//! idiom the order-processing example uses for `OrderId`/`CustomerId`.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Unwrap into the owned `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(ProductId, "Internal Product identifier.");
string_id!(OrderId, "Internal Order identifier.");
string_id!(ChannelId, "Identifies one external channel instance (e.g. a specific Shopify store).");
string_id!(ChannelAccountId, "Identifies the credential set bound to one ChannelId.");
string_id!(Sku, "Master SKU: the engine's canonical identifier for a sellable unit.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_string() {
        let id = ProductId::from("prod-1".to_string());
        assert_eq!(id.as_str(), "prod-1");
        assert_eq!(id.into_inner(), "prod-1");
    }

    #[test]
    fn distinct_id_types_do_not_compare() {
        let product = ProductId::new("x");
        let order = OrderId::new("x");
        assert_eq!(product.as_str(), order.as_str());
        // Different types entirely - this is a compile-time guarantee,
        // not something assertable at runtime, but the types existing
        // separately is the point.
    }
}
