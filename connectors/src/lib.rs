//! Per-channel connector adapters for the channel synchronisation engine.
//!
//! One [`adapter::ConnectorAdapter`] trait, four implementations (Shopify,
//! WooCommerce, Amazon, eBay) each translating between the engine's
//! canonical model and one channel's native REST surface over an injected
//! [`http::HttpClient`], never `reqwest` directly.

pub mod adapter;
pub mod amazon;
pub mod ebay;
pub mod error;
pub mod http;
pub mod normalize;
pub mod shopify;
pub mod types;
pub mod woocommerce;

pub use adapter::{Capabilities, ConnectorAdapter};
pub use amazon::AmazonAdapter;
pub use ebay::EbayAdapter;
pub use error::AdapterError;
pub use http::{HttpClient, HttpError, MockHttpClient, ReqwestHttpClient};
pub use shopify::ShopifyAdapter;
pub use types::{ExternalInventoryLevel, ExternalLineItem, ExternalOrder, ExternalProduct, Page, Shipment};
pub use woocommerce::WooCommerceAdapter;

/// Build a [`Box<dyn ConnectorAdapter>`] for `channel_type`, or `None` if
/// unrecognised. Spec §9 redesign flag: connectors are registered by
/// channel type at startup through this factory rather than a global
/// mutable registry.
#[must_use]
pub fn build_adapter(
    channel_type: &str,
    http: std::sync::Arc<dyn HttpClient>,
    base_url: String,
    credential: String,
) -> Option<Box<dyn ConnectorAdapter>> {
    match channel_type {
        "shopify" => Some(Box::new(ShopifyAdapter::new(http, base_url, credential))),
        "woocommerce" => Some(Box::new(WooCommerceAdapter::new(http, base_url, credential))),
        "amazon" => Some(Box::new(AmazonAdapter::new(http, base_url, credential))),
        "ebay" => Some(Box::new(EbayAdapter::new(http, base_url, credential))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_resolves_each_known_channel_type() {
        let http: std::sync::Arc<dyn HttpClient> = std::sync::Arc::new(MockHttpClient::new(vec![]));
        for channel_type in ["shopify", "woocommerce", "amazon", "ebay"] {
            let adapter = build_adapter(channel_type, http.clone(), "https://example.test".to_string(), "token".to_string());
            assert!(adapter.is_some(), "expected an adapter for {channel_type}");
            assert_eq!(adapter.unwrap().channel_type(), channel_type);
        }
    }

    #[test]
    fn factory_rejects_unknown_channel_type() {
        let http: std::sync::Arc<dyn HttpClient> = std::sync::Arc::new(MockHttpClient::new(vec![]));
        assert!(build_adapter("bigcommerce", http, "https://example.test".to_string(), "token".to_string()).is_none());
    }
}
