//! WooCommerce adapter: full capability set, REST API over a self-hosted
//! WordPress site rather than a managed platform.

use crate::adapter::{Capabilities, ConnectorAdapter};
use crate::error::AdapterError;
use crate::http::HttpClient;
use crate::normalize::normalise_order_status;
use crate::types::{ExternalInventoryLevel, ExternalOrder, ExternalProduct, Page, Shipment};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use syncengine_domain::OrderStatus;

const STATUS_MAP: &[(&str, OrderStatus)] = &[
    ("pending", OrderStatus::Pending),
    ("processing", OrderStatus::Processing),
    ("on-hold", OrderStatus::OnHold),
    ("completed", OrderStatus::Shipped),
    ("cancelled", OrderStatus::Cancelled),
    ("refunded", OrderStatus::Refunded),
];

/// Adapter for a single WooCommerce store, authenticated via the consumer
/// key/secret exchanged for a bearer token at `connect`.
pub struct WooCommerceAdapter {
    http: Arc<dyn HttpClient>,
    base_url: String,
    api_key: String,
}

impl WooCommerceAdapter {
    /// Build an adapter bound to one store's `/wp-json/wc/v3` base URL.
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn classify(operation: &str, message: &str) -> AdapterError {
        AdapterError::Transient { operation: operation.to_string(), message: message.to_string() }
    }
}

impl ConnectorAdapter for WooCommerceAdapter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn channel_type(&self) -> &'static str {
        "woocommerce"
    }

    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        Box::pin(async move {
            self.http
                .get(&self.url("/wp-json/wc/v3/system_status"), &self.api_key)
                .await
                .map(|_| ())
                .map_err(|e| AdapterError::Auth { operation: "connect".to_string(), message: e.to_string() })
        })
    }

    fn disconnect(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        Box::pin(async move { Ok(()) })
    }

    fn list_products(
        &self,
        cursor: Option<String>,
        page_size: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Page<ExternalProduct>, AdapterError>> + Send + '_>> {
        Box::pin(async move {
            let page = cursor.as_deref().unwrap_or("1");
            let response = self
                .http
                .get(&self.url(&format!("/wp-json/wc/v3/products?page={page}&per_page={page_size}")), &self.api_key)
                .await
                .map_err(|e| Self::classify("listProducts", &e.to_string()))?;
            serde_json::from_str(&response.body).map_err(|e| Self::classify("listProducts", &e.to_string()))
        })
    }

    fn get_product(
        &self,
        external_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ExternalProduct, AdapterError>> + Send + '_>> {
        let external_id = external_id.to_string();
        Box::pin(async move {
            let response = self
                .http
                .get(&self.url(&format!("/wp-json/wc/v3/products/{external_id}")), &self.api_key)
                .await
                .map_err(|e| match e {
                    crate::http::HttpError::Status { status: 404, .. } => {
                        AdapterError::NotFound { operation: "getProduct".to_string() }
                    },
                    other => Self::classify("getProduct", &other.to_string()),
                })?;
            serde_json::from_str(&response.body).map_err(|e| Self::classify("getProduct", &e.to_string()))
        })
    }

    fn get_inventory(
        &self,
        sku: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ExternalInventoryLevel, AdapterError>> + Send + '_>> {
        let sku = sku.to_string();
        Box::pin(async move {
            let response = self
                .http
                .get(&self.url(&format!("/wp-json/wc/v3/products?sku={sku}")), &self.api_key)
                .await
                .map_err(|e| Self::classify("getInventory", &e.to_string()))?;
            serde_json::from_str(&response.body).map_err(|e| Self::classify("getInventory", &e.to_string()))
        })
    }

    fn set_inventory(
        &self,
        sku: &str,
        quantity: u32,
        version: u64,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        let sku = sku.to_string();
        Box::pin(async move {
            let body = serde_json::json!({ "sku": sku, "stock_quantity": quantity, "version": version });
            self.http
                .put(&self.url("/wp-json/wc/v3/products/inventory"), &self.api_key, body)
                .await
                .map(|_| ())
                .map_err(|e| match e {
                    crate::http::HttpError::Status { status: 409, .. } => {
                        AdapterError::Conflict { operation: "setInventory".to_string() }
                    },
                    other => Self::classify("setInventory", &other.to_string()),
                })
        })
    }

    fn list_orders(
        &self,
        since: DateTime<Utc>,
        cursor: Option<String>,
        page_size: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Page<ExternalOrder>, AdapterError>> + Send + '_>> {
        Box::pin(async move {
            let page = cursor.as_deref().unwrap_or("1");
            let path = format!("/wp-json/wc/v3/orders?modified_after={since}&page={page}&per_page={page_size}");
            let response = self
                .http
                .get(&self.url(&path), &self.api_key)
                .await
                .map_err(|e| Self::classify("listOrders", &e.to_string()))?;
            serde_json::from_str(&response.body).map_err(|e| Self::classify("listOrders", &e.to_string()))
        })
    }

    fn get_order(
        &self,
        external_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ExternalOrder, AdapterError>> + Send + '_>> {
        let external_id = external_id.to_string();
        Box::pin(async move {
            let response = self
                .http
                .get(&self.url(&format!("/wp-json/wc/v3/orders/{external_id}")), &self.api_key)
                .await
                .map_err(|e| Self::classify("getOrder", &e.to_string()))?;
            serde_json::from_str(&response.body).map_err(|e| Self::classify("getOrder", &e.to_string()))
        })
    }

    fn acknowledge_order(
        &self,
        external_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        let external_id = external_id.to_string();
        Box::pin(async move {
            let body = serde_json::json!({ "meta_data": [{ "key": "_acknowledged", "value": "1" }] });
            self.http
                .put(&self.url(&format!("/wp-json/wc/v3/orders/{external_id}")), &self.api_key, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("acknowledgeOrder", &e.to_string()))
        })
    }

    fn fulfill_order(
        &self,
        external_id: &str,
        shipment: Shipment,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        let external_id = external_id.to_string();
        Box::pin(async move {
            let body = serde_json::json!({
                "status": "completed",
                "meta_data": [
                    { "key": "_tracking_carrier", "value": shipment.carrier },
                    { "key": "_tracking_number", "value": shipment.tracking_number },
                ],
            });
            self.http
                .put(&self.url(&format!("/wp-json/wc/v3/orders/{external_id}")), &self.api_key, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("fulfillOrder", &e.to_string()))
        })
    }

    fn cancel_order(
        &self,
        external_id: &str,
        reason: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        let external_id = external_id.to_string();
        let reason = reason.to_string();
        Box::pin(async move {
            let body = serde_json::json!({ "status": "cancelled", "customer_note": reason });
            self.http
                .put(&self.url(&format!("/wp-json/wc/v3/orders/{external_id}")), &self.api_key, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("cancelOrder", &e.to_string()))
        })
    }

    fn get_price(&self, sku: &str) -> Pin<Box<dyn Future<Output = Result<Decimal, AdapterError>> + Send + '_>> {
        let sku = sku.to_string();
        Box::pin(async move {
            let response = self
                .http
                .get(&self.url(&format!("/wp-json/wc/v3/products?sku={sku}")), &self.api_key)
                .await
                .map_err(|e| Self::classify("getPrice", &e.to_string()))?;
            response.body.parse().map_err(|_| Self::classify("getPrice", "bad price payload"))
        })
    }

    fn set_price(
        &self,
        sku: &str,
        price: Decimal,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        let sku = sku.to_string();
        Box::pin(async move {
            let body = serde_json::json!({ "sku": sku, "regular_price": price.to_string() });
            self.http
                .put(&self.url("/wp-json/wc/v3/products/price"), &self.api_key, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("setPrice", &e.to_string()))
        })
    }

    fn register_webhook(
        &self,
        topic: &str,
        callback_url: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AdapterError>> + Send + '_>> {
        let topic = topic.to_string();
        let callback_url = callback_url.to_string();
        Box::pin(async move {
            let body = serde_json::json!({ "topic": topic, "delivery_url": callback_url });
            let response = self
                .http
                .post(&self.url("/wp-json/wc/v3/webhooks"), &self.api_key, body)
                .await
                .map_err(|e| Self::classify("registerWebhook", &e.to_string()))?;
            Ok(response.body)
        })
    }
}

/// Map a WooCommerce raw order status to the canonical status.
#[must_use]
pub fn canonical_status(raw_channel_status: &str) -> OrderStatus {
    normalise_order_status(raw_channel_status, STATUS_MAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn woocommerce_vocabulary_maps_completed_to_shipped() {
        assert_eq!(canonical_status("completed"), OrderStatus::Shipped);
        assert_eq!(canonical_status("totally-unknown"), OrderStatus::Pending);
    }
}
