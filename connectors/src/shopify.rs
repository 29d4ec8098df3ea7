//! Shopify adapter: full capability set (spec §9 open question — Shopify is
//! the baseline channel nothing declines).

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
    ("open", OrderStatus::Pending),
    ("in_progress", OrderStatus::Processing),
    ("on_hold", OrderStatus::OnHold),
    ("fulfilled", OrderStatus::Shipped),
    ("delivered", OrderStatus::Delivered),
    ("cancelled", OrderStatus::Cancelled),
    ("refunded", OrderStatus::Refunded),
];

/// Adapter for a single Shopify store.
pub struct ShopifyAdapter {
    http: Arc<dyn HttpClient>,
    base_url: String,
    access_token: String,
}

impl ShopifyAdapter {
    /// Build an adapter bound to one store's admin API base URL and access
    /// token.
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn classify(operation: &str, status: u16, body: &str) -> AdapterError {
        match status {
            401 | 403 => AdapterError::Auth { operation: operation.to_string(), message: body.to_string() },
            404 => AdapterError::NotFound { operation: operation.to_string() },
            409 => AdapterError::Conflict { operation: operation.to_string() },
            422 => AdapterError::ChannelReject { operation: operation.to_string(), message: body.to_string() },
            429 => AdapterError::RateLimited { operation: operation.to_string(), retry_after_secs: None },
            400..=499 => AdapterError::InvalidInput { operation: operation.to_string(), message: body.to_string() },
            _ => AdapterError::Transient { operation: operation.to_string(), message: body.to_string() },
        }
    }
}

impl ConnectorAdapter for ShopifyAdapter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn channel_type(&self) -> &'static str {
        "shopify"
    }

    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        Box::pin(async move {
            match self.http.get(&self.url("/admin/api/shop.json"), &self.access_token).await {
                Ok(_) => Ok(()),
                Err(e) => Err(AdapterError::Auth { operation: "connect".to_string(), message: e.to_string() }),
            }
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
            let path = match cursor {
                Some(c) => format!("/admin/api/products.json?page_info={c}&limit={page_size}"),
                None => format!("/admin/api/products.json?limit={page_size}"),
            };
            let response = self
                .http
                .get(&self.url(&path), &self.access_token)
                .await
                .map_err(|e| AdapterError::Transient { operation: "listProducts".to_string(), message: e.to_string() })?;
            serde_json::from_str(&response.body)
                .map_err(|e| AdapterError::Transient { operation: "listProducts".to_string(), message: e.to_string() })
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
                .get(&self.url(&format!("/admin/api/products/{external_id}.json")), &self.access_token)
                .await
                .map_err(|e| Self::classify("getProduct", 0, &e.to_string()))?;
            serde_json::from_str(&response.body)
                .map_err(|e| AdapterError::Transient { operation: "getProduct".to_string(), message: e.to_string() })
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
                .get(&self.url(&format!("/admin/api/inventory_levels.json?sku={sku}")), &self.access_token)
                .await
                .map_err(|e| AdapterError::Transient { operation: "getInventory".to_string(), message: e.to_string() })?;
            serde_json::from_str(&response.body)
                .map_err(|e| AdapterError::Transient { operation: "getInventory".to_string(), message: e.to_string() })
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
            let body = serde_json::json!({ "sku": sku, "available": quantity, "version": version });
            let response = self
                .http
                .put(&self.url("/admin/api/inventory_levels/set.json"), &self.access_token, body)
                .await;
            match response {
                Ok(_) => Ok(()),
                Err(e) => Err(Self::classify("setInventory", 0, &e.to_string())),
            }
        })
    }

    fn list_orders(
        &self,
        since: DateTime<Utc>,
        cursor: Option<String>,
        page_size: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Page<ExternalOrder>, AdapterError>> + Send + '_>> {
        Box::pin(async move {
            let path = match cursor {
                Some(c) => format!("/admin/api/orders.json?page_info={c}&limit={page_size}"),
                None => format!("/admin/api/orders.json?updated_at_min={since}&limit={page_size}"),
            };
            let response = self
                .http
                .get(&self.url(&path), &self.access_token)
                .await
                .map_err(|e| AdapterError::Transient { operation: "listOrders".to_string(), message: e.to_string() })?;
            serde_json::from_str(&response.body)
                .map_err(|e| AdapterError::Transient { operation: "listOrders".to_string(), message: e.to_string() })
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
                .get(&self.url(&format!("/admin/api/orders/{external_id}.json")), &self.access_token)
                .await
                .map_err(|e| Self::classify("getOrder", 0, &e.to_string()))?;
            serde_json::from_str(&response.body)
                .map_err(|e| AdapterError::Transient { operation: "getOrder".to_string(), message: e.to_string() })
        })
    }

    fn acknowledge_order(
        &self,
        external_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        let external_id = external_id.to_string();
        Box::pin(async move {
            let body = serde_json::json!({ "acknowledged": true });
            self.http
                .post(&self.url(&format!("/admin/api/orders/{external_id}/acknowledge.json")), &self.access_token, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("acknowledgeOrder", 0, &e.to_string()))
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
                "carrier": shipment.carrier,
                "tracking_number": shipment.tracking_number,
                "shipped_at": shipment.shipped_at,
            });
            self.http
                .post(&self.url(&format!("/admin/api/orders/{external_id}/fulfillments.json")), &self.access_token, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("fulfillOrder", 0, &e.to_string()))
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
            let body = serde_json::json!({ "reason": reason });
            self.http
                .post(&self.url(&format!("/admin/api/orders/{external_id}/cancel.json")), &self.access_token, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("cancelOrder", 0, &e.to_string()))
        })
    }

    fn get_price(&self, sku: &str) -> Pin<Box<dyn Future<Output = Result<Decimal, AdapterError>> + Send + '_>> {
        let sku = sku.to_string();
        Box::pin(async move {
            let response = self
                .http
                .get(&self.url(&format!("/admin/api/variants.json?sku={sku}")), &self.access_token)
                .await
                .map_err(|e| AdapterError::Transient { operation: "getPrice".to_string(), message: e.to_string() })?;
            response
                .body
                .parse()
                .map_err(|_| AdapterError::Transient { operation: "getPrice".to_string(), message: "bad price payload".to_string() })
        })
    }

    fn set_price(
        &self,
        sku: &str,
        price: Decimal,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        let sku = sku.to_string();
        Box::pin(async move {
            let body = serde_json::json!({ "sku": sku, "price": price });
            self.http
                .put(&self.url("/admin/api/variants/price.json"), &self.access_token, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("setPrice", 0, &e.to_string()))
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
            let body = serde_json::json!({ "topic": topic, "address": callback_url });
            let response = self
                .http
                .post(&self.url("/admin/api/webhooks.json"), &self.access_token, body)
                .await
                .map_err(|e| Self::classify("registerWebhook", 0, &e.to_string()))?;
            Ok(response.body)
        })
    }
}

fn _normalise(raw: &str) -> OrderStatus {
    normalise_order_status(raw, STATUS_MAP)
}

/// Convert a list of [`ExternalLineItem`] into the canonical shape; exposed
/// for the order-ingestion pipeline in the `engine` crate.
#[must_use]
pub fn canonical_status(raw_channel_status: &str) -> OrderStatus {
    _normalise(raw_channel_status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MockHttpClient};

    #[tokio::test]
    async fn connect_success_maps_ok_response() {
        let http = Arc::new(MockHttpClient::new(vec![Ok(HttpResponse {
            status: 200,
            body: "{}".to_string(),
            retry_after_secs: None,
        })]));
        let adapter = ShopifyAdapter::new(http, "https://shop.example", "token");
        assert!(adapter.connect().await.is_ok());
    }

    #[test]
    fn unrecognised_channel_status_normalises_to_pending() {
        assert_eq!(canonical_status("backordered"), OrderStatus::Pending);
        assert_eq!(canonical_status("fulfilled"), OrderStatus::Shipped);
    }

    #[test]
    fn declares_every_capability() {
        let http: Arc<dyn crate::http::HttpClient> = Arc::new(MockHttpClient::new(vec![]));
        let adapter = ShopifyAdapter::new(http, "https://shop.example", "token");
        assert_eq!(adapter.capabilities(), Capabilities::all());
    }
}
