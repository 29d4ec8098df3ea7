//! eBay Trading/Fulfillment API adapter. Declines `cancelOrder` (spec
//! §4.1/§9): eBay models cancellation as a buyer- or seller-initiated
//! "cancellation request" workflow rather than a direct cancel call, so
//! this capability is `false` rather than approximated with a request that
//! doesn't actually cancel anything.

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
    ("active", OrderStatus::Pending),
    ("inprocess", OrderStatus::Processing),
    ("shipped", OrderStatus::Shipped),
    ("delivered", OrderStatus::Delivered),
    ("cancelled", OrderStatus::Cancelled),
    ("refunded", OrderStatus::Refunded),
];

/// Adapter for a single eBay seller account.
pub struct EbayAdapter {
    http: Arc<dyn HttpClient>,
    base_url: String,
    access_token: String,
}

impl EbayAdapter {
    /// Build an adapter bound to one seller's Sell API base URL.
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

    fn classify(operation: &str, error: &crate::http::HttpError) -> AdapterError {
        match error {
            crate::http::HttpError::Status { status: 401, body } => {
                AdapterError::Auth { operation: operation.to_string(), message: body.clone() }
            },
            crate::http::HttpError::Status { status: 404, .. } => AdapterError::NotFound { operation: operation.to_string() },
            crate::http::HttpError::Status { status: 409, .. } => AdapterError::Conflict { operation: operation.to_string() },
            other => AdapterError::Transient { operation: operation.to_string(), message: other.to_string() },
        }
    }
}

impl ConnectorAdapter for EbayAdapter {
    fn capabilities(&self) -> Capabilities {
        Capabilities { cancel_order: false, ..Capabilities::all() }
    }

    fn channel_type(&self) -> &'static str {
        "ebay"
    }

    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        Box::pin(async move {
            self.http
                .get(&self.url("/sell/account/v1/privilege"), &self.access_token)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("connect", &e))
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
            let offset = cursor.as_deref().unwrap_or("0");
            let path = format!("/sell/inventory/v1/inventory_item?limit={page_size}&offset={offset}");
            let response = self.http.get(&self.url(&path), &self.access_token).await.map_err(|e| Self::classify("listProducts", &e))?;
            serde_json::from_str(&response.body).map_err(|e| AdapterError::Transient {
                operation: "listProducts".to_string(),
                message: e.to_string(),
            })
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
                .get(&self.url(&format!("/sell/inventory/v1/inventory_item/{external_id}")), &self.access_token)
                .await
                .map_err(|e| Self::classify("getProduct", &e))?;
            serde_json::from_str(&response.body).map_err(|e| AdapterError::Transient {
                operation: "getProduct".to_string(),
                message: e.to_string(),
            })
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
                .get(&self.url(&format!("/sell/inventory/v1/inventory_item/{sku}")), &self.access_token)
                .await
                .map_err(|e| Self::classify("getInventory", &e))?;
            serde_json::from_str(&response.body).map_err(|e| AdapterError::Transient {
                operation: "getInventory".to_string(),
                message: e.to_string(),
            })
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
            let body = serde_json::json!({ "availability": { "shipToLocationAvailability": { "quantity": quantity } }, "version": version });
            self.http
                .put(&self.url(&format!("/sell/inventory/v1/inventory_item/{sku}")), &self.access_token, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("setInventory", &e))
        })
    }

    fn list_orders(
        &self,
        since: DateTime<Utc>,
        cursor: Option<String>,
        page_size: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Page<ExternalOrder>, AdapterError>> + Send + '_>> {
        Box::pin(async move {
            let offset = cursor.as_deref().unwrap_or("0");
            let path = format!(
                "/sell/fulfillment/v1/order?filter=lastmodifieddate:[{since}..]&limit={page_size}&offset={offset}"
            );
            let response = self.http.get(&self.url(&path), &self.access_token).await.map_err(|e| Self::classify("listOrders", &e))?;
            serde_json::from_str(&response.body).map_err(|e| AdapterError::Transient {
                operation: "listOrders".to_string(),
                message: e.to_string(),
            })
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
                .get(&self.url(&format!("/sell/fulfillment/v1/order/{external_id}")), &self.access_token)
                .await
                .map_err(|e| Self::classify("getOrder", &e))?;
            serde_json::from_str(&response.body).map_err(|e| AdapterError::Transient {
                operation: "getOrder".to_string(),
                message: e.to_string(),
            })
        })
    }

    fn acknowledge_order(
        &self,
        external_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        let external_id = external_id.to_string();
        Box::pin(async move {
            let body = serde_json::json!({});
            self.http
                .post(&self.url(&format!("/sell/fulfillment/v1/order/{external_id}/acknowledge")), &self.access_token, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("acknowledgeOrder", &e))
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
                "lineItems": [],
                "shippedDate": shipment.shipped_at,
                "shippingCarrierCode": shipment.carrier,
                "trackingNumber": shipment.tracking_number,
            });
            self.http
                .post(
                    &self.url(&format!("/sell/fulfillment/v1/order/{external_id}/shipping_fulfillment")),
                    &self.access_token,
                    body,
                )
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("fulfillOrder", &e))
        })
    }

    fn cancel_order(
        &self,
        _external_id: &str,
        _reason: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        Box::pin(async move { Err(AdapterError::NotSupported { operation: "cancelOrder".to_string() }) })
    }

    fn get_price(&self, sku: &str) -> Pin<Box<dyn Future<Output = Result<Decimal, AdapterError>> + Send + '_>> {
        let sku = sku.to_string();
        Box::pin(async move {
            let response = self
                .http
                .get(&self.url(&format!("/sell/inventory/v1/offer?sku={sku}")), &self.access_token)
                .await
                .map_err(|e| Self::classify("getPrice", &e))?;
            response.body.parse().map_err(|_| AdapterError::Transient {
                operation: "getPrice".to_string(),
                message: "bad price payload".to_string(),
            })
        })
    }

    fn set_price(
        &self,
        sku: &str,
        price: Decimal,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        let sku = sku.to_string();
        Box::pin(async move {
            let body = serde_json::json!({ "sku": sku, "pricingSummary": { "price": { "value": price } } });
            self.http
                .put(&self.url("/sell/inventory/v1/offer/price"), &self.access_token, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("setPrice", &e))
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
            let body = serde_json::json!({ "topic": topic, "endpoint": callback_url });
            let response = self
                .http
                .post(&self.url("/commerce/notification/v1/destination"), &self.access_token, body)
                .await
                .map_err(|e| Self::classify("registerWebhook", &e))?;
            Ok(response.body)
        })
    }
}

/// Map an eBay order-status string to the canonical status.
#[must_use]
pub fn canonical_status(raw_channel_status: &str) -> OrderStatus {
    normalise_order_status(raw_channel_status, STATUS_MAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockHttpClient;

    #[tokio::test]
    async fn cancel_order_is_declined() {
        let http: Arc<dyn HttpClient> = Arc::new(MockHttpClient::new(vec![]));
        let adapter = EbayAdapter::new(http, "https://api.ebay.com", "token");
        assert!(!adapter.capabilities().cancel_order);
        let result = adapter.cancel_order("ext-1", "buyer request").await;
        assert!(matches!(result, Err(AdapterError::NotSupported { .. })));
    }
}
