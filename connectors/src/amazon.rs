//! Amazon Selling Partner API adapter. Declines `registerWebhook` (spec
//! §4.1/§9): Amazon's SP-API exposes subscription-based "notifications",
//! not an ad-hoc webhook registration call, so this capability is `false`
//! rather than approximated.

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
    ("unshipped", OrderStatus::Processing),
    ("partiallyshipped", OrderStatus::Processing),
    ("shipped", OrderStatus::Shipped),
    ("canceled", OrderStatus::Cancelled),
    ("refunded", OrderStatus::Refunded),
];

/// Adapter for a single Amazon seller account/marketplace pair.
pub struct AmazonAdapter {
    http: Arc<dyn HttpClient>,
    base_url: String,
    access_token: String,
}

impl AmazonAdapter {
    /// Build an adapter bound to one marketplace's SP-API base URL.
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
            crate::http::HttpError::Status { status: 401 | 403, body } => {
                AdapterError::Auth { operation: operation.to_string(), message: body.clone() }
            },
            crate::http::HttpError::Status { status: 404, .. } => AdapterError::NotFound { operation: operation.to_string() },
            crate::http::HttpError::Status { status: 429, .. } => {
                AdapterError::RateLimited { operation: operation.to_string(), retry_after_secs: Some(1) }
            },
            other => AdapterError::Transient { operation: operation.to_string(), message: other.to_string() },
        }
    }
}

impl ConnectorAdapter for AmazonAdapter {
    fn capabilities(&self) -> Capabilities {
        Capabilities { register_webhook: false, ..Capabilities::all() }
    }

    fn channel_type(&self) -> &'static str {
        "amazon"
    }

    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>> {
        Box::pin(async move {
            self.http
                .get(&self.url("/sellers/v1/marketplaceParticipations"), &self.access_token)
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
            let path = match cursor {
                Some(token) => format!("/catalog/2022-04-01/items?nextToken={token}"),
                None => format!("/catalog/2022-04-01/items?pageSize={page_size}"),
            };
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
                .get(&self.url(&format!("/catalog/2022-04-01/items/{external_id}")), &self.access_token)
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
                .get(&self.url(&format!("/fba/inventory/v1/summaries?sellerSkus={sku}")), &self.access_token)
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
            let body = serde_json::json!({ "sku": sku, "quantity": quantity, "version": version });
            self.http
                .put(&self.url("/listings/2021-08-01/inventory"), &self.access_token, body)
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
            let path = match cursor {
                Some(token) => format!("/orders/v0/orders?NextToken={token}"),
                None => format!("/orders/v0/orders?LastUpdatedAfter={since}&MaxResultsPerPage={page_size}"),
            };
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
                .get(&self.url(&format!("/orders/v0/orders/{external_id}")), &self.access_token)
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
            let body = serde_json::json!({ "status": "acknowledged" });
            self.http
                .post(&self.url(&format!("/orders/v0/orders/{external_id}/acknowledge")), &self.access_token, body)
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
                "carrierCode": shipment.carrier,
                "trackingNumber": shipment.tracking_number,
                "shipDate": shipment.shipped_at,
            });
            self.http
                .post(&self.url(&format!("/orders/v0/orders/{external_id}/shipmentConfirmation")), &self.access_token, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("fulfillOrder", &e))
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
            let body = serde_json::json!({ "reasonCode": reason });
            self.http
                .post(&self.url(&format!("/orders/v0/orders/{external_id}/cancel")), &self.access_token, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("cancelOrder", &e))
        })
    }

    fn get_price(&self, sku: &str) -> Pin<Box<dyn Future<Output = Result<Decimal, AdapterError>> + Send + '_>> {
        let sku = sku.to_string();
        Box::pin(async move {
            let response = self
                .http
                .get(&self.url(&format!("/products/pricing/v0/price?sku={sku}")), &self.access_token)
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
            let body = serde_json::json!({ "sku": sku, "price": price });
            self.http
                .put(&self.url("/listings/2021-08-01/price"), &self.access_token, body)
                .await
                .map(|_| ())
                .map_err(|e| Self::classify("setPrice", &e))
        })
    }

    fn register_webhook(
        &self,
        _topic: &str,
        _callback_url: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AdapterError>> + Send + '_>> {
        Box::pin(async move { Err(AdapterError::NotSupported { operation: "registerWebhook".to_string() }) })
    }
}

/// Map an Amazon order-status string to the canonical status.
#[must_use]
pub fn canonical_status(raw_channel_status: &str) -> OrderStatus {
    normalise_order_status(raw_channel_status, STATUS_MAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockHttpClient;

    #[tokio::test]
    async fn register_webhook_is_declined() {
        let http: Arc<dyn HttpClient> = Arc::new(MockHttpClient::new(vec![]));
        let adapter = AmazonAdapter::new(http, "https://sellingpartnerapi-na.amazon.com", "token");
        assert!(!adapter.capabilities().register_webhook);
        let result = adapter.register_webhook("orderChange", "https://callback.example").await;
        assert!(matches!(result, Err(AdapterError::NotSupported { .. })));
    }
}
