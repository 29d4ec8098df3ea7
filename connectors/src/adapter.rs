//! The `ConnectorAdapter` trait: one fixed operation surface every channel
//! implements, per spec §4.1's table.

use crate::error::AdapterError;
use crate::types::{ExternalInventoryLevel, ExternalOrder, ExternalProduct, Page, Shipment};
use rust_decimal::Decimal;
use std::future::Future;
use std::pin::Pin;

/// Which optional operations an adapter declines. Declared statically per
/// adapter (spec §4.1: "each adapter declares its capability set
/// statically so the engine can skip unsupported operations") rather than
/// probed at runtime, resolving the open question in spec §9 in favour of
/// compile-time advertisement — see `DESIGN.md`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether `acknowledgeOrder` is supported.
    pub acknowledge_order: bool,
    /// Whether `cancelOrder` is supported.
    pub cancel_order: bool,
    /// Whether `registerWebhook` is supported.
    pub register_webhook: bool,
}

impl Capabilities {
    /// Every optional operation supported; the common case.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            acknowledge_order: true,
            cancel_order: true,
            register_webhook: true,
        }
    }
}

/// Translates between the engine's canonical data model and one channel's
/// native surface (spec §4.1).
///
/// Dyn-compatible via `Pin<Box<dyn Future>>` returns, matching
/// `syncengine_core::event_store::EventStore`, so the engine can hold
/// `Arc<dyn ConnectorAdapter>` behind a per-channel-type factory (spec §9:
/// "connectors registered by channel type at startup through a factory").
///
/// Contract invariants (spec §4.1), binding on every implementation:
/// - Read operations are idempotent.
/// - `setInventory` sends an absolute quantity, never a delta, so retries
///   are always safe.
/// - Unknown channel status values normalise to `pending` (orders), never to
///   a terminal status.
pub trait ConnectorAdapter: Send + Sync {
    /// This adapter's statically declared capability set.
    fn capabilities(&self) -> Capabilities;

    /// Which channel type this adapter serves (e.g. `"shopify"`).
    fn channel_type(&self) -> &'static str;

    /// Establish a connection/session for this account.
    fn connect(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>>;

    /// Tear down the connection/session.
    fn disconnect(&self) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>>;

    /// List a page of products.
    fn list_products(
        &self,
        cursor: Option<String>,
        page_size: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Page<ExternalProduct>, AdapterError>> + Send + '_>>;

    /// Fetch a single product.
    fn get_product(
        &self,
        external_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ExternalProduct, AdapterError>> + Send + '_>>;

    /// Fetch a SKU's current inventory level.
    fn get_inventory(
        &self,
        sku: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ExternalInventoryLevel, AdapterError>> + Send + '_>>;

    /// Push an absolute quantity for a SKU, guarded by an optimistic
    /// version.
    fn set_inventory(
        &self,
        sku: &str,
        quantity: u32,
        version: u64,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>>;

    /// List orders updated since `since`, paginated.
    fn list_orders(
        &self,
        since: chrono::DateTime<chrono::Utc>,
        cursor: Option<String>,
        page_size: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Page<ExternalOrder>, AdapterError>> + Send + '_>>;

    /// Fetch a single order.
    fn get_order(
        &self,
        external_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ExternalOrder, AdapterError>> + Send + '_>>;

    /// Acknowledge receipt of an order to the channel. Returns
    /// [`AdapterError::NotSupported`] if [`Capabilities::acknowledge_order`]
    /// is `false`.
    fn acknowledge_order(
        &self,
        external_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>>;

    /// Record a fulfilment/shipment against an order.
    fn fulfill_order(
        &self,
        external_id: &str,
        shipment: Shipment,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>>;

    /// Cancel an order. Returns [`AdapterError::NotSupported`] if
    /// [`Capabilities::cancel_order`] is `false`.
    fn cancel_order(
        &self,
        external_id: &str,
        reason: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>>;

    /// Fetch a SKU's current channel price.
    fn get_price(
        &self,
        sku: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Decimal, AdapterError>> + Send + '_>>;

    /// Push a price for a SKU.
    fn set_price(
        &self,
        sku: &str,
        price: Decimal,
    ) -> Pin<Box<dyn Future<Output = Result<(), AdapterError>> + Send + '_>>;

    /// Register a webhook subscription. Returns
    /// [`AdapterError::NotSupported`] if [`Capabilities::register_webhook`]
    /// is `false`.
    fn register_webhook(
        &self,
        topic: &str,
        callback_url: &str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AdapterError>> + Send + '_>>;
}
