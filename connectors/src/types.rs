//! Channel-facing data shapes exchanged with [`crate::adapter::ConnectorAdapter`].
//!
//! These are the wire-adjacent shapes an adapter hands back to the engine
//! *before* `domain::order`/`domain::inventory` normalise them into
//! aggregate commands — the normalisation step (spec §4.4 stage 3) is what
//! turns an [`ExternalOrder`] into an `OrderAction::IngestOrder`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in this page.
    pub items: Vec<T>,
    /// Opaque cursor for the next page, `None` once exhausted.
    pub next_cursor: Option<String>,
}

/// A product as the channel represents it, before SKU resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalProduct {
    /// The channel's own identifier for this product.
    pub external_id: String,
    /// The channel's own SKU string.
    pub channel_sku: String,
    /// Display title.
    pub title: String,
    /// Current list price on the channel.
    pub price: Decimal,
    /// ISO 4217 currency the price is denominated in.
    pub currency: String,
}

/// An inventory level as the channel represents it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExternalInventoryLevel {
    /// Quantity the channel currently advertises as available.
    pub quantity: u32,
    /// The channel's own version/etag for this level, if it exposes one.
    pub channel_version: Option<u64>,
}

/// A shipment record attached to a `fulfillOrder` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    /// Carrier name.
    pub carrier: String,
    /// Tracking number, if the carrier assigned one.
    pub tracking_number: Option<String>,
    /// When the shipment was handed to the carrier.
    pub shipped_at: DateTime<Utc>,
}

/// One order line item as the channel represents it, before SKU resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalLineItem {
    /// The channel's own SKU string for this line.
    pub channel_sku: String,
    /// Quantity ordered.
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: Decimal,
}

/// An order as the channel represents it, before normalisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalOrder {
    /// The channel's own order identifier.
    pub external_id: String,
    /// The channel's raw status string; normalisation (spec §4.4 stage 3)
    /// maps unrecognised values to `pending`, never to a terminal status.
    pub channel_status: String,
    /// Line items as listed by the channel.
    pub line_items: Vec<ExternalLineItem>,
    /// Order total as reported by the channel.
    pub total: Decimal,
    /// ISO 4217 currency the total is denominated in.
    pub currency: String,
    /// When the channel last updated this order.
    pub updated_at: DateTime<Utc>,
}
