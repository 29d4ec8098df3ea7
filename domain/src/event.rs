//! Domain event envelope and the fixed set of topic names reconcilers
//! publish to and subscribe on.
//!
//! Distinct from [`syncengine_core::event::Event`] (the event-sourcing
//! trait for events persisted to an aggregate's stream): a `DomainEvent` is
//! a notification broadcast on the [`syncengine_core::event_bus::EventBus`]
//! after a reducer has already committed its state change, carrying just
//! enough to let other reconcilers and the scheduler react without
//! re-deriving the whole aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Topic names on the event bus. Fixed per spec: adapters and reconcilers
/// never invent new topics at runtime.
pub mod topics {
    /// An `InventoryLevel`'s on-hand/reserved/available changed.
    pub const STOCK_CHANGED: &str = "stockChanged";
    /// A new Order was committed by the ingestion pipeline.
    pub const ORDER_INGESTED: &str = "orderIngested";
    /// An existing Order transitioned status.
    pub const ORDER_STATUS_CHANGED: &str = "orderStatusChanged";
    /// A `ChannelBinding` was found missing/erroring on the channel side.
    pub const BINDING_DRIFTED: &str = "bindingDrifted";
    /// An order line item's SKU could not be resolved to a Product.
    pub const SKU_UNMATCHED: &str = "skuUnmatched";
    /// A channel sold more than the internally-advertised available qty.
    pub const OVERSELL_DETECTED: &str = "oversellDetected";
    /// A `SyncJob` failed (including non-retryable rejections).
    pub const JOB_FAILED: &str = "jobFailed";
}

/// Envelope wrapping every fact published on the event bus.
///
/// Carries the minimum spec §6 requires: `{schemaVersion, monotonic
/// sequence, channel, subjectId, timestamp}`, plus a `payload` holding the
/// fact-specific data as a tagged JSON value so new event kinds don't
/// require a bus-wide schema migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Schema version of `payload`'s shape, for forward-compatible
    /// consumers.
    pub schema_version: u32,
    /// Monotonically increasing sequence number, assigned by the publisher.
    pub sequence: u64,
    /// Which channel this event concerns (or `"internal"` for
    /// admin-originated mutations with no single channel).
    pub channel: String,
    /// The entity this event is about (a `ProductId`, `OrderId`, etc. as a
    /// string).
    pub subject_id: String,
    /// When the underlying fact occurred.
    pub occurred_at: DateTime<Utc>,
    /// Fact-specific data, tagged by the topic it was published to.
    pub payload: serde_json::Value,
}

impl DomainEvent {
    /// Build an envelope for `payload`, stamping `occurred_at` with `now`
    /// so callers inject a [`syncengine_core::environment::Clock`] rather
    /// than reading the wall clock directly.
    #[must_use]
    pub fn new(
        sequence: u64,
        channel: impl Into<String>,
        subject_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            schema_version: 1,
            sequence,
            channel: channel.into(),
            subject_id: subject_id.into(),
            occurred_at,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_defaults_to_schema_version_one() {
        let event = DomainEvent::new(1, "shopify", "sku-1", Utc::now(), serde_json::json!({}));
        assert_eq!(event.schema_version, 1);
    }
}
