//! Order Ingestion Pipeline: exactly-once admission of every external
//! order, normalisation, and routing to fulfilment.
//!
//! One [`OrderReducer`] aggregate tracks a single order, keyed by
//! `(channel, externalOrderId)`. Adapted from the order-processing
//! example's 4-state linear lifecycle, expanded to the seven-state DAG in
//! spec §4.4 and to the dedup/reserve/route stages the pipeline requires
//! before an order may be marked ingested.

use crate::ids::{ChannelId, OrderId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use syncengine_core::effect::Effect;
use syncengine_core::environment::Clock;
use syncengine_core::event::SerializedEvent;
use syncengine_core::event_store::EventStore;
use syncengine_core::reducer::Reducer;
use syncengine_core::stream::{StreamId, Version};
use syncengine_core::{append_events, smallvec, SmallVec};
use syncengine_macros::{Action, State};

/// Dependencies available to the order reducer.
#[derive(Clone)]
pub struct OrderEnvironment {
    /// Event store backing this order's aggregate stream.
    pub event_store: Arc<dyn EventStore>,
    /// Clock for stamping event timestamps.
    pub clock: Arc<dyn Clock>,
}

impl OrderEnvironment {
    /// Build an environment from its dependencies.
    #[must_use]
    pub const fn new(event_store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Self {
        Self { event_store, clock }
    }
}

/// Canonical order status. Forms the DAG fixed by spec §4.4; transitions
/// outside it are rejected by [`OrderReducer::validate_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Freshly ingested, not yet reserved or routed.
    Pending,
    /// Inventory reserved and routed; awaiting fulfilment.
    Processing,
    /// Held, typically for insufficient inventory.
    OnHold,
    /// Handed off to a carrier.
    Shipped,
    /// Confirmed received by the customer.
    Delivered,
    /// Terminal: cancelled before shipment.
    Cancelled,
    /// Terminal: refunded after shipment or delivery.
    Refunded,
}

impl OrderStatus {
    /// Whether `self -> to` is one of the fixed DAG edges in spec §4.4.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::OnHold)
                | (Self::Pending, Self::Cancelled)
                | (Self::Processing, Self::Shipped)
                | (Self::Processing, Self::OnHold)
                | (Self::Processing, Self::Cancelled)
                | (Self::OnHold, Self::Pending)
                | (Self::OnHold, Self::Processing)
                | (Self::OnHold, Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
                | (Self::Shipped, Self::Refunded)
                | (Self::Delivered, Self::Refunded)
        )
    }
}

/// One order line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Resolved internal SKU, or `None` if unresolved (spec §4.4 stage 3:
    /// unresolved SKUs produce a `skuUnmatched` event but don't block
    /// ingestion).
    pub sku: Option<String>,
    /// The channel's own SKU for this line, always present.
    pub channel_sku: String,
    /// Quantity ordered.
    pub quantity: u32,
    /// Price per unit.
    pub unit_price: Money,
}

/// State of one order aggregate.
#[derive(Debug, Clone, State, Serialize, Deserialize)]
pub struct OrderState {
    /// Internal order id, assigned on first ingestion.
    pub order_id: Option<OrderId>,
    /// Channel this order originated on.
    pub channel: Option<ChannelId>,
    /// The channel's own order identifier; forms the dedup key with
    /// `channel` (spec §3, invariant 2).
    pub external_order_id: Option<String>,
    /// Line items as last normalised. Never overwritten by a
    /// compare-and-update (spec §4.4 stage 2).
    pub line_items: Vec<LineItem>,
    /// Current status.
    pub status: OrderStatus,
    /// Reason the order is on hold, if `status == OnHold`.
    pub hold_reason: Option<String>,
    /// Order total.
    pub total: Option<Money>,
    /// Assigned fulfilment location, set during routing (stage 5).
    pub fulfilment_location: Option<String>,
    /// Monotonically increasing aggregate version.
    #[version]
    pub version: Option<Version>,
    /// Most recent validation failure, kept observable in state.
    pub last_error: Option<String>,
}

impl Default for OrderState {
    fn default() -> Self {
        Self {
            order_id: None,
            channel: None,
            external_order_id: None,
            line_items: Vec::new(),
            status: OrderStatus::Pending,
            hold_reason: None,
            total: None,
            fulfilment_location: None,
            version: None,
            last_error: None,
        }
    }
}

/// A fulfilment location the engine knows about for an order's channel,
/// supplied alongside `RouteToFulfilment` so the routing decision itself
/// stays inside the reducer (spec §4.4 stage 5: "pick a fulfilment location
/// by a pluggable policy").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfilmentCandidate {
    /// Location identifier (warehouse code, 3PL id, etc.).
    pub location: String,
    /// Distance from the shipping address, used by [`FulfilmentRoutingPolicy::Nearest`].
    pub distance_km: f64,
    /// Estimated fulfilment cost, used by [`FulfilmentRoutingPolicy::Cheapest`].
    pub cost: Money,
    /// Channel this location is pinned to, used by [`FulfilmentRoutingPolicy::ChannelPinned`].
    pub pinned_channel: Option<ChannelId>,
}

/// Pluggable fulfilment routing policy (spec §4.4 stage 5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FulfilmentRoutingPolicy {
    /// Closest location by distance.
    #[default]
    Nearest,
    /// Lowest estimated cost.
    Cheapest,
    /// Cycle through candidates in order, one per call.
    RoundRobin,
    /// The location pinned to the order's channel, if any.
    ChannelPinned,
}

/// Select a fulfilment location from `candidates` under `policy`.
///
/// Pure and I/O-free: the caller resolves candidates ahead of time.
/// Returns `None` only when `candidates` is empty, or when `ChannelPinned`
/// finds no location pinned to `channel`.
#[must_use]
pub fn select_fulfilment_location(
    policy: FulfilmentRoutingPolicy,
    candidates: &[FulfilmentCandidate],
    channel: &ChannelId,
    round_robin_index: usize,
) -> Option<String> {
    match policy {
        FulfilmentRoutingPolicy::Nearest => candidates
            .iter()
            .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
            .map(|c| c.location.clone()),
        FulfilmentRoutingPolicy::Cheapest => candidates
            .iter()
            .min_by_key(|c| c.cost.amount())
            .map(|c| c.location.clone()),
        FulfilmentRoutingPolicy::RoundRobin => {
            if candidates.is_empty() {
                None
            } else {
                Some(candidates[round_robin_index % candidates.len()].location.clone())
            }
        },
        FulfilmentRoutingPolicy::ChannelPinned => candidates
            .iter()
            .find(|c| c.pinned_channel.as_ref() == Some(channel))
            .map(|c| c.location.clone()),
    }
}

/// Commands and events for the order aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, Action)]
pub enum OrderAction {
    /// Command: admit a freshly polled or webhook-delivered order. If this
    /// aggregate already has an order, this is a dedup hit: only mutable
    /// fields are considered for update, never `line_items`.
    #[command]
    IngestOrder {
        /// Internal order id to assign on first ingestion.
        order_id: OrderId,
        /// Channel the order came from.
        channel: ChannelId,
        /// The channel's own order identifier.
        external_order_id: String,
        /// Normalised line items, with unresolved SKUs left `None`.
        line_items: Vec<LineItem>,
        /// Order total.
        total: Money,
    },
    /// Command: record the outcome of the atomic inventory reservation
    /// step (stage 4).
    #[command]
    RecordReservationOutcome {
        /// Whether every line item reserved successfully.
        success: bool,
    },
    /// Command: assign a fulfilment location by applying `policy` over
    /// `candidates` (stage 5). The caller (the engine) supplies the
    /// candidate locations it knows about for this channel so the reducer
    /// stays free of I/O while still making the routing decision itself.
    #[command]
    RouteToFulfilment {
        /// Candidate locations to choose among.
        candidates: Vec<FulfilmentCandidate>,
        /// Policy to apply when selecting among `candidates`.
        policy: FulfilmentRoutingPolicy,
        /// Cursor for `RoundRobin`, advanced by the caller between calls.
        round_robin_index: usize,
    },
    /// Command: a channel-driven status change (shipment, cancellation,
    /// refund, etc.), validated against the DAG.
    #[command]
    ChangeStatus {
        /// Target status.
        to: OrderStatus,
        /// Reason, used when transitioning to `OnHold`.
        reason: Option<String>,
    },

    /// Event: order admitted for the first time.
    #[event]
    OrderIngested {
        /// Assigned order id.
        order_id: OrderId,
        /// Originating channel.
        channel: ChannelId,
        /// The channel's own order identifier.
        external_order_id: String,
        /// Normalised line items.
        line_items: Vec<LineItem>,
        /// Order total.
        total: Money,
        /// When this happened.
        timestamp: DateTime<Utc>,
    },
    /// Event: a duplicate poll/webhook updated only mutable fields.
    #[event]
    OrderUpdated {
        /// New total, if changed.
        total: Money,
        /// When this happened.
        timestamp: DateTime<Utc>,
    },
    /// Event: inventory reservation succeeded; order moves to processing.
    #[event]
    InventoryReserved {
        /// When this happened.
        timestamp: DateTime<Utc>,
    },
    /// Event: inventory reservation failed; order moves to `onHold`.
    #[event]
    InventoryInsufficient {
        /// When this happened.
        timestamp: DateTime<Utc>,
    },
    /// Event: a fulfilment location was assigned.
    #[event]
    RoutedToFulfilment {
        /// Chosen location identifier.
        location: String,
    },
    /// Event: status changed along a permitted DAG edge.
    #[event]
    StatusChanged {
        /// Prior status.
        from: OrderStatus,
        /// New status.
        to: OrderStatus,
        /// Reason, for `OnHold` transitions.
        reason: Option<String>,
        /// When this happened.
        timestamp: DateTime<Utc>,
    },
    /// Event: a command failed validation (including a rejected DAG edge,
    /// spec §8 scenario 6 — `invalidTransition`).
    #[event]
    ValidationFailed {
        /// What went wrong.
        error: String,
    },

    /// Internal feedback: the event store persisted an event at `version`.
    EventPersisted {
        /// The event that was persisted.
        event: Box<OrderAction>,
        /// Version assigned by the event store.
        version: u64,
    },
}

/// Reducer implementing the order ingestion and lifecycle business logic.
#[derive(Clone, Default)]
pub struct OrderReducer;

impl OrderReducer {
    /// Construct the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// The event store stream an order's aggregate lives on. Exposed so
    /// callers can load and replay history ahead of sending a command (the
    /// engine does this once per pulled order before reducing).
    #[must_use]
    pub fn stream_id(channel: &ChannelId, external_order_id: &str) -> StreamId {
        StreamId::new(format!("order-{}-{}", channel.as_str(), external_order_id))
    }

    /// Applies an event to state during replay or immediately after a
    /// command is validated.
    pub fn apply_event(state: &mut OrderState, action: &OrderAction) {
        match action {
            OrderAction::OrderIngested {
                order_id,
                channel,
                external_order_id,
                line_items,
                total,
                ..
            } => {
                state.order_id = Some(order_id.clone());
                state.channel = Some(channel.clone());
                state.external_order_id = Some(external_order_id.clone());
                state.line_items.clone_from(line_items);
                state.total = Some(*total);
                state.status = OrderStatus::Pending;
            },
            OrderAction::OrderUpdated { total, .. } => {
                state.total = Some(*total);
            },
            OrderAction::InventoryReserved { .. } => {
                state.status = OrderStatus::Processing;
                state.hold_reason = None;
            },
            OrderAction::InventoryInsufficient { .. } => {
                state.status = OrderStatus::OnHold;
                state.hold_reason = Some("insufficientInventory".to_string());
            },
            OrderAction::RoutedToFulfilment { location } => {
                state.fulfilment_location = Some(location.clone());
            },
            OrderAction::StatusChanged { to, reason, .. } => {
                state.status = *to;
                state.hold_reason = reason.clone();
            },
            OrderAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },
            OrderAction::IngestOrder { .. }
            | OrderAction::RecordReservationOutcome { .. }
            | OrderAction::RouteToFulfilment { .. }
            | OrderAction::ChangeStatus { .. }
            | OrderAction::EventPersisted { .. } => {
                // Commands and feedback actions are not applied during replay.
            },
        }
    }

    fn serialize_event(action: &OrderAction) -> Result<SerializedEvent, String> {
        let event_type = action.event_type().to_string();
        let data = bincode::serialize(action).map_err(|e| format!("failed to serialize event: {e}"))?;
        Ok(SerializedEvent::new(event_type, data, None))
    }

    fn create_append_effect(
        event_store: Arc<dyn EventStore>,
        stream_id: StreamId,
        expected_version: Option<Version>,
        event: OrderAction,
    ) -> Effect<OrderAction> {
        let serialized_event = match Self::serialize_event(&event) {
            Ok(e) => e,
            Err(error) => {
                tracing::error!("failed to serialize order event: {error}");
                return Effect::None;
            },
        };

        append_events! {
            store: event_store,
            stream: stream_id.as_str(),
            expected_version: expected_version,
            events: vec![serialized_event],
            on_success: |version| Some(OrderAction::EventPersisted {
                event: Box::new(event.clone()),
                version: version.value(),
            }),
            on_error: |error| Some(OrderAction::ValidationFailed {
                error: error.to_string(),
            })
        }
    }

    fn fail(state: &mut OrderState, error: String) -> SmallVec<[Effect<OrderAction>; 4]> {
        tracing::warn!("order command validation failed: {error}");
        Self::apply_event(state, &OrderAction::ValidationFailed { error });
        smallvec![Effect::None]
    }
}

impl Reducer for OrderReducer {
    type State = OrderState;
    type Action = OrderAction;
    type Environment = OrderEnvironment;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            OrderAction::IngestOrder {
                order_id,
                channel,
                external_order_id,
                line_items,
                total,
            } => {
                let stream_id = Self::stream_id(&channel, &external_order_id);

                if state.order_id.is_some() {
                    // Dedup hit: compare-and-update mutable fields only.
                    if state.total == Some(total) {
                        return smallvec![Effect::None];
                    }
                    let event = OrderAction::OrderUpdated {
                        total,
                        timestamp: env.clock.now(),
                    };
                    return smallvec![Self::create_append_effect(
                        Arc::clone(&env.event_store),
                        stream_id,
                        state.version,
                        event,
                    )];
                }

                let event = OrderAction::OrderIngested {
                    order_id,
                    channel,
                    external_order_id,
                    line_items,
                    total,
                    timestamp: env.clock.now(),
                };
                smallvec![Self::create_append_effect(
                    Arc::clone(&env.event_store),
                    stream_id,
                    state.version,
                    event,
                )]
            },

            OrderAction::RecordReservationOutcome { success } => {
                let Some(channel) = state.channel.clone() else {
                    return Self::fail(state, "cannot reserve inventory before ingestion".to_string());
                };
                let Some(external_order_id) = state.external_order_id.clone() else {
                    return Self::fail(state, "cannot reserve inventory before ingestion".to_string());
                };
                if state.status != OrderStatus::Pending {
                    return Self::fail(state, format!("cannot reserve inventory from status {:?}", state.status));
                }

                let event = if success {
                    OrderAction::InventoryReserved { timestamp: env.clock.now() }
                } else {
                    OrderAction::InventoryInsufficient { timestamp: env.clock.now() }
                };
                smallvec![Self::create_append_effect(
                    Arc::clone(&env.event_store),
                    Self::stream_id(&channel, &external_order_id),
                    state.version,
                    event,
                )]
            },

            OrderAction::RouteToFulfilment {
                candidates,
                policy,
                round_robin_index,
            } => {
                let (Some(channel), Some(external_order_id)) =
                    (state.channel.clone(), state.external_order_id.clone())
                else {
                    return Self::fail(state, "cannot route before ingestion".to_string());
                };
                let Some(location) = select_fulfilment_location(policy, &candidates, &channel, round_robin_index)
                else {
                    return Self::fail(state, format!("no fulfilment candidate available under {policy:?}"));
                };
                let event = OrderAction::RoutedToFulfilment { location };
                smallvec![Self::create_append_effect(
                    Arc::clone(&env.event_store),
                    Self::stream_id(&channel, &external_order_id),
                    state.version,
                    event,
                )]
            },

            OrderAction::ChangeStatus { to, reason } => {
                let (Some(channel), Some(external_order_id)) =
                    (state.channel.clone(), state.external_order_id.clone())
                else {
                    return Self::fail(state, "cannot change status before ingestion".to_string());
                };

                if !state.status.can_transition_to(to) {
                    return Self::fail(
                        state,
                        format!("invalidTransition: {:?} -> {:?}", state.status, to),
                    );
                }

                let event = OrderAction::StatusChanged {
                    from: state.status,
                    to,
                    reason,
                    timestamp: env.clock.now(),
                };
                smallvec![Self::create_append_effect(
                    Arc::clone(&env.event_store),
                    Self::stream_id(&channel, &external_order_id),
                    state.version,
                    event,
                )]
            },

            OrderAction::OrderIngested { .. }
            | OrderAction::OrderUpdated { .. }
            | OrderAction::InventoryReserved { .. }
            | OrderAction::InventoryInsufficient { .. }
            | OrderAction::RoutedToFulfilment { .. }
            | OrderAction::StatusChanged { .. } => {
                Self::apply_event(state, &action);
                state.version = match state.version {
                    None => Some(Version::new(1)),
                    Some(v) => Some(v.next()),
                };
                smallvec![Effect::None]
            },

            OrderAction::EventPersisted { event, version } => {
                Self::apply_event(state, &event);
                state.version = Some(Version::new(version));
                smallvec![Effect::None]
            },

            OrderAction::ValidationFailed { error } => {
                tracing::debug!("order validation failure processed: {error}");
                smallvec![Effect::None]
            },
        }
    }
}
