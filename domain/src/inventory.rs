//! Inventory Reconciler: keeps every `ChannelBinding`'s advertised quantity
//! consistent with the internal `InventoryLevel`, without oversell.
//!
//! One [`InventoryReducer`] aggregate tracks a single SKU's stock. Adapted
//! from the order-processing example's command → validate → event →
//! append-effect → apply-on-replay shape, generalised from an order's
//! linear lifecycle to inventory mutation with idempotent per-channel
//! push-version tracking and a sale dedup log.

use crate::event::{topics, DomainEvent};
use crate::ids::{ChannelId, Sku};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use syncengine_core::effect::Effect;
use syncengine_core::environment::Clock;
use syncengine_core::event::SerializedEvent;
use syncengine_core::event_bus::EventBus;
use syncengine_core::event_store::EventStore;
use syncengine_core::reducer::Reducer;
use syncengine_core::stream::{StreamId, Version};
use syncengine_core::{append_events, async_effect, publish_event, smallvec, SmallVec};
use syncengine_macros::{Action, State};
use syncengine_runtime::scheduler::{JobKind, SchedulerHandle, SyncJob};

/// Dependencies available to the inventory reducer.
#[derive(Clone)]
pub struct InventoryEnvironment {
    /// Event store backing this SKU's aggregate stream.
    pub event_store: Arc<dyn EventStore>,
    /// Clock for stamping event timestamps.
    pub clock: Arc<dyn Clock>,
    /// Bus `stockChanged` is published to once an on-hand change commits
    /// (spec §6 event bus contract).
    pub event_bus: Arc<dyn EventBus>,
    /// Scheduler handle used to enqueue the version-gated `pushInventory`
    /// fan-out (spec §4.3 write path).
    pub scheduler: SchedulerHandle,
}

impl InventoryEnvironment {
    /// Build an environment from its dependencies.
    #[must_use]
    pub const fn new(
        event_store: Arc<dyn EventStore>,
        clock: Arc<dyn Clock>,
        event_bus: Arc<dyn EventBus>,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            event_store,
            clock,
            event_bus,
            scheduler,
        }
    }
}

/// State of one SKU's authoritative inventory level.
///
/// Invariant (spec §8 invariant 1): `available = on_hand - reserved >= 0`
/// and `version` strictly increases across mutations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, State)]
pub struct InventoryState {
    /// The SKU this aggregate tracks. `None` until the first event applies.
    pub sku: Option<Sku>,
    /// True physical on-hand quantity.
    pub on_hand: u32,
    /// Quantity reserved against in-flight orders.
    pub reserved: u32,
    /// Per-channel last successfully acknowledged push version.
    pub channel_last_pushed: HashMap<String, u64>,
    /// Dedup log of (channel, `external_order_id`) pairs already applied as
    /// channel-sourced sales, preventing double-decrement (spec §4.3).
    pub applied_channel_sales: HashSet<(String, String)>,
    /// Monotonically increasing aggregate version.
    #[version]
    pub version: Option<Version>,
    /// Most recent validation failure, if any, kept observable in state.
    pub last_error: Option<String>,
}

impl InventoryState {
    /// Available quantity: on-hand minus reserved. Never negative by
    /// construction — every mutation that would drive it negative is
    /// rejected (or flagged as an oversell incident rather than applied).
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.on_hand.saturating_sub(self.reserved)
    }
}

/// Commands and events for the inventory aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, Action)]
pub enum InventoryAction {
    /// Command: set the true on-hand quantity (admin action or a channel
    /// pull reconciling counts).
    #[command]
    SetOnHand {
        /// Target SKU.
        sku: Sku,
        /// New absolute on-hand quantity.
        quantity: u32,
        /// Channels this SKU is currently bound to, supplied by the caller
        /// (the engine, from its `ChannelBinding` repository/config) so the
        /// reducer stays free of I/O while still driving the version-gated
        /// fan-out (spec §4.3).
        bindings: Vec<ChannelId>,
    },
    /// Command: reserve `qty` against an order, moving it from available to
    /// reserved.
    #[command]
    ReserveStock {
        /// Target SKU.
        sku: Sku,
        /// Order this reservation is for.
        order_id: String,
        /// Quantity to reserve.
        qty: u32,
    },
    /// Command: release a previously made reservation (order cancelled or
    /// put on hold).
    #[command]
    ReleaseReservation {
        /// Target SKU.
        sku: Sku,
        /// Order the reservation belonged to.
        order_id: String,
        /// Quantity to release.
        qty: u32,
    },
    /// Command: a channel reported a sale that decrements stock
    /// authoritatively (spec §4.3 conflict path).
    #[command]
    RecordChannelSale {
        /// Target SKU.
        sku: Sku,
        /// Channel that reported the sale.
        channel: ChannelId,
        /// The channel's order identifier, for dedup.
        external_order_id: String,
        /// Quantity sold.
        qty: u32,
    },
    /// Command: the adapter acknowledged a successful `pushInventory` job.
    #[command]
    RecordChannelPush {
        /// Target SKU.
        sku: Sku,
        /// Channel that was pushed to.
        channel: ChannelId,
        /// Aggregate version that was pushed.
        pushed_version: u64,
    },

    /// Event: on-hand quantity changed.
    #[event]
    OnHandSet {
        /// Target SKU.
        sku: Sku,
        /// New absolute on-hand quantity.
        quantity: u32,
        /// Channels considered active for this SKU when the change was
        /// made; drives the push-fan-out once this event commits.
        bindings: Vec<ChannelId>,
        /// When this happened.
        timestamp: DateTime<Utc>,
    },
    /// Event: stock reserved against an order.
    #[event]
    StockReserved {
        /// Target SKU.
        sku: Sku,
        /// Order the reservation is for.
        order_id: String,
        /// Quantity reserved.
        qty: u32,
        /// When this happened.
        timestamp: DateTime<Utc>,
    },
    /// Event: a reservation was released.
    #[event]
    ReservationReleased {
        /// Target SKU.
        sku: Sku,
        /// Order the reservation belonged to.
        order_id: String,
        /// Quantity released.
        qty: u32,
        /// When this happened.
        timestamp: DateTime<Utc>,
    },
    /// Event: a channel-sourced sale was applied.
    #[event]
    ChannelSaleApplied {
        /// Target SKU.
        sku: Sku,
        /// Channel that reported the sale.
        channel: ChannelId,
        /// The channel's order identifier.
        external_order_id: String,
        /// Quantity sold.
        qty: u32,
        /// When this happened.
        timestamp: DateTime<Utc>,
    },
    /// Event: a channel acknowledged a push.
    #[event]
    ChannelPushAcked {
        /// Target SKU.
        sku: Sku,
        /// Channel that was pushed to.
        channel: ChannelId,
        /// Aggregate version that was pushed.
        pushed_version: u64,
    },
    /// Event: a channel sold more than the internally-advertised available
    /// quantity. The core never silently adjusts; this is surfaced for
    /// operator attention (spec §4.3, §7).
    #[event]
    OversellDetected {
        /// Target SKU.
        sku: Sku,
        /// Channel responsible for the oversell.
        channel: ChannelId,
        /// The channel's order identifier.
        external_order_id: String,
        /// How far over available quantity the sale drove inventory.
        excess: u32,
        /// When this happened.
        timestamp: DateTime<Utc>,
    },
    /// Event: a command failed validation.
    #[event]
    ValidationFailed {
        /// What went wrong.
        error: String,
    },

    /// Internal feedback: the event store persisted an event at `version`.
    EventPersisted {
        /// The event that was persisted.
        event: Box<InventoryAction>,
        /// Version assigned by the event store.
        version: u64,
    },
}

/// Reducer implementing inventory reconciliation business logic.
#[derive(Clone, Default)]
pub struct InventoryReducer;

impl InventoryReducer {
    /// Construct the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// The event store stream a SKU's aggregate lives on. Exposed so
    /// callers can load and replay history ahead of sending a command (the
    /// engine does this once per pulled adapter page before reducing).
    #[must_use]
    pub fn stream_id(sku: &Sku) -> StreamId {
        StreamId::new(format!("inventory-{}", sku.as_str()))
    }

    /// Applies an event to state during replay or immediately after a
    /// command is validated. Deterministic and idempotent.
    pub fn apply_event(state: &mut InventoryState, action: &InventoryAction) {
        match action {
            InventoryAction::OnHandSet { sku, quantity, .. } => {
                state.sku = Some(sku.clone());
                state.on_hand = *quantity;
            },
            InventoryAction::StockReserved { order_id: _, qty, .. } => {
                state.reserved = state.reserved.saturating_add(*qty);
            },
            InventoryAction::ReservationReleased { qty, .. } => {
                state.reserved = state.reserved.saturating_sub(*qty);
            },
            InventoryAction::ChannelSaleApplied {
                channel,
                external_order_id,
                qty,
                ..
            } => {
                state
                    .applied_channel_sales
                    .insert((channel.as_str().to_string(), external_order_id.clone()));
                state.on_hand = state.on_hand.saturating_sub(*qty);
                state.reserved = state.reserved.saturating_sub((*qty).min(state.reserved));
            },
            InventoryAction::ChannelPushAcked {
                channel,
                pushed_version,
                ..
            } => {
                state
                    .channel_last_pushed
                    .insert(channel.as_str().to_string(), *pushed_version);
            },
            InventoryAction::OversellDetected { .. } => {
                // Oversell is recorded for observers; it does not itself
                // mutate on-hand/reserved — the core never silently adjusts.
            },
            InventoryAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },
            InventoryAction::SetOnHand { .. }
            | InventoryAction::ReserveStock { .. }
            | InventoryAction::ReleaseReservation { .. }
            | InventoryAction::RecordChannelSale { .. }
            | InventoryAction::RecordChannelPush { .. }
            | InventoryAction::EventPersisted { .. } => {
                // Commands and feedback actions are not applied during replay.
            },
        }
    }

    fn validate_reserve(state: &InventoryState, qty: u32) -> Result<(), String> {
        if qty == 0 {
            return Err("reservation quantity must be positive".to_string());
        }
        if state.available() < qty {
            return Err("insufficient available inventory".to_string());
        }
        Ok(())
    }

    fn serialize_event(action: &InventoryAction) -> Result<SerializedEvent, String> {
        let event_type = action.event_type().to_string();
        let data = bincode::serialize(action).map_err(|e| format!("failed to serialize event: {e}"))?;
        Ok(SerializedEvent::new(event_type, data, None))
    }

    fn create_append_effect(
        event_store: Arc<dyn EventStore>,
        stream_id: StreamId,
        expected_version: Option<Version>,
        event: InventoryAction,
    ) -> Effect<InventoryAction> {
        let serialized_event = match Self::serialize_event(&event) {
            Ok(e) => e,
            Err(error) => {
                tracing::error!("failed to serialize inventory event: {error}");
                return Effect::None;
            },
        };

        append_events! {
            store: event_store,
            stream: stream_id.as_str(),
            expected_version: expected_version,
            events: vec![serialized_event],
            on_success: |version| Some(InventoryAction::EventPersisted {
                event: Box::new(event.clone()),
                version: version.value(),
            }),
            on_error: |error| Some(InventoryAction::ValidationFailed {
                error: error.to_string(),
            })
        }
    }

    fn fail(state: &mut InventoryState, error: String) -> SmallVec<[Effect<InventoryAction>; 4]> {
        tracing::warn!("inventory command validation failed: {error}");
        Self::apply_event(state, &InventoryAction::ValidationFailed { error });
        smallvec![Effect::None]
    }

    /// Publish a `stockChanged` `DomainEvent`, using the newly persisted
    /// stream version as the envelope's monotonic sequence (spec §6 event
    /// bus contract).
    fn publish_stock_changed(
        event_bus: Arc<dyn EventBus>,
        sku: &Sku,
        quantity: u32,
        version: u64,
        timestamp: DateTime<Utc>,
    ) -> Effect<InventoryAction> {
        let domain_event = DomainEvent::new(
            version,
            "internal",
            sku.as_str(),
            timestamp,
            serde_json::json!({ "sku": sku.as_str(), "quantity": quantity, "version": version }),
        );
        let data = match bincode::serialize(&domain_event) {
            Ok(data) => data,
            Err(error) => {
                tracing::error!("failed to serialize stockChanged event: {error}");
                return Effect::None;
            },
        };
        let serialized = SerializedEvent::new(topics::STOCK_CHANGED.to_string(), data, None);

        publish_event! {
            bus: event_bus,
            topic: topics::STOCK_CHANGED,
            event: serialized,
            on_success: || None,
            on_error: |error| Some(InventoryAction::ValidationFailed {
                error: format!("failed to publish stockChanged: {error}"),
            })
        }
    }

    /// Enqueue a `pushInventory` job for `channel`, gated by the caller
    /// having already confirmed `channel`'s last-pushed version is behind
    /// `version` (spec §4.3 idempotent fan-out).
    fn submit_push_inventory_job(
        scheduler: SchedulerHandle,
        sku: Sku,
        channel: ChannelId,
        quantity: u32,
        version: u64,
    ) -> Effect<InventoryAction> {
        let job = SyncJob::new(
            format!("push-inventory-{}-{}-{version}", channel.as_str(), sku.as_str()),
            JobKind::PushInventory,
            channel.as_str(),
            serde_json::json!({ "sku": sku.as_str(), "quantity": quantity, "version": version }),
        );
        async_effect! {
            scheduler.submit(job).await;
            None
        }
    }
}

impl Reducer for InventoryReducer {
    type State = InventoryState;
    type Action = InventoryAction;
    type Environment = InventoryEnvironment;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            InventoryAction::SetOnHand { sku, quantity, bindings } => {
                let event = InventoryAction::OnHandSet {
                    sku: sku.clone(),
                    quantity,
                    bindings,
                    timestamp: env.clock.now(),
                };
                smallvec![Self::create_append_effect(
                    Arc::clone(&env.event_store),
                    Self::stream_id(&sku),
                    state.version,
                    event,
                )]
            },

            InventoryAction::ReserveStock { sku, order_id, qty } => {
                if let Err(error) = Self::validate_reserve(state, qty) {
                    return Self::fail(state, error);
                }
                let event = InventoryAction::StockReserved {
                    sku: sku.clone(),
                    order_id,
                    qty,
                    timestamp: env.clock.now(),
                };
                smallvec![Self::create_append_effect(
                    Arc::clone(&env.event_store),
                    Self::stream_id(&sku),
                    state.version,
                    event,
                )]
            },

            InventoryAction::ReleaseReservation { sku, order_id, qty } => {
                let event = InventoryAction::ReservationReleased {
                    sku: sku.clone(),
                    order_id,
                    qty,
                    timestamp: env.clock.now(),
                };
                smallvec![Self::create_append_effect(
                    Arc::clone(&env.event_store),
                    Self::stream_id(&sku),
                    state.version,
                    event,
                )]
            },

            InventoryAction::RecordChannelSale {
                sku,
                channel,
                external_order_id,
                qty,
            } => {
                let dedup_key = (channel.as_str().to_string(), external_order_id.clone());
                if state.applied_channel_sales.contains(&dedup_key) {
                    // Already applied; webhook + poll duplicate (spec §9).
                    tracing::debug!("duplicate channel sale ignored: {dedup_key:?}");
                    return smallvec![Effect::None];
                }

                let available = state.available();
                let timestamp = env.clock.now();

                if qty > available {
                    let excess = qty - available;
                    let oversell = InventoryAction::OversellDetected {
                        sku: sku.clone(),
                        channel: channel.clone(),
                        external_order_id: external_order_id.clone(),
                        excess,
                        timestamp,
                    };
                    let sale = InventoryAction::ChannelSaleApplied {
                        sku: sku.clone(),
                        channel,
                        external_order_id,
                        qty,
                        timestamp,
                    };
                    return smallvec![
                        Self::create_append_effect(
                            Arc::clone(&env.event_store),
                            Self::stream_id(&sku),
                            state.version,
                            sale,
                        ),
                        Self::create_append_effect(
                            Arc::clone(&env.event_store),
                            Self::stream_id(&sku),
                            state.version,
                            oversell,
                        ),
                    ];
                }

                let event = InventoryAction::ChannelSaleApplied {
                    sku: sku.clone(),
                    channel,
                    external_order_id,
                    qty,
                    timestamp,
                };
                smallvec![Self::create_append_effect(
                    Arc::clone(&env.event_store),
                    Self::stream_id(&sku),
                    state.version,
                    event,
                )]
            },

            InventoryAction::RecordChannelPush {
                sku,
                channel,
                pushed_version,
            } => {
                let event = InventoryAction::ChannelPushAcked {
                    sku: sku.clone(),
                    channel,
                    pushed_version,
                };
                smallvec![Self::create_append_effect(
                    Arc::clone(&env.event_store),
                    Self::stream_id(&sku),
                    state.version,
                    event,
                )]
            },

            InventoryAction::OnHandSet { .. }
            | InventoryAction::StockReserved { .. }
            | InventoryAction::ReservationReleased { .. }
            | InventoryAction::ChannelSaleApplied { .. }
            | InventoryAction::ChannelPushAcked { .. }
            | InventoryAction::OversellDetected { .. } => {
                Self::apply_event(state, &action);
                state.version = match state.version {
                    None => Some(Version::new(1)),
                    Some(v) => Some(v.next()),
                };
                smallvec![Effect::None]
            },

            InventoryAction::EventPersisted { event, version } => {
                Self::apply_event(state, &event);
                state.version = Some(Version::new(version));

                if let InventoryAction::OnHandSet {
                    sku,
                    quantity,
                    bindings,
                    timestamp,
                } = event.as_ref()
                {
                    let mut effects: SmallVec<[Effect<InventoryAction>; 4]> = smallvec![Self::publish_stock_changed(
                        Arc::clone(&env.event_bus),
                        sku,
                        *quantity,
                        version,
                        *timestamp,
                    )];
                    for channel in bindings {
                        let already_current = matches!(
                            state.channel_last_pushed.get(channel.as_str()),
                            Some(&last) if last >= version
                        );
                        if !already_current {
                            effects.push(Self::submit_push_inventory_job(
                                env.scheduler.clone(),
                                sku.clone(),
                                channel.clone(),
                                *quantity,
                                version,
                            ));
                        }
                    }
                    return effects;
                }

                smallvec![Effect::None]
            },

            InventoryAction::ValidationFailed { error } => {
                tracing::debug!("inventory validation failure processed: {error}");
                smallvec![Effect::None]
            },
        }
    }
}
