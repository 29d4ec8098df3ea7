//! Dispatches a [`SyncJob`] to whichever [`ConnectorAdapter`] its `channel`
//! resolves to, translating the result into the [`Outcome`] the scheduler's
//! retry/dead-letter policy understands.
//!
//! `JobKind::Push*`/`Pull*` payloads are opaque `serde_json::Value`s at the
//! scheduler layer (§4.2); this is the one place that gives each kind a
//! concrete shape. Pull jobs additionally drive the fetched page through
//! `OrderReducer`/`InventoryReducer` (§4.4 stages 2-6), every adapter call
//! acquires a rate-limiter permit and goes through the token cache first
//! (§4.5, §5), and `RouteToFulfilment` picks a location by each account's
//! configured policy (§4.4 stage 5) before the reducer issues it.

use crate::config::EngineConfig;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use syncengine_connectors::normalize::normalise_order_status;
use syncengine_connectors::{AdapterError, ConnectorAdapter, ExternalOrder, Shipment};
use syncengine_core::effect::{Effect, EventBusOperation, EventStoreOperation};
use syncengine_core::event::SerializedEvent;
use syncengine_core::event_bus::EventBus;
use syncengine_core::event_store::EventStore;
use syncengine_core::reducer::Reducer;
use syncengine_core::stream::StreamId;
use syncengine_domain::event::{topics, DomainEvent};
use syncengine_domain::order::{FulfilmentCandidate, FulfilmentRoutingPolicy};
use syncengine_domain::{
    ChannelId, CurrencyCode, InventoryAction, InventoryEnvironment, InventoryReducer, LineItem, Money, OrderAction,
    OrderEnvironment, OrderId, OrderReducer, OrderStatus, Sku,
};
use syncengine_postgres::{ChannelBindingRepository, HighWatermarkRepository, RepositoryError};
use syncengine_runtime::rate_limiter::{RateLimiter, TokenBucketRateLimiter};
use syncengine_runtime::scheduler::{JobKind, Outcome, SyncJob};
use syncengine_runtime::token_cache::{AccessToken, TokenCache};
use tokio::time::Instant;
use tracing::warn;

/// The channel-specific vocabulary used to map an [`ExternalOrder`]'s raw
/// `channel_status` to the canonical [`OrderStatus`] (spec §4.4 stage 3);
/// unrecognised values fall back to `Pending`, never a terminal status.
const ORDER_STATUS_VOCAB: &[(&str, OrderStatus)] = &[
    ("pending", OrderStatus::Pending),
    ("processing", OrderStatus::Processing),
    ("on_hold", OrderStatus::OnHold),
    ("fulfilled", OrderStatus::Shipped),
    ("shipped", OrderStatus::Shipped),
    ("delivered", OrderStatus::Delivered),
    ("cancelled", OrderStatus::Cancelled),
    ("refunded", OrderStatus::Refunded),
];

/// `HighWatermarkRepository`/`ChannelBindingRepository` job-kind key for
/// order pulls. Free-form by repository contract; fixed here so the seed
/// read in `main` and the advance write here agree.
pub const JOB_KIND_PULL_ORDERS: &str = "pullOrders";

/// Per-channel-account state the executor needs beyond the adapter itself:
/// a token-bucket limiter sized from that account's `RateLimitConfig`, a
/// single-flight token cache gating `connect()`, and the fulfilment
/// routing policy/candidates/round-robin cursor `RouteToFulfilment` reads.
struct AccountContext {
    adapter: Arc<dyn ConnectorAdapter>,
    rate_limiter: Arc<dyn RateLimiter>,
    token_cache: TokenCache<String>,
    fulfilment_routing: FulfilmentRoutingPolicy,
    fulfilment_candidates: Vec<FulfilmentCandidate>,
    round_robin_cursor: AtomicUsize,
}

/// Routes each configured channel account's name to its constructed
/// adapter, and executes jobs against it, feeding pulled pages through the
/// `OrderReducer`/`InventoryReducer` aggregates shared across accounts.
pub struct AdapterExecutor {
    accounts: HashMap<String, AccountContext>,
    order_reducer: OrderReducer,
    order_env: OrderEnvironment,
    inventory_reducer: InventoryReducer,
    inventory_env: InventoryEnvironment,
    high_watermarks: Arc<HighWatermarkRepository>,
    channel_bindings: Arc<ChannelBindingRepository>,
}

impl AdapterExecutor {
    /// Build an executor from a channel account name → adapter map (one
    /// entry per `config::EngineConfig::channel_accounts` key that the
    /// connector factory resolved successfully), the reducer environments
    /// driving the order/inventory pipelines, and the repositories backing
    /// high-watermark/push-version bookkeeping.
    #[must_use]
    pub fn new(
        config: &EngineConfig,
        adapters: HashMap<String, Arc<dyn ConnectorAdapter>>,
        order_env: OrderEnvironment,
        inventory_env: InventoryEnvironment,
        high_watermarks: Arc<HighWatermarkRepository>,
        channel_bindings: Arc<ChannelBindingRepository>,
    ) -> Self {
        let accounts = adapters
            .into_iter()
            .filter_map(|(name, adapter)| {
                let account = config.channel_accounts.get(&name)?;
                Some((
                    name,
                    AccountContext {
                        adapter,
                        rate_limiter: Arc::new(TokenBucketRateLimiter::new(
                            account.rate_limit.capacity,
                            account.rate_limit.refill_per_second,
                        )),
                        token_cache: TokenCache::new(chrono::Duration::seconds(30)),
                        fulfilment_routing: account.fulfilment_routing,
                        fulfilment_candidates: account.fulfilment_candidates.clone(),
                        round_robin_cursor: AtomicUsize::new(0),
                    },
                ))
            })
            .collect();

        Self {
            accounts,
            order_reducer: OrderReducer::new(),
            order_env,
            inventory_reducer: InventoryReducer::new(),
            inventory_env,
            high_watermarks,
            channel_bindings,
        }
    }

    /// Establish this account's adapter session through the token cache,
    /// single-flighting `connect()` across concurrent jobs for the same
    /// channel and skipping it entirely while a previously cached session
    /// is still within its skew window.
    async fn ensure_authenticated(&self, ctx: &AccountContext, channel: &str) -> Result<(), AdapterError> {
        let adapter = Arc::clone(&ctx.adapter);
        ctx.token_cache
            .get_or_refresh(&channel.to_string(), || async move {
                adapter.connect().await.map(|()| AccessToken {
                    token: channel.to_string(),
                    expires_at: Utc::now() + chrono::Duration::minutes(15),
                })
            })
            .await
            .map(|_| ())
    }

    async fn run_pull_products(&self, ctx: &AccountContext, job: &SyncJob) -> Result<(), JobError> {
        let payload: PullProductsPayload = parse(job)?;
        let page = ctx.adapter.list_products(payload.cursor, payload.page_size).await?;
        // No event-sourced Product aggregate exists (see DESIGN.md): the
        // catalogue is reference data consumed by SKU resolution, not a
        // reconciled aggregate, so the pulled page is only logged here.
        tracing::debug!(channel = %job.channel, count = page.items.len(), "pulled product catalogue page");
        Ok(())
    }

    async fn run_pull_inventory(&self, ctx: &AccountContext, job: &SyncJob) -> Result<(), JobError> {
        let payload: PullInventoryPayload = parse(job)?;
        let external = ctx.adapter.get_inventory(&payload.sku).await?;

        let sku = Sku::new(payload.sku.clone());
        let state = rehydrate::<InventoryReducer>(
            &self.inventory_reducer,
            &self.inventory_env,
            Arc::clone(&self.inventory_env.event_store),
            InventoryReducer::stream_id(&sku),
        )
        .await?;

        if state.available() != external.quantity {
            self.publish_binding_drift(&job.channel, &sku, state.available(), external.quantity, state.version)
                .await?;
        }

        Ok(())
    }

    async fn run_pull_orders(&self, ctx: &AccountContext, job: &SyncJob) -> Result<(), JobError> {
        let payload: PullOrdersPayload = parse(job)?;
        let page = ctx
            .adapter
            .list_orders(payload.since, payload.cursor, payload.page_size)
            .await?;

        let mut high_watermark = payload.since;
        for external in &page.items {
            if external.updated_at > high_watermark {
                high_watermark = external.updated_at;
            }
            self.ingest_pulled_order(ctx, &job.channel, external).await?;
        }

        self.high_watermarks
            .advance(&job.channel, JOB_KIND_PULL_ORDERS, high_watermark)
            .await?;

        Ok(())
    }

    /// Run one pulled order through the ingestion pipeline's dedup,
    /// reserve, route, and status-normalisation stages (spec §4.4 stages
    /// 2-6). Line items are mapped to the internal SKU by assuming the
    /// channel's own SKU string doubles as the internal one — there is no
    /// catalogue-backed SKU resolution in scope; see `DESIGN.md`.
    async fn ingest_pulled_order(
        &self,
        ctx: &AccountContext,
        channel: &str,
        external: &ExternalOrder,
    ) -> Result<(), JobError> {
        let channel_id = ChannelId::new(channel);
        let currency = parse_currency(&external.currency)?;

        let line_items: Vec<LineItem> = external
            .line_items
            .iter()
            .map(|item| LineItem {
                sku: Some(item.channel_sku.clone()),
                channel_sku: item.channel_sku.clone(),
                quantity: item.quantity,
                unit_price: Money::new(item.unit_price, currency),
            })
            .collect();

        let mut order_state = rehydrate::<OrderReducer>(
            &self.order_reducer,
            &self.order_env,
            Arc::clone(&self.order_env.event_store),
            OrderReducer::stream_id(&channel_id, &external.external_id),
        )
        .await?;

        let order_id = order_state
            .order_id
            .clone()
            .unwrap_or_else(|| OrderId::new(format!("{channel}-{}", external.external_id)));

        drive(
            &self.order_reducer,
            &mut order_state,
            &self.order_env,
            OrderAction::IngestOrder {
                order_id,
                channel: channel_id,
                external_order_id: external.external_id.clone(),
                line_items,
                total: Money::new(external.total, currency),
            },
        )
        .await;

        if let Some(error) = order_state.last_error.clone() {
            return Err(JobError::Pipeline(format!("order ingestion rejected: {error}")));
        }

        if order_state.status == OrderStatus::Pending {
            let mut all_reserved = true;
            for item in order_state.line_items.clone() {
                let Some(sku_str) = item.sku else { continue };
                let sku = Sku::new(sku_str);

                let mut inventory_state = rehydrate::<InventoryReducer>(
                    &self.inventory_reducer,
                    &self.inventory_env,
                    Arc::clone(&self.inventory_env.event_store),
                    InventoryReducer::stream_id(&sku),
                )
                .await?;

                drive(
                    &self.inventory_reducer,
                    &mut inventory_state,
                    &self.inventory_env,
                    InventoryAction::ReserveStock {
                        sku,
                        order_id: external.external_id.clone(),
                        qty: item.quantity,
                    },
                )
                .await;

                if inventory_state.last_error.is_some() {
                    all_reserved = false;
                }
            }

            drive(
                &self.order_reducer,
                &mut order_state,
                &self.order_env,
                OrderAction::RecordReservationOutcome { success: all_reserved },
            )
            .await;

            if all_reserved {
                let round_robin_index = ctx.round_robin_cursor.fetch_add(1, Ordering::Relaxed);
                drive(
                    &self.order_reducer,
                    &mut order_state,
                    &self.order_env,
                    OrderAction::RouteToFulfilment {
                        candidates: ctx.fulfilment_candidates.clone(),
                        policy: ctx.fulfilment_routing,
                        round_robin_index,
                    },
                )
                .await;
            }
        }

        let desired_status = normalise_order_status(&external.channel_status, ORDER_STATUS_VOCAB);
        if desired_status != order_state.status && order_state.status.can_transition_to(desired_status) {
            drive(
                &self.order_reducer,
                &mut order_state,
                &self.order_env,
                OrderAction::ChangeStatus {
                    to: desired_status,
                    reason: None,
                },
            )
            .await;
        }

        Ok(())
    }

    async fn run_push_inventory(&self, ctx: &AccountContext, job: &SyncJob) -> Result<(), JobError> {
        let payload: PushInventoryPayload = parse(job)?;
        ctx.adapter
            .set_inventory(&payload.sku, payload.quantity, payload.version)
            .await?;

        let sku = Sku::new(payload.sku.clone());
        let mut state = rehydrate::<InventoryReducer>(
            &self.inventory_reducer,
            &self.inventory_env,
            Arc::clone(&self.inventory_env.event_store),
            InventoryReducer::stream_id(&sku),
        )
        .await?;

        drive(
            &self.inventory_reducer,
            &mut state,
            &self.inventory_env,
            InventoryAction::RecordChannelPush {
                sku: sku.clone(),
                channel: ChannelId::new(job.channel.clone()),
                pushed_version: payload.version,
            },
        )
        .await;

        if let Some(error) = &state.last_error {
            return Err(JobError::Pipeline(format!("failed to record channel push ack: {error}")));
        }

        self.channel_bindings
            .record_pushed_version(&job.channel, &payload.sku, payload.version)
            .await?;

        Ok(())
    }

    /// Publish a `bindingDrifted` `DomainEvent` when a channel's reported
    /// inventory level disagrees with the internal aggregate. The core
    /// never silently adjusts on-hand state from a channel read (the same
    /// principle `InventoryReducer::apply_event` documents for
    /// `OversellDetected`), so reconciliation is surfaced for an operator
    /// rather than applied automatically.
    async fn publish_binding_drift(
        &self,
        channel: &str,
        sku: &Sku,
        internal_available: u32,
        channel_reported: u32,
        version: Option<syncengine_core::stream::Version>,
    ) -> Result<(), JobError> {
        warn!(
            channel,
            sku = sku.as_str(),
            internal_available,
            channel_reported,
            "inventory drift detected between internal state and channel report"
        );

        let domain_event = DomainEvent::new(
            version.map_or(0, syncengine_core::stream::Version::value),
            channel,
            sku.as_str(),
            Utc::now(),
            serde_json::json!({
                "sku": sku.as_str(),
                "internalAvailable": internal_available,
                "channelReported": channel_reported,
            }),
        );
        let data = bincode::serialize(&domain_event)
            .map_err(|e| JobError::Pipeline(format!("failed to serialize bindingDrifted event: {e}")))?;
        let serialized = SerializedEvent::new(topics::BINDING_DRIFTED.to_string(), data, None);

        self.inventory_env
            .event_bus
            .publish(topics::BINDING_DRIFTED, &serialized)
            .await
            .map_err(|e| JobError::Pipeline(format!("failed to publish bindingDrifted: {e}")))?;

        Ok(())
    }
}

impl syncengine_runtime::scheduler::JobExecutor for AdapterExecutor {
    async fn execute(&self, job: &SyncJob, _deadline: Instant) -> Outcome {
        let Some(ctx) = self.accounts.get(&job.channel) else {
            warn!(channel = %job.channel, "no adapter configured for this channel, dead-lettering");
            return Outcome::Fatal;
        };

        if let Err(error) = ctx.rate_limiter.acquire(1).await {
            warn!(channel = %job.channel, %error, "rate limiter permit not acquired in time, dead-lettering");
            return Outcome::Fatal;
        }

        if let Err(error) = self.ensure_authenticated(ctx, &job.channel).await {
            warn!(channel = %job.channel, %error, "authentication failed ahead of job execution");
            return classify(&error);
        }

        let result = match job.kind {
            JobKind::PullProducts => self.run_pull_products(ctx, job).await,
            JobKind::PullInventory => self.run_pull_inventory(ctx, job).await,
            JobKind::PullOrders => self.run_pull_orders(ctx, job).await,
            JobKind::PushInventory => self.run_push_inventory(ctx, job).await,
            JobKind::PushPrice => run_push_price(ctx.adapter.as_ref(), job).await,
            JobKind::PushFulfilment => run_push_fulfilment(ctx.adapter.as_ref(), job).await,
        };

        match result {
            Ok(()) => Outcome::Success,
            Err(JobError::MalformedPayload(reason)) => {
                warn!(job_id = %job.id, reason, "malformed job payload, dead-lettering");
                Outcome::Fatal
            },
            Err(JobError::Pipeline(reason)) => {
                warn!(job_id = %job.id, reason, "pipeline rejected pulled data, dead-lettering");
                Outcome::Fatal
            },
            Err(JobError::Repository(reason)) => {
                warn!(job_id = %job.id, reason, "repository call failed, retrying");
                Outcome::Transient
            },
            Err(JobError::Adapter(err)) => {
                if matches!(err, AdapterError::Auth { .. }) {
                    ctx.token_cache.invalidate(&job.channel).await;
                }
                classify(&err)
            },
        }
    }
}

fn classify(err: &AdapterError) -> Outcome {
    if err.is_terminal() {
        Outcome::Fatal
    } else if matches!(err, AdapterError::Auth { .. }) {
        Outcome::AuthFailure
    } else {
        Outcome::Transient
    }
}

/// Drive `action` through `reducer` to completion, executing every effect
/// it (and any action it feeds back) produces synchronously rather than
/// handing them to `syncengine_runtime::Store`'s spawned-task execution —
/// the engine needs to know a command's effects have fully landed (an
/// event appended, a bus publish acknowledged) before it decides whether a
/// high-watermark may advance, which `Store::send`'s fire-and-forget
/// `EffectHandle` cannot give it.
async fn drive<R>(reducer: &R, state: &mut R::State, env: &R::Environment, action: R::Action)
where
    R: Reducer,
    R::Action: Send + 'static,
{
    let mut pending = VecDeque::from([action]);
    while let Some(action) = pending.pop_front() {
        let effects = reducer.reduce(state, action, env);
        for effect in effects {
            pending.extend(run_effect(effect).await);
        }
    }
}

/// Execute one effect (recursing through `Parallel`/`Sequential` via an
/// explicit stack rather than async recursion), returning every action it
/// fed back.
async fn run_effect<Action: Send + 'static>(effect: Effect<Action>) -> Vec<Action> {
    let mut stack = vec![effect];
    let mut produced = Vec::new();
    while let Some(effect) = stack.pop() {
        match effect {
            Effect::None => {},
            Effect::Parallel(effects) | Effect::Sequential(effects) => stack.extend(effects),
            Effect::Delay { duration, action } => {
                tokio::time::sleep(duration).await;
                produced.push(*action);
            },
            Effect::Future(fut) => {
                if let Some(action) = fut.await {
                    produced.push(action);
                }
            },
            Effect::EventStore(op) => {
                if let Some(action) = run_event_store_op(op).await {
                    produced.push(action);
                }
            },
            Effect::PublishEvent(op) => {
                if let Some(action) = run_event_bus_op(op).await {
                    produced.push(action);
                }
            },
        }
    }
    produced
}

async fn run_event_store_op<Action>(op: EventStoreOperation<Action>) -> Option<Action> {
    match op {
        EventStoreOperation::AppendEvents {
            event_store,
            stream_id,
            expected_version,
            events,
            on_success,
            on_error,
        } => match event_store.append_events(stream_id, expected_version, events).await {
            Ok(version) => on_success(version),
            Err(error) => on_error(error),
        },
        EventStoreOperation::LoadEvents {
            event_store,
            stream_id,
            from_version,
            on_success,
            on_error,
        } => match event_store.load_events(stream_id, from_version).await {
            Ok(events) => on_success(events),
            Err(error) => on_error(error),
        },
        EventStoreOperation::SaveSnapshot {
            event_store,
            stream_id,
            version,
            state,
            on_success,
            on_error,
        } => match event_store.save_snapshot(stream_id, version, state).await {
            Ok(()) => on_success(()),
            Err(error) => on_error(error),
        },
        EventStoreOperation::LoadSnapshot {
            event_store,
            stream_id,
            on_success,
            on_error,
        } => match event_store.load_snapshot(stream_id).await {
            Ok(snapshot) => on_success(snapshot),
            Err(error) => on_error(error),
        },
    }
}

async fn run_event_bus_op<Action>(op: EventBusOperation<Action>) -> Option<Action> {
    match op {
        EventBusOperation::Publish {
            event_bus,
            topic,
            event,
            on_success,
            on_error,
        } => match event_bus.publish(&topic, &event).await {
            Ok(()) => on_success(),
            Err(error) => on_error(error),
        },
    }
}

/// Replay a stream's persisted events through `reducer`'s bare-event match
/// arms to reconstruct current aggregate state ahead of sending a command —
/// the same replay path unit tests use, applied to real stored history.
async fn rehydrate<R>(
    reducer: &R,
    env: &R::Environment,
    event_store: Arc<dyn EventStore>,
    stream_id: StreamId,
) -> Result<R::State, JobError>
where
    R: Reducer,
    R::State: Default,
    R::Action: for<'de> Deserialize<'de>,
{
    let events = event_store
        .load_events(stream_id, None)
        .await
        .map_err(|e| JobError::Repository(e.to_string()))?;

    let mut state = R::State::default();
    for serialized in events {
        let action: R::Action = bincode::deserialize(&serialized.data)
            .map_err(|e| JobError::Pipeline(format!("failed to deserialize stored event: {e}")))?;
        let _ = reducer.reduce(&mut state, action, env);
    }
    Ok(state)
}

fn parse_currency(code: &str) -> Result<CurrencyCode, JobError> {
    serde_json::from_value(serde_json::Value::String(code.to_uppercase()))
        .map_err(|_| JobError::MalformedPayload(format!("unrecognised currency code: {code}")))
}

enum JobError {
    MalformedPayload(String),
    /// A pulled page or command was rejected by the reducer pipeline
    /// itself (failed validation, a bus publish that couldn't be
    /// serialised) rather than by the adapter or a repository.
    Pipeline(String),
    /// A Postgres repository call (high-watermark, channel-binding)
    /// failed; treated as retryable since the underlying data is
    /// unaffected.
    Repository(String),
    Adapter(AdapterError),
}

impl From<AdapterError> for JobError {
    fn from(value: AdapterError) -> Self {
        Self::Adapter(value)
    }
}

impl From<RepositoryError> for JobError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value.to_string())
    }
}

#[derive(Deserialize)]
struct PullProductsPayload {
    cursor: Option<String>,
    #[serde(default = "default_page_size")]
    page_size: u32,
}

#[derive(Deserialize)]
struct PullInventoryPayload {
    sku: String,
}

#[derive(Deserialize)]
struct PullOrdersPayload {
    since: DateTime<Utc>,
    cursor: Option<String>,
    #[serde(default = "default_page_size")]
    page_size: u32,
}

#[derive(Deserialize)]
struct PushInventoryPayload {
    sku: String,
    quantity: u32,
    version: u64,
}

#[derive(Deserialize)]
struct PushPricePayload {
    sku: String,
    price: String,
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum PushFulfilmentPayload {
    Ship {
        external_order_id: String,
        carrier: String,
        #[serde(default)]
        tracking_number: Option<String>,
        shipped_at: DateTime<Utc>,
    },
    Cancel {
        external_order_id: String,
        reason: String,
    },
    Acknowledge {
        external_order_id: String,
    },
}

const fn default_page_size() -> u32 {
    50
}

fn parse<T: for<'de> Deserialize<'de>>(job: &SyncJob) -> Result<T, JobError> {
    serde_json::from_value(job.payload.clone()).map_err(|e| JobError::MalformedPayload(e.to_string()))
}

async fn run_push_price(adapter: &dyn ConnectorAdapter, job: &SyncJob) -> Result<(), JobError> {
    let payload: PushPricePayload = parse(job)?;
    let price = Decimal::from_str(&payload.price)
        .map_err(|e| JobError::MalformedPayload(format!("invalid decimal price: {e}")))?;
    adapter.set_price(&payload.sku, price).await?;
    Ok(())
}

async fn run_push_fulfilment(adapter: &dyn ConnectorAdapter, job: &SyncJob) -> Result<(), JobError> {
    match parse(job)? {
        PushFulfilmentPayload::Ship {
            external_order_id,
            carrier,
            tracking_number,
            shipped_at,
        } => {
            adapter
                .fulfill_order(
                    &external_order_id,
                    Shipment {
                        carrier,
                        tracking_number,
                        shipped_at,
                    },
                )
                .await?;
        },
        PushFulfilmentPayload::Cancel { external_order_id, reason } => {
            if !adapter.capabilities().cancel_order {
                return Err(AdapterError::NotSupported {
                    operation: "cancelOrder".to_string(),
                }
                .into());
            }
            adapter.cancel_order(&external_order_id, &reason).await?;
        },
        PushFulfilmentPayload::Acknowledge { external_order_id } => {
            if !adapter.capabilities().acknowledge_order {
                return Err(AdapterError::NotSupported {
                    operation: "acknowledgeOrder".to_string(),
                }
                .into());
            }
            adapter.acknowledge_order(&external_order_id).await?;
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_auth_does_not_consume_attempt_budget() {
        let err = AdapterError::Auth {
            operation: "getOrder".to_string(),
            message: "expired".to_string(),
        };
        assert_eq!(classify(&err), Outcome::AuthFailure);
    }

    #[test]
    fn classify_fatal_is_terminal() {
        let err = AdapterError::NotSupported {
            operation: "registerWebhook".to_string(),
        };
        assert_eq!(classify(&err), Outcome::Fatal);
    }

    #[test]
    fn classify_transient_retries() {
        let err = AdapterError::Transient {
            operation: "getInventory".to_string(),
            message: "timeout".to_string(),
        };
        assert_eq!(classify(&err), Outcome::Transient);
    }

    #[tokio::test]
    async fn unrecognised_currency_is_a_malformed_payload() {
        assert!(matches!(parse_currency("xyz"), Err(JobError::MalformedPayload(_))));
    }

    #[tokio::test]
    async fn known_currency_parses_case_insensitively() {
        assert_eq!(parse_currency("usd").ok(), Some(CurrencyCode::Usd));
    }
}
