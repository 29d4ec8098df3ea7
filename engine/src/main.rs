//! Channel Synchronisation Engine entrypoint.
//!
//! Loads [`config::EngineConfig`], builds one connector adapter per
//! configured channel account through `syncengine_connectors::build_adapter`
//! (spec §9: "connectors registered by channel type at startup through a
//! factory"), wires the scheduler's worker pool to an [`AdapterExecutor`]
//! backed by the event-sourced order/inventory reducers and a Postgres-backed
//! dead-letter sink, spawns the periodic pull-job submission loop described
//! in spec §2's data flow ("the Sync Scheduler issues timed or event-driven
//! jobs"), and runs until a shutdown signal arrives.

mod config;
mod job_executor;

use anyhow::Context;
use config::{ChannelAccountConfig, EngineConfig};
use job_executor::{AdapterExecutor, JOB_KIND_PULL_ORDERS};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use syncengine_connectors::{ConnectorAdapter, ReqwestHttpClient};
use syncengine_core::environment::SystemClock;
use syncengine_domain::{InventoryEnvironment, OrderEnvironment};
use syncengine_postgres::{ChannelBindingRepository, HighWatermarkRepository, PostgresDeadLetterSink, PostgresEventStore};
use syncengine_redpanda::RedpandaEventBus;
use syncengine_runtime::scheduler::{JobKind, JobKindConfig, Scheduler, SchedulerHandle, SyncJob};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Installs the global recorder so `metrics::counter!`/`histogram!` calls
    // throughout the workspace record somewhere; scraping it over HTTP is
    // the admin API's concern, out of scope here.
    let _metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus metrics recorder")?;

    let config = EngineConfig::load().context("failed to load engine configuration")?;
    info!(accounts = config.channel_accounts.len(), "engine configuration loaded");

    let pool = sqlx::PgPool::connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let event_store: Arc<dyn syncengine_core::event_store::EventStore> =
        Arc::new(PostgresEventStore::from_pool(pool.clone()));
    let event_bus: Arc<dyn syncengine_core::event_bus::EventBus> =
        Arc::new(RedpandaEventBus::new(&config.kafka_brokers).context("failed to connect to Redpanda")?);
    let clock = Arc::new(SystemClock);
    let high_watermarks = Arc::new(HighWatermarkRepository::new(pool.clone()));
    let channel_bindings = Arc::new(ChannelBindingRepository::new(pool.clone()));
    let dead_letters = Arc::new(PostgresDeadLetterSink::new(pool));

    let http: Arc<dyn syncengine_connectors::HttpClient> = Arc::new(ReqwestHttpClient::new(reqwest::Client::new()));
    let adapters = build_adapters(&config, http);
    info!(resolved = adapters.len(), "connector adapters resolved");

    let order_env = OrderEnvironment::new(Arc::clone(&event_store), Arc::clone(&clock));

    // `InventoryEnvironment` needs a scheduler handle before the executor it
    // will live inside can be built, and the executor has to exist before
    // `Scheduler::new` can. Build the handle's queue first and wire the
    // scheduler to drain that same queue via `Scheduler::from_handle`
    // instead of letting `Scheduler::new` allocate an unreachable one.
    let handle = SchedulerHandle::detached();
    let inventory_env = InventoryEnvironment::new(Arc::clone(&event_store), clock, Arc::clone(&event_bus), handle.clone());

    let executor = Arc::new(AdapterExecutor::new(
        &config,
        adapters,
        order_env,
        inventory_env,
        Arc::clone(&high_watermarks),
        channel_bindings,
    ));

    let scheduler = Scheduler::from_handle(
        handle.clone(),
        executor,
        dead_letters,
        config.worker_count,
        Duration::from_millis(500),
        JobKindConfig::default_for,
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn({
        let shutdown_tx = shutdown_tx.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    for (account_name, account) in &config.channel_accounts {
        spawn_pull_timers(account_name.clone(), account.clone(), handle.clone(), Arc::clone(&high_watermarks), shutdown_rx.clone());
    }

    scheduler.run(shutdown_rx).await;

    Ok(())
}

/// Spawn one periodic-submission task per enabled feature toggle for this
/// account (spec §2's data flow: "the Sync Scheduler issues timed ... jobs").
/// `PullOrders`'s `since` cursor seeds from the persisted high-watermark so a
/// restart resumes rather than re-pulling the channel's full order history.
fn spawn_pull_timers(
    account_name: String,
    account: ChannelAccountConfig,
    handle: SchedulerHandle,
    high_watermarks: Arc<HighWatermarkRepository>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    if account.feature_toggles.sync_products {
        let handle = handle.clone();
        let channel = account_name.clone();
        let interval = Duration::from_secs(account.pull_products_interval_secs);
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        submit(&handle, &channel, JobKind::PullProducts, serde_json::json!({ "cursor": None::<String> })).await;
                    }
                    _ = shutdown_rx.changed() => if *shutdown_rx.borrow() { break },
                }
            }
        });
    }

    if account.feature_toggles.sync_orders {
        let handle = handle.clone();
        let channel = account_name.clone();
        let interval = Duration::from_secs(account.pull_orders_interval_secs);
        let high_watermarks = Arc::clone(&high_watermarks);
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let since = match high_watermarks.get(&channel, JOB_KIND_PULL_ORDERS).await {
                            Ok(watermark) => watermark.unwrap_or_else(unix_epoch),
                            Err(error) => {
                                warn!(channel = %channel, %error, "failed to read order high-watermark, pulling full history");
                                unix_epoch()
                            },
                        };
                        submit(&handle, &channel, JobKind::PullOrders, serde_json::json!({ "since": since, "cursor": None::<String> })).await;
                    }
                    _ = shutdown_rx.changed() => if *shutdown_rx.borrow() { break },
                }
            }
        });
    }

    if account.feature_toggles.sync_inventory {
        for sku in account.tracked_skus.clone() {
            let handle = handle.clone();
            let channel = account_name.clone();
            let interval = Duration::from_secs(account.pull_inventory_interval_secs);
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            submit(&handle, &channel, JobKind::PullInventory, serde_json::json!({ "sku": sku })).await;
                        }
                        _ = shutdown_rx.changed() => if *shutdown_rx.borrow() { break },
                    }
                }
            });
        }
    }
}

/// The earliest instant a never-before-pulled channel's `since` cursor can
/// take, so the first `PullOrders` job asks for its full order history.
fn unix_epoch() -> chrono::DateTime<chrono::Utc> {
    use chrono::TimeZone;
    chrono::Utc.timestamp_opt(0, 0).single().expect("zero is always a valid unix timestamp")
}

async fn submit(handle: &SchedulerHandle, channel: &str, kind: JobKind, payload: serde_json::Value) {
    let id = format!("{channel}-{kind:?}-{}", uuid::Uuid::new_v4());
    handle.submit(SyncJob::new(id, kind, channel.to_string(), payload)).await;
}

fn build_adapters(
    config: &EngineConfig,
    http: Arc<dyn syncengine_connectors::HttpClient>,
) -> HashMap<String, Arc<dyn ConnectorAdapter>> {
    let mut adapters = HashMap::new();
    for (account_name, account) in &config.channel_accounts {
        let base_url = account.endpoint.base_url(&account.channel_type);
        let credential = account
            .credentials
            .access_token
            .clone()
            .or_else(|| account.credentials.refresh_token.clone())
            .or_else(|| account.credentials.client_secret.clone())
            .unwrap_or_default();

        match syncengine_connectors::build_adapter(&account.channel_type, http.clone(), base_url, credential) {
            Some(adapter) => {
                adapters.insert(account_name.clone(), Arc::from(adapter));
            },
            None => {
                tracing::warn!(channel_type = %account.channel_type, account = %account_name, "unrecognised channel type, skipping account");
            },
        }
    }
    adapters
}
