//! Engine configuration: one [`EngineConfig`] loaded at startup, layering
//! environment variables over an optional TOML file over hard-coded
//! defaults, following the `config` crate idiom cited in the Ambient Stack
//! (env overrides file overrides defaults).

use serde::Deserialize;
use std::collections::HashMap;
use syncengine_domain::order::{FulfilmentCandidate, FulfilmentRoutingPolicy};

/// Top-level configuration: database connection plus one entry per
/// configured channel account.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Postgres connection string for the event store, dead-letter table,
    /// and repository bookkeeping.
    pub database_url: String,
    /// Kafka/Redpanda bootstrap servers backing the domain event bus.
    pub kafka_brokers: String,
    /// Number of scheduler worker tasks draining the job queue.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Every configured channel account, keyed by an opaque account id.
    pub channel_accounts: HashMap<String, ChannelAccountConfig>,
}

const fn default_worker_count() -> usize {
    4
}

/// Per-channel-account configuration, per spec §6's enumerated options.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelAccountConfig {
    /// Which adapter to construct (`"shopify"`, `"woocommerce"`,
    /// `"amazon"`, `"ebay"`).
    pub channel_type: String,
    /// Credentials subset; which fields are meaningful depends on
    /// `channel_type` (clientId/clientSecret/refreshToken/accessToken for
    /// OAuth channels, sellerId/marketplaceId for Amazon, storeDomain for
    /// Shopify/WooCommerce).
    pub credentials: CredentialsConfig,
    /// Endpoint region selector, or a custom base URL override.
    pub endpoint: EndpointConfig,
    /// Rate-limit bucket sizing for this account.
    pub rate_limit: RateLimitConfig,
    /// Which sync domains are enabled for this account.
    pub feature_toggles: FeatureToggles,
    /// How fulfilment requests are routed to a physical location.
    #[serde(default)]
    pub fulfilment_routing: FulfilmentRoutingPolicy,
    /// Candidate fulfilment locations this account may route orders to.
    #[serde(default)]
    pub fulfilment_candidates: Vec<FulfilmentCandidate>,
    /// SKUs this account's `PullInventory` timer polls individually; the
    /// channel has no bulk inventory endpoint in scope (spec §4.2).
    #[serde(default)]
    pub tracked_skus: Vec<String>,
    /// Seconds between `PullProducts` timer submissions.
    #[serde(default = "default_pull_interval_secs")]
    pub pull_products_interval_secs: u64,
    /// Seconds between `PullOrders` timer submissions.
    #[serde(default = "default_pull_interval_secs")]
    pub pull_orders_interval_secs: u64,
    /// Seconds between `PullInventory` timer submissions, per tracked SKU.
    #[serde(default = "default_pull_interval_secs")]
    pub pull_inventory_interval_secs: u64,
}

const fn default_pull_interval_secs() -> u64 {
    300
}

/// Credentials subset (spec §6). Fields are adapter-specific; unused
/// fields for a given `channel_type` are left `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    /// OAuth client id (Shopify/WooCommerce).
    pub client_id: Option<String>,
    /// OAuth client secret.
    pub client_secret: Option<String>,
    /// OAuth refresh token.
    pub refresh_token: Option<String>,
    /// Cached access token, if persisted across restarts.
    pub access_token: Option<String>,
    /// Amazon seller id.
    pub seller_id: Option<String>,
    /// Amazon marketplace id.
    pub marketplace_id: Option<String>,
    /// Shopify/WooCommerce store domain.
    pub store_domain: Option<String>,
}

/// Endpoint region selector (spec §6): a named region or an explicit
/// override URL.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointConfig {
    /// North America.
    Na,
    /// Europe.
    Eu,
    /// Far East.
    Fe,
    /// Explicit base URL, bypassing region resolution.
    Custom(String),
}

impl EndpointConfig {
    /// Resolve to the concrete base URL an adapter's `HttpClient` calls
    /// against.
    #[must_use]
    pub fn base_url(&self, channel_type: &str) -> String {
        match self {
            Self::Custom(url) => url.clone(),
            Self::Na => format!("https://{channel_type}.na.example.com"),
            Self::Eu => format!("https://{channel_type}.eu.example.com"),
            Self::Fe => format!("https://{channel_type}.fe.example.com"),
        }
    }
}

/// Token-bucket sizing for one channel account (spec §6).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity.
    pub capacity: u64,
    /// Tokens added per second.
    pub refill_per_second: f64,
}

/// Per-domain sync toggles (spec §6).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeatureToggles {
    /// Sync the product catalogue.
    #[serde(default)]
    pub sync_products: bool,
    /// Sync orders.
    #[serde(default)]
    pub sync_orders: bool,
    /// Sync inventory levels.
    #[serde(default)]
    pub sync_inventory: bool,
    /// Sync prices.
    #[serde(default)]
    pub sync_pricing: bool,
    /// Accept webhook pushes as a polling accelerator.
    #[serde(default)]
    pub use_webhook_accelerator: bool,
}

impl EngineConfig {
    /// Load configuration layering environment variables (prefixed
    /// `SYNCENGINE_`) over an optional `config.toml` in the working
    /// directory over built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the layered sources don't deserialise into
    /// [`EngineConfig`].
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("SYNCENGINE").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_custom_bypasses_region_resolution() {
        let endpoint = EndpointConfig::Custom("https://override.test".to_string());
        assert_eq!(endpoint.base_url("shopify"), "https://override.test");
    }

    #[test]
    fn endpoint_region_resolves_by_channel_type() {
        let endpoint = EndpointConfig::Eu;
        assert_eq!(endpoint.base_url("woocommerce"), "https://woocommerce.eu.example.com");
    }

    #[test]
    fn fulfilment_routing_defaults_to_nearest() {
        assert_eq!(FulfilmentRoutingPolicy::default(), FulfilmentRoutingPolicy::Nearest);
    }
}
