//! Per-channel-account access token cache with single-flight refresh.
//!
//! OAuth-style connector credentials expire and must be refreshed; under
//! concurrent load (many workers pulling jobs for the same `ChannelAccount`)
//! a naive "check expiry, refresh if needed" pattern causes a refresh storm —
//! every worker that observes an expired token kicks off its own refresh
//! call. `TokenCache` serialises refreshes per account so that concurrent
//! callers observing the same expired (or missing) token collapse onto a
//! single in-flight refresh; everyone else waits for that one call and reuses
//! its result.
//!
//! Grounded in the same per-account-mutex idiom the adapters use for
//! connection state: one [`tokio::sync::Mutex`] per account, held for the
//! duration of the refresh, with the cached value re-checked after acquiring
//! the lock (double-checked locking) so the common case — token still valid —
//! never blocks on another account's refresh.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A cached access token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Bearer token (or equivalent) to attach to outbound requests.
    pub token: String,
    /// When the token expires, per the issuing channel's response.
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token is still valid at `now`, with `skew` subtracted
    /// from the expiry to leave headroom for in-flight requests.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        now + skew < self.expires_at
    }
}

/// Per-account slot: the last known token (if any), guarded by a mutex that
/// also serialises refreshes.
struct Slot {
    token: Mutex<Option<AccessToken>>,
}

/// Single-flight token cache keyed by an opaque account identifier.
///
/// `K` is typically a `ChannelAccountId` newtype; it only needs to be
/// hashable and cloneable so the cache can key its per-account slots.
pub struct TokenCache<K> {
    slots: Mutex<HashMap<K, Arc<Slot>>>,
    skew: chrono::Duration,
}

impl<K> TokenCache<K>
where
    K: std::hash::Hash + Eq + Clone,
{
    /// Create a cache that treats tokens as expired `skew` before their
    /// actual expiry, so a request started just before expiry doesn't race
    /// the channel's clock.
    #[must_use]
    pub fn new(skew: chrono::Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            skew,
        }
    }

    async fn slot_for(&self, key: &K) -> Arc<Slot> {
        let mut slots = self.slots.lock().await;
        slots
            .entry(key.clone())
            .or_insert_with(|| {
                Arc::new(Slot {
                    token: Mutex::new(None),
                })
            })
            .clone()
    }

    /// Get a valid token for `key`, refreshing via `refresh` if the cached
    /// token is missing or within `skew` of expiry.
    ///
    /// Concurrent callers for the same `key` serialise on the account's
    /// slot: the first to observe an invalid token runs `refresh` while the
    /// rest wait on the same lock and then observe the freshly cached
    /// value, so exactly one refresh call happens per expiry even under
    /// heavy concurrent load.
    ///
    /// # Errors
    ///
    /// Propagates whatever error `refresh` returns; nothing is cached on
    /// failure, so the next caller retries the refresh.
    pub async fn get_or_refresh<F, Fut, E>(&self, key: &K, refresh: F) -> Result<AccessToken, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, E>>,
    {
        let slot = self.slot_for(key).await;
        let mut guard = slot.token.lock().await;

        let now = Utc::now();
        if let Some(existing) = guard.as_ref() {
            if existing.is_valid(now, self.skew) {
                return Ok(existing.clone());
            }
        }

        let fresh = refresh().await?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drop the cached token for `key`, forcing the next `get_or_refresh`
    /// call to refresh unconditionally. Used when an adapter call fails with
    /// an auth error even though the cached token looked unexpired.
    pub async fn invalidate(&self, key: &K) {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(key) {
            *slot.token.lock().await = None;
        }
    }
}
