//! Per-channel token-bucket rate limiting.
//!
//! Every outbound adapter call acquires a permit before making a network
//! call. Permits refill continuously at a configured rate; when the bucket
//! is empty, callers suspend until enough tokens accumulate (or a deadline
//! elapses). The bucket itself is lock-free (a single atomic word holding a
//! fixed-point token count and last-refill timestamp); the `RateLimiter`
//! trait is the substitution point for a cost-weighted limiter where
//! different endpoints consume a different number of tokens per call.
//!
//! # Example
//!
//! ```rust
//! use syncengine_runtime::rate_limiter::{RateLimiter, TokenBucketRateLimiter};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let limiter = TokenBucketRateLimiter::new(5, 1.0); // capacity 5, refill 1/s
//! limiter.acquire(1).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors returned by a [`RateLimiter`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimiterError {
    /// The deadline passed to `acquire_before` elapsed before a permit became
    /// available.
    #[error("rate limiter deadline elapsed waiting for a permit")]
    DeadlineElapsed,

    /// A single call requested more tokens than the bucket's capacity; it
    /// could never succeed no matter how long it waits.
    #[error("requested cost {requested} exceeds bucket capacity {capacity}")]
    CostExceedsCapacity {
        /// Tokens requested for this call.
        requested: u64,
        /// Total bucket capacity.
        capacity: u64,
    },
}

/// A channel's next-available time, consulted by the scheduler when deciding
/// whether a job is ready to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextAvailable {
    /// Time at which at least one permit will be available, if not already.
    pub at: Instant,
}

/// Rate limiter interface. Every outbound adapter call acquires a permit
/// through this trait before performing I/O; a channel with declarative
/// cost-per-call can substitute an implementation that charges more than one
/// token per call.
pub trait RateLimiter: Send + Sync {
    /// Acquire `cost` permits, suspending until they're available.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimiterError::CostExceedsCapacity`] if `cost` can never
    /// be satisfied by this bucket.
    fn acquire(&self, cost: u64) -> Pin<Box<dyn Future<Output = Result<(), RateLimiterError>> + Send + '_>>;

    /// Acquire `cost` permits, failing instead of suspending if the deadline
    /// elapses first.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimiterError::DeadlineElapsed`] if the deadline passes
    /// before permits are available, or
    /// [`RateLimiterError::CostExceedsCapacity`] if `cost` can never be
    /// satisfied.
    fn acquire_before(
        &self,
        cost: u64,
        deadline: Instant,
    ) -> Pin<Box<dyn Future<Output = Result<(), RateLimiterError>> + Send + '_>>;

    /// Time at which the next permit will be available, without consuming
    /// one. Used by the scheduler to re-queue a job instead of busy-waiting.
    fn next_available(&self) -> NextAvailable;
}

/// Fixed-point scale for the atomic token count, so fractional refill rates
/// (e.g. 0.5 tokens/sec) don't need a floating-point atomic.
const SCALE: u64 = 1_000;

/// Token-bucket rate limiter with atomic, lock-free bucket state.
///
/// Parameterised by `capacity` (maximum burst size) and `refill_rate`
/// (tokens added per second). Tokens accumulate continuously; `acquire`
/// computes the elapsed time since the last observation on every call
/// rather than running a background refill task.
#[derive(Debug)]
pub struct TokenBucketRateLimiter {
    capacity: u64,
    refill_per_sec: f64,
    /// Fixed-point token count (`SCALE` units per token), as of `updated_at`.
    tokens: AtomicU64,
    /// Nanoseconds since `epoch` at which `tokens` was last refreshed.
    updated_at_nanos: AtomicU64,
    epoch: Instant,
}

impl TokenBucketRateLimiter {
    /// Create a bucket starting full, with the given capacity and refill
    /// rate (tokens per second).
    #[must_use]
    pub fn new(capacity: u64, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
            tokens: AtomicU64::new(capacity * SCALE),
            updated_at_nanos: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    fn now_nanos(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    /// Refill the bucket for elapsed time and return the token count
    /// (fixed-point) immediately after refilling.
    fn refill(&self) -> u64 {
        let now = self.now_nanos();
        loop {
            let last = self.updated_at_nanos.load(Ordering::Acquire);
            let elapsed_nanos = now.saturating_sub(last);
            #[allow(clippy::cast_precision_loss)]
            let added = (elapsed_nanos as f64 / 1_000_000_000.0 * self.refill_per_sec * SCALE as f64)
                as u64;

            let current = self.tokens.load(Ordering::Acquire);
            let capped = current.saturating_add(added).min(self.capacity * SCALE);

            if self
                .updated_at_nanos
                .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.tokens.store(capped, Ordering::Release);
                return capped;
            }
            // Lost the race with another refill; retry with fresh values.
        }
    }

    /// Try to take `cost` tokens now. Returns `true` and deducts them on
    /// success, `false` (no state change) if insufficient.
    fn try_take(&self, cost: u64) -> bool {
        let cost_fp = cost * SCALE;
        loop {
            let available = self.refill();
            if available < cost_fp {
                return false;
            }
            if self
                .tokens
                .compare_exchange(available, available - cost_fp, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Estimated wait until `cost` tokens are available, given the refill
    /// rate. Zero if already available.
    fn wait_for(&self, cost: u64) -> Duration {
        let available = self.refill();
        let cost_fp = cost * SCALE;
        if available >= cost_fp {
            return Duration::ZERO;
        }
        let deficit = cost_fp - available;
        #[allow(clippy::cast_precision_loss)]
        let seconds = deficit as f64 / (self.refill_per_sec * SCALE as f64);
        Duration::from_secs_f64(seconds.max(0.0))
    }
}

impl RateLimiter for TokenBucketRateLimiter {
    fn acquire(&self, cost: u64) -> Pin<Box<dyn Future<Output = Result<(), RateLimiterError>> + Send + '_>> {
        Box::pin(async move {
            if cost > self.capacity {
                return Err(RateLimiterError::CostExceedsCapacity {
                    requested: cost,
                    capacity: self.capacity,
                });
            }

            loop {
                if self.try_take(cost) {
                    return Ok(());
                }
                let wait = self.wait_for(cost);
                tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
            }
        })
    }

    fn acquire_before(
        &self,
        cost: u64,
        deadline: Instant,
    ) -> Pin<Box<dyn Future<Output = Result<(), RateLimiterError>> + Send + '_>> {
        Box::pin(async move {
            if cost > self.capacity {
                return Err(RateLimiterError::CostExceedsCapacity {
                    requested: cost,
                    capacity: self.capacity,
                });
            }

            loop {
                if self.try_take(cost) {
                    return Ok(());
                }
                if Instant::now() >= deadline {
                    return Err(RateLimiterError::DeadlineElapsed);
                }
                let wait = self.wait_for(cost).max(Duration::from_millis(1));
                let remaining = deadline.saturating_duration_since(Instant::now());
                tokio::time::sleep(wait.min(remaining)).await;
            }
        })
    }

    fn next_available(&self) -> NextAvailable {
        let wait = self.wait_for(1);
        NextAvailable {
            at: Instant::now() + wait,
        }
    }
}
