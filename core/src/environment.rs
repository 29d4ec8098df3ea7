//! Dependency injection traits shared by the domain reducers.
//!
//! External dependencies (time, in this crate; event store, event bus, HTTP,
//! rate limiter, token cache in downstream crates) are abstracted behind
//! traits and injected via each reducer's `Environment` associated type, so
//! tests can substitute deterministic fakes.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability.
///
/// Production code uses a `SystemClock` backed by `Utc::now()`; tests use a
/// `FixedClock` (see the `testing` crate) so time-dependent assertions are
/// deterministic.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// System clock backed by the wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
