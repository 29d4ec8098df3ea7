//! Error classification shared by every adapter.
//!
//! Mirrors the nine-way split in spec §7: the scheduler decides retry,
//! refresh, or dead-letter purely from this enum, never from a channel's own
//! status codes.

use thiserror::Error;

/// How an adapter call failed, classified so `runtime::scheduler` can decide
/// what to do next without knowing anything about the channel.
#[derive(Error, Debug, Clone)]
pub enum AdapterError {
    /// Likely to succeed on retry with backoff (network blip, 5xx).
    #[error("transient error calling {operation}: {message}")]
    Transient {
        /// The adapter operation that failed.
        operation: String,
        /// Channel-reported detail.
        message: String,
    },
    /// The channel's own rate limit was hit; back off and retry.
    #[error("rate limited calling {operation}, retry after {retry_after_secs:?}s")]
    RateLimited {
        /// The adapter operation that failed.
        operation: String,
        /// Channel-declared retry delay, if given.
        retry_after_secs: Option<u64>,
    },
    /// Credentials are expired or invalid; a token refresh should precede
    /// retry.
    #[error("auth failure calling {operation}: {message}")]
    Auth {
        /// The adapter operation that failed.
        operation: String,
        /// Channel-reported detail.
        message: String,
    },
    /// An optimistic-concurrency conflict on a versioned write.
    #[error("conflict calling {operation}: expected version did not match")]
    Conflict {
        /// The adapter operation that failed.
        operation: String,
    },
    /// The caller's input was rejected (e.g. malformed SKU).
    #[error("invalid input calling {operation}: {message}")]
    InvalidInput {
        /// The adapter operation that failed.
        operation: String,
        /// Channel-reported detail.
        message: String,
    },
    /// The requested entity does not exist on the channel.
    #[error("not found calling {operation}")]
    NotFound {
        /// The adapter operation that failed.
        operation: String,
    },
    /// This adapter's [`crate::adapter::Capabilities`] declines the
    /// operation; the caller should have checked first.
    #[error("{operation} is not supported by this channel")]
    NotSupported {
        /// The adapter operation that was declined.
        operation: String,
    },
    /// The channel rejected the request on business-rule grounds (e.g.
    /// inventory policy violation).
    #[error("channel rejected {operation}: {message}")]
    ChannelReject {
        /// The adapter operation that failed.
        operation: String,
        /// Channel-reported detail.
        message: String,
    },
    /// Non-retryable; goes straight to the dead-letter log.
    #[error("fatal error calling {operation}: {message}")]
    Fatal {
        /// The adapter operation that failed.
        operation: String,
        /// Channel-reported detail.
        message: String,
    },
}

impl AdapterError {
    /// Whether the scheduler should count this failure against the attempt
    /// budget (spec §4.2/§7: auth failures don't; everything retryable
    /// does).
    #[must_use]
    pub const fn counts_against_attempt_budget(&self) -> bool {
        !matches!(self, Self::Auth { .. })
    }

    /// Whether this failure should drop straight to the dead-letter log
    /// regardless of remaining attempt budget.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Fatal { .. } | Self::InvalidInput { .. } | Self::NotSupported { .. })
    }
}
