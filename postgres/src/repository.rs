//! Repository contract used by the Inventory Reconciler and the Order
//! Ingestion Pipeline for the state that doesn't belong in an event-sourced
//! aggregate stream: per-binding push-version bookkeeping and per-(channel,
//! job kind) high-watermarks (spec §6, §4.3, §4.4).
//!
//! `InventoryLevel` and `Order` themselves are event-sourced aggregates
//! (`domain::inventory::InventoryReducer`, `domain::order::OrderReducer`)
//! persisted through `EventStore`, not row tables — see `DESIGN.md` for why
//! this narrows spec §6's repository contract rather than duplicating state
//! in two places.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE channel_bindings (
//!     channel TEXT NOT NULL,
//!     sku TEXT NOT NULL,
//!     last_pushed_version BIGINT NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     PRIMARY KEY (channel, sku)
//! );
//!
//! CREATE TABLE high_watermarks (
//!     channel TEXT NOT NULL,
//!     job_kind TEXT NOT NULL,
//!     watermark TIMESTAMPTZ NOT NULL,
//!     PRIMARY KEY (channel, job_kind)
//! );
//! ```
//!
//! This module does not run migrations; both tables are assumed to exist.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use thiserror::Error;

/// Errors from repository operations.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The underlying database call failed.
    #[error("database error: {0}")]
    Database(String),
}

/// Tracks, per (channel, SKU), which aggregate version was last
/// successfully pushed to that channel — the idempotent-fan-out check in
/// spec §4.3 ("only after checking that the binding's last-pushed version
/// is strictly less than the new version").
pub struct ChannelBindingRepository {
    pool: PgPool,
}

impl ChannelBindingRepository {
    /// Build a repository backed by `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The version most recently acknowledged as pushed for this
    /// (channel, SKU) binding, or `None` if never pushed.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Database`] if the query fails.
    pub async fn last_pushed_version(&self, channel: &str, sku: &str) -> Result<Option<u64>, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT last_pushed_version
            FROM channel_bindings
            WHERE channel = $1 AND sku = $2
            ",
        )
        .bind(channel)
        .bind(sku)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|r| {
            let version: i64 = r.get("last_pushed_version");
            #[allow(clippy::cast_sign_loss)]
            let version = version as u64;
            version
        }))
    }

    /// Record that `version` was successfully pushed for this (channel,
    /// SKU) binding.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Database`] if the upsert fails.
    pub async fn record_pushed_version(&self, channel: &str, sku: &str, version: u64) -> Result<(), RepositoryError> {
        #[allow(clippy::cast_possible_wrap)]
        let version = version as i64;
        sqlx::query(
            r"
            INSERT INTO channel_bindings (channel, sku, last_pushed_version, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (channel, sku)
            DO UPDATE SET last_pushed_version = EXCLUDED.last_pushed_version, updated_at = NOW()
            ",
        )
        .bind(channel)
        .bind(sku)
        .bind(version)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        metrics::counter!("repository.channel_binding.pushed_version_recorded", "channel" => channel.to_string())
            .increment(1);

        Ok(())
    }
}

/// Tracks, per (channel, job kind), the timestamp of the most recently
/// committed poll result — advanced only after a commit (spec §4.4 stage 6:
/// "advance the high-watermark only after commit").
pub struct HighWatermarkRepository {
    pool: PgPool,
}

impl HighWatermarkRepository {
    /// Build a repository backed by `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The current high-watermark for this (channel, job kind), or `None`
    /// if this pair has never committed a poll.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Database`] if the query fails.
    pub async fn get(&self, channel: &str, job_kind: &str) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let row = sqlx::query(
            r"
            SELECT watermark
            FROM high_watermarks
            WHERE channel = $1 AND job_kind = $2
            ",
        )
        .bind(channel)
        .bind(job_kind)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(|r| r.get("watermark")))
    }

    /// Advance the high-watermark for this (channel, job kind). Callers
    /// must only call this after the corresponding batch has committed.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Database`] if the upsert fails.
    pub async fn advance(&self, channel: &str, job_kind: &str, watermark: DateTime<Utc>) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO high_watermarks (channel, job_kind, watermark)
            VALUES ($1, $2, $3)
            ON CONFLICT (channel, job_kind)
            DO UPDATE SET watermark = EXCLUDED.watermark
            WHERE high_watermarks.watermark < EXCLUDED.watermark
            ",
        )
        .bind(channel)
        .bind(job_kind)
        .bind(watermark)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_error_display_includes_detail() {
        let error = RepositoryError::Database("connection refused".to_string());
        assert!(format!("{error}").contains("connection refused"));
    }
}
