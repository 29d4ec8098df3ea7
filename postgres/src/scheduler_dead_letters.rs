//! `PostgreSQL`-backed [`syncengine_runtime::DeadLetterSink`]: archives
//! `SyncJob`s that exhaust the scheduler's retry budget, following the same
//! table-per-failure-kind shape as [`crate::dead_letter_queue::DeadLetterQueue`].
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE sync_job_dead_letters (
//!     id BIGSERIAL PRIMARY KEY,
//!     job_id TEXT NOT NULL,
//!     kind TEXT NOT NULL,
//!     channel TEXT NOT NULL,
//!     attempt INTEGER NOT NULL,
//!     payload JSONB NOT NULL,
//!     reason TEXT NOT NULL,
//!     archived_at TIMESTAMPTZ NOT NULL
//! );
//! ```
//!
//! This module does not run migrations; the table is assumed to exist.

use sqlx::PgPool;
use syncengine_runtime::{DeadLetter, DeadLetterSink};

/// Archives dead-lettered [`syncengine_runtime::SyncJob`]s to the
/// `sync_job_dead_letters` table.
pub struct PostgresDeadLetterSink {
    pool: PgPool,
}

impl PostgresDeadLetterSink {
    /// Build a sink backed by `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DeadLetterSink for PostgresDeadLetterSink {
    async fn archive(&self, dead_letter: DeadLetter) {
        let payload = serde_json::to_value(&dead_letter.job).unwrap_or(serde_json::Value::Null);
        let result = sqlx::query(
            r"
            INSERT INTO sync_job_dead_letters (job_id, kind, channel, attempt, payload, reason, archived_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ",
        )
        .bind(&dead_letter.job.id)
        .bind(format!("{:?}", dead_letter.job.kind))
        .bind(&dead_letter.job.channel)
        .bind(i32::try_from(dead_letter.job.attempt).unwrap_or(i32::MAX))
        .bind(payload)
        .bind(&dead_letter.reason)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::error!(job_id = %dead_letter.job.id, error = %e, "failed to persist dead letter");
        } else {
            metrics::counter!("repository.dead_letters.archived", "channel" => dead_letter.job.channel.clone())
                .increment(1);
        }
    }
}
