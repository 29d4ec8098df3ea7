//! `PostgreSQL`-backed implementation of the `EventStore` trait.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE events (
//!     stream_id TEXT NOT NULL,
//!     version BIGINT NOT NULL,
//!     event_type TEXT NOT NULL,
//!     event_data BYTEA NOT NULL,
//!     metadata JSONB,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     PRIMARY KEY (stream_id, version)
//! );
//!
//! CREATE TABLE snapshots (
//!     stream_id TEXT PRIMARY KEY,
//!     version BIGINT NOT NULL,
//!     state_data BYTEA NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```
//!
//! # Version Numbering
//!
//! Versions are zero-indexed: the Nth event appended to a stream is stored
//! at `version = N - 1`. A stream's current version, for the purposes of
//! the optimistic concurrency check, is `COUNT(*) - 1`, saturating at 0 for
//! an empty (or never-written) stream - this lets the very first append to a
//! brand-new stream pass `Some(Version::new(0))` without a special case.
//!
//! # Concurrency
//!
//! The version check and the insert happen inside a single transaction that
//! re-reads the current count with `SELECT ... FOR UPDATE`-free row locking
//! provided by the `(stream_id, version)` primary key: a second transaction
//! racing to insert the same `(stream_id, version)` pair fails with a unique
//! violation, which is mapped back to `ConcurrencyConflict`.

use syncengine_core::event::SerializedEvent;
use syncengine_core::event_store::{EventStore, EventStoreError};
use syncengine_core::stream::{StreamId, Version};
use sqlx::{PgPool, Row};
use std::future::Future;
use std::pin::Pin;

/// `PostgreSQL` event store: production implementation of [`EventStore`].
///
/// Built on a connection pool shared with other application components
/// (e.g. the [`crate::dead_letter_queue::DeadLetterQueue`]).
#[derive(Clone, Debug)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Wrap an existing connection pool as an event store.
    ///
    /// Assumes the `events` and `snapshots` tables already exist (see module
    /// docs for the schema); this type does not run migrations.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying connection pool.
    ///
    /// Useful for sharing the pool with other storage components
    /// (e.g. the dead letter queue) without opening a second connection.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Current version of a stream given its event count, saturating at 0.
    const fn version_for_count(count: i64) -> Version {
        Version::new(count.saturating_sub(1) as u64)
    }
}

impl EventStore for PostgresEventStore {
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            if events.is_empty() {
                return Err(EventStoreError::DatabaseError(
                    "cannot append an empty event list".to_string(),
                ));
            }

            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

            let (count,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM events WHERE stream_id = $1")
                    .bind(stream_id.as_str())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

            let actual = Self::version_for_count(count);

            if let Some(expected) = expected_version {
                if expected != actual {
                    return Err(EventStoreError::ConcurrencyConflict {
                        stream_id,
                        expected,
                        actual,
                    });
                }
            }

            let mut next_version = count;
            for event in &events {
                sqlx::query(
                    r"
                    INSERT INTO events (stream_id, version, event_type, event_data, metadata)
                    VALUES ($1, $2, $3, $4, $5)
                    ",
                )
                .bind(stream_id.as_str())
                .bind(next_version)
                .bind(&event.event_type)
                .bind(&event.data)
                .bind(&event.metadata)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if let sqlx::Error::Database(db_err) = &e {
                        if db_err.is_unique_violation() {
                            return EventStoreError::ConcurrencyConflict {
                                stream_id: stream_id.clone(),
                                expected: expected_version.unwrap_or(actual),
                                actual,
                            };
                        }
                    }
                    EventStoreError::DatabaseError(e.to_string())
                })?;
                next_version += 1;
            }

            tx.commit()
                .await
                .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

            Ok(Self::version_for_count(next_version))
        })
    }

    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SerializedEvent>, EventStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            #[allow(clippy::cast_possible_wrap)] // Versions never approach i64::MAX in practice
            let from = from_version.map_or(0_i64, |v| v.value() as i64);

            let rows = sqlx::query(
                r"
                SELECT event_type, event_data, metadata
                FROM events
                WHERE stream_id = $1 AND version >= $2
                ORDER BY version ASC
                ",
            )
            .bind(stream_id.as_str())
            .bind(from)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

            Ok(rows
                .iter()
                .map(|row| SerializedEvent {
                    event_type: row.get("event_type"),
                    data: row.get("event_data"),
                    metadata: row.get("metadata"),
                })
                .collect())
        })
    }

    fn save_snapshot(
        &self,
        stream_id: StreamId,
        version: Version,
        state: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            #[allow(clippy::cast_possible_wrap)] // Versions never approach i64::MAX in practice
            let version_i64 = version.value() as i64;

            sqlx::query(
                r"
                INSERT INTO snapshots (stream_id, version, state_data)
                VALUES ($1, $2, $3)
                ON CONFLICT (stream_id)
                DO UPDATE SET version = EXCLUDED.version, state_data = EXCLUDED.state_data, created_at = now()
                ",
            )
            .bind(stream_id.as_str())
            .bind(version_i64)
            .bind(&state)
            .execute(&self.pool)
            .await
            .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

            Ok(())
        })
    }

    fn load_snapshot(
        &self,
        stream_id: StreamId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<(Version, Vec<u8>)>, EventStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT version, state_data
                FROM snapshots
                WHERE stream_id = $1
                ",
            )
            .bind(stream_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| EventStoreError::DatabaseError(e.to_string()))?;

            Ok(row.map(|row| {
                let version: i64 = row.get("version");
                let state_data: Vec<u8> = row.get("state_data");
                (Version::new(version as u64), state_data)
            }))
        })
    }
}
