//! `PostgreSQL` event store implementation for Sync Engine.
//!
//! This crate provides a production-ready PostgreSQL-based event store that implements
//! the `EventStore` trait from `syncengine-core`. It uses sqlx for compile-time
//! checked queries and supports:
//!
//! - Event persistence with optimistic concurrency
//! - State snapshots for performance
//! - Connection pooling
//! - Transaction support
//! - A dead letter queue for events that exhaust retries
//!
//! # Example
//!
//! ```ignore
//! use syncengine_postgres::PostgresEventStore;
//! use sqlx::PgPool;
//!
//! async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let event_store = PostgresEventStore::from_pool(pool);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Dead letter queue for events that failed processing after exhausting retries.
pub mod dead_letter_queue;

/// `PostgreSQL`-backed `EventStore` implementation.
pub mod event_store;

/// Channel-binding push-version and high-watermark bookkeeping.
pub mod repository;

/// `PostgreSQL`-backed `DeadLetterSink` for the sync scheduler.
pub mod scheduler_dead_letters;

pub use dead_letter_queue::{DLQStatus, DeadLetterQueue, FailedEvent};
pub use event_store::PostgresEventStore;
pub use repository::{ChannelBindingRepository, HighWatermarkRepository, RepositoryError};
pub use scheduler_dead_letters::PostgresDeadLetterSink;
