//! Mock implementations of environment traits for fast, deterministic tests.
//!
//! - [`FixedClock`]: deterministic time
//! - [`InMemoryEventStore`]: `HashMap`-backed event store with optimistic concurrency
//! - [`InMemoryEventBus`]: broadcast-channel-backed event bus

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use syncengine_core::environment::Clock;
use syncengine_core::event::SerializedEvent;
use syncengine_core::event_bus::{EventBus, EventBusError, EventStream};
use syncengine_core::event_store::{EventStore, EventStoreError};
use syncengine_core::stream::{StreamId, Version};
use tokio::sync::broadcast;

/// Fixed clock for deterministic tests.
///
/// Always returns the same time, making tests reproducible.
///
/// # Example
///
/// ```
/// use syncengine_testing::mocks::FixedClock;
/// use syncengine_core::environment::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// let time1 = clock.now();
/// let time2 = clock.now();
/// assert_eq!(time1, time2); // Always the same!
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
///
/// # Panics
///
/// This function will panic if the hardcoded timestamp fails to parse,
/// which should never happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

/// In-memory event store for fast, deterministic testing.
///
/// Streams are kept in a `HashMap` guarded by an `RwLock`. Versions are
/// zero-indexed: a stream holding N events is at version `N - 1` (an empty
/// stream reports version 0 for the purposes of the optimistic concurrency
/// check, matching the behaviour of a fresh, never-written stream).
///
/// # Example
///
/// ```
/// use syncengine_testing::mocks::InMemoryEventStore;
/// use syncengine_core::event_store::EventStore;
/// use syncengine_core::event::SerializedEvent;
/// use syncengine_core::stream::StreamId;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryEventStore::new();
/// let event = SerializedEvent::new("Created".to_string(), b"data".to_vec(), None);
///
/// let version = store.append_events(StreamId::new("order-1"), None, vec![event]).await?;
/// assert_eq!(version.value(), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<StreamId, Vec<SerializedEvent>>>>,
    snapshots: Arc<RwLock<HashMap<StreamId, (Version, Vec<u8>)>>>,
}

impl InMemoryEventStore {
    /// Create a new, empty in-memory event store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            streams: Arc::new(RwLock::new(HashMap::new())),
            snapshots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Total number of streams with at least one event.
    ///
    /// Useful for assertions in tests.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test infrastructure, lock cannot be poisoned in practice
    pub fn stream_count(&self) -> usize {
        self.streams.read().unwrap().len()
    }

    /// Current version of a stream, matching the check used by `append_events`.
    ///
    /// An empty (or never-written) stream reports version 0.
    fn current_version(events: &[SerializedEvent]) -> Version {
        Version::new((events.len() as u64).saturating_sub(1))
    }
}

impl EventStore for InMemoryEventStore {
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

            #[allow(clippy::unwrap_used)] // Test infrastructure, lock cannot be poisoned in practice
            let mut streams = self.streams.write().unwrap();
            let stream = streams.entry(stream_id.clone()).or_default();
            let actual = Self::current_version(stream);

            if let Some(expected) = expected_version {
                if expected != actual {
                    return Err(EventStoreError::ConcurrencyConflict {
                        stream_id,
                        expected,
                        actual,
                    });
                }
            }

            stream.extend(events);
            Ok(Self::current_version(stream))
        })
    }

    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SerializedEvent>, EventStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            #[allow(clippy::unwrap_used)] // Test infrastructure, lock cannot be poisoned in practice
            let streams = self.streams.read().unwrap();
            let Some(events) = streams.get(&stream_id) else {
                return Ok(Vec::new());
            };
            let start = from_version.map_or(0, |v| v.value() as usize);
            Ok(events.get(start..).map(<[_]>::to_vec).unwrap_or_default())
        })
    }

    fn save_snapshot(
        &self,
        stream_id: StreamId,
        version: Version,
        state: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            #[allow(clippy::unwrap_used)] // Test infrastructure, lock cannot be poisoned in practice
            self.snapshots
                .write()
                .unwrap()
                .insert(stream_id, (version, state));
            Ok(())
        })
    }

    fn load_snapshot(
        &self,
        stream_id: StreamId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<(Version, Vec<u8>)>, EventStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            #[allow(clippy::unwrap_used)] // Test infrastructure, lock cannot be poisoned in practice
            Ok(self.snapshots.read().unwrap().get(&stream_id).cloned())
        })
    }
}

/// In-memory event bus backed by a `tokio::sync::broadcast` channel, for fast,
/// deterministic testing.
///
/// Every topic shares a single broadcast channel; `subscribe` filters the
/// stream down to the requested topics. Because broadcast channels have no
/// subscribers until `subscribe` is called, events published before the first
/// subscription are lost - callers should subscribe before publishing, as with
/// the production Redpanda-backed bus.
///
/// # Example
///
/// ```
/// use syncengine_testing::mocks::InMemoryEventBus;
/// use syncengine_core::event_bus::EventBus;
/// use syncengine_core::event::SerializedEvent;
/// use futures::StreamExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = InMemoryEventBus::new();
/// let mut stream = bus.subscribe(&["order-events"]).await?;
///
/// let event = SerializedEvent::new("OrderPlaced".to_string(), b"data".to_vec(), None);
/// bus.publish("order-events", &event).await?;
///
/// let received = stream.next().await.unwrap()?;
/// assert_eq!(received.event_type, "OrderPlaced");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryEventBus {
    sender: broadcast::Sender<(String, SerializedEvent)>,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus with the given channel capacity.
    ///
    /// Capacity controls how many unread messages a slow subscriber can lag
    /// behind by before it starts missing events (`RecvError::Lagged`).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new in-memory event bus with a default channel capacity of 1024.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let event = event.clone();
        Box::pin(async move {
            // No subscribers is not an error: at-least-once delivery only
            // applies to subscribers that exist at publish time.
            let _ = self.sender.send((topic, event));
            Ok(())
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(ToString::to_string).collect();
        let mut receiver = self.sender.subscribe();
        Box::pin(async move {
            let stream = async_stream::stream! {
                loop {
                    match receiver.recv().await {
                        Ok((topic, event)) => {
                            if topics.iter().any(|t| t == &topic) {
                                yield Ok(event);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            yield Err(EventBusError::TransportError(format!(
                                "subscriber lagged by {n} messages"
                            )));
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            };

            Ok(Box::pin(stream) as EventStream)
        })
    }
}
