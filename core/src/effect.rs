//! Effect descriptions — side effects returned by reducers, executed by the
//! runtime's `Store`. Effects are data, not execution: a reducer builds one
//! and hands it back, the runtime decides how and when to run it.

use crate::event::SerializedEvent;
use crate::event_bus::{EventBus, EventBusError};
use crate::event_store::{EventStore, EventStoreError};
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// An append-events operation described as data, to be executed by the
/// runtime against a concrete `EventStore`.
#[allow(missing_docs)]
pub enum EventStoreOperation<Action> {
    AppendEvents {
        event_store: Arc<dyn EventStore>,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
        on_success: Box<dyn FnOnce(Version) -> Option<Action> + Send>,
        on_error: Box<dyn FnOnce(EventStoreError) -> Option<Action> + Send>,
    },
    LoadEvents {
        event_store: Arc<dyn EventStore>,
        stream_id: StreamId,
        from_version: Option<Version>,
        on_success: Box<dyn FnOnce(Vec<SerializedEvent>) -> Option<Action> + Send>,
        on_error: Box<dyn FnOnce(EventStoreError) -> Option<Action> + Send>,
    },
    SaveSnapshot {
        event_store: Arc<dyn EventStore>,
        stream_id: StreamId,
        version: Version,
        state: Vec<u8>,
        on_success: Box<dyn FnOnce(()) -> Option<Action> + Send>,
        on_error: Box<dyn FnOnce(EventStoreError) -> Option<Action> + Send>,
    },
    LoadSnapshot {
        event_store: Arc<dyn EventStore>,
        stream_id: StreamId,
        on_success: Box<dyn FnOnce(Option<(Version, Vec<u8>)>) -> Option<Action> + Send>,
        on_error: Box<dyn FnOnce(EventStoreError) -> Option<Action> + Send>,
    },
}

/// A publish operation described as data, to be executed by the runtime
/// against a concrete `EventBus`.
#[allow(missing_docs)]
pub enum EventBusOperation<Action> {
    Publish {
        event_bus: Arc<dyn EventBus>,
        topic: String,
        event: SerializedEvent,
        on_success: Box<dyn FnOnce() -> Option<Action> + Send>,
        on_error: Box<dyn FnOnce(EventBusError) -> Option<Action> + Send>,
    },
}

/// Effect type - describes a side effect to be executed
///
/// Effects are NOT executed immediately. They are descriptions of what should
/// happen, returned from reducers and executed by the Store runtime.
#[allow(missing_docs)]
pub enum Effect<Action> {
    /// No-op effect
    None,

    /// Run effects in parallel
    Parallel(Vec<Effect<Action>>),

    /// Run effects sequentially
    Sequential(Vec<Effect<Action>>),

    /// Delayed action (for timeouts, retries, scheduler re-checks)
    Delay {
        /// How long to wait
        duration: Duration,
        /// Action to dispatch after delay
        action: Box<Action>,
    },

    /// Arbitrary async computation. Returns `Option<Action>` - if `Some`,
    /// the action is fed back into the reducer.
    Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

    /// An event store operation (append or load)
    EventStore(EventStoreOperation<Action>),

    /// An event bus publish operation
    PublishEvent(EventBusOperation<Action>),
}

impl<Action> std::fmt::Debug for Effect<Action>
where
    Action: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Parallel(effects) => f.debug_tuple("Effect::Parallel").field(effects).finish(),
            Effect::Sequential(effects) => {
                f.debug_tuple("Effect::Sequential").field(effects).finish()
            },
            Effect::Delay { duration, action } => f
                .debug_struct("Effect::Delay")
                .field("duration", duration)
                .field("action", action)
                .finish(),
            Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            Effect::EventStore(_) => write!(f, "Effect::EventStore(<operation>)"),
            Effect::PublishEvent(_) => write!(f, "Effect::PublishEvent(<operation>)"),
        }
    }
}

impl<Action> Effect<Action> {
    /// Combine effects to run in parallel
    #[must_use]
    pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Parallel(effects)
    }

    /// Chain effects to run sequentially
    #[must_use]
    pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Sequential(effects)
    }

    /// Transform the action type of this effect.
    ///
    /// Useful for composing effects from different reducers, e.g. lifting an
    /// `Effect<InventoryAction>` into `Effect<EngineAction>`.
    pub fn map<B, F>(self, f: F) -> Effect<B>
    where
        F: Fn(Action) -> B + Send + Sync + 'static + Clone,
        Action: Send + 'static,
        B: Send + 'static,
    {
        map_effect(self, f)
    }
}

fn map_effect<A, B, F>(effect: Effect<A>, f: F) -> Effect<B>
where
    F: Fn(A) -> B + Send + Sync + 'static + Clone,
    A: Send + 'static,
    B: Send + 'static,
{
    match effect {
        Effect::None => Effect::None,
        Effect::Parallel(effects) => Effect::Parallel(
            effects
                .into_iter()
                .map(|e| map_effect(e, f.clone()))
                .collect(),
        ),
        Effect::Sequential(effects) => Effect::Sequential(
            effects
                .into_iter()
                .map(|e| map_effect(e, f.clone()))
                .collect(),
        ),
        Effect::Delay { duration, action } => Effect::Delay {
            duration,
            action: Box::new(f(*action)),
        },
        Effect::Future(fut) => {
            let f = f.clone();
            Effect::Future(Box::pin(async move { fut.await.map(f) }))
        },
        Effect::EventStore(op) => {
            Effect::EventStore(map_event_store_operation(op, f))
        },
        Effect::PublishEvent(op) => Effect::PublishEvent(map_event_bus_operation(op, f)),
    }
}

fn map_event_store_operation<A, B, F>(op: EventStoreOperation<A>, f: F) -> EventStoreOperation<B>
where
    F: Fn(A) -> B + Send + Sync + 'static + Clone,
    A: Send + 'static,
    B: Send + 'static,
{
    match op {
        EventStoreOperation::AppendEvents {
            event_store,
            stream_id,
            expected_version,
            events,
            on_success,
            on_error,
        } => {
            let f_success = f.clone();
            let f_error = f;
            EventStoreOperation::AppendEvents {
                event_store,
                stream_id,
                expected_version,
                events,
                on_success: Box::new(move |v| on_success(v).map(f_success)),
                on_error: Box::new(move |e| on_error(e).map(f_error)),
            }
        },
        EventStoreOperation::LoadEvents {
            event_store,
            stream_id,
            from_version,
            on_success,
            on_error,
        } => {
            let f_success = f.clone();
            let f_error = f;
            EventStoreOperation::LoadEvents {
                event_store,
                stream_id,
                from_version,
                on_success: Box::new(move |events| on_success(events).map(f_success)),
                on_error: Box::new(move |e| on_error(e).map(f_error)),
            }
        },
        EventStoreOperation::SaveSnapshot {
            event_store,
            stream_id,
            version,
            state,
            on_success,
            on_error,
        } => {
            let f_success = f.clone();
            let f_error = f;
            EventStoreOperation::SaveSnapshot {
                event_store,
                stream_id,
                version,
                state,
                on_success: Box::new(move |()| on_success(()).map(f_success)),
                on_error: Box::new(move |e| on_error(e).map(f_error)),
            }
        },
        EventStoreOperation::LoadSnapshot {
            event_store,
            stream_id,
            on_success,
            on_error,
        } => {
            let f_success = f.clone();
            let f_error = f;
            EventStoreOperation::LoadSnapshot {
                event_store,
                stream_id,
                on_success: Box::new(move |snap| on_success(snap).map(f_success)),
                on_error: Box::new(move |e| on_error(e).map(f_error)),
            }
        },
    }
}

fn map_event_bus_operation<A, B, F>(op: EventBusOperation<A>, f: F) -> EventBusOperation<B>
where
    F: Fn(A) -> B + Send + Sync + 'static + Clone,
    A: Send + 'static,
    B: Send + 'static,
{
    match op {
        EventBusOperation::Publish {
            event_bus,
            topic,
            event,
            on_success,
            on_error,
        } => {
            let f_success = f.clone();
            let f_error = f;
            EventBusOperation::Publish {
                event_bus,
                topic,
                event,
                on_success: Box::new(move || on_success().map(f_success)),
                on_error: Box::new(move |e| on_error(e).map(f_error)),
            }
        },
    }
}
