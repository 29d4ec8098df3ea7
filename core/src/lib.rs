//! # Channel Sync Engine — Core
//!
//! Core traits and types for the channel synchronisation engine.
//!
//! This crate provides the fundamental abstractions for building the engine's
//! two stateful aggregates (inventory, orders) using the Reducer pattern with
//! CQRS and event sourcing.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a feature (`InventoryState`, `OrderState`)
//! - **Action**: All possible inputs to a reducer (commands, events)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (no hidden I/O)
//! - Dependency Injection via Environment

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

pub mod composition;
pub mod effect;
pub mod effect_macros;
pub mod environment;
pub mod event;
pub mod event_bus;
pub mod event_store;

pub use effect::Effect;
pub use environment::Clock;
pub use reducer::Reducer;
pub mod projection;
pub mod reducer;
pub mod stream;

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use crate::effect::Effect;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Action1,
        Action2,
        Action3,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum MappedAction {
        Mapped(TestAction),
    }

    #[test]
    fn test_effect_merge() {
        let effect1 = Effect::None;
        let effect2 = Effect::<TestAction>::None;
        let merged = Effect::merge(vec![effect1, effect2]);
        match merged {
            Effect::Parallel(effects) => assert_eq!(effects.len(), 2),
            _ => panic!("Expected Parallel effect"),
        }
    }

    #[test]
    fn test_effect_chain() {
        let effect1 = Effect::None;
        let effect2 = Effect::<TestAction>::None;
        let chained = Effect::chain(vec![effect1, effect2]);
        match chained {
            Effect::Sequential(effects) => assert_eq!(effects.len(), 2),
            _ => panic!("Expected Sequential effect"),
        }
    }

    #[test]
    fn test_effect_map_delay() {
        let effect: Effect<TestAction> = Effect::Delay {
            duration: Duration::from_secs(1),
            action: Box::new(TestAction::Action1),
        };
        let mapped: Effect<MappedAction> = effect.map(MappedAction::Mapped);
        match mapped {
            Effect::Delay { duration, action } => {
                assert_eq!(duration, Duration::from_secs(1));
                assert_eq!(*action, MappedAction::Mapped(TestAction::Action1));
            },
            _ => panic!("Expected Delay effect"),
        }
    }

    #[tokio::test]
    async fn test_effect_map_future() {
        let effect: Effect<TestAction> = Effect::Future(Box::pin(async { Some(TestAction::Action1) }));
        let mapped: Effect<MappedAction> = effect.map(MappedAction::Mapped);
        match mapped {
            Effect::Future(fut) => {
                let result = fut.await;
                assert_eq!(result, Some(MappedAction::Mapped(TestAction::Action1)));
            },
            _ => panic!("Expected Future effect"),
        }
    }

    #[test]
    fn test_effect_map_nested() {
        let effect: Effect<TestAction> = Effect::Parallel(vec![
            Effect::Sequential(vec![
                Effect::Delay {
                    duration: Duration::from_millis(100),
                    action: Box::new(TestAction::Action1),
                },
                Effect::None,
            ]),
            Effect::Delay {
                duration: Duration::from_millis(200),
                action: Box::new(TestAction::Action3),
            },
        ]);
        let mapped: Effect<MappedAction> = effect.map(MappedAction::Mapped);
        match mapped {
            Effect::Parallel(effects) => {
                assert_eq!(effects.len(), 2);
                match &effects[0] {
                    Effect::Sequential(inner) => assert_eq!(inner.len(), 2),
                    _ => panic!("Expected Sequential in Parallel"),
                }
            },
            _ => panic!("Expected Parallel effect"),
        }
    }
}
