//! # Sync Engine Testing
//!
//! Testing utilities and helpers for the channel synchronisation engine.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (`FixedClock`, `InMemoryEventStore`, `InMemoryEventBus`)
//! - In-memory projection testing infrastructure (`InMemoryProjectionStore`, `InMemoryProjectionCheckpoint`)
//! - A fluent Given-When-Then API for reducer tests (`reducer_test`)
//! - Property-based testing utilities
//!
//! ## Example
//!
//! ```ignore
//! use syncengine_testing::test_clock;
//! use syncengine_runtime::Store;
//!
//! #[tokio::test]
//! async fn test_order_flow() {
//!     let env = test_environment();
//!     let store = OrderStore::new(OrderState::default(), OrderReducer, env);
//!
//!     store.send(OrderAction::PlaceOrder {
//!         customer_id: CustomerId::new(1),
//!         items: vec![],
//!     }).await;
//!
//!     let state = store.state(|s| s.clone()).await;
//!     assert_eq!(state.orders.len(), 1);
//! }
//! ```

/// Mock implementations of environment traits for testing.
pub mod mocks;

/// In-memory projection store, checkpoint, and test harness.
pub mod projection_mocks;


/// Property-based testing utilities
///
/// # Phase 1 Implementation
///
/// This module will contain:
/// - proptest Arbitrary implementations
/// - Custom strategies for domain types
/// - Property test helpers
///
/// Property-based testing utilities using proptest.
pub mod properties {
    // Placeholder for property test utilities
}

// Re-export commonly used items
pub use mocks::{FixedClock, InMemoryEventBus, InMemoryEventStore, test_clock};
pub use projection_mocks::{InMemoryProjectionCheckpoint, InMemoryProjectionStore, ProjectionTestHarness};
pub use reducer_test::ReducerTest;
