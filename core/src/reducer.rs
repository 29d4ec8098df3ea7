//! The `Reducer` trait — core abstraction for business logic.
//!
//! Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
//! They contain all business logic and are deterministic and testable; all
//! I/O is pushed out into `Effect` values executed by the runtime.

use crate::effect::Effect;
use crate::SmallVec;

/// The `Reducer` trait - core abstraction for business logic.
///
/// # Type Parameters
///
/// - `State`: The domain state this reducer operates on
/// - `Action`: The action type this reducer processes
/// - `Environment`: The injected dependencies this reducer needs
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The action type this reducer processes
    type Action;

    /// The environment type with injected dependencies
    type Environment;

    /// Reduce an action into state changes and effects.
    ///
    /// A pure function that validates the action, updates state in place,
    /// and returns effect descriptions for the runtime to execute. Most
    /// reducers return zero or one effect; `SmallVec` avoids a heap
    /// allocation for that common case.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]>;
}
