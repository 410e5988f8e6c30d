//! State holders: the imperative shell around the pure fold.
//!
//! A holder owns a [`StateFlow`] and accepts actions. Actions are handed to a
//! user transform which turns them into mutations; the engine folds those
//! mutations over the initial state and publishes every distinct result.
//!
//! # Example
//!
//! ```rust
//! use futures::StreamExt;
//! use mutator::core::Mutation;
//! use mutator::flow::{ActionSource, Scope};
//! use mutator::holder::{mutator_of, SharingStarted, StateHolder};
//!
//! #[derive(Clone, Debug)]
//! enum Action {
//!     Set(u32),
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let scope = Scope::new();
//! let holder = mutator_of(&scope, 0u32, SharingStarted::Eagerly, |actions: ActionSource<Action>| {
//!     actions.subscribe().map(|action| match action {
//!         Action::Set(value) => Mutation::new(move |_: u32| value),
//!     })
//! });
//!
//! holder.accept(Action::Set(7)).unwrap();
//! let mut states = holder.state().subscribe();
//! assert_eq!(states.wait_for(|v| *v == 7).await, Some(7));
//! scope.cancel();
//! # }
//! ```

mod builder;
mod config;
mod derived;
mod error;
mod scoped;

pub use builder::StateHolderBuilder;
pub use config::{
    ConfigError, HolderConfig, OverflowPolicy, SharingStarted, DEFAULT_ACTION_CAPACITY,
    DEFAULT_STOP_TIMEOUT_MS,
};
pub use derived::{derived, DerivedStateHolder};
pub use error::{BuildError, HolderError};
pub use scoped::ScopedStateHolder;

use crate::core::{Mutation, State};
use crate::flow::{ActionSource, Scope, StateFlow};
use futures::Stream;

/// Anything that holds an observable state and accepts actions.
pub trait StateHolder<A, S: State>: Send + Sync {
    /// The held state. Always has a current value.
    fn state(&self) -> &StateFlow<S>;

    /// Hand an action to the holder without blocking.
    ///
    /// Actions accepted before the pipeline runs are buffered and delivered
    /// in order once it connects.
    fn accept(&self, action: A) -> Result<(), HolderError>;
}

/// A [`StateHolder`] that also exposes the scope its pipeline runs in.
pub trait Mutator<A, S: State>: StateHolder<A, S> {
    fn scope(&self) -> &Scope;
}

/// Convenience for holders whose actions are mutations.
pub trait MutationHolder<S: State>: StateHolder<Mutation<S>, S> {
    /// Wrap `mutate` in a [`Mutation`] and accept it.
    fn accept_mutation<F>(&self, mutate: F) -> Result<(), HolderError>
    where
        F: Fn(S) -> S + Send + Sync + 'static,
    {
        self.accept(Mutation::new(mutate))
    }
}

impl<S: State, H> MutationHolder<S> for H where H: StateHolder<Mutation<S>, S> + ?Sized {}

/// Launch a holder in `scope` and keep the scope reachable from it.
pub fn mutator_of<A, S, F, M>(
    scope: &Scope,
    initial: S,
    started: SharingStarted,
    transform: F,
) -> impl Mutator<A, S> + Clone
where
    A: Clone + Send + 'static,
    S: State,
    F: Fn(ActionSource<A>) -> M + Send + Sync + 'static,
    M: Stream<Item = Mutation<S>> + Send + 'static,
{
    ScopedStateHolder::launch(
        scope,
        initial,
        HolderConfig::default().with_started(started),
        transform,
    )
}

/// Launch a holder in `scope`, exposing only state and `accept`.
pub fn scoped_state_holder<A, S, F, M>(
    scope: &Scope,
    initial: S,
    started: SharingStarted,
    transform: F,
) -> impl StateHolder<A, S> + Clone
where
    A: Clone + Send + 'static,
    S: State,
    F: Fn(ActionSource<A>) -> M + Send + Sync + 'static,
    M: Stream<Item = Mutation<S>> + Send + 'static,
{
    ScopedStateHolder::launch(
        scope,
        initial,
        HolderConfig::default().with_started(started),
        transform,
    )
}
