//! Mutator: unidirectional state holders driven by folded streams of pure mutations
//!
//! Mutator keeps a pure core and an imperative shell. The core is a fold of
//! pure `S -> S` functions over an initial state; the shell is a set of tokio
//! tasks that gather actions, turn them into mutations and publish each
//! folded state to observers.
//!
//! # Core Concepts
//!
//! - **State**: any immutable, comparable value via the `State` bound
//! - **Mutation**: a pure state transition, the only way state changes
//! - **StateHolder**: observable state plus a non-blocking `accept(action)`
//! - **Scope**: cancellable owner of every task a holder spawns
//! - **SharingStarted**: when the upstream runs relative to its observers
//!
//! # Example
//!
//! ```rust
//! use futures::StreamExt;
//! use mutator::{mutator_of, ActionSource, Mutation, Scope, SharingStarted, StateHolder};
//!
//! #[derive(Clone, PartialEq, Debug)]
//! struct Snail {
//!     progress: u32,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum Action {
//!     Crawl(u32),
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let scope = Scope::new();
//! let snail = mutator_of(
//!     &scope,
//!     Snail { progress: 0 },
//!     SharingStarted::while_subscribed(),
//!     |actions: ActionSource<Action>| {
//!         actions.subscribe().map(|action| match action {
//!             Action::Crawl(by) => Mutation::new(move |s: Snail| Snail {
//!                 progress: s.progress + by,
//!             }),
//!         })
//!     },
//! );
//!
//! // Accepted before anyone observes: buffered, then delivered on start.
//! snail.accept(Action::Crawl(50)).unwrap();
//!
//! let mut states = snail.state().subscribe();
//! let state = states.wait_for(|s| s.progress == 50).await;
//! assert_eq!(state, Some(Snail { progress: 50 }));
//! scope.cancel();
//! # }
//! ```

pub mod core;
pub mod flow;
pub mod holder;
pub mod snails;

// Re-export commonly used types
pub use crate::core::{Mutation, MutationStreamExt, State};
pub use crate::flow::{ActionSource, FlowExt, Scope, StateFlow, StateSubscription};
pub use crate::holder::{
    derived, mutator_of, scoped_state_holder, HolderConfig, HolderError, MutationHolder,
    Mutator, SharingStarted, StateHolder, StateHolderBuilder,
};
