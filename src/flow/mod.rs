//! Reactive primitives backing the state holders.
//!
//! - `Scope`: cancellable owner of spawned tasks
//! - `StateFlow`: current value plus future values, with subscriber counting
//! - `ActionChannel`: multicast action intake gated on a connected consumer
//! - Operators: `merge`, `flat_map_latest`, `interval`

mod actions;
mod operators;
mod scope;
mod state_flow;

pub use actions::{ActionChannel, ActionSource};
pub use operators::{interval, merge, FlatMapLatest, FlowExt, Merge};
pub use scope::Scope;
pub use state_flow::{state_flow, StateFlow, StatePublisher, StateSubscription};
