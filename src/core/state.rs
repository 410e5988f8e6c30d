//! The bound every held state satisfies.
//!
//! States are immutable values: every transition produces a new value and
//! the previous one is never touched. The trait carries no methods; it only
//! names the capabilities the reduction engine relies on.

use std::fmt::Debug;

/// Trait for values held by a state holder.
///
/// # Required Traits
///
/// - `Clone`: the current value is handed to every new subscriber
/// - `PartialEq`: consecutive equal values are not republished
/// - `Debug`: states show up in trace logs
/// - `Send` + `Sync` + `'static`: states cross task boundaries
///
/// The trait is implemented for every type meeting those bounds, so plain
/// structs, enums and primitives can be held without ceremony.
///
/// # Example
///
/// ```rust
/// use mutator::core::State;
///
/// #[derive(Clone, PartialEq, Debug, Default)]
/// struct Counter {
///     count: u32,
/// }
///
/// fn assert_state<S: State>() {}
/// assert_state::<Counter>();
/// assert_state::<u32>();
/// ```
pub trait State: Clone + PartialEq + Debug + Send + Sync + 'static {}

impl<T> State for T where T: Clone + PartialEq + Debug + Send + Sync + 'static {}
