//! Pure core of the state holders.
//!
//! This module contains the side-effect free building blocks:
//! - The `State` bound for held values
//! - `Mutation`, the only unit of change
//! - The fold applying mutations in order, over iterators and streams
//!
//! Nothing here spawns tasks or touches a clock.

mod mutation;
mod state;

pub use mutation::{fold_mutations, reduce_all, Mutation, MutationStreamExt, ReduceInto};
pub use state::State;
