//! Mutations and the fold that applies them.
//!
//! A [`Mutation`] is the only way a held state changes. Folding a sequence of
//! mutations over a seed is pure: the same seed and the same mutations always
//! yield the same states.

use super::state::State;
use futures::stream::{Stream, StreamExt};
use std::fmt;
use std::sync::Arc;

/// A pure state transition, `S -> S`.
///
/// Mutations are immutable and cheap to clone: cloning shares the underlying
/// function. They carry no data besides the function itself.
///
/// # Example
///
/// ```rust
/// use mutator::core::Mutation;
///
/// #[derive(Clone, PartialEq, Debug)]
/// struct Progress {
///     value: u32,
/// }
///
/// let advance = Mutation::new(|p: Progress| Progress { value: p.value + 1 });
/// let reset = Mutation::new(|_: Progress| Progress { value: 0 });
///
/// assert_eq!(advance.apply(Progress { value: 4 }), Progress { value: 5 });
/// assert_eq!(advance.then(reset).apply(Progress { value: 4 }), Progress { value: 0 });
/// ```
pub struct Mutation<S> {
    mutate: Arc<dyn Fn(S) -> S + Send + Sync>,
}

impl<S: State> Mutation<S> {
    /// Wrap a pure function as a mutation.
    ///
    /// The function must be deterministic and free of side effects; the
    /// fold may be replayed from the seed when a holder restarts.
    pub fn new<F>(mutate: F) -> Self
    where
        F: Fn(S) -> S + Send + Sync + 'static,
    {
        Self {
            mutate: Arc::new(mutate),
        }
    }

    /// A mutation that returns the state unchanged.
    pub fn identity() -> Self {
        Self::new(|state| state)
    }

    /// Apply the mutation, producing the next state.
    pub fn apply(&self, state: S) -> S {
        (self.mutate)(state)
    }

    /// Compose two mutations: `self` runs first, then `next`.
    pub fn then(self, next: Mutation<S>) -> Self {
        Self::new(move |state| next.apply(self.apply(state)))
    }
}

impl<S> Clone for Mutation<S> {
    fn clone(&self) -> Self {
        Self {
            mutate: Arc::clone(&self.mutate),
        }
    }
}

impl<S> fmt::Debug for Mutation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mutation")
    }
}

/// Fold mutations over a seed, yielding every intermediate state.
///
/// The n-th item is `mutations[n]` applied to item n-1, with the seed
/// standing in for item -1. The seed itself is not yielded.
///
/// # Example
///
/// ```rust
/// use mutator::core::{fold_mutations, Mutation};
///
/// let double = Mutation::new(|n: i64| n * 2);
/// let add_three = Mutation::new(|n: i64| n + 3);
///
/// let states: Vec<i64> = fold_mutations(1, vec![double.clone(), add_three, double]).collect();
/// assert_eq!(states, vec![2, 5, 10]);
/// ```
pub fn fold_mutations<S, I>(initial: S, mutations: I) -> impl Iterator<Item = S>
where
    S: State,
    I: IntoIterator<Item = Mutation<S>>,
{
    mutations
        .into_iter()
        .scan(initial, |state, mutation| {
            let next = mutation.apply(state.clone());
            *state = next.clone();
            Some(next)
        })
}

/// Apply every mutation in order and return only the final state.
pub fn reduce_all<S, I>(initial: S, mutations: I) -> S
where
    S: State,
    I: IntoIterator<Item = Mutation<S>>,
{
    mutations
        .into_iter()
        .fold(initial, |state, mutation| mutation.apply(state))
}

/// Stream extension folding mutations into states.
pub trait MutationStreamExt<S: State>: Stream<Item = Mutation<S>> + Sized {
    /// Fold this stream of mutations over `initial`.
    ///
    /// Mutations are applied strictly one at a time, in arrival order,
    /// each exactly once. Like [`fold_mutations`], the seed is not emitted.
    fn reduce_into(self, initial: S) -> ReduceInto<Self, S>;
}

impl<S: State, St> MutationStreamExt<S> for St
where
    St: Stream<Item = Mutation<S>> + Sized,
{
    fn reduce_into(self, initial: S) -> ReduceInto<Self, S> {
        ReduceInto {
            mutations: self,
            state: Some(initial),
        }
    }
}

/// Stream returned by [`MutationStreamExt::reduce_into`].
pub struct ReduceInto<St, S> {
    mutations: St,
    state: Option<S>,
}

// The folded state is never pinned; only the source stream needs to be.
impl<St: Unpin, S> Unpin for ReduceInto<St, S> {}

impl<St, S> Stream for ReduceInto<St, S>
where
    St: Stream<Item = Mutation<S>> + Unpin,
    S: State,
{
    type Item = S;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<S>> {
        use std::task::Poll;

        let this = self.get_mut();
        match this.mutations.poll_next_unpin(cx) {
            Poll::Ready(Some(mutation)) => {
                let Some(current) = this.state.take() else {
                    return Poll::Ready(None);
                };
                let next = mutation.apply(current);
                this.state = Some(next.clone());
                Poll::Ready(Some(next))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
