//! Projections of a parent holder onto a sub-state.
//!
//! A derived holder reads through `mapper` and writes back through the
//! parent: a mutation of the sub-state is lifted into a mutation of the
//! parent state, so the parent's fold stays the single source of truth.

use super::error::HolderError;
use super::StateHolder;
use crate::core::{Mutation, State};
use crate::flow::{state_flow, Scope, StateFlow};
use std::sync::Arc;

type Mapper<S, Sub> = Arc<dyn Fn(&S) -> Sub + Send + Sync>;
type MergeBack<S, Sub> = Arc<dyn Fn(S, Sub) -> S + Send + Sync>;

/// A holder of `Sub` backed by a parent holder of `S`.
pub struct DerivedStateHolder<S, Sub> {
    parent: Arc<dyn StateHolder<Mutation<S>, S>>,
    state: StateFlow<Sub>,
    scope: Scope,
    mapper: Mapper<S, Sub>,
    merge_back: MergeBack<S, Sub>,
}

impl<S, Sub> Clone for DerivedStateHolder<S, Sub> {
    fn clone(&self) -> Self {
        Self {
            parent: Arc::clone(&self.parent),
            state: self.state.clone(),
            scope: self.scope.clone(),
            mapper: Arc::clone(&self.mapper),
            merge_back: Arc::clone(&self.merge_back),
        }
    }
}

/// Derive a holder of `Sub` from `parent`.
///
/// The derived state starts at `mapper(parent's current value)` and follows
/// every parent change, skipping results equal to the previous one. Its
/// observation task runs eagerly in `scope` and ends when the scope is
/// cancelled or the parent completes.
///
/// Accepting a sub-mutation `m` applies
/// `s -> merge_back(s, m(mapper(s)))` to the parent, atomically with respect
/// to the parent's other mutations.
///
/// # Example
///
/// ```rust
/// use mutator::core::Mutation;
/// use mutator::flow::{ActionSource, Scope};
/// use mutator::holder::{
///     derived, scoped_state_holder, MutationHolder, SharingStarted, StateHolder,
/// };
///
/// #[derive(Clone, PartialEq, Debug)]
/// struct Snail {
///     progress: u32,
///     color: u32,
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let scope = Scope::new();
/// let snail = scoped_state_holder(
///     &scope,
///     Snail { progress: 0, color: 1 },
///     SharingStarted::Eagerly,
///     |actions: ActionSource<Mutation<Snail>>| actions.subscribe(),
/// );
/// let progress = derived(
///     &snail,
///     &scope,
///     |s: &Snail| s.progress,
///     |s: Snail, progress| Snail { progress, ..s },
/// );
///
/// progress.accept_mutation(|p: u32| p + 5).unwrap();
///
/// let mut states = snail.state().subscribe();
/// let parent = states.wait_for(|s| s.progress == 5).await.unwrap();
/// assert_eq!(parent.color, 1);
/// # scope.cancel();
/// # }
/// ```
pub fn derived<S, Sub, H, M, W>(
    parent: &H,
    scope: &Scope,
    mapper: M,
    merge_back: W,
) -> DerivedStateHolder<S, Sub>
where
    S: State,
    Sub: State,
    H: StateHolder<Mutation<S>, S> + Clone + 'static,
    M: Fn(&S) -> Sub + Send + Sync + 'static,
    W: Fn(S, Sub) -> S + Send + Sync + 'static,
{
    let mapper: Mapper<S, Sub> = Arc::new(mapper);
    let merge_back: MergeBack<S, Sub> = Arc::new(merge_back);

    let mut parent_states = parent.state().subscribe();
    let (publisher, state) = state_flow(mapper(&parent.state().value()));

    let project = Arc::clone(&mapper);
    scope.spawn(async move {
        while let Some(parent_state) = parent_states.next().await {
            publisher.publish(project(&parent_state));
        }
        tracing::debug!("parent state completed, derived state ends");
    });

    DerivedStateHolder {
        parent: Arc::new(parent.clone()),
        state,
        scope: scope.clone(),
        mapper,
        merge_back,
    }
}

impl<S, Sub> StateHolder<Mutation<Sub>, Sub> for DerivedStateHolder<S, Sub>
where
    S: State,
    Sub: State,
{
    fn state(&self) -> &StateFlow<Sub> {
        &self.state
    }

    fn accept(&self, mutation: Mutation<Sub>) -> Result<(), HolderError> {
        if self.scope.is_cancelled() {
            return Err(HolderError::Stopped);
        }

        let mapper = Arc::clone(&self.mapper);
        let merge_back = Arc::clone(&self.merge_back);
        let lifted = Mutation::new(move |current: S| {
            let projected = mutation.apply(mapper(&current));
            merge_back(current, projected)
        });
        self.parent.accept(lifted)
    }
}
