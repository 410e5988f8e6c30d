//! Fluent construction of state holders with validated configuration.

use super::config::{HolderConfig, OverflowPolicy, SharingStarted};
use super::error::BuildError;
use super::scoped::ScopedStateHolder;
use crate::core::{Mutation, State};
use crate::flow::{ActionSource, Scope};
use futures::stream::{BoxStream, Stream, StreamExt};

type Transform<A, S> =
    Box<dyn Fn(ActionSource<A>) -> BoxStream<'static, Mutation<S>> + Send + Sync>;

/// Builder for [`ScopedStateHolder`] with a fluent API.
///
/// ```rust
/// use futures::StreamExt;
/// use mutator::core::Mutation;
/// use mutator::flow::{ActionSource, Scope};
/// use mutator::holder::{OverflowPolicy, SharingStarted, StateHolderBuilder};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let scope = Scope::new();
/// let holder = StateHolderBuilder::new()
///     .initial(0u64)
///     .started(SharingStarted::Lazily)
///     .action_capacity(4)
///     .overflow(OverflowPolicy::Reject)
///     .transform(|actions: ActionSource<u64>| {
///         actions.subscribe().map(|n| Mutation::new(move |total: u64| total + n))
///     })
///     .build(&scope)
///     .unwrap();
/// # scope.cancel();
/// # }
/// ```
pub struct StateHolderBuilder<A, S> {
    initial: Option<S>,
    config: HolderConfig,
    transform: Option<Transform<A, S>>,
}

impl<A, S> StateHolderBuilder<A, S>
where
    A: Clone + Send + 'static,
    S: State,
{
    pub fn new() -> Self {
        Self {
            initial: None,
            config: HolderConfig::default(),
            transform: None,
        }
    }

    /// Set the initial state (required).
    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(state);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: HolderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn started(mut self, started: SharingStarted) -> Self {
        self.config.started = started;
        self
    }

    pub fn action_capacity(mut self, capacity: usize) -> Self {
        self.config.action_capacity = capacity;
        self
    }

    pub fn overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.config.overflow = overflow;
        self
    }

    /// Set the transform from actions to mutations (required).
    ///
    /// It is called once per pipeline run, so a holder that restarts gets a
    /// fresh mutation stream each time.
    pub fn transform<F, M>(mut self, transform: F) -> Self
    where
        F: Fn(ActionSource<A>) -> M + Send + Sync + 'static,
        M: Stream<Item = Mutation<S>> + Send + 'static,
    {
        self.transform = Some(Box::new(move |actions: ActionSource<A>| {
            transform(actions).boxed()
        }));
        self
    }

    /// Validate and launch the holder in `scope`.
    ///
    /// Every configuration problem is reported, not only the first.
    pub fn build(self, scope: &Scope) -> Result<ScopedStateHolder<A, S>, BuildError> {
        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;
        let transform = self.transform.ok_or(BuildError::MissingTransform)?;
        self.config.check().map_err(BuildError::InvalidConfig)?;

        Ok(ScopedStateHolder::launch(
            scope,
            initial,
            self.config,
            transform,
        ))
    }
}

impl<A, S> Default for StateHolderBuilder<A, S>
where
    A: Clone + Send + 'static,
    S: State,
{
    fn default() -> Self {
        Self::new()
    }
}
