//! The reduction engine behind `mutator_of` and `scoped_state_holder`.
//!
//! One pipeline task per holder owns the state publisher. While running it
//! calls the transform on the action source, opens the action channel
//! and folds the resulting mutations into the published state. The sharing
//! policy decides when a run starts and stops. A supervisor task records how
//! the pipeline ended so panics in user code are reported, not swallowed.

use super::config::{HolderConfig, SharingStarted};
use super::error::HolderError;
use super::{Mutator, StateHolder};
use crate::core::{Mutation, MutationStreamExt, State};
use crate::flow::{state_flow, ActionChannel, ActionSource, Scope, StateFlow, StatePublisher};
use futures::stream::{Stream, StreamExt};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::watch;

type Outcome = Option<Result<(), HolderError>>;

struct HolderInner<A, S> {
    state: StateFlow<S>,
    actions: ActionChannel<A>,
    scope: Scope,
    outcome: watch::Receiver<Outcome>,
}

/// A running state holder bound to a [`Scope`].
///
/// Clones share the same pipeline. The holder stops when its scope is
/// cancelled or when user code in the pipeline panics.
pub struct ScopedStateHolder<A, S> {
    inner: Arc<HolderInner<A, S>>,
}

impl<A, S> Clone for ScopedStateHolder<A, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, S> ScopedStateHolder<A, S>
where
    A: Clone + Send + 'static,
    S: State,
{
    /// Launch the pipeline on the current tokio runtime.
    ///
    /// Configuration is assumed valid; use `StateHolderBuilder` to have it
    /// checked first.
    pub fn launch<F, M>(scope: &Scope, initial: S, config: HolderConfig, transform: F) -> Self
    where
        F: Fn(ActionSource<A>) -> M + Send + Sync + 'static,
        M: Stream<Item = Mutation<S>> + Send + 'static,
    {
        let actions = ActionChannel::new(config.action_capacity, config.overflow);
        let (publisher, state) = state_flow(initial.clone());
        let (outcome_tx, outcome) = watch::channel(None);

        let pipeline = Pipeline {
            publisher,
            state: state.clone(),
            actions: actions.clone(),
            initial,
            started: config.started,
        };
        let handle = scope.spawn(pipeline.run(transform));

        tokio::spawn(async move {
            let result = match handle.await {
                Ok(()) => Ok(()),
                Err(error) if error.is_panic() => {
                    let message = panic_message(error.into_panic());
                    tracing::error!(%message, "state pipeline panicked");
                    Err(HolderError::PipelineFailed(message))
                }
                Err(_) => Ok(()),
            };
            outcome_tx.send_replace(Some(result));
        });

        Self {
            inner: Arc::new(HolderInner {
                state,
                actions,
                scope: scope.clone(),
                outcome,
            }),
        }
    }

    /// Wait until the pipeline has ended.
    ///
    /// Resolves to `Ok(())` after orderly shutdown (scope cancellation or a
    /// completed upstream under a never-stopping policy) and to
    /// `HolderError::PipelineFailed` if user code panicked.
    pub async fn stopped(&self) -> Result<(), HolderError> {
        let mut outcome = self.inner.outcome.clone();
        let result = match outcome.wait_for(Option::is_some).await {
            Ok(done) => done.clone().unwrap_or(Ok(())),
            Err(_) => Ok(()),
        };
        result
    }

    /// Number of actions waiting for the pipeline to connect.
    pub fn pending_actions(&self) -> usize {
        self.inner.actions.pending_len()
    }

    /// Whether the pipeline is currently consuming actions.
    pub fn is_active(&self) -> bool {
        self.inner.actions.is_connected()
    }
}

impl<A, S> StateHolder<A, S> for ScopedStateHolder<A, S>
where
    A: Clone + Send + 'static,
    S: State,
{
    fn state(&self) -> &StateFlow<S> {
        &self.inner.state
    }

    fn accept(&self, action: A) -> Result<(), HolderError> {
        if self.inner.scope.is_cancelled() {
            return Err(HolderError::Stopped);
        }
        self.inner.actions.send(action)
    }
}

impl<A, S> Mutator<A, S> for ScopedStateHolder<A, S>
where
    A: Clone + Send + 'static,
    S: State,
{
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }
}

struct Pipeline<A, S> {
    publisher: StatePublisher<S>,
    state: StateFlow<S>,
    actions: ActionChannel<A>,
    initial: S,
    started: SharingStarted,
}

struct CloseOnDrop<A: Clone + Send + 'static>(ActionChannel<A>);

impl<A: Clone + Send + 'static> Drop for CloseOnDrop<A> {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl<A, S> Pipeline<A, S>
where
    A: Clone + Send + 'static,
    S: State,
{
    async fn run<F, M>(self, transform: F)
    where
        F: Fn(ActionSource<A>) -> M + Send + Sync + 'static,
        M: Stream<Item = Mutation<S>> + Send + 'static,
    {
        let _close = CloseOnDrop(self.actions.clone());
        let mut subscribers = self.state.subscription_counts();
        let mut runs = 0usize;

        loop {
            if self.started.waits_for_subscriber()
                && subscribers.wait_for(|count| *count > 0).await.is_err()
            {
                return;
            }

            if runs > 0 {
                tracing::debug!(run = runs + 1, "restarting upstream from initial state");
                self.publisher.publish(self.initial.clone());
            } else {
                tracing::debug!(started = ?self.started, "starting upstream");
            }
            runs += 1;

            let mutations = transform(ActionSource::new(self.actions.clone())).boxed();
            self.actions.open();
            let mut states = mutations.reduce_into(self.initial.clone());

            let stop = stop_requested(subscribers.clone(), self.started);
            tokio::pin!(stop);

            loop {
                tokio::select! {
                    _ = &mut stop => break,
                    next = states.next() => match next {
                        Some(state) => {
                            self.publisher.publish(state);
                        }
                        None => {
                            tracing::debug!("mutation stream completed");
                            (&mut stop).await;
                            break;
                        }
                    },
                }
            }

            // Dropping the fold drops the transform's action subscriptions.
            drop(states);
            self.actions.halt();
            tracing::debug!("upstream stopped, no subscribers");

            if let Some(expiration) = self.started.replay_expiration() {
                let resubscribed = tokio::time::timeout(
                    expiration,
                    subscribers.wait_for(|count| *count > 0),
                )
                .await
                .map(|result| result.is_ok());
                if resubscribed.is_err() {
                    tracing::debug!("replay expired, resetting to initial state");
                    self.publisher.publish(self.initial.clone());
                }
            }
        }
    }
}

/// Resolve when the policy says the current run should stop.
async fn stop_requested(mut subscribers: watch::Receiver<usize>, started: SharingStarted) {
    let Some(timeout) = started.stop_timeout() else {
        return futures::future::pending().await;
    };

    loop {
        if subscribers.wait_for(|count| *count == 0).await.is_err() {
            return;
        }
        let regained = tokio::time::timeout(timeout, subscribers.wait_for(|count| *count > 0))
            .await
            .map(|result| result.is_ok());
        match regained {
            Ok(true) => continue,
            Ok(false) | Err(_) => return,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
