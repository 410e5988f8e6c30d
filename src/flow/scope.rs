//! Cancellable concurrency scopes.
//!
//! A [`Scope`] owns the lifetime of the tasks spawned through it. Cancelling
//! a scope stops every task it spawned and every task of its child scopes.
//! Cancellation is cooperative: a task observes it at its next await point.

use futures::future::select_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct ScopeInner {
    cancelled: watch::Sender<bool>,
    parent: Option<Scope>,
}

/// Handle to a cancellable scope. Clones share the same scope.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    /// Create a root scope.
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<Scope>) -> Self {
        let (cancelled, _) = watch::channel(false);
        Self {
            inner: Arc::new(ScopeInner { cancelled, parent }),
        }
    }

    /// Create a scope that is cancelled when `self` is, but can also be
    /// cancelled on its own without affecting `self`.
    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    /// Cancel this scope and, transitively, all of its children.
    pub fn cancel(&self) {
        if !self.inner.cancelled.send_replace(true) {
            tracing::debug!("scope cancelled");
        }
    }

    /// Whether this scope or any of its ancestors has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.lineage().any(|scope| *scope.inner.cancelled.borrow())
    }

    /// Resolve once this scope or any ancestor is cancelled.
    pub async fn cancelled(&self) {
        let waits: Vec<_> = self
            .lineage()
            .map(|scope| {
                let mut cancelled = scope.inner.cancelled.subscribe();
                Box::pin(async move {
                    // An error means the sender is gone, which only happens
                    // once nothing can cancel the scope any more.
                    let _ = cancelled.wait_for(|cancelled| *cancelled).await;
                })
            })
            .collect();
        select_all(waits).await;
    }

    /// Spawn `future` on the current tokio runtime, bound to this scope.
    ///
    /// The future is dropped at its next await point once the scope is
    /// cancelled. Panics inside the future surface through the returned
    /// handle.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let scope = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = scope.cancelled() => {}
                _ = future => {}
            }
        })
    }

    fn lineage(&self) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self), |scope| scope.inner.parent.as_ref())
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
