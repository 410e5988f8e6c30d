//! Stream operators used to assemble mutation sources.

use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Merge several streams into one.
///
/// Items from one source keep their order. When several sources are ready
/// at once, they are drained round-robin, starting with the source after
/// the one that yielded last, so no producer can starve another. The merged
/// stream ends when every source has ended.
pub fn merge<T>(sources: Vec<BoxStream<'static, T>>) -> Merge<T> {
    Merge {
        sources: sources.into_iter().map(Some).collect(),
        cursor: 0,
    }
}

/// Stream returned by [`merge`].
pub struct Merge<T> {
    sources: Vec<Option<BoxStream<'static, T>>>,
    cursor: usize,
}

impl<T> Stream for Merge<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = self.get_mut();
        let len = this.sources.len();

        for offset in 0..len {
            let index = (this.cursor + offset) % len;
            let Some(source) = this.sources[index].as_mut() else {
                continue;
            };
            match source.poll_next_unpin(cx) {
                Poll::Ready(Some(item)) => {
                    this.cursor = (index + 1) % len;
                    return Poll::Ready(Some(item));
                }
                Poll::Ready(None) => this.sources[index] = None,
                Poll::Pending => {}
            }
        }

        if this.sources.iter().all(Option::is_none) {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}

/// Extension operators for streams.
pub trait FlowExt: Stream + Sized {
    /// Map every item to an inner stream, keeping only the latest one.
    ///
    /// A new outer item cancels the running inner stream before it can
    /// yield again: the outer stream is always polled first, so an inner
    /// item that becomes ready at the same instant as a new outer item is
    /// discarded along with its stream. Ends when the outer stream and the
    /// last inner stream have both ended.
    fn flat_map_latest<U, F>(self, f: F) -> FlatMapLatest<Self, U, F>
    where
        F: FnMut(Self::Item) -> BoxStream<'static, U>,
    {
        FlatMapLatest {
            outer: Some(self),
            inner: None,
            f,
        }
    }
}

impl<St: Stream + Sized> FlowExt for St {}

/// Stream returned by [`FlowExt::flat_map_latest`].
pub struct FlatMapLatest<St, U, F> {
    outer: Option<St>,
    inner: Option<BoxStream<'static, U>>,
    f: F,
}

impl<St, U, F> Stream for FlatMapLatest<St, U, F>
where
    St: Stream + Unpin,
    F: FnMut(St::Item) -> BoxStream<'static, U> + Unpin,
{
    type Item = U;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<U>> {
        let this = self.get_mut();

        while let Some(outer) = this.outer.as_mut() {
            match outer.poll_next_unpin(cx) {
                Poll::Ready(Some(key)) => {
                    if this.inner.is_some() {
                        tracing::trace!("switching to latest inner stream");
                    }
                    this.inner = Some((this.f)(key));
                }
                Poll::Ready(None) => this.outer = None,
                Poll::Pending => break,
            }
        }

        if let Some(inner) = this.inner.as_mut() {
            match inner.poll_next_unpin(cx) {
                Poll::Ready(Some(item)) => return Poll::Ready(Some(item)),
                Poll::Ready(None) => this.inner = None,
                Poll::Pending => return Poll::Pending,
            }
        }

        if this.outer.is_none() && this.inner.is_none() {
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}

/// Tick counter: yields 1 immediately, then 2, 3, ... each `period` apart.
///
/// Never ends on its own; drop it to stop.
pub fn interval(period: Duration) -> BoxStream<'static, u64> {
    stream::unfold(0u64, move |count| async move {
        if count > 0 {
            tokio::time::sleep(period).await;
        }
        Some((count + 1, count + 1))
    })
    .boxed()
}
