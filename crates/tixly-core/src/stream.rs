// ── Reactive page streams ──
//
// `Stream` adapter over a cache handle's watch channel, for render
// loops built on `StreamExt` combinators.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::page::CachedPage;

/// `Stream` of page revisions backed by a `watch::Receiver`.
///
/// Yields the current page immediately, then one item per revision.
/// Ends when the owning handle closes.
pub struct PageStream<T: Send + Sync + 'static> {
    inner: WatchStream<CachedPage<T>>,
}

impl<T: Send + Sync + 'static> PageStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<CachedPage<T>>) -> Self {
        Self {
            inner: WatchStream::new(receiver),
        }
    }
}

impl<T: Send + Sync + 'static> Stream for PageStream<T> {
    type Item = CachedPage<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // WatchStream is Unpin, so projecting through Pin is safe.
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
