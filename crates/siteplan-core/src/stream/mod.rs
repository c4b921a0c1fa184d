// ── Reactive site streams ──
//
// Subscription type for consuming catalog changes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Site;

type Snapshot = Arc<Vec<Arc<Site>>>;

/// A subscription to the site catalog.
///
/// Offers the snapshot captured at subscription time, the latest one,
/// and change notification via [`changed`](Self::changed) or as a `Stream`.
pub struct SiteStream {
    current: Snapshot,
    receiver: watch::Receiver<Snapshot>,
}

impl SiteStream {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    /// The latest snapshot.
    pub fn latest(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the catalog has been dropped.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> SiteWatchStream {
        SiteWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding a catalog snapshot per change.
///
/// The first item is the snapshot current at conversion time.
pub struct SiteWatchStream {
    inner: WatchStream<Snapshot>,
}

impl Stream for SiteWatchStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bytes::Bytes;
    use futures_util::StreamExt;

    use crate::job::JobId;
    use crate::model::{DecodedRaster, SimulationParameters};
    use crate::store::SiteCatalog;

    #[tokio::test]
    async fn stream_yields_current_then_updates() {
        let mut catalog = SiteCatalog::new();
        let mut stream = catalog.subscribe().into_stream();

        let first = stream.next().await.unwrap();
        assert!(first.is_empty());

        catalog.add_site(
            &SimulationParameters::default(),
            JobId::from("t-1"),
            DecodedRaster::new("image/tiff", Bytes::from_static(b"II*\0")),
        );
        let second = stream.next().await.unwrap();
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn changed_is_pending_until_catalog_mutates() {
        let mut catalog = SiteCatalog::new();
        let mut sub = catalog.subscribe();
        let mut changed = tokio_test::task::spawn(sub.changed());
        tokio_test::assert_pending!(changed.poll());

        catalog.add_site(
            &SimulationParameters::default(),
            JobId::from("t-1"),
            DecodedRaster::new("image/tiff", Bytes::from_static(b"II*\0")),
        );
        assert!(changed.is_woken());
        let snap = tokio_test::assert_ready!(changed.poll()).unwrap();
        assert_eq!(snap.len(), 1);
    }

    #[tokio::test]
    async fn changed_returns_none_after_catalog_drop() {
        let catalog = SiteCatalog::new();
        let mut sub = catalog.subscribe();
        drop(catalog);
        assert!(sub.changed().await.is_none());
        assert!(sub.latest().is_empty());
    }
}
