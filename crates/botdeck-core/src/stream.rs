// ── Snapshot subscription ──
//
// Watch-backed handle the view layer uses to follow the reconciled state.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::DashboardSnapshot;

/// A subscription to dashboard snapshots.
///
/// Provides point-in-time access and change notification via
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct SnapshotStream {
    current: Arc<DashboardSnapshot>,
    receiver: watch::Receiver<Arc<DashboardSnapshot>>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<DashboardSnapshot>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<DashboardSnapshot> {
        &self.current
    }

    /// The latest published snapshot.
    pub fn latest(&self) -> Arc<DashboardSnapshot> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next publish. `None` once the dashboard is dropped.
    pub async fn changed(&mut self) -> Option<Arc<DashboardSnapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding each published snapshot.
pub struct SnapshotWatchStream {
    inner: WatchStream<Arc<DashboardSnapshot>>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<DashboardSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
