//! Fire-and-forget cache writes with an explicit settle point.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Notify;

#[derive(Default)]
struct Tracker {
    in_flight: AtomicUsize,
    closed: AtomicBool,
    idle: Notify,
}

/// Decrements the in-flight count when a write finishes, panics or is cancelled.
struct InFlight(Arc<Tracker>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Tracks spawned cache writes so callers can await them.
///
/// Writes keep running when the request that triggered them is dropped.
/// Any number of callers may settle concurrently; each returns only once no
/// write is in flight.
#[derive(Clone, Default)]
pub struct BackgroundWrites {
    tracker: Arc<Tracker>,
}

impl BackgroundWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` in the background. Returns false, dropping the task, once closed.
    pub fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(self.tracker.clone());
        if self.tracker.closed.load(Ordering::SeqCst) {
            return false;
        }

        tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });
        true
    }

    /// Refuse further writes. Writes already spawned still run.
    pub fn close(&self) {
        self.tracker.closed.store(true, Ordering::SeqCst);
    }

    /// Accept writes again after a [`close`](Self::close).
    pub fn reopen(&self) {
        self.tracker.closed.store(false, Ordering::SeqCst);
    }

    /// Wait until every write spawned so far has finished.
    pub async fn settle(&self) {
        loop {
            let idle = self.tracker.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();
            if self.tracker.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }
}
