//! In-flight request tracking and backpressure.
//!
//! # Responsibilities
//! - Count requests currently being served by a listener
//! - Enforce the listener's concurrency limit via semaphore
//! - Let callers wait on the count without polling

use std::sync::Arc;

use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;

/// Tracks requests in flight on one listener.
///
/// The count lives in a watch channel so waiters are woken on every change.
#[derive(Debug, Clone)]
pub struct InFlightTracker {
    /// Listener label for logs and metrics.
    listener: Arc<str>,
    /// Current count of in-flight requests.
    count: Arc<watch::Sender<u64>>,
    /// Semaphore to limit concurrent requests.
    limit: Arc<Semaphore>,
}

impl InFlightTracker {
    pub fn new(listener: impl Into<Arc<str>>, max_in_flight: usize) -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            listener: listener.into(),
            count: Arc::new(tx),
            limit: Arc::new(Semaphore::new(max_in_flight)),
        }
    }

    /// Record a new request, waiting for a free slot if the limit is reached.
    ///
    /// The request is counted while it waits. Returns a guard that releases the
    /// slot and the count on drop.
    pub async fn track(&self) -> RequestGuard {
        self.count.send_modify(|n| *n += 1);
        metrics::set_in_flight(&self.listener, self.active_count());
        let counted = Counted {
            tracker: self.clone(),
        };

        let permit = Arc::clone(&self.limit)
            .acquire_owned()
            .await
            .expect("Semaphore closed unexpectedly");

        RequestGuard {
            _permit: permit,
            _counted: counted,
        }
    }

    /// Get current in-flight request count, including requests waiting for a slot.
    pub fn active_count(&self) -> u64 {
        *self.count.borrow()
    }

    /// Resolve once at least `count` requests are in flight.
    pub async fn wait_for_active(&self, count: u64) {
        let mut rx = self.count.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|n| *n >= count).await;
    }
}

/// Decrements the in-flight count when dropped.
#[derive(Debug)]
struct Counted {
    tracker: InFlightTracker,
}

impl Drop for Counted {
    fn drop(&mut self) {
        self.tracker.count.send_modify(|n| *n = n.saturating_sub(1));
        let active = self.tracker.active_count();
        metrics::set_in_flight(&self.tracker.listener, active);
        tracing::trace!(listener = %self.tracker.listener, in_flight = active, "Request finished");
    }
}

/// Guard that tracks a request's lifetime.
/// Releases its slot, then its count, when dropped.
#[derive(Debug)]
pub struct RequestGuard {
    _permit: OwnedSemaphorePermit,
    _counted: Counted,
}
