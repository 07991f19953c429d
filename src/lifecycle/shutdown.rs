//! Shutdown coordination for a single listener.
//!
//! Each listener gets its own coordinator, so N listeners drain in parallel and
//! total shutdown latency is bounded by one grace period. A listener that has
//! not drained by the deadline, or when shutdown is forced, is aborted so the
//! group never waits past that bound.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::net::Listener;
use crate::observability::metrics;

/// Default time a listener is given to finish in-flight work.
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Stops one listener once the group token is cancelled.
pub struct ShutdownCoordinator<L> {
    listener: Arc<L>,
    grace_period: Duration,
    force: CancellationToken,
}

enum Outcome {
    Drained(Result<()>),
    TimedOut,
    Forced,
}

impl<L: Listener> ShutdownCoordinator<L> {
    pub fn new(listener: Arc<L>, grace_period: Duration) -> Self {
        Self {
            listener,
            grace_period,
            force: CancellationToken::new(),
        }
    }

    /// Abort the listener without waiting out the grace period once `force` is cancelled.
    pub fn with_force(mut self, force: CancellationToken) -> Self {
        self.force = force;
        self
    }

    /// Wait for cancellation, then stop the listener within the grace period.
    ///
    /// A stop that misses the deadline aborts the listener and yields
    /// [`Error::ShutdownTimeout`]; a forced stop yields [`Error::ShutdownForced`].
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        cancel.cancelled().await;

        let address = self.listener.address().to_string();
        tracing::info!(address = %address, "Done received, stopping listener");

        let deadline = Instant::now() + self.grace_period;
        let outcome = tokio::select! {
            biased;
            result = time::timeout_at(deadline, self.listener.shutdown()) => match result {
                Ok(result) => Outcome::Drained(result),
                Err(_) => Outcome::TimedOut,
            },
            _ = self.force.cancelled() => Outcome::Forced,
        };

        match outcome {
            Outcome::Drained(Ok(())) => {
                tracing::info!(address = %address, "Shutdown success");
                metrics::record_shutdown(&address, "ok");
                Ok(())
            }
            Outcome::Drained(Err(err)) => {
                tracing::warn!(address = %address, error = %err, "Shutdown failed");
                metrics::record_shutdown(&address, "error");
                Err(err)
            }
            Outcome::TimedOut => {
                tracing::warn!(
                    address = %address,
                    grace_period = ?self.grace_period,
                    "Shutdown deadline elapsed with work outstanding"
                );
                self.listener.abort();
                metrics::record_shutdown(&address, "timeout");
                Err(Error::ShutdownTimeout {
                    address,
                    grace_period: self.grace_period,
                })
            }
            Outcome::Forced => {
                tracing::warn!(address = %address, "Shutdown forced, abandoning in-flight work");
                self.listener.abort();
                metrics::record_shutdown(&address, "forced");
                Err(Error::ShutdownForced { address })
            }
        }
    }
}
