//! Error types shared by every task in the group.

use std::time::Duration;

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::lifecycle::signals::ShutdownSignal;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a single task and, for the first one, by the group.
#[derive(Debug, Error)]
pub enum Error {
    /// The listener could not bind its address. Never retried.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The listener was bound but serving failed.
    #[error("listener {address} failed while serving: {source}")]
    Serve {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Graceful stop did not finish before the grace period elapsed.
    #[error("shutdown of {address} did not complete within {grace_period:?}")]
    ShutdownTimeout {
        address: String,
        grace_period: Duration,
    },

    /// A repeated signal cut the grace period short.
    #[error("shutdown of {address} was forced before in-flight work finished")]
    ShutdownForced { address: String },

    /// An OS signal asked the process to stop.
    #[error("got signal: {0}")]
    SignalReceived(ShutdownSignal),

    /// A task panicked or was aborted before producing a result.
    #[error("task {task} did not complete: {reason}")]
    TaskPanicked { task: String, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether this error is the intentional shutdown trigger rather than a failure.
    pub fn is_intentional(&self) -> bool {
        matches!(self, Error::SignalReceived(_))
    }
}

/// Process exit status for the outcome of a run.
///
/// A clean stop and a signal-triggered stop exit 0. Every other error exits 1.
pub fn exit_status(result: &Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) if e.is_intentional() => 0,
        Err(_) => 1,
    }
}
