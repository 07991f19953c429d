//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT) before any task starts
//! - Translate the first signal into a task result that trips group cancellation
//! - Stay silent when cancellation arrives through another path
//! - Optionally turn a second signal into a forced shutdown
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Registration is explicit and owned by the watcher, dropped when its task ends
//! - A manual source lets embedders and tests inject signals

use std::fmt;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// The OS signal that asked the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "interrupt"),
            ShutdownSignal::Terminate => write!(f, "terminate"),
        }
    }
}

enum Source {
    #[cfg(unix)]
    Os {
        interrupt: tokio::signal::unix::Signal,
        terminate: tokio::signal::unix::Signal,
    },
    #[cfg(not(unix))]
    Os { ctrl_c: tokio::signal::windows::CtrlC },
    Manual(mpsc::Receiver<ShutdownSignal>),
}

/// Races the first shutdown signal against group cancellation.
pub struct SignalWatcher {
    source: Source,
    force: Option<CancellationToken>,
}

impl SignalWatcher {
    /// Register interest in interrupt and terminate signals.
    ///
    /// Must be called from within a Tokio runtime, before the tasks that the
    /// signal should stop are spawned, so no early signal is missed.
    pub fn register() -> std::io::Result<Self> {
        #[cfg(unix)]
        let source = {
            use tokio::signal::unix::{signal, SignalKind};
            Source::Os {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            }
        };

        #[cfg(not(unix))]
        let source = Source::Os {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        };

        tracing::debug!("Signal handlers registered");
        Ok(Self {
            source,
            force: None,
        })
    }

    /// A watcher fed by a [`SignalTrigger`] instead of the OS.
    pub fn manual() -> (Self, SignalTrigger) {
        let (tx, rx) = mpsc::channel(1);
        (
            Self {
                source: Source::Manual(rx),
                force: None,
            },
            SignalTrigger { tx },
        )
    }

    /// Cancel `force` when a second signal arrives after the first.
    ///
    /// The watcher keeps listening in a background task until the second
    /// signal or until `force` is cancelled by its owner.
    pub fn with_force(mut self, force: CancellationToken) -> Self {
        self.force = Some(force);
        self
    }

    async fn recv(&mut self) -> Option<ShutdownSignal> {
        match &mut self.source {
            #[cfg(unix)]
            Source::Os {
                interrupt,
                terminate,
            } => {
                tokio::select! {
                    Some(()) = interrupt.recv() => Some(ShutdownSignal::Interrupt),
                    Some(()) = terminate.recv() => Some(ShutdownSignal::Terminate),
                    else => None,
                }
            }
            #[cfg(not(unix))]
            Source::Os { ctrl_c } => ctrl_c.recv().await.map(|()| ShutdownSignal::Interrupt),
            Source::Manual(rx) => rx.recv().await,
        }
    }

    /// Wait for either a signal or cancellation.
    ///
    /// Returns [`Error::SignalReceived`] if a signal came first, and `Ok(())` if
    /// the group was cancelled by someone else.
    pub async fn watch(mut self, cancel: CancellationToken) -> Result<()> {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Signal watcher exiting, group already cancelled");
                return Ok(());
            }
            received = self.recv() => received,
        };

        let Some(signal) = received else {
            // Source closed without a signal; nothing left to race.
            cancel.cancelled().await;
            return Ok(());
        };

        tracing::info!(signal = %signal, "Shutdown signal received");
        if let Some(force) = self.force.take() {
            tokio::spawn(self.escalate(force));
        }
        Err(Error::SignalReceived(signal))
    }

    async fn escalate(mut self, force: CancellationToken) {
        tokio::select! {
            _ = force.cancelled() => {}
            received = self.recv() => {
                if let Some(signal) = received {
                    tracing::warn!(signal = %signal, "Second signal received, forcing shutdown");
                    force.cancel();
                }
            }
        }
    }
}

/// Injects a shutdown signal into a manual [`SignalWatcher`].
#[derive(Debug, Clone)]
pub struct SignalTrigger {
    tx: mpsc::Sender<ShutdownSignal>,
}

impl SignalTrigger {
    /// Deliver `signal`. Returns false if one is already pending or the watcher is gone.
    pub fn send(&self, signal: ShutdownSignal) -> bool {
        self.tx.try_send(signal).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn signal_first_reports_which_signal() {
        let (watcher, trigger) = SignalWatcher::manual();
        let cancel = CancellationToken::new();

        assert!(trigger.send(ShutdownSignal::Terminate));
        let result = watcher.watch(cancel).await;

        assert!(matches!(
            result,
            Err(Error::SignalReceived(ShutdownSignal::Terminate))
        ));
    }

    #[tokio::test]
    async fn cancellation_first_is_silent() {
        let (watcher, _trigger) = SignalWatcher::manual();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(watcher.watch(cancel.clone()));
        cancel.cancel();

        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn cancellation_wins_when_both_ready() {
        let (watcher, trigger) = SignalWatcher::manual();
        let cancel = CancellationToken::new();

        trigger.send(ShutdownSignal::Interrupt);
        cancel.cancel();

        assert!(watcher.watch(cancel).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_trigger_waits_for_cancellation() {
        let (watcher, trigger) = SignalWatcher::manual();
        drop(trigger);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(watcher.watch(cancel.clone()));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!handle.is_finished());

        cancel.cancel();
        assert!(handle.await.unwrap().is_ok());
    }

    #[test]
    fn second_pending_signal_is_dropped() {
        let (_watcher, trigger) = SignalWatcher::manual();
        assert!(trigger.send(ShutdownSignal::Interrupt));
        assert!(!trigger.send(ShutdownSignal::Terminate));
    }

    #[tokio::test]
    async fn second_signal_cancels_force() {
        let force = CancellationToken::new();
        let (watcher, trigger) = SignalWatcher::manual();
        let watcher = watcher.with_force(force.clone());

        assert!(trigger.send(ShutdownSignal::Terminate));
        let result = watcher.watch(CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(Error::SignalReceived(ShutdownSignal::Terminate))
        ));
        assert!(!force.is_cancelled());

        assert!(trigger.send(ShutdownSignal::Interrupt));
        tokio::time::timeout(Duration::from_secs(1), force.cancelled())
            .await
            .expect("second signal should force shutdown");
    }

    #[tokio::test]
    async fn cancelled_force_releases_the_watcher() {
        let force = CancellationToken::new();
        let (watcher, trigger) = SignalWatcher::manual();

        assert!(trigger.send(ShutdownSignal::Terminate));
        assert!(watcher
            .with_force(force.clone())
            .watch(CancellationToken::new())
            .await
            .is_err());

        force.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        // The source was dropped with the background listener.
        assert!(!trigger.send(ShutdownSignal::Interrupt));
    }
}
