//! Task group with a shared cancellation token and first-error aggregation.
//!
//! # Lifecycle
//! ```text
//! Running  → every spawned task is live
//! Draining → some task finished; the token is cancelled, the rest unwind
//! Done     → wait() has joined every task and returns the first error
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::observability::metrics;

/// Set-if-empty slot holding the first error reported by any task.
#[derive(Debug, Clone, Default)]
struct FirstError(Arc<Mutex<Option<Error>>>);

impl FirstError {
    /// Store `err` unless an earlier error already won. Returns whether it was stored.
    fn offer(&self, err: Error) -> bool {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(err);
        true
    }

    fn take(&self) -> Option<Error> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// Runs tasks concurrently under one cancellation token.
///
/// The token is cancelled as soon as any task finishes, successfully or not,
/// and again when the group is waited on or dropped. [`TaskGroup::wait`] does
/// not return until every task has finished.
pub struct TaskGroup {
    cancel: CancellationToken,
    tasks: JoinSet<()>,
    names: HashMap<Id, String>,
    first_error: FirstError,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::from_token(CancellationToken::new())
    }

    /// A group that is also cancelled when `parent` is.
    ///
    /// Cancellation flows one way: the group finishing never cancels `parent`.
    pub fn with_parent(parent: &CancellationToken) -> Self {
        Self::from_token(parent.child_token())
    }

    fn from_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            tasks: JoinSet::new(),
            names: HashMap::new(),
            first_error: FirstError::default(),
        }
    }

    /// The group's shared cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start `task` with a clone of the group token.
    pub fn spawn<F, Fut>(&mut self, name: impl Into<String>, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let cancel = self.cancel.clone();
        let first_error = self.first_error.clone();
        let fut = task(self.cancel.clone());

        tracing::debug!(task = %name, "Task starting");
        let task_name = name.clone();
        let handle = self.tasks.spawn(async move {
            let result = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(Error::TaskPanicked {
                    task: name.clone(),
                    reason: panic_message(payload.as_ref()),
                }),
            };

            match result {
                Ok(()) => {
                    tracing::debug!(task = %name, "Task finished");
                    metrics::record_task_finished(true);
                }
                Err(err) => {
                    tracing::debug!(task = %name, error = %err, "Task returned error");
                    metrics::record_task_finished(false);
                    if !first_error.offer(err) {
                        tracing::trace!(task = %name, "Earlier error already recorded");
                    }
                }
            }
            cancel.cancel();
        });
        self.names.insert(handle.id(), task_name);
    }

    /// Wait for every task, then return the first error any of them reported.
    pub async fn wait(mut self) -> Result<()> {
        while let Some(joined) = self.tasks.join_next_with_id().await {
            match joined {
                Ok((id, ())) => {
                    self.names.remove(&id);
                }
                Err(err) => {
                    // Panics are caught inside the task, so this is an abort.
                    let task = self
                        .names
                        .remove(&err.id())
                        .unwrap_or_else(|| "unknown".to_string());
                    tracing::error!(task = %task, error = %err, "Task aborted");
                    self.first_error.offer(Error::TaskPanicked {
                        task,
                        reason: err.to_string(),
                    });
                    self.cancel.cancel();
                }
            }
        }
        self.cancel.cancel();

        match self.first_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}
