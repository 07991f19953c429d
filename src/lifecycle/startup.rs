//! Startup orchestration.
//!
//! # Responsibilities
//! - Build listeners from configuration
//! - Pair each listener with a serve task and a shutdown coordinator
//! - Add the signal watcher and wait for the whole group
//! - Let a second signal force every coordinator to give up draining
//!
//! # Design Decisions
//! - Signal handlers are registered by the caller before anything is spawned
//! - Any task finishing cancels the group, so a bind failure stops everyone

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::GroupConfig;
use crate::error::Result;
use crate::http::SlowHandler;
use crate::lifecycle::group::TaskGroup;
use crate::lifecycle::shutdown::ShutdownCoordinator;
use crate::lifecycle::signals::SignalWatcher;
use crate::net::{HttpListener, Listener, ListenerSpec};

/// Build one HTTP listener per configured service, all serving the slow handler.
pub fn build_listeners(config: &GroupConfig) -> Vec<Arc<HttpListener>> {
    let handler = SlowHandler::from_config(&config.handler).into_router();
    config
        .listeners
        .iter()
        .map(|listener| {
            Arc::new(HttpListener::new(ListenerSpec::from_config(
                listener,
                handler.clone(),
            )))
        })
        .collect()
}

/// Spawn the serve task and shutdown coordinator for `listener`.
///
/// Cancelling `force` aborts the listener even if its grace period has not elapsed.
pub fn serve_listener<L: Listener>(
    group: &mut TaskGroup,
    listener: Arc<L>,
    grace_period: Duration,
    force: &CancellationToken,
) {
    let address = listener.address().to_string();

    let coordinator = ShutdownCoordinator::new(Arc::clone(&listener), grace_period)
        .with_force(force.clone());
    group.spawn(format!("shutdown {address}"), |cancel| coordinator.run(cancel));

    group.spawn(format!("serve {address}"), move |_| async move {
        listener.serve().await
    });
}

/// Run `listeners` and `watcher` in `group` until every task has finished.
pub async fn run_listeners<L: Listener>(
    mut group: TaskGroup,
    listeners: &[Arc<L>],
    grace_period: Duration,
    watcher: SignalWatcher,
) -> Result<()> {
    let force = CancellationToken::new();
    // Releases the watcher's second-signal listener once the group is done.
    let _force_guard = force.clone().drop_guard();

    for listener in listeners {
        serve_listener(&mut group, Arc::clone(listener), grace_period, &force);
    }
    let watcher = watcher.with_force(force);
    group.spawn("signal watcher", |cancel| watcher.watch(cancel));

    tracing::info!(
        listeners = listeners.len(),
        grace_period = ?grace_period,
        "All listeners started"
    );
    let result = group.wait().await;
    tracing::info!("All tasks finished");
    result
}

/// Run every configured listener until a signal or failure stops them.
pub async fn run(config: &GroupConfig, watcher: SignalWatcher) -> Result<()> {
    let listeners = build_listeners(config);
    run_listeners(
        TaskGroup::new(),
        &listeners,
        config.shutdown.grace_period(),
        watcher,
    )
    .await
}
