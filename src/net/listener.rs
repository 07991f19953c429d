//! Listener abstraction and the HTTP listener implementation.
//!
//! # Responsibilities
//! - Bind to the configured address, failing fast on bind errors
//! - Serve requests through the listener's handler
//! - Stop accepting on request and drain accepted connections
//! - Abandon connections that are still open once the caller gives up
//! - Track in-flight requests and enforce the per-listener limit

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::OnceLock;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::ListenerConfig;
use crate::error::{Error, Result};
use crate::http::request::request_id_layers;
use crate::net::connection::InFlightTracker;

/// A long-running service that can be asked to stop.
///
/// `serve` and `shutdown` are called from different tasks on the same shared
/// listener, so both take `&self`.
pub trait Listener: Send + Sync + 'static {
    /// Address the listener was configured with.
    fn address(&self) -> &str;

    /// Run until stopped. Returns `Ok(())` once a requested stop has drained.
    fn serve(&self) -> impl Future<Output = Result<()>> + Send;

    /// Request a stop and wait for accepted work to finish.
    ///
    /// Callers bound this with their own deadline.
    fn shutdown(&self) -> impl Future<Output = Result<()>> + Send;

    /// Stop waiting for accepted work. `serve` returns promptly afterwards,
    /// leaving any remaining connections to finish on their own.
    fn abort(&self);
}

/// What a listener serves and where.
#[derive(Debug, Clone)]
pub struct ListenerSpec {
    /// Listener identifier for logging/metrics.
    pub name: String,
    /// Bind address (e.g., "127.0.0.1:8080").
    pub address: String,
    /// Request handler.
    pub handler: Router,
    /// Maximum concurrently served requests.
    pub max_connections: usize,
}

impl ListenerSpec {
    pub fn new(name: impl Into<String>, address: impl Into<String>, handler: Router) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            handler,
            max_connections: 10_000,
        }
    }

    pub fn from_config(config: &ListenerConfig, handler: Router) -> Self {
        Self {
            name: config.name.clone(),
            address: config.bind_address.clone(),
            handler,
            max_connections: config.max_connections,
        }
    }
}

/// Listener lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Not yet bound.
    Idle,
    /// Bound and accepting connections.
    Serving,
    /// No longer accepting; finishing accepted connections.
    Draining,
    /// Serve loop has returned, drained or abandoned.
    Stopped,
}

/// An axum server that drains gracefully when asked to stop.
pub struct HttpListener {
    spec: ListenerSpec,
    stop: CancellationToken,
    abandon: CancellationToken,
    state: watch::Sender<ListenerState>,
    local_addr: OnceLock<SocketAddr>,
    in_flight: InFlightTracker,
}

impl HttpListener {
    pub fn new(spec: ListenerSpec) -> Self {
        let (state, _) = watch::channel(ListenerState::Idle);
        let in_flight = InFlightTracker::new(spec.name.as_str(), spec.max_connections);
        Self {
            spec,
            stop: CancellationToken::new(),
            abandon: CancellationToken::new(),
            state,
            local_addr: OnceLock::new(),
            in_flight,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// The bound address, once the listener has bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Wait until the listener has bound or given up. Returns the bound address, if any.
    pub async fn wait_bound(&self) -> Option<SocketAddr> {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state != ListenerState::Idle).await;
        self.local_addr()
    }

    pub fn in_flight(&self) -> &InFlightTracker {
        &self.in_flight
    }

    async fn bind(&self) -> Result<TcpListener> {
        let bind_error = |source| Error::Bind {
            address: self.spec.address.clone(),
            source,
        };

        let addr: SocketAddr = self.spec.address.parse().map_err(|e| {
            bind_error(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;

        let listener = TcpListener::bind(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(listener = %self.spec.name, address = %addr, "Address already in use");
            }
            bind_error(e)
        })?;

        let local_addr = listener.local_addr().map_err(bind_error)?;
        let _ = self.local_addr.set(local_addr);

        tracing::info!(
            listener = %self.spec.name,
            address = %local_addr,
            max_connections = self.spec.max_connections,
            "Listener bound"
        );
        Ok(listener)
    }

    fn router(&self) -> Router {
        self.spec
            .handler
            .clone()
            .layer(middleware::from_fn_with_state(
                self.in_flight.clone(),
                track_in_flight,
            ))
            .layer(request_id_layers())
    }
}

impl Listener for HttpListener {
    fn address(&self) -> &str {
        &self.spec.address
    }

    async fn serve(&self) -> Result<()> {
        if self.stop.is_cancelled() {
            tracing::debug!(listener = %self.spec.name, "Stop requested before serving");
            self.state.send_replace(ListenerState::Stopped);
            return Ok(());
        }

        tracing::info!(listener = %self.spec.name, address = %self.spec.address, "Listener starting");
        let listener = match self.bind().await {
            Ok(listener) => listener,
            Err(err) => {
                self.state.send_replace(ListenerState::Stopped);
                return Err(err);
            }
        };
        self.state.send_replace(ListenerState::Serving);

        let server = axum::serve(listener, self.router())
            .with_graceful_shutdown(self.stop.clone().cancelled_owned())
            .into_future();
        let result = tokio::select! {
            result = server => result,
            _ = self.abandon.cancelled() => {
                tracing::warn!(
                    listener = %self.spec.name,
                    in_flight = self.in_flight.active_count(),
                    "Abandoning open connections"
                );
                Ok(())
            }
        };

        self.state.send_replace(ListenerState::Stopped);
        tracing::info!(listener = %self.spec.name, "Listener stopped");

        result.map_err(|source| Error::Serve {
            address: self.spec.address.clone(),
            source,
        })
    }

    async fn shutdown(&self) -> Result<()> {
        self.stop.cancel();
        self.state.send_if_modified(|state| {
            if *state == ListenerState::Serving {
                *state = ListenerState::Draining;
                true
            } else {
                false
            }
        });

        tracing::debug!(
            listener = %self.spec.name,
            in_flight = self.in_flight.active_count(),
            "Draining in-flight requests"
        );

        let mut rx = self.state.subscribe();
        // The sender is owned by `self`, so the channel stays open.
        let _ = rx.wait_for(|state| *state == ListenerState::Stopped).await;
        Ok(())
    }

    fn abort(&self) {
        self.stop.cancel();
        self.abandon.cancel();
    }
}

async fn track_in_flight(
    State(tracker): State<InFlightTracker>,
    request: Request,
    next: Next,
) -> Response {
    let _guard = tracker.track().await;
    next.run(request).await
}
