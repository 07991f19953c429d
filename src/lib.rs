//! Graceful lifecycle for a group of network listeners.
//!
//! Every listener runs under one shared cancellation token. An OS signal, or
//! any task finishing, cancels the token; each listener then gets a bounded
//! grace period to drain, and the group reports the first error once every
//! task has finished.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::GroupConfig;
pub use error::{Error, Result};
pub use lifecycle::{ShutdownCoordinator, SignalWatcher, TaskGroup};
pub use net::{HttpListener, Listener, ListenerSpec};
