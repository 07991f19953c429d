//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept via axum, graceful drain)
//!     → connection.rs (in-flight tracking, concurrency limit)
//!     → Hand off to the listener's handler
//!
//! Listener States:
//!     Idle → Serving → Draining → Stopped
//!     Idle → Stopped (bind failure or stop before serve)
//! ```
//!
//! # Design Decisions
//! - Bind failures are fatal to the listener and never retried
//! - Each request tracked so shutdown can report what it is draining
//! - Listeners share nothing; each owns its socket

pub mod connection;
pub mod listener;

pub use listener::{HttpListener, Listener, ListenerSpec, ListenerState};
