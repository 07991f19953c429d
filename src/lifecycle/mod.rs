//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Register signals → Build listeners → Spawn serve + coordinator per listener
//!
//! Group (group.rs):
//!     Any task finishes → Cancel shared token → Join all → First error
//!
//! Shutdown (shutdown.rs):
//!     Token cancelled → Stop accepting → Drain within grace period
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Task returns "got signal" → Group cancels
//! ```
//!
//! # Design Decisions
//! - One cancellation token per group, tripped at most once
//! - Coordinators run in parallel: shutdown takes one grace period, not N
//! - Shutdown has timeout: reported as an error, the listener keeps unwinding

pub mod group;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use group::TaskGroup;
pub use shutdown::{ShutdownCoordinator, GRACE_PERIOD};
pub use signals::{ShutdownSignal, SignalTrigger, SignalWatcher};
