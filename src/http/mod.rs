//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection (net::listener)
//!     → request.rs (request ID, trace span)
//!     → net::connection (in-flight tracking)
//!     → handler.rs (placeholder work, fixed response)
//! ```

pub mod handler;
pub mod request;

pub use handler::SlowHandler;
pub use request::{request_id_layers, UuidRequestId, X_REQUEST_ID};
