//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GroupConfig (validated, immutable)
//!     → overrides.rs (CLI values win, result re-validated)
//!     → handed to lifecycle::startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod overrides;
pub mod schema;
pub mod validation;

pub use overrides::{apply_overrides, ConfigOverrides};
pub use schema::GroupConfig;
pub use schema::HandlerConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::ShutdownConfig;
