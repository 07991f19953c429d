//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (grace period > 0, connection limits > 0)
//! - Detect conflicting listeners (same name or same address)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GroupConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::GroupConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    NoListeners,
    DuplicateName(String),
    DuplicateAddress(String),
    InvalidAddress { name: String, address: String },
    ZeroMaxConnections(String),
    ZeroGracePeriod,
    UnknownLogFormat(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NoListeners => write!(f, "at least one listener is required"),
            ValidationError::DuplicateName(name) => write!(f, "duplicate listener name '{}'", name),
            ValidationError::DuplicateAddress(addr) => {
                write!(f, "address {} is used by more than one listener", addr)
            }
            ValidationError::InvalidAddress { name, address } => {
                write!(f, "listener '{}' has invalid address '{}'", name, address)
            }
            ValidationError::ZeroMaxConnections(name) => {
                write!(f, "listener '{}' must allow at least one connection", name)
            }
            ValidationError::ZeroGracePeriod => write!(f, "shutdown grace period must be positive"),
            ValidationError::UnknownLogFormat(format) => {
                write!(f, "unknown log format '{}' (expected pretty or json)", format)
            }
        }
    }
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &GroupConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listeners.is_empty() {
        errors.push(ValidationError::NoListeners);
    }

    let mut names = HashSet::new();
    let mut addresses = HashSet::new();
    for listener in &config.listeners {
        if !names.insert(listener.name.as_str()) {
            errors.push(ValidationError::DuplicateName(listener.name.clone()));
        }
        // Port 0 asks the OS for a fresh port each time, so it never collides.
        match listener.bind_address.parse::<SocketAddr>() {
            Ok(addr) if addr.port() != 0 && !addresses.insert(addr) => {
                errors.push(ValidationError::DuplicateAddress(listener.bind_address.clone()));
            }
            Ok(_) => {}
            Err(_) => errors.push(ValidationError::InvalidAddress {
                name: listener.name.clone(),
                address: listener.bind_address.clone(),
            }),
        }
        if listener.max_connections == 0 {
            errors.push(ValidationError::ZeroMaxConnections(listener.name.clone()));
        }
    }

    if config.shutdown.grace_period_ms == 0 {
        errors.push(ValidationError::ZeroGracePeriod);
    }

    let format = config.observability.log_format.as_str();
    if format != "pretty" && format != "json" {
        errors.push(ValidationError::UnknownLogFormat(format.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
