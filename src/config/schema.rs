//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the listener group.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the listener group.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Listeners to run under the shared shutdown signal.
    pub listeners: Vec<ListenerConfig>,

    /// Demo request handler settings.
    pub handler: HandlerConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            listeners: vec![
                ListenerConfig::new("primary", "127.0.0.1:8080"),
                ListenerConfig::new("secondary", "127.0.0.1:8090"),
            ],
            handler: HandlerConfig::default(),
            shutdown: ShutdownConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// A single listening service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Listener identifier for logging/metrics.
    pub name: String,

    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Maximum concurrently served requests (backpressure).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl ListenerConfig {
    pub fn new(name: impl Into<String>, bind_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bind_address: bind_address.into(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> usize {
    10_000
}

/// Settings for the placeholder handler every listener serves.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Artificial latency of each request in milliseconds.
    pub delay_ms: u64,

    /// Response body.
    pub body: String,
}

impl HandlerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            delay_ms: 5_000,
            body: "Hello world\n".to_string(),
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Time each listener gets to drain in-flight requests, in milliseconds.
    pub grace_period_ms: u64,
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: crate::lifecycle::shutdown::GRACE_PERIOD.as_millis() as u64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
