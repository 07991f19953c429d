//! Command-line overrides layered on top of a loaded configuration.
//!
//! # Design Decisions
//! - Every override is optional; an unset override keeps the file's value
//! - `listen` replaces the listener list rather than extending it
//! - The merged config is validated again, so overrides cannot bypass checks

use crate::config::loader::ConfigError;
use crate::config::schema::{GroupConfig, ListenerConfig};
use crate::config::validation::validate_config;

/// Values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Listen addresses. Each becomes a listener named after its address.
    pub listen: Vec<String>,
    pub grace_period_ms: Option<u64>,
    pub handler_delay_ms: Option<u64>,
    pub log_level: Option<String>,
}

impl ConfigOverrides {
    /// Write every set override into `config`.
    pub fn apply(&self, config: &mut GroupConfig) {
        if !self.listen.is_empty() {
            config.listeners = self
                .listen
                .iter()
                .map(|addr| ListenerConfig::new(addr.as_str(), addr.as_str()))
                .collect();
        }
        if let Some(ms) = self.grace_period_ms {
            config.shutdown.grace_period_ms = ms;
        }
        if let Some(ms) = self.handler_delay_ms {
            config.handler.delay_ms = ms;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

/// Apply `overrides` to `config` and validate the result.
pub fn apply_overrides(
    mut config: GroupConfig,
    overrides: &ConfigOverrides,
) -> Result<GroupConfig, ConfigError> {
    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
