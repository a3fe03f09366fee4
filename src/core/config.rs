//! Engine configuration with documented constants
//!
//! All timing and capacity knobs live here. Values can be overridden from a
//! TOML file; any field left out keeps its default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SignalError};

/// Configuration for the simulation and power loops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === SIMULATION LOOP ===
    /// Wall-clock length of one simulation tick (milliseconds)
    ///
    /// The loop sleeps for whatever is left of this interval after solving,
    /// so a slow solve shortens the sleep rather than stretching the tick.
    pub tick_interval_ms: u64,

    /// Upper bound on a single solve (milliseconds, 0 disables the bound)
    ///
    /// A solve that exceeds it fails the entity like any other hard error.
    pub solve_timeout_ms: u64,

    // === POWER GRID ===
    /// Interval between global power ticks (milliseconds)
    pub power_tick_interval_ms: u64,

    // === AI CORE ===
    /// How many programs a core can hold loaded at once
    pub program_slots: usize,

    /// Number of registry slots on each core
    pub registry_slots: usize,

    /// Maximum entries kept in a core's rolling log
    ///
    /// Oldest entries are dropped first once the cap is reached.
    pub log_capacity: usize,

    /// How many trailing log entries the log view returns
    pub log_view: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            solve_timeout_ms: 5000,
            power_tick_interval_ms: 1000,
            program_slots: 4,
            registry_slots: 16,
            log_capacity: 256,
            log_view: 10,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn power_tick_interval(&self) -> Duration {
        Duration::from_millis(self.power_tick_interval_ms)
    }

    /// `None` when solves are unbounded
    pub fn solve_timeout(&self) -> Option<Duration> {
        (self.solve_timeout_ms > 0).then(|| Duration::from_millis(self.solve_timeout_ms))
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.tick_interval_ms == 0 || self.power_tick_interval_ms == 0 {
            return Err("Tick intervals must be positive".into());
        }

        if self.program_slots == 0 {
            return Err("program_slots must be at least 1".into());
        }

        if self.registry_slots == 0 {
            return Err("registry_slots must be at least 1".into());
        }

        if self.log_view > self.log_capacity {
            return Err(format!(
                "log_view ({}) should be <= log_capacity ({})",
                self.log_view, self.log_capacity
            ));
        }

        Ok(())
    }

    /// Parse a TOML document and validate the result
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate().map_err(SignalError::Config)?;
        Ok(config)
    }

    /// Load a TOML config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.registry_slots, 16);
        assert_eq!(config.program_slots, 4);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("tick_interval_ms = 50\nlog_capacity = 32\n").unwrap();
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.log_capacity, 32);
        assert_eq!(config.program_slots, 4);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let result = EngineConfig::from_toml_str("log_capacity = 2\nlog_view = 10\n");
        assert!(matches!(result, Err(SignalError::Config(_))));

        let result = EngineConfig::from_toml_str("tick_interval_ms = \"fast\"");
        assert!(matches!(result, Err(SignalError::TomlError(_))));
    }

    #[test]
    fn test_zero_timeout_disables_bound() {
        let config = EngineConfig {
            solve_timeout_ms: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.solve_timeout(), None);
    }
}
