//! Configuration Module - Runtime Tuning Parameters
//!
//! Manages the configuration parameters of an ORC runtime.
//! None of them change the object layout; they only control diagnostics
//! and the allocation ledger.

use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};

/// Main configuration for an object runtime
///
/// # Examples
///
/// ```rust
/// use orc::RuntimeConfig;
///
/// // Use default configuration
/// let config = RuntimeConfig::default();
///
/// // Debugging configuration: ledger every block and scribble freed memory
/// let config = RuntimeConfig {
///     track_allocations: true,
///     scribble_on_free: true,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Record lifecycle events in the runtime's logger
    ///
    /// Every allocation, finalization and deallocation becomes an event.
    /// Default: false
    pub verbose: bool,

    /// Minimum level of recorded lifecycle events
    ///
    /// Default: Info
    pub log_level: LogLevel,

    /// Maximum number of events the logger retains
    ///
    /// Oldest events are dropped first.
    /// Default: 4096
    pub max_logged_events: usize,

    /// Enable lifecycle statistics
    ///
    /// Default: true
    pub stats_enabled: bool,

    /// Keep a ledger of every live block
    ///
    /// Releases of unknown or already released blocks are detected and
    /// refused instead of reaching the system allocator. Applied by
    /// `SystemRuntime::with_system_memory`; `Runtime::new` uses the provider
    /// it is given.
    ///
    /// Default: true in debug builds, false otherwise
    pub track_allocations: bool,

    /// Overwrite released blocks with `scribble_byte`
    ///
    /// Requires `track_allocations` (the ledger knows block sizes). Like
    /// `track_allocations`, only applied to a runtime-built provider.
    /// Default: false
    pub scribble_on_free: bool,

    /// Byte pattern written over released blocks
    ///
    /// Must be non-zero: zeroed memory reads like a valid, empty object.
    /// Default: 0xDD
    pub scribble_byte: u8,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            // Logging
            verbose: false,
            log_level: LogLevel::Info,
            max_logged_events: 4096,

            // Stats
            stats_enabled: true,

            // Ledger
            track_allocations: cfg!(debug_assertions),
            scribble_on_free: false,
            scribble_byte: DEFAULT_SCRIBBLE_BYTE,
        }
    }
}

impl RuntimeConfig {
    /// Validate configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use orc::RuntimeConfig;
    ///
    /// let config = RuntimeConfig {
    ///     track_allocations: false,
    ///     scribble_on_free: true,  // Invalid!
    ///     ..Default::default()
    /// };
    ///
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scribble_on_free && !self.track_allocations {
            return Err(ConfigError::ScribbleRequiresTracking);
        }

        if self.scribble_on_free && self.scribble_byte == 0 {
            return Err(ConfigError::InvalidScribbleByte(self.scribble_byte));
        }

        if self.verbose && self.max_logged_events == 0 {
            return Err(ConfigError::InvalidEventCapacity(
                "max_logged_events must be > 0 when verbose".to_string(),
            ));
        }

        Ok(())
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with environment variables:
    /// - ORC_VERBOSE
    /// - ORC_LOG_LEVEL (error, warn, info, debug, trace)
    /// - ORC_STATS
    /// - ORC_TRACK_ALLOCATIONS
    /// - ORC_SCRIBBLE (a byte value enables scribbling, 0 disables)
    ///
    /// # Examples
    ///
    /// ```bash
    /// export ORC_VERBOSE=1
    /// export ORC_LOG_LEVEL=trace
    /// export ORC_SCRIBBLE=221
    /// ```
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ORC_VERBOSE") {
            config.verbose = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("ORC_LOG_LEVEL") {
            if let Some(level) = LogLevel::from_name(&val) {
                config.log_level = level;
            }
        }

        if let Ok(val) = std::env::var("ORC_STATS") {
            config.stats_enabled = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("ORC_TRACK_ALLOCATIONS") {
            config.track_allocations = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("ORC_SCRIBBLE") {
            if let Ok(byte) = val.parse::<u8>() {
                config.scribble_on_free = byte != 0;
                if byte != 0 {
                    config.scribble_byte = byte;
                    config.track_allocations = true;
                }
            }
        }

        config
    }

    /// Parse configuration from JSON
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("scribble_on_free requires track_allocations")]
    ScribbleRequiresTracking,

    #[error("Invalid scribble byte: {0:#04x}")]
    InvalidScribbleByte(u8),

    #[error("Invalid event capacity: {0}")]
    InvalidEventCapacity(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Default byte pattern for released blocks
pub const DEFAULT_SCRIBBLE_BYTE: u8 = 0xDD;

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true") || val.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.stats_enabled);
        assert!(!config.verbose);
        assert_eq!(config.scribble_byte, DEFAULT_SCRIBBLE_BYTE);
    }

    #[test]
    fn test_scribble_requires_tracking() {
        let config = RuntimeConfig {
            track_allocations: false,
            scribble_on_free: true,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ScribbleRequiresTracking)
        ));
    }

    #[test]
    fn test_zero_scribble_byte_rejected() {
        let config = RuntimeConfig {
            track_allocations: true,
            scribble_on_free: true,
            scribble_byte: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_verbose_needs_event_capacity() {
        let config = RuntimeConfig {
            verbose: true,
            max_logged_events: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = RuntimeConfig::from_json(r#"{ "verbose": true, "log_level": "Trace" }"#)
            .expect("valid json");
        assert!(config.verbose);
        assert_eq!(config.log_level, LogLevel::Trace);
        assert_eq!(config.max_logged_events, 4096);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(RuntimeConfig::from_json("{ not json").is_err());
        assert!(RuntimeConfig::from_json(
            r#"{ "track_allocations": false, "scribble_on_free": true }"#
        )
        .is_err());
    }

    #[test]
    fn test_json_roundtrip_preserves_fields() {
        let config = RuntimeConfig {
            verbose: true,
            scribble_on_free: true,
            track_allocations: true,
            scribble_byte: 0xAB,
            ..Default::default()
        };
        let parsed = RuntimeConfig::from_json(&config.to_json()).expect("roundtrip");
        assert_eq!(parsed, config);
    }
}
