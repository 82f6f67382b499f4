//! Lifecycle Logging and Tracing
//!
//! Records object-lifecycle events, useful for:
//! - Debugging leaks and over-releases
//! - Auditing teardown order
//!
//! Events are kept in a bounded in-memory buffer and forwarded to the
//! `log` facade, so any `log` backend picks them up.
//!
//! Log Levels:
//! - ERROR: Ledger violations, teardown failures
//! - WARN: Unusual conditions
//! - INFO: Class publication
//! - DEBUG: Finalization
//! - TRACE: Per-object allocation and deallocation

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// Log level for lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Parse a level name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Lifecycle event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LifecycleEvent {
    /// Class published to the registry
    ClassPublished {
        name: String,
        class: u32,
        instance_size: usize,
        properties: usize,
    },

    /// Object allocated
    Allocated {
        class: String,
        address: usize,
        size: usize,
        zeroed: bool,
    },

    /// Object finalized
    Finalized {
        class: String,
        address: usize,
        properties: usize,
    },

    /// Property teardown aborted a finalize call
    TeardownFailed {
        class: String,
        address: usize,
        reason: String,
    },

    /// Object memory released
    Deallocated { class: String, address: usize },

    /// Ledger refused to release a block it does not know
    UnknownRelease { address: usize },
}

impl LifecycleEvent {
    /// Get log level for event
    pub fn level(&self) -> LogLevel {
        match self {
            LifecycleEvent::TeardownFailed { .. } | LifecycleEvent::UnknownRelease { .. } => {
                LogLevel::Error
            },
            LifecycleEvent::ClassPublished { .. } => LogLevel::Info,
            LifecycleEvent::Finalized { .. } => LogLevel::Debug,
            LifecycleEvent::Allocated { .. } | LifecycleEvent::Deallocated { .. } => {
                LogLevel::Trace
            },
        }
    }

    /// Human-readable rendering
    pub fn describe(&self) -> String {
        match self {
            LifecycleEvent::ClassPublished {
                name,
                class,
                instance_size,
                properties,
            } => format!(
                "[ORC] Class {} published as #{} ({} bytes, {} properties)",
                name, class, instance_size, properties
            ),
            LifecycleEvent::Allocated {
                class,
                address,
                size,
                zeroed,
            } => format!(
                "[ORC] Allocated {} at {:#x} ({} bytes, {})",
                class,
                address,
                size,
                if *zeroed { "zeroed" } else { "non-zeroed" }
            ),
            LifecycleEvent::Finalized {
                class,
                address,
                properties,
            } => format!(
                "[ORC] Finalized {} at {:#x} ({} properties)",
                class, address, properties
            ),
            LifecycleEvent::TeardownFailed {
                class,
                address,
                reason,
            } => format!(
                "[ORC] Finalization of {} at {:#x} aborted: {}",
                class, address, reason
            ),
            LifecycleEvent::Deallocated { class, address } => {
                format!("[ORC] Deallocated {} at {:#x}", class, address)
            },
            LifecycleEvent::UnknownRelease { address } => {
                format!("[ORC] Refused release of unknown block {:#x}", address)
            },
        }
    }
}

/// Recorded event with its wall-clock timestamp
///
/// Serializes flat: the event's own `event` tag and fields sit next to
/// `timestamp`.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedEvent {
    pub timestamp: chrono::DateTime<chrono::Local>,
    #[serde(flatten)]
    pub event: LifecycleEvent,
}

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum log level
    pub level: LogLevel,

    /// Maximum retained events
    pub capacity: usize,

    /// Forward events as JSON instead of human-readable text
    pub json: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            capacity: 4096,
            json: false,
        }
    }
}

/// Lifecycle logger - bounded event recorder
pub struct LifecycleLogger {
    config: LoggerConfig,
    events: Mutex<VecDeque<LoggedEvent>>,
    enabled: AtomicBool,
}

impl LifecycleLogger {
    /// Create new logger
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(config.capacity.min(1024))),
            config,
            enabled: AtomicBool::new(true),
        }
    }

    /// Enable logging
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Disable logging
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Check whether an event at `level` would be recorded
    ///
    /// Callers use this to skip building events (class name lookups) on
    /// the hot path.
    pub fn accepts(&self, level: LogLevel) -> bool {
        self.is_enabled() && level <= self.config.level
    }

    /// Log a lifecycle event
    pub fn log(&self, event: LifecycleEvent) {
        if !self.accepts(event.level()) {
            return;
        }

        let entry = LoggedEvent {
            timestamp: chrono::Local::now(),
            event,
        };
        self.forward(&entry);

        if self.config.capacity == 0 {
            return;
        }

        let mut events = self.events.lock();
        if events.len() >= self.config.capacity {
            events.pop_front();
        }
        events.push_back(entry);
    }

    fn forward(&self, entry: &LoggedEvent) {
        let level: log::Level = entry.event.level().into();
        if self.config.json {
            match serde_json::to_string(entry) {
                Ok(line) => log::log!(level, "{}", line),
                Err(e) => log::warn!("Failed to encode lifecycle event: {}", e),
            }
        } else {
            log::log!(
                level,
                "[{}] {}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                entry.event.describe()
            );
        }
    }

    /// Snapshot of recorded events, oldest first
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().iter().map(|e| e.event.clone()).collect()
    }

    /// Recorded events as a JSON array
    pub fn to_json(&self) -> String {
        let events = self.events.lock();
        let entries: Vec<&LoggedEvent> = events.iter().collect();
        serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string())
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if no events are recorded
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}
