//! # ORC - Object Lifecycle Core
//!
//! ORC is the low-level object lifecycle layer of a reference-counted object
//! runtime. It lays out the header every object carries, allocates and
//! releases raw object memory, maintains the embedded retain count and tears
//! down an object's properties before its memory goes back to the provider.
//!
//! ## Overview
//!
//! - **Object Header**: retain count and class id stored in front of the payload
//! - **Allocator Bridge**: zeroed and non-zeroed allocation through a pluggable [`MemoryProvider`]
//! - **Reference Counter**: lock-free increment / decrement with a release-acquire handoff
//! - **Finalizer**: walks every property along the inheritance chain
//! - **Class Registry**: publishes immutable class descriptors, concrete and protocol
//!
//! ## Quick Start
//!
//! ```rust
//! use orc::{ClassBuilder, PropertyKind};
//!
//! fn main() -> Result<(), orc::OrcError> {
//!     let runtime = orc::init()?;
//!
//!     let node = runtime.publish(
//!         ClassBuilder::new("Node")
//!             .instance_size(16)
//!             .property("next", 0, PropertyKind::Retained)
//!             .property("value", 8, PropertyKind::Scalar { size: 8 }),
//!     )?;
//!
//!     let object = runtime.allocate(node, 0);
//!     unsafe {
//!         runtime.increment(object);
//!         assert_eq!(runtime.read_count(object), 2);
//!         assert!(!runtime.decrement_was_zero(Some(object)));
//!
//!         // Last reference: finalize, then deallocate
//!         assert!(runtime.release_zeroing(Some(object))?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Object Layout
//!
//! ```text
//! provider block
//! ┌──────────────────┬──────────────┬──────────────────┬───────────────┐
//! │  retain count    │  class id    │  fixed payload   │  extra bytes  │
//! │  (word, atomic)  │  (word slot) │  (instance size) │  (caller)     │
//! └──────────────────┴──────────────┴──────────────────┴───────────────┘
//! ▲                                 ▲
//! header address                    object pointer = header + HEADER_SIZE
//! ```
//!
//! ## Lifecycle
//!
//! 1. **allocate**: header stamped, retain count 1
//! 2. **increment / decrement_was_zero**: any thread, concurrently
//! 3. **finalize**: the thread whose decrement returned true tears down properties
//! 4. **deallocate**: the block goes back to the provider
//!
//! ## Safety
//!
//! Operations taking an [`ObjectPtr`] are `unsafe`: the pointer must name a
//! live object from this runtime. Only increment and decrement may race on
//! one object; finalize and deallocate run once, on the releasing thread.
//!
//! ## Modules
//!
//! - [`class`]: Class ids, property descriptors and the class registry
//! - [`config`]: Runtime configuration and validation
//! - [`error`]: Error types for all ORC operations
//! - [`finalizer`]: Property walk over the inheritance chain
//! - [`logging`]: Lifecycle event recording
//! - [`memory`]: Raw memory providers
//! - [`object`]: Header layout, geometry and retain counting
//! - [`runtime`]: Lifecycle entry points
//! - [`stats`]: Lifecycle counters
//! - [`teardown`]: Zeroing property teardown
//! - [`util`]: Utility functions and helpers

// Core lifecycle
pub mod object;
pub mod finalizer;
pub mod runtime;
pub mod teardown;

// Metadata and memory
pub mod class;
pub mod memory;

// Ambient
pub mod config;
pub mod error;
pub mod logging;
pub mod stats;

// Utilities
pub mod util;

// Re-export main types for convenience
pub use class::{
    ClassBuilder, ClassId, ClassInfo, ClassKind, ClassMetadata, ClassRegistry, PropertyDescriptor,
    PropertyKind,
};
pub use config::{ConfigError, RuntimeConfig};
pub use error::{OrcError, Result};
pub use finalizer::{finalize_object, PropertyTeardown};
pub use logging::{LifecycleEvent, LifecycleLogger, LogLevel, LoggerConfig};
pub use memory::{should_retain_with_zone, LedgerStats, MemoryProvider, SystemMemory, TrackingMemory, Zone};
pub use object::{
    allocation_size, decrement_was_zero, header_of, increment, object_of, read_count, ObjectHeader,
    ObjectPtr, HEADER_SIZE, INITIAL_RETAIN_COUNT,
};
pub use runtime::{Runtime, SystemRuntime};
pub use stats::{LifecycleStats, StatsSnapshot};
pub use teardown::ZeroProperties;

/// ORC version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize ORC with default configuration
///
/// Creates a runtime over a fresh class registry and the C allocator.
///
/// # Examples
///
/// ```rust
/// let runtime = orc::init()?;
/// assert!(runtime.classes().is_empty());
/// # Ok::<(), orc::OrcError>(())
/// ```
pub fn init() -> Result<SystemRuntime> {
    init_with_config(RuntimeConfig::default())
}

/// Initialize ORC with custom configuration
///
/// # Examples
///
/// ```rust
/// let config = orc::RuntimeConfig {
///     track_allocations: true,
///     scribble_on_free: true,
///     ..Default::default()
/// };
///
/// let runtime = orc::init_with_config(config)?;
/// # Ok::<(), orc::OrcError>(())
/// ```
pub fn init_with_config(config: RuntimeConfig) -> Result<SystemRuntime> {
    SystemRuntime::with_system_memory(std::sync::Arc::new(ClassRegistry::new()), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_default() {
        assert!(init().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_version_not_empty() {
        assert!(!VERSION.is_empty());
    }
}
