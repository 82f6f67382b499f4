//! Runtime - Object Lifecycle Entry Points
//!
//! [`Runtime`] ties class metadata and a memory provider together and
//! exposes the lifecycle operations:
//!
//! ```text
//!   allocate ──► Allocated ──increment──► Retained
//!                   │                        │
//!                   └──decrement_was_zero────┘
//!                              │ true
//!                              ▼
//!                       ReleasedToZero ──finalize──► Finalized ──deallocate──► Deallocated
//! ```
//!
//! Only `increment` and `decrement_was_zero` may race on the same object.
//! Allocation works on memory nobody else can see yet; finalize and
//! deallocate belong to the thread whose decrement returned true.

use crate::class::{ClassBuilder, ClassId, ClassMetadata, ClassRegistry};
use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::finalizer::{self, PropertyTeardown};
use crate::logging::{LifecycleEvent, LifecycleLogger, LogLevel, LoggerConfig};
use crate::memory::{MemoryProvider, SystemMemory, TrackingMemory, Zone};
use crate::object::header::{self, ObjectHeader};
use crate::object::{geometry, refcount, ObjectPtr};
use crate::stats::{LifecycleStats, StatsSnapshot};
use crate::teardown::ZeroProperties;
use crate::util::debug;
use std::sync::Arc;

/// Runtime over the class registry and the system allocator
pub type SystemRuntime = Runtime<Arc<ClassRegistry>, Box<dyn MemoryProvider>>;

/// Object lifecycle runtime
///
/// # Examples
///
/// ```rust
/// use orc::{ClassBuilder, ClassRegistry, RuntimeConfig, SystemRuntime};
/// use std::sync::Arc;
///
/// let runtime = SystemRuntime::with_system_memory(Arc::new(ClassRegistry::new()), RuntimeConfig::default())?;
/// let point = runtime.publish(ClassBuilder::new("Point").instance_size(16))?;
///
/// let object = runtime.allocate(point, 0);
/// unsafe {
///     runtime.increment(object);
///     assert!(!runtime.decrement_was_zero(Some(object)));
///     assert!(runtime.release_zeroing(Some(object))?);
/// }
/// # Ok::<(), orc::OrcError>(())
/// ```
pub struct Runtime<C, M> {
    classes: C,
    memory: M,
    config: RuntimeConfig,
    stats: LifecycleStats,
    logger: Option<Arc<LifecycleLogger>>,
}

impl<C: ClassMetadata, M: MemoryProvider> Runtime<C, M> {
    /// Create new runtime over a caller-built provider
    ///
    /// `memory` is used as given. The provider settings of `config`
    /// (`track_allocations`, `scribble_on_free`, `scribble_byte`) are
    /// validated but not applied here; wrap the provider in
    /// [`TrackingMemory`] yourself, or use
    /// [`SystemRuntime::with_system_memory`], which applies them.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` does not validate.
    pub fn new(classes: C, memory: M, config: RuntimeConfig) -> Result<Self> {
        config.validate()?;

        let ignored = unapplied_provider_settings(&config);
        if !ignored.is_empty() {
            log::warn!(
                "Runtime::new does not configure the provider; ignoring {}",
                ignored.join(", ")
            );
        }

        let logger = create_logger(&config);
        Ok(Self::assemble(classes, memory, config, logger))
    }

    fn assemble(
        classes: C,
        memory: M,
        config: RuntimeConfig,
        logger: Option<Arc<LifecycleLogger>>,
    ) -> Self {
        Self {
            classes,
            memory,
            config,
            stats: LifecycleStats::new(),
            logger,
        }
    }

    pub fn classes(&self) -> &C {
        &self.classes
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Lifecycle event logger, present when `verbose` is set
    pub fn logger(&self) -> Option<&Arc<LifecycleLogger>> {
        self.logger.as_ref()
    }

    /// Snapshot of lifecycle statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    // === Header Geometry ===

    /// Block size for an instance of `class` with `extra` trailing bytes
    pub fn allocation_size(&self, class: ClassId, extra: usize) -> usize {
        geometry::allocation_size(&self.classes, class, extra)
    }

    // === Allocator Bridge ===

    /// Allocate a zero-filled instance of `class` with `extra` trailing bytes
    ///
    /// The header carries `class` and a retain count of one. Never returns
    /// null: provider exhaustion does not return.
    ///
    /// # Panics
    /// In debug builds, if `class` is not instantiable.
    pub fn allocate(&self, class: ClassId, extra: usize) -> ObjectPtr {
        self.allocate_block(class, extra, true)
    }

    /// Allocate an instance whose payload bytes are left as the provider
    /// returned them
    ///
    /// Only the header is initialized; the caller initializes the payload
    /// before any property is read.
    pub fn allocate_non_zeroed(&self, class: ClassId, extra: usize) -> ObjectPtr {
        self.allocate_block(class, extra, false)
    }

    /// Legacy zone-taking allocation; the zone is ignored
    pub fn allocate_in_zone(&self, class: ClassId, extra: usize, zone: Option<&Zone>) -> ObjectPtr {
        let _ = zone;
        self.allocate(class, extra)
    }

    fn allocate_block(&self, class: ClassId, extra: usize, zeroed: bool) -> ObjectPtr {
        let size = self.allocation_size(class, extra);
        let block = if zeroed {
            self.memory.allocate_zeroed(size)
        } else {
            self.memory.allocate_non_zeroed(size)
        };

        debug_assert!(
            block.as_ptr() as usize % std::mem::align_of::<ObjectHeader>() == 0,
            "provider returned a misaligned block"
        );

        let object = unsafe {
            header::stamp_header(block.as_ptr(), class);
            geometry::object_of(block.cast::<ObjectHeader>())
        };

        if self.config.stats_enabled {
            self.stats.record_allocation(size, zeroed);
        }

        match self.logger_at(LogLevel::Trace) {
            Some(logger) => logger.log(LifecycleEvent::Allocated {
                class: self.display_name(class),
                address: object.addr(),
                size,
                zeroed,
            }),
            None => log::trace!("Allocated {} bytes for class {} at {:?}", size, class, object),
        }

        object
    }

    // === Reference Counter ===

    /// Increment the retain count of `object`
    ///
    /// # Safety
    /// `object` must be live.
    #[inline]
    pub unsafe fn increment(&self, object: ObjectPtr) {
        refcount::increment(object)
    }

    /// Decrement the retain count; true when it reached zero
    ///
    /// # Safety
    /// `object`, if present, must be live and the caller must own the
    /// reference it gives up.
    #[inline]
    pub unsafe fn decrement_was_zero(&self, object: Option<ObjectPtr>) -> bool {
        refcount::decrement_was_zero(object)
    }

    /// Current retain count (advisory)
    ///
    /// # Safety
    /// `object` must be live.
    #[inline]
    pub unsafe fn read_count(&self, object: ObjectPtr) -> usize {
        refcount::read_count(object)
    }

    // === Finalizer ===

    /// Tear down every property of `object`
    ///
    /// Returns the number of properties visited.
    ///
    /// # Safety
    /// `object` must be live, released to zero (or holding no property
    /// references) and not finalized before.
    pub unsafe fn finalize<T>(&self, object: ObjectPtr, teardown: &mut T) -> Result<usize>
    where
        T: PropertyTeardown + ?Sized,
    {
        let result = finalizer::finalize_object(&self.classes, object, teardown);

        match &result {
            Ok(visited) => {
                if self.config.stats_enabled {
                    self.stats.record_finalization(*visited);
                }
                if let Some(logger) = self.logger_at(LogLevel::Debug) {
                    logger.log(LifecycleEvent::Finalized {
                        class: self.display_name(object.class()),
                        address: object.addr(),
                        properties: *visited,
                    });
                }
            },
            Err(err) => {
                let class = self.display_name(object.class());
                match self.logger_at(LogLevel::Error) {
                    Some(logger) => logger.log(LifecycleEvent::TeardownFailed {
                        class,
                        address: object.addr(),
                        reason: err.to_string(),
                    }),
                    None => log::error!(
                        "Finalization of {} at {:?} aborted: {}",
                        class,
                        object,
                        err
                    ),
                }
            },
        }

        result
    }

    // === Deallocator ===

    /// Release the memory of `object`
    ///
    /// No property is touched.
    ///
    /// # Safety
    /// `object` must be live and finalized (or hold no property references).
    /// It is dangling afterwards.
    pub unsafe fn deallocate(&self, object: ObjectPtr) {
        let logger = self.logger_at(LogLevel::Trace);
        let class = logger.map(|_| self.display_name(object.class()));

        let block = geometry::header_of(object).cast::<u8>();
        self.memory.release(block);

        if self.config.stats_enabled {
            self.stats.record_deallocation();
        }

        match (logger, class) {
            (Some(logger), Some(class)) => logger.log(LifecycleEvent::Deallocated {
                class,
                address: object.addr(),
            }),
            _ => log::trace!("Deallocated object at {:?}", object),
        }
    }

    // === Composite Operations ===

    /// Give up one reference; on zero, finalize and deallocate
    ///
    /// Returns true if the object was destroyed. If teardown fails the
    /// object stays allocated and the error is returned.
    ///
    /// # Safety
    /// As for `decrement_was_zero`; the caller must not use `object` again
    /// once this returns true.
    pub unsafe fn release<T>(&self, object: Option<ObjectPtr>, teardown: &mut T) -> Result<bool>
    where
        T: PropertyTeardown + ?Sized,
    {
        let Some(object) = object else {
            return Ok(false);
        };

        if !refcount::decrement_was_zero(Some(object)) {
            return Ok(false);
        }

        self.finalize(object, teardown)?;
        self.deallocate(object);
        Ok(true)
    }

    /// `release` with the zeroing teardown
    ///
    /// Every object owned only through the released one is destroyed as
    /// well, iteratively, so chain length does not grow the stack.
    ///
    /// # Safety
    /// As for `release`.
    pub unsafe fn release_zeroing(&self, object: Option<ObjectPtr>) -> Result<bool> {
        let mut teardown = ZeroProperties::new(self);
        let destroyed = self.release(object, &mut teardown)?;
        teardown.drain()?;
        Ok(destroyed)
    }

    /// `finalize` with the zeroing teardown, then destroy every referent it
    /// released to zero
    ///
    /// Returns the number of properties visited on `object` itself.
    ///
    /// # Safety
    /// As for `finalize`.
    pub unsafe fn finalize_zeroing(&self, object: ObjectPtr) -> Result<usize> {
        let mut teardown = ZeroProperties::new(self);
        let visited = self.finalize(object, &mut teardown)?;
        teardown.drain()?;
        Ok(visited)
    }

    /// Hex dump of the header and fixed payload of `object`
    ///
    /// # Safety
    /// `object` must be live.
    pub unsafe fn dump_object(&self, object: ObjectPtr) -> String {
        let size = self.classes.instance_and_header_size(object.class(), 0);
        let start = geometry::header_of(object).as_ptr().cast::<u8>();
        format!(
            "{} {} (retain count {})\n{}",
            self.display_name(object.class()),
            debug::format_address(object.addr()),
            object.header().retain_count(),
            debug::dump_bytes(start, size)
        )
    }

    fn logger_at(&self, level: LogLevel) -> Option<&Arc<LifecycleLogger>> {
        self.logger.as_ref().filter(|logger| logger.accepts(level))
    }

    fn display_name(&self, class: ClassId) -> String {
        self.classes
            .class_name(class)
            .unwrap_or_else(|| class.to_string())
    }
}

impl<M: MemoryProvider> Runtime<Arc<ClassRegistry>, M> {
    /// Publish a class to the runtime's registry
    pub fn publish(&self, builder: ClassBuilder) -> Result<ClassId> {
        let id = self.classes.publish(builder)?;

        if let Some(logger) = self.logger_at(LogLevel::Info) {
            if let Some(info) = self.classes.class(id) {
                logger.log(LifecycleEvent::ClassPublished {
                    name: info.name().to_string(),
                    class: id.as_u32(),
                    instance_size: info.instance_size(),
                    properties: info.properties().len(),
                });
            }
        }

        Ok(id)
    }
}

impl SystemRuntime {
    /// Create runtime over the C allocator
    ///
    /// With `track_allocations` the allocator is wrapped in a ledger
    /// (scribbling released blocks if `scribble_on_free` is set).
    pub fn with_system_memory(classes: Arc<ClassRegistry>, config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        let logger = create_logger(&config);

        let memory: Box<dyn MemoryProvider> = if config.track_allocations {
            let mut ledger = TrackingMemory::new(SystemMemory::new());
            if config.scribble_on_free {
                ledger = ledger.with_scribble(config.scribble_byte);
            }
            if let Some(logger) = &logger {
                ledger = ledger.with_logger(Arc::clone(logger));
            }
            Box::new(ledger)
        } else {
            Box::new(SystemMemory::new())
        };

        Ok(Self::assemble(classes, memory, config, logger))
    }
}

/// Provider settings that change behavior only when the runtime builds the
/// provider itself
fn unapplied_provider_settings(config: &RuntimeConfig) -> Vec<&'static str> {
    let mut ignored = Vec::new();
    if config.scribble_on_free {
        ignored.push("scribble_on_free");
    }
    ignored
}

fn create_logger(config: &RuntimeConfig) -> Option<Arc<LifecycleLogger>> {
    config.verbose.then(|| {
        Arc::new(LifecycleLogger::new(LoggerConfig {
            level: config.log_level,
            capacity: config.max_logged_events,
            json: false,
        }))
    })
}
