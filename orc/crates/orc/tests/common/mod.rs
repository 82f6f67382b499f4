//! Test Utilities for the ORC Lifecycle Test Suite
//!
//! Shared fixture: a runtime over a fresh registry and a memory provider
//! that remembers every block it hands out, plus the Base → Mid → Derived
//! class family most tests run against.

#![allow(dead_code)]

use orc::{
    ClassBuilder, ClassId, ClassRegistry, MemoryProvider, ObjectPtr, PropertyKind, Runtime,
    RuntimeConfig, SystemMemory, TrackingMemory,
};
use parking_lot::Mutex;
use std::ptr::NonNull;
use std::sync::Arc;

pub const WORD: usize = std::mem::size_of::<usize>();

/// Byte pattern non-zeroed blocks are filled with
pub const SENTINEL: u8 = 0xA5;

/// ============================================================================
/// SENTINEL PROVIDER
/// ============================================================================

/// Provider that fills non-zeroed blocks with [`SENTINEL`] and records the
/// address of every block it returns
pub struct SentinelMemory {
    inner: TrackingMemory<SystemMemory>,
    handed_out: Mutex<Vec<usize>>,
}

impl SentinelMemory {
    pub fn new() -> Self {
        Self {
            inner: TrackingMemory::new(SystemMemory::new()),
            handed_out: Mutex::new(Vec::new()),
        }
    }

    /// Address of the most recent block handed out
    pub fn last_block(&self) -> Option<usize> {
        self.handed_out.lock().last().copied()
    }

    pub fn ledger(&self) -> &TrackingMemory<SystemMemory> {
        &self.inner
    }
}

impl MemoryProvider for SentinelMemory {
    fn allocate_zeroed(&self, size: usize) -> NonNull<u8> {
        let block = self.inner.allocate_zeroed(size);
        self.handed_out.lock().push(block.as_ptr() as usize);
        block
    }

    fn allocate_non_zeroed(&self, size: usize) -> NonNull<u8> {
        let block = self.inner.allocate_non_zeroed(size);
        unsafe { std::ptr::write_bytes(block.as_ptr(), SENTINEL, size) };
        self.handed_out.lock().push(block.as_ptr() as usize);
        block
    }

    unsafe fn release(&self, block: NonNull<u8>) {
        self.inner.release(block)
    }
}

pub type FixtureRuntime = Runtime<Arc<ClassRegistry>, SentinelMemory>;

/// ============================================================================
/// LIFECYCLE FIXTURE
/// ============================================================================

/// Runtime plus the Base → Mid → Derived family
///
/// Base declares `a` at offset 0, Mid declares `b` at one word, Derived
/// declares `c` at two words. All three are retained object slots.
pub struct LifecycleFixture {
    pub runtime: FixtureRuntime,
    pub base: ClassId,
    pub mid: ClassId,
    pub derived: ClassId,
}

impl LifecycleFixture {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let runtime = Runtime::new(Arc::new(ClassRegistry::new()), SentinelMemory::new(), config)
            .expect("fixture config should validate");

        let base = runtime
            .publish(
                ClassBuilder::new("Base")
                    .instance_size(WORD)
                    .property("a", 0, PropertyKind::Retained),
            )
            .expect("Base should publish");
        let mid = runtime
            .publish(
                ClassBuilder::new("Mid")
                    .superclass(base)
                    .instance_size(2 * WORD)
                    .property("b", WORD, PropertyKind::Retained),
            )
            .expect("Mid should publish");
        let derived = runtime
            .publish(
                ClassBuilder::new("Derived")
                    .superclass(mid)
                    .instance_size(3 * WORD)
                    .property("c", 2 * WORD, PropertyKind::Retained),
            )
            .expect("Derived should publish");

        Self {
            runtime,
            base,
            mid,
            derived,
        }
    }

    /// Blocks still held by the ledger
    pub fn live_blocks(&self) -> usize {
        self.runtime.memory().ledger().stats().live_blocks
    }
}

/// Assert every block went back to the provider
pub fn assert_no_leaks(fixture: &LifecycleFixture) {
    let stats = fixture.runtime.memory().ledger().stats();
    assert_eq!(
        stats.live_blocks, 0,
        "{} blocks ({} bytes) never released",
        stats.live_blocks, stats.live_bytes
    );
    assert_eq!(stats.refused_releases, 0, "ledger refused a release");
}

/// Read the object pointer stored at `offset`
///
/// # Safety
/// `object` must be live with an object slot at `offset`.
pub unsafe fn load_slot(object: ObjectPtr, offset: usize) -> Option<ObjectPtr> {
    ObjectPtr::from_raw(object.payload_at(offset).cast::<*mut u8>().read())
}

/// Store an object pointer at `offset`
///
/// # Safety
/// `object` must be live with an object slot at `offset`.
pub unsafe fn store_slot(object: ObjectPtr, offset: usize, value: Option<ObjectPtr>) {
    object
        .payload_at(offset)
        .cast::<*mut u8>()
        .write(value.map_or(std::ptr::null_mut(), ObjectPtr::as_ptr));
}
