//! Tracking Memory - Allocation Ledger
//!
//! Wraps another provider and records every live block with its size.
//!
//! A release of a block the ledger does not know (double release, or a
//! pointer that never came from this provider) is refused: it is reported
//! and counted, and never reaches the wrapped provider.
//!
//! With scribbling enabled, released blocks are overwritten with a byte
//! pattern first so that use-after-free reads stand out.

use super::MemoryProvider;
use crate::logging::{LifecycleEvent, LifecycleLogger};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Ledger counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub live_blocks: usize,
    pub live_bytes: usize,
    pub total_allocations: u64,
    pub total_releases: u64,
    pub refused_releases: u64,
}

/// Ledger-keeping provider wrapper
pub struct TrackingMemory<M> {
    inner: M,
    live: Mutex<FxHashMap<usize, usize>>,
    scribble: Option<u8>,
    logger: Option<Arc<LifecycleLogger>>,
    total_allocations: AtomicU64,
    total_releases: AtomicU64,
    refused_releases: AtomicU64,
}

impl<M: MemoryProvider> TrackingMemory<M> {
    /// Create new ledger around `inner`
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            live: Mutex::new(FxHashMap::default()),
            scribble: None,
            logger: None,
            total_allocations: AtomicU64::new(0),
            total_releases: AtomicU64::new(0),
            refused_releases: AtomicU64::new(0),
        }
    }

    /// Overwrite released blocks with `byte`
    pub fn with_scribble(mut self, byte: u8) -> Self {
        self.scribble = Some(byte);
        self
    }

    /// Report refused releases to `logger`
    pub fn with_logger(mut self, logger: Arc<LifecycleLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Wrapped provider
    pub fn inner(&self) -> &M {
        &self.inner
    }

    /// Check if `address` is the start of a live block
    pub fn contains(&self, address: usize) -> bool {
        self.live.lock().contains_key(&address)
    }

    /// Size of the live block starting at `address`
    pub fn block_size(&self, address: usize) -> Option<usize> {
        self.live.lock().get(&address).copied()
    }

    /// Snapshot of ledger counters
    pub fn stats(&self) -> LedgerStats {
        let live = self.live.lock();
        LedgerStats {
            live_blocks: live.len(),
            live_bytes: live.values().sum(),
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
            total_releases: self.total_releases.load(Ordering::Relaxed),
            refused_releases: self.refused_releases.load(Ordering::Relaxed),
        }
    }

    fn record(&self, block: NonNull<u8>, size: usize) -> NonNull<u8> {
        let previous = self.live.lock().insert(block.as_ptr() as usize, size);
        if previous.is_some() {
            log::error!(
                "Provider returned live block {:#x} twice",
                block.as_ptr() as usize
            );
        }
        self.total_allocations.fetch_add(1, Ordering::Relaxed);
        block
    }
}

impl<M: MemoryProvider> MemoryProvider for TrackingMemory<M> {
    fn allocate_zeroed(&self, size: usize) -> NonNull<u8> {
        let block = self.inner.allocate_zeroed(size);
        self.record(block, size)
    }

    fn allocate_non_zeroed(&self, size: usize) -> NonNull<u8> {
        let block = self.inner.allocate_non_zeroed(size);
        self.record(block, size)
    }

    unsafe fn release(&self, block: NonNull<u8>) {
        let address = block.as_ptr() as usize;
        let size = self.live.lock().remove(&address);

        let Some(size) = size else {
            self.refused_releases.fetch_add(1, Ordering::Relaxed);
            log::error!("Refusing release of unknown block {:#x}", address);
            if let Some(logger) = &self.logger {
                logger.log(LifecycleEvent::UnknownRelease { address });
            }
            return;
        };

        if let Some(byte) = self.scribble {
            std::ptr::write_bytes(block.as_ptr(), byte, size);
        }

        self.total_releases.fetch_add(1, Ordering::Relaxed);
        self.inner.release(block);
    }
}
