//! Memory Module - Raw Block Providers
//!
//! The lifecycle core asks a [`MemoryProvider`] for raw blocks and hands
//! them back on deallocation. Providers own the failure policy: a provider
//! that cannot satisfy a request does not return; it aborts (the system
//! provider calls `std::alloc::handle_alloc_error`).
//!
//! ## Providers
//!
//! - [`SystemMemory`]: `calloc` / `malloc` / `free`
//! - [`TrackingMemory`]: ledger wrapper detecting unmatched releases

pub mod system;
pub mod tracking;
pub mod zone;

pub use system::SystemMemory;
pub use tracking::{LedgerStats, TrackingMemory};
pub use zone::{should_retain_with_zone, Zone};

use std::ptr::NonNull;
use std::sync::Arc;

/// Minimum alignment of every block a provider returns
pub const BLOCK_ALIGNMENT: usize = 2 * std::mem::align_of::<usize>();

/// Raw memory provider consumed by the allocator bridge
pub trait MemoryProvider: Send + Sync {
    /// Allocate `size` zero-filled bytes
    fn allocate_zeroed(&self, size: usize) -> NonNull<u8>;

    /// Allocate `size` bytes with unspecified contents
    fn allocate_non_zeroed(&self, size: usize) -> NonNull<u8>;

    /// Release a block
    ///
    /// # Safety
    /// `block` must come from this provider and not be released yet.
    unsafe fn release(&self, block: NonNull<u8>);
}

impl<M: MemoryProvider + ?Sized> MemoryProvider for Box<M> {
    fn allocate_zeroed(&self, size: usize) -> NonNull<u8> {
        (**self).allocate_zeroed(size)
    }

    fn allocate_non_zeroed(&self, size: usize) -> NonNull<u8> {
        (**self).allocate_non_zeroed(size)
    }

    unsafe fn release(&self, block: NonNull<u8>) {
        (**self).release(block)
    }
}

impl<M: MemoryProvider + ?Sized> MemoryProvider for Arc<M> {
    fn allocate_zeroed(&self, size: usize) -> NonNull<u8> {
        (**self).allocate_zeroed(size)
    }

    fn allocate_non_zeroed(&self, size: usize) -> NonNull<u8> {
        (**self).allocate_non_zeroed(size)
    }

    unsafe fn release(&self, block: NonNull<u8>) {
        (**self).release(block)
    }
}
