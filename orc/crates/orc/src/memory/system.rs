//! System Memory - libc-backed provider

use super::{MemoryProvider, BLOCK_ALIGNMENT};
use std::alloc::{handle_alloc_error, Layout};
use std::ptr::NonNull;

/// Provider backed by the C allocator
///
/// `calloc` for zeroed blocks, `malloc` otherwise, `free` on release.
/// Exhaustion is fatal via `handle_alloc_error`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemory;

impl SystemMemory {
    pub fn new() -> Self {
        Self
    }
}

impl MemoryProvider for SystemMemory {
    fn allocate_zeroed(&self, size: usize) -> NonNull<u8> {
        let ptr = unsafe { libc::calloc(1, size.max(1)) };
        NonNull::new(ptr.cast::<u8>()).unwrap_or_else(|| exhausted(size))
    }

    fn allocate_non_zeroed(&self, size: usize) -> NonNull<u8> {
        let ptr = unsafe { libc::malloc(size.max(1)) };
        NonNull::new(ptr.cast::<u8>()).unwrap_or_else(|| exhausted(size))
    }

    unsafe fn release(&self, block: NonNull<u8>) {
        libc::free(block.as_ptr().cast::<libc::c_void>());
    }
}

fn exhausted(size: usize) -> ! {
    log::error!("System allocator could not provide {} bytes", size);
    match Layout::from_size_align(size.max(1), BLOCK_ALIGNMENT) {
        Ok(layout) => handle_alloc_error(layout),
        Err(_) => panic!("allocation of {} bytes exceeds the address space", size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Alignment;

    #[test]
    fn test_zeroed_block() {
        let memory = SystemMemory::new();
        let block = memory.allocate_zeroed(64);

        unsafe {
            let bytes = std::slice::from_raw_parts(block.as_ptr(), 64);
            assert!(bytes.iter().all(|&b| b == 0));
            memory.release(block);
        }
    }

    #[test]
    fn test_blocks_are_aligned() {
        let memory = SystemMemory::new();
        for size in [1, 7, 16, 33, 4096] {
            let block = memory.allocate_non_zeroed(size);
            assert!(Alignment::is_aligned(block.as_ptr() as usize, BLOCK_ALIGNMENT));
            unsafe { memory.release(block) };
        }
    }
}
