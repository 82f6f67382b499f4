//! Object Header - Metadata prepended to every object
//!
//! Object Block Layout (16 bytes of header on 64-bit, 8 on 32-bit):
//! ┌─────────────────────────────────────────┐
//! │      Retain Count (1 word)              │  <- AtomicUsize
//! ├─────────────────────────────────────────┤
//! │      Class Id (padded to 1 word)        │  <- ClassId
//! ├─────────────────────────────────────────┤  <- object pointer
//! │      Payload (instance size + extra)    │
//! │      ...                                │
//! └─────────────────────────────────────────┘
//!
//! The object pointer handed to callers is the first payload byte. The
//! header is always exactly `HEADER_SIZE` bytes below it.

use crate::class::ClassId;
use crate::util::WORD_SIZE;
use static_assertions::const_assert_eq;
use std::mem::{offset_of, size_of};
use std::sync::atomic::{fence, AtomicUsize, Ordering};

/// Size of object header in bytes
pub const HEADER_SIZE: usize = 2 * WORD_SIZE;

/// Retain count of a freshly allocated object: one live owner
pub const INITIAL_RETAIN_COUNT: usize = 1;

/// Object Header
///
/// The retain count is the only field mutated concurrently. The class id is
/// written once at allocation.
#[repr(C)]
pub struct ObjectHeader {
    /// Retain count
    retain_count: AtomicUsize,
    /// Class identity (non-owning)
    class: ClassId,
}

/// Header followed by the variable-length payload
#[repr(C)]
pub struct ObjectBlock {
    pub header: ObjectHeader,
    pub payload: [u8; 0],
}

const_assert_eq!(size_of::<ObjectHeader>(), HEADER_SIZE);
const_assert_eq!(offset_of!(ObjectBlock, payload), HEADER_SIZE);

impl ObjectHeader {
    /// Create new object header
    pub fn new(class: ClassId) -> Self {
        Self {
            retain_count: AtomicUsize::new(INITIAL_RETAIN_COUNT),
            class,
        }
    }

    /// Get class id
    #[inline]
    pub fn class(&self) -> ClassId {
        self.class
    }

    // === Retain Count Operations ===

    /// Increment retain count
    #[inline]
    pub fn retain(&self) {
        let previous = self.retain_count.fetch_add(1, Ordering::Relaxed);
        debug_assert!(previous != 0, "retain of an object already released to zero");
        debug_assert!(previous != usize::MAX, "retain count overflow");
    }

    /// Decrement retain count
    ///
    /// Returns true if this call moved the count to zero.
    #[inline]
    pub fn release_was_zero(&self) -> bool {
        let previous = self.retain_count.fetch_sub(1, Ordering::Release);
        debug_assert!(previous != 0, "over-release: retain count was already zero");

        if previous != 1 {
            return false;
        }

        // Writes made by other owners before their release must be visible
        // to the thread that tears the object down.
        fence(Ordering::Acquire);
        true
    }

    /// Current retain count (advisory)
    #[inline]
    pub fn retain_count(&self) -> usize {
        self.retain_count.load(Ordering::Relaxed)
    }
}

/// Get object pointer from header pointer
///
/// # Safety
/// `header` must point to the header of an allocated object block.
#[inline]
pub unsafe fn header_to_object(header: *mut ObjectHeader) -> *mut u8 {
    header.cast::<u8>().wrapping_add(HEADER_SIZE)
}

/// Get header pointer from object pointer
///
/// # Safety
/// `object` must be an object pointer produced by `header_to_object`.
#[inline]
pub unsafe fn object_to_header(object: *mut u8) -> *mut ObjectHeader {
    object.wrapping_sub(HEADER_SIZE).cast::<ObjectHeader>()
}

/// Write a fresh header at the start of `block`
///
/// # Safety
/// `block` must be valid for writes of `HEADER_SIZE` bytes and word aligned.
#[inline]
pub unsafe fn stamp_header(block: *mut u8, class: ClassId) -> *mut ObjectHeader {
    let header = block.cast::<ObjectHeader>();
    header.write(ObjectHeader::new(class));
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn create_test_header() -> ObjectHeader {
        ObjectHeader::new(ClassId::from_raw(3))
    }

    #[test]
    fn test_header_size_is_two_words() {
        assert_eq!(HEADER_SIZE, 2 * size_of::<usize>());
        assert_eq!(size_of::<ObjectBlock>(), HEADER_SIZE);
    }

    #[test]
    fn test_new_header() {
        let header = create_test_header();
        assert_eq!(header.class(), ClassId::from_raw(3));
        assert_eq!(header.retain_count(), INITIAL_RETAIN_COUNT);
    }

    #[test]
    fn test_retain_release() {
        let header = create_test_header();

        header.retain();
        header.retain();
        assert_eq!(header.retain_count(), 3);

        assert!(!header.release_was_zero());
        assert!(!header.release_was_zero());
        assert!(header.release_was_zero());
        assert_eq!(header.retain_count(), 0);
    }

    #[test]
    fn test_pointer_conversion() {
        let mut block = [0usize; 4];
        let header = block.as_mut_ptr().cast::<ObjectHeader>();

        unsafe {
            let object = header_to_object(header);
            assert_eq!(object as usize, header as usize + HEADER_SIZE);
            assert_eq!(object_to_header(object), header);
        }
    }

    #[test]
    fn test_stamp_header() {
        let mut block = [usize::MAX; 4];
        let class = ClassId::from_raw(11);

        unsafe {
            let header = stamp_header(block.as_mut_ptr().cast::<u8>(), class);
            assert_eq!((*header).class(), class);
            assert_eq!((*header).retain_count(), INITIAL_RETAIN_COUNT);
        }

        // Payload words untouched
        assert_eq!(block[2], usize::MAX);
        assert_eq!(block[3], usize::MAX);
    }

    #[test]
    fn test_concurrent_retain_release() {
        let header = Arc::new(create_test_header());
        let mut handles = vec![];

        for _ in 0..8 {
            let header_clone = Arc::clone(&header);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    header_clone.retain();
                    assert!(!header_clone.release_was_zero());
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(header.retain_count(), INITIAL_RETAIN_COUNT);
        assert!(header.release_was_zero());
    }
}
