//! Object Module - Object Layout and Reference Counting
//!
//! - `header`: the fixed header prepended to every object
//! - `geometry`: allocation sizes and header/object pointer conversion
//! - `refcount`: retain/release on the embedded counter

pub mod geometry;
pub mod header;
pub mod refcount;

pub use geometry::{allocation_size, header_of, object_of};
pub use header::{ObjectBlock, ObjectHeader, HEADER_SIZE, INITIAL_RETAIN_COUNT};
pub use refcount::{decrement_was_zero, increment, read_count};

use crate::class::ClassId;
use std::fmt;
use std::ptr::NonNull;

/// Object pointer
///
/// Address of an object's first payload byte. Copying an `ObjectPtr` does
/// not retain the object; every operation that dereferences it is `unsafe`
/// and requires the object to be live.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ObjectPtr(NonNull<u8>);

// An ObjectPtr is an address; the only concurrently mutated state behind it
// is the atomic retain count.
unsafe impl Send for ObjectPtr {}
unsafe impl Sync for ObjectPtr {}

impl ObjectPtr {
    /// Wrap a raw object pointer, `None` for null
    #[inline]
    pub fn from_raw(ptr: *mut u8) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Raw pointer to the first payload byte
    #[inline]
    pub fn as_ptr(self) -> *mut u8 {
        self.0.as_ptr()
    }

    /// Numeric address
    #[inline]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }

    /// Header of this object
    ///
    /// # Safety
    /// The object must be live.
    #[inline]
    pub unsafe fn header<'a>(self) -> &'a ObjectHeader {
        &*header::object_to_header(self.as_ptr())
    }

    /// Class stamped into the header
    ///
    /// # Safety
    /// The object must be live.
    #[inline]
    pub unsafe fn class(self) -> ClassId {
        self.header().class()
    }

    /// Pointer `offset` bytes into the payload
    ///
    /// # Safety
    /// `offset` must lie within the object's payload.
    #[inline]
    pub unsafe fn payload_at(self, offset: usize) -> *mut u8 {
        self.as_ptr().add(offset)
    }
}

impl fmt::Debug for ObjectPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectPtr({:#x})", self.addr())
    }
}

impl fmt::Pointer for ObjectPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_null() {
        assert!(ObjectPtr::from_raw(std::ptr::null_mut()).is_none());
    }

    #[test]
    fn test_debug_format() {
        let ptr = ObjectPtr::from_raw(0x40 as *mut u8).unwrap();
        assert_eq!(format!("{:?}", ptr), "ObjectPtr(0x40)");
        assert_eq!(ptr.addr(), 0x40);
    }
}
