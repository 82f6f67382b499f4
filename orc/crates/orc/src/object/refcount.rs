//! Reference Counter
//!
//! Retain/release on the count embedded in the object header. Each
//! operation is a single atomic read-modify-write; these are the only
//! lifecycle operations that may race on the same object.

use super::ObjectPtr;

/// Increment the retain count
///
/// No null check: callers exclude null before retaining.
///
/// # Safety
/// `object` must be live.
#[inline]
pub unsafe fn increment(object: ObjectPtr) {
    object.header().retain();
}

/// Decrement the retain count
///
/// Returns true exactly when this call moved the count to zero; the caller
/// then owns the object's teardown (finalize, then deallocate). `None`
/// is a no-op returning false.
///
/// # Safety
/// `object` must be live and the caller must own the reference it gives up.
#[inline]
pub unsafe fn decrement_was_zero(object: Option<ObjectPtr>) -> bool {
    match object {
        Some(object) => object.header().release_was_zero(),
        None => false,
    }
}

/// Current retain count
///
/// Advisory only: stale as soon as another thread retains or releases.
///
/// # Safety
/// `object` must be live.
#[inline]
pub unsafe fn read_count(object: ObjectPtr) -> usize {
    object.header().retain_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassId;
    use crate::object::geometry::object_of;
    use crate::object::header::{ObjectHeader, INITIAL_RETAIN_COUNT};
    use std::ptr::NonNull;

    fn with_object<F: FnOnce(ObjectPtr)>(f: F) {
        let mut block = [0usize; 4];
        let header = NonNull::new(block.as_mut_ptr().cast::<ObjectHeader>()).unwrap();
        unsafe {
            header.as_ptr().write(ObjectHeader::new(ClassId::from_raw(0)));
            f(object_of(header));
        }
    }

    #[test]
    fn test_null_decrement_is_noop() {
        assert!(!unsafe { decrement_was_zero(None) });
    }

    #[test]
    fn test_single_owner_release() {
        with_object(|object| unsafe {
            assert_eq!(read_count(object), INITIAL_RETAIN_COUNT);
            assert!(decrement_was_zero(Some(object)));
        });
    }

    #[test]
    fn test_retained_object_survives_release() {
        with_object(|object| unsafe {
            increment(object);
            assert_eq!(read_count(object), 2);
            assert!(!decrement_was_zero(Some(object)));
            assert!(decrement_was_zero(Some(object)));
        });
    }
}
