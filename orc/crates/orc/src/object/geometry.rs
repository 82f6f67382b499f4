//! Header Geometry
//!
//! Allocation sizing and header ⇄ object pointer conversion. Pure address
//! and size arithmetic; nothing here touches memory.

use super::header::{self, ObjectHeader};
use super::ObjectPtr;
use crate::class::{ClassId, ClassMetadata};
use std::ptr::NonNull;

/// Total block size for an instance of `class` with `extra` trailing bytes
///
/// `class` must be a concrete class (checked in debug builds).
#[inline]
pub fn allocation_size<C>(classes: &C, class: ClassId, extra: usize) -> usize
where
    C: ClassMetadata + ?Sized,
{
    debug_assert!(
        classes.is_infraclass(class),
        "class {} is not an instantiable class",
        class
    );
    classes.instance_and_header_size(class, extra)
}

/// Object pointer for the block starting at `header`
///
/// # Safety
/// `header` must be the start of an allocated object block.
#[inline]
pub unsafe fn object_of(header: NonNull<ObjectHeader>) -> ObjectPtr {
    ObjectPtr(NonNull::new_unchecked(header::header_to_object(header.as_ptr())))
}

/// Block start of `object`
///
/// # Safety
/// `object` must have been produced by `object_of`.
#[inline]
pub unsafe fn header_of(object: ObjectPtr) -> NonNull<ObjectHeader> {
    NonNull::new_unchecked(header::object_to_header(object.as_ptr()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassBuilder, ClassRegistry};
    use crate::object::HEADER_SIZE;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_allocation_size_adds_header_and_extra() {
        let registry = ClassRegistry::new();
        let class = registry
            .publish(ClassBuilder::new("Point").instance_size(16))
            .unwrap();

        assert_eq!(allocation_size(&registry, class, 0), HEADER_SIZE + 16);
        assert_eq!(allocation_size(&registry, class, 100), HEADER_SIZE + 116);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not an instantiable class")]
    fn test_protocol_class_is_rejected() {
        let registry = ClassRegistry::new();
        let protocol = registry.publish(ClassBuilder::protocol("Copying")).unwrap();
        allocation_size(&registry, protocol, 0);
    }

    #[quickcheck]
    fn prop_header_object_roundtrip(block_words: u16) -> bool {
        // Any word-aligned, non-null block address
        let addr = (block_words as usize + 1) * std::mem::align_of::<usize>();
        let header = NonNull::new(addr as *mut ObjectHeader).unwrap();

        unsafe {
            let object = object_of(header);
            object.addr() == addr + HEADER_SIZE && header_of(object) == header
        }
    }

    #[quickcheck]
    fn prop_size_is_monotonic_in_extra(instance: u16, extra: u16) -> bool {
        let registry = ClassRegistry::new();
        let class = registry
            .publish(ClassBuilder::new("Sized").instance_size(instance as usize))
            .unwrap();

        let base = allocation_size(&registry, class, 0);
        allocation_size(&registry, class, extra as usize) == base + extra as usize
            && base >= HEADER_SIZE + instance as usize
    }
}
