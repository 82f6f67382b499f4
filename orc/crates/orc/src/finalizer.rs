//! Finalizer - Property Teardown
//!
//! Walks every property an object carries and hands each one to a caller
//! supplied [`PropertyTeardown`] before the object's memory is released.
//!
//! ## Walk Order
//!
//! Classes are visited in inheritance-chain order, most-derived first; the
//! properties of one class in declaration order. A class appearing more than
//! once in the chain is visited at its first position only, so each property
//! reaches the teardown exactly once.
//!
//! Finalization never reclaims memory.

use crate::class::{ClassId, ClassMetadata, PropertyDescriptor};
use crate::error::Result;
use crate::object::ObjectPtr;

/// Per-property teardown capability
///
/// Implemented for any `FnMut(&PropertyDescriptor, ClassId, ObjectPtr) -> Result<()>`.
pub trait PropertyTeardown {
    /// Clear the value `property` holds in `object`
    ///
    /// Returning an error aborts the finalize call.
    ///
    /// # Safety
    /// `object` must be live and carry `property`, declared by
    /// `declaring_class`, in its payload.
    unsafe fn teardown(
        &mut self,
        property: &PropertyDescriptor,
        declaring_class: ClassId,
        object: ObjectPtr,
    ) -> Result<()>;
}

impl<F> PropertyTeardown for F
where
    F: FnMut(&PropertyDescriptor, ClassId, ObjectPtr) -> Result<()>,
{
    unsafe fn teardown(
        &mut self,
        property: &PropertyDescriptor,
        declaring_class: ClassId,
        object: ObjectPtr,
    ) -> Result<()> {
        self(property, declaring_class, object)
    }
}

/// Run `teardown` over every property of `object`
///
/// Returns the number of properties visited. The first teardown error stops
/// the walk and is returned.
///
/// # Safety
/// `object` must be live and exclusively owned by the caller (normally the
/// thread whose release moved its count to zero).
pub unsafe fn finalize_object<C, T>(classes: &C, object: ObjectPtr, teardown: &mut T) -> Result<usize>
where
    C: ClassMetadata + ?Sized,
    T: PropertyTeardown + ?Sized,
{
    let class = object.class();
    let chain = classes.inheritance_chain(class);
    let mut visited = 0;

    for (position, &declaring) in chain.iter().enumerate() {
        if chain[..position].contains(&declaring) {
            continue;
        }

        for property in classes.properties(declaring).iter() {
            teardown.teardown(property, declaring, object)?;
            visited += 1;
        }
    }

    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassBuilder, ClassRegistry, PropertyKind};
    use crate::error::OrcError;
    use crate::object::{geometry, ObjectHeader};
    use std::ptr::NonNull;
    use std::sync::Arc;

    const WORD: usize = std::mem::size_of::<usize>();

    /// Metadata whose chain repeats a class, as a careless provider might
    struct RepeatingChain {
        registry: ClassRegistry,
        chain: Arc<[ClassId]>,
    }

    impl ClassMetadata for RepeatingChain {
        fn instance_and_header_size(&self, class: ClassId, extra: usize) -> usize {
            self.registry.instance_and_header_size(class, extra)
        }

        fn inheritance_chain(&self, _class: ClassId) -> Arc<[ClassId]> {
            Arc::clone(&self.chain)
        }

        fn properties(&self, class: ClassId) -> Arc<[PropertyDescriptor]> {
            self.registry.properties(class)
        }

        fn is_infraclass(&self, class: ClassId) -> bool {
            self.registry.is_infraclass(class)
        }
    }

    fn with_object<F: FnOnce(ObjectPtr)>(class: ClassId, f: F) {
        let mut block = [0usize; 8];
        let header = NonNull::new(block.as_mut_ptr().cast::<ObjectHeader>()).unwrap();
        unsafe {
            header.as_ptr().write(ObjectHeader::new(class));
            f(geometry::object_of(header));
        }
    }

    #[test]
    fn test_visits_most_derived_first() {
        let registry = ClassRegistry::new();
        let base = registry
            .publish(ClassBuilder::new("Base").instance_size(WORD).property("a", 0, PropertyKind::Retained))
            .unwrap();
        let derived = registry
            .publish(
                ClassBuilder::new("Derived")
                    .superclass(base)
                    .instance_size(2 * WORD)
                    .property("b", WORD, PropertyKind::Assigned),
            )
            .unwrap();

        let mut seen = Vec::new();
        with_object(derived, |object| {
            let mut record = |p: &PropertyDescriptor, class: ClassId, _: ObjectPtr| -> Result<()> {
                seen.push((p.name.clone(), class));
                Ok(())
            };
            let visited = unsafe { finalize_object(&registry, object, &mut record) }.unwrap();
            assert_eq!(visited, 2);
        });

        assert_eq!(
            seen,
            vec![("b".to_string(), derived), ("a".to_string(), base)]
        );
    }

    #[test]
    fn test_repeated_chain_entries_visited_once() {
        let registry = ClassRegistry::new();
        let base = registry
            .publish(ClassBuilder::new("Base").instance_size(WORD).property("a", 0, PropertyKind::Retained))
            .unwrap();
        let metadata = RepeatingChain {
            registry,
            chain: vec![base, base, base].into(),
        };

        let mut calls = 0;
        with_object(base, |object| {
            let mut count = |_: &PropertyDescriptor, _: ClassId, _: ObjectPtr| -> Result<()> {
                calls += 1;
                Ok(())
            };
            unsafe { finalize_object(&metadata, object, &mut count) }.unwrap();
        });

        assert_eq!(calls, 1);
    }

    #[test]
    fn test_teardown_error_aborts_walk() {
        let registry = ClassRegistry::new();
        let class = registry
            .publish(
                ClassBuilder::new("Pair")
                    .instance_size(2 * WORD)
                    .property("first", 0, PropertyKind::Retained)
                    .property("second", WORD, PropertyKind::Retained),
            )
            .unwrap();

        let mut calls = 0;
        with_object(class, |object| {
            let mut fail_first = |p: &PropertyDescriptor, _: ClassId, _: ObjectPtr| -> Result<()> {
                calls += 1;
                Err(OrcError::TeardownFailed {
                    class: "Pair".to_string(),
                    property: p.name.clone(),
                    reason: "refused".to_string(),
                })
            };
            let result = unsafe { finalize_object(&registry, object, &mut fail_first) };
            assert!(matches!(result, Err(OrcError::TeardownFailed { .. })));
        });

        assert_eq!(calls, 1);
    }
}
