//! Zeroing teardown
//!
//! The stock [`PropertyTeardown`]: clears every property slot. An object
//! slot that owns its reference (`Retained`, `Copied`) gives the reference
//! up first. Referents whose count reaches zero are queued rather than
//! destroyed in place, and [`ZeroProperties::drain`] destroys the queue in a
//! loop, so arbitrarily long ownership chains run in constant stack depth.

use crate::class::{ClassId, ClassMetadata, PropertyDescriptor, PropertyKind};
use crate::error::Result;
use crate::finalizer::PropertyTeardown;
use crate::memory::MemoryProvider;
use crate::object::ObjectPtr;
use crate::runtime::Runtime;
use std::ptr;

/// Teardown that releases owned references and zeroes every slot
///
/// After finalizing with it, call [`drain`](Self::drain) to destroy the
/// referents it released to zero.
pub struct ZeroProperties<'rt, C: ClassMetadata, M: MemoryProvider> {
    runtime: &'rt Runtime<C, M>,
    pending: Vec<ObjectPtr>,
    destroyed: usize,
}

impl<'rt, C: ClassMetadata, M: MemoryProvider> ZeroProperties<'rt, C, M> {
    pub fn new(runtime: &'rt Runtime<C, M>) -> Self {
        Self {
            runtime,
            pending: Vec::new(),
            destroyed: 0,
        }
    }

    /// Referenced objects destroyed so far, including transitively owned ones
    pub fn destroyed(&self) -> usize {
        self.destroyed
    }

    /// Objects released to zero and not yet destroyed
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Finalize and deallocate every queued referent
    ///
    /// Referents released while draining join the queue. On error the
    /// failing object stays allocated and the rest of the queue is kept.
    ///
    /// # Safety
    /// Every queued object must still be exclusively owned by this teardown,
    /// which holds as long as nothing else touched them since they were
    /// released to zero.
    pub unsafe fn drain(&mut self) -> Result<()> {
        let runtime = self.runtime;

        while let Some(object) = self.pending.pop() {
            runtime.finalize(object, self)?;
            runtime.deallocate(object);
            self.destroyed += 1;
        }

        Ok(())
    }
}

impl<C: ClassMetadata, M: MemoryProvider> Drop for ZeroProperties<'_, C, M> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            log::warn!(
                "{} objects released to zero were never destroyed",
                self.pending.len()
            );
        }
    }
}

impl<C: ClassMetadata, M: MemoryProvider> PropertyTeardown for ZeroProperties<'_, C, M> {
    unsafe fn teardown(
        &mut self,
        property: &PropertyDescriptor,
        _declaring_class: ClassId,
        object: ObjectPtr,
    ) -> Result<()> {
        let slot = object.payload_at(property.offset);

        match property.kind {
            PropertyKind::Scalar { size } => ptr::write_bytes(slot, 0, size),
            kind => {
                let slot = slot.cast::<*mut u8>();
                let value = ObjectPtr::from_raw(slot.read());
                slot.write(ptr::null_mut());

                if kind.owns_reference() && self.runtime.decrement_was_zero(value) {
                    if let Some(referent) = value {
                        self.pending.push(referent);
                    }
                }
            },
        }

        Ok(())
    }
}
