//! Class Module - Class Metadata Interface
//!
//! The lifecycle core consumes class metadata through the narrow
//! [`ClassMetadata`] trait:
//!
//! - `instance_and_header_size` for Header Geometry
//! - `inheritance_chain` and `properties` for the Finalizer
//! - `is_infraclass` as the concreteness precondition of allocation
//!
//! [`ClassRegistry`] is the in-process implementation used by the runtime
//! and the C ABI. Objects refer to their class by [`ClassId`], a plain
//! index into the registry; the header never owns class metadata.

pub mod registry;

pub use registry::{ClassBuilder, ClassInfo, ClassRegistry};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity of a published class
///
/// A non-owning lookup key into the class registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct ClassId(u32);

impl ClassId {
    /// Create class id from its raw index
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw index of this class id
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Registry slot of this class id
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassKind {
    /// Instantiable class with a concrete instance layout
    Concrete,
    /// Protocol class: contributes properties to adopters, never instantiated
    Protocol,
}

/// How a property holds its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Object pointer owning one reference
    Retained,
    /// Object pointer owning one reference to a private copy
    Copied,
    /// Object pointer that owns nothing
    Assigned,
    /// Plain bytes
    Scalar { size: usize },
}

impl PropertyKind {
    /// Number of payload bytes the property occupies
    pub fn slot_size(self) -> usize {
        match self {
            PropertyKind::Retained | PropertyKind::Copied | PropertyKind::Assigned => {
                std::mem::size_of::<usize>()
            },
            PropertyKind::Scalar { size } => size,
        }
    }

    /// Check if the property holds an object pointer
    pub fn is_object(self) -> bool {
        !matches!(self, PropertyKind::Scalar { .. })
    }

    /// Check if the property owns a reference that teardown must give up
    pub fn owns_reference(self) -> bool {
        matches!(self, PropertyKind::Retained | PropertyKind::Copied)
    }
}

/// Property descriptor
///
/// Names one field in an object's payload. `offset` is relative to the
/// object pointer (the first payload byte).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub offset: usize,
    pub kind: PropertyKind,
}

impl PropertyDescriptor {
    /// Create new property descriptor
    pub fn new(name: impl Into<String>, offset: usize, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            offset,
            kind,
        }
    }

    /// First payload byte past this property
    pub fn end(&self) -> usize {
        self.offset + self.kind.slot_size()
    }
}

/// Class metadata consumed by the lifecycle core
///
/// Implementations own the class descriptors; published classes must be
/// immutable. Passing an id the implementation never handed out is a
/// precondition violation and may panic.
pub trait ClassMetadata: Send + Sync {
    /// Instance size plus header size plus `extra` trailing bytes
    fn instance_and_header_size(&self, class: ClassId, extra: usize) -> usize;

    /// Classes whose properties an instance carries, most-derived first
    fn inheritance_chain(&self, class: ClassId) -> Arc<[ClassId]>;

    /// Properties declared by `class` itself
    fn properties(&self, class: ClassId) -> Arc<[PropertyDescriptor]>;

    /// Check if `class` can be instantiated
    fn is_infraclass(&self, class: ClassId) -> bool;

    /// Class name, for diagnostics
    fn class_name(&self, class: ClassId) -> Option<String> {
        let _ = class;
        None
    }
}

impl<T: ClassMetadata + ?Sized> ClassMetadata for Arc<T> {
    fn instance_and_header_size(&self, class: ClassId, extra: usize) -> usize {
        (**self).instance_and_header_size(class, extra)
    }

    fn inheritance_chain(&self, class: ClassId) -> Arc<[ClassId]> {
        (**self).inheritance_chain(class)
    }

    fn properties(&self, class: ClassId) -> Arc<[PropertyDescriptor]> {
        (**self).properties(class)
    }

    fn is_infraclass(&self, class: ClassId) -> bool {
        (**self).is_infraclass(class)
    }

    fn class_name(&self, class: ClassId) -> Option<String> {
        (**self).class_name(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_sizes() {
        assert_eq!(PropertyKind::Retained.slot_size(), std::mem::size_of::<usize>());
        assert_eq!(PropertyKind::Scalar { size: 3 }.slot_size(), 3);
        assert_eq!(PropertyDescriptor::new("x", 8, PropertyKind::Scalar { size: 4 }).end(), 12);
    }

    #[test]
    fn test_reference_ownership() {
        assert!(PropertyKind::Retained.owns_reference());
        assert!(PropertyKind::Copied.owns_reference());
        assert!(!PropertyKind::Assigned.owns_reference());
        assert!(PropertyKind::Assigned.is_object());
        assert!(!PropertyKind::Scalar { size: 8 }.is_object());
    }

    #[test]
    fn test_class_id_display() {
        let id = ClassId::from_raw(42);
        assert_eq!(id.to_string(), "#42");
        assert_eq!(id.index(), 42);
    }
}
