//! Class Registry - Published Class Metadata
//!
//! Classes are declared with a [`ClassBuilder`] and published once.
//! Published classes are immutable; the registry only grows.
//!
//! ## Inheritance Chain
//!
//! Computed at publish time, most-derived first:
//!
//! 1. the class itself
//! 2. the chains of its adopted protocol classes, in adoption order
//! 3. the chain of its superclass
//!
//! A class reachable along several paths (two protocol classes adopting the
//! same protocol class, or a subclass re-adopting what its superclass
//! adopted) appears once, at its first position.

use super::{ClassId, ClassKind, ClassMetadata, PropertyDescriptor, PropertyKind};
use crate::error::{OrcError, Result};
use crate::object::header::HEADER_SIZE;
use crate::util::Alignment;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Published class descriptor
#[derive(Debug)]
pub struct ClassInfo {
    id: ClassId,
    name: String,
    kind: ClassKind,
    superclass: Option<ClassId>,
    protocols: Vec<ClassId>,
    instance_size: usize,
    properties: Arc<[PropertyDescriptor]>,
    chain: Arc<[ClassId]>,
}

impl ClassInfo {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn superclass(&self) -> Option<ClassId> {
        self.superclass
    }

    /// Adopted protocol classes, in adoption order
    pub fn protocols(&self) -> &[ClassId] {
        &self.protocols
    }

    /// Payload size in bytes, excluding header and extra bytes
    pub fn instance_size(&self) -> usize {
        self.instance_size
    }

    /// Properties declared by this class itself
    pub fn properties(&self) -> &Arc<[PropertyDescriptor]> {
        &self.properties
    }

    /// Inheritance chain, most-derived first
    pub fn chain(&self) -> &Arc<[ClassId]> {
        &self.chain
    }
}

/// Class builder
///
/// # Examples
///
/// ```rust
/// use orc::{ClassBuilder, ClassRegistry, PropertyKind};
///
/// let registry = ClassRegistry::new();
/// let base = registry
///     .publish(ClassBuilder::new("Base").instance_size(8).property("a", 0, PropertyKind::Retained))
///     .unwrap();
/// let derived = registry
///     .publish(
///         ClassBuilder::new("Derived")
///             .superclass(base)
///             .instance_size(16)
///             .property("b", 8, PropertyKind::Scalar { size: 8 }),
///     )
///     .unwrap();
///
/// assert_eq!(registry.lookup("Derived"), Some(derived));
/// ```
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    name: String,
    kind: ClassKind,
    superclass: Option<ClassId>,
    protocols: Vec<ClassId>,
    instance_size: usize,
    properties: Vec<PropertyDescriptor>,
}

impl ClassBuilder {
    /// Start a concrete class
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Concrete,
            superclass: None,
            protocols: Vec::new(),
            instance_size: 0,
            properties: Vec::new(),
        }
    }

    /// Start a protocol class
    pub fn protocol(name: impl Into<String>) -> Self {
        Self {
            kind: ClassKind::Protocol,
            ..Self::new(name)
        }
    }

    pub fn superclass(mut self, superclass: ClassId) -> Self {
        self.set_superclass(superclass);
        self
    }

    pub fn set_superclass(&mut self, superclass: ClassId) {
        self.superclass = Some(superclass);
    }

    /// Adopt a protocol class
    pub fn adopt(mut self, protocol: ClassId) -> Self {
        self.add_protocol(protocol);
        self
    }

    pub fn add_protocol(&mut self, protocol: ClassId) {
        self.protocols.push(protocol);
    }

    /// Payload size, rounded up to a word at publish time
    pub fn instance_size(mut self, size: usize) -> Self {
        self.instance_size = size;
        self
    }

    pub fn property(mut self, name: impl Into<String>, offset: usize, kind: PropertyKind) -> Self {
        self.add_property(PropertyDescriptor::new(name, offset, kind));
        self
    }

    pub fn add_property(&mut self, property: PropertyDescriptor) {
        self.properties.push(property);
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Class registry
///
/// Thread-safe, append-only store of published classes. A class id is the
/// class's publication index.
pub struct ClassRegistry {
    classes: RwLock<IndexMap<String, Arc<ClassInfo>>>,
}

impl ClassRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self {
            classes: RwLock::new(IndexMap::new()),
        }
    }

    /// Validate and publish a class
    ///
    /// # Errors
    /// - `InvalidArgument` for an empty name, a protocol class with a
    ///   superclass, or an instance size below the superclass's
    /// - `DuplicateClass` if the name is taken
    /// - `UnknownClass` for an unpublished superclass or protocol class
    /// - `AbstractClass` if the superclass is a protocol class or an adopted
    ///   class is concrete
    /// - `InvalidProperty` for overlapping names, misaligned object slots or
    ///   slots past the instance size
    pub fn publish(&self, builder: ClassBuilder) -> Result<ClassId> {
        let mut classes = self.classes.write();

        if builder.name.is_empty() {
            return Err(OrcError::InvalidArgument(
                "class name must not be empty".to_string(),
            ));
        }

        if classes.contains_key(&builder.name) {
            return Err(OrcError::DuplicateClass { name: builder.name });
        }

        let fetch = |id: ClassId| -> Result<Arc<ClassInfo>> {
            classes
                .get_index(id.index())
                .map(|(_, info)| Arc::clone(info))
                .ok_or(OrcError::UnknownClass { class: id })
        };

        let superclass = match builder.superclass {
            Some(id) => {
                if builder.kind == ClassKind::Protocol {
                    return Err(OrcError::InvalidArgument(format!(
                        "protocol class '{}' cannot have a superclass",
                        builder.name
                    )));
                }
                let info = fetch(id)?;
                if info.kind != ClassKind::Concrete {
                    return Err(OrcError::AbstractClass {
                        name: info.name.clone(),
                        expected: "a concrete class",
                    });
                }
                Some(info)
            },
            None => None,
        };

        let mut protocols = Vec::with_capacity(builder.protocols.len());
        for &id in &builder.protocols {
            let info = fetch(id)?;
            if info.kind != ClassKind::Protocol {
                return Err(OrcError::AbstractClass {
                    name: info.name.clone(),
                    expected: "a protocol class",
                });
            }
            protocols.push(info);
        }

        let instance_size = Alignment::align_up(builder.instance_size, Alignment::WORD);
        if let Some(sup) = &superclass {
            if instance_size < sup.instance_size {
                return Err(OrcError::InvalidArgument(format!(
                    "instance size {} of '{}' is smaller than superclass '{}' ({})",
                    instance_size, builder.name, sup.name, sup.instance_size
                )));
            }
        }

        let bounded = builder.kind == ClassKind::Concrete;
        validate_properties(&builder.name, &builder.properties, bounded.then_some(instance_size))?;

        let id = u32::try_from(classes.len())
            .map(ClassId::from_raw)
            .map_err(|_| OrcError::Internal("class id space exhausted".to_string()))?;

        let mut chain: IndexSet<ClassId> = IndexSet::new();
        chain.insert(id);
        for protocol in &protocols {
            chain.extend(protocol.chain.iter().copied());
        }
        if let Some(sup) = &superclass {
            chain.extend(sup.chain.iter().copied());
        }

        // Properties of newly adopted protocol classes live in this layout.
        if bounded {
            for protocol in &protocols {
                for &member in protocol.chain.iter() {
                    let (_, info) = classes
                        .get_index(member.index())
                        .ok_or(OrcError::UnknownClass { class: member })?;
                    validate_properties(&builder.name, &info.properties, Some(instance_size))?;
                }
            }
        }

        // One layout holds the slots of the class and every chain member.
        let mut slots: Vec<&PropertyDescriptor> = builder.properties.iter().collect();
        for &member in chain.iter().skip(1) {
            let (_, info) = classes
                .get_index(member.index())
                .ok_or(OrcError::UnknownClass { class: member })?;
            slots.extend(info.properties.iter());
        }
        reject_overlapping_slots(&builder.name, slots)?;

        let info = ClassInfo {
            id,
            name: builder.name.clone(),
            kind: builder.kind,
            superclass: builder.superclass,
            protocols: builder.protocols,
            instance_size,
            properties: builder.properties.into(),
            chain: chain.into_iter().collect(),
        };

        log::debug!(
            "Published class {} as {} ({} bytes, chain length {})",
            info.name,
            id,
            info.instance_size,
            info.chain.len()
        );

        classes.insert(builder.name, Arc::new(info));
        Ok(id)
    }

    /// Get class descriptor
    pub fn class(&self, id: ClassId) -> Option<Arc<ClassInfo>> {
        self.classes
            .read()
            .get_index(id.index())
            .map(|(_, info)| Arc::clone(info))
    }

    /// Find class id by name
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.classes.read().get(name).map(|info| info.id)
    }

    /// Number of published classes
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    /// Check if no class is published
    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }

    fn expect_class(&self, id: ClassId) -> Arc<ClassInfo> {
        self.class(id)
            .unwrap_or_else(|| panic!("class {} is not registered", id))
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassMetadata for ClassRegistry {
    fn instance_and_header_size(&self, class: ClassId, extra: usize) -> usize {
        let info = self.expect_class(class);
        (HEADER_SIZE + info.instance_size)
            .checked_add(extra)
            .unwrap_or_else(|| panic!("allocation size overflow: {} extra bytes", extra))
    }

    fn inheritance_chain(&self, class: ClassId) -> Arc<[ClassId]> {
        Arc::clone(&self.expect_class(class).chain)
    }

    fn properties(&self, class: ClassId) -> Arc<[PropertyDescriptor]> {
        Arc::clone(&self.expect_class(class).properties)
    }

    fn is_infraclass(&self, class: ClassId) -> bool {
        self.class(class)
            .is_some_and(|info| info.kind == ClassKind::Concrete)
    }

    fn class_name(&self, class: ClassId) -> Option<String> {
        self.class(class).map(|info| info.name.clone())
    }
}

/// Fail if any two slots share a byte
fn reject_overlapping_slots(class: &str, mut slots: Vec<&PropertyDescriptor>) -> Result<()> {
    slots.sort_by_key(|property| property.offset);

    for pair in slots.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if prev.end() > next.offset {
            return Err(OrcError::InvalidProperty {
                class: class.to_string(),
                property: next.name.clone(),
                reason: format!(
                    "slot {}..{} overlaps '{}' at {}..{}",
                    next.offset,
                    next.end(),
                    prev.name,
                    prev.offset,
                    prev.end()
                ),
            });
        }
    }

    Ok(())
}

fn validate_properties(
    class: &str,
    properties: &[PropertyDescriptor],
    instance_size: Option<usize>,
) -> Result<()> {
    let mut names = FxHashSet::default();

    for property in properties {
        let invalid = |reason: String| OrcError::InvalidProperty {
            class: class.to_string(),
            property: property.name.clone(),
            reason,
        };

        if !names.insert(property.name.as_str()) {
            return Err(invalid("declared twice".to_string()));
        }

        if property.kind.slot_size() == 0 {
            return Err(invalid("zero-sized slot".to_string()));
        }

        if property.kind.is_object() && !Alignment::is_aligned(property.offset, Alignment::WORD) {
            return Err(invalid(format!(
                "object slot at offset {} is not word aligned",
                property.offset
            )));
        }

        if let Some(size) = instance_size {
            if property.end() > size {
                return Err(invalid(format!(
                    "slot {}..{} exceeds instance size {}",
                    property.offset,
                    property.end(),
                    size
                )));
            }
        }
    }

    Ok(())
}
