//! Lifecycle Runtime - C FFI wrapper for ORC
//!
//! Provides C-compatible functions over a single process-wide runtime. The
//! runtime is created on first use from `ORC_*` environment variables.
//!
//! Classes cross the boundary as `u32` ids, `ORC_NO_CLASS` marking failure;
//! objects cross as payload pointers. Unknown or protocol classes are
//! rejected here with a null result instead of reaching the core.

use libc::{c_char, c_void};
use orc::{
    ClassBuilder, ClassId, ClassMetadata, ObjectPtr, PropertyDescriptor, PropertyKind,
    RuntimeConfig, SystemRuntime,
};
use std::ffi::CStr;
use std::sync::OnceLock;

static RUNTIME: OnceLock<SystemRuntime> = OnceLock::new();

/// Class id returned on failure and accepted as "no superclass"
pub const ORC_NO_CLASS: u32 = u32::MAX;

pub const ORC_PROPERTY_RETAINED: u32 = 0;
pub const ORC_PROPERTY_COPIED: u32 = 1;
pub const ORC_PROPERTY_ASSIGNED: u32 = 2;
pub const ORC_PROPERTY_SCALAR: u32 = 3;

/// Initialize the process-wide runtime
///
/// Returns true if the runtime exists afterwards. Calling it again is a
/// no-op.
#[no_mangle]
pub extern "C" fn orc_runtime_init() -> bool {
    if RUNTIME.get().is_some() {
        return true;
    }

    let config = RuntimeConfig::from_env();
    match orc::init_with_config(config) {
        Ok(runtime) => {
            // A concurrent initializer may have won; its runtime is kept.
            let _ = RUNTIME.set(runtime);
            true
        },
        Err(e) => {
            log::error!("Failed to create ORC runtime: {}", e);
            false
        },
    }
}

fn runtime() -> Option<&'static SystemRuntime> {
    if RUNTIME.get().is_none() && !orc_runtime_init() {
        return None;
    }
    RUNTIME.get()
}

unsafe fn read_name<'a>(name: *const c_char) -> Option<&'a str> {
    if name.is_null() {
        return None;
    }
    match CStr::from_ptr(name).to_str() {
        Ok(name) => Some(name),
        Err(e) => {
            log::error!("Class or property name is not UTF-8: {}", e);
            None
        },
    }
}

fn property_kind(kind: u32, size: usize) -> Option<PropertyKind> {
    match kind {
        ORC_PROPERTY_RETAINED => Some(PropertyKind::Retained),
        ORC_PROPERTY_COPIED => Some(PropertyKind::Copied),
        ORC_PROPERTY_ASSIGNED => Some(PropertyKind::Assigned),
        ORC_PROPERTY_SCALAR => Some(PropertyKind::Scalar { size }),
        _ => None,
    }
}

/// Resolve `class` to a published, instantiable class
fn instantiable(runtime: &SystemRuntime, class: u32) -> Option<ClassId> {
    let id = ClassId::from_raw(class);
    match runtime.classes().class(id) {
        Some(_) if runtime.classes().is_infraclass(id) => Some(id),
        Some(info) => {
            log::error!("Cannot instantiate protocol class {}", info.name());
            None
        },
        None => {
            log::error!("Cannot instantiate unknown class {}", id);
            None
        },
    }
}

fn as_object(obj: *mut c_void) -> Option<ObjectPtr> {
    ObjectPtr::from_raw(obj.cast::<u8>())
}

// === Class construction ===

/// Start a concrete class; `superclass` may be `ORC_NO_CLASS`
///
/// Returns null for a null or non-UTF-8 name. The builder is consumed by
/// `orc_class_publish` or released with `orc_class_builder_free`.
#[no_mangle]
pub unsafe extern "C" fn orc_class_builder_new(
    name: *const c_char,
    superclass: u32,
    instance_size: usize,
) -> *mut ClassBuilder {
    let Some(name) = read_name(name) else {
        return std::ptr::null_mut();
    };

    let mut builder = ClassBuilder::new(name).instance_size(instance_size);
    if superclass != ORC_NO_CLASS {
        builder.set_superclass(ClassId::from_raw(superclass));
    }
    Box::into_raw(Box::new(builder))
}

/// Start a protocol class
#[no_mangle]
pub unsafe extern "C" fn orc_protocol_builder_new(name: *const c_char) -> *mut ClassBuilder {
    match read_name(name) {
        Some(name) => Box::into_raw(Box::new(ClassBuilder::protocol(name))),
        None => std::ptr::null_mut(),
    }
}

/// Adopt a published protocol class
#[no_mangle]
pub unsafe extern "C" fn orc_class_builder_adopt(builder: *mut ClassBuilder, protocol: u32) -> bool {
    let Some(builder) = builder.as_mut() else {
        return false;
    };
    builder.add_protocol(ClassId::from_raw(protocol));
    true
}

/// Declare a property; `size` is used by `ORC_PROPERTY_SCALAR` only
#[no_mangle]
pub unsafe extern "C" fn orc_class_builder_add_property(
    builder: *mut ClassBuilder,
    name: *const c_char,
    offset: usize,
    kind: u32,
    size: usize,
) -> bool {
    let Some(builder) = builder.as_mut() else {
        return false;
    };
    let Some(name) = read_name(name) else {
        return false;
    };
    let Some(kind) = property_kind(kind, size) else {
        log::error!("Unknown property kind {} for '{}'", kind, name);
        return false;
    };

    builder.add_property(PropertyDescriptor::new(name, offset, kind));
    true
}

/// Release an unpublished builder
#[no_mangle]
pub unsafe extern "C" fn orc_class_builder_free(builder: *mut ClassBuilder) {
    if !builder.is_null() {
        drop(Box::from_raw(builder));
    }
}

/// Publish and consume `builder`
///
/// Returns the new class id, or `ORC_NO_CLASS` if publication failed.
#[no_mangle]
pub unsafe extern "C" fn orc_class_publish(builder: *mut ClassBuilder) -> u32 {
    if builder.is_null() {
        return ORC_NO_CLASS;
    }
    let builder = *Box::from_raw(builder);

    let Some(runtime) = runtime() else {
        return ORC_NO_CLASS;
    };

    let name = builder.name().to_string();
    match runtime.publish(builder) {
        Ok(id) => id.as_u32(),
        Err(e) => {
            log::error!("Failed to publish class '{}': {}", name, e);
            ORC_NO_CLASS
        },
    }
}

/// Find a published class by name
#[no_mangle]
pub unsafe extern "C" fn orc_class_lookup(name: *const c_char) -> u32 {
    let (Some(name), Some(runtime)) = (read_name(name), runtime()) else {
        return ORC_NO_CLASS;
    };
    runtime
        .classes()
        .lookup(name)
        .map_or(ORC_NO_CLASS, ClassId::as_u32)
}

// === Allocation ===

/// Allocate a zeroed instance of `class` with `extra` trailing bytes
#[no_mangle]
pub extern "C" fn orc_allocate_object(class: u32, extra: usize) -> *mut c_void {
    let Some(runtime) = runtime() else {
        return std::ptr::null_mut();
    };
    match instantiable(runtime, class) {
        Some(class) => runtime.allocate(class, extra).as_ptr().cast(),
        None => std::ptr::null_mut(),
    }
}

/// Allocate an instance whose payload is left uninitialized
#[no_mangle]
pub extern "C" fn orc_allocate_object_non_zeroed(class: u32, extra: usize) -> *mut c_void {
    let Some(runtime) = runtime() else {
        return std::ptr::null_mut();
    };
    match instantiable(runtime, class) {
        Some(class) => runtime.allocate_non_zeroed(class, extra).as_ptr().cast(),
        None => std::ptr::null_mut(),
    }
}

/// Legacy allocation taking a zone; the zone is ignored
#[no_mangle]
pub extern "C" fn orc_allocate_object_with_zone(class: u32, extra: usize, zone: *mut c_void) -> *mut c_void {
    let _ = zone;
    orc_allocate_object(class, extra)
}

// === Retain counting ===

/// # Safety
/// `obj` must be null or a live object from this runtime.
#[no_mangle]
pub unsafe extern "C" fn orc_increment_extra_ref_count(obj: *mut c_void) {
    if let (Some(runtime), Some(object)) = (RUNTIME.get(), as_object(obj)) {
        runtime.increment(object);
    }
}

/// True when the count reached zero; false for null
///
/// # Safety
/// `obj` must be null or a live object whose reference the caller owns.
#[no_mangle]
pub unsafe extern "C" fn orc_decrement_extra_ref_count_was_zero(obj: *mut c_void) -> bool {
    match (RUNTIME.get(), as_object(obj)) {
        (Some(runtime), Some(object)) => runtime.decrement_was_zero(Some(object)),
        _ => false,
    }
}

/// Current retain count; 0 for null
///
/// # Safety
/// `obj` must be null or a live object from this runtime.
#[no_mangle]
pub unsafe extern "C" fn orc_extra_ref_count(obj: *mut c_void) -> usize {
    match (RUNTIME.get(), as_object(obj)) {
        (Some(runtime), Some(object)) => runtime.read_count(object),
        _ => 0,
    }
}

/// Always true
#[no_mangle]
pub extern "C" fn orc_should_retain_with_zone(obj: *mut c_void, zone: *mut c_void) -> bool {
    let _ = zone;
    orc::should_retain_with_zone(as_object(obj), None)
}

// === Teardown ===

/// Zero every property, releasing owned references
///
/// Returns false if a nested release failed.
///
/// # Safety
/// `obj` must be a live object released to zero and not finalized yet.
#[no_mangle]
pub unsafe extern "C" fn orc_finalize_object(obj: *mut c_void) -> bool {
    let (Some(runtime), Some(object)) = (RUNTIME.get(), as_object(obj)) else {
        return false;
    };
    match runtime.finalize_zeroing(object) {
        Ok(_) => true,
        Err(e) => {
            log::error!("Finalization of {:?} failed: {}", object, e);
            false
        },
    }
}

/// Return the memory of `obj`; properties are not touched
///
/// # Safety
/// `obj` must be null or a live, finalized object. It dangles afterwards.
#[no_mangle]
pub unsafe extern "C" fn orc_deallocate_object(obj: *mut c_void) {
    if let (Some(runtime), Some(object)) = (RUNTIME.get(), as_object(obj)) {
        runtime.deallocate(object);
    }
}

/// Give up one reference; on zero, finalize and deallocate
///
/// Returns true if the object was destroyed.
///
/// # Safety
/// As for `orc_decrement_extra_ref_count_was_zero`.
#[no_mangle]
pub unsafe extern "C" fn orc_release_object(obj: *mut c_void) -> bool {
    let Some(runtime) = RUNTIME.get() else {
        return false;
    };
    match runtime.release_zeroing(as_object(obj)) {
        Ok(destroyed) => destroyed,
        Err(e) => {
            log::error!("Release of {:p} failed: {}", obj, e);
            false
        },
    }
}

// === Diagnostics ===

/// Lifecycle statistics as a JSON string
///
/// The string is allocated with `malloc`; release it with
/// `orc_string_free`. Null if the runtime is unavailable.
#[no_mangle]
pub extern "C" fn orc_runtime_stats_json() -> *mut c_char {
    let Some(runtime) = runtime() else {
        return std::ptr::null_mut();
    };
    let json = runtime.stats().to_json();

    unsafe {
        let ptr = libc::malloc(json.len() + 1).cast::<u8>();
        if ptr.is_null() {
            return std::ptr::null_mut();
        }
        std::ptr::copy_nonoverlapping(json.as_ptr(), ptr, json.len());
        *ptr.add(json.len()) = 0;
        ptr.cast()
    }
}

/// # Safety
/// `ptr` must be null or come from `orc_runtime_stats_json`.
#[no_mangle]
pub unsafe extern "C" fn orc_string_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        libc::free(ptr.cast());
    }
}
