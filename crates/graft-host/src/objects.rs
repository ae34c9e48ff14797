//! Builtin object kinds and the generic allocator
//!
//! Builtins are boxed `#[repr(C)]` structs starting with the object header.
//! `None`, `True`, `False` and `NotImplemented` are immortal statics.
//! Extension kinds get [`generic_alloc`] / [`generic_free`] when readied:
//! zeroed storage sized by the descriptor, header written with one reference.

use std::alloc::{self, Layout};
use std::cell::UnsafeCell;
use std::collections::BTreeMap;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use graft_sdk::{Handle, ModuleDef, Object, TypeObject};

// ============================================================================
// Builtin Layouts
// ============================================================================

/// `int`
#[repr(C)]
pub struct IntObject {
    head: Object,
    pub value: i64,
}

/// `float`
#[repr(C)]
pub struct FloatObject {
    head: Object,
    pub value: f64,
}

/// `str`
#[repr(C)]
pub struct StrObject {
    head: Object,
    pub value: String,
}

/// `bytes`
#[repr(C)]
pub struct BytesObject {
    head: Object,
    pub value: Vec<u8>,
}

/// `tuple`
#[repr(C)]
pub struct TupleObject {
    head: Object,
    pub items: Vec<Handle>,
}

/// Module attribute
#[derive(Debug, Clone)]
pub enum Attr {
    /// An extension kind
    Type(&'static TypeObject),
    /// Any object
    Object(Handle),
}

/// `module`
#[repr(C)]
pub struct ModuleObject {
    head: Object,
    pub def: &'static ModuleDef,
    pub attrs: BTreeMap<String, Attr>,
}

// ============================================================================
// Builtin Kinds
// ============================================================================

macro_rules! boxed_kind {
    ($static:ident, $name:literal, $layout:ty) => {
        /// Kind descriptor
        pub static $static: TypeObject = TypeObject {
            basic_size: mem::size_of::<$layout>(),
            basic_align: mem::align_of::<$layout>(),
            dealloc: Some(dealloc_boxed::<$layout>),
            ..TypeObject::new($name)
        };
    };
}

boxed_kind!(INT_TYPE, "int", IntObject);
boxed_kind!(FLOAT_TYPE, "float", FloatObject);
boxed_kind!(STR_TYPE, "str", StrObject);
boxed_kind!(BYTES_TYPE, "bytes", BytesObject);
boxed_kind!(TUPLE_TYPE, "tuple", TupleObject);
boxed_kind!(MODULE_TYPE, "module", ModuleObject);

/// Kind of `None`
pub static NONE_TYPE: TypeObject = TypeObject::new("NoneType");
/// Kind of `True` and `False`
pub static BOOL_TYPE: TypeObject = TypeObject::new("bool");
/// Kind of `NotImplemented`
pub static NOT_IMPLEMENTED_TYPE: TypeObject = TypeObject::new("NotImplementedType");

unsafe extern "C" fn dealloc_boxed<B>(obj: *mut Object) {
    drop(Box::from_raw(obj as *mut B));
}

fn boxed<B>(value: B) -> *mut Object {
    Box::into_raw(Box::new(value)) as *mut Object
}

// ============================================================================
// Singletons
// ============================================================================

struct Singleton(UnsafeCell<Object>);

// Immortal: the header is never written after initialization.
unsafe impl Sync for Singleton {}

impl Singleton {
    fn ptr(&self) -> *mut Object {
        self.0.get()
    }
}

static NONE: Singleton = Singleton(UnsafeCell::new(Object::immortal(&NONE_TYPE)));
static TRUE: Singleton = Singleton(UnsafeCell::new(Object::immortal(&BOOL_TYPE)));
static FALSE: Singleton = Singleton(UnsafeCell::new(Object::immortal(&BOOL_TYPE)));
static NOT_IMPLEMENTED: Singleton =
    Singleton(UnsafeCell::new(Object::immortal(&NOT_IMPLEMENTED_TYPE)));

/// `None`
pub fn none_ptr() -> *mut Object {
    NONE.ptr()
}

/// `True` or `False`
pub fn bool_ptr(value: bool) -> *mut Object {
    if value {
        TRUE.ptr()
    } else {
        FALSE.ptr()
    }
}

/// `NotImplemented`
pub fn not_implemented_ptr() -> *mut Object {
    NOT_IMPLEMENTED.ptr()
}

// ============================================================================
// Constructors
// ============================================================================

fn owned(ptr: *mut Object) -> Handle {
    // Constructors below never return null.
    match unsafe { Handle::from_owned(ptr) } {
        Some(handle) => handle,
        None => unreachable!("builtin constructor returned null"),
    }
}

/// `None`
pub fn none() -> Handle {
    owned(none_ptr())
}

/// `True` or `False`
pub fn boolean(value: bool) -> Handle {
    owned(bool_ptr(value))
}

/// `int`
pub fn int(value: i64) -> Handle {
    owned(boxed(IntObject {
        head: Object::new(&INT_TYPE),
        value,
    }))
}

/// `float`
pub fn float(value: f64) -> Handle {
    owned(boxed(FloatObject {
        head: Object::new(&FLOAT_TYPE),
        value,
    }))
}

/// `str`
pub fn string(value: impl Into<String>) -> Handle {
    owned(boxed(StrObject {
        head: Object::new(&STR_TYPE),
        value: value.into(),
    }))
}

/// `bytes`
pub fn bytes(value: impl Into<Vec<u8>>) -> Handle {
    owned(boxed(BytesObject {
        head: Object::new(&BYTES_TYPE),
        value: value.into(),
    }))
}

/// `tuple`
pub fn tuple(items: Vec<Handle>) -> Handle {
    owned(boxed(TupleObject {
        head: Object::new(&TUPLE_TYPE),
        items,
    }))
}

/// `module` wrapping a process-lifetime definition
pub fn module(def: &'static ModuleDef) -> Handle {
    owned(boxed(ModuleObject {
        head: Object::new(&MODULE_TYPE),
        def,
        attrs: BTreeMap::new(),
    }))
}

// ============================================================================
// Downcasts
// ============================================================================

macro_rules! downcast {
    ($fn:ident, $kind:ident, $layout:ty) => {
        /// Borrow `obj` as this layout when it has exactly this kind.
        ///
        /// # Safety
        /// `obj` must be null or a live object, and stay alive for `'a`.
        pub unsafe fn $fn<'a>(obj: *mut Object) -> Option<&'a mut $layout> {
            if !obj.is_null() && ptr::eq((*obj).kind, &$kind) {
                Some(&mut *(obj as *mut $layout))
            } else {
                None
            }
        }
    };
}

downcast!(as_int_object, INT_TYPE, IntObject);
downcast!(as_float_object, FLOAT_TYPE, FloatObject);
downcast!(as_str_object, STR_TYPE, StrObject);
downcast!(as_bytes_object, BYTES_TYPE, BytesObject);
downcast!(as_tuple_object, TUPLE_TYPE, TupleObject);
downcast!(as_module_object, MODULE_TYPE, ModuleObject);

/// Whether `obj` is one of the host's own kinds
pub fn is_builtin(kind: &TypeObject) -> bool {
    [
        &INT_TYPE,
        &FLOAT_TYPE,
        &STR_TYPE,
        &BYTES_TYPE,
        &TUPLE_TYPE,
        &MODULE_TYPE,
        &NONE_TYPE,
        &BOOL_TYPE,
        &NOT_IMPLEMENTED_TYPE,
    ]
    .into_iter()
    .any(|builtin| ptr::eq(builtin, kind))
}

// ============================================================================
// Generic Allocator
// ============================================================================

static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
static FREED: AtomicUsize = AtomicUsize::new(0);

/// Counts of extension objects allocated and freed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocStats {
    /// Successful `generic_alloc` calls
    pub allocated: usize,
    /// `generic_free` calls
    pub freed: usize,
}

/// Current allocator counters
pub fn alloc_stats() -> AllocStats {
    AllocStats {
        allocated: ALLOCATED.load(Ordering::Relaxed),
        freed: FREED.load(Ordering::Relaxed),
    }
}

fn layout_of(kind: &TypeObject) -> Option<Layout> {
    Layout::from_size_align(kind.basic_size, kind.basic_align).ok()
}

/// Zeroed storage for one instance of `kind`, header initialized.
///
/// # Safety
/// `kind` must point to a readied descriptor that outlives the object.
pub unsafe extern "C" fn generic_alloc(kind: *const TypeObject, _items: isize) -> *mut Object {
    let Some(layout) = layout_of(&*kind) else {
        crate::error::set_error(graft_sdk::ErrorKind::SystemError, "invalid instance layout");
        return ptr::null_mut();
    };
    let obj = alloc::alloc_zeroed(layout) as *mut Object;
    if obj.is_null() {
        crate::error::set_error(graft_sdk::ErrorKind::MemoryError, "out of memory");
        return obj;
    }
    obj.write(Object { refcnt: 1, kind });
    ALLOCATED.fetch_add(1, Ordering::Relaxed);
    obj
}

/// Return storage obtained from [`generic_alloc`].
///
/// # Safety
/// `obj` must come from `generic_alloc` and not be used afterwards.
pub unsafe extern "C" fn generic_free(obj: *mut Object) {
    if let Some(layout) = layout_of(&*(*obj).kind) {
        alloc::dealloc(obj as *mut u8, layout);
        FREED.fetch_add(1, Ordering::Relaxed);
    }
}
