//! Type descriptor builder
//!
//! A [`TypeObject`] is the static metadata record the host needs to treat an
//! extension type as an object kind. [`register_type`] starts from the slots
//! synthesized for `T` (see [`Extension::slots`]), lets the embedding author
//! override name, constructor, string conversion and the operator table, then
//! [`TypeBuilder::seal`] hands the record to the host exactly once. A sealed
//! record is process-lifetime and immutable.

use std::any::TypeId;
use std::borrow::Cow;
use std::collections::HashMap;
use std::ffi::c_int;
use std::marker::PhantomData;
use std::mem;
use std::ptr;

use bitflags::bitflags;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::config::{Config, Truthiness};
use crate::error::{ErrorKind, GraftError, GraftResult};
use crate::host;
use crate::instance::{Extension, Instance};
use crate::number::NumberMethods;
use crate::object::{release, Object};
use crate::probe::catch_panic;

// ============================================================================
// Slot Signatures
// ============================================================================

/// Destroys an object whose reference count reached zero
pub type Destructor = unsafe extern "C" fn(*mut Object);

/// Returns object storage to the host allocator
pub type FreeFunc = unsafe extern "C" fn(*mut Object);

/// String conversion, returns a new reference
pub type ReprFunc = unsafe extern "C" fn(*mut Object) -> *mut Object;

/// Unary operator or conversion, returns a new reference
pub type UnaryFunc = unsafe extern "C" fn(*mut Object) -> *mut Object;

/// Binary operator, returns a new reference
pub type BinaryFunc = unsafe extern "C" fn(*mut Object, *mut Object) -> *mut Object;

/// Predicate: `1`, `0`, or `-1` with the error indicator set
pub type InquiryFunc = unsafe extern "C" fn(*mut Object) -> c_int;

/// Allocates zeroed storage with an initialized header
pub type AllocFunc = unsafe extern "C" fn(*const TypeObject, isize) -> *mut Object;

/// First half of instantiation: `(kind, args, kwds)`
pub type NewFunc = unsafe extern "C" fn(*const TypeObject, *mut Object, *mut Object) -> *mut Object;

/// Second half of instantiation: `(self, args, kwds)`, `0` or `-1`
pub type InitProc = unsafe extern "C" fn(*mut Object, *mut Object, *mut Object) -> c_int;

/// Initializer taking the typed instance as receiver
pub type InstanceInit<T> =
    unsafe extern "C" fn(*mut Instance<T>, *mut Object, *mut Object) -> c_int;

/// String conversion taking the typed instance as receiver
pub type InstanceRepr<T> = unsafe extern "C" fn(*mut Instance<T>) -> *mut Object;

bitflags! {
    /// Descriptor flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeFlags: u64 {
        /// Set on every descriptor
        const DEFAULT = 1 << 0;
        /// `number` points to an operator table
        const HAVE_NUMBER = 1 << 1;
        /// Accepted by the host
        const READY = 1 << 2;
        /// Instances without a bool slot are true
        const ALWAYS_TRUE = 1 << 3;
    }
}

// ============================================================================
// TypeObject
// ============================================================================

/// Per-kind metadata record.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TypeObject {
    pub name: &'static str,
    pub doc: &'static str,
    /// Instance size in bytes, header included
    pub basic_size: usize,
    pub basic_align: usize,
    pub flags: TypeFlags,
    pub dealloc: Option<Destructor>,
    pub repr: Option<ReprFunc>,
    pub str: Option<ReprFunc>,
    pub number: Option<&'static NumberMethods>,
    pub init: Option<InitProc>,
    pub alloc: Option<AllocFunc>,
    pub free: Option<FreeFunc>,
    pub new: Option<NewFunc>,
}

impl TypeObject {
    /// Empty record for a header-only kind
    pub const fn new(name: &'static str) -> Self {
        TypeObject {
            name,
            doc: "",
            basic_size: mem::size_of::<Object>(),
            basic_align: mem::align_of::<Object>(),
            flags: TypeFlags::DEFAULT,
            dealloc: None,
            repr: None,
            str: None,
            number: None,
            init: None,
            alloc: None,
            free: None,
            new: None,
        }
    }

    /// Whether the host accepted this record
    pub fn is_ready(&self) -> bool {
        self.flags.contains(TypeFlags::READY)
    }

    /// Operator table, if the kind is numeric
    pub fn number_methods(&self) -> Option<&'static NumberMethods> {
        self.number
    }
}

// ============================================================================
// Synthesized Adapters
// ============================================================================

/// Destructor of `Instance<T>`: drops the embedded value once, then frees.
unsafe extern "C" fn dealloc_instance<T: Extension>(obj: *mut Object) {
    (*(obj as *mut Instance<T>)).drop_value();
    if let Some(free) = (*(*obj).kind).free {
        free(obj);
    }
}

/// Allocate raw storage only; construction is left to `init`.
///
/// # Safety
/// `kind` must point to a ready descriptor.
pub unsafe extern "C" fn raw_new(
    kind: *const TypeObject,
    _args: *mut Object,
    _kwds: *mut Object,
) -> *mut Object {
    match (*kind).alloc {
        Some(alloc) => alloc(kind, 0),
        None => {
            host::raise(
                ErrorKind::SystemError,
                &format!("type '{}' has no allocator", (*kind).name),
            );
            ptr::null_mut()
        }
    }
}

/// Allocate, then default-construct the embedded value.
///
/// # Safety
/// `kind` must be the ready descriptor of `T`.
pub unsafe extern "C" fn default_new<T: Extension + Default>(
    kind: *const TypeObject,
    args: *mut Object,
    kwds: *mut Object,
) -> *mut Object {
    let obj = raw_new(kind, args, kwds);
    if obj.is_null() {
        return obj;
    }
    let built = catch_panic(ptr::null_mut(), || {
        (*(obj as *mut Instance<T>)).emplace(T::default());
        obj
    });
    if built.is_null() {
        // Storage never held a value; only the allocation is returned.
        release(obj);
    }
    built
}

unsafe extern "C" fn always_true(_obj: *mut Object) -> c_int {
    1
}

// ============================================================================
// Override Shapes
// ============================================================================

/// Function shapes accepted as an initializer for `T`.
///
/// ```compile_fail
/// # use graft_sdk::*;
/// # #[derive(Clone)] struct Point;
/// # graft_sdk::extension!(Point => "demo.Point");
/// unsafe extern "C" fn two_args(_: *mut Object, _: *mut Object) -> std::ffi::c_int { 0 }
/// register_type::<Point>().init(two_args as unsafe extern "C" fn(_, _) -> _);
/// ```
pub trait InitFn<T> {
    /// The host-shaped initializer
    fn into_init(self) -> InitProc;
}

impl<T> InitFn<T> for InitProc {
    fn into_init(self) -> InitProc {
        self
    }
}

impl<T: Extension> InitFn<T> for InstanceInit<T> {
    fn into_init(self) -> InitProc {
        // Instance<T> begins with the object header; the pointer ABI is identical.
        unsafe { mem::transmute::<InstanceInit<T>, InitProc>(self) }
    }
}

/// Function shapes accepted as a string conversion for `T`.
pub trait ReprFn<T> {
    /// The host-shaped conversion
    fn into_repr(self) -> ReprFunc;
}

impl<T> ReprFn<T> for ReprFunc {
    fn into_repr(self) -> ReprFunc {
        self
    }
}

impl<T: Extension> ReprFn<T> for InstanceRepr<T> {
    fn into_repr(self) -> ReprFunc {
        unsafe { mem::transmute::<InstanceRepr<T>, ReprFunc>(self) }
    }
}

// ============================================================================
// Registry
// ============================================================================

static REGISTRY: Lazy<RwLock<HashMap<TypeId, &'static TypeObject>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Sealed descriptor of `T`, if registered
pub fn lookup<T: 'static>() -> Option<&'static TypeObject> {
    REGISTRY.read().get(&TypeId::of::<T>()).copied()
}

/// Begin registering `T` with its synthesized slots.
pub fn register_type<T: Extension>() -> TypeBuilder<T> {
    TypeBuilder::new()
}

// ============================================================================
// TypeBuilder
// ============================================================================

/// Mutable-until-sealed descriptor of `T`.
pub struct TypeBuilder<T> {
    record: TypeObject,
    name: Cow<'static, str>,
    doc: Cow<'static, str>,
    number: Option<NumberMethods>,
    truthiness: Truthiness,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Extension> TypeBuilder<T> {
    fn new() -> Self {
        let slots = T::slots();
        let mut record = TypeObject::new(T::NAME);
        record.doc = T::DOC;
        record.basic_size = mem::size_of::<Instance<T>>();
        record.basic_align = mem::align_of::<Instance<T>>();
        record.dealloc = Some(dealloc_instance::<T>);
        record.new = slots.new;
        record.str = slots.str;
        record.repr = slots.repr;

        TypeBuilder {
            record,
            name: Cow::Borrowed(T::NAME),
            doc: Cow::Borrowed(T::DOC),
            number: slots.number,
            truthiness: crate::config::global().truthiness,
            _marker: PhantomData,
        }
    }

    /// Host-visible name, e.g. `"vec.Vec"`
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Docstring
    pub fn doc(mut self, doc: impl Into<Cow<'static, str>>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Replace the constructor
    pub fn new_with(mut self, new: NewFunc) -> Self {
        self.record.new = Some(new);
        self
    }

    /// Install an initializer
    pub fn init<F: InitFn<T>>(mut self, init: F) -> Self {
        self.record.init = Some(init.into_init());
        self
    }

    /// Replace the `str` conversion
    pub fn str<F: ReprFn<T>>(mut self, f: F) -> Self {
        self.record.str = Some(f.into_repr());
        self
    }

    /// Replace the `repr` conversion
    pub fn repr<F: ReprFn<T>>(mut self, f: F) -> Self {
        self.record.repr = Some(f.into_repr());
        self
    }

    /// Replace the operator table; `None` makes the kind non-numeric
    pub fn number(mut self, table: Option<NumberMethods>) -> Self {
        self.number = table;
        self
    }

    /// Truthiness of instances when `T` has no bool conversion
    pub fn truthiness(mut self, truthiness: Truthiness) -> Self {
        self.truthiness = truthiness;
        self
    }

    /// Apply the global default and the `[types."<name>"]` overrides of `config`
    pub fn configure(mut self, config: &Config) -> Self {
        self.truthiness = config.truthiness;
        if let Some(overrides) = config.types.get(T::NAME) {
            if let Some(name) = &overrides.name {
                self.name = Cow::Owned(name.clone());
            }
            if let Some(doc) = &overrides.doc {
                self.doc = Cow::Owned(doc.clone());
            }
            if let Some(truthiness) = overrides.truthiness {
                self.truthiness = truthiness;
            }
        }
        self
    }

    /// The record as it would be sealed, without the operator table pointer
    pub fn descriptor(&self) -> &TypeObject {
        &self.record
    }

    /// The pending operator table
    pub fn number_methods(&self) -> Option<&NumberMethods> {
        self.number.as_ref()
    }

    /// Hand the record to the host and freeze it.
    ///
    /// Fails with [`GraftError::AlreadyRegistered`] on a second registration
    /// of `T`, and with [`GraftError::NotReady`] when the host rejects it.
    pub fn seal(self) -> GraftResult<&'static TypeObject> {
        let host = host::require()?;
        if lookup::<T>().is_some() {
            return Err(GraftError::AlreadyRegistered(self.name.into_owned()));
        }

        let mut record = self.record;
        record.name = leak_str(self.name);
        record.doc = leak_str(self.doc);

        let mut number = self.number;
        if self.truthiness == Truthiness::AlwaysTrue {
            record.flags |= TypeFlags::ALWAYS_TRUE;
            if number.map_or(true, |n| n.is_empty()) {
                number = Some(NumberMethods {
                    boolean: Some(always_true),
                    ..NumberMethods::default()
                });
            }
        }
        if let Some(table) = number {
            record.number = Some(Box::leak(Box::new(table)));
            record.flags |= TypeFlags::HAVE_NUMBER;
        }

        // The host may look other kinds up while readying this one, so the
        // registry lock is not held here.
        host.ready(&mut record).map_err(|reason| GraftError::NotReady {
            name: record.name.to_string(),
            reason,
        })?;
        record.flags |= TypeFlags::READY;

        if let Some(table) = record.number {
            for slot in table.populated() {
                tracing::trace!(kind = record.name, %slot, "number slot synthesized");
            }
        }
        tracing::debug!(
            kind = record.name,
            size = record.basic_size,
            init = record.init.is_some(),
            str = record.str.is_some(),
            repr = record.repr.is_some(),
            "type sealed"
        );

        let mut registry = REGISTRY.write();
        if registry.contains_key(&TypeId::of::<T>()) {
            return Err(GraftError::AlreadyRegistered(record.name.to_string()));
        }
        let sealed: &'static TypeObject = Box::leak(Box::new(record));
        registry.insert(TypeId::of::<T>(), sealed);
        Ok(sealed)
    }
}

fn leak_str(value: Cow<'static, str>) -> &'static str {
    match value {
        Cow::Borrowed(s) => s,
        Cow::Owned(s) => Box::leak(s.into_boxed_str()),
    }
}
