//! Method descriptor classifier
//!
//! A host function is registered with one of three calling conventions, and
//! the convention is read off the function pointer's shape at compile time:
//!
//! - `(receiver, args, kwds)` ⇒ [`CallConvention::Keywords`]
//! - exactly [`CFunction`] ⇒ [`CallConvention::Positional`]
//! - any other two-pointer shape with a typed instance ⇒ [`CallConvention::SingleObject`]
//!
//! Any other arity does not implement [`MethodFn`] and fails to build:
//!
//! ```compile_fail
//! use graft_sdk::{MethodDef, Object};
//!
//! unsafe extern "C" fn unary(_: *mut Object) -> *mut Object {
//!     std::ptr::null_mut()
//! }
//!
//! MethodDef::new("unary", unary as unsafe extern "C" fn(_) -> _, "");
//! ```
//!
//! ```compile_fail
//! use graft_sdk::{MethodDef, Object};
//!
//! unsafe extern "C" fn quaternary(
//!     _: *mut Object,
//!     _: *mut Object,
//!     _: *mut Object,
//!     _: *mut Object,
//! ) -> *mut Object {
//!     std::ptr::null_mut()
//! }
//!
//! MethodDef::new("quaternary", quaternary as unsafe extern "C" fn(_, _, _, _) -> _, "");
//! ```
//!
//! So does a receiver that is not an object layout:
//!
//! ```compile_fail
//! use graft_sdk::{MethodDef, Object};
//!
//! unsafe extern "C" fn by_int(_: *mut i32, _: *mut Object, _: *mut Object) -> *mut Object {
//!     std::ptr::null_mut()
//! }
//!
//! MethodDef::new("by_int", by_int as unsafe extern "C" fn(_, _, _) -> _, "");
//! ```

use std::fmt;
use std::mem;

use crate::instance::{Extension, Instance};
use crate::object::{Object, ObjectLayout};

/// Host calling convention tags.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallConvention {
    /// `(self, args)`, arguments as one tuple
    Positional = 0x1,
    /// `(self, args, kwds)`
    Keywords = 0x3,
    /// `(self, arg)`, exactly one argument passed unpacked
    SingleObject = 0x8,
}

impl CallConvention {
    /// Host flag value
    pub fn flags(self) -> i32 {
        self as i32
    }
}

/// The host's generic-call adapter shape
pub type CFunction = unsafe extern "C" fn(*mut Object, *mut Object) -> *mut Object;

/// Positional-plus-keyword shape
pub type KeywordFunction = unsafe extern "C" fn(*mut Object, *mut Object, *mut Object) -> *mut Object;

/// Stored function pointer, erased to the shape its convention implies.
#[derive(Clone, Copy)]
pub enum MethodPtr {
    /// Called as `(self, args)` or `(self, arg)`
    Binary(CFunction),
    /// Called as `(self, args, kwds)`
    Keywords(KeywordFunction),
}

impl fmt::Debug for MethodPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodPtr::Binary(func) => write!(f, "Binary({:p})", *func as *const ()),
            MethodPtr::Keywords(func) => write!(f, "Keywords({:p})", *func as *const ()),
        }
    }
}

/// A function pointer shape the host can call.
pub trait MethodFn {
    /// Convention implied by the shape
    const CONVENTION: CallConvention;

    /// Erase to the stored form
    fn erase(self) -> MethodPtr;
}

impl MethodFn for CFunction {
    const CONVENTION: CallConvention = CallConvention::Positional;

    fn erase(self) -> MethodPtr {
        MethodPtr::Binary(self)
    }
}

// Typed single-object shapes. `Instance<T>` starts with the object header, so
// the erased pointer is ABI-identical.

impl<T: Extension> MethodFn for unsafe extern "C" fn(*mut Instance<T>, *mut Object) -> *mut Object {
    const CONVENTION: CallConvention = CallConvention::SingleObject;

    fn erase(self) -> MethodPtr {
        MethodPtr::Binary(unsafe { mem::transmute::<Self, CFunction>(self) })
    }
}

impl<T: Extension> MethodFn for unsafe extern "C" fn(*mut Object, *mut Instance<T>) -> *mut Object {
    const CONVENTION: CallConvention = CallConvention::SingleObject;

    fn erase(self) -> MethodPtr {
        MethodPtr::Binary(unsafe { mem::transmute::<Self, CFunction>(self) })
    }
}

impl<T: Extension, U: Extension> MethodFn
    for unsafe extern "C" fn(*mut Instance<T>, *mut Instance<U>) -> *mut Object
{
    const CONVENTION: CallConvention = CallConvention::SingleObject;

    fn erase(self) -> MethodPtr {
        MethodPtr::Binary(unsafe { mem::transmute::<Self, CFunction>(self) })
    }
}

impl<S: ObjectLayout> MethodFn for unsafe extern "C" fn(*mut S, *mut Object, *mut Object) -> *mut Object {
    const CONVENTION: CallConvention = CallConvention::Keywords;

    fn erase(self) -> MethodPtr {
        MethodPtr::Keywords(unsafe { mem::transmute::<Self, KeywordFunction>(self) })
    }
}

/// One entry of a module's method table.
#[derive(Debug, Clone, Copy)]
pub struct MethodDef {
    pub name: &'static str,
    pub func: MethodPtr,
    pub convention: CallConvention,
    pub doc: &'static str,
}

impl MethodDef {
    /// Classify `func` and build the entry
    pub fn new<F: MethodFn>(name: &'static str, func: F, doc: &'static str) -> Self {
        MethodDef {
            name,
            func: func.erase(),
            convention: F::CONVENTION,
            doc,
        }
    }
}
