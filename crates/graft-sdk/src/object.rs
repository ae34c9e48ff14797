//! Host object header and reference handles
//!
//! Every host object starts with an [`Object`] header: a reference count
//! followed by a pointer to the object's kind. The header is owned by the
//! host; native storage follows it (see [`Instance`](crate::Instance)).

use std::ptr::NonNull;

use crate::type_object::TypeObject;

// ============================================================================
// Object Header
// ============================================================================

/// Fixed-size header shared by every host object.
#[repr(C)]
#[derive(Debug)]
pub struct Object {
    /// Reference count. Negative means immortal.
    pub refcnt: isize,
    /// Kind descriptor of this object
    pub kind: *const TypeObject,
}

/// Reference count given to immortal objects.
///
/// `retain` and `release` never touch an immortal count, so host singletons
/// can be shared freely.
pub const IMMORTAL: isize = isize::MIN / 2;

impl Object {
    /// Header for a freshly allocated object holding one reference
    pub const fn new(kind: &'static TypeObject) -> Self {
        Object {
            refcnt: 1,
            kind: kind as *const TypeObject,
        }
    }

    /// Header for an object that is never deallocated
    pub const fn immortal(kind: &'static TypeObject) -> Self {
        Object {
            refcnt: IMMORTAL,
            kind: kind as *const TypeObject,
        }
    }
}

/// Marker for `#[repr(C)]` layouts that begin with an [`Object`] header.
///
/// A pointer to an implementor may be reinterpreted as `*mut Object`. Method
/// and slot registration only accept receivers whose pointee implements this.
///
/// # Safety
///
/// The implementor must be `#[repr(C)]` with an `Object` as its first field.
pub unsafe trait ObjectLayout {}

unsafe impl ObjectLayout for Object {}

// ============================================================================
// Reference Counting
// ============================================================================

/// Add a reference. Null and immortal objects are ignored.
///
/// # Safety
/// `obj` must be null or point to a live host object.
#[inline]
pub unsafe fn retain(obj: *mut Object) {
    if obj.is_null() || (*obj).refcnt < 0 {
        return;
    }
    (*obj).refcnt += 1;
}

/// Drop a reference, destroying the object when the count reaches zero.
///
/// Destruction calls the kind's `dealloc` slot, or returns the storage to the
/// host through `free` when the kind has no destructor.
///
/// # Safety
/// `obj` must be null or point to a live host object owning at least one
/// reference held by the caller.
#[inline]
pub unsafe fn release(obj: *mut Object) {
    if obj.is_null() || (*obj).refcnt < 0 {
        return;
    }
    (*obj).refcnt -= 1;
    if (*obj).refcnt == 0 {
        let kind = &*(*obj).kind;
        if let Some(dealloc) = kind.dealloc {
            dealloc(obj);
        } else if let Some(free) = kind.free {
            free(obj);
        }
    }
}

/// Current reference count of `obj`.
///
/// # Safety
/// `obj` must point to a live host object.
pub unsafe fn refcount(obj: *mut Object) -> isize {
    (*obj).refcnt
}

/// Kind descriptor of `obj`.
///
/// # Safety
/// `obj` must point to a live host object.
pub unsafe fn kind_of<'a>(obj: *mut Object) -> &'a TypeObject {
    &*(*obj).kind
}

// ============================================================================
// Handle
// ============================================================================

/// Owned reference to a host object.
///
/// Cloning retains, dropping releases, [`Handle::into_raw`] hands the
/// reference to the caller without releasing it.
#[derive(Debug)]
pub struct Handle {
    ptr: NonNull<Object>,
}

impl Handle {
    /// Take ownership of a new reference. Returns `None` for null.
    ///
    /// # Safety
    /// `ptr` must be null or a new reference to a live host object.
    pub unsafe fn from_owned(ptr: *mut Object) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Handle { ptr })
    }

    /// Retain a borrowed reference. Returns `None` for null.
    ///
    /// # Safety
    /// `ptr` must be null or point to a live host object.
    pub unsafe fn from_borrowed(ptr: *mut Object) -> Option<Self> {
        let handle = Self::from_owned(ptr)?;
        retain(ptr);
        Some(handle)
    }

    /// Raw pointer, still owned by this handle
    pub fn as_ptr(&self) -> *mut Object {
        self.ptr.as_ptr()
    }

    /// Release-and-transfer: give the reference to the caller
    pub fn into_raw(self) -> *mut Object {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }

    /// Current reference count
    pub fn refcount(&self) -> isize {
        unsafe { refcount(self.as_ptr()) }
    }

    /// Kind descriptor of the referenced object
    pub fn kind(&self) -> &TypeObject {
        unsafe { kind_of(self.as_ptr()) }
    }

    /// Whether the referenced object is of exactly `kind`
    pub fn is_kind(&self, kind: &TypeObject) -> bool {
        std::ptr::eq(self.kind(), kind)
    }
}

impl Clone for Handle {
    fn clone(&self) -> Self {
        unsafe { retain(self.as_ptr()) };
        Handle { ptr: self.ptr }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        unsafe { release(self.as_ptr()) }
    }
}
