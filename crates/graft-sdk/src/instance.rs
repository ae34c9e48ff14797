//! Host object instances embedding a native value
//!
//! An [`Instance<T>`] is the host-allocated storage of one object of an
//! extension type: the host header followed by a slot holding `T`. The host
//! allocates the storage zeroed; the value is constructed into it exactly
//! once and dropped exactly once, by the synthesized destructor.

use std::mem::MaybeUninit;
use std::ptr;

use crate::error::ErrorKind;
use crate::host;
use crate::number::NumberMethods;
use crate::object::{release, Object, ObjectLayout};
use crate::type_object::{self, NewFunc, ReprFunc, TypeObject};

// ============================================================================
// Extension
// ============================================================================

/// A native type made visible to the host.
///
/// Usually implemented by `#[derive(Extension)]` or [`extension!`](crate::extension),
/// both of which fill [`slots`](Extension::slots) from capability probes.
pub trait Extension: Sized + 'static {
    /// Default host-visible name
    const NAME: &'static str;

    /// Default docstring
    const DOC: &'static str = "";

    /// Slots synthesized for this type
    fn slots() -> ExtensionSlots;
}

/// Slots an [`Extension`] contributes to its descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionSlots {
    pub new: Option<NewFunc>,
    pub str: Option<ReprFunc>,
    pub repr: Option<ReprFunc>,
    /// Present for numeric types
    pub number: Option<NumberMethods>,
}

// ============================================================================
// Instance
// ============================================================================

/// Storage layout of an extension object.
#[repr(C)]
pub struct Instance<T> {
    head: Object,
    initialized: bool,
    value: MaybeUninit<T>,
}

unsafe impl<T> ObjectLayout for Instance<T> {}

impl<T: Extension> Instance<T> {
    /// Sealed descriptor of `T`
    pub fn type_object() -> Option<&'static TypeObject> {
        type_object::lookup::<T>()
    }

    /// Reinterpret `obj` if it is an instance of exactly `T`.
    ///
    /// # Safety
    /// `obj` must be null or point to a live host object.
    pub unsafe fn cast(obj: *mut Object) -> Option<*mut Self> {
        if obj.is_null() {
            return None;
        }
        let kind = Self::type_object()?;
        ptr::eq((*obj).kind, kind).then_some(obj as *mut Self)
    }

    /// Wrap `value` in a new object, bypassing the host's `new` and `init`.
    ///
    /// Returns null with the error indicator set when `T` is not registered
    /// or allocation fails.
    pub fn make(value: T) -> *mut Object {
        let Some(kind) = Self::type_object() else {
            host::raise(
                ErrorKind::TypeError,
                &format!("extension type '{}' is not registered", T::NAME),
            );
            return ptr::null_mut();
        };
        let Some(alloc) = kind.alloc else {
            host::raise(ErrorKind::SystemError, &format!("type '{}' has no allocator", kind.name));
            return ptr::null_mut();
        };
        unsafe {
            let obj = alloc(kind, 0);
            if !obj.is_null() {
                (*(obj as *mut Self)).emplace(value);
            }
            obj
        }
    }

    /// Instantiate through the host protocol: `new`, then `init`.
    ///
    /// The new object is released again when `init` fails.
    ///
    /// # Safety
    /// `args` and `kwds` must be null or live host objects.
    pub unsafe fn make_with(args: *mut Object, kwds: *mut Object) -> *mut Object {
        let Some(kind) = Self::type_object() else {
            host::raise(
                ErrorKind::TypeError,
                &format!("extension type '{}' is not registered", T::NAME),
            );
            return ptr::null_mut();
        };
        let Some(new) = kind.new else {
            host::raise(ErrorKind::TypeError, &format!("cannot create '{}' instances", kind.name));
            return ptr::null_mut();
        };
        let obj = new(kind, args, kwds);
        if obj.is_null() {
            return obj;
        }
        if let Some(init) = kind.init {
            if init(obj, args, kwds) < 0 {
                release(obj);
                return ptr::null_mut();
            }
        }
        obj
    }
}

impl<T> Instance<T> {
    /// Whether the embedded value has been constructed
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The embedded value, once constructed
    pub fn get(&self) -> Option<&T> {
        if self.initialized {
            Some(unsafe { self.value.assume_init_ref() })
        } else {
            None
        }
    }

    /// The embedded value, once constructed
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.initialized {
            Some(unsafe { self.value.assume_init_mut() })
        } else {
            None
        }
    }

    /// Construct the embedded value, replacing (and dropping) any previous one
    pub fn emplace(&mut self, value: T) -> &mut T {
        self.drop_value();
        self.initialized = true;
        self.value.write(value)
    }

    /// The object header
    pub fn as_object(&mut self) -> *mut Object {
        &mut self.head
    }

    pub(crate) fn drop_value(&mut self) {
        if self.initialized {
            self.initialized = false;
            unsafe { self.value.assume_init_drop() };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn blank<T>() -> Instance<T> {
        static KIND: TypeObject = TypeObject::new("blank");
        Instance {
            head: Object::new(&KIND),
            initialized: false,
            value: MaybeUninit::uninit(),
        }
    }

    #[test]
    fn test_uninitialized_has_no_value() {
        let mut instance = blank::<i32>();
        assert!(!instance.is_initialized());
        assert!(instance.get().is_none());
        assert!(instance.get_mut().is_none());
    }

    #[test]
    fn test_emplace_then_drop_exactly_once() {
        let tracker = Rc::new(());
        let mut instance = blank::<Rc<()>>();
        instance.emplace(Rc::clone(&tracker));
        assert_eq!(Rc::strong_count(&tracker), 2);

        instance.emplace(Rc::clone(&tracker));
        assert_eq!(Rc::strong_count(&tracker), 2);

        instance.drop_value();
        instance.drop_value();
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[test]
    fn test_get_mut_writes_through() {
        let mut instance = blank::<Vec<i32>>();
        instance.emplace(vec![1, 2]);
        if let Some(v) = instance.get_mut() {
            v.push(3);
        }
        assert_eq!(instance.get(), Some(&vec![1, 2, 3]));
        instance.drop_value();
    }
}
