//! Conversion of native results into host values
//!
//! [`IntoHost`] is the "result can construct a host generic value" capability
//! the prober looks for when an operator's result type is not the extended
//! type itself.

use std::fmt::Display;
use std::ptr;

use crate::error::ErrorKind;
use crate::host;
use crate::object::{Handle, Object};

/// Convert a native value into a new host reference.
///
/// Returns null with the host error indicator set when the value cannot be
/// represented (or when no host is installed).
pub trait IntoHost {
    /// Produce a new reference
    fn into_host(self) -> *mut Object;
}

impl IntoHost for bool {
    fn into_host(self) -> *mut Object {
        host::current().map_or(ptr::null_mut(), |h| h.new_bool(self))
    }
}

macro_rules! lossless_int {
    ($($ty:ty),*) => {
        $(
            impl IntoHost for $ty {
                fn into_host(self) -> *mut Object {
                    host::current().map_or(ptr::null_mut(), |h| h.new_int(i64::from(self)))
                }
            }
        )*
    };
}

lossless_int!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! checked_int {
    ($($ty:ty),*) => {
        $(
            impl IntoHost for $ty {
                fn into_host(self) -> *mut Object {
                    let Some(h) = host::current() else {
                        return ptr::null_mut();
                    };
                    match i64::try_from(self) {
                        Ok(value) => h.new_int(value),
                        Err(_) => {
                            h.set_error(
                                ErrorKind::OverflowError,
                                &format!("{} does not fit a host integer", self),
                            );
                            ptr::null_mut()
                        }
                    }
                }
            }
        )*
    };
}

checked_int!(u64, isize, usize, i128, u128);

impl IntoHost for f32 {
    fn into_host(self) -> *mut Object {
        f64::from(self).into_host()
    }
}

impl IntoHost for f64 {
    fn into_host(self) -> *mut Object {
        host::current().map_or(ptr::null_mut(), |h| h.new_float(self))
    }
}

impl IntoHost for &str {
    fn into_host(self) -> *mut Object {
        host::current().map_or(ptr::null_mut(), |h| h.new_str(self))
    }
}

impl IntoHost for String {
    fn into_host(self) -> *mut Object {
        self.as_str().into_host()
    }
}

impl IntoHost for Vec<u8> {
    fn into_host(self) -> *mut Object {
        host::current().map_or(ptr::null_mut(), |h| h.new_bytes(&self))
    }
}

impl IntoHost for () {
    fn into_host(self) -> *mut Object {
        host::current().map_or(ptr::null_mut(), |h| h.none())
    }
}

impl IntoHost for Handle {
    fn into_host(self) -> *mut Object {
        self.into_raw()
    }
}

impl<T: IntoHost> IntoHost for Option<T> {
    fn into_host(self) -> *mut Object {
        match self {
            Some(value) => value.into_host(),
            None => ().into_host(),
        }
    }
}

impl<T: IntoHost, E: Display> IntoHost for Result<T, E> {
    fn into_host(self) -> *mut Object {
        match self {
            Ok(value) => value.into_host(),
            Err(err) => {
                host::raise(ErrorKind::RuntimeError, &err.to_string());
                ptr::null_mut()
            }
        }
    }
}
