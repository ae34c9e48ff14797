//! Argument marshaller
//!
//! Converts between native parameter lists and the host's generic call
//! representation using the descriptors from [`format`](crate::format).
//!
//! Parse direction: each scalar contributes one typed [`Dest`]; nested tuples
//! contribute their members' destinations in order; [`Optional`] contributes
//! nothing. The host primitive walks the descriptor and fills the
//! destinations. Build direction mirrors this with [`Src`] values.

use std::ptr;

use crate::format::{tags, ArgList, Buffer, FormatUnit, Optional, StrObject};
use crate::host::{self, HostRuntime};
use crate::object::{Handle, Object};

// ============================================================================
// Destinations and Sources
// ============================================================================

/// One typed parse destination.
#[derive(Debug)]
pub enum Dest<'a> {
    /// `b`
    U8(&'a mut u8),
    /// `h`
    I16(&'a mut i16),
    /// `H`
    U16(&'a mut u16),
    /// `i`
    I32(&'a mut i32),
    /// `I`
    U32(&'a mut u32),
    /// `L`
    I64(&'a mut i64),
    /// `K`
    U64(&'a mut u64),
    /// `n`
    Size(&'a mut isize),
    /// `f`
    F32(&'a mut f32),
    /// `d`
    F64(&'a mut f64),
    /// `p`
    Bool(&'a mut bool),
    /// `s`
    Str(&'a mut String),
    /// `s*`
    Buffer(&'a mut Buffer),
    /// `O`, borrowed
    Object(&'a mut *mut Object),
    /// `S`, borrowed
    StrObject(&'a mut StrObject),
}

impl Dest<'_> {
    /// Grammar tag this destination answers to
    pub fn tag(&self) -> &'static str {
        match self {
            Dest::U8(_) => tags::U8,
            Dest::I16(_) => tags::I16,
            Dest::U16(_) => tags::U16,
            Dest::I32(_) => tags::I32,
            Dest::U32(_) => tags::U32,
            Dest::I64(_) => tags::I64,
            Dest::U64(_) => tags::U64,
            Dest::Size(_) => tags::SIZE,
            Dest::F32(_) => tags::F32,
            Dest::F64(_) => tags::F64,
            Dest::Bool(_) => tags::BOOL,
            Dest::Str(_) => tags::STR,
            Dest::Buffer(_) => tags::BUFFER,
            Dest::Object(_) => tags::OBJECT,
            Dest::StrObject(_) => tags::STR_OBJECT,
        }
    }
}

/// One typed build source.
#[derive(Debug, Clone)]
pub enum Src {
    /// `b`
    U8(u8),
    /// `h`
    I16(i16),
    /// `H`
    U16(u16),
    /// `i`
    I32(i32),
    /// `I`
    U32(u32),
    /// `L`
    I64(i64),
    /// `K`
    U64(u64),
    /// `n`
    Size(isize),
    /// `f`
    F32(f32),
    /// `d`
    F64(f64),
    /// `p`
    Bool(bool),
    /// `s`
    Str(String),
    /// `s*`
    Buffer(Vec<u8>),
    /// `O`, retained by the host
    Object(*mut Object),
    /// `S`, retained by the host
    StrObject(*mut Object),
}

impl Src {
    /// Grammar tag this source answers to
    pub fn tag(&self) -> &'static str {
        match self {
            Src::U8(_) => tags::U8,
            Src::I16(_) => tags::I16,
            Src::U16(_) => tags::U16,
            Src::I32(_) => tags::I32,
            Src::U32(_) => tags::U32,
            Src::I64(_) => tags::I64,
            Src::U64(_) => tags::U64,
            Src::Size(_) => tags::SIZE,
            Src::F32(_) => tags::F32,
            Src::F64(_) => tags::F64,
            Src::Bool(_) => tags::BOOL,
            Src::Str(_) => tags::STR,
            Src::Buffer(_) => tags::BUFFER,
            Src::Object(_) => tags::OBJECT,
            Src::StrObject(_) => tags::STR_OBJECT,
        }
    }
}

// ============================================================================
// Unit Traits
// ============================================================================

/// A format unit that can receive a parsed value.
pub trait ParseUnit: FormatUnit {
    /// Push this unit's destinations, left to right
    fn dests<'a>(&'a mut self, out: &mut Vec<Dest<'a>>);
}

/// A format unit that can be packed into a host value.
pub trait BuildUnit: FormatUnit {
    /// Push this unit's sources, left to right
    fn srcs(&self, out: &mut Vec<Src>);
}

/// A top-level parameter list that can be parsed.
pub trait ParseArgs: ArgList {
    /// Push the destinations of every parameter, left to right
    fn dests<'a>(&'a mut self, out: &mut Vec<Dest<'a>>);
}

/// A top-level value list that can be built.
pub trait BuildArgs: ArgList {
    /// Push the sources of every value, left to right
    fn srcs(&self, out: &mut Vec<Src>);
}

macro_rules! scalar_marshal {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ParseUnit for $ty {
                fn dests<'a>(&'a mut self, out: &mut Vec<Dest<'a>>) {
                    out.push(Dest::$variant(self));
                }
            }

            impl BuildUnit for $ty {
                fn srcs(&self, out: &mut Vec<Src>) {
                    out.push(Src::$variant(self.clone()));
                }
            }
        )*
    };
}

scalar_marshal! {
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    isize => Size,
    f32 => F32,
    f64 => F64,
    bool => Bool,
    String => Str,
    *mut Object => Object,
}

impl ParseUnit for Buffer {
    fn dests<'a>(&'a mut self, out: &mut Vec<Dest<'a>>) {
        out.push(Dest::Buffer(self));
    }
}

impl BuildUnit for Buffer {
    fn srcs(&self, out: &mut Vec<Src>) {
        out.push(Src::Buffer(self.0.clone()));
    }
}

impl ParseUnit for StrObject {
    fn dests<'a>(&'a mut self, out: &mut Vec<Dest<'a>>) {
        out.push(Dest::StrObject(self));
    }
}

impl BuildUnit for StrObject {
    fn srcs(&self, out: &mut Vec<Src>) {
        out.push(Src::StrObject(self.0));
    }
}

impl BuildUnit for Handle {
    fn srcs(&self, out: &mut Vec<Src>) {
        out.push(Src::Object(self.as_ptr()));
    }
}

impl ParseUnit for Optional {
    fn dests<'a>(&'a mut self, _out: &mut Vec<Dest<'a>>) {}
}

impl BuildUnit for Optional {
    fn srcs(&self, _out: &mut Vec<Src>) {}
}

impl ParseArgs for () {
    fn dests<'a>(&'a mut self, _out: &mut Vec<Dest<'a>>) {}
}

impl BuildArgs for () {
    fn srcs(&self, _out: &mut Vec<Src>) {}
}

macro_rules! tuple_marshal {
    ($($name:ident),+) => {
        impl<$($name: ParseUnit),+> ParseUnit for ($($name,)+) {
            #[allow(non_snake_case)]
            fn dests<'a>(&'a mut self, out: &mut Vec<Dest<'a>>) {
                let ($($name,)+) = self;
                $($name.dests(out);)+
            }
        }

        impl<$($name: BuildUnit),+> BuildUnit for ($($name,)+) {
            #[allow(non_snake_case)]
            fn srcs(&self, out: &mut Vec<Src>) {
                let ($($name,)+) = self;
                $($name.srcs(out);)+
            }
        }

        impl<$($name: ParseUnit),+> ParseArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn dests<'a>(&'a mut self, out: &mut Vec<Dest<'a>>) {
                let ($($name,)+) = self;
                $($name.dests(out);)+
            }
        }

        impl<$($name: BuildUnit),+> BuildArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn srcs(&self, out: &mut Vec<Src>) {
                let ($($name,)+) = self;
                $($name.srcs(out);)+
            }
        }
    };
}

tuple_marshal!(A);
tuple_marshal!(A, B);
tuple_marshal!(A, B, C);
tuple_marshal!(A, B, C, D);
tuple_marshal!(A, B, C, D, E);
tuple_marshal!(A, B, C, D, E, F);
tuple_marshal!(A, B, C, D, E, F, G);
tuple_marshal!(A, B, C, D, E, F, G, H);

// ============================================================================
// Entry Points
// ============================================================================

fn parse_in_place<A: ParseArgs>(host: &dyn HostRuntime, args: *mut Object, value: &mut A) -> bool {
    let format = A::FORMAT;
    let mut dests = Vec::new();
    value.dests(&mut dests);
    let parsed = host.parse_tuple(args, format.as_c_str(), &mut dests);
    if !parsed {
        tracing::debug!(format = format.as_str(), "argument marshalling failed");
    }
    parsed
}

/// Parse `args` into `target` as a unit.
///
/// On failure `target` is left exactly as it was and the host error indicator
/// is set. Slots after an [`Optional`] marker that the caller did not supply
/// keep their current values.
pub fn parse_tuple<A: ParseArgs + Clone>(args: *mut Object, target: &mut A) -> bool {
    let Some(host) = host::current() else {
        return false;
    };
    let mut scratch = target.clone();
    if !parse_in_place(host, args, &mut scratch) {
        return false;
    }
    *target = scratch;
    true
}

/// Parse `args` into a fresh `A`, starting from `A::default()`.
pub fn unpack<A: ParseArgs + Default>(args: *mut Object) -> Option<A> {
    let host = host::current()?;
    let mut value = A::default();
    parse_in_place(host, args, &mut value).then_some(value)
}

/// Pack native values into one new host value.
///
/// No values build `None`, one value builds itself, several build a tuple.
/// Returns null with the error indicator set on failure.
pub fn build_value<A: BuildArgs>(values: &A) -> *mut Object {
    let Some(host) = host::current() else {
        return ptr::null_mut();
    };
    let format = A::FORMAT;
    let mut srcs = Vec::new();
    values.srcs(&mut srcs);
    host.build_value(format.as_c_str(), srcs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_group_dests_are_flattened_in_order() {
        let mut params: (i32, (i32, i32)) = (1, (2, 3));
        let mut dests = Vec::new();
        ParseArgs::dests(&mut params, &mut dests);
        let tags: Vec<_> = dests.iter().map(|d| d.tag()).collect();
        assert_eq!(tags, ["i", "i", "i"]);

        if let Dest::I32(slot) = &mut dests[2] {
            **slot = 30;
        }
        drop(dests);
        assert_eq!(params, (1, (2, 30)));
    }

    #[test]
    fn test_optional_marker_has_no_slot() {
        let mut params = (0i32, 0i32, Optional, 0i32);
        let mut dests = Vec::new();
        ParseArgs::dests(&mut params, &mut dests);
        assert_eq!(dests.len(), 3);
    }

    #[test]
    fn test_srcs_follow_descriptor() {
        let values = (1.5f32, String::from("x"), (7u8, Buffer(vec![1, 2])));
        let mut srcs = Vec::new();
        BuildArgs::srcs(&values, &mut srcs);
        let joined: String = srcs.iter().map(|s| s.tag()).collect();
        assert_eq!(joined, "fsbs*");
        assert_eq!(<(f32, String, (u8, Buffer)) as ArgList>::FORMAT.as_str(), "fs(bs*)");
    }

    #[test]
    fn test_no_host_fails_cleanly() {
        if host::current().is_none() {
            let mut target = (1i32, 2i32);
            assert!(!parse_tuple(ptr::null_mut(), &mut target));
            assert_eq!(target, (1, 2));
            assert!(build_value(&(1i32,)).is_null());
        }
    }
}
