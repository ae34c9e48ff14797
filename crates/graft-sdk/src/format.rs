//! Format descriptor builder
//!
//! Maps native parameter types to the host's format grammar: one tag per
//! scalar kind, `(` / `)` around nested groups and `|` before the optional
//! tail. Descriptors are associated constants, so every descriptor is
//! computed by const evaluation and identical for identical type lists.
//!
//! ```
//! use graft_sdk::{ArgList, Optional};
//!
//! assert_eq!(<(i32, (i32, i32)) as ArgList>::FORMAT.as_str(), "i(ii)");
//! assert_eq!(<(i32, i32, Optional, i32) as ArgList>::FORMAT.as_str(), "ii|i");
//! ```

use std::ffi::CStr;
use std::fmt;

use crate::object::{Handle, Object};

/// Maximum descriptor length, terminator included
pub const FORMAT_CAPACITY: usize = 64;

/// Grammar tags understood by the host primitives.
pub mod tags {
    /// `u8`, range-checked
    pub const U8: &str = "b";
    /// `i16`
    pub const I16: &str = "h";
    /// `u16`
    pub const U16: &str = "H";
    /// `i32`
    pub const I32: &str = "i";
    /// `u32`
    pub const U32: &str = "I";
    /// `i64`
    pub const I64: &str = "L";
    /// `u64`
    pub const U64: &str = "K";
    /// Signed size type
    pub const SIZE: &str = "n";
    /// `f32`
    pub const F32: &str = "f";
    /// `f64`
    pub const F64: &str = "d";
    /// Truth value of any object
    pub const BOOL: &str = "p";
    /// String, copied out
    pub const STR: &str = "s";
    /// Buffer with length
    pub const BUFFER: &str = "s*";
    /// Generic object
    pub const OBJECT: &str = "O";
    /// String object, by reference
    pub const STR_OBJECT: &str = "S";
    /// Start of the optional tail
    pub const OPTIONAL: &str = "|";
    /// Opens a nested group
    pub const GROUP_OPEN: &str = "(";
    /// Closes a nested group
    pub const GROUP_CLOSE: &str = ")";
}

// ============================================================================
// Format
// ============================================================================

/// A null-terminated format descriptor built at compile time.
#[derive(Clone, Copy)]
pub struct Format {
    bytes: [u8; FORMAT_CAPACITY],
    len: usize,
}

impl Format {
    /// The empty descriptor
    pub const EMPTY: Format = Format {
        bytes: [0; FORMAT_CAPACITY],
        len: 0,
    };

    /// Descriptor holding a single tag
    pub const fn tag(tag: &str) -> Format {
        Format::EMPTY.push(tag.as_bytes())
    }

    /// `self` followed by `other`
    pub const fn concat(self, other: Format) -> Format {
        self.push_prefix(&other.bytes, other.len)
    }

    /// `self` wrapped in group delimiters
    pub const fn group(self) -> Format {
        Format::tag(tags::GROUP_OPEN)
            .concat(self)
            .concat(Format::tag(tags::GROUP_CLOSE))
    }

    const fn push(self, src: &[u8]) -> Format {
        self.push_prefix(src, src.len())
    }

    const fn push_prefix(mut self, src: &[u8], count: usize) -> Format {
        let mut i = 0;
        while i < count {
            // One byte stays reserved for the terminator.
            if self.len + 1 >= FORMAT_CAPACITY {
                panic!("format descriptor exceeds FORMAT_CAPACITY");
            }
            self.bytes[self.len] = src[i];
            self.len += 1;
            i += 1;
        }
        self
    }

    /// Length without the terminator
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True for the empty descriptor
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the descriptor carries an optional-tail marker
    pub const fn has_optional_tail(&self) -> bool {
        let mut i = 0;
        while i < self.len {
            if self.bytes[i] == b'|' {
                return true;
            }
            i += 1;
        }
        false
    }

    /// Descriptor bytes without the terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Descriptor text
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    /// Null-terminated descriptor for the host primitives
    pub fn as_c_str(&self) -> &CStr {
        CStr::from_bytes_with_nul(&self.bytes[..=self.len]).unwrap_or_default()
    }
}

impl PartialEq for Format {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Format {}

impl fmt::Debug for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Format({:?})", self.as_str())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Type-Level Markers
// ============================================================================

/// Pseudo-parameter: every parameter after it is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Optional;

/// Buffer-with-length parameter (`s*`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer(pub Vec<u8>);

impl std::ops::Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

/// Borrowed reference to a host string object (`S`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrObject(pub *mut Object);

impl Default for StrObject {
    fn default() -> Self {
        StrObject(std::ptr::null_mut())
    }
}

// ============================================================================
// Format Traits
// ============================================================================

/// A native type with a fixed position in the format grammar.
///
/// Scalars map to one tag; tuples map to a parenthesised group of their
/// members.
pub trait FormatUnit {
    /// Descriptor of this unit
    const FORMAT: Format;
}

/// A top-level parameter list. Unlike a nested tuple it is not parenthesised.
pub trait ArgList {
    /// Descriptor of the whole list
    const FORMAT: Format;
}

macro_rules! scalar_format {
    ($($ty:ty => $tag:expr),* $(,)?) => {
        $(
            impl FormatUnit for $ty {
                const FORMAT: Format = Format::tag($tag);
            }
        )*
    };
}

scalar_format! {
    u8 => tags::U8,
    i16 => tags::I16,
    u16 => tags::U16,
    i32 => tags::I32,
    u32 => tags::U32,
    i64 => tags::I64,
    u64 => tags::U64,
    isize => tags::SIZE,
    f32 => tags::F32,
    f64 => tags::F64,
    bool => tags::BOOL,
    String => tags::STR,
    Buffer => tags::BUFFER,
    *mut Object => tags::OBJECT,
    Handle => tags::OBJECT,
    StrObject => tags::STR_OBJECT,
    Optional => tags::OPTIONAL,
}

impl ArgList for () {
    const FORMAT: Format = Format::EMPTY;
}

macro_rules! tuple_format {
    ($($name:ident),+) => {
        impl<$($name: FormatUnit),+> FormatUnit for ($($name,)+) {
            const FORMAT: Format = Format::EMPTY
                $(.concat(<$name as FormatUnit>::FORMAT))+
                .group();
        }

        impl<$($name: FormatUnit),+> ArgList for ($($name,)+) {
            const FORMAT: Format = Format::EMPTY
                $(.concat(<$name as FormatUnit>::FORMAT))+;
        }
    };
}

tuple_format!(A);
tuple_format!(A, B);
tuple_format!(A, B, C);
tuple_format!(A, B, C, D);
tuple_format!(A, B, C, D, E);
tuple_format!(A, B, C, D, E, F);
tuple_format!(A, B, C, D, E, F, G);
tuple_format!(A, B, C, D, E, F, G, H);
