//! Format-grammar interpreter
//!
//! Executes the descriptors produced by `graft_sdk::format` against host
//! values: [`parse_tuple`] fills typed destinations from an argument tuple,
//! [`build_value`] packs typed sources into one new value.

use std::ffi::CStr;
use std::fmt;

use graft_sdk::{retain, Dest, ErrorKind, Handle, Object, Src, StrObject};

use crate::error::{HostError, HostResult};
use crate::objects;
use crate::protocol;

// ============================================================================
// Descriptor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    Size,
    F32,
    F64,
    Bool,
    Str,
    Buffer,
    Object,
    StrObject,
}

impl Tag {
    fn from_byte(byte: u8) -> Option<Tag> {
        Some(match byte {
            b'b' => Tag::U8,
            b'h' => Tag::I16,
            b'H' => Tag::U16,
            b'i' => Tag::I32,
            b'I' => Tag::U32,
            b'L' => Tag::I64,
            b'K' => Tag::U64,
            b'n' => Tag::Size,
            b'f' => Tag::F32,
            b'd' => Tag::F64,
            b'p' => Tag::Bool,
            b's' => Tag::Str,
            b'O' => Tag::Object,
            b'S' => Tag::StrObject,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Tag::U8 => "b",
            Tag::I16 => "h",
            Tag::U16 => "H",
            Tag::I32 => "i",
            Tag::U32 => "I",
            Tag::I64 => "L",
            Tag::U64 => "K",
            Tag::Size => "n",
            Tag::F32 => "f",
            Tag::F64 => "d",
            Tag::Bool => "p",
            Tag::Str => "s",
            Tag::Buffer => "s*",
            Tag::Object => "O",
            Tag::StrObject => "S",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Unit {
    Scalar(Tag),
    Group(Vec<Unit>),
}

impl Unit {
    fn scalars(&self) -> usize {
        match self {
            Unit::Scalar(_) => 1,
            Unit::Group(units) => units.iter().map(Unit::scalars).sum(),
        }
    }
}

/// A tokenized descriptor: the required units, then the optional tail.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Descriptor {
    required: Vec<Unit>,
    optional: Option<Vec<Unit>>,
}

fn bad_format(format: &[u8], reason: &str) -> HostError {
    HostError::new(
        ErrorKind::SystemError,
        format!(
            "bad format descriptor '{}': {}",
            String::from_utf8_lossy(format),
            reason
        ),
    )
}

impl Descriptor {
    fn parse(format: &[u8]) -> HostResult<Descriptor> {
        let mut pos = 0;
        let mut required = Vec::new();
        let mut optional: Option<Vec<Unit>> = None;
        while pos < format.len() {
            if format[pos] == b'|' {
                if optional.is_some() {
                    return Err(bad_format(format, "repeated '|'"));
                }
                optional = Some(Vec::new());
                pos += 1;
                continue;
            }
            let unit = Self::unit(format, &mut pos)?;
            match optional.as_mut() {
                Some(tail) => tail.push(unit),
                None => required.push(unit),
            }
        }
        Ok(Descriptor { required, optional })
    }

    fn unit(format: &[u8], pos: &mut usize) -> HostResult<Unit> {
        let byte = format[*pos];
        *pos += 1;
        match byte {
            b'(' => {
                let mut units = Vec::new();
                loop {
                    match format.get(*pos) {
                        None => return Err(bad_format(format, "unclosed group")),
                        Some(b')') => {
                            *pos += 1;
                            return Ok(Unit::Group(units));
                        }
                        Some(b'|') => return Err(bad_format(format, "'|' inside a group")),
                        Some(_) => units.push(Self::unit(format, pos)?),
                    }
                }
            }
            b')' => Err(bad_format(format, "unbalanced ')'")),
            b's' if format.get(*pos) == Some(&b'*') => {
                *pos += 1;
                Ok(Unit::Scalar(Tag::Buffer))
            }
            other => Tag::from_byte(other)
                .map(Unit::Scalar)
                .ok_or_else(|| bad_format(format, &format!("unknown tag '{}'", other as char))),
        }
    }

    fn units(&self) -> impl Iterator<Item = &Unit> {
        self.required.iter().chain(self.optional.iter().flatten())
    }

    fn scalars(&self) -> usize {
        self.units().map(Unit::scalars).sum()
    }
}

// ============================================================================
// Parse
// ============================================================================

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn check_count(desc: &Descriptor, given: usize) -> HostResult<()> {
    let min = desc.required.len();
    let max = min + desc.optional.as_ref().map_or(0, Vec::len);
    let message = if desc.optional.is_none() {
        (given != min).then(|| {
            format!("function takes exactly {} argument{} ({} given)", min, plural(min), given)
        })
    } else if given < min {
        Some(format!("function takes at least {} argument{} ({} given)", min, plural(min), given))
    } else if given > max {
        Some(format!("function takes at most {} argument{} ({} given)", max, plural(max), given))
    } else {
        None
    };
    match message {
        Some(message) => Err(HostError::new(ErrorKind::TypeError, message)),
        None => Ok(()),
    }
}

/// Unpack the tuple `args` into `dests`.
///
/// Destinations of optional units the caller did not supply are left as
/// they are.
pub fn parse_tuple(args: *mut Object, format: &CStr, dests: &mut [Dest<'_>]) -> HostResult<()> {
    let desc = Descriptor::parse(format.to_bytes())?;
    if desc.scalars() != dests.len() {
        return Err(HostError::new(
            ErrorKind::SystemError,
            format!(
                "format '{}' needs {} destinations, got {}",
                format.to_string_lossy(),
                desc.scalars(),
                dests.len()
            ),
        ));
    }
    let items = match unsafe { objects::as_tuple_object(args) } {
        Some(tuple) => tuple.items.clone(),
        None => {
            return Err(HostError::new(
                ErrorKind::SystemError,
                "argument bundle is not a tuple",
            ))
        }
    };
    check_count(&desc, items.len())?;

    let mut remaining = dests.iter_mut();
    for (index, unit) in desc.units().enumerate() {
        match items.get(index) {
            Some(item) => fill(unit, item.as_ptr(), &mut remaining)?,
            None => {
                // Missing optional unit: skip its destinations.
                for _ in 0..unit.scalars() {
                    remaining.next();
                }
            }
        }
    }
    Ok(())
}

fn fill<'d, 'a: 'd>(
    unit: &Unit,
    obj: *mut Object,
    dests: &mut impl Iterator<Item = &'d mut Dest<'a>>,
) -> HostResult<()> {
    match unit {
        Unit::Scalar(tag) => {
            let Some(dest) = dests.next() else {
                return Err(HostError::new(ErrorKind::SystemError, "too few destinations"));
            };
            store(*tag, obj, dest)
        }
        Unit::Group(units) => {
            let items = match unsafe { objects::as_tuple_object(obj) } {
                Some(tuple) if tuple.items.len() == units.len() => tuple.items.clone(),
                _ => {
                    return Err(HostError::new(
                        ErrorKind::TypeError,
                        format!(
                            "must be a tuple of {} item{}, not {}",
                            units.len(),
                            plural(units.len()),
                            protocol::type_name(obj)
                        ),
                    ))
                }
            };
            for (unit, item) in units.iter().zip(&items) {
                fill(unit, item.as_ptr(), dests)?;
            }
            Ok(())
        }
    }
}

fn wrong_type(expected: &str, obj: *mut Object) -> HostError {
    HostError::new(
        ErrorKind::TypeError,
        format!("expected {}, got {}", expected, protocol::type_name(obj)),
    )
}

fn integer(obj: *mut Object) -> HostResult<i64> {
    unsafe { objects::as_int_object(obj) }
        .map(|int| int.value)
        .ok_or_else(|| wrong_type("int", obj))
}

fn real(obj: *mut Object) -> HostResult<f64> {
    if let Some(float) = unsafe { objects::as_float_object(obj) } {
        return Ok(float.value);
    }
    integer(obj).map(|value| value as f64).map_err(|_| wrong_type("float", obj))
}

fn narrow<N: TryFrom<i64>>(value: i64, tag: Tag) -> HostResult<N> {
    N::try_from(value).map_err(|_| {
        HostError::new(
            ErrorKind::OverflowError,
            format!("{} is out of range for '{}'", value, tag),
        )
    })
}

fn store(tag: Tag, obj: *mut Object, dest: &mut Dest<'_>) -> HostResult<()> {
    if dest.tag() != tag.as_str() {
        return Err(HostError::new(
            ErrorKind::SystemError,
            format!("destination for '{}' has type '{}'", tag, dest.tag()),
        ));
    }
    match dest {
        Dest::U8(slot) => **slot = narrow(integer(obj)?, tag)?,
        Dest::I16(slot) => **slot = narrow(integer(obj)?, tag)?,
        Dest::U16(slot) => **slot = narrow(integer(obj)?, tag)?,
        Dest::I32(slot) => **slot = narrow(integer(obj)?, tag)?,
        Dest::U32(slot) => **slot = narrow(integer(obj)?, tag)?,
        Dest::I64(slot) => **slot = integer(obj)?,
        Dest::U64(slot) => **slot = narrow(integer(obj)?, tag)?,
        Dest::Size(slot) => **slot = narrow(integer(obj)?, tag)?,
        Dest::F32(slot) => **slot = real(obj)? as f32,
        Dest::F64(slot) => **slot = real(obj)?,
        Dest::Bool(slot) => **slot = protocol::truthy(obj)?,
        Dest::Str(slot) => match unsafe { objects::as_str_object(obj) } {
            Some(s) => **slot = s.value.clone(),
            None => return Err(wrong_type("str", obj)),
        },
        Dest::Buffer(slot) => {
            if let Some(s) = unsafe { objects::as_str_object(obj) } {
                slot.0 = s.value.clone().into_bytes();
            } else if let Some(b) = unsafe { objects::as_bytes_object(obj) } {
                slot.0 = b.value.clone();
            } else {
                return Err(wrong_type("str or bytes", obj));
            }
        }
        Dest::Object(slot) => **slot = obj,
        Dest::StrObject(slot) => {
            if unsafe { objects::as_str_object(obj) }.is_none() {
                return Err(wrong_type("str", obj));
            }
            **slot = StrObject(obj);
        }
    }
    Ok(())
}

// ============================================================================
// Build
// ============================================================================

/// Pack `srcs` into one new value: none for no units, the value itself for
/// one unit, a tuple otherwise. `|` markers are ignored.
pub fn build_value(format: &CStr, srcs: Vec<Src>) -> HostResult<Handle> {
    let desc = Descriptor::parse(format.to_bytes())?;
    if desc.scalars() != srcs.len() {
        return Err(HostError::new(
            ErrorKind::SystemError,
            format!(
                "format '{}' needs {} values, got {}",
                format.to_string_lossy(),
                desc.scalars(),
                srcs.len()
            ),
        ));
    }
    let mut srcs = srcs.into_iter();
    let mut built = desc
        .units()
        .map(|unit| pack(unit, &mut srcs))
        .collect::<HostResult<Vec<_>>>()?;
    Ok(match built.len() {
        0 => objects::none(),
        1 => built.remove(0),
        _ => objects::tuple(built),
    })
}

fn pack(unit: &Unit, srcs: &mut impl Iterator<Item = Src>) -> HostResult<Handle> {
    match unit {
        Unit::Scalar(tag) => {
            let Some(src) = srcs.next() else {
                return Err(HostError::new(ErrorKind::SystemError, "too few values"));
            };
            scalar(*tag, src)
        }
        Unit::Group(units) => {
            let items = units
                .iter()
                .map(|unit| pack(unit, srcs))
                .collect::<HostResult<Vec<_>>>()?;
            Ok(objects::tuple(items))
        }
    }
}

fn scalar(tag: Tag, src: Src) -> HostResult<Handle> {
    if src.tag() != tag.as_str() {
        return Err(HostError::new(
            ErrorKind::SystemError,
            format!("value for '{}' has type '{}'", tag, src.tag()),
        ));
    }
    Ok(match src {
        Src::U8(v) => objects::int(i64::from(v)),
        Src::I16(v) => objects::int(i64::from(v)),
        Src::U16(v) => objects::int(i64::from(v)),
        Src::I32(v) => objects::int(i64::from(v)),
        Src::U32(v) => objects::int(i64::from(v)),
        Src::I64(v) => objects::int(v),
        Src::U64(v) => objects::int(i64::try_from(v).map_err(|_| {
            HostError::new(
                ErrorKind::OverflowError,
                format!("{} does not fit a host integer", v),
            )
        })?),
        Src::Size(v) => objects::int(v as i64),
        Src::F32(v) => objects::float(f64::from(v)),
        Src::F64(v) => objects::float(v),
        Src::Bool(v) => objects::boolean(v),
        Src::Str(v) => objects::string(v),
        Src::Buffer(v) => objects::bytes(v),
        Src::Object(ptr) | Src::StrObject(ptr) => {
            if ptr.is_null() {
                return Err(HostError::new(
                    ErrorKind::SystemError,
                    "null object passed to build_value",
                ));
            }
            unsafe {
                retain(ptr);
                match Handle::from_owned(ptr) {
                    Some(handle) => handle,
                    None => unreachable!("checked for null"),
                }
            }
        }
    })
}
