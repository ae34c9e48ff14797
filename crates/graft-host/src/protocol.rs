//! Object protocol: operators, truthiness, conversions, calls
//!
//! The host side of the slot contract. Binary operators try the left
//! operand's table first, then the right one's, and treat a
//! `NotImplemented` result as "try the next candidate". In-place operators
//! fall back to the binary operator when the in-place slot is empty or
//! declines.

use std::ptr;

use graft_sdk::{
    CallConvention, ErrorKind, Handle, MethodDef, MethodPtr, NumberSlot, Object, TypeFlags,
    TypeObject,
};

use crate::error::{self, HostError, HostResult};
use crate::objects::{self, Attr};

// ============================================================================
// Helpers
// ============================================================================

/// Kind name of `obj`, `NULL` for a null pointer
pub fn type_name(obj: *mut Object) -> &'static str {
    if obj.is_null() {
        "NULL"
    } else {
        unsafe { (*(*obj).kind).name }
    }
}

/// Take a slot's return value, or the error it raised.
fn owned(ptr: *mut Object, context: &str) -> HostResult<Handle> {
    unsafe { Handle::from_owned(ptr) }.ok_or_else(|| error::take_or_missing(context))
}

fn kind_of(obj: &Handle) -> &'static TypeObject {
    unsafe { &*(*obj.as_ptr()).kind }
}

fn is_not_implemented(obj: &Handle) -> bool {
    obj.as_ptr() == objects::not_implemented_ptr()
}

fn symbol(slot: NumberSlot) -> &'static str {
    match slot {
        NumberSlot::Add => "+",
        NumberSlot::Subtract | NumberSlot::Negative => "-",
        NumberSlot::Multiply => "*",
        NumberSlot::Divide => "/",
        NumberSlot::Remainder => "%",
        NumberSlot::Positive => "+",
        NumberSlot::Invert => "~",
        NumberSlot::Lshift => "<<",
        NumberSlot::Rshift => ">>",
        NumberSlot::And => "&",
        NumberSlot::Xor => "^",
        NumberSlot::Or => "|",
        NumberSlot::InplaceAdd => "+=",
        NumberSlot::InplaceSubtract => "-=",
        NumberSlot::InplaceMultiply => "*=",
        NumberSlot::InplaceDivide => "/=",
        NumberSlot::InplaceRemainder => "%=",
        NumberSlot::InplaceLshift => "<<=",
        NumberSlot::InplaceRshift => ">>=",
        NumberSlot::InplaceAnd => "&=",
        NumberSlot::InplaceXor => "^=",
        NumberSlot::InplaceOr => "|=",
        NumberSlot::Bool => "bool",
        NumberSlot::Int => "int",
        NumberSlot::Float => "float",
    }
}

fn binary_counterpart(slot: NumberSlot) -> Option<NumberSlot> {
    Some(match slot {
        NumberSlot::InplaceAdd => NumberSlot::Add,
        NumberSlot::InplaceSubtract => NumberSlot::Subtract,
        NumberSlot::InplaceMultiply => NumberSlot::Multiply,
        NumberSlot::InplaceDivide => NumberSlot::Divide,
        NumberSlot::InplaceRemainder => NumberSlot::Remainder,
        NumberSlot::InplaceLshift => NumberSlot::Lshift,
        NumberSlot::InplaceRshift => NumberSlot::Rshift,
        NumberSlot::InplaceAnd => NumberSlot::And,
        NumberSlot::InplaceXor => NumberSlot::Xor,
        NumberSlot::InplaceOr => NumberSlot::Or,
        _ => return None,
    })
}

// ============================================================================
// Operators
// ============================================================================

/// `a <op> b` for a binary slot.
pub fn binary_op(a: &Handle, b: &Handle, slot: NumberSlot) -> HostResult<Handle> {
    let (left, right) = (kind_of(a), kind_of(b));
    let mut candidates = vec![left];
    if !ptr::eq(left, right) {
        candidates.push(right);
    }
    for kind in candidates {
        let Some(func) = kind.number.and_then(|table| table.binary(slot)) else {
            continue;
        };
        let result = owned(unsafe { func(a.as_ptr(), b.as_ptr()) }, slot.name())?;
        if !is_not_implemented(&result) {
            return Ok(result);
        }
    }
    Err(HostError::new(
        ErrorKind::TypeError,
        format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            symbol(slot),
            left.name,
            right.name
        ),
    ))
}

/// `a <op>= b`: the in-place slot when it accepts, else the binary operator.
pub fn inplace_op(a: &Handle, b: &Handle, slot: NumberSlot) -> HostResult<Handle> {
    let Some(fallback) = binary_counterpart(slot) else {
        return binary_op(a, b, slot);
    };
    if let Some(func) = kind_of(a).number.and_then(|table| table.binary(slot)) {
        let result = owned(unsafe { func(a.as_ptr(), b.as_ptr()) }, slot.name())?;
        if !is_not_implemented(&result) {
            return Ok(result);
        }
    }
    tracing::trace!(slot = slot.name(), "in-place slot unavailable, using binary operator");
    binary_op(a, b, fallback).map_err(|err| {
        if err.kind == ErrorKind::TypeError && err.message.starts_with("unsupported operand") {
            HostError::new(
                ErrorKind::TypeError,
                format!(
                    "unsupported operand type(s) for {}: '{}' and '{}'",
                    symbol(slot),
                    kind_of(a).name,
                    kind_of(b).name
                ),
            )
        } else {
            err
        }
    })
}

/// `-a`, `+a` or `~a`.
pub fn unary_op(a: &Handle, slot: NumberSlot) -> HostResult<Handle> {
    let kind = kind_of(a);
    match kind.number.and_then(|table| table.unary(slot)) {
        Some(func) => owned(unsafe { func(a.as_ptr()) }, slot.name()),
        None => Err(HostError::new(
            ErrorKind::TypeError,
            format!("bad operand type for unary {}: '{}'", symbol(slot), kind.name),
        )),
    }
}

// ============================================================================
// Truthiness and Conversions
// ============================================================================

/// Truth value of `obj`.
///
/// Extension kinds answer through their `bool` slot; a kind without one has
/// no truth value.
pub fn truthy(obj: *mut Object) -> HostResult<bool> {
    if obj.is_null() {
        return Err(HostError::new(ErrorKind::SystemError, "truth value of NULL"));
    }
    if obj == objects::none_ptr() {
        return Ok(false);
    }
    if obj == objects::bool_ptr(true) {
        return Ok(true);
    }
    if obj == objects::bool_ptr(false) {
        return Ok(false);
    }
    unsafe {
        if let Some(int) = objects::as_int_object(obj) {
            return Ok(int.value != 0);
        }
        if let Some(float) = objects::as_float_object(obj) {
            return Ok(float.value != 0.0);
        }
        if let Some(s) = objects::as_str_object(obj) {
            return Ok(!s.value.is_empty());
        }
        if let Some(b) = objects::as_bytes_object(obj) {
            return Ok(!b.value.is_empty());
        }
        if let Some(t) = objects::as_tuple_object(obj) {
            return Ok(!t.items.is_empty());
        }
    }
    let kind = unsafe { &*(*obj).kind };
    if objects::is_builtin(kind) {
        return Ok(true);
    }
    let Some(inquiry) = kind.number.and_then(|table| table.boolean) else {
        if kind.flags.contains(TypeFlags::ALWAYS_TRUE) {
            return Ok(true);
        }
        return Err(HostError::new(
            ErrorKind::TypeError,
            format!("'{}' object has no truth value", kind.name),
        ));
    };
    match unsafe { inquiry(obj) } {
        -1 => Err(error::take_or_missing("bool")),
        0 => Ok(false),
        _ => Ok(true),
    }
}

/// `int(obj)`
pub fn to_int(obj: &Handle) -> HostResult<i64> {
    if let Some(int) = unsafe { objects::as_int_object(obj.as_ptr()) } {
        return Ok(int.value);
    }
    let kind = kind_of(obj);
    let Some(func) = kind.number.and_then(|table| table.int) else {
        return Err(HostError::new(
            ErrorKind::TypeError,
            format!("int() argument must be a number, not '{}'", kind.name),
        ));
    };
    let result = owned(unsafe { func(obj.as_ptr()) }, "int")?;
    match unsafe { objects::as_int_object(result.as_ptr()) } {
        Some(int) => Ok(int.value),
        None => Err(HostError::new(
            ErrorKind::TypeError,
            format!("__int__ returned non-int (type {})", result.kind().name),
        )),
    }
}

/// `float(obj)`
pub fn to_float(obj: &Handle) -> HostResult<f64> {
    if let Some(float) = unsafe { objects::as_float_object(obj.as_ptr()) } {
        return Ok(float.value);
    }
    if let Some(int) = unsafe { objects::as_int_object(obj.as_ptr()) } {
        return Ok(int.value as f64);
    }
    let kind = kind_of(obj);
    let Some(func) = kind.number.and_then(|table| table.float) else {
        return Err(HostError::new(
            ErrorKind::TypeError,
            format!("float() argument must be a number, not '{}'", kind.name),
        ));
    };
    let result = owned(unsafe { func(obj.as_ptr()) }, "float")?;
    match unsafe { objects::as_float_object(result.as_ptr()) } {
        Some(float) => Ok(float.value),
        None => Err(HostError::new(
            ErrorKind::TypeError,
            format!("__float__ returned non-float (type {})", result.kind().name),
        )),
    }
}

// ============================================================================
// String Conversion
// ============================================================================

fn slot_text(func: unsafe extern "C" fn(*mut Object) -> *mut Object, obj: &Handle) -> HostResult<String> {
    let result = owned(unsafe { func(obj.as_ptr()) }, "str")?;
    match unsafe { objects::as_str_object(result.as_ptr()) } {
        Some(s) => Ok(s.value.clone()),
        None => Err(HostError::new(
            ErrorKind::TypeError,
            format!("string conversion returned non-string (type {})", result.kind().name),
        )),
    }
}

fn builtin_text(obj: &Handle, quote: bool) -> Option<String> {
    let ptr = obj.as_ptr();
    if ptr == objects::none_ptr() {
        return Some("None".to_string());
    }
    if ptr == objects::bool_ptr(true) {
        return Some("True".to_string());
    }
    if ptr == objects::bool_ptr(false) {
        return Some("False".to_string());
    }
    if ptr == objects::not_implemented_ptr() {
        return Some("NotImplemented".to_string());
    }
    unsafe {
        if let Some(int) = objects::as_int_object(ptr) {
            return Some(int.value.to_string());
        }
        if let Some(float) = objects::as_float_object(ptr) {
            return Some(format!("{:?}", float.value));
        }
        if let Some(s) = objects::as_str_object(ptr) {
            return Some(if quote { format!("'{}'", s.value) } else { s.value.clone() });
        }
        if let Some(b) = objects::as_bytes_object(ptr) {
            return Some(format!("b{:?}", String::from_utf8_lossy(&b.value)));
        }
        if let Some(t) = objects::as_tuple_object(ptr) {
            let mut text = String::from("(");
            for (i, item) in t.items.iter().enumerate() {
                if i > 0 {
                    text.push_str(", ");
                }
                text.push_str(&repr_of(item).unwrap_or_else(|_| "?".to_string()));
            }
            if t.items.len() == 1 {
                text.push(',');
            }
            text.push(')');
            return Some(text);
        }
        if let Some(m) = objects::as_module_object(ptr) {
            return Some(format!("<module '{}'>", m.def.name()));
        }
    }
    None
}

fn default_text(obj: &Handle) -> String {
    format!("<{} object at {:p}>", kind_of(obj).name, obj.as_ptr())
}

/// `str(obj)`: the `str` slot, else `repr`
pub fn str_of(obj: &Handle) -> HostResult<String> {
    if let Some(text) = builtin_text(obj, false) {
        return Ok(text);
    }
    let kind = kind_of(obj);
    match kind.str.or(kind.repr) {
        Some(func) => slot_text(func, obj),
        None => Ok(default_text(obj)),
    }
}

/// `repr(obj)`
pub fn repr_of(obj: &Handle) -> HostResult<String> {
    if let Some(text) = builtin_text(obj, true) {
        return Ok(text);
    }
    match kind_of(obj).repr {
        Some(func) => slot_text(func, obj),
        None => Ok(default_text(obj)),
    }
}

// ============================================================================
// Instantiation and Calls
// ============================================================================

/// `kind(*args)`: `new`, then `init`; the object is released if `init` fails.
pub fn instantiate(kind: &'static TypeObject, args: &Handle) -> HostResult<Handle> {
    let Some(new) = kind.new else {
        return Err(HostError::new(
            ErrorKind::TypeError,
            format!("cannot create '{}' instances", kind.name),
        ));
    };
    let obj = owned(unsafe { new(kind, args.as_ptr(), ptr::null_mut()) }, kind.name)?;
    if let Some(init) = kind.init {
        if unsafe { init(obj.as_ptr(), args.as_ptr(), ptr::null_mut()) } < 0 {
            return Err(error::take_or_missing(kind.name));
        }
    }
    Ok(obj)
}

/// Call one method table entry with `receiver` as its first argument.
pub fn invoke(def: &MethodDef, receiver: *mut Object, args: &Handle) -> HostResult<Handle> {
    tracing::trace!(method = def.name, convention = ?def.convention, "call");
    let raw = match (def.convention, def.func) {
        (CallConvention::Positional, MethodPtr::Binary(func)) => unsafe { func(receiver, args.as_ptr()) },
        (CallConvention::SingleObject, MethodPtr::Binary(func)) => {
            let arg = match unsafe { objects::as_tuple_object(args.as_ptr()) } {
                Some(tuple) if tuple.items.len() == 1 => tuple.items[0].clone(),
                Some(tuple) => {
                    return Err(HostError::new(
                        ErrorKind::TypeError,
                        format!(
                            "{}() takes exactly one argument ({} given)",
                            def.name,
                            tuple.items.len()
                        ),
                    ))
                }
                None => args.clone(),
            };
            unsafe { func(receiver, arg.as_ptr()) }
        }
        (CallConvention::Keywords, MethodPtr::Keywords(func)) => unsafe {
            func(receiver, args.as_ptr(), ptr::null_mut())
        },
        (convention, _) => {
            return Err(HostError::new(
                ErrorKind::SystemError,
                format!("{}() has a {:?} entry with a mismatched pointer", def.name, convention),
            ))
        }
    };
    owned(raw, def.name)
}

/// `module.name(*args)`
pub fn call(module: &Handle, name: &str, args: &Handle) -> HostResult<Handle> {
    let Some(m) = (unsafe { objects::as_module_object(module.as_ptr()) }) else {
        return Err(HostError::new(
            ErrorKind::TypeError,
            format!("'{}' object is not a module", module.kind().name),
        ));
    };
    let def = m.def;
    let Some(method) = def.find(name) else {
        return Err(HostError::new(
            ErrorKind::TypeError,
            format!("module '{}' has no function '{}'", def.name(), name),
        ));
    };
    invoke(method, module.as_ptr(), args)
}

// ============================================================================
// Module Attributes
// ============================================================================

/// Attribute `name` of `module`
pub fn module_attr(module: &Handle, name: &str) -> Option<Attr> {
    let m = unsafe { objects::as_module_object(module.as_ptr()) }?;
    m.attrs.get(name).cloned()
}

/// Type attached to `module` under `name`
pub fn module_type(module: &Handle, name: &str) -> Option<&'static TypeObject> {
    match module_attr(module, name)? {
        Attr::Type(kind) => Some(kind),
        Attr::Object(_) => None,
    }
}

/// Object attached to `module` under `name`
pub fn module_object(module: &Handle, name: &str) -> Option<Handle> {
    match module_attr(module, name)? {
        Attr::Object(value) => Some(value),
        Attr::Type(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_truthiness() {
        assert!(!truthy(objects::none().as_ptr()).unwrap());
        assert!(truthy(objects::int(3).as_ptr()).unwrap());
        assert!(!truthy(objects::int(0).as_ptr()).unwrap());
        assert!(!truthy(objects::string("").as_ptr()).unwrap());
        assert!(truthy(objects::tuple(vec![objects::none()]).as_ptr()).unwrap());
    }

    #[test]
    fn test_builtins_have_no_number_table() {
        let err = binary_op(&objects::int(1), &objects::int(2), NumberSlot::Add).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.message, "unsupported operand type(s) for +: 'int' and 'int'");

        let err = unary_op(&objects::string("x"), NumberSlot::Negative).unwrap_err();
        assert_eq!(err.message, "bad operand type for unary -: 'str'");
    }

    #[test]
    fn test_inplace_error_names_inplace_operator() {
        let err = inplace_op(&objects::int(1), &objects::float(2.0), NumberSlot::InplaceAdd).unwrap_err();
        assert_eq!(err.message, "unsupported operand type(s) for +=: 'int' and 'float'");
    }

    #[test]
    fn test_builtin_text() {
        let t = objects::tuple(vec![objects::int(1), objects::string("a")]);
        assert_eq!(repr_of(&t).unwrap(), "(1, 'a')");
        assert_eq!(str_of(&objects::string("a")).unwrap(), "a");
        assert_eq!(str_of(&objects::float(1.0)).unwrap(), "1.0");
        assert_eq!(repr_of(&objects::tuple(vec![objects::none()])).unwrap(), "(None,)");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(to_int(&objects::int(9)).unwrap(), 9);
        assert_eq!(to_float(&objects::int(2)).unwrap(), 2.0);
        assert_eq!(to_int(&objects::string("9")).unwrap_err().kind, ErrorKind::TypeError);
    }
}
