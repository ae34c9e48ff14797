//! Argument marshalling through the reference host: descriptors built from
//! native parameter lists, parsed and built by the host grammar.

use graft_host::objects;
use graft_sdk::{
    build_value, parse_tuple, unpack, ArgList, Buffer, ErrorKind, Handle, Optional, StrObject,
};
use proptest::prelude::*;

fn ints(values: &[i64]) -> Handle {
    graft_host::install();
    objects::tuple(values.iter().map(|&v| objects::int(v)).collect())
}

fn owned(ptr: *mut graft_sdk::Object) -> Handle {
    unsafe { Handle::from_owned(ptr) }.expect("a value")
}

fn last_error() -> (ErrorKind, String) {
    let err = graft_host::take_error().expect("an error was raised");
    (err.kind, err.message)
}

type WithTail = (i32, i32, Optional, i32);

#[test]
fn test_descriptor_of_optional_tail() {
    assert_eq!(<WithTail as ArgList>::FORMAT.as_str(), "ii|i");
}

#[test]
fn test_optional_tail_accepts_two_or_three() {
    let two = unpack::<WithTail>(ints(&[3, 5]).as_ptr()).unwrap();
    assert_eq!(two, (3, 5, Optional, 0));

    let three = unpack::<WithTail>(ints(&[3, 5, 8]).as_ptr()).unwrap();
    assert_eq!(three, (3, 5, Optional, 8));
}

#[test]
fn test_optional_tail_count_errors() {
    assert!(unpack::<WithTail>(ints(&[3]).as_ptr()).is_none());
    assert_eq!(
        last_error(),
        (ErrorKind::TypeError, "function takes at least 2 arguments (1 given)".to_string())
    );

    assert!(unpack::<WithTail>(ints(&[1, 2, 3, 4]).as_ptr()).is_none());
    assert_eq!(
        last_error(),
        (ErrorKind::TypeError, "function takes at most 3 arguments (4 given)".to_string())
    );
}

#[test]
fn test_missing_optional_keeps_prior_value() {
    let mut target: WithTail = (1, 2, Optional, 99);
    assert!(parse_tuple(ints(&[3, 5]).as_ptr(), &mut target));
    assert_eq!(target, (3, 5, Optional, 99));
}

#[test]
fn test_exact_arity() {
    let mut target = (0i32, 0i32);
    assert!(parse_tuple(ints(&[3, 5]).as_ptr(), &mut target));
    assert_eq!(target, (3, 5));

    assert!(!parse_tuple(ints(&[3, 5, 7]).as_ptr(), &mut target));
    assert_eq!(
        last_error(),
        (ErrorKind::TypeError, "function takes exactly 2 arguments (3 given)".to_string())
    );
}

#[test]
fn test_failed_parse_leaves_target_untouched() {
    graft_host::install();
    let args = objects::tuple(vec![objects::int(3), objects::string("x")]);
    let mut target = (1i32, 2i32);
    assert!(!parse_tuple(args.as_ptr(), &mut target));
    assert_eq!(target, (1, 2));
    assert_eq!(last_error().0, ErrorKind::TypeError);
}

#[test]
fn test_nested_group() {
    graft_host::install();
    let args = objects::tuple(vec![objects::int(1), objects::tuple(vec![objects::int(2), objects::int(3)])]);
    assert_eq!(unpack::<(i32, (i32, i32))>(args.as_ptr()), Some((1, (2, 3))));

    let short = objects::tuple(vec![objects::int(1), objects::tuple(vec![objects::int(2)])]);
    assert_eq!(unpack::<(i32, (i32, i32))>(short.as_ptr()), None);
    assert_eq!(
        last_error(),
        (ErrorKind::TypeError, "must be a tuple of 2 items, not tuple".to_string())
    );
}

#[test]
fn test_range_checks() {
    assert_eq!(unpack::<(u8,)>(ints(&[255]).as_ptr()), Some((255,)));
    assert_eq!(unpack::<(u8,)>(ints(&[256]).as_ptr()), None);
    assert_eq!(last_error().0, ErrorKind::OverflowError);

    assert_eq!(unpack::<(u32,)>(ints(&[-1]).as_ptr()), None);
    assert_eq!(last_error().0, ErrorKind::OverflowError);

    assert_eq!(unpack::<(i16,)>(ints(&[-32768]).as_ptr()), Some((-32768,)));
}

#[test]
fn test_strings_and_buffers() {
    graft_host::install();
    let args = objects::tuple(vec![
        objects::string("text"),
        objects::bytes(vec![0u8, 1, 2]),
        objects::string("abc"),
    ]);
    let (text, bytes, chars) = unpack::<(String, Buffer, Buffer)>(args.as_ptr()).unwrap();
    assert_eq!(text, "text");
    assert_eq!(&*bytes, &[0, 1, 2]);
    assert_eq!(&*chars, b"abc");

    let not_text = objects::tuple(vec![objects::bytes(vec![1u8])]);
    assert!(unpack::<(String,)>(not_text.as_ptr()).is_none());
    assert_eq!(last_error(), (ErrorKind::TypeError, "expected str, got bytes".to_string()));
}

#[test]
fn test_string_object_is_borrowed() {
    graft_host::install();
    let s = objects::string("kept");
    let args = objects::tuple(vec![s.clone()]);
    let before = s.refcount();
    let (borrowed,) = unpack::<(StrObject,)>(args.as_ptr()).unwrap();
    assert_eq!(borrowed.0, s.as_ptr());
    assert_eq!(s.refcount(), before);

    assert!(unpack::<(StrObject,)>(ints(&[1]).as_ptr()).is_none());
    assert_eq!(last_error().0, ErrorKind::TypeError);
}

#[test]
fn test_bool_uses_truthiness() {
    graft_host::install();
    let args = objects::tuple(vec![
        objects::int(0),
        objects::string("yes"),
        objects::tuple(vec![]),
        objects::none(),
    ]);
    assert_eq!(
        unpack::<(bool, bool, bool, bool)>(args.as_ptr()),
        Some((false, true, false, false))
    );
}

#[test]
fn test_non_tuple_bundle() {
    graft_host::install();
    let not_a_tuple = objects::int(1);
    assert_eq!(unpack::<(i32,)>(not_a_tuple.as_ptr()), None);
    assert_eq!(last_error().0, ErrorKind::SystemError);
}

#[test]
fn test_build_shapes() {
    graft_host::install();
    let none = owned(build_value(&()));
    assert_eq!(graft_host::repr_of(&none).unwrap(), "None");

    let single = owned(build_value(&(7i32,)));
    assert_eq!(graft_host::repr_of(&single).unwrap(), "7");

    let nested = owned(build_value(&(1i32, (2.5f64, String::from("x")))));
    assert_eq!(graft_host::repr_of(&nested).unwrap(), "(1, (2.5, 'x'))");

    let with_marker = owned(build_value(&(1i32, Optional, 2i32)));
    assert_eq!(graft_host::repr_of(&with_marker).unwrap(), "(1, 2)");
}

#[test]
fn test_build_retains_handles() {
    graft_host::install();
    let item = objects::string("shared");
    let values = (item.clone(), 1i32);
    let built = owned(build_value(&values));
    assert_eq!(item.refcount(), 3);
    drop(built);
    assert_eq!(item.refcount(), 2);
    drop(values);
    assert_eq!(item.refcount(), 1);
}

#[test]
fn test_build_overflow() {
    graft_host::install();
    assert!(build_value(&(u64::MAX,)).is_null());
    assert_eq!(last_error().0, ErrorKind::OverflowError);
}

proptest! {
    #[test]
    fn test_build_then_parse_preserves_values(
        a in any::<i32>(),
        b in any::<i64>(),
        c in -1.0e9f64..1.0e9f64,
        d in "[a-z ]{0,16}",
        e in any::<bool>(),
        f in any::<u8>(),
        g in any::<u16>(),
    ) {
        graft_host::install();
        let values = (a, b, c, d, e, (f, g));
        let built = owned(build_value(&values));
        let parsed = unpack::<(i32, i64, f64, String, bool, (u8, u16))>(built.as_ptr());
        prop_assert_eq!(parsed, Some(values));
    }
}
