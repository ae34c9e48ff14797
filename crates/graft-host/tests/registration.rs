//! Type registration: sealing, configuration overrides, truthiness and
//! instance lifetime.

use std::ops::{Add, AddAssign, Not};
use std::sync::atomic::{AtomicUsize, Ordering};

use graft_host::objects;
use graft_native::Extension;
use graft_sdk::{
    register_type, Config, ErrorKind, GraftError, Handle, Instance, NumberSlot, Positive,
    Truthiness, TypeFlags,
};

#[derive(Debug, Default, Extension)]
#[extension(name = "test.Twice")]
struct Twice;

#[test]
fn test_second_registration_is_rejected() {
    graft_host::install();
    let first = register_type::<Twice>().seal().unwrap();
    assert!(first.is_ready());
    assert!(first.flags.contains(TypeFlags::READY));

    let err = register_type::<Twice>().seal().unwrap_err();
    assert_eq!(err, GraftError::AlreadyRegistered("test.Twice".to_string()));
    assert!(std::ptr::eq(Instance::<Twice>::type_object().unwrap(), first));
}

#[derive(Debug, Default, Extension)]
#[extension(name = "test.Renamed")]
struct Renamed;

#[test]
fn test_config_overrides_name_and_doc() {
    graft_host::install();
    let config = Config::from_toml_str(
        r#"
        [types."test.Renamed"]
        name = "demo.Renamed"
        doc = "Renamed by configuration"
        "#,
    )
    .unwrap();
    let kind = register_type::<Renamed>().configure(&config).seal().unwrap();
    assert_eq!(kind.name, "demo.Renamed");
    assert_eq!(kind.doc, "Renamed by configuration");
}

#[derive(Debug, Default, Extension)]
#[extension(name = "test.Flag")]
struct Flag;

#[derive(Debug, Default, Extension)]
#[extension(name = "test.Opaque")]
struct Opaque;

#[test]
fn test_always_true_installs_bool_slot() {
    graft_host::install();
    let kind = register_type::<Flag>().truthiness(Truthiness::AlwaysTrue).seal().unwrap();
    let table = kind.number_methods().unwrap();
    assert_eq!(table.populated(), [NumberSlot::Bool]);
    assert!(kind.flags.contains(TypeFlags::HAVE_NUMBER));

    let flag = graft_host::instantiate(kind, &objects::tuple(vec![])).unwrap();
    assert!(graft_host::truthy(flag.as_ptr()).unwrap());
}

#[test]
fn test_unsupported_truthiness_raises() {
    graft_host::install();
    let kind = register_type::<Opaque>().truthiness(Truthiness::Unsupported).seal().unwrap();
    assert!(kind.number_methods().is_none());
    assert!(!kind.flags.contains(TypeFlags::HAVE_NUMBER));

    let opaque = graft_host::instantiate(kind, &objects::tuple(vec![])).unwrap();
    let err = graft_host::truthy(opaque.as_ptr()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert_eq!(err.message, "'test.Opaque' object has no truth value");
}

/// A switch with a native truth value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Extension)]
#[extension(name = "test.Switch", number)]
struct Switch(bool);

impl From<Switch> for bool {
    fn from(s: Switch) -> bool {
        s.0
    }
}

impl Not for Switch {
    type Output = Switch;

    fn not(self) -> Switch {
        Switch(!self.0)
    }
}

#[test]
fn test_bool_conversion_wins_over_always_true() {
    graft_host::install();
    let kind = register_type::<Switch>().truthiness(Truthiness::AlwaysTrue).seal().unwrap();
    let names: Vec<_> = kind
        .number_methods()
        .unwrap()
        .populated()
        .into_iter()
        .map(|s| s.name())
        .collect();
    assert_eq!(names, ["bool", "invert"]);
    assert_eq!(kind.doc, "A switch with a native truth value.");

    let off = graft_host::instantiate(kind, &objects::tuple(vec![])).unwrap();
    assert!(!graft_host::truthy(off.as_ptr()).unwrap());
    let on = graft_host::unary_op(&off, NumberSlot::Invert).unwrap();
    assert!(graft_host::truthy(on.as_ptr()).unwrap());
}

static TRACKED_DROPS: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone, Default, Extension)]
#[extension(name = "test.Tracked", number)]
struct Tracked(i64);

impl Drop for Tracked {
    fn drop(&mut self) {
        TRACKED_DROPS.fetch_add(1, Ordering::SeqCst);
    }
}

impl AddAssign for Tracked {
    fn add_assign(&mut self, rhs: Tracked) {
        self.0 += rhs.0;
    }
}

impl Positive for Tracked {
    type Output = i64;

    fn positive(self) -> i64 {
        self.0
    }
}

fn tracked_value(obj: &Handle) -> i64 {
    unsafe { (*Instance::<Tracked>::cast(obj.as_ptr()).unwrap()).get().unwrap().0 }
}

#[test]
fn test_instances_drop_exactly_once() {
    graft_host::install();
    let kind = register_type::<Tracked>().seal().unwrap();

    let drops = TRACKED_DROPS.load(Ordering::SeqCst);
    let a = graft_host::instantiate(kind, &objects::tuple(vec![])).unwrap();
    let b = graft_host::instantiate(kind, &objects::tuple(vec![])).unwrap();
    unsafe { (*Instance::<Tracked>::cast(b.as_ptr()).unwrap()).emplace(Tracked(5)) };
    // Replacing the default value drops it.
    assert_eq!(TRACKED_DROPS.load(Ordering::SeqCst), drops + 1);

    // In place: mutates `a` and returns it. The cloned right operand is consumed.
    let result = graft_host::inplace_op(&a, &b, NumberSlot::InplaceAdd).unwrap();
    assert_eq!(result.as_ptr(), a.as_ptr());
    assert_eq!(tracked_value(&a), 5);
    assert_eq!(a.refcount(), 2);
    assert_eq!(TRACKED_DROPS.load(Ordering::SeqCst), drops + 2);

    // Converted unary: the result is a host int.
    let plus = graft_host::unary_op(&a, NumberSlot::Positive).unwrap();
    assert_eq!(graft_host::to_int(&plus).unwrap(), 5);
    assert_eq!(TRACKED_DROPS.load(Ordering::SeqCst), drops + 3);

    drop(result);
    drop(a);
    drop(b);
    assert_eq!(TRACKED_DROPS.load(Ordering::SeqCst), drops + 5);
}

#[derive(Debug, Clone, Default, Extension)]
#[extension(name = "test.Inert", number)]
struct Inert;

#[test]
fn test_empty_number_table() {
    graft_host::install();
    let kind = register_type::<Inert>().seal().unwrap();
    assert!(kind.number_methods().unwrap().is_empty());

    let a = graft_host::instantiate(kind, &objects::tuple(vec![])).unwrap();
    let err = graft_host::inplace_op(&a, &a, NumberSlot::InplaceSubtract).unwrap_err();
    assert_eq!(err.message, "unsupported operand type(s) for -=: 'test.Inert' and 'test.Inert'");
    assert_eq!(graft_host::to_int(&a).unwrap_err().kind, ErrorKind::TypeError);
}

#[derive(Debug, Clone, Copy, Default, Extension)]
#[extension(name = "test.Meter", number)]
struct Meter(f64);

impl Add for Meter {
    type Output = Meter;

    fn add(self, rhs: Meter) -> Meter {
        Meter(self.0 + rhs.0)
    }
}

#[test]
fn test_always_true_applies_to_numeric_types() {
    graft_host::install();
    let kind = register_type::<Meter>().truthiness(Truthiness::AlwaysTrue).seal().unwrap();
    // The operator table is left as probed; no bool slot is added to it.
    assert_eq!(kind.number_methods().unwrap().populated(), [NumberSlot::Add]);
    assert!(kind.flags.contains(TypeFlags::ALWAYS_TRUE));

    let meter = graft_host::instantiate(kind, &objects::tuple(vec![])).unwrap();
    assert!(graft_host::truthy(meter.as_ptr()).unwrap());
}

/// Operators on references only; not `Clone`.
#[derive(Debug, Default, PartialEq, Extension)]
#[extension(name = "test.Digits", number)]
struct Digits(Vec<i64>);

impl<'a> Add for &'a Digits {
    type Output = Digits;

    fn add(self, rhs: &'a Digits) -> Digits {
        Digits(self.0.iter().zip(&rhs.0).map(|(x, y)| x + y).collect())
    }
}

fn digits(kind: &'static graft_sdk::TypeObject, values: Vec<i64>) -> Handle {
    let obj = graft_host::instantiate(kind, &objects::tuple(vec![])).unwrap();
    unsafe { (*Instance::<Digits>::cast(obj.as_ptr()).unwrap()).emplace(Digits(values)) };
    obj
}

#[test]
fn test_reference_operators_dispatch() {
    graft_host::install();
    let kind = register_type::<Digits>().seal().unwrap();
    assert_eq!(kind.number_methods().unwrap().populated(), [NumberSlot::Add]);

    let a = digits(kind, vec![1, 2, 3]);
    let b = digits(kind, vec![10, 20, 30]);
    let sum = graft_host::binary_op(&a, &b, NumberSlot::Add).unwrap();
    let value = unsafe { (*Instance::<Digits>::cast(sum.as_ptr()).unwrap()).get().map(|d| d.0.clone()) };
    assert_eq!(value, Some(vec![11, 22, 33]));

    // Same object on both sides: two shared borrows.
    let twice = graft_host::binary_op(&a, &a, NumberSlot::Add).unwrap();
    let value = unsafe { (*Instance::<Digits>::cast(twice.as_ptr()).unwrap()).get().map(|d| d.0.clone()) };
    assert_eq!(value, Some(vec![2, 4, 6]));
    assert_eq!(a.refcount(), 1);
}

#[derive(Debug, Extension)]
#[extension(name = "test.Fragile")]
struct Fragile;

impl Default for Fragile {
    fn default() -> Self {
        panic!("no default Fragile")
    }
}

#[test]
fn test_panicking_default_raises() {
    graft_host::install();
    let kind = register_type::<Fragile>().seal().unwrap();
    let err = graft_host::instantiate(kind, &objects::tuple(vec![])).unwrap_err();
    assert_eq!(err.kind, ErrorKind::RuntimeError);
    assert_eq!(err.message, "no default Fragile");
    assert!(!graft_host::error_occurred());
}
