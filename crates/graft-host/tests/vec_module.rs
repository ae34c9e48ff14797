//! The `vec` sample module: a numeric 3D vector type with a custom
//! initializer, string conversion and a module-level `cross` function.

use std::ffi::c_int;
use std::ops::{Add, Neg, Sub};
use std::ptr;

use graft_host::{objects, HostError};
use graft_native::{module, Extension};
use graft_sdk::{
    build_value, parse_tuple, register_type, release, CFunction, ErrorKind, GraftResult, Handle,
    Instance, InstanceInit, InstanceRepr, IntoHost, MethodDef, ModuleDef, NumberSlot, Object,
    TypeObject,
};
use once_cell::sync::OnceCell;

#[derive(Debug, Clone, Copy, Default, PartialEq, Extension)]
#[extension(name = "vec.Vec", number)]
struct Vec3 {
    x: f32,
    y: f32,
    z: f32,
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, b: Vec3) -> Vec3 {
        Vec3 {
            x: self.x + b.x,
            y: self.y + b.y,
            z: self.z + b.z,
        }
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, b: Vec3) -> Vec3 {
        Vec3 {
            x: self.x - b.x,
            y: self.y - b.y,
            z: self.z - b.z,
        }
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3 {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

unsafe extern "C" fn init_vec(this: *mut Instance<Vec3>, args: *mut Object, _kwds: *mut Object) -> c_int {
    let mut xyz = (0f32, 0f32, 0f32);
    if !parse_tuple(args, &mut xyz) {
        return -1;
    }
    let (x, y, z) = xyz;
    (*this).emplace(Vec3 { x, y, z });
    0
}

unsafe extern "C" fn vec_str(this: *mut Instance<Vec3>) -> *mut Object {
    match (*this).get() {
        Some(v) => format!("<{:.6}, {:.6}, {:.6}>", v.x, v.y, v.z).into_host(),
        None => "<uninitialized>".into_host(),
    }
}

unsafe extern "C" fn cross(_module: *mut Object, args: *mut Object) -> *mut Object {
    let mut pair: (*mut Object, *mut Object) = (ptr::null_mut(), ptr::null_mut());
    if !parse_tuple(args, &mut pair) {
        return ptr::null_mut();
    }
    let (Some(v), Some(w)) = (Instance::<Vec3>::cast(pair.0), Instance::<Vec3>::cast(pair.1)) else {
        graft_sdk::host::raise(ErrorKind::TypeError, "cross() takes two vec.Vec objects");
        return ptr::null_mut();
    };
    let (Some(v), Some(w)) = ((*v).get(), (*w).get()) else {
        graft_sdk::host::raise(ErrorKind::RuntimeError, "vec.Vec object is not initialized");
        return ptr::null_mut();
    };
    let i = v.y * w.z - v.z * w.y;
    let j = v.z * w.x - v.x * w.z;
    let k = v.x * w.y - v.y * w.x;

    // vec.Vec(i, j, k)
    let val = build_value(&(i, j, k));
    if val.is_null() {
        return val;
    }
    let ret = Instance::<Vec3>::make_with(val, ptr::null_mut());
    release(val);
    ret
}

fn vec_type() -> GraftResult<&'static TypeObject> {
    static KIND: OnceCell<&'static TypeObject> = OnceCell::new();
    KIND.get_or_try_init(|| {
        register_type::<Vec3>()
            .init(init_vec as InstanceInit<Vec3>)
            .str(vec_str as InstanceRepr<Vec3>)
            .repr(vec_str as InstanceRepr<Vec3>)
            .seal()
    })
    .copied()
}

#[module]
fn init() -> GraftResult<ModuleDef> {
    vec_type()?;
    Ok(ModuleDef::new("vec")
        .method(MethodDef::new(
            "cross",
            cross as CFunction,
            "Returns the cross product of two 3D vectors.",
        ))
        .with_type::<Vec3>("Vec"))
}

fn load() -> Handle {
    graft_host::load(graft_module_init).expect("vec module loads")
}

fn vec(module: &Handle, x: f64, y: f64, z: f64) -> Handle {
    let kind = graft_host::module_type(module, "Vec").expect("Vec attribute");
    let args = objects::tuple(vec![objects::float(x), objects::float(y), objects::float(z)]);
    graft_host::instantiate(kind, &args).expect("Vec(x, y, z)")
}

fn value(obj: &Handle) -> Vec3 {
    unsafe {
        let instance = Instance::<Vec3>::cast(obj.as_ptr()).expect("a vec.Vec");
        *(*instance).get().expect("initialized")
    }
}

#[test]
fn test_module_exposes_type_and_function() {
    let module = load();
    let kind = graft_host::module_type(&module, "Vec").unwrap();
    assert!(ptr::eq(kind, vec_type().unwrap()));
    assert_eq!(kind.name, "vec.Vec");
    assert_eq!(graft_host::str_of(&module).unwrap(), "<module 'vec'>");
}

#[test]
fn test_number_table_matches_operators() {
    let table = vec_type().unwrap().number_methods().unwrap();
    let populated: Vec<_> = table.populated().into_iter().map(|s| s.name()).collect();
    assert_eq!(populated, ["add", "subtract", "negative"]);
    assert!(table.inplace_add.is_none());
}

/// Only `+` and unary `-`.
#[derive(Debug, Clone, Copy, Default, Extension)]
#[extension(name = "vec.Arrow", number)]
struct Arrow(f32, f32);

impl Add for Arrow {
    type Output = Arrow;

    fn add(self, b: Arrow) -> Arrow {
        Arrow(self.0 + b.0, self.1 + b.1)
    }
}

impl Neg for Arrow {
    type Output = Arrow;

    fn neg(self) -> Arrow {
        Arrow(-self.0, -self.1)
    }
}

#[test]
fn test_table_has_only_implemented_operators() {
    let table = graft_sdk::number_methods!(Arrow);
    let populated: Vec<_> = table.populated().into_iter().map(|s| s.name()).collect();
    assert_eq!(populated, ["add", "negative"]);
    assert!(table.subtract.is_none());
    assert!(table.multiply.is_none());
    assert!(table.divide.is_none());
}

#[test]
fn test_initializer_parses_three_floats() {
    let module = load();
    let v = vec(&module, 1.0, 2.0, 3.0);
    assert_eq!(value(&v), Vec3 { x: 1.0, y: 2.0, z: 3.0 });
    assert_eq!(v.refcount(), 1);
}

#[test]
fn test_initializer_accepts_ints() {
    let module = load();
    let kind = graft_host::module_type(&module, "Vec").unwrap();
    let args = objects::tuple(vec![objects::int(1), objects::int(0), objects::float(2.5)]);
    let v = graft_host::instantiate(kind, &args).unwrap();
    assert_eq!(value(&v), Vec3 { x: 1.0, y: 0.0, z: 2.5 });
}

#[test]
fn test_initializer_rejects_wrong_arity() {
    let module = load();
    let kind = graft_host::module_type(&module, "Vec").unwrap();
    let args = objects::tuple(vec![objects::float(1.0)]);
    let err = graft_host::instantiate(kind, &args).unwrap_err();
    assert_eq!(
        err,
        HostError::new(ErrorKind::TypeError, "function takes exactly 3 arguments (1 given)")
    );
}

#[test]
fn test_add_sub_neg() {
    let module = load();
    let a = vec(&module, 1.0, 2.0, 3.0);
    let b = vec(&module, 0.5, 0.5, 0.5);

    let sum = graft_host::binary_op(&a, &b, NumberSlot::Add).unwrap();
    assert_eq!(value(&sum), Vec3 { x: 1.5, y: 2.5, z: 3.5 });

    let diff = graft_host::binary_op(&a, &b, NumberSlot::Subtract).unwrap();
    assert_eq!(value(&diff), Vec3 { x: 0.5, y: 1.5, z: 2.5 });

    let neg = graft_host::unary_op(&a, NumberSlot::Negative).unwrap();
    assert_eq!(value(&neg), Vec3 { x: -1.0, y: -2.0, z: -3.0 });

    // Operands are untouched.
    assert_eq!(value(&a), Vec3 { x: 1.0, y: 2.0, z: 3.0 });
}

#[test]
fn test_inplace_add_falls_back_to_add() {
    let module = load();
    let a = vec(&module, 1.0, 1.0, 1.0);
    let b = vec(&module, 2.0, 2.0, 2.0);
    let result = graft_host::inplace_op(&a, &b, NumberSlot::InplaceAdd).unwrap();
    assert_ne!(result.as_ptr(), a.as_ptr());
    assert_eq!(value(&result), Vec3 { x: 3.0, y: 3.0, z: 3.0 });
    assert_eq!(value(&a), Vec3 { x: 1.0, y: 1.0, z: 1.0 });
}

#[test]
fn test_unsupported_operators() {
    let module = load();
    let a = vec(&module, 1.0, 2.0, 3.0);

    let err = graft_host::binary_op(&a, &a, NumberSlot::Multiply).unwrap_err();
    assert_eq!(err.message, "unsupported operand type(s) for *: 'vec.Vec' and 'vec.Vec'");

    let err = graft_host::unary_op(&a, NumberSlot::Invert).unwrap_err();
    assert_eq!(err.message, "bad operand type for unary ~: 'vec.Vec'");

    let err = graft_host::truthy(a.as_ptr()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);
}

#[test]
fn test_foreign_operand_is_not_implemented() {
    let module = load();
    let a = vec(&module, 1.0, 2.0, 3.0);
    let one = objects::int(1);

    let err = graft_host::binary_op(&a, &one, NumberSlot::Add).unwrap_err();
    assert_eq!(err.message, "unsupported operand type(s) for +: 'vec.Vec' and 'int'");

    let err = graft_host::binary_op(&one, &a, NumberSlot::Add).unwrap_err();
    assert_eq!(err.message, "unsupported operand type(s) for +: 'int' and 'vec.Vec'");
}

#[test]
fn test_str_and_repr() {
    let module = load();
    let v = vec(&module, 1.0, 2.0, 3.0);
    assert_eq!(graft_host::str_of(&v).unwrap(), "<1.000000, 2.000000, 3.000000>");
    assert_eq!(graft_host::repr_of(&v).unwrap(), "<1.000000, 2.000000, 3.000000>");
}

#[test]
fn test_cross() {
    let module = load();
    let x = vec(&module, 1.0, 0.0, 0.0);
    let y = vec(&module, 0.0, 1.0, 0.0);
    let args = objects::tuple(vec![x.clone(), y.clone()]);
    let z = graft_host::call(&module, "cross", &args).unwrap();
    assert_eq!(value(&z), Vec3 { x: 0.0, y: 0.0, z: 1.0 });
    assert_eq!(x.refcount(), 2);
}

#[test]
fn test_cross_rejects_other_types() {
    let module = load();
    let args = objects::tuple(vec![objects::int(1), objects::int(2)]);
    let err = graft_host::call(&module, "cross", &args).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeError);
    assert_eq!(err.message, "cross() takes two vec.Vec objects");
}

#[test]
fn test_method_table_entry() {
    let module = load();
    let err = graft_host::call(&module, "dot", &objects::tuple(vec![])).unwrap_err();
    assert_eq!(err.message, "module 'vec' has no function 'dot'");
}
