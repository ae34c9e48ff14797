//! Capability prober and slot synthesizer
//!
//! For a concrete native type `T` and an operation marker from [`ops`], the
//! prober picks one of three outcomes at compile time:
//!
//! 1. [`Capability::Native`]: the operation is valid and yields `T` again;
//!    the adapter wraps the result in a new instance of `T` directly.
//! 2. [`Capability::Converted`]: the operation is valid and its result can
//!    build a host value through [`IntoHost`].
//! 3. [`Capability::Unsupported`]: no adapter; the slot stays empty.
//!
//! Selection uses method resolution over five tiers implemented for
//! `&&&&Probe` down to `Probe`. Calling `(&&&&&probe).slot()` reaches the most
//! specific tier whose bounds hold: by-value native, by-reference native,
//! by-value converted, by-reference converted, then unsupported. The
//! by-value tiers clone operands out of their instances (`T: Clone`); the
//! by-reference tiers borrow them, for operators written as
//! `impl Add for &T`. This only resolves for concrete types, which is why the entry
//! points are the [`probe!`](crate::probe!), [`number_methods!`](crate::number_methods!)
//! and [`extension_slots!`](crate::extension_slots!) macros.
//!
//! ```
//! use graft_sdk::{probe, Capability};
//!
//! #[derive(Clone)]
//! struct Meters(f64);
//!
//! impl std::ops::Add for Meters {
//!     type Output = Meters;
//!     fn add(self, rhs: Meters) -> Meters {
//!         Meters(self.0 + rhs.0)
//!     }
//! }
//!
//! graft_sdk::extension!(Meters => "units.Meters", number);
//!
//! assert_eq!(probe!(Meters, Add).capability, Capability::Native);
//! assert_eq!(probe!(Meters, Mul).capability, Capability::Unsupported);
//! assert!(probe!(Meters, AddAssign).slot.is_none());
//! ```

use std::ffi::c_int;
use std::fmt::{Debug, Display};
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use crate::convert::IntoHost;
use crate::error::ErrorKind;
use crate::host;
use crate::instance::{Extension, Instance};
use crate::object::{retain, Object};
use crate::ops::{self, Operator};
use crate::type_object::{default_new, BinaryFunc, InquiryFunc, NewFunc, ReprFunc, UnaryFunc};

// ============================================================================
// Outcomes
// ============================================================================

/// Which path an operation takes for a given type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Result is `T` itself
    Native,
    /// Result converts into a host value
    Converted,
    /// Operation is not well-formed for `T`
    Unsupported,
}

/// Outcome of one probe.
#[derive(Debug, Clone, Copy)]
pub struct Probed<F> {
    pub capability: Capability,
    pub slot: Option<F>,
}

impl<F> Probed<F> {
    /// Whether an adapter was synthesized
    pub fn is_supported(&self) -> bool {
        self.slot.is_some()
    }
}

// ============================================================================
// Tiers
// ============================================================================

/// Probe of operation `Op` on type `T`.
pub struct Probe<T, Op>(PhantomData<fn() -> (T, Op)>);

impl<T, Op> Probe<T, Op> {
    pub const fn new() -> Self {
        Probe(PhantomData)
    }
}

impl<T, Op> Default for Probe<T, Op> {
    fn default() -> Self {
        Self::new()
    }
}

/// `Op` on `T` yields `T`.
pub trait NativeOp<T>: Operator {
    /// Adapter staying within `T`
    fn native() -> Self::Slot;
}

/// `Op` on `&T` yields `T`.
pub trait NativeRefOp<T>: Operator {
    /// Adapter borrowing the operands
    fn native_ref() -> Self::Slot;
}

/// `Op` on `T` yields something [`IntoHost`].
pub trait ConvertedOp<T>: Operator {
    /// Adapter going through a host value
    fn converted() -> Self::Slot;
}

/// `Op` on `&T` yields something [`IntoHost`].
pub trait ConvertedRefOp<T>: Operator {
    /// Adapter borrowing the operands, going through a host value
    fn converted_ref() -> Self::Slot;
}

/// Tier 1
pub trait NativeTier {
    type Slot;
    fn slot(&self) -> Probed<Self::Slot>;
}

/// Tier 2
pub trait NativeRefTier {
    type Slot;
    fn slot(&self) -> Probed<Self::Slot>;
}

/// Tier 3
pub trait ConvertedTier {
    type Slot;
    fn slot(&self) -> Probed<Self::Slot>;
}

/// Tier 4
pub trait ConvertedRefTier {
    type Slot;
    fn slot(&self) -> Probed<Self::Slot>;
}

/// Tier 5
pub trait UnsupportedTier {
    type Slot;
    fn slot(&self) -> Probed<Self::Slot>;
}

impl<T, Op: NativeOp<T>> NativeTier for &&&&Probe<T, Op> {
    type Slot = Op::Slot;

    fn slot(&self) -> Probed<Op::Slot> {
        Probed {
            capability: Capability::Native,
            slot: Some(Op::native()),
        }
    }
}

impl<T, Op: NativeRefOp<T>> NativeRefTier for &&&Probe<T, Op> {
    type Slot = Op::Slot;

    fn slot(&self) -> Probed<Op::Slot> {
        Probed {
            capability: Capability::Native,
            slot: Some(Op::native_ref()),
        }
    }
}

impl<T, Op: ConvertedOp<T>> ConvertedTier for &&Probe<T, Op> {
    type Slot = Op::Slot;

    fn slot(&self) -> Probed<Op::Slot> {
        Probed {
            capability: Capability::Converted,
            slot: Some(Op::converted()),
        }
    }
}

impl<T, Op: ConvertedRefOp<T>> ConvertedRefTier for &Probe<T, Op> {
    type Slot = Op::Slot;

    fn slot(&self) -> Probed<Op::Slot> {
        Probed {
            capability: Capability::Converted,
            slot: Some(Op::converted_ref()),
        }
    }
}

impl<T, Op: Operator> UnsupportedTier for Probe<T, Op> {
    type Slot = Op::Slot;

    fn slot(&self) -> Probed<Op::Slot> {
        Probed {
            capability: Capability::Unsupported,
            slot: None,
        }
    }
}

// ============================================================================
// Adapter Helpers
// ============================================================================

/// Run native code behind a host slot, turning a panic into a `RuntimeError`.
pub fn catch_panic<R>(on_panic: R, f: impl FnOnce() -> R) -> R {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "native code panicked".to_string()
            };
            tracing::debug!(%message, "panic caught at host boundary");
            host::raise(ErrorKind::RuntimeError, &message);
            on_panic
        }
    }
}

fn kind_name<T: Extension>() -> &'static str {
    Instance::<T>::type_object().map_or(T::NAME, |kind| kind.name)
}

fn not_implemented() -> *mut Object {
    host::current().map_or(ptr::null_mut(), |h| h.not_implemented())
}

fn raise_uninitialized<T: Extension>() {
    host::raise(
        ErrorKind::RuntimeError,
        &format!("'{}' object is not initialized", kind_name::<T>()),
    );
}

enum Operands<V> {
    Ready(V, V),
    Foreign,
    Uninitialized,
}

/// Borrow both operand values from their instances.
unsafe fn operand_refs<'a, T: Extension>(a: *mut Object, b: *mut Object) -> Operands<&'a T> {
    let (Some(a), Some(b)) = (Instance::<T>::cast(a), Instance::<T>::cast(b)) else {
        return Operands::Foreign;
    };
    match ((*a).get(), (*b).get()) {
        (Some(x), Some(y)) => Operands::Ready(x, y),
        _ => Operands::Uninitialized,
    }
}

/// Clone both operand values out of their instances.
unsafe fn operands<T: Extension + Clone>(a: *mut Object, b: *mut Object) -> Operands<T> {
    match operand_refs::<T>(a, b) {
        Operands::Ready(x, y) => Operands::Ready(x.clone(), y.clone()),
        Operands::Foreign => Operands::Foreign,
        Operands::Uninitialized => Operands::Uninitialized,
    }
}

/// Apply `f` to the value embedded in `obj`, or raise and return `on_error`.
unsafe fn with_value<T: Extension, R>(obj: *mut Object, on_error: R, f: impl FnOnce(&T) -> R) -> R {
    let Some(instance) = Instance::<T>::cast(obj) else {
        host::raise(
            ErrorKind::TypeError,
            &format!("expected a '{}' object", kind_name::<T>()),
        );
        return on_error;
    };
    match (*instance).get() {
        Some(value) => f(value),
        None => {
            raise_uninitialized::<T>();
            on_error
        }
    }
}

// ============================================================================
// Binary Operators
// ============================================================================

macro_rules! binary_probes {
    ($($marker:ident => $Trait:ident :: $method:ident),* $(,)?) => {
        $(
            impl<T> NativeOp<T> for ops::$marker
            where
                T: Extension + Clone + ::core::ops::$Trait<Output = T>,
            {
                fn native() -> BinaryFunc {
                    unsafe extern "C" fn adapter<T>(a: *mut Object, b: *mut Object) -> *mut Object
                    where
                        T: Extension + Clone + ::core::ops::$Trait<Output = T>,
                    {
                        catch_panic(ptr::null_mut(), || match operands::<T>(a, b) {
                            Operands::Ready(x, y) => Instance::<T>::make(::core::ops::$Trait::$method(x, y)),
                            Operands::Foreign => not_implemented(),
                            Operands::Uninitialized => {
                                raise_uninitialized::<T>();
                                ptr::null_mut()
                            }
                        })
                    }
                    adapter::<T>
                }
            }

            impl<T> NativeRefOp<T> for ops::$marker
            where
                T: Extension,
                for<'a> &'a T: ::core::ops::$Trait<&'a T, Output = T>,
            {
                fn native_ref() -> BinaryFunc {
                    unsafe extern "C" fn adapter<T>(a: *mut Object, b: *mut Object) -> *mut Object
                    where
                        T: Extension,
                        for<'a> &'a T: ::core::ops::$Trait<&'a T, Output = T>,
                    {
                        catch_panic(ptr::null_mut(), || match operand_refs::<T>(a, b) {
                            Operands::Ready(x, y) => Instance::<T>::make(::core::ops::$Trait::$method(x, y)),
                            Operands::Foreign => not_implemented(),
                            Operands::Uninitialized => {
                                raise_uninitialized::<T>();
                                ptr::null_mut()
                            }
                        })
                    }
                    adapter::<T>
                }
            }

            impl<T> ConvertedOp<T> for ops::$marker
            where
                T: Extension + Clone + ::core::ops::$Trait,
                <T as ::core::ops::$Trait>::Output: IntoHost,
            {
                fn converted() -> BinaryFunc {
                    unsafe extern "C" fn adapter<T>(a: *mut Object, b: *mut Object) -> *mut Object
                    where
                        T: Extension + Clone + ::core::ops::$Trait,
                        <T as ::core::ops::$Trait>::Output: IntoHost,
                    {
                        catch_panic(ptr::null_mut(), || match operands::<T>(a, b) {
                            Operands::Ready(x, y) => ::core::ops::$Trait::$method(x, y).into_host(),
                            Operands::Foreign => not_implemented(),
                            Operands::Uninitialized => {
                                raise_uninitialized::<T>();
                                ptr::null_mut()
                            }
                        })
                    }
                    adapter::<T>
                }
            }

            impl<T, R> ConvertedRefOp<T> for ops::$marker
            where
                T: Extension,
                R: IntoHost,
                for<'a> &'a T: ::core::ops::$Trait<&'a T, Output = R>,
            {
                fn converted_ref() -> BinaryFunc {
                    unsafe extern "C" fn adapter<T, R>(a: *mut Object, b: *mut Object) -> *mut Object
                    where
                        T: Extension,
                        R: IntoHost,
                        for<'a> &'a T: ::core::ops::$Trait<&'a T, Output = R>,
                    {
                        catch_panic(ptr::null_mut(), || match operand_refs::<T>(a, b) {
                            Operands::Ready(x, y) => ::core::ops::$Trait::$method(x, y).into_host(),
                            Operands::Foreign => not_implemented(),
                            Operands::Uninitialized => {
                                raise_uninitialized::<T>();
                                ptr::null_mut()
                            }
                        })
                    }
                    adapter::<T, R>
                }
            }
        )*
    };
}

binary_probes! {
    Add => Add::add,
    Sub => Sub::sub,
    Mul => Mul::mul,
    Div => Div::div,
    Rem => Rem::rem,
    BitXor => BitXor::bitxor,
    Shl => Shl::shl,
    Shr => Shr::shr,
    BitAnd => BitAnd::bitand,
    BitOr => BitOr::bitor,
}

// ============================================================================
// In-Place Operators
// ============================================================================

// The right operand is cloned before the left one is borrowed mutably, so
// `a += a` never aliases.
macro_rules! inplace_probes {
    ($($marker:ident => $Trait:ident :: $method:ident),* $(,)?) => {
        $(
            impl<T> NativeOp<T> for ops::$marker
            where
                T: Extension + Clone + ::core::ops::$Trait,
            {
                fn native() -> BinaryFunc {
                    unsafe extern "C" fn adapter<T>(a: *mut Object, b: *mut Object) -> *mut Object
                    where
                        T: Extension + Clone + ::core::ops::$Trait,
                    {
                        catch_panic(ptr::null_mut(), || {
                            let (Some(lhs), Some(rhs)) = (Instance::<T>::cast(a), Instance::<T>::cast(b)) else {
                                return not_implemented();
                            };
                            let Some(rhs) = (*rhs).get().cloned() else {
                                raise_uninitialized::<T>();
                                return ptr::null_mut();
                            };
                            let Some(lhs) = (*lhs).get_mut() else {
                                raise_uninitialized::<T>();
                                return ptr::null_mut();
                            };
                            ::core::ops::$Trait::$method(lhs, rhs);
                            retain(a);
                            a
                        })
                    }
                    adapter::<T>
                }
            }
        )*
    };
}

inplace_probes! {
    AddAssign => AddAssign::add_assign,
    SubAssign => SubAssign::sub_assign,
    MulAssign => MulAssign::mul_assign,
    DivAssign => DivAssign::div_assign,
    RemAssign => RemAssign::rem_assign,
    ShlAssign => ShlAssign::shl_assign,
    ShrAssign => ShrAssign::shr_assign,
    BitAndAssign => BitAndAssign::bitand_assign,
    BitXorAssign => BitXorAssign::bitxor_assign,
    BitOrAssign => BitOrAssign::bitor_assign,
}

// ============================================================================
// Unary Operators
// ============================================================================

macro_rules! unary_probes {
    ($($marker:ident => [$($prefix:tt)*] $Trait:ident :: $method:ident),* $(,)?) => {
        $(
            impl<T> NativeOp<T> for ops::$marker
            where
                T: Extension + Clone + $($prefix)* $Trait<Output = T>,
            {
                fn native() -> UnaryFunc {
                    unsafe extern "C" fn adapter<T>(obj: *mut Object) -> *mut Object
                    where
                        T: Extension + Clone + $($prefix)* $Trait<Output = T>,
                    {
                        catch_panic(ptr::null_mut(), || {
                            with_value::<T, _>(obj, ptr::null_mut(), |x| {
                                Instance::<T>::make($($prefix)* $Trait::$method(x.clone()))
                            })
                        })
                    }
                    adapter::<T>
                }
            }

            impl<T> NativeRefOp<T> for ops::$marker
            where
                T: Extension,
                for<'a> &'a T: $($prefix)* $Trait<Output = T>,
            {
                fn native_ref() -> UnaryFunc {
                    unsafe extern "C" fn adapter<T>(obj: *mut Object) -> *mut Object
                    where
                        T: Extension,
                        for<'a> &'a T: $($prefix)* $Trait<Output = T>,
                    {
                        catch_panic(ptr::null_mut(), || {
                            with_value::<T, _>(obj, ptr::null_mut(), |x| {
                                Instance::<T>::make($($prefix)* $Trait::$method(x))
                            })
                        })
                    }
                    adapter::<T>
                }
            }

            impl<T> ConvertedOp<T> for ops::$marker
            where
                T: Extension + Clone + $($prefix)* $Trait,
                <T as $($prefix)* $Trait>::Output: IntoHost,
            {
                fn converted() -> UnaryFunc {
                    unsafe extern "C" fn adapter<T>(obj: *mut Object) -> *mut Object
                    where
                        T: Extension + Clone + $($prefix)* $Trait,
                        <T as $($prefix)* $Trait>::Output: IntoHost,
                    {
                        catch_panic(ptr::null_mut(), || {
                            with_value::<T, _>(obj, ptr::null_mut(), |x| {
                                $($prefix)* $Trait::$method(x.clone()).into_host()
                            })
                        })
                    }
                    adapter::<T>
                }
            }

            impl<T, R> ConvertedRefOp<T> for ops::$marker
            where
                T: Extension,
                R: IntoHost,
                for<'a> &'a T: $($prefix)* $Trait<Output = R>,
            {
                fn converted_ref() -> UnaryFunc {
                    unsafe extern "C" fn adapter<T, R>(obj: *mut Object) -> *mut Object
                    where
                        T: Extension,
                        R: IntoHost,
                        for<'a> &'a T: $($prefix)* $Trait<Output = R>,
                    {
                        catch_panic(ptr::null_mut(), || {
                            with_value::<T, _>(obj, ptr::null_mut(), |x| {
                                $($prefix)* $Trait::$method(x).into_host()
                            })
                        })
                    }
                    adapter::<T, R>
                }
            }
        )*
    };
}

unary_probes! {
    Neg => [::core::ops::] Neg::neg,
    Not => [::core::ops::] Not::not,
    Pos => [crate::ops::] Positive::positive,
}

// ============================================================================
// Conversions
// ============================================================================

macro_rules! conversion_probes {
    ($($marker:ident => $target:ty),* $(,)?) => {
        $(
            impl<T> ConvertedOp<T> for ops::$marker
            where
                T: Extension + Clone + Into<$target>,
            {
                fn converted() -> UnaryFunc {
                    unsafe extern "C" fn adapter<T>(obj: *mut Object) -> *mut Object
                    where
                        T: Extension + Clone + Into<$target>,
                    {
                        catch_panic(ptr::null_mut(), || {
                            with_value::<T, _>(obj, ptr::null_mut(), |x| {
                                Into::<$target>::into(x.clone()).into_host()
                            })
                        })
                    }
                    adapter::<T>
                }
            }
        )*
    };
}

conversion_probes! {
    Int => i64,
    Float => f64,
}

impl<T> ConvertedOp<T> for ops::Bool
where
    T: Extension + Clone + Into<bool>,
{
    fn converted() -> InquiryFunc {
        unsafe extern "C" fn adapter<T>(obj: *mut Object) -> c_int
        where
            T: Extension + Clone + Into<bool>,
        {
            catch_panic(-1, || {
                with_value::<T, _>(obj, -1, |x| c_int::from(Into::<bool>::into(x.clone())))
            })
        }
        adapter::<T>
    }
}

// ============================================================================
// Construction and String Conversion
// ============================================================================

impl<T> NativeOp<T> for ops::New
where
    T: Extension + Default,
{
    fn native() -> NewFunc {
        default_new::<T>
    }
}

impl<T> ConvertedOp<T> for ops::Str
where
    T: Extension + Display,
{
    fn converted() -> ReprFunc {
        unsafe extern "C" fn adapter<T: Extension + Display>(obj: *mut Object) -> *mut Object {
            catch_panic(ptr::null_mut(), || {
                with_value::<T, _>(obj, ptr::null_mut(), |x| x.to_string().into_host())
            })
        }
        adapter::<T>
    }
}

impl<T> ConvertedOp<T> for ops::Repr
where
    T: Extension + Debug,
{
    fn converted() -> ReprFunc {
        unsafe extern "C" fn adapter<T: Extension + Debug>(obj: *mut Object) -> *mut Object {
            catch_panic(ptr::null_mut(), || {
                with_value::<T, _>(obj, ptr::null_mut(), |x| format!("{:?}", x).into_host())
            })
        }
        adapter::<T>
    }
}

// ============================================================================
// Synthesis Macros
// ============================================================================

/// Probe one operation on a concrete type, yielding a [`Probed`].
///
/// `$op` names a marker in [`ops`](crate::ops).
#[macro_export]
macro_rules! probe {
    ($ty:ty, $op:ident) => {{
        #[allow(unused_imports)]
        use $crate::probe::{
            ConvertedRefTier as _, ConvertedTier as _, NativeRefTier as _, NativeTier as _,
            UnsupportedTier as _,
        };
        (&&&&&$crate::probe::Probe::<$ty, $crate::ops::$op>::new()).slot()
    }};
}

/// Synthesize the full operator table of a concrete type.
#[macro_export]
macro_rules! number_methods {
    ($ty:ty) => {
        $crate::NumberMethods {
            add: $crate::probe!($ty, Add).slot,
            subtract: $crate::probe!($ty, Sub).slot,
            multiply: $crate::probe!($ty, Mul).slot,
            divide: $crate::probe!($ty, Div).slot,
            remainder: $crate::probe!($ty, Rem).slot,
            negative: $crate::probe!($ty, Neg).slot,
            positive: $crate::probe!($ty, Pos).slot,
            boolean: $crate::probe!($ty, Bool).slot,
            invert: $crate::probe!($ty, Not).slot,
            lshift: $crate::probe!($ty, Shl).slot,
            rshift: $crate::probe!($ty, Shr).slot,
            and: $crate::probe!($ty, BitAnd).slot,
            xor: $crate::probe!($ty, BitXor).slot,
            or: $crate::probe!($ty, BitOr).slot,
            int: $crate::probe!($ty, Int).slot,
            float: $crate::probe!($ty, Float).slot,
            inplace_add: $crate::probe!($ty, AddAssign).slot,
            inplace_subtract: $crate::probe!($ty, SubAssign).slot,
            inplace_multiply: $crate::probe!($ty, MulAssign).slot,
            inplace_divide: $crate::probe!($ty, DivAssign).slot,
            inplace_remainder: $crate::probe!($ty, RemAssign).slot,
            inplace_lshift: $crate::probe!($ty, ShlAssign).slot,
            inplace_rshift: $crate::probe!($ty, ShrAssign).slot,
            inplace_and: $crate::probe!($ty, BitAndAssign).slot,
            inplace_xor: $crate::probe!($ty, BitXorAssign).slot,
            inplace_or: $crate::probe!($ty, BitOrAssign).slot,
        }
    };
}

/// Synthesize [`ExtensionSlots`](crate::ExtensionSlots) for a concrete type.
///
/// Default-constructible types allocate and construct in `new`; others get
/// raw storage only and rely on an initializer. Pass `number` to attach the
/// operator table.
#[macro_export]
macro_rules! extension_slots {
    ($ty:ty) => {
        $crate::ExtensionSlots {
            new: match $crate::probe!($ty, New).slot {
                ::core::option::Option::Some(new) => ::core::option::Option::Some(new),
                ::core::option::Option::None => ::core::option::Option::Some(
                    $crate::raw_new as $crate::NewFunc,
                ),
            },
            str: $crate::probe!($ty, Str).slot,
            repr: $crate::probe!($ty, Repr).slot,
            number: ::core::option::Option::None,
        }
    };
    ($ty:ty, number) => {
        $crate::ExtensionSlots {
            number: ::core::option::Option::Some($crate::number_methods!($ty)),
            ..$crate::extension_slots!($ty)
        }
    };
}

/// Implement [`Extension`](crate::Extension) and [`IntoHost`](crate::IntoHost)
/// for a concrete type without the derive.
///
/// ```
/// #[derive(Clone, Default, Debug)]
/// struct Counter(u32);
///
/// graft_sdk::extension!(Counter => "demo.Counter", doc = "A counter");
///
/// use graft_sdk::Extension;
/// assert_eq!(Counter::NAME, "demo.Counter");
/// assert!(Counter::slots().repr.is_some());
/// assert!(Counter::slots().number.is_none());
/// ```
#[macro_export]
macro_rules! extension {
    (@impl $ty:ty, $name:expr, [$($doc:expr)?], $slots:expr) => {
        impl $crate::Extension for $ty {
            const NAME: &'static str = $name;
            $(const DOC: &'static str = $doc;)?

            fn slots() -> $crate::ExtensionSlots {
                $slots
            }
        }

        impl $crate::IntoHost for $ty {
            fn into_host(self) -> *mut $crate::Object {
                $crate::Instance::<$ty>::make(self)
            }
        }
    };
    ($ty:ty => $name:expr $(, doc = $doc:expr)?) => {
        $crate::extension!(@impl $ty, $name, [$($doc)?], $crate::extension_slots!($ty));
    };
    ($ty:ty => $name:expr $(, doc = $doc:expr)?, number) => {
        $crate::extension!(@impl $ty, $name, [$($doc)?], $crate::extension_slots!($ty, number));
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default, PartialEq, Debug)]
    struct Scalar(i64);

    impl std::ops::Add for Scalar {
        type Output = Scalar;
        fn add(self, rhs: Scalar) -> Scalar {
            Scalar(self.0 + rhs.0)
        }
    }

    impl std::ops::Sub for Scalar {
        type Output = i64;
        fn sub(self, rhs: Scalar) -> i64 {
            self.0 - rhs.0
        }
    }

    impl std::ops::MulAssign for Scalar {
        fn mul_assign(&mut self, rhs: Scalar) {
            self.0 *= rhs.0;
        }
    }

    impl From<Scalar> for i64 {
        fn from(s: Scalar) -> i64 {
            s.0
        }
    }

    impl Extension for Scalar {
        const NAME: &'static str = "test.Scalar";

        fn slots() -> crate::ExtensionSlots {
            crate::extension_slots!(Scalar, number)
        }
    }

    impl IntoHost for Scalar {
        fn into_host(self) -> *mut Object {
            Instance::<Scalar>::make(self)
        }
    }

    #[test]
    fn test_native_preferred_over_converted() {
        // Scalar + Scalar is Scalar, which also implements IntoHost.
        assert_eq!(probe!(Scalar, Add).capability, Capability::Native);
    }

    #[test]
    fn test_converted_result() {
        assert_eq!(probe!(Scalar, Sub).capability, Capability::Converted);
        assert_eq!(probe!(Scalar, Int).capability, Capability::Converted);
    }

    #[test]
    fn test_unsupported_leaves_slot_empty() {
        let probed = probe!(Scalar, Div);
        assert_eq!(probed.capability, Capability::Unsupported);
        assert!(!probed.is_supported());
        assert!(probe!(Scalar, Float).slot.is_none());
        assert!(probe!(Scalar, Bool).slot.is_none());
    }

    #[test]
    fn test_inplace_is_independent_of_binary() {
        assert!(probe!(Scalar, AddAssign).slot.is_none());
        assert_eq!(probe!(Scalar, MulAssign).capability, Capability::Native);
        assert!(probe!(Scalar, Mul).slot.is_none());
    }

    #[test]
    fn test_table_matches_probes() {
        let table = number_methods!(Scalar);
        let populated: Vec<_> = table.populated().into_iter().map(|s| s.name()).collect();
        assert_eq!(populated, ["add", "subtract", "int", "inplace_multiply"]);
    }

    #[test]
    fn test_default_constructible_gets_default_new() {
        assert_eq!(probe!(Scalar, New).capability, Capability::Native);
        let slots = Scalar::slots();
        assert!(slots.new.is_some());
        assert!(slots.str.is_none());
        assert!(slots.repr.is_some());
        assert!(slots.number.is_some());
    }

    /// Operators on references only, no `Clone`.
    #[derive(Debug, Default, PartialEq)]
    struct Big(Vec<i64>);

    impl<'a> std::ops::Add for &'a Big {
        type Output = Big;
        fn add(self, rhs: &'a Big) -> Big {
            Big(self.0.iter().zip(&rhs.0).map(|(x, y)| x + y).collect())
        }
    }

    impl<'a> std::ops::Sub for &'a Big {
        type Output = usize;
        fn sub(self, rhs: &'a Big) -> usize {
            self.0.len().abs_diff(rhs.0.len())
        }
    }

    impl std::ops::Neg for &Big {
        type Output = Big;
        fn neg(self) -> Big {
            Big(self.0.iter().map(|x| -x).collect())
        }
    }

    crate::extension!(Big => "test.Big", number);

    #[test]
    fn test_reference_operators_are_probed() {
        assert_eq!(probe!(Big, Add).capability, Capability::Native);
        assert_eq!(probe!(Big, Neg).capability, Capability::Native);
        assert_eq!(probe!(Big, Sub).capability, Capability::Converted);
        assert_eq!(probe!(Big, Mul).capability, Capability::Unsupported);

        let table = number_methods!(Big);
        let populated: Vec<_> = table.populated().into_iter().map(|s| s.name()).collect();
        assert_eq!(populated, ["add", "subtract", "negative"]);
    }

    #[test]
    fn test_catch_panic_returns_fallback() {
        let value = catch_panic(-1, || -> i32 { panic!("boom") });
        assert_eq!(value, -1);
        assert_eq!(catch_panic(-1, || 7), 7);
    }
}
