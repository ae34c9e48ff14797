//! Operator markers
//!
//! One zero-sized marker per probed operation. [`probe!`](crate::probe) takes
//! a marker name; each marker fixes the slot signature the probe produces.

use crate::type_object::{BinaryFunc, InquiryFunc, NewFunc, ReprFunc, UnaryFunc};

/// Unary plus. Rust has no `+x` operator, so types opt in explicitly.
pub trait Positive {
    /// Result of `+self`
    type Output;

    /// `+self`
    fn positive(self) -> Self::Output;
}

/// An operation a capability probe can look for.
pub trait Operator {
    /// Host slot signature filled when the operation is supported
    type Slot: Copy;
}

macro_rules! markers {
    ($($(#[$doc:meta])* $name:ident => $slot:ty),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $name;

            impl Operator for $name {
                type Slot = $slot;
            }
        )*
    };
}

markers! {
    /// `a + b`
    Add => BinaryFunc,
    /// `a - b`
    Sub => BinaryFunc,
    /// `a * b`
    Mul => BinaryFunc,
    /// `a / b`
    Div => BinaryFunc,
    /// `a % b`
    Rem => BinaryFunc,
    /// `a ^ b`
    BitXor => BinaryFunc,
    /// `a << b`
    Shl => BinaryFunc,
    /// `a >> b`
    Shr => BinaryFunc,
    /// `a & b`
    BitAnd => BinaryFunc,
    /// `a | b`
    BitOr => BinaryFunc,
    /// `a += b`
    AddAssign => BinaryFunc,
    /// `a -= b`
    SubAssign => BinaryFunc,
    /// `a *= b`
    MulAssign => BinaryFunc,
    /// `a /= b`
    DivAssign => BinaryFunc,
    /// `a %= b`
    RemAssign => BinaryFunc,
    /// `a <<= b`
    ShlAssign => BinaryFunc,
    /// `a >>= b`
    ShrAssign => BinaryFunc,
    /// `a &= b`
    BitAndAssign => BinaryFunc,
    /// `a ^= b`
    BitXorAssign => BinaryFunc,
    /// `a |= b`
    BitOrAssign => BinaryFunc,
    /// `-a`
    Neg => UnaryFunc,
    /// `+a`
    Pos => UnaryFunc,
    /// `!a`, the host's invert
    Not => UnaryFunc,
    /// Conversion to `bool`
    Bool => InquiryFunc,
    /// Conversion to `i64`
    Int => UnaryFunc,
    /// Conversion to `f64`
    Float => UnaryFunc,
    /// Default construction
    New => NewFunc,
    /// `Display`
    Str => ReprFunc,
    /// `Debug`
    Repr => ReprFunc,
}
