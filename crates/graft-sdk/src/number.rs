//! Operator dispatch table
//!
//! One [`NumberMethods`] per numeric extension type: fixed-position optional
//! slots the host calls for arithmetic, bitwise and conversion operators. An
//! empty slot means "operation not supported for this type".

use std::fmt;

use crate::type_object::{BinaryFunc, InquiryFunc, UnaryFunc};

/// Fixed-shape operator slot table.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberMethods {
    pub add: Option<BinaryFunc>,
    pub subtract: Option<BinaryFunc>,
    pub multiply: Option<BinaryFunc>,
    pub divide: Option<BinaryFunc>,
    pub remainder: Option<BinaryFunc>,
    pub negative: Option<UnaryFunc>,
    pub positive: Option<UnaryFunc>,
    pub boolean: Option<InquiryFunc>,
    pub invert: Option<UnaryFunc>,
    pub lshift: Option<BinaryFunc>,
    pub rshift: Option<BinaryFunc>,
    pub and: Option<BinaryFunc>,
    pub xor: Option<BinaryFunc>,
    pub or: Option<BinaryFunc>,
    pub int: Option<UnaryFunc>,
    pub float: Option<UnaryFunc>,
    pub inplace_add: Option<BinaryFunc>,
    pub inplace_subtract: Option<BinaryFunc>,
    pub inplace_multiply: Option<BinaryFunc>,
    pub inplace_divide: Option<BinaryFunc>,
    pub inplace_remainder: Option<BinaryFunc>,
    pub inplace_lshift: Option<BinaryFunc>,
    pub inplace_rshift: Option<BinaryFunc>,
    pub inplace_and: Option<BinaryFunc>,
    pub inplace_xor: Option<BinaryFunc>,
    pub inplace_or: Option<BinaryFunc>,
}

/// Names every slot position of [`NumberMethods`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberSlot {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    Negative,
    Positive,
    Bool,
    Invert,
    Lshift,
    Rshift,
    And,
    Xor,
    Or,
    Int,
    Float,
    InplaceAdd,
    InplaceSubtract,
    InplaceMultiply,
    InplaceDivide,
    InplaceRemainder,
    InplaceLshift,
    InplaceRshift,
    InplaceAnd,
    InplaceXor,
    InplaceOr,
}

impl NumberSlot {
    /// Every slot, in table order
    pub const ALL: [NumberSlot; 26] = [
        NumberSlot::Add,
        NumberSlot::Subtract,
        NumberSlot::Multiply,
        NumberSlot::Divide,
        NumberSlot::Remainder,
        NumberSlot::Negative,
        NumberSlot::Positive,
        NumberSlot::Bool,
        NumberSlot::Invert,
        NumberSlot::Lshift,
        NumberSlot::Rshift,
        NumberSlot::And,
        NumberSlot::Xor,
        NumberSlot::Or,
        NumberSlot::Int,
        NumberSlot::Float,
        NumberSlot::InplaceAdd,
        NumberSlot::InplaceSubtract,
        NumberSlot::InplaceMultiply,
        NumberSlot::InplaceDivide,
        NumberSlot::InplaceRemainder,
        NumberSlot::InplaceLshift,
        NumberSlot::InplaceRshift,
        NumberSlot::InplaceAnd,
        NumberSlot::InplaceXor,
        NumberSlot::InplaceOr,
    ];

    /// Slot name as used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            NumberSlot::Add => "add",
            NumberSlot::Subtract => "subtract",
            NumberSlot::Multiply => "multiply",
            NumberSlot::Divide => "divide",
            NumberSlot::Remainder => "remainder",
            NumberSlot::Negative => "negative",
            NumberSlot::Positive => "positive",
            NumberSlot::Bool => "bool",
            NumberSlot::Invert => "invert",
            NumberSlot::Lshift => "lshift",
            NumberSlot::Rshift => "rshift",
            NumberSlot::And => "and",
            NumberSlot::Xor => "xor",
            NumberSlot::Or => "or",
            NumberSlot::Int => "int",
            NumberSlot::Float => "float",
            NumberSlot::InplaceAdd => "inplace_add",
            NumberSlot::InplaceSubtract => "inplace_subtract",
            NumberSlot::InplaceMultiply => "inplace_multiply",
            NumberSlot::InplaceDivide => "inplace_divide",
            NumberSlot::InplaceRemainder => "inplace_remainder",
            NumberSlot::InplaceLshift => "inplace_lshift",
            NumberSlot::InplaceRshift => "inplace_rshift",
            NumberSlot::InplaceAnd => "inplace_and",
            NumberSlot::InplaceXor => "inplace_xor",
            NumberSlot::InplaceOr => "inplace_or",
        }
    }
}

impl fmt::Display for NumberSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl NumberMethods {
    /// Whether `slot` holds an adapter
    pub fn has(&self, slot: NumberSlot) -> bool {
        match slot {
            NumberSlot::Add => self.add.is_some(),
            NumberSlot::Subtract => self.subtract.is_some(),
            NumberSlot::Multiply => self.multiply.is_some(),
            NumberSlot::Divide => self.divide.is_some(),
            NumberSlot::Remainder => self.remainder.is_some(),
            NumberSlot::Negative => self.negative.is_some(),
            NumberSlot::Positive => self.positive.is_some(),
            NumberSlot::Bool => self.boolean.is_some(),
            NumberSlot::Invert => self.invert.is_some(),
            NumberSlot::Lshift => self.lshift.is_some(),
            NumberSlot::Rshift => self.rshift.is_some(),
            NumberSlot::And => self.and.is_some(),
            NumberSlot::Xor => self.xor.is_some(),
            NumberSlot::Or => self.or.is_some(),
            NumberSlot::Int => self.int.is_some(),
            NumberSlot::Float => self.float.is_some(),
            NumberSlot::InplaceAdd => self.inplace_add.is_some(),
            NumberSlot::InplaceSubtract => self.inplace_subtract.is_some(),
            NumberSlot::InplaceMultiply => self.inplace_multiply.is_some(),
            NumberSlot::InplaceDivide => self.inplace_divide.is_some(),
            NumberSlot::InplaceRemainder => self.inplace_remainder.is_some(),
            NumberSlot::InplaceLshift => self.inplace_lshift.is_some(),
            NumberSlot::InplaceRshift => self.inplace_rshift.is_some(),
            NumberSlot::InplaceAnd => self.inplace_and.is_some(),
            NumberSlot::InplaceXor => self.inplace_xor.is_some(),
            NumberSlot::InplaceOr => self.inplace_or.is_some(),
        }
    }

    /// Populated slots, in table order
    pub fn populated(&self) -> Vec<NumberSlot> {
        NumberSlot::ALL.into_iter().filter(|s| self.has(*s)).collect()
    }

    /// True when no slot is populated
    pub fn is_empty(&self) -> bool {
        NumberSlot::ALL.iter().all(|s| !self.has(*s))
    }

    /// Binary slot at `slot`, for binary and in-place positions
    pub fn binary(&self, slot: NumberSlot) -> Option<BinaryFunc> {
        match slot {
            NumberSlot::Add => self.add,
            NumberSlot::Subtract => self.subtract,
            NumberSlot::Multiply => self.multiply,
            NumberSlot::Divide => self.divide,
            NumberSlot::Remainder => self.remainder,
            NumberSlot::Lshift => self.lshift,
            NumberSlot::Rshift => self.rshift,
            NumberSlot::And => self.and,
            NumberSlot::Xor => self.xor,
            NumberSlot::Or => self.or,
            NumberSlot::InplaceAdd => self.inplace_add,
            NumberSlot::InplaceSubtract => self.inplace_subtract,
            NumberSlot::InplaceMultiply => self.inplace_multiply,
            NumberSlot::InplaceDivide => self.inplace_divide,
            NumberSlot::InplaceRemainder => self.inplace_remainder,
            NumberSlot::InplaceLshift => self.inplace_lshift,
            NumberSlot::InplaceRshift => self.inplace_rshift,
            NumberSlot::InplaceAnd => self.inplace_and,
            NumberSlot::InplaceXor => self.inplace_xor,
            NumberSlot::InplaceOr => self.inplace_or,
            _ => None,
        }
    }

    /// Unary slot at `slot`, for unary and int/float conversion positions
    pub fn unary(&self, slot: NumberSlot) -> Option<UnaryFunc> {
        match slot {
            NumberSlot::Negative => self.negative,
            NumberSlot::Positive => self.positive,
            NumberSlot::Invert => self.invert,
            NumberSlot::Int => self.int,
            NumberSlot::Float => self.float,
            _ => None,
        }
    }
}
