//! Arithmetic, comparison and logical operators with their runtime codes.
//!
//! The codes form one contiguous table shared with the runtime evaluator:
//! logical operators `0..=2`, comparisons `3..=6`, arithmetic `7..=11`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MathOp {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
}

impl MathOp {
    pub const fn code(self) -> u8 {
        match self {
            MathOp::Div => 7,
            MathOp::Minus => 8,
            MathOp::Mod => 9,
            MathOp::Mul => 10,
            MathOp::Plus => 11,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            MathOp::Div => "MATH_DIV",
            MathOp::Minus => "MATH_MINUS",
            MathOp::Mod => "MATH_MOD",
            MathOp::Mul => "MATH_MUL",
            MathOp::Plus => "MATH_PLUS",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            MathOp::Plus => "+",
            MathOp::Minus => "-",
            MathOp::Mul => "*",
            MathOp::Div => "/",
            MathOp::Mod => "%",
        }
    }

    pub const fn is_additive(self) -> bool {
        matches!(self, MathOp::Plus | MathOp::Minus)
    }

    pub const fn is_multiplicative(self) -> bool {
        matches!(self, MathOp::Mul | MathOp::Div)
    }

    /// Whether growing the right operand shrinks the result.
    ///
    /// `%` is treated as decreasing in its right operand as well.
    pub const fn flips_right(self) -> bool {
        matches!(self, MathOp::Minus | MathOp::Div | MathOp::Mod)
    }

    pub const fn inverse(self) -> Option<MathOp> {
        match self {
            MathOp::Plus => Some(MathOp::Minus),
            MathOp::Minus => Some(MathOp::Plus),
            MathOp::Mul => Some(MathOp::Div),
            MathOp::Div => Some(MathOp::Mul),
            MathOp::Mod => None,
        }
    }

    /// Integer folding; `None` when the result must stay symbolic.
    pub fn apply_int(self, lhs: i32, rhs: i32) -> Option<i32> {
        match self {
            MathOp::Plus => Some(lhs.wrapping_add(rhs)),
            MathOp::Minus => Some(lhs.wrapping_sub(rhs)),
            MathOp::Mul => Some(lhs.wrapping_mul(rhs)),
            MathOp::Div if rhs != 0 && lhs.wrapping_rem(rhs) == 0 => Some(lhs.wrapping_div(rhs)),
            MathOp::Mod if rhs != 0 => Some(lhs.wrapping_rem(rhs)),
            MathOp::Div | MathOp::Mod => None,
        }
    }

    /// Float folding; division and modulo by zero stay symbolic.
    pub fn apply_float(self, lhs: f32, rhs: f32) -> Option<f32> {
        match self {
            MathOp::Plus => Some(lhs + rhs),
            MathOp::Minus => Some(lhs - rhs),
            MathOp::Mul => Some(lhs * rhs),
            MathOp::Div if rhs != 0.0 => Some(lhs / rhs),
            MathOp::Mod if rhs != 0.0 => Some(lhs % rhs),
            MathOp::Div | MathOp::Mod => None,
        }
    }

    /// Integer evaluation as the runtime performs it: arithmetic wraps and
    /// division truncates toward zero.
    pub fn apply_runtime(self, lhs: i32, rhs: i32) -> Option<i32> {
        match self {
            MathOp::Div if rhs != 0 => Some(lhs.wrapping_div(rhs)),
            MathOp::Div => None,
            other => other.apply_int(lhs, rhs),
        }
    }
}

impl fmt::Display for MathOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Different,
    Equal,
    Greater,
    Lower,
}

impl CompareOp {
    pub const fn code(self) -> u8 {
        match self {
            CompareOp::Different => 3,
            CompareOp::Equal => 4,
            CompareOp::Greater => 5,
            CompareOp::Lower => 6,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            CompareOp::Different => "COMP_DIFFERENT",
            CompareOp::Equal => "COMP_EQUAL",
            CompareOp::Greater => "COMP_GREATER",
            CompareOp::Lower => "COMP_LOWER",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            CompareOp::Different => "!=",
            CompareOp::Equal => "==",
            CompareOp::Greater => ">",
            CompareOp::Lower => "<",
        }
    }

    /// Operator to use once the two sides are swapped.
    pub const fn mirrored(self) -> CompareOp {
        match self {
            CompareOp::Greater => CompareOp::Lower,
            CompareOp::Lower => CompareOp::Greater,
            other => other,
        }
    }

    pub fn evaluate(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Different => lhs != rhs,
            CompareOp::Equal => lhs == rhs,
            CompareOp::Greater => lhs > rhs,
            CompareOp::Lower => lhs < rhs,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Logical connective. `IFF` never survives construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Imply,
    Or,
}

impl LogicOp {
    pub const fn code(self) -> u8 {
        match self {
            LogicOp::And => 0,
            LogicOp::Imply => 1,
            LogicOp::Or => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            LogicOp::And => "BOOL_AND",
            LogicOp::Imply => "BOOL_IMPLY",
            LogicOp::Or => "BOOL_OR",
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            LogicOp::And => "&&",
            LogicOp::Imply => "->",
            LogicOp::Or => "||",
        }
    }

    /// AND and IMPLY make both sides hold together; their shared
    /// quantifiers link attributes.
    pub const fn is_conjunctive(self) -> bool {
        matches!(self, LogicOp::And | LogicOp::Imply)
    }
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
