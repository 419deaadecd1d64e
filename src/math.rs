//! Arithmetic expression trees.
//!
//! A [`MathNode`] is either a leaf [`Value`] or a binary operator node. Unary
//! minus is not a node of its own; every node carries a `negated` flag.
//! Children are owned through `Box`, so a subtree can only be shared by
//! cloning it.

use crate::operators::MathOp;
use crate::value::{AttributeRef, Value};
use std::fmt;
use tracing::debug;

/// Shape of a math node.
#[derive(Debug, Clone, PartialEq)]
pub enum MathKind {
    Leaf(Value),
    Binary {
        op: MathOp,
        left: Box<MathNode>,
        right: Box<MathNode>,
    },
}

/// Arithmetic expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct MathNode {
    pub(crate) negated: bool,
    pub(crate) kind: MathKind,
}

impl MathNode {
    pub fn leaf(value: impl Into<Value>) -> Self {
        Self {
            negated: false,
            kind: MathKind::Leaf(value.into()),
        }
    }

    pub fn int(value: i32) -> Self {
        Self::leaf(Value::Int(value))
    }

    pub fn float(value: f32) -> Self {
        Self::leaf(Value::float(value))
    }

    /// Leaf for `name@binder`.
    pub fn attribute(name: impl Into<String>, binder: impl Into<String>) -> Self {
        Self::leaf(Value::attribute(name, binder))
    }

    /// Binary node without any folding.
    pub fn binary(op: MathOp, left: MathNode, right: MathNode) -> Self {
        Self {
            negated: false,
            kind: MathKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    /// Binary node with constant folding.
    ///
    /// Two numeric constants are folded; an integer division that is not
    /// exact, or any division by zero, stays symbolic.
    pub fn join(op: MathOp, left: MathNode, right: MathNode) -> Self {
        if let (Some(lhs), Some(rhs)) = (left.as_constant(), right.as_constant()) {
            if let Some(folded) = fold(op, &lhs, &rhs) {
                debug!(%op, %lhs, %rhs, result = %folded, "folded constant operands");
                return MathNode::leaf(folded);
            }
        }
        MathNode::binary(op, left, right)
    }

    /// Toggles the negation flag.
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    #[inline]
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    #[inline]
    pub fn kind(&self) -> &MathKind {
        &self.kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, MathKind::Leaf(_))
    }

    pub fn op(&self) -> Option<MathOp> {
        match &self.kind {
            MathKind::Binary { op, .. } => Some(*op),
            MathKind::Leaf(_) => None,
        }
    }

    /// 0 for constants, 1 for attributes, `1 + max(children)` otherwise.
    pub fn depth(&self) -> usize {
        match &self.kind {
            MathKind::Leaf(value) if value.is_constant() => 0,
            MathKind::Leaf(_) => 1,
            MathKind::Binary { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// The constant this node denotes, negation applied.
    pub fn as_constant(&self) -> Option<Value> {
        match &self.kind {
            MathKind::Leaf(value) if value.is_constant() => {
                if self.negated {
                    value.negated()
                } else {
                    Some(value.clone())
                }
            }
            _ => None,
        }
    }

    /// The attribute of a bare attribute leaf.
    pub fn as_attribute(&self) -> Option<&AttributeRef> {
        match &self.kind {
            MathKind::Leaf(value) => value.as_attribute(),
            MathKind::Binary { .. } => None,
        }
    }

    /// Attribute occurrences, left to right.
    pub fn attributes(&self) -> Vec<&AttributeRef> {
        let mut out = Vec::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes<'a>(&'a self, out: &mut Vec<&'a AttributeRef>) {
        match &self.kind {
            MathKind::Leaf(Value::Attribute(att)) => out.push(att),
            MathKind::Leaf(_) => {}
            MathKind::Binary { left, right, .. } => {
                left.collect_attributes(out);
                right.collect_attributes(out);
            }
        }
    }

    /// Visits attribute occurrences mutably, left to right.
    pub(crate) fn for_each_attribute_mut(&mut self, f: &mut impl FnMut(&mut AttributeRef)) {
        match &mut self.kind {
            MathKind::Leaf(Value::Attribute(att)) => f(att),
            MathKind::Leaf(_) => {}
            MathKind::Binary { left, right, .. } => {
                left.for_each_attribute_mut(f);
                right.for_each_attribute_mut(f);
            }
        }
    }

    /// Evaluation under `env` with the runtime's semantics: integer
    /// operands use wrapping arithmetic and truncating division, and either
    /// float operand makes the operation float.
    ///
    /// Returns `None` for boolean operands of an operator, unbound
    /// attributes, and division or modulo by zero.
    pub fn evaluate<F>(&self, env: &F) -> Option<Value>
    where
        F: Fn(&AttributeRef) -> Option<Value>,
    {
        let value = match &self.kind {
            MathKind::Leaf(Value::Attribute(att)) => env(att)?,
            MathKind::Leaf(value) => value.clone(),
            MathKind::Binary { op, left, right } => {
                match (left.evaluate(env)?, right.evaluate(env)?) {
                    (Value::Int(a), Value::Int(b)) => Value::Int(op.apply_runtime(a, b)?),
                    (a, b) => fold(*op, &a, &b)?,
                }
            }
        };
        if self.negated {
            value.negated()
        } else {
            Some(value)
        }
    }
}

/// Folds two constants under `op`. Either float operand makes the operation
/// float; booleans never fold.
pub(crate) fn fold(op: MathOp, lhs: &Value, rhs: &Value) -> Option<Value> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => op.apply_int(*a, *b).map(Value::Int),
        _ if lhs.is_numeric() && rhs.is_numeric() => {
            op.apply_float(lhs.as_f32()?, rhs.as_f32()?).map(Value::float)
        }
        _ => None,
    }
}

impl fmt::Display for MathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("-")?;
        }
        match &self.kind {
            MathKind::Leaf(value) => write!(f, "{value}"),
            MathKind::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
        }
    }
}
