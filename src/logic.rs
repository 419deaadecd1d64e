//! Boolean formula trees and their builder.
//!
//! Constructors fold eagerly: constant connectives collapse, constant
//! comparisons become leaves, and every comparison is rearranged so that its
//! left side carries the attribute terms in normalized form.

use crate::error::QuantifierError;
use crate::math::MathNode;
use crate::normalize::{affine_terms, normalize, Link};
use crate::operators::{CompareOp, LogicOp, MathOp};
use crate::scope::QuantificationScope;
use crate::value::{AttributeRef, QuantifierKind, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Shape of a boolean node.
#[derive(Debug, Clone, PartialEq)]
pub enum BoolKind {
    Leaf(bool),
    Compare {
        op: CompareOp,
        left: MathNode,
        right: MathNode,
    },
    Logic {
        op: LogicOp,
        left: Box<BoolNode>,
        right: Box<BoolNode>,
    },
    /// Named sub-formula, substituted before resolution.
    Alias(String),
}

/// Boolean formula node with its own quantification scope.
#[derive(Debug, Clone, PartialEq)]
pub struct BoolNode {
    pub(crate) negated: bool,
    pub(crate) scope: QuantificationScope,
    pub(crate) kind: BoolKind,
}

/// `expr < below OR expr > above` with `below <= above`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalTest {
    pub below: i32,
    pub above: i32,
}

impl BoolNode {
    fn with_kind(kind: BoolKind) -> Self {
        Self {
            negated: false,
            scope: QuantificationScope::default(),
            kind,
        }
    }

    pub fn constant(value: bool) -> Self {
        Self::with_kind(BoolKind::Leaf(value))
    }

    /// Placeholder for a named alias.
    pub fn alias(name: impl Into<String>) -> Self {
        Self::with_kind(BoolKind::Alias(name.into()))
    }

    /// Builds `left op right`.
    ///
    /// Constant-only operands are folded first, then two constants fold to
    /// a leaf. A `(1, 0)` depth pair is kept, `(0, 1)` is swapped with the
    /// operator mirrored, anything else becomes `(left - right) op 0`. The
    /// left side is then normalized.
    pub fn compare(op: CompareOp, left: MathNode, right: MathNode) -> Self {
        let (left, right) = (fold_constant_side(left), fold_constant_side(right));
        if let Some(value) = fold_comparison(op, &left, &right) {
            return Self::constant(value);
        }
        let (op, left, right) = match (left.depth(), right.depth()) {
            (1, 0) => (op, left, right),
            (0, 1) => (op.mirrored(), right, left),
            _ => (op, MathNode::join(MathOp::Minus, left, right), MathNode::int(0)),
        };
        let left = normalize(left);
        let right = normalize(right);
        if let Some(value) = fold_comparison(op, &left, &right) {
            return Self::constant(value);
        }
        debug!(%op, %left, %right, "built comparison");
        Self::with_kind(BoolKind::Compare { op, left, right })
    }

    /// Builds `left op right`, folding constant operands.
    pub fn logic(op: LogicOp, left: BoolNode, right: BoolNode) -> Self {
        match (op, left.as_constant(), right.as_constant()) {
            (LogicOp::And, Some(false), _) | (LogicOp::And, _, Some(false)) => Self::constant(false),
            (LogicOp::And, Some(true), _) => right,
            (LogicOp::And, _, Some(true)) => left,
            (LogicOp::Or, Some(true), _) | (LogicOp::Or, _, Some(true)) => Self::constant(true),
            (LogicOp::Or, Some(false), _) => right,
            (LogicOp::Or, _, Some(false)) => left,
            (LogicOp::Imply, Some(false), _) | (LogicOp::Imply, _, Some(true)) => Self::constant(true),
            (LogicOp::Imply, Some(true), _) => right,
            _ => Self::with_kind(BoolKind::Logic {
                op,
                left: Box::new(left),
                right: Box::new(right),
            }),
        }
    }

    pub fn and(left: BoolNode, right: BoolNode) -> Self {
        Self::logic(LogicOp::And, left, right)
    }

    pub fn or(left: BoolNode, right: BoolNode) -> Self {
        Self::logic(LogicOp::Or, left, right)
    }

    pub fn imply(left: BoolNode, right: BoolNode) -> Self {
        Self::logic(LogicOp::Imply, left, right)
    }

    /// `a <-> b`, expanded to `(a -> b) && (b -> a)` over deep copies.
    pub fn iff(left: BoolNode, right: BoolNode) -> Self {
        let forward = Self::imply(left.clone(), right.clone());
        let backward = Self::imply(right, left);
        Self::and(forward, backward)
    }

    /// Logical negation; constants fold.
    pub fn negate(mut self) -> Self {
        match self.kind {
            BoolKind::Leaf(ref mut value) => *value = !*value,
            _ => self.negated = !self.negated,
        }
        self
    }

    /// Attaches `scope`, merging with any scope already present.
    pub fn quantified(mut self, scope: QuantificationScope) -> Result<Self, QuantifierError> {
        self.scope.merge(scope)?;
        Ok(self)
    }

    /// Shorthand for `forall names: self`.
    pub fn forall(self, names: &[&str]) -> Result<Self, QuantifierError> {
        self.quantified(QuantificationScope::of(QuantifierKind::Universal, names)?)
    }

    /// Shorthand for `exists names: self`.
    pub fn exists(self, names: &[&str]) -> Result<Self, QuantifierError> {
        self.quantified(QuantificationScope::of(QuantifierKind::Existential, names)?)
    }

    #[inline]
    pub fn kind(&self) -> &BoolKind {
        &self.kind
    }

    #[inline]
    pub fn scope(&self) -> &QuantificationScope {
        &self.scope
    }

    #[inline]
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Truth value of a constant leaf.
    pub fn as_constant(&self) -> Option<bool> {
        match self.kind {
            BoolKind::Leaf(value) => Some(value ^ self.negated),
            _ => None,
        }
    }

    /// Operator and operands of a non-negated comparison.
    pub fn as_comparison(&self) -> Option<(CompareOp, &MathNode, &MathNode)> {
        match &self.kind {
            BoolKind::Compare { op, left, right } if !self.negated => Some((*op, left, right)),
            _ => None,
        }
    }

    /// Attribute occurrences in pre-order, left to right.
    pub fn attributes(&self) -> Vec<&AttributeRef> {
        let mut out = Vec::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes<'a>(&'a self, out: &mut Vec<&'a AttributeRef>) {
        match &self.kind {
            BoolKind::Compare { left, right, .. } => {
                out.extend(left.attributes());
                out.extend(right.attributes());
            }
            BoolKind::Logic { left, right, .. } => {
                left.collect_attributes(out);
                right.collect_attributes(out);
            }
            BoolKind::Leaf(_) | BoolKind::Alias(_) => {}
        }
    }

    pub(crate) fn for_each_attribute_mut(&mut self, f: &mut impl FnMut(&mut AttributeRef)) {
        match &mut self.kind {
            BoolKind::Compare { left, right, .. } => {
                left.for_each_attribute_mut(f);
                right.for_each_attribute_mut(f);
            }
            BoolKind::Logic { left, right, .. } => {
                left.for_each_attribute_mut(f);
                right.for_each_attribute_mut(f);
            }
            BoolKind::Leaf(_) | BoolKind::Alias(_) => {}
        }
    }

    /// Recognizes `(e < below) || (e > above)` with `below <= above`, where
    /// both sides share the same attribute terms and integer bounds.
    pub fn interval_test(&self) -> Option<IntervalTest> {
        let BoolKind::Logic {
            op: LogicOp::Or,
            left,
            right,
        } = &self.kind
        else {
            return None;
        };
        if self.negated {
            return None;
        }
        let (lower, greater) = match (left.as_comparison()?, right.as_comparison()?) {
            (l @ (CompareOp::Lower, ..), g @ (CompareOp::Greater, ..)) => (l, g),
            (g @ (CompareOp::Greater, ..), l @ (CompareOp::Lower, ..)) => (l, g),
            _ => return None,
        };
        let (below, lower_terms) = bound(lower.1, lower.2)?;
        let (above, greater_terms) = bound(greater.1, greater.2)?;
        (lower_terms == greater_terms && below <= above).then_some(IntervalTest { below, above })
    }

    /// The `<` side of an interval test.
    pub(crate) fn interval_lower_side(&self) -> Option<&BoolNode> {
        match &self.kind {
            BoolKind::Logic { left, right, .. } => [left, right]
                .into_iter()
                .find(|side| matches!(side.as_comparison(), Some((CompareOp::Lower, ..))))
                .map(|side| &**side),
            _ => None,
        }
    }
}

/// Integer bound of `terms + c op rhs` once rewritten as `terms op bound`.
fn bound(left: &MathNode, right: &MathNode) -> Option<(i32, Vec<Link>)> {
    let split = affine_terms(left);
    if split.terms.is_empty() {
        return None;
    }
    let rhs = right.as_constant()?.as_int()?;
    let offset = split.constant.as_int()?;
    Some((rhs.checked_sub(offset)?, split.terms))
}

fn fold_constant_side(node: MathNode) -> MathNode {
    if node.attributes().is_empty() {
        normalize(node)
    } else {
        node
    }
}

fn fold_comparison(op: CompareOp, left: &MathNode, right: &MathNode) -> Option<bool> {
    match (left.as_constant()?, right.as_constant()?) {
        (Value::Bool(a), Value::Bool(b)) => match op {
            CompareOp::Equal => Some(a == b),
            CompareOp::Different => Some(a != b),
            CompareOp::Greater | CompareOp::Lower => None,
        },
        (a, b) => Some(op.evaluate(a.as_f64()?, b.as_f64()?)),
    }
}

impl fmt::Display for BoolNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scope.is_empty() {
            write!(f, "{}: ", self.scope)?;
        }
        if self.negated {
            f.write_str("!")?;
        }
        match &self.kind {
            BoolKind::Leaf(value) => write!(f, "{value}"),
            BoolKind::Compare { op, left, right } => write!(f, "({left} {op} {right})"),
            BoolKind::Logic { op, left, right } => write!(f, "({left} {op} {right})"),
            BoolKind::Alias(name) => write!(f, "${name}"),
        }
    }
}
