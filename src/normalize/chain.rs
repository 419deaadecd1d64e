//! Flattened operator chains: inline, reduce and factor.
//!
//! A [`Chain`] is the list of operands of one operator-homogeneous subtree,
//! each tagged with whether it is joined through the policy's negative
//! operator. Rebuilding a chain always yields the left-recursive form
//! `((o0 op o1) op o2) ...`. Right children are never chain nodes, except
//! for a quotient multiplied or divided from the right, which keeps its own
//! truncating division.

use super::policy::{ChainKind, ChainPolicy};
use super::{normalize, settle};
use crate::math::{fold, MathKind, MathNode};
use crate::operators::MathOp;
use crate::value::{AttributeRef, Value};

/// One operand of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Joined through the policy's negative operator.
    pub inverse: bool,
    pub node: MathNode,
}

impl Link {
    fn plain(node: MathNode) -> Self {
        Self {
            inverse: false,
            node,
        }
    }
}

/// Operands of one operator-homogeneous subtree.
#[derive(Debug, Clone)]
pub struct Chain {
    policy: ChainPolicy,
    /// Sign collected from operands when the policy does not track negation.
    negated: bool,
    links: Vec<Link>,
}

impl Chain {
    /// Flattens `node` under `policy`. Operands that belong to another
    /// policy are normalized on the way.
    pub fn flatten(node: MathNode, policy: &ChainPolicy) -> Self {
        let mut chain = Chain {
            policy: *policy,
            negated: false,
            links: Vec::new(),
        };
        chain.collect(node, false, true);
        chain
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn into_links(self) -> Vec<Link> {
        self.links
    }

    /// `leading` is set along the left spine, where a chain node can always
    /// be split into links.
    fn collect(&mut self, node: MathNode, inverse: bool, leading: bool) {
        let splits = self.splits(&node, leading);
        let MathNode { negated, kind } = node;
        let inverse = self.absorb(negated, inverse);
        match kind {
            MathKind::Binary { op, left, right } if splits => {
                self.collect(*left, inverse, leading);
                self.collect(*right, inverse ^ (op == self.policy.negative), false);
            }
            MathKind::Leaf(value) => self.links.push(Link {
                inverse,
                node: MathNode::leaf(value),
            }),
            kind => {
                let operand = normalize(MathNode {
                    negated: false,
                    kind,
                });
                if self.splits(&operand, leading) {
                    self.collect(operand, inverse, leading);
                    return;
                }
                let MathNode { negated, kind } = operand;
                let inverse = self.absorb(negated, inverse);
                self.links.push(Link {
                    inverse,
                    node: MathNode {
                        negated: false,
                        kind,
                    },
                });
            }
        }
    }

    /// Whether `node` is a chain node that can be split here. Off the left
    /// spine a product only splits when it never divides, since
    /// `x * (y / z)` and `(x * y) / z` differ once division truncates.
    fn splits(&self, node: &MathNode, leading: bool) -> bool {
        node.op().is_some_and(|op| self.policy.applies_to(op))
            && (leading || self.policy.kind == ChainKind::Additive || is_pure_product(node))
    }

    fn absorb(&mut self, negated: bool, inverse: bool) -> bool {
        if !negated {
            inverse
        } else if self.policy.tracks_negation {
            !inverse
        } else {
            self.negated = !self.negated;
            inverse
        }
    }

    /// Folds constant operands into a single literal at the end of the chain,
    /// or at the end of each run of a product.
    pub fn reduce(&mut self) {
        match self.policy.kind {
            ChainKind::Additive => self.reduce_sum(),
            ChainKind::Multiplicative => self.reduce_product(),
        }
    }

    fn reduce_sum(&mut self) {
        let policy = self.policy;
        let mut acc = Value::Int(policy.neutral);
        let mut free = Vec::with_capacity(self.links.len());
        for link in self.links.drain(..) {
            let op = if link.inverse { policy.negative } else { policy.positive };
            match link.node.as_constant().and_then(|c| fold(op, &acc, &c)) {
                Some(next) => acc = next,
                None => free.push(link),
            }
        }
        if free.is_empty() {
            self.links = vec![Link::plain(MathNode::leaf(acc))];
            return;
        }
        if !acc.is_int(policy.neutral) {
            let link = match acc.negated() {
                Some(magnitude) if acc.is_negative() && !magnitude.is_negative() => Link {
                    inverse: true,
                    node: MathNode::leaf(magnitude),
                },
                _ => Link::plain(MathNode::leaf(acc)),
            };
            free.push(link);
        }
        self.links = free;
    }

    /// Products are reduced run by run. Operands of one run of `*` (or of
    /// `/`) commute under truncating integer division, so their constants
    /// fold together. Across runs only an exact divisor cancels into the
    /// multiplier right in front of it: `(p * 6) / 2 == p * 3`, while
    /// `(p / 2) * 2` is left alone.
    fn reduce_product(&mut self) {
        let mut runs: Vec<Run> = Vec::new();
        for link in self.links.drain(..) {
            match runs.last_mut() {
                Some(run) if run.inverse == link.inverse => run.push(link.node),
                _ => {
                    let mut run = Run::new(link.inverse);
                    run.push(link.node);
                    runs.push(run);
                }
            }
        }
        for run in &mut runs {
            if run.lift_sign() {
                self.negated = !self.negated;
            }
        }
        settle_runs(&mut runs);
        self.links = runs.into_iter().flat_map(Run::into_links).collect();
    }

    /// Merges additive operands on the same attribute occurrence by summing
    /// their signed integer coefficients. Operands summing to zero vanish.
    pub fn factor(&mut self) {
        if self.policy.kind != ChainKind::Additive {
            return;
        }
        let mut merged: Vec<(Link, Option<(AttributeRef, i32)>)> = Vec::with_capacity(self.links.len());
        for link in self.links.drain(..) {
            let term = coefficient(&link.node).map(|(att, c)| {
                let signed = if link.inverse { c.wrapping_neg() } else { c };
                (att.clone(), signed)
            });
            if let Some((att, c)) = &term {
                let earlier = merged
                    .iter_mut()
                    .find_map(|(_, seen)| match seen {
                        Some((other, total)) if other.same_occurrence(att) => Some(total),
                        _ => None,
                    });
                if let Some(total) = earlier {
                    *total = total.wrapping_add(*c);
                    continue;
                }
            }
            merged.push((link, term));
        }
        self.links = merged
            .into_iter()
            .filter_map(|(link, term)| match term {
                None => Some(link),
                Some((att, total)) => term_link(att, total),
            })
            .collect();
    }

    /// Rebuilds the left-recursive tree.
    pub fn into_node(self) -> MathNode {
        let Chain {
            policy,
            negated,
            links,
        } = self;
        let mut links = links.into_iter();
        let mut node = match links.next() {
            None => MathNode::int(policy.neutral),
            Some(Link { inverse: false, node }) => node,
            Some(Link { inverse: true, node }) => match policy.kind {
                ChainKind::Additive => settle(node.negate()),
                ChainKind::Multiplicative => {
                    MathNode::binary(policy.negative, MathNode::int(policy.neutral), node)
                }
            },
        };
        for link in links {
            let op = if link.inverse { policy.negative } else { policy.positive };
            node = MathNode::binary(op, node, link.node);
        }
        if negated {
            node = node.negate();
        }
        settle(node)
    }
}

/// A `*` node whose multiplicative descendants are all `*` as well.
fn is_pure_product(node: &MathNode) -> bool {
    match node.kind() {
        MathKind::Binary {
            op: MathOp::Mul,
            left,
            right,
        } => [left, right].into_iter().all(|child| match child.op() {
            Some(MathOp::Mul) => is_pure_product(child),
            Some(MathOp::Div) => false,
            _ => true,
        }),
        _ => false,
    }
}

/// Consecutive operands of a product joined through the same operator.
#[derive(Debug)]
struct Run {
    inverse: bool,
    free: Vec<MathNode>,
    constant: Value,
}

impl Run {
    fn new(inverse: bool) -> Self {
        Self {
            inverse,
            free: Vec::new(),
            constant: Value::Int(1),
        }
    }

    fn push(&mut self, node: MathNode) {
        match node.as_constant() {
            Some(value) => self.absorb(value),
            None => self.free.push(node),
        }
    }

    fn absorb(&mut self, value: Value) {
        match product(&self.constant, &value, self.inverse) {
            Some(next) => self.constant = next,
            None => self.free.push(MathNode::leaf(value)),
        }
    }

    fn extend(&mut self, other: Run) {
        self.free.extend(other.free);
        self.absorb(other.constant);
    }

    /// Makes the constant non-negative; reports whether a sign was lifted.
    fn lift_sign(&mut self) -> bool {
        match self.constant.negated() {
            Some(magnitude) if self.constant.is_negative() && !magnitude.is_negative() => {
                self.constant = magnitude;
                true
            }
            _ => false,
        }
    }

    fn is_neutral(&self) -> bool {
        self.free.is_empty() && self.constant.is_int(1)
    }

    fn into_links(self) -> impl Iterator<Item = Link> {
        let Run {
            inverse,
            free,
            constant,
        } = self;
        let constant = (!constant.is_int(1)).then(|| MathNode::leaf(constant));
        free.into_iter()
            .chain(constant)
            .map(move |node| Link { inverse, node })
    }
}

/// Product of two run constants. Multipliers wrap like the runtime does;
/// divisors only combine while their product fits in an `i32`.
fn product(lhs: &Value, rhs: &Value, divisor: bool) -> Option<Value> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) if divisor => a.checked_mul(*b).map(Value::Int),
        _ => fold(MathOp::Mul, lhs, rhs),
    }
}

/// Cancels exact divisors into the multiplier in front of them, then drops
/// neutral runs and merges the neighbours they separated, until stable.
fn settle_runs(runs: &mut Vec<Run>) {
    loop {
        let mut changed = false;
        for i in 1..runs.len() {
            let (head, tail) = runs.split_at_mut(i);
            let (factor, divisor) = (&mut head[i - 1], &mut tail[0]);
            if factor.inverse || !divisor.inverse {
                continue;
            }
            let (Some(f), Some(d)) = (factor.constant.as_int(), divisor.constant.as_int()) else {
                continue;
            };
            if d == 1 || f.checked_rem(d) != Some(0) {
                continue;
            }
            if let Some(quotient) = f.checked_div(d) {
                factor.constant = Value::Int(quotient);
                divisor.constant = Value::Int(1);
                changed = true;
            }
        }
        let before = runs.len();
        let mut merged: Vec<Run> = Vec::with_capacity(before);
        for run in runs.drain(..).filter(|run| !run.is_neutral()) {
            match merged.last_mut() {
                Some(last) if last.inverse == run.inverse => last.extend(run),
                _ => merged.push(run),
            }
        }
        changed |= merged.len() != before;
        *runs = merged;
        if !changed {
            return;
        }
    }
}

/// Signed integer coefficient of an `a`, `a * c` or `c * a` operand.
pub fn coefficient(node: &MathNode) -> Option<(&AttributeRef, i32)> {
    let sign = if node.is_negated() { -1 } else { 1 };
    match node.kind() {
        MathKind::Leaf(Value::Attribute(att)) => Some((att, sign)),
        MathKind::Binary {
            op: MathOp::Mul,
            left,
            right,
        } => {
            let (att, scale) = match (left.as_attribute(), right.as_attribute()) {
                (Some(att), None) if !left.is_negated() => (att, right.as_constant()?),
                (None, Some(att)) if !right.is_negated() => (att, left.as_constant()?),
                _ => return None,
            };
            Some((att, scale.as_int()?.wrapping_mul(sign)))
        }
        _ => None,
    }
}

fn term_link(att: AttributeRef, total: i32) -> Option<Link> {
    if total == 0 {
        return None;
    }
    let (inverse, scale) = match total.checked_abs() {
        Some(magnitude) => (total < 0, magnitude),
        None => (false, total),
    };
    let node = if scale == 1 {
        MathNode::leaf(att)
    } else {
        MathNode::binary(MathOp::Mul, MathNode::leaf(att), MathNode::int(scale))
    };
    Some(Link { inverse, node })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::policy::{ADDITIVE, MULTIPLICATIVE};

    fn att(name: &str) -> MathNode {
        MathNode::attribute(name, "m")
    }

    #[test]
    fn flatten_distributes_subtraction() {
        // a - (b - c) == a - b + c
        let node = MathNode::binary(
            MathOp::Minus,
            att("a"),
            MathNode::binary(MathOp::Minus, att("b"), att("c")),
        );
        let chain = Chain::flatten(node, &ADDITIVE);
        let signs: Vec<bool> = chain.links().iter().map(|l| l.inverse).collect();
        assert_eq!(signs, vec![false, true, false]);
    }

    #[test]
    fn negation_is_tracked_per_operand_in_sums() {
        // -(a + b) == -a - b
        let node = MathNode::binary(MathOp::Plus, att("a"), att("b")).negate();
        let chain = Chain::flatten(node, &ADDITIVE);
        assert!(chain.links().iter().all(|l| l.inverse));
        assert!(chain.links().iter().all(|l| !l.node.is_negated()));
    }

    #[test]
    fn negation_is_collected_once_in_products() {
        let node = MathNode::binary(MathOp::Mul, att("a").negate(), att("b").negate()).negate();
        let chain = Chain::flatten(node, &MULTIPLICATIVE);
        assert!(chain.negated);
        assert!(chain.links().iter().all(|l| !l.inverse));
    }

    #[test]
    fn divisor_runs_fold_into_one_divisor() {
        // a / 2 / 3 == a / 6
        let node = MathNode::binary(
            MathOp::Div,
            MathNode::binary(MathOp::Div, att("a"), MathNode::int(2)),
            MathNode::int(3),
        );
        let mut chain = Chain::flatten(node, &MULTIPLICATIVE);
        chain.reduce();
        assert_eq!(
            chain.into_node(),
            MathNode::binary(MathOp::Div, att("a"), MathNode::int(6))
        );
    }

    #[test]
    fn exact_divisors_cancel_into_the_factor() {
        // a * 6 / 2 == a * 3
        let node = MathNode::binary(
            MathOp::Div,
            MathNode::binary(MathOp::Mul, att("a"), MathNode::int(6)),
            MathNode::int(2),
        );
        let mut chain = Chain::flatten(node, &MULTIPLICATIVE);
        chain.reduce();
        assert_eq!(
            chain.into_node(),
            MathNode::binary(MathOp::Mul, att("a"), MathNode::int(3))
        );
    }

    #[test]
    fn multipliers_never_cross_a_truncating_division() {
        // (a / 2) * 2 and (a / 6) * 3 differ from a and (a * 3) / 6 on odd a.
        for (divisor, factor) in [(2, 2), (6, 3)] {
            let node = MathNode::binary(
                MathOp::Mul,
                MathNode::binary(MathOp::Div, att("a"), MathNode::int(divisor)),
                MathNode::int(factor),
            );
            let mut chain = Chain::flatten(node.clone(), &MULTIPLICATIVE);
            chain.reduce();
            assert_eq!(chain.into_node(), node);
        }
    }

    #[test]
    fn quotients_on_the_right_keep_their_own_division() {
        // a * (b / c) is not (a * b) / c, but a / (b * c) is a / b / c.
        let quotient = MathNode::binary(MathOp::Mul, att("a"), MathNode::binary(MathOp::Div, att("b"), att("c")));
        let chain = Chain::flatten(quotient.clone(), &MULTIPLICATIVE);
        assert_eq!(chain.links().len(), 2);
        assert_eq!(chain.into_node(), quotient);

        let product = MathNode::binary(MathOp::Div, att("a"), MathNode::binary(MathOp::Mul, att("b"), att("c")));
        let signs: Vec<bool> = Chain::flatten(product, &MULTIPLICATIVE)
            .links()
            .iter()
            .map(|l| l.inverse)
            .collect();
        assert_eq!(signs, vec![false, true, true]);
    }

    #[test]
    fn cancelled_divisors_merge_the_runs_around_them() {
        // a * 6 / 2 * b == a * b * 3
        let node = MathNode::binary(
            MathOp::Mul,
            MathNode::binary(
                MathOp::Div,
                MathNode::binary(MathOp::Mul, att("a"), MathNode::int(6)),
                MathNode::int(2),
            ),
            att("b"),
        );
        let mut chain = Chain::flatten(node, &MULTIPLICATIVE);
        chain.reduce();
        let expected = MathNode::binary(
            MathOp::Mul,
            MathNode::binary(MathOp::Mul, att("a"), att("b")),
            MathNode::int(3),
        );
        assert_eq!(chain.into_node(), expected);
    }

    #[test]
    fn inexact_divisors_stay_behind_their_multiplier() {
        // a * 3 / 2 keeps both constants in place.
        let node = MathNode::binary(
            MathOp::Div,
            MathNode::binary(MathOp::Mul, att("a"), MathNode::int(3)),
            MathNode::int(2),
        );
        let mut chain = Chain::flatten(node.clone(), &MULTIPLICATIVE);
        chain.reduce();
        assert_eq!(chain.into_node(), node);
    }

    #[test]
    fn negative_factor_moves_into_the_sign() {
        let node = MathNode::binary(MathOp::Mul, MathNode::int(-4), att("a"));
        let mut chain = Chain::flatten(node, &MULTIPLICATIVE);
        chain.reduce();
        let node = chain.into_node();
        assert!(node.is_negated());
        assert_eq!(coefficient(&node).map(|(_, c)| c), Some(-4));
    }

    #[test]
    fn leading_divisor_keeps_its_dividend() {
        // 2 / a
        let node = MathNode::binary(MathOp::Div, MathNode::int(2), att("a"));
        let mut chain = Chain::flatten(node.clone(), &MULTIPLICATIVE);
        chain.reduce();
        assert_eq!(chain.into_node(), node);
    }

    #[test]
    fn coefficients_of_terms() {
        let a = att("a");
        assert_eq!(coefficient(&a).map(|(_, c)| c), Some(1));
        let scaled = MathNode::binary(MathOp::Mul, MathNode::int(5), att("a"));
        assert_eq!(coefficient(&scaled).map(|(_, c)| c), Some(5));
        let float_scaled = MathNode::binary(MathOp::Mul, att("a"), MathNode::float(0.5));
        assert!(coefficient(&float_scaled).is_none());
        let product = MathNode::binary(MathOp::Mul, att("a"), att("b"));
        assert!(coefficient(&product).is_none());
    }

    #[test]
    fn cancelling_terms_vanish() {
        // a - a + 3 == 3
        let node = MathNode::binary(
            MathOp::Plus,
            MathNode::binary(MathOp::Minus, att("a"), att("a")),
            MathNode::int(3),
        );
        let mut chain = Chain::flatten(node, &ADDITIVE);
        chain.reduce();
        chain.factor();
        assert_eq!(chain.into_node(), MathNode::int(3));
    }
}
