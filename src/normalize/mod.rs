//! Arithmetic normalization.
//!
//! Rewrites a [`MathNode`] into the canonical affine shape pattern extraction
//! relies on: a left-recursive sum of attribute terms followed by at most one
//! constant. Three passes are exposed individually and composed by
//! [`normalize`]:
//!
//! - [`inline`]: flatten an operator-homogeneous chain and rebuild it
//!   left-recursively.
//! - [`reduce`]: fold all constants of a chain into one trailing literal.
//! - [`factor`]: merge additive terms over the same attribute occurrence
//!   (`5*a + 6*a` becomes `a * 11`).
//!
//! # Semantics
//! Rewrites preserve the meaning of the tree on the integer-only runtime
//! (see [`MathNode::evaluate`]). Division truncates there, so constants never
//! move across a `/` unless the quotient is exact, and integer division of
//! two literals is folded only when exact.

pub mod chain;
pub mod policy;

pub use chain::{coefficient, Chain, Link};
pub use policy::{ChainKind, ChainPolicy, ADDITIVE, MULTIPLICATIVE};

use crate::math::{fold, MathKind, MathNode};
use crate::operators::MathOp;
use crate::value::Value;

/// Flattens and rebuilds the chain rooted at `node` without folding.
pub fn inline(node: MathNode, policy: &ChainPolicy) -> MathNode {
    Chain::flatten(node, policy).into_node()
}

/// Inlines and folds the constants of the chain rooted at `node`.
pub fn reduce(node: MathNode, policy: &ChainPolicy) -> MathNode {
    let mut chain = Chain::flatten(node, policy);
    chain.reduce();
    chain.into_node()
}

/// Inlines the additive chain rooted at `node` and merges like terms.
pub fn factor(node: MathNode) -> MathNode {
    let mut chain = Chain::flatten(node, &ADDITIVE);
    chain.factor();
    chain.into_node()
}

/// Full canonicalization, bottom-up.
pub fn normalize(node: MathNode) -> MathNode {
    let policy = match node.op() {
        None => return settle(node),
        Some(op) => match policy::policy_for(op) {
            Some(policy) => policy,
            None => return normalize_opaque(node),
        },
    };
    let mut chain = Chain::flatten(node, policy);
    chain.reduce();
    chain.factor();
    chain.into_node()
}

/// `%` is not a chain operator; its operands are normalized in place.
fn normalize_opaque(node: MathNode) -> MathNode {
    match node.kind {
        MathKind::Binary { op, left, right } => {
            let joined = MathNode::join(op, normalize(*left), normalize(*right));
            settle(if node.negated { joined.negate() } else { joined })
        }
        MathKind::Leaf(_) => settle(node),
    }
}

/// Folds the negation flag of a constant leaf into its value.
pub(crate) fn settle(node: MathNode) -> MathNode {
    if node.is_leaf() {
        if let Some(value) = node.as_constant() {
            return MathNode::leaf(value);
        }
    }
    node
}

/// Free operands and constant of an additive chain.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTerms {
    pub terms: Vec<Link>,
    pub constant: Value,
}

/// Splits a normalized expression into its free terms and its constant.
pub fn affine_terms(node: &MathNode) -> AffineTerms {
    let mut constant = Value::Int(0);
    let mut terms = Vec::new();
    for link in Chain::flatten(node.clone(), &ADDITIVE).into_links() {
        let op = if link.inverse { MathOp::Minus } else { MathOp::Plus };
        match link.node.as_constant().and_then(|c| fold(op, &constant, &c)) {
            Some(next) => constant = next,
            None => terms.push(link),
        }
    }
    AffineTerms { terms, constant }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttributeRef;
    use proptest::prelude::*;

    fn att(name: &str) -> MathNode {
        MathNode::attribute(name, "m")
    }

    fn plus(l: MathNode, r: MathNode) -> MathNode {
        MathNode::binary(MathOp::Plus, l, r)
    }

    fn times(l: MathNode, r: MathNode) -> MathNode {
        MathNode::binary(MathOp::Mul, l, r)
    }

    #[test]
    fn sum_of_constants_reduces_to_a_literal() {
        assert_eq!(normalize(plus(MathNode::int(3), MathNode::int(4))), MathNode::int(7));
    }

    #[test]
    fn symbolic_division_is_kept() {
        let node = MathNode::binary(MathOp::Div, att("a"), MathNode::int(2));
        assert_eq!(normalize(node.clone()), node);
    }

    #[test]
    fn truncating_division_keeps_its_integer_value() {
        // (a / 2) * 2 at a = 5 is 4, not 5.
        let node = times(MathNode::binary(MathOp::Div, att("a"), MathNode::int(2)), MathNode::int(2));
        let normalized = normalize(node.clone());
        let env = |_: &AttributeRef| Some(Value::Int(5));
        assert_eq!(normalized.evaluate(&env), Some(Value::Int(4)));
        assert_eq!(normalized, node);
    }

    #[test]
    fn like_terms_factor() {
        let node = plus(times(MathNode::int(5), att("a")), times(MathNode::int(6), att("a")));
        let normalized = normalize(node);
        assert_eq!(normalized, times(att("a"), MathNode::int(11)));
        let (attribute, scale) = coefficient(&normalized).expect("single term");
        assert_eq!(attribute.name(), "a");
        assert_eq!(scale, 11);
    }

    #[test]
    fn constants_gather_at_the_end() {
        // 3 + a + 4 - b + 1  ==  (a - b) + 8
        let node = plus(
            MathNode::binary(
                MathOp::Minus,
                plus(plus(MathNode::int(3), att("a")), MathNode::int(4)),
                att("b"),
            ),
            MathNode::int(1),
        );
        let expected = plus(
            MathNode::binary(MathOp::Minus, att("a"), att("b")),
            MathNode::int(8),
        );
        assert_eq!(normalize(node), expected);
    }

    #[test]
    fn negative_constant_becomes_a_subtraction() {
        let node = MathNode::binary(MathOp::Minus, att("a"), MathNode::int(10));
        assert_eq!(normalize(node.clone()), node);
    }

    #[test]
    fn inline_makes_chains_left_recursive() {
        // a + (b + (c + d))
        let node = plus(att("a"), plus(att("b"), plus(att("c"), att("d"))));
        let inlined = inline(node, &ADDITIVE);
        let expected = plus(plus(plus(att("a"), att("b")), att("c")), att("d"));
        assert_eq!(inlined, expected);
    }

    #[test]
    fn reduce_leaves_free_terms_alone() {
        let node = plus(times(att("a"), att("b")), plus(MathNode::int(2), MathNode::int(2)));
        let reduced = reduce(node, &ADDITIVE);
        assert_eq!(reduced, plus(times(att("a"), att("b")), MathNode::int(4)));
    }

    #[test]
    fn factor_alone_does_not_fold_constants() {
        let node = plus(plus(att("a"), MathNode::int(1)), plus(att("a"), MathNode::int(1)));
        let factored = factor(node);
        let expected = plus(
            plus(times(att("a"), MathNode::int(2)), MathNode::int(1)),
            MathNode::int(1),
        );
        assert_eq!(factored, expected);
    }

    #[test]
    fn modulo_is_opaque_but_its_operands_normalize() {
        let node = MathNode::binary(
            MathOp::Mod,
            plus(att("a"), plus(MathNode::int(1), MathNode::int(1))),
            MathNode::int(3),
        );
        let expected = MathNode::binary(MathOp::Mod, plus(att("a"), MathNode::int(2)), MathNode::int(3));
        assert_eq!(normalize(node), expected);
    }

    #[test]
    fn affine_split() {
        let node = MathNode::binary(MathOp::Minus, att("x"), MathNode::int(5));
        let split = affine_terms(&node);
        assert_eq!(split.constant, Value::Int(-5));
        assert_eq!(split.terms.len(), 1);
        assert_eq!(split.terms[0].node, att("x"));
    }

    fn operand() -> impl Strategy<Value = MathNode> {
        prop_oneof![
            (-6i32..=6).prop_map(MathNode::int),
            prop::sample::select(vec!["a", "b", "c"]).prop_map(att),
        ]
    }

    fn expression() -> impl Strategy<Value = MathNode> {
        operand().prop_recursive(3, 8, 2, |inner| {
            (
                prop::sample::select(vec![
                    MathOp::Plus,
                    MathOp::Minus,
                    MathOp::Mul,
                    MathOp::Div,
                    MathOp::Mod,
                ]),
                inner.clone(),
                inner,
                any::<bool>(),
            )
                .prop_map(|(op, left, right, negated)| {
                    let node = MathNode::binary(op, left, right);
                    if negated {
                        node.negate()
                    } else {
                        node
                    }
                })
        })
    }

    proptest! {
        #[test]
        fn normalization_preserves_evaluation(
            node in expression(),
            a in -9i32..=9,
            b in -9i32..=9,
            c in -9i32..=9,
        ) {
            let env = move |att: &AttributeRef| {
                Some(Value::Int(match att.name() {
                    "a" => a,
                    "b" => b,
                    _ => c,
                }))
            };
            if let Some(expected) = node.evaluate(&env) {
                let normalized = normalize(node.clone());
                prop_assert_eq!(
                    normalized.evaluate(&env),
                    Some(expected),
                    "{} normalized to {}", node, normalized
                );
            }
        }

        #[test]
        fn normalization_is_idempotent(node in expression()) {
            let once = normalize(node);
            prop_assert_eq!(normalize(once.clone()), once);
        }
    }
}
