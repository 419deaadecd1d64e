//! Chain policies.
//!
//! A policy tells the chain machinery which operators form one homogeneous
//! chain and how the chain is folded and rebuilt.

use crate::operators::MathOp;

/// Family a policy belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    Additive,
    Multiplicative,
}

/// Describes one operator-homogeneous chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPolicy {
    pub kind: ChainKind,
    /// Working operator joining free operands.
    pub positive: MathOp,
    /// Operator whose right operand correlates negatively with the result.
    pub negative: MathOp,
    /// Identity element of `positive`.
    pub neutral: i32,
    /// Negation flags flip single operands (additive) instead of the sign of
    /// the whole chain (multiplicative).
    pub tracks_negation: bool,
}

impl ChainPolicy {
    #[inline]
    pub fn applies_to(&self, op: MathOp) -> bool {
        op == self.positive || op == self.negative
    }
}

/// `+` / `-` chains.
pub const ADDITIVE: ChainPolicy = ChainPolicy {
    kind: ChainKind::Additive,
    positive: MathOp::Plus,
    negative: MathOp::Minus,
    neutral: 0,
    tracks_negation: true,
};

/// `*` / `/` chains.
pub const MULTIPLICATIVE: ChainPolicy = ChainPolicy {
    kind: ChainKind::Multiplicative,
    positive: MathOp::Mul,
    negative: MathOp::Div,
    neutral: 1,
    tracks_negation: false,
};

/// Policy governing `op`, if any.
pub fn policy_for(op: MathOp) -> Option<&'static ChainPolicy> {
    if ADDITIVE.applies_to(op) {
        Some(&ADDITIVE)
    } else if MULTIPLICATIVE.applies_to(op) {
        Some(&MULTIPLICATIVE)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_chain_operator_has_one_policy() {
        assert_eq!(policy_for(MathOp::Plus), Some(&ADDITIVE));
        assert_eq!(policy_for(MathOp::Minus), Some(&ADDITIVE));
        assert_eq!(policy_for(MathOp::Mul), Some(&MULTIPLICATIVE));
        assert_eq!(policy_for(MathOp::Div), Some(&MULTIPLICATIVE));
        assert_eq!(policy_for(MathOp::Mod), None);
        assert_eq!(ADDITIVE.positive.inverse(), Some(ADDITIVE.negative));
        assert_eq!(MULTIPLICATIVE.positive.inverse(), Some(MULTIPLICATIVE.negative));
    }
}
