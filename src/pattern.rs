//! Aggregation pattern extraction.
//!
//! Decides, per (attribute, quantifier) occurrence of a resolved invariant,
//! which partial aggregate a node has to keep: the maximum, the minimum, or a
//! scoping condition. The result is an [`AggregationPlan`]: the pattern table
//! plus the index mapping that places every (comparison, attribute,
//! quantifier) triple into a flat value array.
//!
//! # Direction
//! A comparison `e < 0` (also `=`, `≠`) is violated first by the largest
//! value of `e`, so attributes feeding `e` positively are maximized. `>`
//! flips that. So does every negated node on the path, every existential
//! quantifier, and the right operand of `-`, `/` and `%`.
//!
//! # Determinism
//! Patterns are listed in discovery order (left to right) and all sets are
//! ordered, so the same tree always yields the same plan.

use crate::error::{PlanError, QuantifierError};
use crate::logic::{BoolKind, BoolNode, IntervalTest};
use crate::math::{MathKind, MathNode};
use crate::operators::{CompareOp, LogicOp, MathOp};
use crate::value::{AttributeRef, QuantifierId, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// What a pattern tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Objective {
    Maximize,
    Minimize,
    /// Bare attribute comparison evaluated as a condition.
    Scoping,
}

impl Objective {
    fn directional(minimize: bool) -> Self {
        if minimize {
            Objective::Minimize
        } else {
            Objective::Maximize
        }
    }

    pub const fn code(self) -> u8 {
        match self {
            Objective::Maximize => 0,
            Objective::Minimize => 1,
            Objective::Scoping => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Objective::Maximize => "OBJ_MAXIMIZE",
            Objective::Minimize => "OBJ_MINIMIZE",
            Objective::Scoping => "OBJ_TEST",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One aggregation the runtime has to maintain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    attribute: String,
    hash: u16,
    objective: Objective,
    quantifiers: BTreeSet<QuantifierId>,
    bound: bool,
    links: BTreeMap<String, u16>,
    /// Math id -> quantifiers ordered by coefficient.
    mappings: BTreeMap<u16, Vec<QuantifierId>>,
    coefficients: BTreeMap<QuantifierId, i32>,
    implication: i32,
    bool_node: i32,
    /// Scoping pattern whose condition was folded into bound copies.
    consumed: bool,
}

impl Pattern {
    fn new(att: &AttributeRef, objective: Objective, quantifier: QuantifierId) -> Self {
        Self {
            attribute: att.name().to_string(),
            hash: att.hash(),
            objective,
            quantifiers: BTreeSet::from([quantifier]),
            bound: false,
            links: BTreeMap::new(),
            mappings: BTreeMap::new(),
            coefficients: BTreeMap::new(),
            implication: -1,
            bool_node: -1,
            consumed: false,
        }
    }

    #[inline]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    #[inline]
    pub fn hash(&self) -> u16 {
        self.hash
    }

    #[inline]
    pub fn objective(&self) -> Objective {
        self.objective
    }

    #[inline]
    pub fn quantifiers(&self) -> &BTreeSet<QuantifierId> {
        &self.quantifiers
    }

    /// Bound patterns aggregate over a fixed quantifier set only.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Linked attributes with their name hashes.
    pub fn links(&self) -> impl Iterator<Item = (&str, u16)> {
        self.links.iter().map(|(name, hash)| (name.as_str(), *hash))
    }

    /// Ordered quantifiers of comparison `math_id`.
    pub fn mapping(&self, math_id: u16) -> Option<&[QuantifierId]> {
        self.mappings.get(&math_id).map(Vec::as_slice)
    }

    pub fn math_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.mappings.keys().copied()
    }

    pub fn coefficient(&self, quantifier: QuantifierId) -> Option<i32> {
        self.coefficients.get(&quantifier).copied()
    }

    #[inline]
    pub fn implication(&self) -> i32 {
        self.implication
    }

    #[inline]
    pub fn bool_node(&self) -> i32 {
        self.bool_node
    }

    /// Whether an implication consumed this scoping pattern. Consumed
    /// patterns keep their slots but get no signature row.
    #[inline]
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    pub fn first_quantifier(&self) -> Option<QuantifierId> {
        self.quantifiers.first().copied()
    }

    fn same_key(&self, other: &Pattern) -> bool {
        self.attribute == other.attribute
            && self.objective == other.objective
            && self.bound == other.bound
            && self.consumed == other.consumed
            && (!self.bound || self.quantifiers == other.quantifiers)
    }

    fn absorb(&mut self, other: Pattern) {
        self.quantifiers.extend(other.quantifiers);
        self.links.extend(other.links);
        for (math_id, order) in other.mappings {
            self.mappings.entry(math_id).or_insert(order);
        }
        for (quantifier, coefficient) in other.coefficients {
            self.coefficients.entry(quantifier).or_insert(coefficient);
        }
    }

    fn link(&mut self, other: &Pattern) {
        self.links.insert(other.attribute.clone(), other.hash);
    }

    /// Copy restricted to `shared` and bound to implication `implication`.
    fn bound_copy(&self, shared: BTreeSet<QuantifierId>, implication: i32) -> Pattern {
        let mappings = self
            .mappings
            .iter()
            .filter_map(|(math_id, order)| {
                let kept: Vec<QuantifierId> = order.iter().copied().filter(|q| shared.contains(q)).collect();
                (!kept.is_empty()).then_some((*math_id, kept))
            })
            .collect();
        let coefficients = self
            .coefficients
            .iter()
            .filter(|(q, _)| shared.contains(q))
            .map(|(q, c)| (*q, *c))
            .collect();
        Pattern {
            attribute: self.attribute.clone(),
            hash: self.hash,
            objective: self.objective,
            quantifiers: shared,
            bound: true,
            links: self.links.clone(),
            mappings,
            coefficients,
            implication,
            bool_node: self.bool_node,
            consumed: self.consumed,
        }
    }

    /// Records the coefficient order of comparison `math_id`.
    fn order_quantifiers(&mut self, math_id: u16) {
        let mut order: Vec<QuantifierId> = self.quantifiers.iter().copied().collect();
        let descending = self.objective != Objective::Minimize;
        order.sort_by(|a, b| {
            let ca = self.coefficients.get(a).copied().unwrap_or(1);
            let cb = self.coefficients.get(b).copied().unwrap_or(1);
            let by_coefficient = if descending { cb.cmp(&ca) } else { ca.cmp(&cb) };
            by_coefficient.then(a.cmp(b))
        });
        self.mappings.insert(math_id, order);
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {{", self.objective, self.attribute)?;
        for (i, q) in self.quantifiers.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{q}")?;
        }
        f.write_str("}")?;
        if self.bound {
            write!(f, " bound@{}", self.implication)?;
        }
        Ok(())
    }
}

/// Slot assignment for one (comparison, attribute, quantifier) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub hash: u16,
    pub math_id: u16,
    pub quantifier: QuantifierId,
    pub slot: usize,
}

/// Patterns, index mapping and interval bounds of one invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationPlan {
    pub patterns: Vec<Pattern>,
    pub mapping: Vec<MappingEntry>,
    pub interval: Option<IntervalTest>,
}

/// Extracts the aggregation plan of a resolved formula.
///
/// Fails with [`QuantifierError::NotFound`] on an occurrence that was never
/// bound to a quantifier, and with [`PlanError::TooManyComparisons`] once
/// comparison ids run out.
pub fn extract(root: &BoolNode) -> Result<AggregationPlan, PlanError> {
    let mut extractor = Extractor::default();
    let interval = root.interval_test();
    let extracted = match (interval, root.interval_lower_side()) {
        (Some(_), Some(lower)) => extractor.comparison(lower, true)?,
        _ => extractor.visit(root, false)?,
    };
    let patterns = extracted.patterns;
    let mapping = index_mapping(&patterns);
    debug!(patterns = patterns.len(), entries = mapping.len(), interval = interval.is_some(), "extracted plan");
    Ok(AggregationPlan {
        patterns,
        mapping,
        interval,
    })
}

/// How much of a subtree's output is scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scoping {
    None,
    Only,
    Mixed,
}

impl Scoping {
    fn combine(self, other: Scoping) -> Scoping {
        match (self, other) {
            (Scoping::Only, Scoping::Only) => Scoping::Only,
            (Scoping::None, Scoping::None) => Scoping::None,
            _ => Scoping::Mixed,
        }
    }
}

struct Extracted {
    patterns: Vec<Pattern>,
    quantifiers: BTreeSet<QuantifierId>,
    scoping: Scoping,
}

impl Extracted {
    fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            quantifiers: BTreeSet::new(),
            scoping: Scoping::None,
        }
    }
}

/// Counters threaded through one extraction.
struct Extractor {
    implication: i32,
    bool_node: i32,
    /// Directional comparisons seen so far; the next one gets this math id.
    comparisons: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            implication: -1,
            bool_node: -1,
            comparisons: 0,
        }
    }
}

impl Extractor {
    fn visit(&mut self, node: &BoolNode, region: bool) -> Result<Extracted, PlanError> {
        self.bool_node += 1;
        match node.kind() {
            BoolKind::Leaf(_) | BoolKind::Alias(_) => Ok(Extracted::empty()),
            BoolKind::Compare { .. } => self.comparison(node, false),
            BoolKind::Logic { op, left, right } => self.connective(*op, left, right, region),
        }
    }

    fn connective(
        &mut self,
        op: LogicOp,
        left: &BoolNode,
        right: &BoolNode,
        region: bool,
    ) -> Result<Extracted, PlanError> {
        let region = region || op == LogicOp::Imply;
        if op == LogicOp::Imply {
            self.implication += 1;
        }
        let implication = self.implication;
        let lhs = self.visit(left, region)?;
        let rhs = self.visit(right, region && op != LogicOp::Imply)?;

        let link_set: BTreeSet<QuantifierId> = if op.is_conjunctive() {
            lhs.quantifiers.intersection(&rhs.quantifiers).copied().collect()
        } else {
            BTreeSet::new()
        };
        let scoping_of = (op == LogicOp::Imply && lhs.scoping != Scoping::None).then_some(implication);

        let mut patterns = lhs.patterns;
        for pattern in rhs.patterns {
            merge_into(&mut patterns, pattern, &link_set, scoping_of);
        }
        let scoping = if !region || op == LogicOp::Imply {
            Scoping::None
        } else {
            lhs.scoping.combine(rhs.scoping)
        };
        let mut quantifiers = lhs.quantifiers;
        quantifiers.extend(rhs.quantifiers);
        Ok(Extracted {
            patterns,
            quantifiers,
            scoping,
        })
    }

    fn comparison(&mut self, node: &BoolNode, directional: bool) -> Result<Extracted, PlanError> {
        let BoolKind::Compare { op, left, .. } = node.kind() else {
            return Ok(Extracted::empty());
        };
        if let (false, Some(att)) = (directional, left.as_attribute()) {
            let quantifier = att
                .quantifier()
                .ok_or_else(|| QuantifierError::NotFound(att.binder().to_string()))?;
            let mut pattern = Pattern::new(att, Objective::Scoping, quantifier.id);
            pattern.bound = true;
            pattern.implication = self.implication;
            pattern.bool_node = self.bool_node;
            debug!(%pattern, "scoping pattern");
            return Ok(Extracted {
                patterns: vec![pattern],
                quantifiers: BTreeSet::new(),
                scoping: Scoping::Only,
            });
        }

        let math_id = u16::try_from(self.comparisons).map_err(|_| PlanError::TooManyComparisons)?;
        self.comparisons += 1;
        let mut walk = Walk::default();
        walk.visit(left, *op == CompareOp::Greater, 1)?;
        let Walk {
            mut patterns,
            quantifiers,
            ..
        } = walk;
        for pattern in &mut patterns {
            pattern.order_quantifiers(math_id);
            debug!(%pattern, math_id, "directional pattern");
        }
        Ok(Extracted {
            patterns,
            quantifiers,
            scoping: Scoping::None,
        })
    }
}

/// Direction analysis of one comparison operand.
#[derive(Default)]
struct Walk {
    patterns: Vec<Pattern>,
    quantifiers: BTreeSet<QuantifierId>,
    seen: BTreeSet<(Objective, String, QuantifierId)>,
}

impl Walk {
    fn visit(&mut self, node: &MathNode, minimize: bool, coefficient: i32) -> Result<(), QuantifierError> {
        let minimize = minimize ^ node.is_negated();
        match node.kind() {
            MathKind::Leaf(Value::Attribute(att)) => self.occurrence(att, minimize, coefficient),
            MathKind::Leaf(_) => Ok(()),
            MathKind::Binary { op, left, right } => {
                let scale = match op {
                    MathOp::Mul => int_factor(left).or_else(|| int_factor(right)).unwrap_or(1),
                    _ => 1,
                };
                let coefficient = coefficient.wrapping_mul(scale);
                self.visit(left, minimize, coefficient)?;
                self.visit(right, minimize ^ op.flips_right(), coefficient)
            }
        }
    }

    fn occurrence(&mut self, att: &AttributeRef, minimize: bool, coefficient: i32) -> Result<(), QuantifierError> {
        let quantifier = att
            .quantifier()
            .ok_or_else(|| QuantifierError::NotFound(att.binder().to_string()))?;
        let objective = Objective::directional(minimize ^ quantifier.kind.is_existential());
        self.quantifiers.insert(quantifier.id);
        if !self.seen.insert((objective, att.name().to_string(), quantifier.id)) {
            return Ok(());
        }
        let mut pattern = Pattern::new(att, objective, quantifier.id);
        pattern.coefficients.insert(quantifier.id, coefficient);

        let index = match self.patterns.iter().position(|p| p.same_key(&pattern)) {
            Some(index) => {
                self.patterns[index].absorb(pattern);
                index
            }
            None => {
                self.patterns.push(pattern);
                self.patterns.len() - 1
            }
        };
        let (before, rest) = self.patterns.split_at_mut(index);
        let Some((current, after)) = rest.split_first_mut() else {
            return Ok(());
        };
        for other in before.iter_mut().chain(after.iter_mut()) {
            if other.attribute != current.attribute && !other.quantifiers.is_disjoint(&current.quantifiers) {
                other.link(current);
                current.link(other);
            }
        }
        Ok(())
    }
}

fn int_factor(node: &MathNode) -> Option<i32> {
    node.as_constant()?.as_int()
}

fn touches(link_set: &BTreeSet<QuantifierId>, quantifiers: &BTreeSet<QuantifierId>) -> bool {
    !link_set.is_disjoint(quantifiers)
}

/// Merges `incoming` into `dest`, linking across `link_set` and, under an
/// implication, binding it to the antecedent's scoping patterns.
fn merge_into(
    dest: &mut Vec<Pattern>,
    mut incoming: Pattern,
    link_set: &BTreeSet<QuantifierId>,
    implication: Option<i32>,
) {
    let mut absorbed_by = None;
    let mut copies = Vec::new();
    for (index, current) in dest.iter_mut().enumerate() {
        if absorbed_by.is_none() && current.same_key(&incoming) {
            absorbed_by = Some(index);
            continue;
        }
        if current.attribute != incoming.attribute
            && touches(link_set, &current.quantifiers)
            && touches(link_set, &incoming.quantifiers)
        {
            current.link(&incoming);
            incoming.link(current);
        }
        if let Some(implication) = implication {
            if current.objective == Objective::Scoping && !incoming.bound {
                let shared: BTreeSet<QuantifierId> =
                    current.quantifiers.intersection(&incoming.quantifiers).copied().collect();
                if !shared.is_empty() {
                    current.consumed = true;
                    copies.push(incoming.bound_copy(shared, implication));
                }
            }
        }
    }
    match absorbed_by {
        Some(index) => dest[index].absorb(incoming),
        None => dest.push(incoming),
    }
    for copy in copies {
        debug!(pattern = %copy, "bound to implication");
        merge_into(dest, copy, link_set, implication);
    }
}

/// Assigns array slots to every (math id, attribute, quantifier) triple.
fn index_mapping(patterns: &[Pattern]) -> Vec<MappingEntry> {
    let offsets: Vec<usize> = patterns
        .iter()
        .scan(0usize, |next, pattern| {
            let start = *next;
            *next += pattern.quantifiers.len();
            Some(start)
        })
        .collect();
    let mut done = BTreeSet::new();
    let mut seen: BTreeSet<(u16, &str, QuantifierId)> = BTreeSet::new();
    let mut entries = Vec::new();
    for (i, pattern) in patterns.iter().enumerate() {
        for math_id in pattern.math_ids() {
            if !done.insert(math_id) {
                continue;
            }
            for (j, other) in patterns.iter().enumerate().skip(i) {
                let Some(order) = other.mapping(math_id) else {
                    continue;
                };
                for (k, quantifier) in order.iter().enumerate() {
                    if seen.insert((math_id, other.attribute(), *quantifier)) {
                        entries.push(MappingEntry {
                            hash: other.hash,
                            math_id,
                            quantifier: *quantifier,
                            slot: offsets[j] + k,
                        });
                    }
                }
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::resolve;

    fn att(name: &str, binder: &str) -> MathNode {
        MathNode::attribute(name, binder)
    }

    fn lt(left: MathNode, right: MathNode) -> BoolNode {
        BoolNode::compare(CompareOp::Lower, left, right)
    }

    fn gt(left: MathNode, right: MathNode) -> BoolNode {
        BoolNode::compare(CompareOp::Greater, left, right)
    }

    fn minus(l: MathNode, r: MathNode) -> MathNode {
        MathNode::binary(MathOp::Minus, l, r)
    }

    fn plus(l: MathNode, r: MathNode) -> MathNode {
        MathNode::binary(MathOp::Plus, l, r)
    }

    fn plan(mut root: BoolNode) -> AggregationPlan {
        resolve(&mut root).expect("resolves");
        extract(&root).expect("extracts")
    }

    fn summary(plan: &AggregationPlan) -> Vec<(String, Objective, Vec<u16>, bool)> {
        plan.patterns
            .iter()
            .map(|p| {
                (
                    p.attribute().to_string(),
                    p.objective(),
                    p.quantifiers().iter().map(|q| q.as_u16()).collect(),
                    p.is_bound(),
                )
            })
            .collect()
    }

    #[test]
    fn temperature_difference_tracks_both_extremes() {
        let root = lt(minus(att("temperature", "m"), att("temperature", "n")), MathNode::int(10))
            .forall(&["m", "n"])
            .expect("scope");
        let plan = plan(root);
        assert_eq!(
            summary(&plan),
            vec![
                ("temperature".into(), Objective::Maximize, vec![0], false),
                ("temperature".into(), Objective::Minimize, vec![1], false),
            ]
        );
        assert_eq!(plan.mapping.len(), 2);
        let slots: Vec<(u16, usize)> = plan.mapping.iter().map(|e| (e.quantifier.as_u16(), e.slot)).collect();
        assert_eq!(slots, vec![(0, 0), (1, 1)]);
        assert!(plan.interval.is_none());
    }

    #[test]
    fn greater_than_tracks_the_minimum() {
        let root = gt(plus(att("x", "m"), att("y", "m")), MathNode::int(3))
            .forall(&["m"])
            .expect("scope");
        let plan = plan(root);
        assert!(plan.patterns.iter().all(|p| p.objective() == Objective::Minimize));
    }

    #[test]
    fn existential_quantifiers_flip_direction() {
        let root = lt(plus(att("x", "k"), att("y", "k")), MathNode::int(5))
            .exists(&["k"])
            .expect("scope");
        let plan = plan(root);
        assert!(plan.patterns.iter().all(|p| p.objective() == Objective::Minimize));
    }

    #[test]
    fn bare_attribute_comparison_is_scoping() {
        let root = gt(att("x", "m"), MathNode::int(5)).forall(&["m"]).expect("scope");
        let bound = MathNode::binary(MathOp::Plus, MathNode::int(2), MathNode::int(3));
        let folded = gt(att("x", "m"), bound).forall(&["m"]).expect("scope");
        assert_eq!(summary(&plan(folded))[0].1, Objective::Scoping);

        let plan = plan(root);
        assert_eq!(summary(&plan), vec![("x".into(), Objective::Scoping, vec![0], true)]);
        assert_eq!(plan.patterns[0].bool_node(), 0);
        assert!(!plan.patterns[0].is_consumed());
        assert!(plan.mapping.is_empty());
    }

    #[test]
    fn terms_of_one_comparison_link_on_shared_quantifiers() {
        let root = lt(plus(att("x", "m"), att("y", "m")), MathNode::int(5))
            .forall(&["m"])
            .expect("scope");
        let plan = plan(root);
        let links: Vec<Vec<&str>> = plan
            .patterns
            .iter()
            .map(|p| p.links().map(|(name, _)| name).collect())
            .collect();
        assert_eq!(links, vec![vec!["y"], vec!["x"]]);
    }

    #[test]
    fn conjunction_links_and_disjunction_does_not() {
        let left = || lt(plus(att("x", "m"), MathNode::int(1)), MathNode::int(5));
        let right = || lt(minus(att("y", "m"), MathNode::int(2)), MathNode::int(3));
        let conj = plan(BoolNode::and(left(), right()).forall(&["m"]).expect("scope"));
        assert!(conj.patterns.iter().all(|p| p.links().count() == 1));
        let disj = plan(BoolNode::or(left(), right()).forall(&["m"]).expect("scope"));
        assert!(disj.patterns.iter().all(|p| p.links().count() == 0));
    }

    #[test]
    fn identical_patterns_merge_across_comparisons() {
        let root = BoolNode::and(
            lt(plus(att("x", "m"), MathNode::int(1)), MathNode::int(5)),
            lt(plus(att("x", "n"), MathNode::int(2)), MathNode::int(9)),
        )
        .forall(&["m", "n"])
        .expect("scope");
        let plan = plan(root);
        assert_eq!(summary(&plan), vec![("x".into(), Objective::Maximize, vec![0, 1], false)]);
        assert_eq!(plan.patterns[0].mapping(0), Some(&[QuantifierId::new(0)][..]));
        assert_eq!(plan.patterns[0].mapping(1), Some(&[QuantifierId::new(1)][..]));
        assert_eq!(plan.mapping.len(), 2);
    }

    #[test]
    fn implication_binds_consequent_to_antecedent_scope() {
        let antecedent = gt(att("x", "m"), MathNode::int(5));
        let consequent = lt(plus(att("y", "m"), att("z", "n")), MathNode::int(3));
        let root = BoolNode::imply(antecedent, consequent)
            .forall(&["m", "n"])
            .expect("scope");
        let plan = plan(root);
        assert_eq!(
            summary(&plan),
            vec![
                ("x".into(), Objective::Scoping, vec![0], true),
                ("y".into(), Objective::Maximize, vec![0], false),
                ("y".into(), Objective::Maximize, vec![0], true),
                ("z".into(), Objective::Maximize, vec![1], false),
            ]
        );
        assert_eq!(plan.patterns[0].implication(), 0);
        assert_eq!(plan.patterns[0].bool_node(), 1);
        assert_eq!(plan.patterns[2].implication(), 0);
        let consumed: Vec<bool> = plan.patterns.iter().map(Pattern::is_consumed).collect();
        assert_eq!(consumed, vec![true, false, false, false]);
        let slots: Vec<usize> = plan.mapping.iter().map(|e| e.slot).collect();
        assert_eq!(slots, vec![1, 3]);
    }

    #[test]
    fn coefficients_order_the_mapping() {
        // 2*x@m + x@n < 10: maximize, so m (coefficient 2) comes first.
        let root = lt(
            plus(MathNode::binary(MathOp::Mul, MathNode::int(2), att("x", "n")), att("x", "m")),
            MathNode::int(10),
        )
        .forall(&["m", "n"])
        .expect("scope");
        let plan = plan(root);
        let pattern = &plan.patterns[0];
        assert_eq!(pattern.coefficient(QuantifierId::new(1)), Some(2));
        assert_eq!(
            pattern.mapping(0),
            Some(&[QuantifierId::new(1), QuantifierId::new(0)][..])
        );
    }

    #[test]
    fn interval_test_analyses_the_lower_side_only() {
        let root = BoolNode::or(lt(att("x", "m"), MathNode::int(5)), gt(att("x", "m"), MathNode::int(10)))
            .forall(&["m"])
            .expect("scope");
        let plan = plan(root);
        assert_eq!(plan.interval, Some(IntervalTest { below: 5, above: 10 }));
        assert_eq!(summary(&plan), vec![("x".into(), Objective::Maximize, vec![0], false)]);
        assert_eq!(plan.mapping.len(), 1);
    }

    #[test]
    fn unresolved_occurrences_are_rejected() {
        let root = lt(plus(att("x", "m"), att("y", "m")), MathNode::int(5));
        assert_eq!(extract(&root), Err(PlanError::Quantifier(QuantifierError::NotFound("m".into()))));
    }

    #[test]
    fn comparison_ids_do_not_wrap() {
        let mut root = lt(plus(att("x", "m"), att("y", "m")), MathNode::int(5))
            .forall(&["m"])
            .expect("scope");
        resolve(&mut root).expect("resolves");
        let mut extractor = Extractor {
            comparisons: usize::from(u16::MAX),
            ..Extractor::default()
        };
        assert!(extractor.visit(&root, false).is_ok());
        assert_eq!(extractor.visit(&root, false).err(), Some(PlanError::TooManyComparisons));
    }
}
