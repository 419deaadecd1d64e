//! Invariants and the constraint table.
//!
//! An [`Invariant`] owns its formula and lazily caches the quantifier table
//! and the aggregation plan. Both are computed at most once; later calls
//! return the cached values.

use crate::error::{AliasError, Result};
use crate::logic::{BoolKind, BoolNode};
use crate::pattern::{extract, AggregationPlan};
use crate::scope::{self, QuantifierTable};
use std::collections::BTreeMap;
use tracing::debug;

/// Named sub-formulas.
pub type AliasTable = BTreeMap<String, BoolNode>;

/// One quantified formula with its cached analyses.
#[derive(Debug, Clone)]
pub struct Invariant {
    root: BoolNode,
    aliases: AliasTable,
    quantifiers: Option<QuantifierTable>,
    plan: Option<AggregationPlan>,
}

impl Invariant {
    pub fn new(root: BoolNode) -> Self {
        Self::with_aliases(root, AliasTable::new())
    }

    pub fn with_aliases(root: BoolNode, aliases: AliasTable) -> Self {
        Self {
            root,
            aliases,
            quantifiers: None,
            plan: None,
        }
    }

    #[inline]
    pub fn root(&self) -> &BoolNode {
        &self.root
    }

    /// Truth value of an invariant that folded to a constant.
    pub fn as_constant(&self) -> Option<bool> {
        self.root.as_constant()
    }

    /// Cached quantifier table, if resolution already ran.
    pub fn quantifiers(&self) -> Option<&QuantifierTable> {
        self.quantifiers.as_ref()
    }

    /// Substitutes aliases, then numbers and binds quantifiers.
    ///
    /// On failure the formula is left as it was.
    pub fn resolve(&mut self) -> Result<&QuantifierTable> {
        let table = match self.quantifiers.take() {
            Some(table) => table,
            None => {
                let mut root = self.root.clone();
                substitute(&mut root, &self.aliases, &mut Vec::new())?;
                let table = scope::resolve(&mut root)?;
                self.root = root;
                table
            }
        };
        Ok(self.quantifiers.insert(table))
    }

    /// Aggregation plan, resolving first when needed.
    pub fn plan(&mut self) -> Result<&AggregationPlan> {
        let plan = match self.plan.take() {
            Some(plan) => plan,
            None => {
                self.resolve()?;
                let plan = extract(&self.root)?;
                debug!(patterns = plan.patterns.len(), "cached aggregation plan");
                plan
            }
        };
        Ok(self.plan.insert(plan))
    }
}

/// Replaces every alias reference with a copy of its body. Negation and
/// scope of the reference carry over to the copy.
fn substitute(node: &mut BoolNode, aliases: &AliasTable, expanding: &mut Vec<String>) -> Result<()> {
    if let BoolKind::Alias(name) = &node.kind {
        let name = name.clone();
        if expanding.contains(&name) {
            return Err(AliasError::Recursive(name).into());
        }
        let mut body = aliases
            .get(&name)
            .cloned()
            .ok_or_else(|| AliasError::Unknown(name.clone()))?;
        expanding.push(name);
        substitute(&mut body, aliases, expanding)?;
        expanding.pop();
        if node.negated {
            body = body.negate();
        }
        body.scope.merge(std::mem::take(&mut node.scope))?;
        *node = body;
        return Ok(());
    }
    if let BoolKind::Logic { left, right, .. } = &mut node.kind {
        substitute(left, aliases, expanding)?;
        substitute(right, aliases, expanding)?;
    }
    Ok(())
}

/// Shared aliases plus the registered invariants. The position of an
/// invariant is its constraint id.
#[derive(Debug, Clone, Default)]
pub struct ConstraintTable {
    aliases: AliasTable,
    invariants: Vec<Invariant>,
}

impl ConstraintTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines or replaces an alias; returns the previous body.
    pub fn define_alias(&mut self, name: impl Into<String>, body: BoolNode) -> Option<BoolNode> {
        self.aliases.insert(name.into(), body)
    }

    /// A copy of the alias body.
    pub fn alias(&self, name: &str) -> Option<BoolNode> {
        self.aliases.get(name).cloned()
    }

    /// Registers an invariant over the aliases defined so far; returns its id.
    pub fn register(&mut self, root: BoolNode) -> usize {
        self.invariants.push(Invariant::with_aliases(root, self.aliases.clone()));
        self.invariants.len() - 1
    }

    pub fn get(&self, id: usize) -> Option<&Invariant> {
        self.invariants.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invariant> {
        self.invariants.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Invariant> {
        self.invariants.iter_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
