//! Quantification scopes and quantifier resolution.
//!
//! A [`QuantificationScope`] is the list of binders written on one formula
//! node. [`resolve`] walks a whole invariant, numbers every declared
//! quantifier into a [`QuantifierTable`] and binds each attribute occurrence
//! to its quantifier.
//!
//! # Determinism
//! Ids are dense (`0..N`) and assigned in pre-order, scope entries in
//! declaration order. The same tree always resolves to the same table.

use crate::error::QuantifierError;
use crate::logic::{BoolKind, BoolNode};
use crate::value::{Quantifier, QuantifierDecl, QuantifierId, QuantifierKind};
use std::fmt;
use tracing::debug;

/// Binders declared on one formula node, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantificationScope {
    decls: Vec<QuantifierDecl>,
}

impl QuantificationScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope binding every name in `names` with the same kind.
    pub fn of(kind: QuantifierKind, names: &[&str]) -> Result<Self, QuantifierError> {
        let mut scope = Self::new();
        for name in names {
            scope.declare(*name, kind)?;
        }
        Ok(scope)
    }

    /// Adds one binder. A name may appear only once.
    pub fn declare(&mut self, name: impl Into<String>, kind: QuantifierKind) -> Result<(), QuantifierError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(QuantifierError::InUse(name));
        }
        self.decls.push(QuantifierDecl::new(name, kind));
        Ok(())
    }

    /// Appends the binders of `other`; shared names are rejected.
    pub fn merge(&mut self, other: QuantificationScope) -> Result<(), QuantifierError> {
        for decl in other.decls {
            self.declare(decl.name, decl.kind)?;
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decls.iter().any(|decl| decl.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuantifierDecl> {
        self.decls.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

impl fmt::Display for QuantificationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut previous: Option<QuantifierKind> = None;
        for decl in &self.decls {
            match previous {
                Some(kind) if kind == decl.kind => f.write_str(", ")?,
                Some(_) => f.write_str("; ")?,
                None => {}
            }
            if previous != Some(decl.kind) {
                let keyword = match decl.kind {
                    QuantifierKind::Universal => "forall",
                    QuantifierKind::Existential => "exists",
                };
                write!(f, "{keyword} ")?;
            }
            f.write_str(&decl.name)?;
            previous = Some(decl.kind);
        }
        Ok(())
    }
}

/// Every quantifier of one invariant, indexed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantifierTable {
    quantifiers: Vec<Quantifier>,
}

impl QuantifierTable {
    fn insert(&mut self, decl: &QuantifierDecl) -> Result<QuantifierId, QuantifierError> {
        if self.get(&decl.name).is_some() {
            return Err(QuantifierError::InUse(decl.name.clone()));
        }
        let id = u16::try_from(self.quantifiers.len())
            .map(QuantifierId::new)
            .map_err(|_| QuantifierError::TooMany)?;
        debug!(name = %decl.name, kind = decl.kind.name(), %id, "numbered quantifier");
        self.quantifiers.push(Quantifier {
            name: decl.name.clone(),
            kind: decl.kind,
            id,
        });
        Ok(id)
    }

    /// Quantifier declared under `name`.
    pub fn get(&self, name: &str) -> Option<&Quantifier> {
        self.quantifiers.iter().find(|q| q.name == name)
    }

    /// Quantifier numbered `id`.
    #[inline]
    pub fn by_id(&self, id: QuantifierId) -> Option<&Quantifier> {
        self.quantifiers.get(usize::from(id.as_u16()))
    }

    /// Kinds in id order.
    pub fn kinds(&self) -> Vec<QuantifierKind> {
        self.quantifiers.iter().map(|q| q.kind).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Quantifier> {
        self.quantifiers.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.quantifiers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quantifiers.is_empty()
    }
}

/// Numbers the quantifiers of `root` and binds every attribute occurrence.
///
/// The tree is only modified once every occurrence is known to resolve.
pub fn resolve(root: &mut BoolNode) -> Result<QuantifierTable, QuantifierError> {
    let mut table = QuantifierTable::default();
    number(root, &mut table)?;
    if let Some(missing) = root
        .attributes()
        .into_iter()
        .find(|att| table.get(att.binder()).is_none())
    {
        return Err(QuantifierError::NotFound(missing.binder().to_string()));
    }
    root.for_each_attribute_mut(&mut |att| {
        if let Some(quantifier) = table.get(att.binder()) {
            att.bind(quantifier.clone());
        }
    });
    debug!(quantifiers = table.len(), "resolved quantifiers");
    Ok(table)
}

fn number(node: &BoolNode, table: &mut QuantifierTable) -> Result<(), QuantifierError> {
    for decl in node.scope().iter() {
        table.insert(decl)?;
    }
    if let BoolKind::Logic { left, right, .. } = node.kind() {
        number(left, table)?;
        number(right, table)?;
    }
    Ok(())
}
