//! Attribute declarations.
//!
//! The catalog lists the attributes a node exposes, with their runtime type
//! and how their value is obtained. Names are unique and their 16-bit hashes
//! are checked for collisions as they are added.

use crate::error::CatalogError;
use crate::fingerprint::{name_hash, HashCollision, HashRegistry};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Runtime type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Bool,
    Float,
    Int,
}

impl AttributeType {
    /// Type name on the node.
    pub const fn c_type(self) -> &'static str {
        match self {
            AttributeType::Bool => "bool",
            AttributeType::Float => "float",
            AttributeType::Int => "uint16_t",
        }
    }
}

/// Literal of a constant attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i32),
    Float(f32),
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Bool(b) => Value::Bool(b),
            Literal::Int(v) => Value::Int(v),
            Literal::Float(v) => Value::float(v),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
        }
    }
}

/// How the node obtains the value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Refresh {
    Constant { value: Literal },
    /// Read once at boot.
    #[default]
    Static,
    /// Sampled every `period_ms` milliseconds.
    Dynamic { period_ms: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
    #[serde(default)]
    pub refresh: Refresh,
}

impl AttributeDecl {
    pub fn new(name: impl Into<String>, ty: AttributeType, refresh: Refresh) -> Self {
        Self {
            name: name.into(),
            ty,
            refresh,
        }
    }

    #[inline]
    pub fn hash(&self) -> u16 {
        name_hash(&self.name)
    }
}

/// Renders the node-side declaration, e.g. `float humidity, new_humidity;`.
impl fmt::Display for AttributeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty.c_type(), self.name)?;
        match self.refresh {
            Refresh::Constant { value } => write!(f, " = {value}")?,
            Refresh::Dynamic { .. } => write!(f, ", new_{}", self.name)?,
            Refresh::Static => {}
        }
        f.write_str(";")
    }
}

/// Declared attributes in declaration order.
#[derive(Debug, Clone, Default)]
pub struct AttributeCatalog {
    decls: Vec<AttributeDecl>,
    by_name: BTreeMap<String, usize>,
    hashes: HashRegistry,
    collisions: Vec<HashCollision>,
}

impl AttributeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from `decls`, failing on the first duplicate name.
    pub fn from_decls<I>(decls: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = AttributeDecl>,
    {
        let mut catalog = Self::new();
        for decl in decls {
            catalog.add(decl)?;
        }
        Ok(catalog)
    }

    pub fn add(&mut self, decl: AttributeDecl) -> Result<(), CatalogError> {
        if self.by_name.contains_key(&decl.name) {
            return Err(CatalogError::AttributeAlreadyDefined(decl.name));
        }
        if let Some(collision) = self.hashes.observe(&decl.name) {
            warn!(
                hash = collision.hash,
                first = %collision.first,
                second = %collision.second,
                "attribute names share a runtime hash"
            );
            self.collisions.push(collision);
        }
        self.by_name.insert(decl.name.clone(), self.decls.len());
        self.decls.push(decl);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDecl> {
        self.by_name.get(name).map(|&i| &self.decls[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Hash collisions seen so far, in insertion order.
    pub fn collisions(&self) -> &[HashCollision] {
        &self.collisions
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDecl> {
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
