//! Leaf values, attribute occurrences and quantifiers.

use crate::fingerprint::name_hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense quantifier identifier, assigned in first-seen pre-order.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuantifierId(u16);

impl QuantifierId {
    #[inline]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for QuantifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Universal (`forall`) or existential (`exists`) binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuantifierKind {
    Universal,
    Existential,
}

impl QuantifierKind {
    /// Runtime code.
    pub const fn code(self) -> u8 {
        match self {
            QuantifierKind::Universal => 0,
            QuantifierKind::Existential => 1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            QuantifierKind::Universal => "UNIVERSAL",
            QuantifierKind::Existential => "EXISTENTIAL",
        }
    }

    pub const fn is_existential(self) -> bool {
        matches!(self, QuantifierKind::Existential)
    }
}

/// A quantifier as written in a scope, before numbering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuantifierDecl {
    pub name: String,
    pub kind: QuantifierKind,
}

impl QuantifierDecl {
    pub fn new(name: impl Into<String>, kind: QuantifierKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A numbered quantifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quantifier {
    pub name: String,
    pub kind: QuantifierKind,
    pub id: QuantifierId,
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            QuantifierKind::Universal => 'U',
            QuantifierKind::Existential => 'E',
        };
        write!(f, "{tag}{}({})", self.name, self.id)
    }
}

/// One occurrence of an attribute under a quantifier, e.g. `temperature@m`.
///
/// `quantifier` stays `None` until resolution binds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeRef {
    name: String,
    hash: u16,
    binder: String,
    quantifier: Option<Quantifier>,
}

impl AttributeRef {
    pub fn new(name: impl Into<String>, binder: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            hash: name_hash(&name),
            name,
            binder: binder.into(),
            quantifier: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn hash(&self) -> u16 {
        self.hash
    }

    /// Name of the quantifier this occurrence refers to.
    #[inline]
    pub fn binder(&self) -> &str {
        &self.binder
    }

    #[inline]
    pub fn quantifier(&self) -> Option<&Quantifier> {
        self.quantifier.as_ref()
    }

    pub(crate) fn bind(&mut self, quantifier: Quantifier) {
        self.quantifier = Some(quantifier);
    }

    /// Same attribute under the same binder name.
    pub fn same_occurrence(&self, other: &AttributeRef) -> bool {
        self.name == other.name && self.binder == other.binder
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.binder)
    }
}

/// Leaf payload of a math node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Attribute(AttributeRef),
    Bool(bool),
    Int(i32),
    Float(f32),
}

impl Value {
    /// Builds a float literal, canonicalized to `Int` when the value is
    /// exactly an integer.
    pub fn float(value: f32) -> Self {
        // i32::MAX is not representable as f32; 2^31 is the first float out of range.
        let in_range = (-2_147_483_648.0..2_147_483_648.0).contains(&value);
        if in_range && value.fract() == 0.0 {
            Value::Int(value as i32)
        } else {
            Value::Float(value)
        }
    }

    pub fn attribute(name: impl Into<String>, binder: impl Into<String>) -> Self {
        Value::Attribute(AttributeRef::new(name, binder))
    }

    pub fn is_constant(&self) -> bool {
        !matches!(self, Value::Attribute(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_attribute(&self) -> Option<&AttributeRef> {
        match self {
            Value::Attribute(att) => Some(att),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view used by compile-time evaluation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(f64::from(*v)),
            Value::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub(crate) fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Int(v) => Some(*v as f32),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Arithmetic or logical negation of a constant.
    pub fn negated(&self) -> Option<Value> {
        match self {
            Value::Int(v) => Some(Value::Int(v.wrapping_neg())),
            Value::Float(v) => Some(Value::float(-v)),
            Value::Bool(b) => Some(Value::Bool(!b)),
            Value::Attribute(_) => None,
        }
    }

    pub(crate) fn is_negative(&self) -> bool {
        match self {
            Value::Int(v) => *v < 0,
            Value::Float(v) => *v < 0.0,
            _ => false,
        }
    }

    pub(crate) fn is_int(&self, expected: i32) -> bool {
        matches!(self, Value::Int(v) if *v == expected)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<AttributeRef> for Value {
    fn from(value: AttributeRef) -> Self {
        Value::Attribute(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Attribute(att) => write!(f, "{att}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_floats_become_ints() {
        assert_eq!(Value::float(6.0), Value::Int(6));
        assert_eq!(Value::float(-3.0), Value::Int(-3));
        assert_eq!(Value::float(2.5), Value::Float(2.5));
        assert!(matches!(Value::float(f32::NAN), Value::Float(v) if v.is_nan()));
        assert_eq!(Value::from(6.0f32), Value::Int(6));
        assert_eq!(Value::float(-2_147_483_648.0), Value::Int(i32::MIN));
        assert_eq!(Value::float(2_147_483_648.0), Value::Float(2_147_483_648.0));
        assert!(matches!(Value::float(f32::INFINITY), Value::Float(v) if v.is_infinite()));
    }

    #[test]
    fn attribute_identity() {
        let a = AttributeRef::new("temperature", "m");
        let b = AttributeRef::new("temperature", "m");
        let c = AttributeRef::new("temperature", "n");
        assert!(a.same_occurrence(&b));
        assert!(!a.same_occurrence(&c));
        assert_eq!(a.hash(), name_hash("temperature"));
        assert_eq!(a.to_string(), "temperature@m");
        assert!(a.quantifier().is_none());
    }

    #[test]
    fn constant_negation() {
        assert_eq!(Value::Int(4).negated(), Some(Value::Int(-4)));
        assert_eq!(Value::Bool(true).negated(), Some(Value::Bool(false)));
        assert_eq!(Value::attribute("a", "m").negated(), None);
    }

    #[test]
    fn quantifier_display() {
        let q = Quantifier {
            name: "m".into(),
            kind: QuantifierKind::Existential,
            id: QuantifierId::new(2),
        };
        assert_eq!(q.to_string(), "Em(2)");
    }
}
