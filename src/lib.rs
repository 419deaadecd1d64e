//! Vigil: an invariant compiler for sensor networks.
//!
//! A quantified invariant such as
//! `forall m, n: temperature@m - temperature@n < 10` is compiled into
//! artifacts a memory-constrained node can evaluate incrementally from the
//! values it observes locally and receives from its neighbours.
//!
//! The pipeline, leaves first:
//! - [`value`], [`operators`], [`math`] and [`logic`]: the expression trees.
//!   Builders fold constants and rearrange comparisons as nodes are created.
//! - [`normalize`]: canonicalizes arithmetic into an affine sum of attribute
//!   terms followed by one constant.
//! - [`scope`]: numbers quantifiers and binds attribute occurrences.
//! - [`pattern`]: decides which maximum, minimum or scoping condition each
//!   node has to track, and where each value lives in the runtime array.
//! - [`emit`]: the post-order node list, signature table and mapping table.
//!
//! [`compiler::Compiler`] drives the pipeline over a whole
//! [`invariant::ConstraintTable`].
//!
//! # Example
//!
//! ```
//! use vigil::prelude::*;
//!
//! let spread = MathNode::binary(
//!     MathOp::Minus,
//!     MathNode::attribute("temperature", "m"),
//!     MathNode::attribute("temperature", "n"),
//! );
//! let root = BoolNode::compare(CompareOp::Lower, spread, MathNode::int(10))
//!     .forall(&["m", "n"])
//!     .unwrap();
//!
//! let mut invariant = Invariant::new(root);
//! let plan = invariant.plan().unwrap();
//! assert_eq!(plan.patterns[0].objective(), Objective::Maximize);
//! assert_eq!(plan.patterns[1].objective(), Objective::Minimize);
//! assert_eq!(plan.mapping.len(), 2);
//! ```

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod emit;
pub mod error;
pub mod fingerprint;
pub mod invariant;
pub mod logic;
pub mod math;
pub mod normalize;
pub mod operators;
pub mod pattern;
pub mod scope;
pub mod value;

pub use compiler::Compiler;
pub use config::CompilerConfig;
pub use emit::Artifacts;
pub use error::{CompileError, Result};
pub use invariant::{ConstraintTable, Invariant};

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::catalog::{AttributeCatalog, AttributeDecl, AttributeType, Literal, Refresh};
    pub use crate::compiler::Compiler;
    pub use crate::config::CompilerConfig;
    pub use crate::emit::{Artifacts, CompiledInvariant, NodeRecord, SignatureRow};
    pub use crate::error::{AliasError, CatalogError, CompileError, PlanError, QuantifierError};
    pub use crate::fingerprint::{name_hash, ArtifactDigest, HashRegistry};
    pub use crate::invariant::{ConstraintTable, Invariant};
    pub use crate::logic::{BoolKind, BoolNode, IntervalTest};
    pub use crate::math::{MathKind, MathNode};
    pub use crate::normalize::normalize;
    pub use crate::operators::{CompareOp, LogicOp, MathOp};
    pub use crate::pattern::{extract, AggregationPlan, MappingEntry, Objective, Pattern};
    pub use crate::scope::{resolve, QuantificationScope, QuantifierTable};
    pub use crate::value::{AttributeRef, Quantifier, QuantifierId, QuantifierKind, Value};
}
