//! Artifact emission.
//!
//! Every compiled invariant becomes a post-order node list, its quantifier
//! kinds, the signature table (one row per pattern, each followed by its link
//! rows) and the index mapping. [`Artifacts::to_text`] renders the line
//! format read by the node firmware; [`Artifacts::to_cbor`] packs the same
//! data as a binary bundle.
//!
//! # Determinism
//! Rendering depends only on the compiled data. Two compiles of the same
//! input produce byte-identical text and CBOR.

use crate::config::CompilerConfig;
use crate::error::{AliasError, CompileError, QuantifierError, Result};
use crate::fingerprint::{ArtifactDigest, DOMAIN_BINARY_ARTIFACTS_V1, DOMAIN_TEXT_ARTIFACTS_V1};
use crate::invariant::Invariant;
use crate::logic::{BoolKind, BoolNode, IntervalTest};
use crate::math::{MathKind, MathNode};
use crate::pattern::{AggregationPlan, MappingEntry, Objective};
use crate::value::{QuantifierId, QuantifierKind, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Objective name of link rows.
pub const LINK_NAME: &str = "OBJ_LINK";
/// Objective code of link rows.
pub const LINK_CODE: u8 = 3;

/// One entry of the post-order node list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeRecord {
    Attribute {
        hash: u16,
        quantifier: QuantifierId,
        negated: bool,
    },
    Int {
        value: i32,
        negated: bool,
    },
    Float {
        value: f32,
        negated: bool,
    },
    Bool {
        value: bool,
        negated: bool,
    },
    Operator {
        name: String,
        code: u8,
        negated: bool,
    },
}

impl NodeRecord {
    fn operator(name: &str, code: u8, negated: bool) -> Self {
        NodeRecord::Operator {
            name: name.to_string(),
            code,
            negated,
        }
    }
}

impl fmt::Display for NodeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |negated: bool| u8::from(negated);
        match self {
            NodeRecord::Attribute {
                hash,
                quantifier,
                negated,
            } => writeln!(f, "node ATTRIBUTE {hash} {quantifier} {}", flag(*negated)),
            NodeRecord::Int { value, negated } => writeln!(f, "node INT {value} {}", flag(*negated)),
            NodeRecord::Float { value, negated } => writeln!(f, "node FLOAT {value} {}", flag(*negated)),
            NodeRecord::Bool { value, negated } => {
                writeln!(f, "node BOOL {} {}", u8::from(*value), flag(*negated))
            }
            NodeRecord::Operator { name, code, negated } => {
                writeln!(f, "node OPERATOR {name} {code} {}", flag(*negated))
            }
        }
    }
}

/// One row of the signature table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRow {
    pub hash: u16,
    pub objective: String,
    pub code: u8,
    pub data: i32,
    pub quantifier: Option<QuantifierId>,
}

/// Everything the runtime needs about one invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledInvariant {
    pub index: usize,
    pub quantifiers: Vec<QuantifierKind>,
    pub nodes: Vec<NodeRecord>,
    pub fields: Vec<SignatureRow>,
    pub mapping: Vec<MappingEntry>,
    pub interval: Option<IntervalTest>,
}

impl CompiledInvariant {
    /// Resolves, plans and flattens `invariant` as constraint `index`.
    pub fn build(index: usize, invariant: &mut Invariant) -> Result<Self> {
        let quantifiers = invariant.resolve()?.kinds();
        let plan = invariant.plan()?;
        let fields = signature_rows(plan);
        let mapping = plan.mapping.clone();
        let interval = plan.interval;
        let mut nodes = Vec::new();
        bool_records(invariant.root(), &mut nodes)?;
        Ok(Self {
            index,
            quantifiers,
            nodes,
            fields,
            mapping,
            interval,
        })
    }
}

impl fmt::Display for CompiledInvariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "invariant {}", self.index)?;
        write!(f, "quantifiers {}", self.quantifiers.len())?;
        for kind in &self.quantifiers {
            write!(f, " {}", kind.name())?;
        }
        writeln!(f)?;
        for node in &self.nodes {
            write!(f, "{node}")?;
        }
        for row in &self.fields {
            write!(f, "field {} {} {} {} ", row.hash, row.objective, row.code, row.data)?;
            match row.quantifier {
                Some(q) => writeln!(f, "{q}")?,
                None => writeln!(f, "-")?,
            }
        }
        for entry in &self.mapping {
            writeln!(
                f,
                "map {} {} {} {}",
                entry.hash, entry.math_id, entry.quantifier, entry.slot
            )?;
        }
        if let Some(IntervalTest { below, above }) = self.interval {
            writeln!(f, "interval {below} {above}")?;
        }
        writeln!(f, "end")
    }
}

/// Pattern rows in plan order, each followed by its link rows. A link row
/// carries the row index of its owner. Consumed scoping patterns get no row.
fn signature_rows(plan: &AggregationPlan) -> Vec<SignatureRow> {
    let mut rows = Vec::new();
    for pattern in plan.patterns.iter().filter(|pattern| !pattern.is_consumed()) {
        let owner = rows.len() as i32;
        let data = match (pattern.is_bound(), pattern.objective()) {
            (false, _) => pattern.quantifiers().len() as i32,
            (true, Objective::Scoping) => pattern.bool_node(),
            (true, _) => pattern.implication(),
        };
        rows.push(SignatureRow {
            hash: pattern.hash(),
            objective: pattern.objective().name().to_string(),
            code: pattern.objective().code(),
            data,
            quantifier: if pattern.is_bound() {
                pattern.first_quantifier()
            } else {
                None
            },
        });
        rows.extend(pattern.links().map(|(_, hash)| SignatureRow {
            hash,
            objective: LINK_NAME.to_string(),
            code: LINK_CODE,
            data: owner,
            quantifier: None,
        }));
    }
    rows
}

fn bool_records(node: &BoolNode, out: &mut Vec<NodeRecord>) -> Result<()> {
    match node.kind() {
        BoolKind::Leaf(value) => out.push(NodeRecord::Bool {
            value: *value,
            negated: node.is_negated(),
        }),
        BoolKind::Compare { op, left, right } => {
            math_records(left, out)?;
            math_records(right, out)?;
            out.push(NodeRecord::operator(op.name(), op.code(), node.is_negated()));
        }
        BoolKind::Logic { op, left, right } => {
            bool_records(left, out)?;
            bool_records(right, out)?;
            out.push(NodeRecord::operator(op.name(), op.code(), node.is_negated()));
        }
        BoolKind::Alias(name) => return Err(AliasError::Unknown(name.clone()).into()),
    }
    Ok(())
}

fn math_records(node: &MathNode, out: &mut Vec<NodeRecord>) -> Result<()> {
    let negated = node.is_negated();
    match node.kind() {
        MathKind::Leaf(Value::Attribute(att)) => {
            let quantifier = att
                .quantifier()
                .ok_or_else(|| QuantifierError::NotFound(att.binder().to_string()))?;
            out.push(NodeRecord::Attribute {
                hash: att.hash(),
                quantifier: quantifier.id,
                negated,
            });
        }
        MathKind::Leaf(Value::Int(value)) => out.push(NodeRecord::Int { value: *value, negated }),
        MathKind::Leaf(Value::Float(value)) => out.push(NodeRecord::Float { value: *value, negated }),
        MathKind::Leaf(Value::Bool(value)) => out.push(NodeRecord::Bool { value: *value, negated }),
        MathKind::Binary { op, left, right } => {
            math_records(left, out)?;
            math_records(right, out)?;
            out.push(NodeRecord::operator(op.name(), op.code(), negated));
        }
    }
    Ok(())
}

/// Compiled invariants of one constraint table, in constraint-id order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    pub invariants: Vec<CompiledInvariant>,
}

impl Artifacts {
    pub fn to_text(&self) -> String {
        self.invariants.iter().map(ToString::to_string).collect()
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        Ok(serde_cbor::to_vec(self)?)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        Ok(serde_cbor::from_slice(bytes)?)
    }

    /// Digest of the text rendering.
    pub fn digest(&self) -> ArtifactDigest {
        ArtifactDigest::hash_with_domain(DOMAIN_TEXT_ARTIFACTS_V1, self.to_text().as_bytes())
    }

    /// Writes the text artifact, and the CBOR bundle when enabled. Both are
    /// rendered before anything touches the disk.
    pub fn write_to(&self, config: &CompilerConfig) -> Result<Vec<PathBuf>> {
        let mut files = vec![(config.text_path(), self.to_text().into_bytes())];
        if config.emit_binary {
            let bytes = self.to_cbor()?;
            info!(
                digest = %ArtifactDigest::hash_with_domain(DOMAIN_BINARY_ARTIFACTS_V1, &bytes),
                "encoded binary bundle"
            );
            files.push((config.binary_path(), bytes));
        }
        let mut written = Vec::with_capacity(files.len());
        for (path, bytes) in files {
            write_atomically(&path, &bytes)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Writes through a temporary file in the target directory, then renames.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|source| CompileError::io(dir, source))?;
    let mut file = NamedTempFile::new_in(dir).map_err(|source| CompileError::io(dir, source))?;
    file.write_all(bytes).map_err(|source| CompileError::io(path, source))?;
    file.persist(path).map_err(|err| CompileError::io(path, err.error))?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote artifact");
    Ok(())
}
