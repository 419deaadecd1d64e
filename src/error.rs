//! Error taxonomy for invariant compilation.
//!
//! Every failure is surfaced as a typed value; nothing is logged and swallowed.
//! Constant probes ("is this operand a literal?") are not errors and live on
//! the tree types as `Option`-returning queries.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of quantifier numbering and binding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantifierError {
    /// A quantifier name was declared twice in scopes that meet.
    #[error("quantifier `{0}` is already in use")]
    InUse(String),
    /// An attribute occurrence names a quantifier nobody declared.
    #[error("quantifier `{0}` not found")]
    NotFound(String),
    /// Quantifier ids are 16-bit.
    #[error("invariant declares more than 65536 quantifiers")]
    TooMany,
}

/// Failures of aggregation planning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error(transparent)]
    Quantifier(#[from] QuantifierError),
    /// Comparison ids are 16-bit.
    #[error("invariant has more than 65536 comparisons")]
    TooManyComparisons,
}

/// Failures of alias substitution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AliasError {
    #[error("alias `{0}` is not defined")]
    Unknown(String),
    #[error("alias `{0}` expands to itself")]
    Recursive(String),
}

/// Failures while building the attribute catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("attribute `{0}` is already defined")]
    AttributeAlreadyDefined(String),
}

/// Top-level error of a compile invocation.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Quantifier(#[from] QuantifierError),
    #[error(transparent)]
    Alias(#[from] AliasError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("binary artifact encoding failed: {0}")]
    Encoding(#[from] serde_cbor::Error),
    #[error("malformed configuration document: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompileError {
    /// Wraps an I/O failure together with the path being written.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = CompileError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_name_the_offender() {
        let err: CompileError = QuantifierError::InUse("m".into()).into();
        assert_eq!(err.to_string(), "quantifier `m` is already in use");
        let err: CompileError = QuantifierError::NotFound("k".into()).into();
        assert!(err.to_string().contains("`k`"));
        let err: CompileError = CatalogError::AttributeAlreadyDefined("temp".into()).into();
        assert_eq!(err.to_string(), "attribute `temp` is already defined");
        let err: CompileError = PlanError::TooManyComparisons.into();
        assert!(err.to_string().contains("comparisons"));
    }

    #[test]
    fn io_errors_carry_the_path() {
        let err = CompileError::io(
            "/tmp/out.constraints",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/out.constraints"));
    }
}
