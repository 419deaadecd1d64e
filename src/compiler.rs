//! Batch compilation of a constraint table.

use crate::catalog::AttributeCatalog;
use crate::config::CompilerConfig;
use crate::emit::{Artifacts, CompiledInvariant};
use crate::error::Result;
use crate::fingerprint::HashRegistry;
use crate::invariant::ConstraintTable;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Compiles every invariant of a [`ConstraintTable`] under one configuration.
#[derive(Debug, Clone)]
pub struct Compiler {
    config: CompilerConfig,
    catalog: AttributeCatalog,
}

impl Compiler {
    /// Validates `config` and builds its attribute catalog.
    pub fn new(config: CompilerConfig) -> Result<Self> {
        config.validate()?;
        let catalog = AttributeCatalog::from_decls(config.attributes.iter().cloned())?;
        Ok(Self { config, catalog })
    }

    #[inline]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    #[inline]
    pub fn catalog(&self) -> &AttributeCatalog {
        &self.catalog
    }

    /// Compiles all invariants in constraint-id order. Invariants that folded
    /// to a constant are skipped; the first failure aborts the whole table.
    pub fn compile(&self, table: &mut ConstraintTable) -> Result<Artifacts> {
        let mut hashes = HashRegistry::new();
        for decl in self.catalog.iter() {
            hashes.observe(&decl.name);
        }
        let mut reported = BTreeSet::new();
        let mut invariants = Vec::with_capacity(table.len());
        for (index, invariant) in table.iter_mut().enumerate() {
            if let Some(value) = invariant.as_constant() {
                warn!(index, value, "invariant is constant, skipping");
                continue;
            }
            let compiled = CompiledInvariant::build(index, invariant)?;
            for att in invariant.root().attributes() {
                if !reported.insert(att.name().to_string()) {
                    continue;
                }
                if !self.catalog.is_empty() && !self.catalog.contains(att.name()) {
                    warn!(index, attribute = att.name(), "attribute is not declared");
                }
                if let Some(collision) = hashes.observe(att.name()) {
                    warn!(
                        hash = collision.hash,
                        first = %collision.first,
                        second = %collision.second,
                        "attribute names share a runtime hash"
                    );
                }
            }
            debug!(index, nodes = compiled.nodes.len(), rows = compiled.fields.len(), "compiled invariant");
            invariants.push(compiled);
        }
        Ok(Artifacts { invariants })
    }

    /// Compiles everything, then writes the artifacts. Nothing is written
    /// when compilation fails.
    pub fn compile_and_write(&self, table: &mut ConstraintTable) -> Result<(Artifacts, Vec<PathBuf>)> {
        let artifacts = self.compile(table)?;
        let written = artifacts.write_to(&self.config)?;
        Ok((artifacts, written))
    }
}
