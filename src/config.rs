//! Compiler configuration.

use crate::catalog::AttributeDecl;
use crate::error::{CompileError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings of one compile invocation, usually read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Directory receiving the artifacts.
    pub output_dir: PathBuf,
    /// Base name of the artifacts; must be a C identifier.
    pub module_name: String,
    /// Also write the CBOR bundle.
    pub emit_binary: bool,
    pub attributes: Vec<AttributeDecl>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            module_name: "constraints".to_string(),
            emit_binary: false,
            attributes: Vec::new(),
        }
    }
}

impl CompilerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CompileError::io(path, source))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let mut chars = self.module_name.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(CompileError::Config(format!(
                "module name `{}` is not a C identifier",
                self.module_name
            )));
        }
        Ok(())
    }

    /// `<output_dir>/<module>.constraints`
    pub fn text_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.constraints", self.module_name))
    }

    /// `<output_dir>/<module>.cbor`
    pub fn binary_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.cbor", self.module_name))
    }
}
