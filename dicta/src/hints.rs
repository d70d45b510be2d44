//! Analyzer-provided hints.
//!
//! The static analyzer runs before evaluation and leaves behind facts the
//! evaluator cannot recover on its own: inferred types of call nodes,
//! generic instantiations, trait hierarchies and default method bodies.
//! All of it is consumed read-only.

use crate::ast::{FnDef, NodeId, Program, Type};
use crate::error::LoadError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerHints {
    /// Inferred type of each call node
    #[serde(default)]
    pub node_types: HashMap<NodeId, Type>,
    /// Type-variable substitution fixed at a call node
    #[serde(default)]
    pub instantiations: HashMap<NodeId, IndexMap<String, Type>>,
    /// Type aliases: alias name -> underlying type
    #[serde(default)]
    pub aliases: HashMap<String, Type>,
    /// Trait -> direct super-traits
    #[serde(default)]
    pub super_traits: HashMap<String, Vec<String>>,
    /// Trait -> method names in dictionary order
    #[serde(default)]
    pub method_order: HashMap<String, Vec<String>>,
    /// Trait -> user-declared default method bodies
    #[serde(default)]
    pub trait_defaults: HashMap<String, Vec<Arc<FnDef>>>,
}

impl AnalyzerHints {
    pub fn node_type(&self, id: NodeId) -> Option<&Type> {
        self.node_types.get(&id)
    }

    pub fn instantiation(&self, id: NodeId) -> Option<&IndexMap<String, Type>> {
        self.instantiations.get(&id)
    }
}

/// A program together with the hints its analyzer produced; this is the
/// unit the CLI reads from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzedProgram {
    pub program: Program,
    #[serde(default)]
    pub hints: AnalyzerHints,
}

impl AnalyzedProgram {
    pub fn new(program: Program, hints: AnalyzerHints) -> Self {
        AnalyzedProgram { program, hints }
    }

    pub fn from_json(source: &str) -> Result<Self, LoadError> {
        serde_json::from_str(source).map_err(|source| LoadError::Json { source })
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut analyzed = Self::from_json(&source)?;
        if analyzed.program.file.is_empty() {
            analyzed.program.file = path.display().to_string();
        }
        Ok(analyzed)
    }
}
