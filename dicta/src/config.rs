//! Evaluator configuration
//!
//! Read from the `[eval]` table of a `dicta.toml`:
//!
//! ```toml
//! [eval]
//! max_call_depth = 10000
//! trace_limit = 32
//! ```

use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Limits applied while evaluating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Nested (non-tail) calls allowed before a stack overflow error
    pub max_call_depth: usize,
    /// Remaining native stack below which more is allocated
    pub stack_red_zone: usize,
    /// Native stack segment size allocated on growth
    pub stack_grow_size: usize,
    /// Frames kept in an error's call trace
    pub trace_limit: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            max_call_depth: 100_000,
            stack_red_zone: 128 * 1024,
            stack_grow_size: 4 * 1024 * 1024,
            trace_limit: 64,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    eval: EvalConfig,
}

impl EvalConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, LoadError> {
        let file: ConfigFile = toml::from_str(source).map_err(|source| LoadError::Config { source })?;
        Ok(file.eval)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_table_keeps_defaults() {
        let config = EvalConfig::from_toml_str("[eval]\nmax_call_depth = 500\n").unwrap();
        assert_eq!(config.max_call_depth, 500);
        assert_eq!(config.trace_limit, EvalConfig::default().trace_limit);
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(EvalConfig::from_toml_str("").unwrap(), EvalConfig::default());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let err = EvalConfig::from_toml_str("[eval]\nmax_call_depth = \"deep\"\n").unwrap_err();
        assert!(matches!(err, LoadError::Config { .. }));
    }
}
