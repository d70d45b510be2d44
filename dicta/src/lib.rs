//! Dicta execution core
//!
//! Evaluates analyzed programs of a typeclass-polymorphic functional
//! language: function application with partial application and tail calls,
//! and resolution of trait methods to instances.

pub mod ast;
pub mod config;
pub mod error;
pub mod hints;
pub mod interp;

pub use ast::Span;
pub use config::EvalConfig;
pub use error::{LoadError, Result};
pub use hints::{AnalyzedProgram, AnalyzerHints};
pub use interp::{Interpreter, RuntimeError, Value};
