//! Error types and reporting

use crate::interp::RuntimeError;
use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, LoadError>;

/// Failure to get a program or configuration into the evaluator
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed program: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed configuration: {source}")]
    Config {
        #[source]
        source: toml::de::Error,
    },
}

/// Render an unrecovered runtime error for the terminal.
///
/// Layout: one `error:` line, an optional ` --> file:line:col` pointer and
/// the captured call trace, innermost frame first.
pub fn render_runtime_error(file: &str, error: &RuntimeError) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "error: {}", error.message);
    if let Some(location) = error.location {
        let _ = writeln!(out, " --> {file}:{location}");
    }
    if let Some(trace) = &error.trace {
        if !trace.is_empty() {
            let _ = writeln!(out, "call trace:");
            for frame in trace {
                let _ = writeln!(out, "  at {frame}");
            }
        }
    }
    out
}

/// Report error to stderr
pub fn report_error(file: &str, error: &RuntimeError) {
    eprint!("{}", render_runtime_error(file, error));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::interp::CallFrame;

    #[test]
    fn test_render_with_trace() {
        let err = RuntimeError::no_implementation("Show", "Widget", "show")
            .or_location(Span::new(3, 9))
            .or_trace(vec![
                CallFrame::new("show", "main.dc", Span::new(3, 9)),
                CallFrame::new("main", "main.dc", Span::new(1, 1)),
            ]);
        insta::assert_snapshot!(render_runtime_error("main.dc", &err), @r"
        error: no implementation of trait Show for type Widget, method show
         --> main.dc:3:9
        call trace:
          at show (main.dc:3:9)
          at main (main.dc:1:1)
        ");
    }

    #[test]
    fn test_render_without_location() {
        let err = RuntimeError::user("boom");
        assert_eq!(render_runtime_error("x.dc", &err), "error: boom\n");
    }

    #[test]
    fn test_load_error_display() {
        let err = LoadError::Io {
            path: PathBuf::from("missing.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "IO error reading missing.json: not found");
    }
}
