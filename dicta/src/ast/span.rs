//! Source location tracking

use serde::{Deserialize, Serialize};

/// A source position reported by the front end.
///
/// Line and column are 1-based. `0:0` means the front end did not record a
/// position, which is also what a missing `span` field deserializes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub col: u32,
}

impl Span {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A value with source location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    #[serde(default)]
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    /// Wrap a node that has no recorded position.
    pub fn bare(node: T) -> Self {
        Self {
            node,
            span: Span::unknown(),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_new() {
        let span = Span::new(10, 4);
        assert_eq!(span.line, 10);
        assert_eq!(span.col, 4);
        assert!(span.is_known());
    }

    #[test]
    fn test_span_unknown() {
        assert!(!Span::unknown().is_known());
        assert_eq!(Span::default(), Span::unknown());
    }

    #[test]
    fn test_span_display() {
        assert_eq!(format!("{}", Span::new(42, 7)), "42:7");
    }

    #[test]
    fn test_spanned_map() {
        let s = Spanned::new(21, Span::new(1, 2));
        let doubled = s.map(|n| n * 2);
        assert_eq!(doubled.node, 42);
        assert_eq!(doubled.span, Span::new(1, 2));
    }

    #[test]
    fn test_spanned_missing_span_deserializes() {
        let s: Spanned<i64> = serde_json::from_str(r#"{"node": 3}"#).unwrap();
        assert_eq!(s.node, 3);
        assert!(!s.span.is_known());
    }
}
