//! Call frames for diagnostics

use super::stacks::ScopedStack;
use crate::ast::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub name: String,
    pub file: String,
    pub line: u32,
    pub col: u32,
}

impl CallFrame {
    pub fn new(name: impl Into<String>, file: impl Into<String>, span: Span) -> Self {
        CallFrame {
            name: name.into(),
            file: file.into(),
            line: span.line,
            col: span.col,
        }
    }
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{} ({})", self.name, self.file)
        } else {
            write!(f, "{} ({}:{}:{})", self.name, self.file, self.line, self.col)
        }
    }
}

pub type CallStack = ScopedStack<CallFrame>;

impl ScopedStack<CallFrame> {
    /// Innermost `limit` frames, innermost first.
    pub fn capture(&self, limit: usize) -> Vec<CallFrame> {
        self.snapshot().into_iter().rev().take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_innermost_first() {
        let calls = CallStack::new();
        let _a = calls.push(CallFrame::new("main", "m.dc", Span::new(1, 1)));
        let _b = calls.push(CallFrame::new("helper", "m.dc", Span::new(5, 3)));
        let _c = calls.push(CallFrame::new("leaf", "m.dc", Span::new(9, 7)));
        let trace = calls.capture(2);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].name, "leaf");
        assert_eq!(trace[1].name, "helper");
    }

    #[test]
    fn test_display() {
        assert_eq!(CallFrame::new("f", "a.dc", Span::new(3, 4)).to_string(), "f (a.dc:3:4)");
        assert_eq!(CallFrame::new("f", "a.dc", Span::unknown()).to_string(), "f (a.dc)");
    }
}
