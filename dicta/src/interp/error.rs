//! Runtime errors for the interpreter

use super::trace::CallFrame;
use crate::ast::Span;
use std::fmt;

/// Runtime error during interpretation
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Source position of the failing expression, when known
    pub location: Option<Span>,
    /// Call frames at the point the error first surfaced, innermost first
    pub trace: Option<Vec<CallFrame>>,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Too few/too many arguments, witness-count mismatch
    Arity,
    /// No instance resolves a trait method
    Dispatch,
    /// Destructuring mismatch
    Pattern,
    /// Value has the wrong shape: not a function, expected Dictionary, ...
    TypeShape,
    /// Undefined variable
    UndefinedVariable,
    /// Division by zero
    DivisionByZero,
    /// Call depth limit exceeded
    StackOverflow,
    /// Host interop failure
    Host,
    /// Raised by the program itself
    User,
}

impl RuntimeError {
    fn new(kind: ErrorKind, message: String) -> Self {
        RuntimeError {
            kind,
            message,
            location: None,
            trace: None,
        }
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(ErrorKind::UndefinedVariable, format!("undefined variable: {name}"))
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::new(ErrorKind::TypeShape, format!("type error: expected {expected}, got {got}"))
    }

    pub fn not_callable(type_name: &str) -> Self {
        Self::new(ErrorKind::TypeShape, format!("not a function: {type_name}"))
    }

    pub fn expected_dictionary(got: &str) -> Self {
        Self::new(ErrorKind::TypeShape, format!("expected Dictionary, got {got}"))
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        Self::new(
            ErrorKind::Arity,
            format!("function {name} expects {expected} argument(s), got {got}"),
        )
    }

    /// Zero arguments supplied where some are required.
    pub fn missing_arguments(name: &str, required: usize) -> Self {
        Self::new(
            ErrorKind::Arity,
            format!("function {name} called without arguments, requires {required}"),
        )
    }

    pub fn witness_mismatch(name: &str, expected: usize, got: usize) -> Self {
        Self::new(
            ErrorKind::Arity,
            format!("function {name} expects {expected} witness dictionar(ies), got {got}"),
        )
    }

    pub fn no_implementation(trait_name: &str, type_name: &str, method: &str) -> Self {
        Self::new(
            ErrorKind::Dispatch,
            format!("no implementation of trait {trait_name} for type {type_name}, method {method}"),
        )
    }

    pub fn pattern_mismatch(msg: &str) -> Self {
        Self::new(ErrorKind::Pattern, format!("pattern mismatch: {msg}"))
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "division by zero".to_string())
    }

    pub fn stack_overflow(limit: usize) -> Self {
        Self::new(
            ErrorKind::StackOverflow,
            format!("stack overflow: call depth exceeded {limit}"),
        )
    }

    pub fn host(msg: &str) -> Self {
        Self::new(ErrorKind::Host, format!("host interop: {msg}"))
    }

    pub fn user(msg: &str) -> Self {
        Self::new(ErrorKind::User, msg.to_string())
    }

    /// Attach `span` unless a location is already recorded.
    pub fn or_location(mut self, span: Span) -> Self {
        if self.location.is_none() && span.is_known() {
            self.location = Some(span);
        }
        self
    }

    /// Attach `trace` unless the error already carries one.
    pub fn or_trace(mut self, trace: Vec<CallFrame>) -> Self {
        if self.trace.is_none() {
            self.trace = Some(trace);
        }
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error: {}", self.message)?;
        if let Some(location) = self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = RuntimeError::undefined_variable("x");
        assert_eq!(err.to_string(), "Runtime error: undefined variable: x");
        let err = err.or_location(Span::new(4, 2));
        assert_eq!(err.to_string(), "Runtime error: undefined variable: x at 4:2");
    }

    #[test]
    fn test_first_location_wins() {
        let err = RuntimeError::division_by_zero()
            .or_location(Span::new(1, 1))
            .or_location(Span::new(9, 9));
        assert_eq!(err.location, Some(Span::new(1, 1)));
    }

    #[test]
    fn test_unknown_span_not_attached() {
        let err = RuntimeError::user("x").or_location(Span::unknown());
        assert!(err.location.is_none());
    }

    #[test]
    fn test_first_trace_wins() {
        let inner = vec![CallFrame::new("inner", "a.dc", Span::new(2, 1))];
        let outer = vec![CallFrame::new("outer", "a.dc", Span::new(1, 1))];
        let err = RuntimeError::user("boom").or_trace(inner).or_trace(outer);
        let trace = err.trace.unwrap();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].name, "inner");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(RuntimeError::missing_arguments("f", 2).kind, ErrorKind::Arity);
        assert_eq!(RuntimeError::not_callable("Int").kind, ErrorKind::TypeShape);
        assert_eq!(
            RuntimeError::no_implementation("Show", "Widget", "show").message,
            "no implementation of trait Show for type Widget, method show"
        );
    }
}
