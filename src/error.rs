//! Error types for the Ember execution core
//!
//! Runtime errors carry the span of the node that raised them. Control
//! signals (break/continue/return/yield) are not errors; see `interpreter::Flow`.

use std::fmt;
use thiserror::Error;

/// Location in source code for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self { start, end, line, column }
    }
}

/// Error kinds raised by the evaluator and by node construction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("value of type {0} is not callable")]
    InvalidCall(String),

    #[error("Invalid property '{0}'")]
    InvalidProperty(String),

    #[error("cannot access property '{key}' on {found}")]
    NonObjectPropertyAccess { key: String, found: String },

    #[error("Assignment to different type: expected {expected}, got {found}")]
    TypeMismatchOnAssignment { expected: String, found: String },

    #[error("{construct} expects {expected}, got {found}")]
    ConstructionTypeError {
        construct: &'static str,
        expected: String,
        found: String,
    },

    #[error("undefined symbol '{0}'")]
    UndefinedSymbol(String),

    #[error("uncaught {0} signal")]
    UncaughtSignal(&'static str),

    #[error("{0}")]
    Native(String),

    #[error("launched task failed: {0}")]
    TaskFailed(String),

    #[error("call depth exceeded {0} frames")]
    StackOverflow(usize),

    #[error("frame {0} is no longer live")]
    StaleFrame(usize),

    #[error("no {kind} slot at index {index}")]
    InvalidSlot { kind: &'static str, index: usize },
}

impl ErrorKind {
    /// Control-flow escapes indicate a malformed tree rather than a user error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorKind::UncaughtSignal(_) | ErrorKind::StaleFrame(_) | ErrorKind::InvalidSlot { .. }
        )
    }
}

/// A runtime error with location information
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub source_line: Option<String>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, span: Option<Span>) -> Self {
        Self {
            kind,
            span,
            source_line: None,
        }
    }

    pub fn at(kind: ErrorKind, span: Span) -> Self {
        Self::new(kind, Some(span))
    }

    pub fn with_source(mut self, source: &str) -> Self {
        if let Some(span) = &self.span {
            if span.line > 0 {
                self.source_line = source.lines().nth(span.line - 1).map(str::to_string);
            }
        }
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = &self.span {
            write!(f, "[line {}:{}] Error: {}", span.line, span.column, self.kind)?;

            if let Some(ref line) = self.source_line {
                write!(f, "\n  | {}", line)?;
                write!(f, "\n  | {}^", " ".repeat(span.column.saturating_sub(1)))?;
            }
        } else {
            write!(f, "Error: {}", self.kind)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

impl From<ErrorKind> for RuntimeError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind, None)
    }
}

/// Result type for evaluator operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_points_at_column() {
        let err = RuntimeError::at(ErrorKind::InvalidProperty("x".into()), Span::new(4, 5, 2, 3))
            .with_source("first\nlet y = o.x\n");
        let rendered = err.to_string();
        assert!(rendered.starts_with("[line 2:3] Error: Invalid property 'x'"));
        assert!(rendered.contains("  | let y = o.x"));
        assert!(rendered.ends_with("  |   ^"));
    }

    #[test]
    fn signals_are_fatal() {
        assert!(ErrorKind::UncaughtSignal("break").is_fatal());
        assert!(!ErrorKind::InvalidCall("number".into()).is_fatal());
    }
}
