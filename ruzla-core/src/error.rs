//! Error Types for the Ruzla Solver.
//!
//! Construction failures (`Type`), precondition violations (`Usage`) and
//! input-format violations (`Parse`) are reported synchronously at the call
//! site and never mutate visible state. `Internal` signals an invariant
//! violation; the solving context routes it through an abort hook.
//! Resource exhaustion is never an error: it is absorbed into an `Unknown`
//! result by the solver loops.

use thiserror::Error;

/// Error kind raised by the term manager, the rewriter and the solver facade.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Term construction with mismatched sorts, wrong arity or invalid indices.
    #[error("type error: {0}")]
    Type(String),
    /// API called in a state where its precondition does not hold.
    #[error("usage error: {0}")]
    Usage(String),
    /// Input-format violation.
    #[error("parse error: {0}")]
    Parse(String),
    /// Invariant violation; the implementation must abort with a diagnostic.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Helper to create a type error.
pub fn type_error(msg: impl Into<String>) -> Error {
    Error::Type(msg.into())
}

/// Helper to create a usage error.
pub fn usage_error(msg: impl Into<String>) -> Error {
    Error::Usage(msg.into())
}

/// Helper to create an internal error.
pub fn internal_error(msg: impl Into<String>) -> Error {
    Error::Internal(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = type_error("expected BV sort");
        assert_eq!(err.to_string(), "type error: expected BV sort");
    }

    #[test]
    fn test_kinds_distinct() {
        assert_ne!(type_error("x"), usage_error("x"));
    }
}
