//! Contract error types.

use thiserror::Error;

/// Value and row conversion errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A value had an unexpected type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: String,
    },

    /// A required column was absent from a row.
    #[error("missing column: {0}")]
    MissingColumn(String),
}

/// Failures reported by a physical query executor.
///
/// Relate never retries or recovers these; they reach the caller unchanged.
#[derive(Debug, Clone, Error)]
pub enum ExecutorError {
    /// Connection could not be obtained or was lost.
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend rejected the statement because of a constraint.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The backend could not parse or plan the statement.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}
