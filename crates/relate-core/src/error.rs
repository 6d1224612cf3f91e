//! Core error types.

use relate_proto::ExecutorError;
use thiserror::Error;

use crate::catalog::ConfigError;

/// Errors surfaced by query operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The physical executor failed. Never retried; aborts the whole call.
    #[error("execution error: {0}")]
    Execution(#[from] ExecutorError),

    /// The count column of a count query was missing or not an integer.
    #[error("invalid count in column '{column}': {source}")]
    InvalidCount {
        column: String,
        #[source]
        source: relate_proto::Error,
    },

    /// Invalid model or resource setup.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A resource points at a relation slot its parent model does not have.
    #[error("model '{model}' has no {kind} relation '{relation}'")]
    UnknownRelation {
        model: String,
        kind: &'static str,
        relation: String,
    },

    /// A to-one reference matched more than one distinct record.
    #[error("reference '{relation}' on '{model}' matched both {existing} and {incoming}")]
    ReferenceConflict {
        model: String,
        relation: String,
        existing: String,
        incoming: String,
    },

    /// A subquery task panicked or was cancelled by the runtime.
    #[error("subquery task failed: {0}")]
    Task(String),
}
