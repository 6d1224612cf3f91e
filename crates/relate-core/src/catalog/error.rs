//! Configuration errors raised while setting up models and resources.

use thiserror::Error;

/// Programmer errors detected at setup time, before any query runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The accessor name is already used by a column or another relation.
    #[error("the accessor '{accessor}' on the model '{model}' is already in use")]
    AccessorInUse { accessor: String, model: String },

    /// No mapping with this name exists on the model.
    #[error("the mapping '{mapping}' does not exist on the model '{model}'")]
    UnknownMapping { mapping: String, model: String },

    /// No reference with this name exists on the model.
    #[error("the reference '{reference}' does not exist on the model '{model}'")]
    UnknownReference { reference: String, model: String },

    /// A relation was declared twice.
    #[error("the relation '{relation}' is declared twice on the model '{model}'")]
    DuplicateRelation { relation: String, model: String },

    /// A resource has no primary key columns.
    #[error("resource '{resource}' declares no primary keys")]
    MissingPrimaryKey { resource: String },

    /// A non-root resource does not name the parent column it joins on.
    #[error("resource '{resource}' does not name a referenced parent column")]
    MissingParentColumn { resource: String },
}
