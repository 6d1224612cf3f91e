//! Relate contract types.
//!
//! This crate defines what Relate exchanges with the physical query executor:
//! runtime values, result rows, dialect-neutral compiled queries and the
//! per-query execution context.
//!
//! # Modules
//!
//! - [`value`] - Runtime value types returned by the backend
//! - [`key`] - Hashable keys for indexing and deduplicating rows
//! - [`row`] - Flat result rows
//! - [`query`] - Compiled query descriptions
//! - [`context`] - Pool routing and per-query execution requests
//! - [`error`] - Conversion and executor error types

pub mod context;
pub mod error;
pub mod key;
pub mod query;
pub mod row;
pub mod value;

pub use context::{Pool, QueryContext};
pub use error::{Error, ExecutorError};
pub use key::{KeyValue, RowIdentity};
pub use query::{FilterExpr, OrderDirection, OrderSpec, Query, QueryMode};
pub use row::Row;
pub use value::Value;
