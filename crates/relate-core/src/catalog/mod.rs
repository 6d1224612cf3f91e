//! Model catalog for tracked records.
//!
//! Models declare the columns and relation slots of a table. They are built
//! and renamed at setup time; configuration mistakes surface immediately as
//! [`ConfigError`]s instead of at query time.

mod error;
mod model;
mod relation;

pub use error::ConfigError;
pub use model::Model;
pub use relation::{RelationDef, RelationKind};
