//! Relate Core - Query orchestration and relation assembly.
//!
//! A [`ResourceTree`] describes a root table and the related tables to load
//! with it. [`QueryCompiler`] runs the root query, fans out one concurrent
//! subquery per selected relation and stitches the results into a graph of
//! shared records. The physical database sits behind [`QueryExecutor`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod query;
pub mod resource;
pub mod set;

pub use catalog::{ConfigError, Model, RelationDef, RelationKind};
pub use config::{CompilerConfig, ReferenceConflict};
pub use error::Error;
pub use query::{QueryCompiler, QueryExecutor, Stitcher, SubqueryBatch};
pub use resource::{NodeId, Resource, ResourceBuilder, ResourceTree, StandardBuilder};
pub use set::{
    RawRecord, RawRelation, Record, RecordRef, RecordSet, RelatedSet, RelationSlot, SetLayout,
    SlotValue, TrackedRecord,
};

/// Re-export contract types.
pub use relate_proto as proto;
