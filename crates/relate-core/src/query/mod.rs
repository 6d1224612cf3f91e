//! Query compilation, execution and relation assembly.

mod batch;
mod compiler;
mod executor;
mod stitch;

pub use batch::SubqueryBatch;
pub use compiler::QueryCompiler;
pub use executor::QueryExecutor;
pub use stitch::Stitcher;
