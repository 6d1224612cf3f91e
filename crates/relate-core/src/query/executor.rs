//! The physical query seam.

use async_trait::async_trait;
use relate_proto::{ExecutorError, QueryContext, Row};

/// Runs one compiled query against a database.
///
/// Implementations own connections, pools and SQL rendering. The compiler
/// only hands over a [`QueryContext`] and expects the rows back.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute the query and return its rows, in backend order.
    async fn execute_query(&self, ctx: QueryContext) -> Result<Vec<Row>, ExecutorError>;
}
