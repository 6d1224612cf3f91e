//! Concurrent subquery dispatch.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use relate_proto::{ExecutorError, QueryContext, Row};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Error;
use crate::resource::NodeId;

use super::executor::QueryExecutor;

type Outcome = (NodeId, Result<Vec<Row>, ExecutorError>);

/// A set of subqueries that run together and resolve together.
///
/// Every query is spawned as its own task as soon as the batch runs. The
/// batch resolves once all of them have, or at the first failure. Tasks still
/// in flight after a failure are detached and their results dropped.
///
/// Must be run inside a tokio runtime.
pub struct SubqueryBatch {
    executor: Arc<dyn QueryExecutor>,
    pending: Vec<(NodeId, QueryContext)>,
    log_errors: bool,
}

impl SubqueryBatch {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            executor,
            pending: Vec::new(),
            log_errors: false,
        }
    }

    /// Log failed subqueries at `warn`.
    pub fn with_error_logging(mut self, enabled: bool) -> Self {
        self.log_errors = enabled;
        self
    }

    pub fn push(&mut self, node: NodeId, ctx: QueryContext) {
        self.pending.push((node, ctx));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Run every query and return the rows per node, in completion order.
    pub async fn run(mut self) -> Result<Vec<(NodeId, Vec<Row>)>, Error> {
        let total = self.pending.len();
        debug!(queries = total, "dispatching subquery batch");

        let mut tasks: FuturesUnordered<JoinHandle<Outcome>> = self
            .pending
            .drain(..)
            .map(|(node, ctx)| {
                let executor = Arc::clone(&self.executor);
                tokio::spawn(async move { (node, executor.execute_query(ctx).await) })
            })
            .collect();

        let mut resolved = Vec::with_capacity(total);
        while let Some(joined) = tasks.next().await {
            let failure = match joined {
                Ok((node, Ok(rows))) => {
                    debug!(node = %node, rows = rows.len(), "subquery resolved");
                    resolved.push((node, rows));
                    continue;
                }
                Ok((node, Err(e))) => {
                    if self.log_errors {
                        warn!(node = %node, error = %e, "subquery failed");
                    }
                    Error::Execution(e)
                }
                Err(e) => {
                    warn!(error = %e, "subquery task did not complete");
                    Error::Task(e.to_string())
                }
            };

            if !tasks.is_empty() {
                warn!(
                    in_flight = tasks.len(),
                    resolved = resolved.len(),
                    "discarding sibling subquery results"
                );
            }
            return Err(failure);
        }

        Ok(resolved)
    }
}
