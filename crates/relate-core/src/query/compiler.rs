//! Query orchestration for one resource tree.
//!
//! A find runs in two rounds. The root query runs first. If it returns rows,
//! every selected descendant is queried concurrently, filtered by the root
//! results and grouped by its parent. The resolved sets are then stitched
//! onto the root records.

use std::sync::Arc;

use relate_proto::{Pool, Query, QueryContext, QueryMode, Row};
use tracing::{debug, info, warn};

use crate::config::CompilerConfig;
use crate::error::Error;
use crate::resource::{Resource, ResourceTree};
use crate::set::{RecordRef, RecordSet, SetLayout};

use super::batch::SubqueryBatch;
use super::executor::QueryExecutor;
use super::stitch::Stitcher;

/// Compiles and runs the queries of a [`ResourceTree`].
pub struct QueryCompiler {
    tree: ResourceTree,
    database: Arc<dyn QueryExecutor>,
    transaction: Option<Arc<dyn QueryExecutor>>,
    config: CompilerConfig,
}

impl QueryCompiler {
    /// Create a compiler running on `database`.
    pub fn new(
        tree: ResourceTree,
        database: Arc<dyn QueryExecutor>,
        config: CompilerConfig,
    ) -> Self {
        Self {
            tree,
            database,
            transaction: None,
            config,
        }
    }

    /// Run every query of this compiler inside a transaction.
    ///
    /// The transaction replaces pool routing; contexts still carry the pool
    /// the query would have used.
    pub fn with_transaction(mut self, transaction: Arc<dyn QueryExecutor>) -> Self {
        self.transaction = Some(transaction);
        self
    }

    pub fn tree(&self) -> &ResourceTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ResourceTree {
        &mut self.tree
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Load the root records with every selected relation attached.
    pub async fn find(&mut self) -> Result<RecordSet, Error> {
        let root = self.tree.root_mut();
        root.set_select_mode();
        root.prepare(false);

        let root = self.tree.root();
        let rows = self.execute(root, root.query().clone()).await?;
        let root_set = self.make_set(root, rows);

        if root_set.is_empty() {
            debug!(table = root.name(), "root query returned no rows, skipping subqueries");
            return Ok(root_set);
        }

        let mut batch =
            SubqueryBatch::new(self.executor()).with_error_logging(self.config.log_errors);
        self.collect_queries(root, root, &root_set, &mut batch);
        if batch.is_empty() {
            return Ok(root_set);
        }

        let resolved = batch.run().await?;

        let mut sets: Vec<Option<RecordSet>> =
            (0..self.tree.node_count()).map(|_| None).collect();
        for (id, rows) in resolved {
            if let Some(node) = self.tree.node(id) {
                sets[id.index()] = Some(self.make_set(node, rows));
            }
        }

        Stitcher::new(self.tree.is_raw(), self.config.reference_conflict)
            .stitch(root, &root_set, &mut sets)?;

        Ok(root_set)
    }

    /// Load the first root record, if any.
    pub async fn find_one(&mut self) -> Result<Option<RecordRef>, Error> {
        self.tree.root_mut().query_mut().limit = Some(1);
        let set = self.find().await?;
        Ok(set.first().cloned())
    }

    /// Delete the rows matched by the root query.
    pub async fn delete(&mut self) -> Result<Vec<Row>, Error> {
        let root = self.tree.root_mut();
        root.set_delete_mode();
        root.prepare(true);
        self.execute_root().await
    }

    /// Update the rows matched by the root query with its values.
    pub async fn update(&mut self) -> Result<Vec<Row>, Error> {
        let root = self.tree.root_mut();
        root.set_update_mode();
        root.prepare(true);
        self.execute_root().await
    }

    /// Count the rows matched by the root query.
    ///
    /// An empty result counts as zero.
    pub async fn count(&mut self, column: Option<&str>) -> Result<u64, Error> {
        let root = self.tree.root_mut();
        root.set_select_mode();
        root.set_counting_flag();
        root.prepare(true);
        root.prepare_counting(column);

        let rows = self.execute_root().await?;
        let Some(first) = rows.first() else {
            return Ok(0);
        };

        let column = &self.config.count_column;
        first
            .get(column)
            .ok_or_else(|| relate_proto::Error::MissingColumn(column.clone()))
            .and_then(|value| value.to_count())
            .map_err(|source| Error::InvalidCount {
                column: column.clone(),
                source,
            })
    }

    /// Compile the root query without executing it.
    pub fn prepare(&mut self) -> &Query {
        self.tree.root_mut().prepare(true);
        self.tree.root().query()
    }

    fn executor(&self) -> Arc<dyn QueryExecutor> {
        match &self.transaction {
            Some(transaction) => Arc::clone(transaction),
            None => Arc::clone(&self.database),
        }
    }

    fn is_debug(&self) -> bool {
        self.config.debug || self.tree.is_in_debug_mode()
    }

    async fn execute_root(&self) -> Result<Vec<Row>, Error> {
        let root = self.tree.root();
        self.execute(root, root.query().clone()).await
    }

    async fn execute(&self, node: &Resource, query: Query) -> Result<Vec<Row>, Error> {
        let ctx = self.context(node, query);
        match self.executor().execute_query(ctx).await {
            Ok(rows) => Ok(rows),
            Err(e) => {
                if self.config.log_errors {
                    warn!(table = node.name(), error = %e, "query failed");
                }
                Err(Error::Execution(e))
            }
        }
    }

    fn context(&self, node: &Resource, query: Query) -> QueryContext {
        let pool = Pool::select(self.tree.pool(), query.mode);
        let debug = self.is_debug();

        debug!(
            node = %node.id(),
            table = node.name(),
            mode = %query.mode,
            pool = %pool,
            "executing query"
        );
        if debug {
            info!(table = node.name(), query = ?query, "compiled query");
        }

        QueryContext::new(query, pool)
            .with_debug(debug)
            .with_wait(self.tree.wait())
    }

    /// Queue a query for every selected node below `parent`.
    ///
    /// Unselected nodes are not queried, but their descendants still are.
    fn collect_queries(
        &self,
        root: &Resource,
        parent: &Resource,
        root_set: &RecordSet,
        batch: &mut SubqueryBatch,
    ) {
        for child in parent.children() {
            if child.is_selected() {
                let mut query = child.query().clone();
                root.apply_filter(root_set, child, &mut query);
                parent.apply_group(child, &mut query);
                query.mode = QueryMode::Query;
                batch.push(child.id(), self.context(child, query));
            }
            self.collect_queries(root, child, root_set, batch);
        }
    }

    fn make_set(&self, node: &Resource, rows: Vec<Row>) -> RecordSet {
        let layout = if self.tree.is_raw() {
            SetLayout::raw(node.name(), node.primary_keys().to_vec())
        } else {
            SetLayout::tracked(Arc::clone(node.model()))
        };

        let layout = node
            .children()
            .iter()
            .filter_map(Resource::referenced_parent_column)
            .fold(
                layout.with_join_marker(self.config.join_marker_column.as_str()),
                |layout, column| layout.with_index(column),
            );

        RecordSet::from_rows(rows, &layout)
    }
}

impl std::fmt::Debug for QueryCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCompiler")
            .field("tree", &self.tree)
            .field("transaction", &self.transaction.is_some())
            .field("config", &self.config)
            .finish()
    }
}
