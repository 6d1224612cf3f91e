//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use relate_core::catalog::{Model, RelationDef};
use relate_core::proto::{ExecutorError, QueryContext, QueryMode, Row};
use relate_core::{QueryExecutor, Resource, ResourceTree};
use tokio::sync::Barrier;

/// Route engine logs to the test writer; `RUST_LOG=relate_core=debug` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory executor answering by table name and recording every context.
#[derive(Default)]
pub struct MockExecutor {
    responses: HashMap<String, Vec<Row>>,
    failures: HashMap<String, ExecutorError>,
    barrier: Option<Arc<Barrier>>,
    contexts: Mutex<Vec<QueryContext>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, table: &str, rows: Vec<Row>) -> Self {
        self.responses.insert(table.to_string(), rows);
        self
    }

    pub fn fail(mut self, table: &str, error: ExecutorError) -> Self {
        self.failures.insert(table.to_string(), error);
        self
    }

    /// Make every subquery wait until `parties` of them are in flight.
    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    pub fn contexts(&self) -> Vec<QueryContext> {
        self.contexts.lock().clone()
    }

    pub fn query_count(&self) -> usize {
        self.contexts.lock().len()
    }

    pub fn context_for(&self, table: &str) -> Option<QueryContext> {
        self.contexts
            .lock()
            .iter()
            .find(|ctx| ctx.query.table == table)
            .cloned()
    }
}

#[async_trait]
impl QueryExecutor for MockExecutor {
    async fn execute_query(&self, ctx: QueryContext) -> Result<Vec<Row>, ExecutorError> {
        let table = ctx.query.table.clone();
        let is_subquery = ctx.mode() == QueryMode::Query;
        self.contexts.lock().push(ctx);

        if is_subquery {
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
        }

        if let Some(error) = self.failures.get(&table) {
            return Err(error.clone());
        }
        Ok(self.responses.get(&table).cloned().unwrap_or_default())
    }
}

/// Models of the event schema used across tests.
pub struct Schema {
    pub event: Arc<Model>,
    pub event_venue: Arc<Model>,
    pub venue: Arc<Model>,
    pub image: Arc<Model>,
    pub ticket: Arc<Model>,
}

impl Schema {
    pub fn new() -> Self {
        init_tracing();

        let event = Model::new("event", ["id"])
            .with_column("title")
            .with_column("id_image")
            .with_relation(RelationDef::mapping("event_venue", "event_venue"))
            .unwrap()
            .with_relation(RelationDef::belongs_to("ticket", "ticket"))
            .unwrap()
            .with_relation(RelationDef::reference("id_image", "image").with_accessor("image"))
            .unwrap();
        let event_venue = Model::new("event_venue", ["id_event", "id_venue"])
            .as_mapping_table()
            .with_relation(RelationDef::belongs_to("venue", "venue"))
            .unwrap();
        let venue = Model::new("venue", ["id"]).with_column("name");
        let image = Model::new("image", ["id"]).with_column("url");
        let ticket = Model::new("ticket", ["id"]).with_column("id_event");

        Self {
            event: Arc::new(event),
            event_venue: Arc::new(event_venue),
            venue: Arc::new(venue),
            image: Arc::new(image),
            ticket: Arc::new(ticket),
        }
    }

    /// event -> event_venue (mapping) -> venue (belongs to).
    pub fn event_venue_tree(&self) -> ResourceTree {
        let venue = Resource::belongs_to("venue", Arc::clone(&self.venue), "venue")
            .referencing("id_venue");
        let mapping =
            Resource::mapping("event_venue", Arc::clone(&self.event_venue), "event_venue")
                .referencing("id")
                .with_child(venue);

        ResourceTree::new(Resource::root(Arc::clone(&self.event)).with_child(mapping)).unwrap()
    }

    /// event with a ticket collection and an image reference.
    pub fn ticket_image_tree(&self) -> ResourceTree {
        let root = Resource::root(Arc::clone(&self.event))
            .with_child(
                Resource::belongs_to("ticket", Arc::clone(&self.ticket), "ticket")
                    .referencing("id"),
            )
            .with_child(
                Resource::reference("image", Arc::clone(&self.image), "image")
                    .referencing("id_image"),
            );

        ResourceTree::new(root).unwrap()
    }
}

pub fn events() -> Vec<Row> {
    vec![
        Row::new().with("id", 1).with("title", "Opening").with("id_image", 4),
        Row::new().with("id", 2).with("title", "Closing").with("id_image", 4),
    ]
}
