//! Resource plan nodes.
//!
//! A [`ResourceTree`] describes one find/update/delete/count invocation: the
//! root table and the related tables to load with it. Its shape is fixed once
//! built; only the query state of the nodes changes while preparing.

mod builder;

use std::fmt;
use std::sync::Arc;

use relate_proto::{Query, QueryMode};

use crate::catalog::{ConfigError, Model, RelationKind};
use crate::set::RecordSet;

pub use builder::{ResourceBuilder, StandardBuilder};

/// Preorder position of a node inside its tree. The root is `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One table's query and its position in the relation tree.
#[derive(Debug, Clone)]
pub struct Resource {
    id: NodeId,
    name: String,
    alias_name: Option<String>,
    loader_id: Option<String>,
    kind: RelationKind,
    primary_keys: Vec<String>,
    referenced_parent_column: Option<String>,
    selected: bool,
    model: Arc<Model>,
    builder: Arc<dyn ResourceBuilder>,
    query: Query,
    children: Vec<Resource>,
}

impl Resource {
    fn new(kind: RelationKind, name: impl Into<String>, model: Arc<Model>) -> Self {
        let name = name.into();
        Self {
            id: NodeId::default(),
            query: Query::new(name.clone()),
            primary_keys: model.primary_keys().to_vec(),
            name,
            alias_name: None,
            loader_id: None,
            kind,
            referenced_parent_column: None,
            selected: true,
            model,
            builder: Arc::new(StandardBuilder),
            children: Vec::new(),
        }
    }

    /// The tree root, named after its model.
    pub fn root(model: Arc<Model>) -> Self {
        let name = model.name().to_string();
        Self::new(RelationKind::Root, name, model)
    }

    /// A many-to-many child loaded into the parent's `loader_id` mapping.
    pub fn mapping(
        name: impl Into<String>,
        model: Arc<Model>,
        loader_id: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::Mapping, name, model).with_loader_id(loader_id)
    }

    /// A to-many child loaded into the parent's `loader_id` collection.
    pub fn belongs_to(
        name: impl Into<String>,
        model: Arc<Model>,
        loader_id: impl Into<String>,
    ) -> Self {
        Self::new(RelationKind::BelongsTo, name, model).with_loader_id(loader_id)
    }

    /// A to-one child stored in the parent's `alias` reference slot.
    pub fn reference(name: impl Into<String>, model: Arc<Model>, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        Self::new(RelationKind::Reference, name, model)
            .with_loader_id(alias.clone())
            .with_alias(alias)
    }

    /// Name the parent column this node's join keys refer to.
    pub fn referencing(mut self, column: impl Into<String>) -> Self {
        self.referenced_parent_column = Some(column.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias_name = Some(alias.into());
        self
    }

    pub fn with_loader_id(mut self, loader_id: impl Into<String>) -> Self {
        self.loader_id = Some(loader_id.into());
        self
    }

    /// Whether this node's rows are loaded at all.
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_builder(mut self, builder: Arc<dyn ResourceBuilder>) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn with_child(mut self, child: Resource) -> Self {
        self.children.push(child);
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias_name.as_deref()
    }

    /// Name used for raw-mode properties: the alias, else the name.
    pub fn accessor_name(&self) -> &str {
        self.alias_name.as_deref().unwrap_or(&self.name)
    }

    /// Relation slot on the parent this node loads into.
    pub fn loader_id(&self) -> &str {
        self.loader_id.as_deref().unwrap_or(&self.name)
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn referenced_parent_column(&self) -> Option<&str> {
        self.referenced_parent_column.as_deref()
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn builder(&self) -> &Arc<dyn ResourceBuilder> {
        &self.builder
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Query {
        &mut self.query
    }

    pub fn query_mode(&self) -> QueryMode {
        self.query.mode
    }

    pub fn children(&self) -> &[Resource] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn set_select_mode(&mut self) {
        self.query.mode = QueryMode::Select;
    }

    pub fn set_delete_mode(&mut self) {
        self.query.mode = QueryMode::Delete;
    }

    pub fn set_update_mode(&mut self) {
        self.query.mode = QueryMode::Update;
    }

    pub fn set_counting_flag(&mut self) {
        self.query.counting = true;
    }

    /// Let the builder finalize this node's query.
    pub fn prepare(&mut self, force: bool) {
        let builder = Arc::clone(&self.builder);
        let mut query = self.query.clone();
        builder.prepare(self, &mut query, force);
        self.query = query;
    }

    /// Let the builder shape this node's query for counting.
    pub fn prepare_counting(&mut self, column: Option<&str>) {
        let builder = Arc::clone(&self.builder);
        let mut query = self.query.clone();
        builder.prepare_counting(self, &mut query, column);
        self.query = query;
    }

    /// Filter a descendant's query by this (root) node's results.
    pub fn apply_filter(&self, root_set: &RecordSet, target: &Resource, query: &mut Query) {
        self.builder.apply_filter(self, root_set, target, query);
    }

    /// Group a child's query by its link to this node.
    pub fn apply_group(&self, target: &Resource, query: &mut Query) {
        self.builder.apply_group(self, target, query);
    }

    fn find(&self, id: NodeId) -> Option<&Resource> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    fn assign_ids(&mut self, next: &mut usize) {
        self.id = NodeId(*next);
        *next += 1;
        for child in &mut self.children {
            child.assign_ids(next);
        }
    }

    fn validate(&self, is_root: bool) -> Result<(), ConfigError> {
        if self.primary_keys.is_empty() {
            return Err(ConfigError::MissingPrimaryKey {
                resource: self.name.clone(),
            });
        }
        if !is_root && self.referenced_parent_column.is_none() {
            return Err(ConfigError::MissingParentColumn {
                resource: self.name.clone(),
            });
        }
        self.children.iter().try_for_each(|child| child.validate(false))
    }
}

/// A validated resource tree plus the flags every node inherits from the root.
#[derive(Debug, Clone)]
pub struct ResourceTree {
    root: Resource,
    raw: bool,
    pool: Option<String>,
    debug: bool,
    wait: bool,
    node_count: usize,
}

impl ResourceTree {
    /// Validate the tree and number its nodes in preorder.
    pub fn new(mut root: Resource) -> Result<Self, ConfigError> {
        root.validate(true)?;

        let mut node_count = 0;
        root.assign_ids(&mut node_count);

        Ok(Self {
            root,
            raw: false,
            pool: None,
            debug: false,
            wait: false,
            node_count,
        })
    }

    /// Return plain deduplicated rows instead of tracked records.
    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Route every query of the tree to a named pool.
    pub fn with_pool(mut self, pool: impl Into<String>) -> Self {
        self.pool = Some(pool.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    pub fn root(&self) -> &Resource {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Resource {
        &mut self.root
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn pool(&self) -> Option<&str> {
        self.pool.as_deref()
    }

    pub fn is_in_debug_mode(&self) -> bool {
        self.debug
    }

    pub fn wait(&self) -> bool {
        self.wait
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn node(&self, id: NodeId) -> Option<&Resource> {
        self.root.find(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RelationDef;

    fn models() -> (Arc<Model>, Arc<Model>, Arc<Model>) {
        let event = Arc::new(
            Model::new("event", ["id"])
                .with_relation(RelationDef::mapping("event_venue", "event_venue"))
                .unwrap(),
        );
        let event_venue = Arc::new(
            Model::new("event_venue", ["id_event", "id_venue"])
                .as_mapping_table()
                .with_relation(RelationDef::belongs_to("venue", "venue"))
                .unwrap(),
        );
        let venue = Arc::new(Model::new("venue", ["id"]));
        (event, event_venue, venue)
    }

    #[test]
    fn test_tree_numbering_is_preorder() {
        let (event, event_venue, venue) = models();
        let root = Resource::root(event)
            .with_child(
                Resource::mapping("event_venue", event_venue, "event_venue")
                    .referencing("id")
                    .with_child(
                        Resource::belongs_to("venue", venue.clone(), "venue")
                            .referencing("id_venue"),
                    ),
            )
            .with_child(Resource::reference("image", venue, "image").referencing("id_image"));
        let tree = ResourceTree::new(root).unwrap();

        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.root().id(), NodeId::ROOT);
        assert_eq!(tree.node(NodeId(1)).unwrap().name(), "event_venue");
        assert_eq!(tree.node(NodeId(2)).unwrap().name(), "venue");
        assert_eq!(tree.node(NodeId(3)).unwrap().name(), "image");
        assert!(tree.node(NodeId(4)).is_none());
    }

    #[test]
    fn test_child_without_parent_column_is_rejected() {
        let (event, event_venue, _) = models();
        let root = Resource::root(event)
            .with_child(Resource::mapping("event_venue", event_venue, "event_venue"));

        let err = ResourceTree::new(root).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParentColumn { .. }));
    }

    #[test]
    fn test_resource_without_keys_is_rejected() {
        let keyless = Arc::new(Model::new("log", Vec::<String>::new()));
        let err = ResourceTree::new(Resource::root(keyless)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn test_mode_flags() {
        let (event, _, _) = models();
        let mut root = Resource::root(event);

        root.set_delete_mode();
        assert_eq!(root.query_mode(), QueryMode::Delete);
        root.set_update_mode();
        assert_eq!(root.query_mode(), QueryMode::Update);
        root.set_select_mode();
        root.set_counting_flag();
        assert_eq!(root.query_mode(), QueryMode::Select);
        assert!(root.query().counting);
    }

    #[test]
    fn test_names() {
        let (_, _, venue) = models();
        let reference = Resource::reference("venue", venue.clone(), "mainVenue");
        assert_eq!(reference.accessor_name(), "mainVenue");
        assert_eq!(reference.loader_id(), "mainVenue");

        let plain = Resource::belongs_to("venue", venue, "venues");
        assert_eq!(plain.accessor_name(), "venue");
        assert_eq!(plain.loader_id(), "venues");
    }

    #[test]
    fn test_tree_flags() {
        let (event, _, _) = models();
        let tree = ResourceTree::new(Resource::root(event))
            .unwrap()
            .with_raw(true)
            .with_pool("reporting")
            .with_debug(true)
            .with_wait(true);

        assert!(tree.is_raw());
        assert_eq!(tree.pool(), Some("reporting"));
        assert!(tree.is_in_debug_mode());
        assert!(tree.wait());
    }
}
