//! Query-shaping hooks supplied by the dialect layer.

use std::fmt;

use relate_proto::{FilterExpr, Query, Value};

use crate::set::RecordSet;

use super::Resource;

/// Shapes the queries of a resource.
///
/// Implementations own everything dialect specific: which columns are
/// selected, how a subquery is joined back to the root and how its rows are
/// grouped. The compiler only decides when each hook runs.
pub trait ResourceBuilder: Send + Sync + fmt::Debug {
    /// Finalize filters, ordering and selected columns of `resource`.
    ///
    /// `force` is set for delete, update and count queries, which skip
    /// selection concerns.
    fn prepare(&self, resource: &Resource, query: &mut Query, force: bool);

    /// Turn a prepared query into a counting query.
    fn prepare_counting(&self, resource: &Resource, query: &mut Query, column: Option<&str>);

    /// Restrict `target`'s subquery to rows related to the root results.
    ///
    /// Called on the tree root for every selected descendant.
    fn apply_filter(
        &self,
        root: &Resource,
        root_set: &RecordSet,
        target: &Resource,
        query: &mut Query,
    );

    /// Group `target`'s subquery by its link to `parent`.
    ///
    /// Called on the immediate parent of every selected descendant.
    fn apply_group(&self, parent: &Resource, target: &Resource, query: &mut Query);
}

/// Dialect-neutral builder producing plain [`Query`] shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardBuilder;

impl ResourceBuilder for StandardBuilder {
    fn prepare(&self, resource: &Resource, query: &mut Query, force: bool) {
        if force || query.select.is_empty() {
            return;
        }

        // Stitching needs the identity and every column children join on.
        let required = resource
            .primary_keys()
            .iter()
            .map(String::as_str)
            .chain(
                resource
                    .children()
                    .iter()
                    .filter_map(Resource::referenced_parent_column),
            );

        for column in required {
            if !query.select.iter().any(|c| c == column) {
                query.select.push(column.to_string());
            }
        }
    }

    fn prepare_counting(&self, _resource: &Resource, query: &mut Query, column: Option<&str>) {
        query.counting = true;
        query.count_column = column.map(str::to_string);
        query.select.clear();
        query.order.clear();
    }

    fn apply_filter(
        &self,
        root: &Resource,
        root_set: &RecordSet,
        _target: &Resource,
        query: &mut Query,
    ) {
        for key in root.primary_keys() {
            let mut values: Vec<Value> = Vec::with_capacity(root_set.len());
            for record in root_set {
                if let Some(value) = record.get(key) {
                    if !value.is_null() && !values.contains(&value) {
                        values.push(value);
                    }
                }
            }

            query
                .filters
                .push(FilterExpr::in_values(format!("{}.{}", root.name(), key), values));
        }
    }

    fn apply_group(&self, _parent: &Resource, target: &Resource, query: &mut Query) {
        for key in target.primary_keys() {
            if !query.group.contains(key) {
                query.group.push(key.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::catalog::{Model, RelationDef};
    use crate::resource::ResourceTree;
    use crate::set::SetLayout;
    use relate_proto::Row;

    fn tree() -> ResourceTree {
        let event = Arc::new(
            Model::new("event", ["id"])
                .with_column("title")
                .with_relation(RelationDef::mapping("venue", "venue"))
                .unwrap(),
        );
        let event_venue = Arc::new(Model::new("event_venue", ["id_event", "id_venue"]));

        let root = Resource::root(event).with_query(Query::new("event").select("title"));
        let mapping = Resource::mapping("event_venue", event_venue, "venue").referencing("id");

        ResourceTree::new(root.with_child(mapping)).unwrap()
    }

    #[test]
    fn test_prepare_adds_required_columns() {
        let tree = tree();
        let root = tree.root();
        let mut query = root.query().clone();

        StandardBuilder.prepare(root, &mut query, false);
        assert_eq!(query.select, vec!["title".to_string(), "id".to_string()]);
    }

    #[test]
    fn test_forced_prepare_skips_selection() {
        let tree = tree();
        let root = tree.root();
        let mut query = root.query().clone();

        StandardBuilder.prepare(root, &mut query, true);
        assert_eq!(query.select, vec!["title".to_string()]);
    }

    #[test]
    fn test_counting_shape() {
        let tree = tree();
        let root = tree.root();
        let mut query = root.query().clone();

        StandardBuilder.prepare_counting(root, &mut query, Some("id"));
        assert!(query.counting);
        assert_eq!(query.count_column.as_deref(), Some("id"));
        assert!(query.select.is_empty());
    }

    #[test]
    fn test_filter_uses_root_identifiers() {
        let tree = tree();
        let root = tree.root();
        let child = &root.children()[0];
        let root_set = crate::set::RecordSet::from_rows(
            vec![
                Row::new().with("id", 1),
                Row::new().with("id", 2),
                Row::new().with("id", 1),
            ],
            &SetLayout::raw("event", vec!["id".to_string()]),
        );
        let mut query = child.query().clone();

        StandardBuilder.apply_filter(root, &root_set, child, &mut query);
        assert_eq!(
            query.filters,
            vec![FilterExpr::in_values(
                "event.id",
                vec![Value::Int32(1), Value::Int32(2)]
            )]
        );
    }

    #[test]
    fn test_group_by_target_keys() {
        let tree = tree();
        let root = tree.root();
        let child = &root.children()[0];
        let mut query = child.query().clone();

        StandardBuilder.apply_group(root, child, &mut query);
        StandardBuilder.apply_group(root, child, &mut query);
        assert_eq!(
            query.group,
            vec!["id_event".to_string(), "id_venue".to_string()]
        );
    }
}
