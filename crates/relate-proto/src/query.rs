//! Compiled query description handed to executors.
//!
//! A [`Query`] is dialect neutral: resource builders shape it, executors
//! translate it. Relate itself only touches the mode, limit and counting
//! fields.

use std::fmt;

use serde::Serialize;

use crate::value::Value;

/// What a query does when it reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Plain selection of the resource's rows.
    Select,
    /// A fully built statement for a dependent subquery.
    Query,
    /// Update of the matched rows.
    Update,
    /// Deletion of the matched rows.
    Delete,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Select => "select",
            QueryMode::Query => "query",
            QueryMode::Update => "update",
            QueryMode::Delete => "delete",
        }
    }

    /// Whether the mode only reads data.
    pub fn is_select(&self) -> bool {
        matches!(self, QueryMode::Select)
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter condition on one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FilterExpr {
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field is in a set of values.
    In { field: String, values: Vec<Value> },
}

impl FilterExpr {
    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an IN filter.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        FilterExpr::In {
            field: field.into(),
            values,
        }
    }

    /// The column this filter constrains.
    pub fn field(&self) -> &str {
        match self {
            FilterExpr::Eq { field, .. } | FilterExpr::In { field, .. } => field,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Ordering on one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSpec {
    pub field: String,
    pub direction: OrderDirection,
}

impl OrderSpec {
    /// Ascending order on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending order on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// A compiled query for one resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    /// Execution mode, set right before the query is issued.
    pub mode: QueryMode,
    /// Table the query targets.
    pub table: String,
    /// Selected columns (empty = all).
    pub select: Vec<String>,
    /// Conjunction of filters.
    pub filters: Vec<FilterExpr>,
    /// Ordering.
    pub order: Vec<OrderSpec>,
    /// Grouping columns.
    pub group: Vec<String>,
    /// Assignments for update queries.
    pub values: Vec<(String, Value)>,
    /// Maximum number of rows.
    pub limit: Option<u64>,
    /// The query returns a single `COUNT` row.
    pub counting: bool,
    /// Column counted with `COUNT(DISTINCT ..)`, if any.
    pub count_column: Option<String>,
}

impl Query {
    /// Create a selection query on a table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            mode: QueryMode::Select,
            table: table.into(),
            select: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            group: Vec::new(),
            values: Vec::new(),
            limit: None,
            counting: false,
            count_column: None,
        }
    }

    /// Add a selected column.
    pub fn select(mut self, column: impl Into<String>) -> Self {
        self.select.push(column.into());
        self
    }

    /// Add a filter.
    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add an ordering.
    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order.push(order);
        self
    }

    /// Set the row limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add an update assignment.
    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = Query::new("event")
            .select("id")
            .with_filter(FilterExpr::eq("id", 1))
            .with_order(OrderSpec::desc("id"))
            .with_limit(10);

        assert_eq!(query.mode, QueryMode::Select);
        assert_eq!(query.select, vec!["id".to_string()]);
        assert_eq!(query.filters[0].field(), "id");
        assert_eq!(query.limit, Some(10));
        assert!(!query.counting);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(QueryMode::Select.to_string(), "select");
        assert_eq!(QueryMode::Query.to_string(), "query");
        assert!(QueryMode::Select.is_select());
        assert!(!QueryMode::Delete.is_select());
    }
}
