//! Flat result rows.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::key::{KeyValue, RowIdentity};
use crate::value::Value;

/// One row returned by the backend, as an ordered list of named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Builder-style column insertion.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column, replacing any existing value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();

        match self.fields.iter_mut().find(|(n, _)| *n == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Get a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n == column)
            .map(|(_, v)| v)
    }

    /// Remove a column and return its value.
    pub fn take(&mut self, column: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(n, _)| n == column)?;
        Some(self.fields.remove(pos).1)
    }

    /// Check whether the row has the column.
    pub fn contains(&self, column: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == column)
    }

    /// Hashable key for a column; missing columns read as null.
    pub fn key(&self, column: &str) -> KeyValue {
        self.get(column)
            .and_then(Value::to_key)
            .unwrap_or(KeyValue::Null)
    }

    /// Identity of this row built from the given key columns, in order.
    pub fn identity(&self, primary_keys: &[String]) -> RowIdentity {
        RowIdentity(primary_keys.iter().map(|k| self.key(k)).collect())
    }

    /// Iterate over columns in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_replaces_in_place() {
        let mut row = Row::new().with("id", 1).with("name", "a");
        row.set("id", 2);

        assert_eq!(row.len(), 2);
        assert_eq!(row.get("id"), Some(&Value::Int32(2)));
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[test]
    fn test_take_removes_column() {
        let mut row = Row::new().with("id", 1).with("____id____", 9);

        assert_eq!(row.take("____id____"), Some(Value::Int32(9)));
        assert!(!row.contains("____id____"));
        assert_eq!(row.take("____id____"), None);
    }

    #[test]
    fn test_identity_uses_key_order() {
        let row = Row::new().with("b", "x").with("a", 1);
        let identity = row.identity(&["a".to_string(), "b".to_string()]);

        assert_eq!(identity.to_string(), "1|x");
    }

    #[test]
    fn test_missing_column_keys_as_null() {
        let row = Row::new();
        assert_eq!(row.key("id"), KeyValue::Null);
    }

    #[test]
    fn test_row_serializes_as_object() {
        let row: Row = vec![("id", Value::Int64(1)), ("title", Value::from("Gig"))]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json, serde_json::json!({"id": 1, "title": "Gig"}));
    }
}
