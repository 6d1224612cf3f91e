//! Ordered record sets with column indexes and a join-key side-channel.

use std::collections::HashMap;
use std::sync::Arc;

use relate_proto::{KeyValue, Row, RowIdentity};
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::catalog::Model;

use super::record::{RawRecord, Record, RecordRef, TrackedRecord};

/// How rows of one physical query become records.
#[derive(Debug, Clone)]
pub struct SetLayout {
    /// Resource name, for diagnostics.
    pub name: String,
    /// Primary key columns, in declared order.
    pub primary_keys: Vec<String>,
    /// Columns to index for child lookups.
    pub indexed_columns: Vec<String>,
    /// Synthetic column carrying join keys; removed from every row.
    pub join_marker: String,
    /// Model for tracked records; `None` produces raw, deduplicated records.
    pub model: Option<Arc<Model>>,
}

impl SetLayout {
    /// Layout for raw output.
    pub fn raw(name: impl Into<String>, primary_keys: Vec<String>) -> Self {
        Self {
            name: name.into(),
            primary_keys,
            indexed_columns: Vec::new(),
            join_marker: crate::config::DEFAULT_JOIN_MARKER.to_string(),
            model: None,
        }
    }

    /// Layout for tracked output.
    pub fn tracked(model: Arc<Model>) -> Self {
        Self {
            name: model.name().to_string(),
            primary_keys: model.primary_keys().to_vec(),
            indexed_columns: Vec::new(),
            join_marker: crate::config::DEFAULT_JOIN_MARKER.to_string(),
            model: Some(model),
        }
    }

    /// Index an additional column.
    pub fn with_index(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if !self.indexed_columns.contains(&column) {
            self.indexed_columns.push(column);
        }
        self
    }

    /// Use a different join marker column.
    pub fn with_join_marker(mut self, column: impl Into<String>) -> Self {
        self.join_marker = column.into();
        self
    }

    pub fn is_raw(&self) -> bool {
        self.model.is_none()
    }
}

type ColumnIndex = HashMap<KeyValue, Vec<usize>>;

/// The records of one resource, in insertion order.
///
/// Indexes are maintained on every push and only read afterwards, so a set
/// that is being stitched is never written concurrently. Join keys live in a
/// parallel side-channel instead of on the records.
#[derive(Debug)]
pub struct RecordSet {
    name: String,
    primary_keys: Vec<String>,
    dedup: bool,
    records: Vec<RecordRef>,
    join_keys: Vec<Vec<KeyValue>>,
    seen: HashMap<RowIdentity, usize>,
    indexes: HashMap<String, ColumnIndex>,
}

impl RecordSet {
    /// Create an empty set. `dedup` enables primary-key deduplication.
    pub fn new(name: impl Into<String>, primary_keys: Vec<String>, dedup: bool) -> Self {
        Self {
            name: name.into(),
            primary_keys,
            dedup,
            records: Vec::new(),
            join_keys: Vec::new(),
            seen: HashMap::new(),
            indexes: HashMap::new(),
        }
    }

    /// Build a set from one query's row batch.
    pub fn from_rows(rows: Vec<Row>, layout: &SetLayout) -> Self {
        let mut set = Self::new(&layout.name, layout.primary_keys.clone(), layout.is_raw());
        for column in &layout.indexed_columns {
            set.add_index(column);
        }

        for mut row in rows {
            let keys = row
                .take(&layout.join_marker)
                .map(|marker| marker.link_keys())
                .unwrap_or_default();

            let record = match &layout.model {
                Some(model) => Record::Tracked(TrackedRecord::from_db(Arc::clone(model), row)),
                None => {
                    let identity = row.identity(&layout.primary_keys);
                    Record::Raw(RawRecord::new(row, identity))
                }
            };

            set.push_with_keys(RecordRef::new(record), keys);
        }

        set
    }

    /// Declare an indexed column, indexing the records already present.
    pub fn add_index(&mut self, column: &str) {
        if self.indexes.contains_key(column) {
            return;
        }

        let mut index = ColumnIndex::new();
        for (pos, record) in self.records.iter().enumerate() {
            let key = record.read().row().key(column);
            if !key.is_null() {
                index.entry(key).or_default().push(pos);
            }
        }
        self.indexes.insert(column.to_string(), index);
    }

    /// Append a record without join keys.
    pub fn push(&mut self, record: RecordRef) -> bool {
        self.push_with_keys(record, Vec::new())
    }

    /// Append a record along with the parent keys it links to.
    ///
    /// With deduplication enabled, a record whose primary-key identity was
    /// already seen is not admitted; its join keys are merged into the first
    /// occurrence instead. Returns whether the record was admitted.
    pub fn push_with_keys(&mut self, record: RecordRef, keys: Vec<KeyValue>) -> bool {
        let identity = record.identity();

        if self.dedup && !identity.is_unknown() {
            if let Some(&pos) = self.seen.get(&identity) {
                let existing = &mut self.join_keys[pos];
                for key in keys {
                    if !existing.contains(&key) {
                        existing.push(key);
                    }
                }
                return false;
            }
        }

        let pos = self.records.len();
        {
            let guard = record.read();
            for (column, index) in self.indexes.iter_mut() {
                let key = guard.row().key(column);
                if !key.is_null() {
                    index.entry(key).or_default().push(pos);
                }
            }
        }

        if !identity.is_unknown() {
            self.seen.entry(identity).or_insert(pos);
        }
        self.records.push(record);
        self.join_keys.push(keys);
        true
    }

    /// Records whose indexed column equals the key, in insertion order.
    ///
    /// Unindexed columns and null keys never match.
    pub fn lookup(&self, column: &str, key: &KeyValue) -> Vec<&RecordRef> {
        if key.is_null() {
            return Vec::new();
        }

        self.indexes
            .get(column)
            .and_then(|index| index.get(key))
            .map(|positions| positions.iter().map(|&pos| &self.records[pos]).collect())
            .unwrap_or_default()
    }

    pub fn is_indexed(&self, column: &str) -> bool {
        self.indexes.contains_key(column)
    }

    /// Join keys still attached to the record at `pos`.
    pub fn join_keys(&self, pos: usize) -> &[KeyValue] {
        self.join_keys.get(pos).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop the join keys of a consumed record.
    pub fn clear_join_keys(&mut self, pos: usize) {
        if let Some(keys) = self.join_keys.get_mut(pos) {
            keys.clear();
        }
    }

    /// Whether any record still carries join keys.
    pub fn has_join_keys(&self) -> bool {
        self.join_keys.iter().any(|keys| !keys.is_empty())
    }

    /// Records paired with their join keys.
    pub fn entries(&self) -> impl Iterator<Item = (&RecordRef, &[KeyValue])> {
        self.records
            .iter()
            .zip(self.join_keys.iter().map(Vec::as_slice))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&RecordRef> {
        self.records.get(pos)
    }

    pub fn first(&self) -> Option<&RecordRef> {
        self.records.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordRef> {
        self.records.iter()
    }

    /// Plain JSON array of all records.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a RecordRef;
    type IntoIter = std::slice::Iter<'a, RecordRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl Serialize for RecordSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.records.len()))?;
        for record in &self.records {
            seq.serialize_element(record)?;
        }
        seq.end()
    }
}
