//! To-many relation collections on tracked records.

use std::collections::HashSet;

use relate_proto::RowIdentity;
use serde::ser::{Serialize, SerializeSeq, Serializer};

use super::record::RecordRef;

/// Records attached to one to-many slot of a parent record.
///
/// Attachment is idempotent: a record already present, by shared reference
/// or by primary-key identity, is not added again.
#[derive(Debug, Clone, Default)]
pub struct RelatedSet {
    records: Vec<RecordRef>,
    identities: HashSet<RowIdentity>,
}

impl RelatedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record loaded from the database unless it is already present.
    ///
    /// Returns `true` if the record was added.
    pub fn add_existing(&mut self, record: RecordRef) -> bool {
        let identity = record.identity();

        if self.contains_ref(&record) {
            return false;
        }
        if !identity.is_unknown() && !self.identities.insert(identity) {
            return false;
        }

        self.records.push(record);
        true
    }

    /// Whether this exact shared record is present.
    pub fn contains_ref(&self, record: &RecordRef) -> bool {
        self.records.iter().any(|r| RecordRef::ptr_eq(r, record))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordRef> {
        self.records.iter()
    }

    pub fn first(&self) -> Option<&RecordRef> {
        self.records.first()
    }
}

impl<'a> IntoIterator for &'a RelatedSet {
    type Item = &'a RecordRef;
    type IntoIter = std::slice::Iter<'a, RecordRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl Serialize for RelatedSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.records.len()))?;
        for record in &self.records {
            seq.serialize_element(record)?;
        }
        seq.end()
    }
}
