//! Records produced by a query: tracked (model-backed) or raw (plain rows).

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use relate_proto::{Row, RowIdentity, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::catalog::{Model, RelationKind};
use crate::error::Error;

use super::related::RelatedSet;

/// Shared handle to a record.
///
/// A child linked to several parents is one record behind several handles,
/// never a copy.
#[derive(Clone)]
pub struct RecordRef(Arc<RwLock<Record>>);

impl RecordRef {
    pub fn new(record: Record) -> Self {
        Self(Arc::new(RwLock::new(record)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Record> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Record> {
        self.0.write()
    }

    /// Whether two handles point at the same record.
    pub fn ptr_eq(a: &RecordRef, b: &RecordRef) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Primary-key identity of the record.
    pub fn identity(&self) -> RowIdentity {
        self.read().identity().clone()
    }

    /// Read a column value.
    pub fn get(&self, column: &str) -> Option<Value> {
        self.read().row().get(column).cloned()
    }

    /// Plain JSON rendering of the record and everything attached to it.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Some(record) => fmt::Debug::fmt(&*record, f),
            None => f.write_str("RecordRef(<locked>)"),
        }
    }
}

impl Serialize for RecordRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.read().serialize(serializer)
    }
}

/// A result record in one of the two output representations.
#[derive(Debug)]
pub enum Record {
    Tracked(TrackedRecord),
    Raw(RawRecord),
}

impl Record {
    pub fn row(&self) -> &Row {
        match self {
            Record::Tracked(r) => r.row(),
            Record::Raw(r) => r.row(),
        }
    }

    pub fn identity(&self) -> &RowIdentity {
        match self {
            Record::Tracked(r) => r.identity(),
            Record::Raw(r) => r.identity(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.row().get(column)
    }

    pub fn as_tracked(&self) -> Option<&TrackedRecord> {
        match self {
            Record::Tracked(r) => Some(r),
            Record::Raw(_) => None,
        }
    }

    pub fn as_tracked_mut(&mut self) -> Option<&mut TrackedRecord> {
        match self {
            Record::Tracked(r) => Some(r),
            Record::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&RawRecord> {
        match self {
            Record::Raw(r) => Some(r),
            Record::Tracked(_) => None,
        }
    }

    pub fn as_raw_mut(&mut self) -> Option<&mut RawRecord> {
        match self {
            Record::Raw(r) => Some(r),
            Record::Tracked(_) => None,
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Record::Tracked(r) => r.serialize(serializer),
            Record::Raw(r) => r.serialize(serializer),
        }
    }
}

/// Contents of one relation slot on a tracked record.
#[derive(Debug, Clone)]
pub enum SlotValue {
    /// Many-to-many collection.
    Mapping(RelatedSet),
    /// Belongs-to collection.
    BelongsTo(RelatedSet),
    /// Single referenced record, if resolved.
    Reference(Option<RecordRef>),
}

impl SlotValue {
    fn empty(kind: RelationKind) -> Self {
        match kind {
            RelationKind::Mapping => SlotValue::Mapping(RelatedSet::new()),
            RelationKind::BelongsTo => SlotValue::BelongsTo(RelatedSet::new()),
            RelationKind::Reference | RelationKind::Root => SlotValue::Reference(None),
        }
    }

    pub fn kind(&self) -> RelationKind {
        match self {
            SlotValue::Mapping(_) => RelationKind::Mapping,
            SlotValue::BelongsTo(_) => RelationKind::BelongsTo,
            SlotValue::Reference(_) => RelationKind::Reference,
        }
    }
}

impl Serialize for SlotValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SlotValue::Mapping(set) | SlotValue::BelongsTo(set) => set.serialize(serializer),
            SlotValue::Reference(record) => record.serialize(serializer),
        }
    }
}

/// A named relation slot.
#[derive(Debug, Clone)]
pub struct RelationSlot {
    /// Loader id of the relation.
    pub name: String,
    /// Name the slot is exposed under.
    pub accessor: String,
    pub value: SlotValue,
}

/// A record backed by a model, with one slot per declared relation.
#[derive(Debug)]
pub struct TrackedRecord {
    model: Arc<Model>,
    row: Row,
    identity: RowIdentity,
    from_db: bool,
    slots: Vec<RelationSlot>,
}

impl TrackedRecord {
    /// Build a record loaded from the database.
    pub fn from_db(model: Arc<Model>, row: Row) -> Self {
        let identity = row.identity(model.primary_keys());
        let slots = model
            .relations()
            .iter()
            .map(|def| RelationSlot {
                name: def.name.clone(),
                accessor: def.accessor.clone(),
                value: SlotValue::empty(def.kind),
            })
            .collect();

        Self {
            model,
            row,
            identity,
            from_db: true,
            slots,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn identity(&self) -> &RowIdentity {
        &self.identity
    }

    pub fn is_from_db(&self) -> bool {
        self.from_db
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.row.get(column)
    }

    pub fn slots(&self) -> &[RelationSlot] {
        &self.slots
    }

    /// Slot exposed under an accessor name.
    pub fn relation(&self, accessor: &str) -> Option<&SlotValue> {
        self.slots
            .iter()
            .find(|s| s.accessor == accessor)
            .map(|s| &s.value)
    }

    /// Many-to-many collection by loader id.
    pub fn mapping(&self, loader_id: &str) -> Option<&RelatedSet> {
        self.slots.iter().find_map(|s| match &s.value {
            SlotValue::Mapping(set) if s.name == loader_id => Some(set),
            _ => None,
        })
    }

    pub fn mapping_mut(&mut self, loader_id: &str) -> Result<&mut RelatedSet, Error> {
        let model = self.model.name().to_string();
        self.slots
            .iter_mut()
            .find_map(|s| match &mut s.value {
                SlotValue::Mapping(set) if s.name == loader_id => Some(set),
                _ => None,
            })
            .ok_or_else(|| Error::UnknownRelation {
                model,
                kind: RelationKind::Mapping.as_str(),
                relation: loader_id.to_string(),
            })
    }

    /// Belongs-to collection by loader id.
    pub fn belongs_to(&self, loader_id: &str) -> Option<&RelatedSet> {
        self.slots.iter().find_map(|s| match &s.value {
            SlotValue::BelongsTo(set) if s.name == loader_id => Some(set),
            _ => None,
        })
    }

    pub fn belongs_to_mut(&mut self, loader_id: &str) -> Result<&mut RelatedSet, Error> {
        let model = self.model.name().to_string();
        self.slots
            .iter_mut()
            .find_map(|s| match &mut s.value {
                SlotValue::BelongsTo(set) if s.name == loader_id => Some(set),
                _ => None,
            })
            .ok_or_else(|| Error::UnknownRelation {
                model,
                kind: RelationKind::BelongsTo.as_str(),
                relation: loader_id.to_string(),
            })
    }

    /// Referenced record by accessor (alias) name.
    pub fn reference(&self, alias: &str) -> Option<&RecordRef> {
        self.reference_slot(alias).and_then(|s| match &s.value {
            SlotValue::Reference(record) => record.as_ref(),
            _ => None,
        })
    }

    /// Store a referenced record, returning the previous one.
    pub fn set_reference(
        &mut self,
        alias: &str,
        record: RecordRef,
    ) -> Result<Option<RecordRef>, Error> {
        let model = self.model.name().to_string();
        let pos = self
            .slots
            .iter()
            .position(|s| is_reference_slot(s, alias))
            .ok_or_else(|| Error::UnknownRelation {
                model,
                kind: RelationKind::Reference.as_str(),
                relation: alias.to_string(),
            })?;

        match &mut self.slots[pos].value {
            SlotValue::Reference(slot) => Ok(slot.replace(record)),
            _ => Ok(None),
        }
    }

    fn reference_slot(&self, alias: &str) -> Option<&RelationSlot> {
        self.slots.iter().find(|s| is_reference_slot(s, alias))
    }
}

fn is_reference_slot(slot: &RelationSlot, alias: &str) -> bool {
    matches!(slot.value, SlotValue::Reference(_)) && (slot.accessor == alias || slot.name == alias)
}

impl Serialize for TrackedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in self.row.iter() {
            if self.relation(name).is_none() {
                map.serialize_entry(name, value)?;
            }
        }
        for slot in &self.slots {
            map.serialize_entry(&slot.accessor, &slot.value)?;
        }
        map.end()
    }
}

/// A relation injected into a raw record.
#[derive(Debug, Clone)]
pub enum RawRelation {
    /// Array property for mapping and belongs-to relations.
    Many(Vec<RecordRef>),
    /// Scalar property for references.
    One(RecordRef),
}

impl Serialize for RawRelation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawRelation::Many(records) => records.serialize(serializer),
            RawRelation::One(record) => record.serialize(serializer),
        }
    }
}

/// A plain row with relations injected as named properties.
#[derive(Debug)]
pub struct RawRecord {
    row: Row,
    identity: RowIdentity,
    relations: Vec<(String, RawRelation)>,
}

impl RawRecord {
    pub fn new(row: Row, identity: RowIdentity) -> Self {
        Self {
            row,
            identity,
            relations: Vec::new(),
        }
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn identity(&self) -> &RowIdentity {
        &self.identity
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.row.get(column)
    }

    pub fn relation(&self, name: &str) -> Option<&RawRelation> {
        self.relations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    /// Records in an array property; empty if the property was never created.
    pub fn related(&self, name: &str) -> &[RecordRef] {
        match self.relation(name) {
            Some(RawRelation::Many(records)) => records,
            Some(RawRelation::One(record)) => std::slice::from_ref(record),
            None => &[],
        }
    }

    /// Append to an array property, creating it on first use.
    pub fn push_related(&mut self, name: &str, record: RecordRef) {
        match self.relations.iter_mut().find(|(n, _)| n == name) {
            Some((_, RawRelation::Many(records))) => records.push(record),
            Some((_, slot @ RawRelation::One(_))) => {
                let previous = std::mem::replace(slot, RawRelation::Many(Vec::new()));
                if let (RawRelation::One(first), RawRelation::Many(records)) = (previous, slot) {
                    records.push(first);
                    records.push(record);
                }
            }
            None => self
                .relations
                .push((name.to_string(), RawRelation::Many(vec![record]))),
        }
    }

    /// Assign a scalar property, replacing any previous value.
    pub fn set_related(&mut self, name: &str, record: RecordRef) {
        match self.relations.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = RawRelation::One(record),
            None => self
                .relations
                .push((name.to_string(), RawRelation::One(record))),
        }
    }

    pub fn relations(&self) -> impl Iterator<Item = (&str, &RawRelation)> {
        self.relations.iter().map(|(n, r)| (n.as_str(), r))
    }
}

impl Serialize for RawRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in self.row.iter() {
            if self.relation(name).is_none() {
                map.serialize_entry(name, value)?;
            }
        }
        for (name, relation) in &self.relations {
            map.serialize_entry(name, relation)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RelationDef;
    use pretty_assertions::assert_eq;

    fn event_model() -> Arc<Model> {
        Arc::new(
            Model::new("event", ["id"])
                .with_column("id_image")
                .with_relation(RelationDef::mapping("venue", "venue"))
                .unwrap()
                .with_relation(RelationDef::belongs_to("ticket", "ticket"))
                .unwrap()
                .with_relation(RelationDef::reference("id_image", "image").with_accessor("image"))
                .unwrap(),
        )
    }

    fn raw(id: i64) -> RecordRef {
        let row = Row::new().with("id", id);
        let identity = row.identity(&["id".to_string()]);
        RecordRef::new(Record::Raw(RawRecord::new(row, identity)))
    }

    #[test]
    fn test_tracked_record_has_declared_slots() {
        let record = TrackedRecord::from_db(event_model(), Row::new().with("id", 1));

        assert!(record.is_from_db());
        assert_eq!(record.slots().len(), 3);
        assert!(record.mapping("venue").unwrap().is_empty());
        assert!(record.belongs_to("ticket").unwrap().is_empty());
        assert!(record.reference("image").is_none());
        assert!(record.mapping("ticket").is_none());
    }

    #[test]
    fn test_unknown_slot_is_an_error() {
        let mut record = TrackedRecord::from_db(event_model(), Row::new().with("id", 1));

        let err = record.mapping_mut("artist").unwrap_err();
        assert!(matches!(err, Error::UnknownRelation { kind: "mapping", .. }));
        assert!(record.belongs_to_mut("venue").is_err());
        assert!(record.set_reference("cover", raw(1)).is_err());
    }

    #[test]
    fn test_reference_overwrites() {
        let mut record = TrackedRecord::from_db(event_model(), Row::new().with("id", 1));
        let b = raw(2);
        let c = raw(3);

        assert!(record.set_reference("image", b.clone()).unwrap().is_none());
        let previous = record.set_reference("image", c.clone()).unwrap().unwrap();

        assert!(RecordRef::ptr_eq(&previous, &b));
        assert!(RecordRef::ptr_eq(record.reference("image").unwrap(), &c));
    }

    #[test]
    fn test_reference_by_loader_id() {
        let mut record = TrackedRecord::from_db(event_model(), Row::new().with("id", 1));
        record.set_reference("id_image", raw(7)).unwrap();

        assert!(record.reference("image").is_some());
    }

    #[test]
    fn test_raw_push_creates_array() {
        let parent = raw(1);
        let child = raw(9);

        {
            let mut guard = parent.write();
            let record = guard.as_raw_mut().unwrap();
            assert!(record.related("venue").is_empty());
            record.push_related("venue", child.clone());
            record.push_related("venue", child.clone());
        }

        let guard = parent.read();
        let related = guard.as_raw().unwrap().related("venue");
        assert_eq!(related.len(), 2);
        assert!(RecordRef::ptr_eq(&related[0], &child));
    }

    #[test]
    fn test_raw_record_json() {
        let parent = raw(1);
        parent
            .write()
            .as_raw_mut()
            .unwrap()
            .push_related("venue", raw(9));
        parent.write().as_raw_mut().unwrap().set_related("image", raw(4));

        assert_eq!(
            parent.to_json(),
            serde_json::json!({"id": 1, "venue": [{"id": 9}], "image": {"id": 4}})
        );
    }

    #[test]
    fn test_tracked_record_json() {
        let record = TrackedRecord::from_db(
            event_model(),
            Row::new().with("id", 1i64).with("id_image", 4i64),
        );
        let record = RecordRef::new(Record::Tracked(record));

        assert_eq!(
            record.to_json(),
            serde_json::json!({
                "id": 1,
                "id_image": 4,
                "venue": [],
                "ticket": [],
                "image": null
            })
        );
    }
}
