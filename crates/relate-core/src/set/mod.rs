//! Result records and the indexed sets that hold them.

mod record;
mod record_set;
mod related;

pub use record::{
    RawRecord, RawRelation, Record, RecordRef, RelationSlot, SlotValue, TrackedRecord,
};
pub use record_set::{RecordSet, SetLayout};
pub use related::RelatedSet;
