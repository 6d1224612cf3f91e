//! Relation assembly.
//!
//! Once every subquery of an invocation has resolved, the stitcher walks the
//! resource tree top-down and attaches each child record to the parent
//! records its join keys point at. Parents are found through the parent
//! set's index on the child's `referenced_parent_column`.

use relate_proto::KeyValue;
use tracing::debug;

use crate::catalog::RelationKind;
use crate::config::ReferenceConflict;
use crate::error::Error;
use crate::resource::Resource;
use crate::set::{RawRelation, RecordRef, RecordSet};

/// Attaches resolved child sets onto their parents.
#[derive(Debug, Clone, Copy)]
pub struct Stitcher {
    raw: bool,
    conflicts: ReferenceConflict,
}

impl Stitcher {
    pub fn new(raw: bool, conflicts: ReferenceConflict) -> Self {
        Self { raw, conflicts }
    }

    /// Stitch every resolved set below `parent`.
    ///
    /// `sets` is indexed by node id; each child set is taken out as it is
    /// consumed. A child without a set was not loaded and is skipped along
    /// with its subtree.
    pub fn stitch(
        &self,
        parent: &Resource,
        parent_set: &RecordSet,
        sets: &mut [Option<RecordSet>],
    ) -> Result<(), Error> {
        if parent_set.is_empty() {
            return Ok(());
        }

        for child in parent.children() {
            let Some(mut child_set) = sets.get_mut(child.id().index()).and_then(Option::take)
            else {
                continue;
            };
            let Some(column) = child.referenced_parent_column() else {
                continue;
            };

            if self.raw {
                self.stitch_raw(parent, parent_set, child, column, &mut child_set)?;
            } else {
                self.stitch_tracked(parent_set, child, column, &child_set)?;
            }

            if child.has_children() {
                self.stitch(child, &child_set, sets)?;
            }
        }

        Ok(())
    }

    fn stitch_tracked(
        &self,
        parent_set: &RecordSet,
        child: &Resource,
        column: &str,
        child_set: &RecordSet,
    ) -> Result<(), Error> {
        for (record, keys) in child_set.entries() {
            for parent in matching_parents(parent_set, column, keys) {
                self.attach_tracked(parent, child, record)?;
            }
        }
        Ok(())
    }

    fn attach_tracked(
        &self,
        parent: &RecordRef,
        child: &Resource,
        record: &RecordRef,
    ) -> Result<(), Error> {
        let mut guard = parent.write();
        let Some(parent) = guard.as_tracked_mut() else {
            return Ok(());
        };

        match child.kind() {
            RelationKind::Mapping => {
                parent.mapping_mut(child.loader_id())?.add_existing(record.clone());
            }
            RelationKind::BelongsTo => {
                parent.belongs_to_mut(child.loader_id())?.add_existing(record.clone());
            }
            RelationKind::Reference => {
                let alias = child.alias_name().unwrap_or_else(|| child.loader_id());
                if let Some(previous) = parent.set_reference(alias, record.clone())? {
                    self.check_conflict(parent.model().name(), alias, &previous, record)?;
                }
            }
            RelationKind::Root => {}
        }
        Ok(())
    }

    fn stitch_raw(
        &self,
        parent: &Resource,
        parent_set: &RecordSet,
        child: &Resource,
        column: &str,
        child_set: &mut RecordSet,
    ) -> Result<(), Error> {
        if !child_set.has_join_keys() {
            debug!(
                parent = parent.name(),
                relation = child.accessor_name(),
                "no join keys on subquery rows, relation left empty"
            );
            return Ok(());
        }

        let mut consumed = Vec::new();
        for (pos, (record, keys)) in child_set.entries().enumerate() {
            let mut matched = false;
            for target in matching_parents(parent_set, column, keys) {
                self.attach_raw(parent.name(), target, child, record)?;
                matched = true;
            }
            if matched {
                consumed.push(pos);
            }
        }

        for pos in consumed {
            child_set.clear_join_keys(pos);
        }
        Ok(())
    }

    fn attach_raw(
        &self,
        parent_name: &str,
        parent: &RecordRef,
        child: &Resource,
        record: &RecordRef,
    ) -> Result<(), Error> {
        let mut guard = parent.write();
        let Some(parent) = guard.as_raw_mut() else {
            return Ok(());
        };
        let name = child.accessor_name();

        if child.kind().is_to_many() {
            parent.push_related(name, record.clone());
            return Ok(());
        }

        if let Some(RawRelation::One(previous)) = parent.relation(name) {
            self.check_conflict(parent_name, name, previous, record)?;
        }
        parent.set_related(name, record.clone());
        Ok(())
    }

    fn check_conflict(
        &self,
        model: &str,
        relation: &str,
        existing: &RecordRef,
        incoming: &RecordRef,
    ) -> Result<(), Error> {
        if self.conflicts == ReferenceConflict::LastMatchWins
            || RecordRef::ptr_eq(existing, incoming)
        {
            return Ok(());
        }

        let existing = existing.identity();
        let incoming = incoming.identity();
        if existing == incoming {
            return Ok(());
        }

        Err(Error::ReferenceConflict {
            model: model.to_string(),
            relation: relation.to_string(),
            existing: existing.to_string(),
            incoming: incoming.to_string(),
        })
    }
}

fn matching_parents<'a>(
    parent_set: &'a RecordSet,
    column: &'a str,
    keys: &'a [KeyValue],
) -> impl Iterator<Item = &'a RecordRef> + 'a {
    keys.iter().flat_map(move |key| parent_set.lookup(column, key))
}
