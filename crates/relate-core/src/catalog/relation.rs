//! Relation definitions between models.

use std::fmt;

/// How a resource relates to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// The tree root; has no parent.
    Root,
    /// Many-to-many relation through a join table.
    Mapping,
    /// To-many relation from the child's foreign key back to the parent.
    BelongsTo,
    /// To-one relation through a foreign key column on the parent.
    Reference,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Root => "root",
            RelationKind::Mapping => "mapping",
            RelationKind::BelongsTo => "belongsTo",
            RelationKind::Reference => "reference",
        }
    }

    /// Whether the relation holds a collection on the parent side.
    pub fn is_to_many(&self) -> bool {
        matches!(self, RelationKind::Mapping | RelationKind::BelongsTo)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relation slot declared on a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Relation kind (never [`RelationKind::Root`]).
    pub kind: RelationKind,
    /// Loader id: the mapping name, belongs-to name or reference column.
    pub name: String,
    /// Name the relation is exposed under on records.
    pub accessor: String,
    /// Target model name.
    pub target: String,
    /// Whether the accessor is still the generated default.
    pub generic_accessor: bool,
}

impl RelationDef {
    fn new(kind: RelationKind, name: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind,
            accessor: name.clone(),
            name,
            target: target.into(),
            generic_accessor: true,
        }
    }

    /// A many-to-many relation through a join table.
    pub fn mapping(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(RelationKind::Mapping, name, target)
    }

    /// A to-many relation owned by the target's foreign key.
    pub fn belongs_to(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(RelationKind::BelongsTo, name, target)
    }

    /// A to-one relation through a foreign key column.
    pub fn reference(column: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(RelationKind::Reference, column, target)
    }

    /// Expose the relation under a custom accessor name.
    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = accessor.into();
        self.generic_accessor = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_constructors() {
        let mapping = RelationDef::mapping("venue", "venue");
        assert_eq!(mapping.kind, RelationKind::Mapping);
        assert_eq!(mapping.accessor, "venue");
        assert!(mapping.generic_accessor);

        let reference = RelationDef::reference("id_image", "image").with_accessor("image");
        assert_eq!(reference.kind, RelationKind::Reference);
        assert_eq!(reference.name, "id_image");
        assert_eq!(reference.accessor, "image");
        assert!(!reference.generic_accessor);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(RelationKind::BelongsTo.to_string(), "belongsTo");
        assert!(RelationKind::Mapping.is_to_many());
        assert!(!RelationKind::Reference.is_to_many());
    }
}
