//! Model definitions: the compiled layout of tracked records.

use super::error::ConfigError;
use super::relation::{RelationDef, RelationKind};

/// Layout of one table's records: columns, identity and relation slots.
///
/// Relation slots are fixed here, at setup time. Tracked records built from a
/// model get exactly one slot per declared relation and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    name: String,
    primary_keys: Vec<String>,
    columns: Vec<String>,
    relations: Vec<RelationDef>,
    is_mapping: bool,
}

impl Model {
    /// Create a model with the given primary key columns.
    pub fn new<I, S>(name: impl Into<String>, primary_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let primary_keys: Vec<String> = primary_keys.into_iter().map(Into::into).collect();
        Self {
            name: name.into(),
            columns: primary_keys.clone(),
            primary_keys,
            relations: Vec::new(),
            is_mapping: false,
        }
    }

    /// Add a column.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
        self
    }

    /// Mark the model as a many-to-many join table.
    pub fn as_mapping_table(mut self) -> Self {
        self.is_mapping = true;
        self
    }

    /// Add a relation slot.
    pub fn with_relation(mut self, relation: RelationDef) -> Result<Self, ConfigError> {
        self.add_relation(relation)?;
        Ok(self)
    }

    /// Add a relation slot in place.
    pub fn add_relation(&mut self, relation: RelationDef) -> Result<(), ConfigError> {
        if self.relation(relation.kind, &relation.name).is_some() {
            return Err(ConfigError::DuplicateRelation {
                relation: relation.name,
                model: self.name.clone(),
            });
        }

        if self.relations.iter().any(|r| r.accessor == relation.accessor) {
            return Err(ConfigError::AccessorInUse {
                accessor: relation.accessor,
                model: self.name.clone(),
            });
        }

        self.relations.push(relation);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn relations(&self) -> &[RelationDef] {
        &self.relations
    }

    pub fn is_mapping(&self) -> bool {
        self.is_mapping
    }

    /// Find a relation by kind and loader id.
    pub fn relation(&self, kind: RelationKind, name: &str) -> Option<&RelationDef> {
        self.relations
            .iter()
            .find(|r| r.kind == kind && r.name == name)
    }

    /// Find a relation by the name it is exposed under.
    pub fn relation_by_accessor(&self, accessor: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.accessor == accessor)
    }

    /// Whether a name is already taken by a column or a relation accessor.
    pub fn accessor_in_use(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name) || self.relation_by_accessor(name).is_some()
    }

    /// Expose a mapping under a custom accessor name.
    pub fn set_mapping_accessor_name(
        &mut self,
        mapping: &str,
        name: impl Into<String>,
    ) -> Result<(), ConfigError> {
        self.rename_accessor(RelationKind::Mapping, mapping, name.into())
    }

    /// Expose a reference under a custom accessor name.
    pub fn set_reference_accessor_name(
        &mut self,
        reference: &str,
        name: impl Into<String>,
    ) -> Result<(), ConfigError> {
        self.rename_accessor(RelationKind::Reference, reference, name.into())
    }

    fn rename_accessor(
        &mut self,
        kind: RelationKind,
        relation: &str,
        name: String,
    ) -> Result<(), ConfigError> {
        if self.accessor_in_use(&name) {
            return Err(ConfigError::AccessorInUse {
                accessor: name,
                model: self.name.clone(),
            });
        }

        let model = self.name.clone();
        let def = self
            .relations
            .iter_mut()
            .find(|r| r.kind == kind && r.name == relation)
            .ok_or_else(|| match kind {
                RelationKind::Reference => ConfigError::UnknownReference {
                    reference: relation.to_string(),
                    model,
                },
                _ => ConfigError::UnknownMapping {
                    mapping: relation.to_string(),
                    model,
                },
            })?;

        def.accessor = name;
        def.generic_accessor = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_model() -> Model {
        Model::new("event", ["id"])
            .with_column("title")
            .with_column("id_image")
            .with_relation(RelationDef::mapping("venue", "venue"))
            .unwrap()
            .with_relation(RelationDef::reference("id_image", "image"))
            .unwrap()
    }

    #[test]
    fn test_model_layout() {
        let model = event_model();
        assert_eq!(model.name(), "event");
        assert_eq!(model.primary_keys(), &["id".to_string()]);
        assert_eq!(model.columns().len(), 3);
        assert_eq!(model.relations().len(), 2);
        assert!(!model.is_mapping());
        assert!(model.relation(RelationKind::Mapping, "venue").is_some());
        assert!(model.relation(RelationKind::BelongsTo, "venue").is_none());
    }

    #[test]
    fn test_rename_mapping_accessor() {
        let mut model = event_model();
        model.set_mapping_accessor_name("venue", "venues").unwrap();

        let def = model.relation(RelationKind::Mapping, "venue").unwrap();
        assert_eq!(def.accessor, "venues");
        assert!(!def.generic_accessor);
        assert!(model.relation_by_accessor("venues").is_some());
    }

    #[test]
    fn test_rename_to_column_name_is_rejected() {
        let mut model = event_model();
        let err = model.set_mapping_accessor_name("venue", "title").unwrap_err();

        assert_eq!(
            err,
            ConfigError::AccessorInUse {
                accessor: "title".into(),
                model: "event".into(),
            }
        );
    }

    #[test]
    fn test_rename_to_other_accessor_is_rejected() {
        let mut model = event_model();
        model.set_reference_accessor_name("id_image", "image").unwrap();

        let err = model.set_mapping_accessor_name("venue", "image").unwrap_err();
        assert!(matches!(err, ConfigError::AccessorInUse { .. }));
    }

    #[test]
    fn test_rename_unknown_relation() {
        let mut model = event_model();

        let err = model.set_mapping_accessor_name("artist", "artists").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMapping { .. }));

        let err = model.set_reference_accessor_name("id_cover", "cover").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownReference { .. }));
    }

    #[test]
    fn test_duplicate_relation() {
        let err = event_model()
            .with_relation(RelationDef::mapping("venue", "place"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRelation { .. }));
    }
}
