//! Mapping metadata for entity types.
//!
//! Describes how an entity is keyed: its identifier fields and the unique
//! constraints declared on its table. Constraints are declared in terms of
//! *columns*; [`EntityMetadata::field_for_column`] maps them back to fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entity::EntityType;
use crate::error::MappingError;

/// A unique constraint declared on the entity's table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    /// Constraint name, used for diagnostics only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Columns covered by the constraint, in declaration order.
    pub columns: Vec<String>,
}

impl UniqueConstraint {
    /// Creates an unnamed constraint over `columns`.
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Names the constraint.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name for log output, falling back to the joined column list.
    #[must_use]
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.columns.join(","))
    }
}

/// Metadata for one entity type.
///
/// # Example
/// ```
/// use entity_hydrate::{EntityMetadata, EntityType, UniqueConstraint};
///
/// let meta = EntityMetadata::builder(EntityType::new("Widget"))
///     .identifier(["id"])
///     .field("name")
///     .field_with_column("sku", "sku_code")
///     .unique_constraint(UniqueConstraint::new(["sku_code"]))
///     .build();
///
/// assert_eq!(meta.field_for_column("sku_code").unwrap(), "sku");
/// assert!(meta.field_for_column("nope").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    entity_type: EntityType,
    identifier_field_names: Vec<String>,
    unique_constraints: Vec<UniqueConstraint>,
    column_to_field: HashMap<String, String>,
}

impl EntityMetadata {
    /// Starts a builder for the given type.
    #[must_use]
    pub fn builder(entity_type: EntityType) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            meta: Self {
                entity_type,
                identifier_field_names: Vec::new(),
                unique_constraints: Vec::new(),
                column_to_field: HashMap::new(),
            },
        }
    }

    /// The described type.
    #[must_use]
    pub const fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Identifier field names, in key order.
    #[must_use]
    pub fn identifier_field_names(&self) -> &[String] {
        &self.identifier_field_names
    }

    /// Unique constraints, in declaration order.
    #[must_use]
    pub fn unique_constraints(&self) -> &[UniqueConstraint] {
        &self.unique_constraints
    }

    /// Maps a column name back to the field it stores.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::UnknownColumn` if no field is mapped to `column`.
    pub fn field_for_column(&self, column: &str) -> Result<&str, MappingError> {
        self.column_to_field
            .get(column)
            .map(String::as_str)
            .ok_or_else(|| MappingError::UnknownColumn {
                entity_type: self.entity_type.clone(),
                column: column.to_string(),
            })
    }
}

/// Builder for [`EntityMetadata`].
#[derive(Debug, Clone)]
pub struct EntityMetadataBuilder {
    meta: EntityMetadata,
}

impl EntityMetadataBuilder {
    /// Sets the identifier fields. Each one is also mapped to a same-named column.
    #[must_use]
    pub fn identifier<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meta.identifier_field_names = fields.into_iter().map(Into::into).collect();
        for field in &self.meta.identifier_field_names {
            self.meta
                .column_to_field
                .entry(field.clone())
                .or_insert_with(|| field.clone());
        }
        self
    }

    /// Maps a field to a column of the same name.
    #[must_use]
    pub fn field(self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.field_with_column(field.clone(), field)
    }

    /// Maps a field to an explicitly named column.
    #[must_use]
    pub fn field_with_column(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.meta.column_to_field.insert(column.into(), field.into());
        self
    }

    /// Appends a unique constraint. Order of calls is lookup priority.
    #[must_use]
    pub fn unique_constraint(mut self, constraint: UniqueConstraint) -> Self {
        self.meta.unique_constraints.push(constraint);
        self
    }

    /// Finishes the metadata.
    #[must_use]
    pub fn build(self) -> EntityMetadata {
        self.meta
    }
}
