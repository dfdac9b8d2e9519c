//! Mapping configuration.
//!
//! Entity metadata can be declared as JSON and loaded once at startup:
//!
//! ```json
//! {
//!   "entities": {
//!     "Widget": {
//!       "identifier": ["id"],
//!       "fields": ["name", "price"],
//!       "columns": { "sku_code": "sku" },
//!       "unique_constraints": [{ "name": "uniq_sku", "columns": ["sku_code"] }]
//!     }
//!   }
//! }
//! ```
//!
//! Identifier fields and `fields` map to same-named columns; `columns`
//! adds explicit column-to-field mappings.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entity::{EntityMetadata, EntityType, UniqueConstraint};
use crate::error::ConfigurationError;
use crate::storage::{InMemoryStore, TypeRegistry};

/// Mapping for one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityMapping {
    /// Identifier field names, in key order.
    pub identifier: Vec<String>,

    /// Fields stored in same-named columns.
    #[serde(default)]
    pub fields: Vec<String>,

    /// Column name to field name.
    #[serde(default)]
    pub columns: BTreeMap<String, String>,

    /// Unique constraints, in lookup priority order.
    #[serde(default)]
    pub unique_constraints: Vec<UniqueConstraint>,
}

impl EntityMapping {
    fn to_metadata(&self, entity_type: EntityType) -> EntityMetadata {
        let mut builder = EntityMetadata::builder(entity_type).identifier(self.identifier.iter().cloned());
        for field in &self.fields {
            builder = builder.field(field.clone());
        }
        for (column, field) in &self.columns {
            builder = builder.field_with_column(field.clone(), column.clone());
        }
        for constraint in &self.unique_constraints {
            builder = builder.unique_constraint(constraint.clone());
        }
        builder.build()
    }
}

/// Entity mappings keyed by type name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingConfig {
    /// Mappings keyed by entity type name.
    #[serde(default)]
    pub entities: BTreeMap<String, EntityMapping>,
}

impl MappingConfig {
    /// Parses and validates a JSON mapping document.
    ///
    /// # Errors
    ///
    /// `ConfigurationError::Load` on malformed JSON, `InvalidMapping` when
    /// validation fails.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigurationError::Load {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON mapping file.
    ///
    /// # Errors
    ///
    /// `ConfigurationError::Load` if the file cannot be read, otherwise as
    /// [`MappingConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| ConfigurationError::Load {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_json_str(&json)
    }

    /// Checks that every mapping is usable for lookups.
    ///
    /// # Errors
    ///
    /// `ConfigurationError::InvalidMapping` for a blank type name, an empty
    /// or duplicated identifier list, or a blank identifier field name.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, mapping) in &self.entities {
            let invalid = |reason: &str| ConfigurationError::InvalidMapping {
                entity_type: name.clone(),
                reason: reason.to_string(),
            };

            if name.trim().is_empty() {
                return Err(invalid("entity type name cannot be empty"));
            }
            if mapping.identifier.is_empty() {
                return Err(invalid("identifier cannot be empty"));
            }
            if mapping.identifier.iter().any(|f| f.trim().is_empty()) {
                return Err(invalid("identifier field name cannot be empty"));
            }
            let distinct: BTreeSet<&String> = mapping.identifier.iter().collect();
            if distinct.len() != mapping.identifier.len() {
                return Err(invalid("identifier lists a field twice"));
            }
        }
        Ok(())
    }

    /// Metadata for every configured type.
    #[must_use]
    pub fn metadata(&self) -> Vec<EntityMetadata> {
        self.entities
            .iter()
            .map(|(name, mapping)| mapping.to_metadata(EntityType::new(name.clone())))
            .collect()
    }

    /// Builds an in-memory store with every configured type registered.
    ///
    /// # Errors
    ///
    /// As [`MappingConfig::validate`].
    pub fn build_store(&self) -> Result<InMemoryStore, ConfigurationError> {
        self.validate()?;
        let mut store = InMemoryStore::new();
        for metadata in self.metadata() {
            store.register(metadata);
        }
        Ok(store)
    }

    /// Builds a store and a registry routing every configured type to it.
    ///
    /// The store handle is returned so callers can seed and persist records.
    ///
    /// # Errors
    ///
    /// As [`MappingConfig::validate`].
    pub fn build_registry(&self) -> Result<(Arc<InMemoryStore>, TypeRegistry), ConfigurationError> {
        let store = Arc::new(self.build_store()?);
        let mut builder = TypeRegistry::builder();
        for name in self.entities.keys() {
            builder = builder.register(name.as_str(), store.clone());
        }
        Ok((store, builder.build()))
    }
}
