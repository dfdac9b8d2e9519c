//! Abstract persistence contracts.
//!
//! The resolver only ever reads. These traits are the read surface it needs
//! from a persistence layer: find the manager responsible for a type, fetch
//! by identifier, inspect mapping metadata and run one-row criteria lookups.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::entity::{EntityMetadata, EntityType, Record};
use crate::error::MappingError;
use crate::input::Criteria;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Record not found where one was required.
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Identifier value does not fit the entity's key.
    #[error("Invalid identifier for {entity_type}: {reason}")]
    InvalidIdentifier {
        /// Type whose key was addressed.
        entity_type: EntityType,
        /// Why the value does not fit.
        reason: String,
    },

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Connection failed.
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Locates the entity manager responsible for a type.
///
/// A type with no manager is not a persisted entity type.
pub trait ManagerRegistry: Send + Sync {
    /// Returns the manager for `entity_type`, if one is registered.
    fn manager_for(&self, entity_type: &EntityType) -> Option<&dyn EntityManager>;
}

impl<T: ManagerRegistry + ?Sized> ManagerRegistry for &T {
    fn manager_for(&self, entity_type: &EntityType) -> Option<&dyn EntityManager> {
        (**self).manager_for(entity_type)
    }
}

impl<T: ManagerRegistry + ?Sized> ManagerRegistry for Arc<T> {
    fn manager_for(&self, entity_type: &EntityType) -> Option<&dyn EntityManager> {
        (**self).manager_for(entity_type)
    }
}

/// A session over one persistence store.
pub trait EntityManager: Send + Sync {
    /// Fetches a record by its identifier value.
    fn fetch_by_identifier(
        &self,
        entity_type: &EntityType,
        id: &Value,
    ) -> Result<Option<Record>, StorageError>;

    /// Mapping metadata for `entity_type`.
    fn metadata_for(&self, entity_type: &EntityType) -> Option<&EntityMetadata>;

    /// Maps a column back to a field name.
    ///
    /// Types without metadata have no columns, so every column is unknown.
    fn field_for_column(&self, entity_type: &EntityType, column: &str) -> Result<String, MappingError> {
        match self.metadata_for(entity_type) {
            Some(meta) => meta.field_for_column(column).map(str::to_string),
            None => Err(MappingError::UnknownColumn {
                entity_type: entity_type.clone(),
                column: column.to_string(),
            }),
        }
    }

    /// Criteria-based query surface for `entity_type`, if the store offers one.
    fn repository_for<'a>(&'a self, entity_type: &EntityType) -> Option<Box<dyn Repository + 'a>>;
}

/// Criteria-based lookups over the records of one type.
pub trait Repository {
    /// Returns one record matching every criterion by equality.
    ///
    /// When several records match, which one is returned is up to the
    /// backend.
    fn find_one_by(&self, criteria: &Criteria) -> Result<Option<Record>, StorageError>;
}
