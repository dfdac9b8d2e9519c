//! Entity types and record identity.
//!
//! A [`Record`] is a dynamically-typed instance of some [`EntityType`].
//! Records loaded from a store carry a [`RecordId`]; that identity and the
//! version number survive re-population, which is what lets an incoming
//! payload update an existing row instead of creating a duplicate.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::DenormalizeError;

/// Identifies a class of persisted entities.
///
/// # Examples
///
/// ```
/// use entity_hydrate::EntityType;
///
/// let widget = EntityType::new("Widget");
/// assert_eq!(widget.as_str(), "Widget");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(String);

impl EntityType {
    /// Creates a type identifier from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the type name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EntityType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Store-assigned identity of a persisted record.
///
/// Distinct from the entity's identifier *fields*: those are data, this is
/// the handle the store tracks the instance by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An entity instance: its type, its field values and, once persisted,
/// the identity the store tracks it by.
///
/// # Examples
///
/// ```
/// use entity_hydrate::{EntityType, Record};
///
/// let mut record = Record::new(EntityType::new("Widget"));
/// record.set("name", "X");
/// assert!(!record.is_managed());
/// assert_eq!(record.get("name"), Some(&serde_json::json!("X")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    entity_type: EntityType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,

    /// Version number (0 until persisted, incremented on every update).
    #[serde(default)]
    version: u64,

    #[serde(default)]
    fields: Map<String, Value>,
}

impl Record {
    /// Creates a blank, unmanaged record.
    #[must_use]
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            id: None,
            version: 0,
            fields: Map::new(),
        }
    }

    /// Creates an unmanaged record with initial field values.
    #[must_use]
    pub fn with_fields(entity_type: EntityType, fields: Map<String, Value>) -> Self {
        Self {
            fields,
            ..Self::new(entity_type)
        }
    }

    /// The type this record belongs to.
    #[must_use]
    pub const fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Store identity, `None` for records never persisted.
    #[must_use]
    pub const fn id(&self) -> Option<RecordId> {
        self.id
    }

    /// Version number; 0 until persisted.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns true if the record was loaded from (or saved to) a store.
    #[must_use]
    pub const fn is_managed(&self) -> bool {
        self.id.is_some()
    }

    /// Value of `field`, if set.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// All field values.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Converts the field values into a typed value.
    ///
    /// # Errors
    ///
    /// Returns `DenormalizeError::Deserialize` when the fields do not fit `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, DenormalizeError> {
        let entity_type = self.entity_type;
        serde_json::from_value(Value::Object(self.fields)).map_err(|source| {
            DenormalizeError::Deserialize {
                entity_type,
                source,
            }
        })
    }

    pub(crate) fn mark_persisted(&mut self, id: RecordId, version: u64) {
        self.id = Some(id);
        self.version = version;
    }
}
