//! In-memory storage backend.
//!
//! This module provides a thread-safe in-memory implementation of the
//! persistence contracts. It is intended for embedded usage, tests, and as a
//! reference implementation. Mapping metadata is registered up front through
//! `&mut self`; records live behind a lock and can be written while shared.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::entity::{EntityMetadata, EntityType, Record, RecordId};
use crate::input::Criteria;
use crate::storage::traits::{EntityManager, Repository, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

fn unmapped(entity_type: &EntityType) -> StorageError {
    StorageError::BackendError(format!("no metadata registered for {entity_type}"))
}

#[derive(Debug, Default)]
struct StoreState {
    // Insertion order per type; lookups return the earliest match.
    by_type: HashMap<EntityType, Vec<Record>>,
}

/// Thread-safe in-memory entity store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    metadata: HashMap<EntityType, EntityMetadata>,
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers mapping metadata, returning the metadata it replaces.
    pub fn register(&mut self, metadata: EntityMetadata) -> Option<EntityMetadata> {
        self.metadata.insert(metadata.entity_type().clone(), metadata)
    }

    /// Types with registered metadata.
    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.metadata.keys()
    }

    /// Persists a new record, assigning its identity and version 1.
    ///
    /// # Errors
    /// - `BackendError`: the record's type has no metadata
    /// - `DuplicateKey`: the record is already stored, or its identifier or
    ///   one of its unique constraints collides with a stored record
    pub fn insert(&self, mut record: Record) -> Result<Record, StorageError> {
        let meta = self
            .metadata
            .get(record.entity_type())
            .ok_or_else(|| unmapped(record.entity_type()))?;

        let mut state = self.state.write().map_err(|_| lock_err("store.insert"))?;
        let rows = state.by_type.entry(record.entity_type().clone()).or_default();
        if let Some(id) = record.id() {
            if rows.iter().any(|r| r.id() == Some(id)) {
                return Err(StorageError::DuplicateKey(id.to_string()));
            }
        }
        check_unique(meta, rows, &record, None)?;

        let id = record.id().unwrap_or_default();
        record.mark_persisted(id, 1);
        rows.push(record.clone());
        Ok(record)
    }

    /// Replaces a stored record, bumping its version.
    ///
    /// # Errors
    /// - `RecordNotFound`: the record was never persisted or is gone
    /// - `DuplicateKey`: the new values collide with another stored record
    pub fn update(&self, mut record: Record) -> Result<Record, StorageError> {
        let Some(id) = record.id() else {
            return Err(StorageError::RecordNotFound(format!(
                "unmanaged {} record",
                record.entity_type()
            )));
        };
        let meta = self
            .metadata
            .get(record.entity_type())
            .ok_or_else(|| unmapped(record.entity_type()))?;

        let mut state = self.state.write().map_err(|_| lock_err("store.update"))?;
        let rows = state.by_type.entry(record.entity_type().clone()).or_default();
        let Some(pos) = rows.iter().position(|r| r.id() == Some(id)) else {
            return Err(StorageError::RecordNotFound(id.to_string()));
        };
        check_unique(meta, rows, &record, Some(id))?;

        let version = rows[pos].version() + 1;
        record.mark_persisted(id, version);
        rows[pos] = record.clone();
        Ok(record)
    }

    /// Get a record by its store identity.
    pub fn get(&self, entity_type: &EntityType, id: RecordId) -> Result<Option<Record>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("store.get"))?;
        Ok(state
            .by_type
            .get(entity_type)
            .and_then(|rows| rows.iter().find(|r| r.id() == Some(id)))
            .cloned())
    }

    /// Number of stored records of a type.
    pub fn count(&self, entity_type: &EntityType) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("store.count"))?;
        Ok(state.by_type.get(entity_type).map_or(0, Vec::len))
    }

    fn find_first(&self, entity_type: &EntityType, criteria: &Criteria) -> Result<Option<Record>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("store.find"))?;
        Ok(state
            .by_type
            .get(entity_type)
            .and_then(|rows| rows.iter().find(|r| criteria.matches(r)))
            .cloned())
    }
}

/// Rejects `record` if its identifier or any fully-mapped unique constraint
/// collides with another stored row. Groups holding a null never collide.
fn check_unique(
    meta: &EntityMetadata,
    rows: &[Record],
    record: &Record,
    skip: Option<RecordId>,
) -> Result<(), StorageError> {
    let mut groups = vec![meta.identifier_field_names().to_vec()];
    for constraint in meta.unique_constraints() {
        let fields: Result<Vec<String>, _> = constraint
            .columns
            .iter()
            .map(|c| meta.field_for_column(c).map(str::to_string))
            .collect();
        if let Ok(fields) = fields {
            groups.push(fields);
        }
    }

    for fields in groups {
        let Some(criteria) = Criteria::complete(&fields, record.fields()) else {
            continue;
        };
        if criteria.has_null() {
            continue;
        }
        let clash = rows
            .iter()
            .filter(|r| skip.is_none() || r.id() != skip)
            .any(|r| criteria.matches(r));
        if clash {
            return Err(StorageError::DuplicateKey(format!(
                "{}({})",
                record.entity_type(),
                fields.join(",")
            )));
        }
    }
    Ok(())
}

impl EntityManager for InMemoryStore {
    fn fetch_by_identifier(&self, entity_type: &EntityType, id: &Value) -> Result<Option<Record>, StorageError> {
        let meta = self.metadata.get(entity_type).ok_or_else(|| unmapped(entity_type))?;
        let names = meta.identifier_field_names();

        let criteria = match id {
            Value::Object(map) => Criteria::complete(names, map),
            scalar if names.len() == 1 => {
                let mut map = serde_json::Map::new();
                map.insert(names[0].clone(), scalar.clone());
                Criteria::complete(names, &map)
            }
            _ => {
                return Err(StorageError::InvalidIdentifier {
                    entity_type: entity_type.clone(),
                    reason: format!("expected {} identifier values, got one", names.len()),
                })
            }
        };

        let Some(criteria) = criteria else {
            return Err(StorageError::InvalidIdentifier {
                entity_type: entity_type.clone(),
                reason: format!("missing one of {}", names.join(",")),
            });
        };
        self.find_first(entity_type, &criteria)
    }

    fn metadata_for(&self, entity_type: &EntityType) -> Option<&EntityMetadata> {
        self.metadata.get(entity_type)
    }

    fn repository_for<'a>(&'a self, entity_type: &EntityType) -> Option<Box<dyn Repository + 'a>> {
        if !self.metadata.contains_key(entity_type) {
            return None;
        }
        Some(Box::new(InMemoryRepository {
            store: self,
            entity_type: entity_type.clone(),
        }))
    }
}

/// Criteria lookups over one type of an [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemoryRepository<'a> {
    store: &'a InMemoryStore,
    entity_type: EntityType,
}

impl Repository for InMemoryRepository<'_> {
    fn find_one_by(&self, criteria: &Criteria) -> Result<Option<Record>, StorageError> {
        self.store.find_first(&self.entity_type, criteria)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::UniqueConstraint;
    use serde_json::json;

    fn widget_store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.register(
            EntityMetadata::builder(EntityType::new("Widget"))
                .identifier(["id"])
                .field("name")
                .field_with_column("sku", "sku_code")
                .unique_constraint(UniqueConstraint::new(["sku_code"]))
                .build(),
        );
        store
    }

    fn widget(fields: Value) -> Record {
        let Value::Object(map) = fields else {
            panic!("expected object");
        };
        Record::with_fields(EntityType::new("Widget"), map)
    }

    #[test]
    fn test_insert_assigns_identity() {
        let store = widget_store();
        let stored = store.insert(widget(json!({"id": 1, "name": "a"}))).unwrap();
        assert!(stored.is_managed());
        assert_eq!(stored.version(), 1);
        let id = stored.id().unwrap();
        assert_eq!(store.get(&EntityType::new("Widget"), id).unwrap(), Some(stored));
    }

    #[test]
    fn test_insert_unmapped_type_fails() {
        let store = widget_store();
        let err = store.insert(Record::new(EntityType::new("Gadget"))).unwrap_err();
        assert!(matches!(err, StorageError::BackendError(_)));
    }

    #[test]
    fn test_insert_rejects_duplicate_identifier() {
        let store = widget_store();
        store.insert(widget(json!({"id": 1}))).unwrap();
        let err = store.insert(widget(json!({"id": 1}))).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(_)));
    }

    #[test]
    fn test_insert_rejects_duplicate_unique_constraint() {
        let store = widget_store();
        store.insert(widget(json!({"id": 1, "sku": "ABC"}))).unwrap();
        let err = store.insert(widget(json!({"id": 2, "sku": "ABC"}))).unwrap_err();
        assert!(err.to_string().contains("sku"));
    }

    #[test]
    fn test_insert_allows_repeated_null_unique() {
        let store = widget_store();
        store.insert(widget(json!({"id": 1, "sku": null}))).unwrap();
        let second = store.insert(widget(json!({"id": 2, "sku": null}))).unwrap();
        assert_eq!(second.get("sku"), Some(&Value::Null));
        assert_eq!(store.count(&EntityType::new("Widget")).unwrap(), 2);

        store.insert(widget(json!({"id": 3, "sku": "ABC"}))).unwrap();
        let err = store.insert(widget(json!({"id": 4, "sku": "ABC"}))).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey(_)));
    }

    #[test]
    fn test_update_bumps_version() {
        let store = widget_store();
        let mut stored = store.insert(widget(json!({"id": 1, "name": "a"}))).unwrap();
        stored.set("name", "b");
        let updated = store.update(stored.clone()).unwrap();
        assert_eq!(updated.id(), stored.id());
        assert_eq!(updated.version(), 2);
        assert_eq!(store.count(&EntityType::new("Widget")).unwrap(), 1);
    }

    #[test]
    fn test_update_unmanaged_fails() {
        let store = widget_store();
        let err = store.update(widget(json!({"id": 1}))).unwrap_err();
        assert!(matches!(err, StorageError::RecordNotFound(_)));
    }

    #[test]
    fn test_fetch_by_scalar_identifier() {
        let store = widget_store();
        let stored = store.insert(widget(json!({"id": 7, "name": "X"}))).unwrap();
        let ty = EntityType::new("Widget");
        assert_eq!(store.fetch_by_identifier(&ty, &json!(7)).unwrap(), Some(stored));
        assert_eq!(store.fetch_by_identifier(&ty, &json!(8)).unwrap(), None);
    }

    #[test]
    fn test_fetch_scalar_for_composite_identifier_fails() {
        let mut store = InMemoryStore::new();
        store.register(
            EntityMetadata::builder(EntityType::new("Order"))
                .identifier(["tenant", "number"])
                .build(),
        );
        let ty = EntityType::new("Order");
        let err = store.fetch_by_identifier(&ty, &json!(1)).unwrap_err();
        assert!(matches!(err, StorageError::InvalidIdentifier { .. }));

        let found = store
            .fetch_by_identifier(&ty, &json!({"tenant": "acme", "number": 1}))
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_repository_requires_metadata() {
        let store = widget_store();
        assert!(store.repository_for(&EntityType::new("Widget")).is_some());
        assert!(store.repository_for(&EntityType::new("Gadget")).is_none());
    }

    #[test]
    fn test_repository_find_one_by() {
        let store = widget_store();
        let stored = store.insert(widget(json!({"id": 1, "sku": "ABC"}))).unwrap();
        let repo = store.repository_for(&EntityType::new("Widget")).unwrap();

        let Value::Object(data) = json!({"sku": "ABC"}) else { unreachable!() };
        let criteria = Criteria::complete(&["sku"], &data).unwrap();
        assert_eq!(repo.find_one_by(&criteria).unwrap(), Some(stored));
    }
}
