#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use entity_hydrate::{
    Criteria, EntityManager, EntityMetadata, EntityType, InMemoryStore, Record, Repository,
    StorageError, TypeRegistry, UniqueConstraint,
};
use serde_json::Value;

/// A query the resolver issued against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    ById(Value),
    FindOneBy(Vec<(String, Value)>),
}

/// Wraps an in-memory store and records every read.
pub struct RecordingStore {
    inner: InMemoryStore,
    log: Mutex<Vec<Query>>,
    repositories: bool,
}

impl RecordingStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
            repositories: true,
        }
    }

    pub fn without_repositories(inner: InMemoryStore) -> Self {
        Self {
            repositories: false,
            ..Self::new(inner)
        }
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn seed(&self, fields: Value) -> Record {
        let Value::Object(map) = fields else {
            panic!("seed expects an object");
        };
        self.inner.insert(Record::with_fields(widget(), map)).unwrap()
    }

    pub fn queries(&self) -> Vec<Query> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }
}

impl EntityManager for RecordingStore {
    fn fetch_by_identifier(&self, entity_type: &EntityType, id: &Value) -> Result<Option<Record>, StorageError> {
        self.log.lock().unwrap().push(Query::ById(id.clone()));
        self.inner.fetch_by_identifier(entity_type, id)
    }

    fn metadata_for(&self, entity_type: &EntityType) -> Option<&EntityMetadata> {
        self.inner.metadata_for(entity_type)
    }

    fn repository_for<'a>(&'a self, entity_type: &EntityType) -> Option<Box<dyn Repository + 'a>> {
        if !self.repositories {
            return None;
        }
        let inner = self.inner.repository_for(entity_type)?;
        Some(Box::new(RecordingRepository { inner, log: &self.log }))
    }
}

struct RecordingRepository<'a> {
    inner: Box<dyn Repository + 'a>,
    log: &'a Mutex<Vec<Query>>,
}

impl Repository for RecordingRepository<'_> {
    fn find_one_by(&self, criteria: &Criteria) -> Result<Option<Record>, StorageError> {
        let fields = criteria
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.log.lock().unwrap().push(Query::FindOneBy(fields));
        self.inner.find_one_by(criteria)
    }
}

pub fn widget() -> EntityType {
    EntityType::new("Widget")
}

/// Widget: identifier `id`; unique constraints, in order, on `sku`
/// (column `sku_code`), on an unmapped column, and on (`vendor`, `slug`).
pub fn widget_metadata() -> EntityMetadata {
    EntityMetadata::builder(widget())
        .identifier(["id"])
        .field("name")
        .field("price")
        .field_with_column("sku", "sku_code")
        .field("vendor")
        .field("slug")
        .unique_constraint(UniqueConstraint::new(["sku_code"]).named("uniq_sku"))
        .unique_constraint(UniqueConstraint::new(["legacy_code"]).named("uniq_legacy"))
        .unique_constraint(UniqueConstraint::new(["vendor", "slug"]).named("uniq_vendor_slug"))
        .build()
}

pub fn recording_widgets() -> (Arc<RecordingStore>, TypeRegistry) {
    let mut inner = InMemoryStore::new();
    inner.register(widget_metadata());
    let store = Arc::new(RecordingStore::new(inner));
    let registry = TypeRegistry::builder().register(widget(), store.clone()).build();
    (store, registry)
}

pub fn criteria(pairs: &[(&str, Value)]) -> Query {
    let mut fields: Vec<(String, Value)> = pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    Query::FindOneBy(fields)
}
