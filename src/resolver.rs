//! Entity resolution.
//!
//! Before a payload is denormalized into a persisted type, the resolver
//! looks for an existing record it describes. Lookup order is fixed:
//!
//! 1. scalar payload: fetch by identifier, nothing else
//! 2. mapping payload: the identifier fields, then each unique constraint
//!    in declaration order
//!
//! A group is queried only when the payload carries every one of its
//! fields, and the first group with a hit wins. Matching records found by
//! different groups are not compared; declaration order is the priority.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::entity::{EntityMetadata, EntityType, Record, UniqueConstraint};
use crate::error::{ConfigurationError, HydrateResult};
use crate::input::{Criteria, RawInput};
use crate::storage::{EntityManager, ManagerRegistry};

/// Finds the persisted record a payload refers to, if any.
#[derive(Debug, Clone)]
pub struct EntityResolver<R> {
    registry: R,
}

impl<R: ManagerRegistry> EntityResolver<R> {
    /// Creates a resolver over `registry`.
    #[must_use]
    pub const fn new(registry: R) -> Self {
        Self { registry }
    }

    /// The registry managers are looked up in.
    #[must_use]
    pub const fn registry(&self) -> &R {
        &self.registry
    }

    /// Returns true if a manager is registered for `entity_type`.
    #[must_use]
    pub fn is_managed_type(&self, entity_type: &EntityType) -> bool {
        self.registry.manager_for(entity_type).is_some()
    }

    /// Resolves any payload shape.
    ///
    /// Scalars are looked up by identifier only. Null and arrays resolve to
    /// `None` without touching the store.
    ///
    /// # Errors
    /// - `ConfigurationError::NoManager` / `NoMetadata`: the type is not wired up,
    ///   whatever the payload shape
    /// - `ConfigurationError::NoRepository`: a criteria lookup was due but the
    ///   store offers no repository for the type
    /// - `StorageError`: the backend failed
    pub fn resolve(&self, entity_type: &EntityType, data: &Value) -> HydrateResult<Option<Record>> {
        let (manager, metadata) = self.wiring(entity_type)?;

        match RawInput::classify(data) {
            RawInput::Scalar(id) => {
                trace!(%entity_type, %id, "resolving by identifier value");
                Ok(manager.fetch_by_identifier(entity_type, id)?)
            }
            RawInput::Mapping(map) => find_persisted(manager, metadata, map),
            input @ RawInput::Unsupported(_) => {
                debug!(%entity_type, shape = input.shape(), "payload shape not resolvable");
                Ok(None)
            }
        }
    }

    /// Resolves a mapping payload through identifier and unique-constraint lookups.
    ///
    /// # Errors
    ///
    /// Same configuration and storage errors as [`EntityResolver::resolve`].
    pub fn resolve_mapping(
        &self,
        entity_type: &EntityType,
        data: &Map<String, Value>,
    ) -> HydrateResult<Option<Record>> {
        let (manager, metadata) = self.wiring(entity_type)?;
        find_persisted(manager, metadata, data)
    }

    fn wiring(&self, entity_type: &EntityType) -> Result<(&dyn EntityManager, &EntityMetadata), ConfigurationError> {
        let manager = self
            .registry
            .manager_for(entity_type)
            .ok_or_else(|| ConfigurationError::NoManager {
                entity_type: entity_type.clone(),
            })?;
        let metadata = manager
            .metadata_for(entity_type)
            .ok_or_else(|| ConfigurationError::NoMetadata {
                entity_type: entity_type.clone(),
            })?;
        Ok((manager, metadata))
    }
}

fn find_persisted(
    manager: &dyn EntityManager,
    metadata: &EntityMetadata,
    data: &Map<String, Value>,
) -> HydrateResult<Option<Record>> {
    let entity_type = metadata.entity_type();

    if let Some(found) = find_by(manager, entity_type, "identifier", metadata.identifier_field_names(), data)? {
        return Ok(Some(found));
    }

    for constraint in metadata.unique_constraints() {
        let label = constraint.label();
        let Some(fields) = unique_fields(manager, entity_type, constraint) else {
            continue;
        };
        if let Some(found) = find_by(manager, entity_type, &label, &fields, data)? {
            return Ok(Some(found));
        }
    }

    trace!(%entity_type, "no persisted record matches payload");
    Ok(None)
}

/// Maps a constraint's columns to field names; `None` if any column is unmapped.
fn unique_fields(
    manager: &dyn EntityManager,
    entity_type: &EntityType,
    constraint: &UniqueConstraint,
) -> Option<Vec<String>> {
    let mut fields = Vec::with_capacity(constraint.columns.len());
    for column in &constraint.columns {
        match manager.field_for_column(entity_type, column) {
            Ok(field) => fields.push(field),
            Err(err) => {
                debug!(%entity_type, constraint = %constraint.label(), %err, "skipping unique constraint");
                return None;
            }
        }
    }
    Some(fields)
}

fn find_by(
    manager: &dyn EntityManager,
    entity_type: &EntityType,
    group: &str,
    field_names: &[String],
    data: &Map<String, Value>,
) -> HydrateResult<Option<Record>> {
    let Some(criteria) = Criteria::complete(field_names, data) else {
        trace!(%entity_type, group, "criteria incomplete, skipping");
        return Ok(None);
    };

    let repository = manager
        .repository_for(entity_type)
        .ok_or_else(|| ConfigurationError::NoRepository {
            entity_type: entity_type.clone(),
        })?;

    let found = repository.find_one_by(&criteria)?;
    debug!(%entity_type, group, hit = found.is_some(), "criteria lookup");
    Ok(found)
}
