//! Explicit type registry.
//!
//! Maps each entity type to the manager that persists it. Built once at
//! configuration time; afterwards it is only read.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entity::EntityType;
use crate::storage::traits::{EntityManager, ManagerRegistry};

/// Registry of entity managers keyed by type.
///
/// Several types may share one manager.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    managers: HashMap<EntityType, Arc<dyn EntityManager>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    /// Registered types, in no particular order.
    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.managers.keys()
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Returns true if no type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("entity_types", &self.managers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ManagerRegistry for TypeRegistry {
    fn manager_for(&self, entity_type: &EntityType) -> Option<&dyn EntityManager> {
        self.managers.get(entity_type).map(Arc::as_ref)
    }
}

/// Builder for [`TypeRegistry`].
#[derive(Default)]
pub struct TypeRegistryBuilder {
    managers: HashMap<EntityType, Arc<dyn EntityManager>>,
}

impl TypeRegistryBuilder {
    /// Registers `manager` for one type. A later registration replaces an earlier one.
    #[must_use]
    pub fn register(mut self, entity_type: impl Into<EntityType>, manager: Arc<dyn EntityManager>) -> Self {
        self.managers.insert(entity_type.into(), manager);
        self
    }

    /// Registers `manager` for every listed type.
    #[must_use]
    pub fn register_all<I, T>(mut self, entity_types: I, manager: &Arc<dyn EntityManager>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityType>,
    {
        for entity_type in entity_types {
            self.managers.insert(entity_type.into(), Arc::clone(manager));
        }
        self
    }

    /// Finishes the registry.
    #[must_use]
    pub fn build(self) -> TypeRegistry {
        TypeRegistry {
            managers: self.managers,
        }
    }
}
