//! Entity-aware denormalization.
//!
//! Two ways to put the resolver in front of a generic denormalizer:
//!
//! - [`EntityDenormalizer`] decorates any [`Denormalizer`]: it resolves the
//!   payload first and hands the match over as the context's object to
//!   populate.
//! - [`ResolvingFactory`] plugs into [`ObjectDenormalizer`] as its instance
//!   factory: a fresh instance is only built when no persisted record
//!   matches.
//!
//! For mapping payloads both end in the same place: the persisted record,
//! updated with the payload's fields, or a new record when nothing matches.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::denormalizer::{DenormalizationContext, Denormalizer, InstanceFactory, ObjectDenormalizer};
use crate::entity::{EntityType, Record};
use crate::error::HydrateResult;
use crate::resolver::EntityResolver;
use crate::storage::ManagerRegistry;

/// Decorates a denormalizer with persisted-record resolution.
///
/// # Example
/// ```
/// use std::sync::Arc;
///
/// use entity_hydrate::{
///     DenormalizationContext, Denormalizer, EntityDenormalizer, EntityMetadata, EntityType,
///     FactoryRegistry, InMemoryStore, ObjectDenormalizer, Record, TypeRegistry,
/// };
/// use serde_json::json;
///
/// let widget = EntityType::new("Widget");
/// let mut store = InMemoryStore::new();
/// store.register(EntityMetadata::builder(widget.clone()).identifier(["id"]).field("name").build());
/// let store = Arc::new(store);
///
/// let mut existing = Record::new(widget.clone());
/// existing.set("id", 7);
/// let existing = store.insert(existing)?;
///
/// let registry = TypeRegistry::builder().register(widget.clone(), store.clone()).build();
/// let engine = ObjectDenormalizer::new(FactoryRegistry::new().register_blank([widget.clone()]));
/// let denormalizer = EntityDenormalizer::new(engine, registry);
///
/// let record = denormalizer.denormalize(
///     &json!({"id": 7, "name": "X"}),
///     &widget,
///     Some("json"),
///     DenormalizationContext::new(),
/// )?;
/// assert_eq!(record.id(), existing.id());
/// assert_eq!(record.get("name"), Some(&json!("X")));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct EntityDenormalizer<D, R> {
    inner: D,
    resolver: EntityResolver<R>,
}

impl<D: Denormalizer, R: ManagerRegistry> EntityDenormalizer<D, R> {
    /// Wraps `inner`, resolving through the managers in `registry`.
    #[must_use]
    pub const fn new(inner: D, registry: R) -> Self {
        Self {
            inner,
            resolver: EntityResolver::new(registry),
        }
    }

    /// The wrapped denormalizer.
    #[must_use]
    pub const fn inner(&self) -> &D {
        &self.inner
    }

    /// The resolver consulted before delegating.
    #[must_use]
    pub const fn resolver(&self) -> &EntityResolver<R> {
        &self.resolver
    }

    /// Denormalizes and converts the resulting record into `T`.
    ///
    /// # Errors
    ///
    /// Any error of [`Denormalizer::denormalize`], plus
    /// `DenormalizeError::Deserialize` when the record does not fit `T`.
    pub fn denormalize_as<T: DeserializeOwned>(
        &self,
        data: &Value,
        entity_type: &EntityType,
        format: Option<&str>,
        context: DenormalizationContext,
    ) -> HydrateResult<T> {
        let record = self.denormalize(data, entity_type, format, context)?;
        Ok(record.into_typed()?)
    }
}

impl<D: Denormalizer, R: ManagerRegistry> Denormalizer for EntityDenormalizer<D, R> {
    fn supports_denormalization(&self, data: &Value, entity_type: &EntityType, format: Option<&str>) -> bool {
        self.inner.supports_denormalization(data, entity_type, format)
            && self.resolver.is_managed_type(entity_type)
    }

    fn denormalize(
        &self,
        data: &Value,
        entity_type: &EntityType,
        format: Option<&str>,
        mut context: DenormalizationContext,
    ) -> HydrateResult<Record> {
        if let Some(found) = self.resolver.resolve(entity_type, data)? {
            debug!(%entity_type, id = ?found.id(), "populating persisted record");
            context.object_to_populate = Some(found);
        }
        self.inner.denormalize(data, entity_type, format, context)
    }
}

/// Instance factory that prefers a persisted record over a blank one.
///
/// Falls back to the wrapped factory when nothing matches.
#[derive(Debug, Clone)]
pub struct ResolvingFactory<F, R> {
    fallback: F,
    resolver: EntityResolver<R>,
}

impl<F: InstanceFactory, R: ManagerRegistry> ResolvingFactory<F, R> {
    /// Resolves through `registry`, building through `fallback` on a miss.
    #[must_use]
    pub const fn new(fallback: F, registry: R) -> Self {
        Self {
            fallback,
            resolver: EntityResolver::new(registry),
        }
    }

    /// The resolver consulted before falling back.
    #[must_use]
    pub const fn resolver(&self) -> &EntityResolver<R> {
        &self.resolver
    }
}

impl<F: InstanceFactory, R: ManagerRegistry> InstanceFactory for ResolvingFactory<F, R> {
    fn supports(&self, entity_type: &EntityType) -> bool {
        self.fallback.supports(entity_type) && self.resolver.is_managed_type(entity_type)
    }

    fn create_instance(
        &self,
        data: &Map<String, Value>,
        entity_type: &EntityType,
        context: &DenormalizationContext,
        format: Option<&str>,
    ) -> HydrateResult<Record> {
        if let Some(found) = self.resolver.resolve_mapping(entity_type, data)? {
            debug!(%entity_type, id = ?found.id(), "reusing persisted record");
            return Ok(found);
        }
        self.fallback.create_instance(data, entity_type, context, format)
    }
}

/// An [`ObjectDenormalizer`] whose fresh instances come from persisted records when possible.
pub type ResolvingObjectDenormalizer<F, R> = ObjectDenormalizer<ResolvingFactory<F, R>>;

/// Builds a [`ResolvingObjectDenormalizer`] over `fallback` and `registry`.
#[must_use]
pub const fn resolving_object_denormalizer<F, R>(fallback: F, registry: R) -> ResolvingObjectDenormalizer<F, R>
where
    F: InstanceFactory,
    R: ManagerRegistry,
{
    ObjectDenormalizer::new(ResolvingFactory::new(fallback, registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde::Deserialize;
    use serde_json::json;

    use crate::denormalizer::FactoryRegistry;
    use crate::entity::EntityMetadata;
    use crate::error::{ConfigurationError, HydrateError};
    use crate::storage::{InMemoryStore, TypeRegistry};

    struct AlwaysSupports;

    impl Denormalizer for AlwaysSupports {
        fn supports_denormalization(&self, _: &Value, _: &EntityType, _: Option<&str>) -> bool {
            true
        }

        fn denormalize(
            &self,
            _: &Value,
            entity_type: &EntityType,
            _: Option<&str>,
            context: DenormalizationContext,
        ) -> HydrateResult<Record> {
            Ok(context
                .object_to_populate
                .unwrap_or_else(|| Record::new(entity_type.clone())))
        }
    }

    fn widget_store() -> Arc<InMemoryStore> {
        let mut store = InMemoryStore::new();
        store.register(
            EntityMetadata::builder(EntityType::new("Widget"))
                .identifier(["id"])
                .field("name")
                .build(),
        );
        Arc::new(store)
    }

    fn registry(store: &Arc<InMemoryStore>) -> TypeRegistry {
        TypeRegistry::builder().register("Widget", store.clone()).build()
    }

    fn seed(store: &InMemoryStore) -> Record {
        let mut record = Record::new(EntityType::new("Widget"));
        record.set("id", 7);
        record.set("name", "old");
        store.insert(record).unwrap()
    }

    #[test]
    fn test_supports_requires_managed_type() {
        let store = widget_store();
        let adapter = EntityDenormalizer::new(AlwaysSupports, registry(&store));
        assert!(adapter.supports_denormalization(&json!({}), &EntityType::new("Widget"), None));
        assert!(!adapter.supports_denormalization(&json!({}), &EntityType::new("Gadget"), None));
    }

    #[test]
    fn test_supports_requires_inner_support() {
        let store = widget_store();
        let engine = ObjectDenormalizer::new(FactoryRegistry::new());
        let adapter = EntityDenormalizer::new(engine, registry(&store));
        assert!(!adapter.supports_denormalization(&json!({}), &EntityType::new("Widget"), None));
    }

    #[test]
    fn test_resolved_record_passed_as_object_to_populate() {
        let store = widget_store();
        let existing = seed(&store);
        let adapter = EntityDenormalizer::new(AlwaysSupports, registry(&store));
        let record = adapter
            .denormalize(&json!(7), &EntityType::new("Widget"), None, DenormalizationContext::new())
            .unwrap();
        assert_eq!(record, existing);
    }

    #[test]
    fn test_unmanaged_type_is_configuration_error() {
        let store = widget_store();
        let adapter = EntityDenormalizer::new(AlwaysSupports, registry(&store));
        let err = adapter
            .denormalize(&json!({}), &EntityType::new("Gadget"), None, DenormalizationContext::new())
            .unwrap_err();
        assert!(matches!(
            err,
            HydrateError::Configuration(ConfigurationError::NoManager { .. })
        ));
    }

    #[test]
    fn test_denormalize_as_typed() {
        #[derive(Debug, Deserialize)]
        struct Widget {
            id: i64,
            name: String,
        }

        let store = widget_store();
        seed(&store);
        let engine = ObjectDenormalizer::new(FactoryRegistry::new().register_blank(["Widget"]));
        let adapter = EntityDenormalizer::new(engine, registry(&store));
        let widget: Widget = adapter
            .denormalize_as(
                &json!({"id": 7, "name": "X"}),
                &EntityType::new("Widget"),
                Some("json"),
                DenormalizationContext::new(),
            )
            .unwrap();
        assert_eq!(widget.id, 7);
        assert_eq!(widget.name, "X");
    }

    #[test]
    fn test_resolving_factory_reuses_persisted_record() {
        let store = widget_store();
        let existing = seed(&store);
        let engine = resolving_object_denormalizer(FactoryRegistry::new().register_blank(["Widget"]), registry(&store));
        let record = engine
            .denormalize(
                &json!({"id": 7, "name": "X"}),
                &EntityType::new("Widget"),
                None,
                DenormalizationContext::new(),
            )
            .unwrap();
        assert_eq!(record.id(), existing.id());
        assert_eq!(record.version(), existing.version());
        assert_eq!(record.get("name"), Some(&json!("X")));
    }

    #[test]
    fn test_resolving_factory_falls_back_to_blank() {
        let store = widget_store();
        seed(&store);
        let engine = resolving_object_denormalizer(FactoryRegistry::new().register_blank(["Widget"]), registry(&store));
        let record = engine
            .denormalize(
                &json!({"id": 8, "name": "New"}),
                &EntityType::new("Widget"),
                None,
                DenormalizationContext::new(),
            )
            .unwrap();
        assert!(!record.is_managed());
        assert_eq!(record.get("id"), Some(&json!(8)));
    }

    #[test]
    fn test_resolving_factory_supports_managed_types_only() {
        let store = widget_store();
        let factory = ResolvingFactory::new(
            FactoryRegistry::new().register_blank(["Widget", "Gadget"]),
            registry(&store),
        );
        assert!(factory.supports(&EntityType::new("Widget")));
        assert!(!factory.supports(&EntityType::new("Gadget")));
    }
}
