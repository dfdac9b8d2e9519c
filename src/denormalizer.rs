//! Generic denormalization.
//!
//! [`Denormalizer`] is the contract of the serialization pipeline: turn a
//! raw payload into a populated [`Record`]. [`ObjectDenormalizer`] is the
//! field-population engine. It fills either the context's object to
//! populate or a blank record produced by its [`InstanceFactory`], the
//! extension point where construction of a fresh instance happens.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde_json::{Map, Value};
use tracing::trace;

use crate::entity::{EntityType, Record};
use crate::error::{DenormalizeError, HydrateResult};
use crate::input::RawInput;

/// Options carried through one denormalization call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DenormalizationContext {
    /// Populate this record instead of constructing a new one.
    pub object_to_populate: Option<Record>,

    /// When set, only these fields are written.
    pub allowed_attributes: Option<BTreeSet<String>>,
}

impl DenormalizationContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates `record` instead of constructing a new instance.
    #[must_use]
    pub fn with_object_to_populate(mut self, record: Record) -> Self {
        self.object_to_populate = Some(record);
        self
    }

    /// Restricts population to the listed fields.
    #[must_use]
    pub fn with_allowed_attributes<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_attributes = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Returns true if `field` may be written.
    #[must_use]
    pub fn is_allowed(&self, field: &str) -> bool {
        self.allowed_attributes
            .as_ref()
            .map_or(true, |allowed| allowed.contains(field))
    }
}

/// Turns raw payloads into populated records.
pub trait Denormalizer {
    /// Returns true if this denormalizer can handle the triple.
    fn supports_denormalization(&self, data: &Value, entity_type: &EntityType, format: Option<&str>) -> bool;

    /// Denormalizes `data` into a record of `entity_type`.
    ///
    /// # Errors
    ///
    /// Implementation specific; see [`crate::HydrateError`].
    fn denormalize(
        &self,
        data: &Value,
        entity_type: &EntityType,
        format: Option<&str>,
        context: DenormalizationContext,
    ) -> HydrateResult<Record>;
}

/// Produces the instance a mapping payload is populated into.
pub trait InstanceFactory {
    /// Returns true if this factory can build instances of `entity_type`.
    fn supports(&self, entity_type: &EntityType) -> bool;

    /// Creates the instance to populate. The context's allowed attributes
    /// apply to the population step, not to this call.
    ///
    /// # Errors
    ///
    /// Implementation specific; see [`crate::HydrateError`].
    fn create_instance(
        &self,
        data: &Map<String, Value>,
        entity_type: &EntityType,
        context: &DenormalizationContext,
        format: Option<&str>,
    ) -> HydrateResult<Record>;
}

type Constructor = Box<dyn Fn(&EntityType) -> Record + Send + Sync>;

/// Blank-instance constructors, one per registered type.
#[derive(Default)]
pub struct FactoryRegistry {
    constructors: HashMap<EntityType, Constructor>,
}

impl FactoryRegistry {
    /// Creates a registry with no constructors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor for one type.
    #[must_use]
    pub fn register<F>(mut self, entity_type: impl Into<EntityType>, constructor: F) -> Self
    where
        F: Fn(&EntityType) -> Record + Send + Sync + 'static,
    {
        self.constructors.insert(entity_type.into(), Box::new(constructor));
        self
    }

    /// Registers types whose blank instance is an empty record.
    #[must_use]
    pub fn register_blank<I, T>(mut self, entity_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityType>,
    {
        for entity_type in entity_types {
            self.constructors
                .insert(entity_type.into(), Box::new(|ty: &EntityType| Record::new(ty.clone())));
        }
        self
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("entity_types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl InstanceFactory for FactoryRegistry {
    fn supports(&self, entity_type: &EntityType) -> bool {
        self.constructors.contains_key(entity_type)
    }

    fn create_instance(
        &self,
        _data: &Map<String, Value>,
        entity_type: &EntityType,
        _context: &DenormalizationContext,
        _format: Option<&str>,
    ) -> HydrateResult<Record> {
        let constructor = self
            .constructors
            .get(entity_type)
            .ok_or_else(|| DenormalizeError::UnsupportedType {
                entity_type: entity_type.clone(),
            })?;
        Ok(constructor(entity_type))
    }
}

/// Field-population engine.
///
/// Mapping payloads are written field by field into the context's object to
/// populate, or into a fresh instance from the factory. A scalar payload is
/// accepted only alongside an object to populate, which is returned as is.
#[derive(Debug, Clone, Default)]
pub struct ObjectDenormalizer<F> {
    factory: F,
}

impl<F: InstanceFactory> ObjectDenormalizer<F> {
    /// Creates an engine building fresh instances through `factory`.
    #[must_use]
    pub const fn new(factory: F) -> Self {
        Self { factory }
    }

    /// The instance factory.
    #[must_use]
    pub const fn factory(&self) -> &F {
        &self.factory
    }
}

fn check_target(record: Record, entity_type: &EntityType) -> Result<Record, DenormalizeError> {
    if record.entity_type() == entity_type {
        Ok(record)
    } else {
        Err(DenormalizeError::TypeMismatch {
            expected: entity_type.clone(),
            actual: record.entity_type().clone(),
        })
    }
}

impl<F: InstanceFactory> Denormalizer for ObjectDenormalizer<F> {
    fn supports_denormalization(&self, _data: &Value, entity_type: &EntityType, _format: Option<&str>) -> bool {
        self.factory.supports(entity_type)
    }

    fn denormalize(
        &self,
        data: &Value,
        entity_type: &EntityType,
        format: Option<&str>,
        mut context: DenormalizationContext,
    ) -> HydrateResult<Record> {
        if !self.factory.supports(entity_type) {
            return Err(DenormalizeError::UnsupportedType {
                entity_type: entity_type.clone(),
            }
            .into());
        }

        let input = RawInput::classify(data);
        let target = context.object_to_populate.take();
        let (map, target) = match (input, target) {
            (RawInput::Mapping(map), target) => (map, target),
            (RawInput::Scalar(_), Some(record)) => return Ok(check_target(record, entity_type)?),
            (input, _) => {
                return Err(DenormalizeError::UnexpectedShape {
                    entity_type: entity_type.clone(),
                    shape: input.shape(),
                }
                .into())
            }
        };

        let mut record = match target {
            Some(record) => check_target(record, entity_type)?,
            None => self.factory.create_instance(map, entity_type, &context, format)?,
        };

        for (field, value) in map {
            if context.is_allowed(field) {
                record.set(field.clone(), value.clone());
            }
        }
        trace!(%entity_type, managed = record.is_managed(), fields = map.len(), "populated record");
        Ok(record)
    }
}
