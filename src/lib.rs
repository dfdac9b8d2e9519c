//! # entity-hydrate - populate persisted entities from API payloads
//!
//! When a structured payload (decoded JSON) is denormalized into a type the
//! persistence layer manages, the payload may describe a record that
//! already exists. This crate finds that record first and hands it to the
//! denormalizer as the object to populate. The record's identity and
//! version survive, and no duplicate is created.
//!
//! ## Core Concepts
//!
//! - **EntityResolver**: finds the persisted record a payload refers to, by
//!   identifier, then by each unique constraint in declaration order
//! - **EntityDenormalizer**: decorates a [`Denormalizer`] with resolution
//! - **ResolvingFactory**: the same resolution as an [`InstanceFactory`],
//!   consulted only when a fresh instance would otherwise be built
//! - **TypeRegistry**: explicit map from entity type to the manager that stores it
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entity_hydrate::{DenormalizationContext, Denormalizer, EntityDenormalizer, MappingConfig};
//!
//! let config = MappingConfig::from_path("mapping.json")?;
//! let (store, registry) = config.build_registry()?;
//! let denormalizer = EntityDenormalizer::new(engine, registry);
//!
//! // Updates Widget 7 in place if it exists, builds a new Widget otherwise.
//! let widget = denormalizer.denormalize(
//!     &serde_json::json!({"id": 7, "name": "X"}),
//!     &"Widget".into(),
//!     Some("json"),
//!     DenormalizationContext::new(),
//! )?;
//! store.update(widget)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod config;
pub mod denormalizer;
pub mod entity;
pub mod error;
pub mod input;
pub mod resolver;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use adapter::{resolving_object_denormalizer, EntityDenormalizer, ResolvingFactory, ResolvingObjectDenormalizer};
pub use config::{EntityMapping, MappingConfig};
pub use denormalizer::{
    DenormalizationContext, Denormalizer, FactoryRegistry, InstanceFactory, ObjectDenormalizer,
};
pub use entity::{EntityMetadata, EntityType, Record, RecordId, UniqueConstraint};
pub use error::{ConfigurationError, DenormalizeError, HydrateError, HydrateResult, MappingError};
pub use input::{Criteria, RawInput};
pub use resolver::EntityResolver;
pub use storage::{
    EntityManager, InMemoryStore, ManagerRegistry, Repository, StorageError, TypeRegistry,
};
