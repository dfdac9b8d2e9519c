//! Entity layer modules.
//!
//! This module groups entity identity, records and mapping metadata.

pub mod entity;
pub mod metadata;

pub use entity::{EntityType, Record, RecordId};
pub use metadata::{EntityMetadata, EntityMetadataBuilder, UniqueConstraint};
