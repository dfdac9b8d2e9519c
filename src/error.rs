//! Error types for entity hydration.
//!
//! Errors are strongly typed using thiserror, one enum per concern, so
//! callers can tell a wiring defect apart from bad input or a failing
//! backend. A lookup that finds nothing is not an error: it surfaces as
//! `Ok(None)`.

use thiserror::Error;

use crate::entity::EntityType;
use crate::storage::StorageError;

/// Setup defects: the registry, store or mapping was wired incorrectly.
///
/// These are never retried and never absorbed by the resolver.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// No manager is registered for the type.
    #[error("No entity manager found for type {entity_type}")]
    NoManager {
        /// Type that was requested.
        entity_type: EntityType,
    },

    /// A criteria lookup was due but the store offers no repository.
    #[error("No repository found for type {entity_type}")]
    NoRepository {
        /// Type that was requested.
        entity_type: EntityType,
    },

    /// The manager holds no mapping metadata for the type.
    #[error("No mapping metadata registered for type {entity_type}")]
    NoMetadata {
        /// Type that was requested.
        entity_type: EntityType,
    },

    /// A configured mapping failed validation.
    #[error("Invalid mapping for type '{entity_type}': {reason}")]
    InvalidMapping {
        /// Configured type name.
        entity_type: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The mapping document could not be read or parsed.
    #[error("Failed to load mapping configuration: {message}")]
    Load {
        /// Underlying I/O or parse error.
        message: String,
    },
}

/// A column could not be mapped back to a field of the entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// No field is mapped to the column.
    #[error("Column '{column}' is not mapped to any field of {entity_type}")]
    UnknownColumn {
        /// Type the column was looked up on.
        entity_type: EntityType,
        /// Unmapped column name.
        column: String,
    },
}

/// Errors raised while populating an instance from raw data.
#[derive(Debug, Error)]
pub enum DenormalizeError {
    /// No factory or denormalizer handles the type.
    #[error("Type {entity_type} is not supported by this denormalizer")]
    UnsupportedType {
        /// Requested type.
        entity_type: EntityType,
    },

    /// The payload is not a JSON object.
    #[error("Cannot denormalize {shape} input into {entity_type}")]
    UnexpectedShape {
        /// Requested type.
        entity_type: EntityType,
        /// Shape of the payload that was given.
        shape: &'static str,
    },

    /// The object to populate belongs to another type.
    #[error("Object to populate is a {actual}, expected {expected}")]
    TypeMismatch {
        /// Requested type.
        expected: EntityType,
        /// Type of the object to populate.
        actual: EntityType,
    },

    /// The record does not deserialize into the requested Rust type.
    #[error("Failed to convert {entity_type} record: {source}")]
    Deserialize {
        /// Type of the record.
        entity_type: EntityType,
        /// Conversion failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error type for entity hydration.
#[derive(Debug, Error)]
pub enum HydrateError {
    /// Setup defect.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Backend failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Population failure.
    #[error("Denormalization error: {0}")]
    Denormalize(#[from] DenormalizeError),
}

impl HydrateError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a denormalization error.
    #[must_use]
    pub const fn is_denormalize(&self) -> bool {
        matches!(self, Self::Denormalize(_))
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Configuration(_) | Self::Denormalize(_) => false,
            Self::Storage(e) => matches!(e, StorageError::ConnectionError(_)),
        }
    }
}

/// Result type alias for hydration operations.
pub type HydrateResult<T> = Result<T, HydrateError>;
