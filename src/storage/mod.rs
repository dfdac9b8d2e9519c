//! Persistence contracts and backends.
//!
//! The traits describe the read surface the resolver consumes; the
//! in-memory store is a reference backend for embedded use and tests.

mod memory;
mod registry;
mod traits;

pub use memory::{InMemoryRepository, InMemoryStore};
pub use registry::{TypeRegistry, TypeRegistryBuilder};
pub use traits::{EntityManager, ManagerRegistry, Repository, StorageError};
