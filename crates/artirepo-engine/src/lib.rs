//! artirepo Engine - Translation between repository configuration and the Artifactory REST API
//!
//! This crate provides:
//! - Built-in schema fragments and the registry of repository variants
//! - Unpack (configuration to wire) and pack (wire to configuration) engines
//! - Predicate-based field projection for the pack pass
//! - Schema-version migration of persisted state
//! - Diagnostics with "did you mean" suggestions

pub mod error;
pub mod fragments;
pub mod migration;
pub mod pack;
pub mod predicate;
pub mod registry;
pub mod resource;
pub mod suggestions;
pub mod transforms;
pub mod unpack;

pub use error::{EngineError, Result};
pub use migration::{MigrationOp, MigrationStep, Migrator, StoredState};
pub use pack::{pack, PackTransform, Packer};
pub use predicate::Predicate;
pub use registry::{RegistryBuilder, SchemaRegistry};
pub use resource::{RepositoryResource, ResourceBuilder};
pub use unpack::{unpack, UnpackTransform, Unpacker};
