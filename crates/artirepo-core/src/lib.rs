//! artirepo Core - Core types for the Artifactory repository configuration engine
//!
//! This crate provides the foundational types used throughout artirepo:
//! - `Value` / `ConfigurationModel`: User-facing configuration state
//! - `AttributeDefinition` / `SchemaFragment` / `ComposedSchema`: Attribute schemas
//! - `Validator`: Attribute value validation
//! - `WireModel`: The REST API shape of a repository
//! - `RepoVariant`: Repository class plus package type

pub mod error;
pub mod layout;
pub mod schema;
pub mod validators;
pub mod value;
pub mod wire;

pub use error::{CoreError, Result, ValidationErrorInfo};
pub use layout::default_layout;
pub use schema::{
    check_consistency, compose, compose_with_layout, json_kind, layout_fragment,
    AttributeDefinition, AttributeKind, BlockSchema, ComposedSchema, Presence, SchemaFragment,
    ValidationResult, WireBinding, LAYOUT_REF_ATTRIBUTE,
};
pub use validators::Validator;
pub use value::{ConfigurationModel, Value};
pub use wire::{PackageType, Rclass, RepoVariant, RepositoryBase, WireModel};
