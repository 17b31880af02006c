//! One repository resource type
//!
//! A `RepositoryResource` bundles everything needed to manage one variant:
//! the composed schema and its data-source counterpart, the pack plan, the
//! unpack transforms and the state migrator.

use artirepo_core::{
    check_consistency, compose_with_layout, ComposedSchema, ConfigurationModel, RepoVariant,
    SchemaFragment, WireModel,
};
use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};
use crate::migration::{MigrationOp, Migrator, StoredState};
use crate::pack::{PackTransform, Packer};
use crate::predicate::{self, Predicate};
use crate::unpack::{UnpackTransform, Unpacker};

#[derive(Debug, Clone)]
pub struct RepositoryResource {
    variant: RepoVariant,
    fragments: Vec<SchemaFragment>,
    schema: ComposedSchema,
    data_source: ComposedSchema,
    packer: Packer,
    unpacker: Unpacker,
    migrator: Migrator,
}

/// Builder for a `RepositoryResource`
#[derive(Debug)]
pub struct ResourceBuilder {
    variant: RepoVariant,
    version: u32,
    fragments: Vec<SchemaFragment>,
    ignored: Vec<String>,
    pack_transforms: Vec<PackTransform>,
    unpacker: Unpacker,
    migrator: Migrator,
}

impl ResourceBuilder {
    /// Add a fragment; later fragments override earlier ones
    pub fn fragment(mut self, fragment: &SchemaFragment) -> Self {
        self.fragments.push(fragment.clone());
        self
    }

    /// Schema version written to persisted state
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Exclude attributes from the universal pack pass
    pub fn ignore(mut self, names: &[&str]) -> Self {
        self.ignored.extend(names.iter().map(|n| n.to_string()));
        self
    }

    pub fn pack_transform(mut self, transform: PackTransform) -> Self {
        self.pack_transforms.push(transform);
        self
    }

    pub fn unpack_transform(mut self, transform: UnpackTransform) -> Self {
        self.unpacker = self.unpacker.then(transform);
        self
    }

    /// Register the operations upgrading state written at `from_version`
    pub fn migration(mut self, from_version: u32, ops: Vec<MigrationOp>) -> Self {
        self.migrator = self.migrator.step(from_version, ops);
        self
    }

    pub fn build(self) -> RepositoryResource {
        let refs: Vec<&SchemaFragment> = self.fragments.iter().collect();
        let schema = compose_with_layout(self.variant, &refs).with_version(self.version);
        let data_source = schema.as_data_source();

        let ignored: Vec<&str> = self.ignored.iter().map(String::as_str).collect();
        let filter: Predicate = if ignored.is_empty() {
            Predicate::always()
        } else {
            predicate::ignore(&ignored)
        };
        let packer = self
            .pack_transforms
            .into_iter()
            .fold(Packer::universal(filter), Packer::then);

        RepositoryResource {
            variant: self.variant,
            fragments: self.fragments,
            schema,
            data_source,
            packer,
            unpacker: self.unpacker,
            migrator: self.migrator,
        }
    }
}

impl RepositoryResource {
    pub fn builder(variant: RepoVariant) -> ResourceBuilder {
        ResourceBuilder {
            variant,
            version: 0,
            fragments: Vec::new(),
            ignored: Vec::new(),
            pack_transforms: Vec::new(),
            unpacker: Unpacker::new(),
            migrator: Migrator::new(),
        }
    }

    pub fn variant(&self) -> RepoVariant {
        self.variant
    }

    /// Terraform resource type name
    pub fn resource_name(&self) -> String {
        self.variant.resource_name()
    }

    pub fn schema(&self) -> &ComposedSchema {
        &self.schema
    }

    pub fn data_source_schema(&self) -> &ComposedSchema {
        &self.data_source
    }

    pub fn packer(&self) -> &Packer {
        &self.packer
    }

    pub fn unpacker(&self) -> &Unpacker {
        &self.unpacker
    }

    pub fn migrator(&self) -> &Migrator {
        &self.migrator
    }

    /// Check the fragments this resource was composed from
    pub fn check_consistency(&self) -> artirepo_core::Result<()> {
        let refs: Vec<&SchemaFragment> = self.fragments.iter().collect();
        check_consistency(&self.variant.key(), &refs)
    }

    /// Validate a configuration, reporting every failure at once
    pub fn validate(&self, config: &ConfigurationModel) -> Result<()> {
        let result = self.schema.validate(config);
        if result.is_valid {
            Ok(())
        } else {
            Err(EngineError::validation(self.variant.key(), result.errors))
        }
    }

    /// Zero-value wire model with this variant's invariants
    pub fn new_wire_model(&self, key: impl Into<String>) -> WireModel {
        self.variant.new_wire_model(key)
    }

    /// Decode an API response body for this variant
    pub fn decode_wire(&self, body: &JsonValue) -> Result<WireModel> {
        Ok(WireModel::decode(self.variant, body)?)
    }

    pub fn unpack(&self, config: &ConfigurationModel) -> Result<WireModel> {
        self.unpacker.unpack(&self.schema, config)
    }

    pub fn pack(&self, wire: &WireModel) -> Result<ConfigurationModel> {
        self.packer.pack(&self.schema, wire)
    }

    /// Pack into prior state, keeping values the server never returns
    pub fn pack_into(&self, wire: &WireModel, prior: &mut ConfigurationModel) -> Result<()> {
        self.packer.pack_into(&self.schema, wire, prior)
    }

    /// Pack for the data source, where every attribute is computed
    pub fn pack_data_source(&self, wire: &WireModel) -> Result<ConfigurationModel> {
        self.packer.pack(&self.data_source, wire)
    }

    pub fn migrate(&self, state: &StoredState) -> Result<ConfigurationModel> {
        self.migrator.migrate(state, &self.schema)
    }

    pub fn upgrade_state(&self, state: &StoredState) -> Result<StoredState> {
        self.migrator.upgrade(state, &self.schema)
    }

    /// Persisted form of a configuration
    pub fn to_state(&self, config: &ConfigurationModel) -> StoredState {
        StoredState::current(&self.schema, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragments::{BASE, DEBIAN, LOCAL};
    use artirepo_core::{PackageType, Rclass};
    use serde_json::json;

    fn debian() -> RepositoryResource {
        RepositoryResource::builder(RepoVariant::new(Rclass::Local, PackageType::Debian))
            .fragment(&BASE)
            .fragment(&LOCAL)
            .fragment(&DEBIAN)
            .ignore(&["notes"])
            .version(1)
            .migration(0, vec![MigrationOp::default_if_absent("xray_index", false)])
            .build()
    }

    #[test]
    fn test_builder_composes_with_layout() {
        let resource = debian();

        assert_eq!(resource.resource_name(), "artifactory_local_debian_repository");
        assert_eq!(resource.schema().version(), 1);
        assert!(resource.schema().contains("repo_layout_ref"));
        assert!(resource.check_consistency().is_ok());
    }

    #[test]
    fn test_ignored_attributes_are_not_packed() {
        let resource = debian();
        let wire = resource
            .decode_wire(&json!({"key": "deb", "notes": "n", "description": "d"}))
            .unwrap();

        let cfg = resource.pack(&wire).unwrap();

        assert!(!cfg.contains("notes"));
        assert_eq!(cfg.get_str("description"), Some("d"));
    }

    #[test]
    fn test_validate_reports_errors() {
        let resource = debian();
        let err = resource
            .validate(&ConfigurationModel::new().with("key", "1bad"))
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation { ref errors, .. } if errors.len() == 1));
    }

    #[test]
    fn test_data_source_pack() {
        let resource = debian();
        let wire = resource
            .decode_wire(&json!({"key": "deb", "debianTrivialLayout": true}))
            .unwrap();

        let cfg = resource.pack_data_source(&wire).unwrap();

        assert_eq!(cfg.get_bool("trivial_layout"), Some(true));
        assert!(resource.data_source_schema().get("trivial_layout").unwrap().default.is_none());
    }

    #[test]
    fn test_state_roundtrip() {
        let resource = debian();
        let cfg = ConfigurationModel::new().with("key", "deb").with("trivial_layout", true);

        let state = resource.to_state(&cfg);
        assert_eq!(state.schema_version, 1);
        assert_eq!(resource.migrate(&state).unwrap(), cfg);
    }
}
