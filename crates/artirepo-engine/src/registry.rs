//! Registry of repository resource types
//!
//! The registry is built once by `RegistryBuilder` and is read-only
//! afterwards. Share it by reference or behind an `Arc`.

use artirepo_core::{PackageType, Rclass, RepoVariant, SchemaFragment};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::fragments::*;
use crate::migration::MigrationOp;
use crate::resource::{RepositoryResource, ResourceBuilder};
use crate::suggestions::suggest_variant;
use crate::transforms::{
    PACK_CONTENT_SYNCHRONISATION, PACK_DOCKER_API_VERSION, PACK_MEMBERS,
    UNPACK_CONTENT_SYNCHRONISATION,
};

/// Package types each repository class supports
pub const LOCAL_PACKAGE_TYPES: &[PackageType] = PackageType::ALL;

pub const REMOTE_PACKAGE_TYPES: &[PackageType] = &[
    PackageType::Alpine,
    PackageType::Bower,
    PackageType::Cargo,
    PackageType::Chef,
    PackageType::Cocoapods,
    PackageType::Composer,
    PackageType::Conan,
    PackageType::Conda,
    PackageType::Cran,
    PackageType::Debian,
    PackageType::Docker,
    PackageType::Gems,
    PackageType::Generic,
    PackageType::GitLfs,
    PackageType::Go,
    PackageType::Gradle,
    PackageType::Helm,
    PackageType::HelmOci,
    PackageType::HuggingFaceMl,
    PackageType::Ivy,
    PackageType::Maven,
    PackageType::Npm,
    PackageType::Nuget,
    PackageType::Oci,
    PackageType::Opkg,
    PackageType::Pub,
    PackageType::Puppet,
    PackageType::Pypi,
    PackageType::Rpm,
    PackageType::Sbt,
    PackageType::Swift,
];

pub const VIRTUAL_PACKAGE_TYPES: &[PackageType] = &[
    PackageType::Alpine,
    PackageType::Bower,
    PackageType::Chef,
    PackageType::Composer,
    PackageType::Conan,
    PackageType::Conda,
    PackageType::Cran,
    PackageType::Debian,
    PackageType::Docker,
    PackageType::Gems,
    PackageType::Generic,
    PackageType::GitLfs,
    PackageType::Go,
    PackageType::Gradle,
    PackageType::Helm,
    PackageType::HelmOci,
    PackageType::Ivy,
    PackageType::Maven,
    PackageType::Npm,
    PackageType::Nuget,
    PackageType::Oci,
    PackageType::Pub,
    PackageType::Puppet,
    PackageType::Pypi,
    PackageType::Rpm,
    PackageType::Sbt,
    PackageType::Swift,
];

pub fn federated_package_types() -> impl Iterator<Item = PackageType> {
    PackageType::ALL
        .iter()
        .copied()
        .filter(|p| !matches!(p, PackageType::HuggingFaceMl | PackageType::Pub))
}

/// Schema version of each class's persisted state
pub fn schema_version(rclass: Rclass) -> u32 {
    match rclass {
        Rclass::Local | Rclass::Remote | Rclass::Federated => 1,
        Rclass::Virtual | Rclass::Distribution => 0,
    }
}

/// Immutable map of registry keys (`local:alpine`) to resources
#[derive(Debug)]
pub struct SchemaRegistry {
    resources: BTreeMap<String, RepositoryResource>,
}

/// Collects resources before freezing them into a `SchemaRegistry`
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    resources: BTreeMap<String, RepositoryResource>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource, replacing any earlier one for the same variant
    pub fn register(mut self, resource: RepositoryResource) -> Self {
        self.resources.insert(resource.variant().key(), resource);
        self
    }

    /// Register every built-in variant
    pub fn with_builtin(self) -> Self {
        let variants = LOCAL_PACKAGE_TYPES
            .iter()
            .map(|p| RepoVariant::new(Rclass::Local, *p))
            .chain(REMOTE_PACKAGE_TYPES.iter().map(|p| RepoVariant::new(Rclass::Remote, *p)))
            .chain(VIRTUAL_PACKAGE_TYPES.iter().map(|p| RepoVariant::new(Rclass::Virtual, *p)))
            .chain(federated_package_types().map(|p| RepoVariant::new(Rclass::Federated, p)));

        variants.fold(self, |builder, variant| builder.register(builtin_resource(variant)))
    }

    pub fn build(self) -> SchemaRegistry {
        debug!(resources = self.resources.len(), "built schema registry");
        SchemaRegistry {
            resources: self.resources,
        }
    }
}

impl SchemaRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry with every built-in variant
    pub fn builtin() -> Self {
        RegistryBuilder::new().with_builtin().build()
    }

    /// Look up a resource by registry key, e.g. `local:alpine`
    pub fn get(&self, key: &str) -> Result<&RepositoryResource> {
        self.resources.get(key).ok_or_else(|| {
            let known: Vec<&str> = self.resources.keys().map(String::as_str).collect();
            EngineError::UnknownVariant {
                key: key.to_string(),
                suggestion: suggest_variant(key, &known),
            }
        })
    }

    pub fn get_variant(&self, variant: RepoVariant) -> Result<&RepositoryResource> {
        self.get(&variant.key())
    }

    /// Look up a resource by Terraform type name, e.g. `artifactory_local_alpine_repository`
    pub fn by_resource_name(&self, name: &str) -> Option<&RepositoryResource> {
        self.resources.values().find(|r| r.resource_name() == name)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.resources.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepositoryResource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Compose the built-in resource for a variant
pub fn builtin_resource(variant: RepoVariant) -> RepositoryResource {
    let builder = RepositoryResource::builder(variant)
        .fragment(&BASE)
        .version(schema_version(variant.rclass));

    let builder = match variant.rclass {
        Rclass::Local => builder
            .fragment(&LOCAL)
            .migration(0, local_migration()),
        Rclass::Federated => builder
            .fragment(&LOCAL)
            .fragment(&FEDERATED)
            .ignore(&["member"])
            .pack_transform(PACK_MEMBERS)
            .migration(0, federated_migration()),
        Rclass::Remote => builder
            .fragment(&REMOTE)
            .pack_transform(PACK_CONTENT_SYNCHRONISATION)
            .unpack_transform(UNPACK_CONTENT_SYNCHRONISATION)
            .migration(0, remote_migration()),
        Rclass::Virtual => builder.fragment(&VIRTUAL),
        Rclass::Distribution => builder,
    };

    let builder = package_fragments(variant)
        .into_iter()
        .fold(builder, ResourceBuilder::fragment);

    let hosts_docker_images = variant.package_type == PackageType::Docker
        && matches!(variant.rclass, Rclass::Local | Rclass::Federated);
    let builder = if hosts_docker_images {
        builder
            .ignore(&["api_version"])
            .pack_transform(PACK_DOCKER_API_VERSION)
    } else {
        builder
    };

    builder.build()
}

/// Package-specific fragments, in composition order
fn package_fragments(variant: RepoVariant) -> Vec<&'static SchemaFragment> {
    use PackageType::*;

    match variant.rclass {
        Rclass::Local | Rclass::Federated => match variant.package_type {
            Alpine => vec![&*PRIMARY_KEYPAIR, &*COMPRESSION],
            Debian => vec![&*DEBIAN, &*PRIMARY_KEYPAIR, &*SECONDARY_KEYPAIR, &*COMPRESSION],
            Docker => vec![&*TAG_RETENTION, &*DOCKER],
            Oci => vec![&*TAG_RETENTION],
            Maven => vec![&*JAVA],
            Gradle | Ivy | Sbt => vec![&*JAVA, &*NON_MAVEN_POM],
            Rpm => vec![&*RPM, &*PRIMARY_KEYPAIR, &*SECONDARY_KEYPAIR],
            Cargo => vec![&*CARGO],
            Nuget => vec![&*NUGET],
            Conan => vec![&*CONAN],
            Helm => vec![&*HELM],
            _ => vec![],
        },
        Rclass::Remote => match variant.package_type {
            Docker => vec![&*REMOTE_DOCKER, &*EXTERNAL_DEPENDENCIES],
            Oci | Npm => vec![&*EXTERNAL_DEPENDENCIES],
            Maven => vec![&*REMOTE_JAVA],
            Gradle | Ivy | Sbt => vec![&*REMOTE_JAVA, &*NON_MAVEN_POM],
            Pypi => vec![&*REMOTE_PYPI],
            Helm => vec![&*REMOTE_HELM, &*EXTERNAL_DEPENDENCIES],
            Cargo => vec![&*CARGO, &*REMOTE_CARGO],
            Go | Bower | Cocoapods => vec![&*REMOTE_VCS],
            Composer => vec![&*REMOTE_VCS, &*REMOTE_COMPOSER],
            Nuget => vec![&*REMOTE_NUGET],
            Conan => vec![&*CONAN],
            Generic => vec![&*REMOTE_GENERIC],
            _ => vec![],
        },
        Rclass::Virtual => match variant.package_type {
            Maven | Gradle | Ivy | Sbt => vec![&*VIRTUAL_JAVA],
            Docker => vec![&*VIRTUAL_DOCKER],
            Debian => vec![
                &*VIRTUAL_CACHE,
                &*VIRTUAL_DEBIAN,
                &*PRIMARY_KEYPAIR,
                &*SECONDARY_KEYPAIR,
                &*COMPRESSION,
            ],
            Alpine => vec![&*VIRTUAL_CACHE, &*PRIMARY_KEYPAIR],
            Rpm => vec![&*VIRTUAL_CACHE, &*PRIMARY_KEYPAIR, &*SECONDARY_KEYPAIR],
            Helm => vec![&*VIRTUAL_CACHE, &*VIRTUAL_HELM],
            Npm => vec![&*VIRTUAL_CACHE, &*EXTERNAL_DEPENDENCIES],
            Conan => vec![&*VIRTUAL_CACHE, &*CONAN],
            Conda | Cran | Chef | Gems | Pub | Swift => vec![&*VIRTUAL_CACHE],
            Nuget => vec![&*VIRTUAL_NUGET],
            Go | Bower => vec![&*EXTERNAL_DEPENDENCIES],
            _ => vec![],
        },
        Rclass::Distribution => vec![],
    }
}

/// Version 0 stored sets as lists and left `xray_index` unset
fn local_migration() -> Vec<MigrationOp> {
    vec![
        MigrationOp::list_to_set("project_environments"),
        MigrationOp::list_to_set("property_sets"),
        MigrationOp::list_to_set("index_compression_formats"),
        MigrationOp::default_if_absent("xray_index", false),
    ]
}

/// Version 0 also kept members under their wire name and the cleanup flag as a string
fn federated_migration() -> Vec<MigrationOp> {
    let mut ops = local_migration();
    ops.push(MigrationOp::rename("members", "member"));
    ops.push(MigrationOp::string_to_bool("cleanup_on_delete"));
    ops
}

/// Version 0 stored timeouts as strings and used the longer cache attribute name
fn remote_migration() -> Vec<MigrationOp> {
    vec![
        MigrationOp::list_to_set("project_environments"),
        MigrationOp::string_to_int("socket_timeout_millis"),
        MigrationOp::string_to_int("retrieval_cache_period_seconds"),
        MigrationOp::rename("missed_retrieval_cache_period_seconds", "missed_cache_period_seconds"),
        MigrationOp::string_to_int("missed_cache_period_seconds"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_class() {
        let registry = SchemaRegistry::builtin();

        assert!(registry.contains("local:alpine"));
        assert!(registry.contains("remote:pypi"));
        assert!(registry.contains("virtual:maven"));
        assert!(registry.contains("federated:terraform_module"));
        assert!(!registry.contains("remote:vagrant"));
        assert_eq!(
            registry.len(),
            LOCAL_PACKAGE_TYPES.len()
                + REMOTE_PACKAGE_TYPES.len()
                + VIRTUAL_PACKAGE_TYPES.len()
                + federated_package_types().count()
        );
    }

    #[test]
    fn test_unknown_variant_suggestion() {
        let registry = SchemaRegistry::builtin();

        match registry.get("local:alpin") {
            Err(EngineError::UnknownVariant { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("Did you mean `local:alpine`?"));
            }
            other => panic!("expected UnknownVariant, got {:?}", other.map(|r| r.variant())),
        }
    }

    #[test]
    fn test_register_replaces_existing() {
        let variant = RepoVariant::new(Rclass::Local, PackageType::Generic);
        let custom = RepositoryResource::builder(variant).fragment(&BASE).version(7).build();

        let registry = RegistryBuilder::new()
            .with_builtin()
            .register(custom)
            .build();

        assert_eq!(registry.get("local:generic").unwrap().schema().version(), 7);
    }

    #[test]
    fn test_by_resource_name() {
        let registry = SchemaRegistry::builtin();

        let resource = registry
            .by_resource_name("artifactory_federated_debian_repository")
            .unwrap();
        assert_eq!(resource.variant().key(), "federated:debian");
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaRegistry>();
    }
}
