//! Built-in attribute fragments
//!
//! Each fragment groups the attributes one capability adds to a repository:
//! the base fields every repository has, the per-class fields, and the
//! package-specific extras. Variants are composed from these in the
//! registry, where a later fragment can override an earlier one's
//! definition (see `NON_MAVEN_POM`).

use artirepo_core::validators::{
    at_least, between, matches, not_empty, one_of, project_key, repo_key, set_subset_of, url,
};
use artirepo_core::{AttributeDefinition as Attr, BlockSchema, SchemaFragment};
use once_cell::sync::Lazy;

pub const COMPRESSION_FORMATS: &[&str] = &["bz2", "lzma", "xz"];
pub const CHECKSUM_POLICIES: &[&str] = &["client-checksums", "server-generated-checksums"];
pub const SNAPSHOT_BEHAVIORS: &[&str] = &["unique", "non-unique", "deployer"];
pub const REMOTE_CHECKSUM_POLICIES: &[&str] =
    &["generate-if-absent", "fail", "ignore-and-generate", "pass-thru"];
pub const POM_CLEANUP_POLICIES: &[&str] =
    &["discard_active_reference", "discard_any_reference", "nothing"];
pub const VCS_GIT_PROVIDERS: &[&str] =
    &["GITHUB", "BITBUCKET", "OLDSTASH", "STASH", "ARTIFACTORY", "CUSTOM"];

/// Timeouts the server stores as 32-bit integers
const MAX_TIMEOUT: i64 = i32::MAX as i64;

const ARCHITECTURES_PATTERN: &str = r"^[a-z0-9_\-]+(,[a-z0-9_\-]+)*$";

/// Fields every repository has
pub static BASE: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("base")
        .attr(
            Attr::string("key")
                .required()
                .wire("key")
                .validate(repo_key())
                .description("Identifier of the repository, immutable after creation"),
        )
        .attr(
            Attr::string("project_key")
                .wire("projectKey")
                .nullable()
                .validate(project_key())
                .description("Project to assign the repository to"),
        )
        .attr(
            Attr::string_set("project_environments")
                .optional_computed()
                .wire("environments"),
        )
        .attr(Attr::string("description").wire("description"))
        .attr(Attr::string("notes").wire("notes"))
        .attr(
            Attr::string("includes_pattern")
                .wire("includesPattern")
                .default_value("**/*"),
        )
        .attr(Attr::string("excludes_pattern").wire("excludesPattern"))
});

/// Fields shared by local and federated repositories
pub static LOCAL: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("local")
        .attr(Attr::bool("blacked_out").wire("blackedOut").default_value(false))
        .attr(Attr::bool("xray_index").wire("xrayIndex").default_value(false))
        .attr(Attr::string_set("property_sets").wire("propertySets"))
        .attr(
            Attr::bool("archive_browsing_enabled")
                .wire("archiveBrowsingEnabled")
                .default_value(false),
        )
        .attr(Attr::bool("download_direct").wire("downloadRedirect").default_value(false))
        .attr(
            Attr::bool("priority_resolution")
                .wire("priorityResolution")
                .default_value(false),
        )
        .attr(Attr::bool("cdn_redirect").wire("cdnRedirect").default_value(false))
});

/// Federation members and the federated-only switches
pub static FEDERATED: Lazy<SchemaFragment> = Lazy::new(|| {
    let member = BlockSchema::new()
        .attr(
            Attr::string("url")
                .required()
                .wire("url")
                .validate(url())
                .description("Full URL of the member repository"),
        )
        .attr(Attr::bool("enabled").required().wire("enabled"));

    SchemaFragment::new("federated")
        .attr(
            Attr::block("member", member)
                .required()
                .wire("members")
                .validate(not_empty()),
        )
        .attr(Attr::string("proxy").wire("proxy"))
        .attr(Attr::bool("disable_proxy").wire("disableProxy").default_value(false))
        .attr(
            Attr::bool("cleanup_on_delete")
                .description("Delete all federated members on destroy"),
        )
});

pub static COMPRESSION: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("compression").attr(
        Attr::string_set("index_compression_formats")
            .wire("optionalIndexCompressionFormats")
            .validate(set_subset_of(COMPRESSION_FORMATS)),
    )
});

pub static PRIMARY_KEYPAIR: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("primary_keypair")
        .attr(Attr::string("primary_keypair_ref").wire("primaryKeyPairRef"))
});

pub static SECONDARY_KEYPAIR: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("secondary_keypair")
        .attr(Attr::string("secondary_keypair_ref").wire("secondaryKeyPairRef"))
});

pub static DEBIAN: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("debian").attr(
        Attr::bool("trivial_layout")
            .wire("debianTrivialLayout")
            .default_value(false),
    )
});

/// Tag retention for Docker and OCI registries
pub static TAG_RETENTION: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("tag_retention")
        .attr(
            Attr::int("max_unique_tags")
                .wire("maxUniqueTags")
                .default_value(0i64)
                .validate(at_least(0)),
        )
        .attr(
            Attr::int("tag_retention")
                .wire("dockerTagRetention")
                .default_value(1i64)
                .validate(at_least(1)),
        )
});

pub static DOCKER: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("docker")
        .attr(
            Attr::bool("block_pushing_schema1")
                .wire("blockPushingSchema1")
                .default_value(true),
        )
        .attr(Attr::string("api_version").computed().wire("dockerApiVersion"))
});

/// Java build tool repositories, with Maven defaults
pub static JAVA: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("java")
        .attr(
            Attr::string("checksum_policy_type")
                .wire("checksumPolicyType")
                .default_value("client-checksums")
                .validate(one_of(CHECKSUM_POLICIES)),
        )
        .attr(
            Attr::string("snapshot_version_behavior")
                .wire("snapshotVersionBehavior")
                .default_value("unique")
                .validate(one_of(SNAPSHOT_BEHAVIORS)),
        )
        .attr(
            Attr::int("max_unique_snapshots")
                .wire("maxUniqueSnapshots")
                .default_value(0i64)
                .validate(at_least(0)),
        )
        .attr(Attr::bool("handle_releases").wire("handleReleases").default_value(true))
        .attr(Attr::bool("handle_snapshots").wire("handleSnapshots").default_value(true))
        .attr(
            Attr::bool("suppress_pom_consistency_checks")
                .wire("suppressPomConsistencyChecks")
                .default_value(false),
        )
});

/// Gradle, Ivy and SBT skip the POM consistency check unless asked
pub static NON_MAVEN_POM: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("non_maven_pom").attr(
        Attr::bool("suppress_pom_consistency_checks")
            .wire("suppressPomConsistencyChecks")
            .default_value(true),
    )
});

pub static RPM: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("rpm")
        .attr(
            Attr::int("yum_root_depth")
                .wire("yumRootDepth")
                .default_value(0i64)
                .validate(at_least(0)),
        )
        .attr(
            Attr::bool("calculate_yum_metadata")
                .wire("calculateYumMetadata")
                .default_value(false),
        )
        .attr(
            Attr::bool("enable_file_lists_indexing")
                .wire("enableFileListsIndexing")
                .default_value(false),
        )
        .attr(Attr::string("yum_group_file_names").wire("yumGroupFileNames"))
});

pub static CARGO: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("cargo")
        .attr(
            Attr::bool("anonymous_access")
                .wire("cargoAnonymousAccess")
                .default_value(false),
        )
        .attr(
            Attr::bool("enable_sparse_index")
                .wire("cargoInternalIndex")
                .default_value(false),
        )
});

pub static NUGET: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("nuget")
        .attr(
            Attr::int("max_unique_snapshots")
                .wire("maxUniqueSnapshots")
                .default_value(0i64)
                .validate(at_least(0)),
        )
        .attr(
            Attr::bool("force_nuget_authentication")
                .wire("forceNugetAuthentication")
                .default_value(false),
        )
});

pub static CONAN: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("conan").attr(
        Attr::bool("force_conan_authentication")
            .wire("forceConanAuthentication")
            .default_value(false),
    )
});

pub static HELM: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("helm").attr(
        Attr::bool("force_non_duplicate_chart")
            .wire("forceNonDuplicateChart")
            .default_value(false),
    )
});

/// Fields shared by every remote repository
pub static REMOTE: Lazy<SchemaFragment> = Lazy::new(|| {
    let content_synchronisation = BlockSchema::new()
        .max_items(1)
        .attr(Attr::bool("enabled").default_value(false))
        .attr(Attr::bool("statistics_enabled").default_value(false))
        .attr(Attr::bool("properties_enabled").default_value(false))
        .attr(Attr::bool("source_origin_absence_detection").default_value(false));

    SchemaFragment::new("remote")
        .attr(
            Attr::string("url")
                .required()
                .wire("url")
                .validate(url())
                .description("URL of the upstream repository"),
        )
        .attr(Attr::string("username").wire("username"))
        .attr(
            Attr::string("password")
                .write_only("password")
                .sensitive()
                .description("Never returned by the server"),
        )
        .attr(Attr::string("proxy").wire("proxy"))
        .attr(Attr::bool("disable_proxy").wire("disableProxy").default_value(false))
        .attr(Attr::string("remote_repo_layout_ref").wire("remoteRepoLayoutRef"))
        .attr(Attr::bool("hard_fail").wire("hardFail").default_value(false))
        .attr(Attr::bool("offline").wire("offline").default_value(false))
        .attr(
            Attr::bool("store_artifacts_locally")
                .wire("storeArtifactsLocally")
                .default_value(true),
        )
        .attr(
            Attr::int("socket_timeout_millis")
                .wire("socketTimeoutMillis")
                .default_value(15000i64)
                .validate(between(0, MAX_TIMEOUT)),
        )
        .attr(Attr::string("local_address").wire("localAddress"))
        .attr(
            Attr::int("retrieval_cache_period_seconds")
                .wire("retrievalCachePeriodSecs")
                .default_value(7200i64)
                .validate(at_least(0)),
        )
        .attr(
            Attr::int("missed_cache_period_seconds")
                .wire("missedRetrievalCachePeriodSecs")
                .default_value(1800i64)
                .validate(at_least(0)),
        )
        .attr(
            Attr::int("metadata_retrieval_timeout_secs")
                .wire("metadataRetrievalTimeoutSecs")
                .default_value(60i64)
                .validate(between(0, MAX_TIMEOUT)),
        )
        .attr(
            Attr::int("unused_artifacts_cleanup_period_hours")
                .wire("unusedArtifactsCleanupPeriodHours")
                .default_value(0i64)
                .validate(at_least(0)),
        )
        .attr(
            Attr::int("assumed_offline_period_secs")
                .wire("assumedOfflinePeriodSecs")
                .default_value(300i64)
                .validate(at_least(0)),
        )
        .attr(
            Attr::bool("share_configuration")
                .optional_computed()
                .wire("shareConfiguration"),
        )
        .attr(
            Attr::bool("synchronize_properties")
                .wire("synchronizeProperties")
                .default_value(false),
        )
        .attr(
            Attr::bool("block_mismatching_mime_types")
                .wire("blockMismatchingMimeTypes")
                .default_value(true),
        )
        .attr(
            Attr::bool("allow_any_host_auth")
                .wire("allowAnyHostAuth")
                .default_value(false),
        )
        .attr(
            Attr::bool("enable_cookie_management")
                .wire("enableCookieManagement")
                .default_value(false),
        )
        .attr(
            Attr::bool("bypass_head_requests")
                .wire("bypassHeadRequests")
                .default_value(false),
        )
        .attr(
            Attr::string("client_tls_certificate")
                .optional_computed()
                .wire("clientTlsCertificate"),
        )
        .attr(Attr::string("query_params").wire("queryParams"))
        .attr(
            Attr::bool("list_remote_folder_items")
                .wire("listRemoteFolderItems")
                .default_value(false),
        )
        .attr(
            Attr::string("mismatching_mime_types_override_list")
                .wire("mismatchingMimeTypesOverrideList"),
        )
        .attr(
            Attr::bool("disable_url_normalization")
                .wire("disableUrlNormalization")
                .default_value(false),
        )
        .attr(Attr::block("content_synchronisation", content_synchronisation).custom())
});

/// Remote dependency rewriting for registries that embed upstream references
pub static EXTERNAL_DEPENDENCIES: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("external_dependencies")
        .attr(
            Attr::bool("external_dependencies_enabled")
                .wire("externalDependenciesEnabled")
                .default_value(false),
        )
        .attr(
            Attr::string_list("external_dependencies_patterns")
                .wire("externalDependenciesPatterns"),
        )
});

pub static REMOTE_DOCKER: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("remote_docker")
        .attr(
            Attr::bool("enable_token_authentication")
                .wire("enableTokenAuthentication")
                .default_value(true),
        )
        .attr(
            Attr::bool("block_pushing_schema1")
                .wire("blockPushingSchema1")
                .default_value(true),
        )
});

/// Remote Java repositories, with Maven defaults
pub static REMOTE_JAVA: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("remote_java")
        .attr(
            Attr::bool("fetch_jars_eagerly")
                .wire("fetchJarsEagerly")
                .default_value(false),
        )
        .attr(
            Attr::bool("fetch_sources_eagerly")
                .wire("fetchSourcesEagerly")
                .default_value(false),
        )
        .attr(
            Attr::string("remote_repo_checksum_policy_type")
                .wire("remoteRepoChecksumPolicyType")
                .default_value("generate-if-absent")
                .validate(one_of(REMOTE_CHECKSUM_POLICIES)),
        )
        .attr(
            Attr::int("max_unique_snapshots")
                .wire("maxUniqueSnapshots")
                .default_value(0i64)
                .validate(at_least(0)),
        )
        .attr(Attr::bool("handle_releases").wire("handleReleases").default_value(true))
        .attr(Attr::bool("handle_snapshots").wire("handleSnapshots").default_value(true))
        .attr(
            Attr::bool("suppress_pom_consistency_checks")
                .wire("suppressPomConsistencyChecks")
                .default_value(false),
        )
        .attr(
            Attr::bool("reject_invalid_jars")
                .wire("rejectInvalidJars")
                .default_value(false),
        )
});

pub static REMOTE_PYPI: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("remote_pypi")
        .attr(
            Attr::string("pypi_registry_url")
                .wire("pyPIRegistryUrl")
                .default_value("https://pypi.org")
                .validate(url()),
        )
        .attr(
            Attr::string("pypi_repository_suffix")
                .wire("pyPIRepositorySuffix")
                .default_value("simple"),
        )
});

pub static REMOTE_HELM: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("remote_helm")
        .attr(Attr::string("helm_charts_base_url").wire("chartsBaseUrl"))
});

pub static REMOTE_CARGO: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("remote_cargo").attr(
        Attr::string("git_registry_url")
            .wire("gitRegistryUrl")
            .validate(url()),
    )
});

/// Remote repositories resolving packages from VCS hosts
pub static REMOTE_VCS: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("remote_vcs")
        .attr(
            Attr::string("vcs_git_provider")
                .wire("vcsGitProvider")
                .default_value("ARTIFACTORY")
                .validate(one_of(VCS_GIT_PROVIDERS)),
        )
        .attr(Attr::string("vcs_git_download_url").wire("vcsGitDownloadUrl"))
});

pub static REMOTE_NUGET: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("remote_nuget")
        .attr(
            Attr::string("feed_context_path")
                .wire("feedContextPath")
                .default_value("api/v2"),
        )
        .attr(
            Attr::string("download_context_path")
                .wire("downloadContextPath")
                .default_value("api/v2/package"),
        )
        .attr(Attr::string("v3_feed_url").wire("v3FeedUrl"))
        .attr(
            Attr::bool("force_nuget_authentication")
                .wire("forceNugetAuthentication")
                .default_value(false),
        )
});

pub static REMOTE_COMPOSER: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("remote_composer").attr(
        Attr::string("composer_registry_url")
            .wire("composerRegistryUrl")
            .default_value("https://packagist.org")
            .validate(url()),
    )
});

pub static REMOTE_GENERIC: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("remote_generic").attr(
        Attr::bool("propagate_query_params")
            .wire("propagateQueryParams")
            .default_value(false),
    )
});

/// Fields shared by every virtual repository
pub static VIRTUAL: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("virtual")
        .attr(
            Attr::string_list("repositories")
                .wire("repositories")
                .description("Aggregated repositories, in resolution order"),
        )
        .attr(Attr::string("default_deployment_repo").wire("defaultDeploymentRepo"))
        .attr(
            Attr::bool("artifactory_requests_can_retrieve_remote_artifacts")
                .wire("artifactoryRequestsCanRetrieveRemoteArtifacts")
                .default_value(false),
        )
});

/// Metadata cache for virtual repositories that compute their own index
pub static VIRTUAL_CACHE: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("virtual_cache").attr(
        Attr::int("retrieval_cache_period_seconds")
            .wire("virtualRetrievalCachePeriodSecs")
            .default_value(7200i64)
            .validate(at_least(0)),
    )
});

pub static VIRTUAL_JAVA: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("virtual_java")
        .attr(
            Attr::string("pom_repository_references_cleanup_policy")
                .wire("pomRepositoryReferencesCleanupPolicy")
                .default_value("discard_active_reference")
                .validate(one_of(POM_CLEANUP_POLICIES)),
        )
        .attr(
            Attr::bool("force_maven_authentication")
                .wire("forceMavenAuthentication")
                .default_value(false),
        )
        .attr(Attr::string("key_pair").wire("keyPair"))
});

pub static VIRTUAL_DOCKER: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("virtual_docker").attr(
        Attr::bool("resolve_docker_tags_by_timestamp")
            .wire("resolveDockerTagsByTimestamp")
            .default_value(false),
    )
});

pub static VIRTUAL_DEBIAN: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("virtual_debian").attr(
        Attr::string("debian_default_architectures")
            .wire("debianDefaultArchitectures")
            .default_value("amd64,i386")
            .validate(matches(
                ARCHITECTURES_PATTERN,
                "must be a comma separated list of architectures",
            )),
    )
});

pub static VIRTUAL_HELM: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("virtual_helm").attr(
        Attr::bool("use_namespaces")
            .wire("useNamespaces")
            .default_value(false),
    )
});

pub static VIRTUAL_NUGET: Lazy<SchemaFragment> = Lazy::new(|| {
    SchemaFragment::new("virtual_nuget").attr(
        Attr::bool("force_nuget_authentication")
            .wire("forceNugetAuthentication")
            .default_value(false),
    )
});

#[cfg(test)]
mod tests {
    use super::*;
    use artirepo_core::{check_consistency, Presence, Value, WireBinding};

    fn default_of(fragment: &SchemaFragment, name: &str) -> Option<Value> {
        fragment.get(name).and_then(|d| d.default.clone())
    }

    #[test]
    fn test_java_defaults_by_tool() {
        assert_eq!(
            default_of(&JAVA, "suppress_pom_consistency_checks"),
            Some(Value::Bool(false))
        );
        assert_eq!(
            default_of(&NON_MAVEN_POM, "suppress_pom_consistency_checks"),
            Some(Value::Bool(true))
        );
    }

    #[test]
    fn test_docker_tag_retention_default() {
        assert_eq!(default_of(&TAG_RETENTION, "tag_retention"), Some(Value::Int(1)));
        assert_eq!(default_of(&TAG_RETENTION, "max_unique_tags"), Some(Value::Int(0)));
    }

    #[test]
    fn test_remote_password_is_write_only() {
        let password = REMOTE.get("password").unwrap();

        assert_eq!(password.wire, WireBinding::WriteOnly("password".to_string()));
        assert!(password.sensitive);
    }

    #[test]
    fn test_federated_members_required() {
        let member = FEDERATED.get("member").unwrap();

        assert_eq!(member.presence, Presence::Required);
        assert_eq!(
            FEDERATED.get("cleanup_on_delete").unwrap().wire,
            WireBinding::ConfigOnly
        );
    }

    #[test]
    fn test_bounded_and_patterned_values() {
        let check = |fragment: &SchemaFragment, name: &str, value: Value| {
            fragment
                .get(name)
                .unwrap()
                .validators
                .iter()
                .find_map(|v| v.check(&value))
        };

        assert!(check(&REMOTE, "socket_timeout_millis", Value::Int(15000)).is_none());
        assert!(check(&REMOTE, "socket_timeout_millis", Value::Int(1 << 40)).is_some());
        assert!(check(&VIRTUAL_DEBIAN, "debian_default_architectures", Value::from("amd64,arm64")).is_none());
        assert!(check(&VIRTUAL_DEBIAN, "debian_default_architectures", Value::from("amd64, arm64")).is_some());
    }

    #[test]
    fn test_overlapping_fragments_are_compatible() {
        assert!(check_consistency("java", &[&*BASE, &*LOCAL, &*JAVA, &*NON_MAVEN_POM]).is_ok());
        assert!(check_consistency("remote_java", &[&*BASE, &*REMOTE, &*REMOTE_JAVA, &*NON_MAVEN_POM]).is_ok());
        assert!(check_consistency("docker", &[&*REMOTE, &*REMOTE_DOCKER, &*DOCKER]).is_ok());
    }
}
