//! End-to-end pack/unpack behavior of built-in repository variants

use artirepo_core::{AttributeKind, ConfigurationModel, Presence, Value, WireModel};
use artirepo_engine::predicate::ignore;
use artirepo_engine::{EngineError, Packer, RepositoryResource, SchemaRegistry};
use serde_json::{json, Map, Value as JsonValue};

fn registry() -> SchemaRegistry {
    SchemaRegistry::builtin()
}

/// Every field of `original` must come back; anything extra must be a default or an unset marker
fn assert_reproduces(resource: &RepositoryResource, original: &WireModel, unpacked: &WireModel) {
    for (field, value) in original.iter_fields() {
        assert_eq!(
            unpacked.get(&field).as_ref(),
            Some(&value),
            "{}: field {} not reproduced",
            resource.variant(),
            field
        );
    }
    for (field, value) in unpacked.iter_fields() {
        if original.get(&field).is_some() {
            continue;
        }
        let expected = resource
            .schema()
            .attributes()
            .find(|d| d.wire.wire_name() == Some(field.as_str()))
            .and_then(|d| d.default.clone().or_else(|| d.unset_value()))
            .map(|v| v.to_json());
        assert_eq!(
            expected.as_ref(),
            Some(&value),
            "{}: extra field {} is not a default",
            resource.variant(),
            field
        );
    }
}

#[test]
fn debian_wire_packs_and_unpacks() {
    let registry = registry();
    let debian = registry.get("local:debian").unwrap();
    let body = json!({
        "key": "my-repo",
        "rclass": "local",
        "packageType": "debian",
        "debianTrivialLayout": true,
        "optionalIndexCompressionFormats": ["bz2", "xz"]
    });
    let wire = debian.decode_wire(&body).unwrap();

    let cfg = debian.pack(&wire).unwrap();

    assert_eq!(cfg.get_str("key"), Some("my-repo"));
    assert_eq!(cfg.get_bool("trivial_layout"), Some(true));
    assert_eq!(
        cfg.get("index_compression_formats"),
        Some(&Value::string_set(["bz2", "xz"]))
    );
    assert!(!cfg.contains("rclass"));

    let unpacked = debian.unpack(&cfg).unwrap();
    assert_reproduces(debian, &wire, &unpacked);
    assert_eq!(unpacked.get("repoLayoutRef"), Some(json!("simple-default")));
}

#[test]
fn docker_tag_retention_defaults_to_one() {
    let registry = registry();
    let docker = registry.get("local:docker").unwrap();
    let cfg = ConfigurationModel::new().with("key", "images");

    let wire = docker.unpack(&cfg).unwrap();

    assert_eq!(wire.get("dockerTagRetention"), Some(json!(1)));
    assert_eq!(wire.get("maxUniqueTags"), Some(json!(0)));
    assert_eq!(wire.get("blockPushingSchema1"), Some(json!(true)));
    assert_eq!(wire.get("dockerApiVersion"), Some(json!("V2")));
}

#[test]
fn docker_api_version_is_always_v2() {
    let registry = registry();
    let docker = registry.get("local:docker").unwrap();
    let wire = docker
        .decode_wire(&json!({"key": "images", "dockerApiVersion": "V1"}))
        .unwrap();

    let cfg = docker.pack(&wire).unwrap();

    assert_eq!(cfg.get_str("api_version"), Some("V2"));
}

#[test]
fn empty_set_and_absent_set_differ() {
    let registry = registry();
    let alpine = registry.get("local:alpine").unwrap();

    let explicit = ConfigurationModel::new()
        .with("key", "apk")
        .with("index_compression_formats", Value::string_set(Vec::<String>::new()));
    let wire = alpine.unpack(&explicit).unwrap();
    assert_eq!(wire.get("optionalIndexCompressionFormats"), Some(json!([])));

    let absent = ConfigurationModel::new().with("key", "apk");
    let wire = alpine.unpack(&absent).unwrap();
    assert_eq!(wire.get("optionalIndexCompressionFormats"), None);
}

#[test]
fn sets_are_sorted_on_the_wire() {
    let registry = registry();
    let alpine = registry.get("local:alpine").unwrap();
    let cfg = ConfigurationModel::new()
        .with("key", "apk")
        .with("property_sets", Value::string_set(["security", "artifactory"]));

    let wire = alpine.unpack(&cfg).unwrap();

    assert_eq!(wire.get("propertySets"), Some(json!(["artifactory", "security"])));
}

#[test]
fn virtual_repositories_keep_order() {
    let registry = registry();
    let npm = registry.get("virtual:npm").unwrap();
    let cfg = ConfigurationModel::new()
        .with("key", "npm-all")
        .with("repositories", Value::string_list(["npm-local", "npmjs-remote"]));

    let wire = npm.unpack(&cfg).unwrap();
    assert_eq!(wire.get("repositories"), Some(json!(["npm-local", "npmjs-remote"])));

    let packed = npm.pack(&wire).unwrap();
    assert_eq!(
        packed.get("repositories"),
        Some(&Value::string_list(["npm-local", "npmjs-remote"]))
    );
}

#[test]
fn federated_members_come_only_from_the_transform() {
    let registry = registry();
    let federated = registry.get("federated:generic").unwrap();
    let wire = federated
        .decode_wire(&json!({
            "key": "fed",
            "members": [
                {"url": "https://z.example.com/artifactory/fed", "enabled": true},
                {"url": "https://a.example.com/artifactory/fed", "enabled": true}
            ]
        }))
        .unwrap();

    // The universal pass alone keeps wire order, so sorted output proves the transform ran
    let universal_only = Packer::universal(ignore(&[])).pack(federated.schema(), &wire).unwrap();
    let first_url = |cfg: &ConfigurationModel| {
        cfg.get("member")
            .and_then(Value::as_blocks)
            .and_then(|m| m.first())
            .and_then(|m| m.get_str("url").map(str::to_string))
    };
    assert_eq!(
        first_url(&universal_only).as_deref(),
        Some("https://z.example.com/artifactory/fed")
    );

    let ignored = Packer::universal(ignore(&["member"])).pack(federated.schema(), &wire).unwrap();
    assert!(!ignored.contains("member"));

    let cfg = federated.pack(&wire).unwrap();
    assert_eq!(first_url(&cfg).as_deref(), Some("https://a.example.com/artifactory/fed"));
}

#[test]
fn federated_malformed_member_aborts_pack() {
    let registry = registry();
    let federated = registry.get("federated:generic").unwrap();
    let wire = federated
        .decode_wire(&json!({"key": "fed", "members": [{"url": "https://a.example.com"}]}))
        .unwrap();
    let mut prior = ConfigurationModel::new()
        .with("key", "fed")
        .with("cleanup_on_delete", true);
    let before = prior.clone();

    assert!(federated.pack_into(&wire, &mut prior).is_err());
    assert_eq!(prior, before);
}

#[test]
fn federated_unpack_requires_members() {
    let registry = registry();
    let federated = registry.get("federated:generic").unwrap();
    let cfg = ConfigurationModel::new()
        .with("key", "fed")
        .with("cleanup_on_delete", true);

    let err = federated.unpack(&cfg).unwrap_err();

    assert!(matches!(
        err,
        EngineError::Unpack { ref attribute, ref message, .. }
            if attribute == "member" && message == "required attribute is missing"
    ));
    assert!(federated.validate(&cfg).is_err());
}

#[test]
fn remote_password_and_content_sync() {
    let registry = registry();
    let remote = registry.get("remote:maven").unwrap();
    let cfg = ConfigurationModel::new()
        .with("key", "central")
        .with("url", "https://repo1.maven.org/maven2")
        .with("password", "s3cret")
        .with(
            "content_synchronisation",
            Value::Blocks(vec![ConfigurationModel::new().with("enabled", true)]),
        );

    let wire = remote.unpack(&cfg).unwrap();
    assert_eq!(wire.get("password"), Some(json!("s3cret")));
    assert_eq!(wire.get("remoteRepoChecksumPolicyType"), Some(json!("generate-if-absent")));
    assert_eq!(
        wire.get("contentSynchronisation"),
        Some(json!({
            "enabled": true,
            "statistics": {"enabled": false},
            "properties": {"enabled": false},
            "source": {"originAbsenceDetection": false}
        }))
    );

    // The server never echoes the password
    let mut response = wire.clone();
    response.remove("password");
    let mut state = cfg.clone();
    remote.pack_into(&response, &mut state).unwrap();

    assert_eq!(state.get_str("password"), Some("s3cret"));
    assert_eq!(state.get_str("url"), Some("https://repo1.maven.org/maven2"));
    let sync = &state
        .get("content_synchronisation")
        .and_then(Value::as_blocks)
        .unwrap()[0];
    assert_eq!(sync.get_bool("enabled"), Some(true));
}

#[test]
fn later_fragment_overrides_java_default() {
    let registry = registry();

    let default_of = |key: &str| {
        registry
            .get(key)
            .unwrap()
            .schema()
            .get("suppress_pom_consistency_checks")
            .and_then(|d| d.default.clone())
    };

    assert_eq!(default_of("local:maven"), Some(Value::Bool(false)));
    assert_eq!(default_of("local:gradle"), Some(Value::Bool(true)));
    assert_eq!(default_of("remote:sbt"), Some(Value::Bool(true)));
}

#[test]
fn unpack_requires_required_attributes() {
    let registry = registry();
    let remote = registry.get("remote:generic").unwrap();

    let err = remote
        .unpack(&ConfigurationModel::new().with("key", "upstream"))
        .unwrap_err();

    assert!(err.to_string().contains("`url`"));
}

fn sample_json(kind: &AttributeKind) -> Option<JsonValue> {
    match kind {
        AttributeKind::String => Some(json!("sample")),
        AttributeKind::Bool => Some(json!(true)),
        AttributeKind::Int => Some(json!(3)),
        AttributeKind::StringSet => Some(json!(["a", "b"])),
        AttributeKind::StringList => Some(json!(["b", "a"])),
        AttributeKind::NestedBlock(block) => {
            let mut obj = Map::new();
            for nested in block.attributes().values() {
                let field = nested.wire.readable_name()?;
                obj.insert(field.to_string(), sample_json(&nested.kind)?);
            }
            Some(json!([obj]))
        }
    }
}

#[test]
fn every_variant_roundtrips_bound_fields() {
    let registry = registry();

    for resource in registry.iter() {
        let mut wire = resource.new_wire_model("sample-repo");
        for definition in resource.schema().attributes() {
            if definition.presence == Presence::Computed || definition.name == "key" {
                continue;
            }
            let Some(field) = definition.wire.readable_name() else {
                continue;
            };
            if let Some(value) = sample_json(&definition.kind) {
                wire.set(field, value).unwrap();
            }
        }

        let cfg = resource.pack(&wire).unwrap();
        let unpacked = resource.unpack(&cfg).unwrap();

        assert_reproduces(resource, &wire, &unpacked);
    }
}
