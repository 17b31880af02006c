//! Upgrading persisted state written by older schema versions

use artirepo_core::Value;
use artirepo_engine::{SchemaRegistry, StoredState};
use proptest::prelude::*;
use serde_json::{json, Map, Value as JsonValue};

fn legacy_state(formats: &[&str], xray: Option<bool>) -> StoredState {
    let mut attributes = Map::new();
    attributes.insert("key".into(), json!("deb-legacy"));
    attributes.insert("index_compression_formats".into(), json!(formats));
    if let Some(xray) = xray {
        attributes.insert("xray_index".into(), json!(xray));
    }
    StoredState {
        schema_version: 0,
        attributes: JsonValue::Object(attributes),
    }
}

#[test]
fn local_state_from_version_zero() {
    let registry = SchemaRegistry::builtin();
    let debian = registry.get("local:debian").unwrap();

    let cfg = debian.migrate(&legacy_state(&["xz", "bz2", "xz"], None)).unwrap();

    assert_eq!(
        cfg.get("index_compression_formats"),
        Some(&Value::string_set(["bz2", "xz"]))
    );
    assert_eq!(cfg.get_bool("xray_index"), Some(false));
}

#[test]
fn federated_state_renames_members() {
    let registry = SchemaRegistry::builtin();
    let federated = registry.get("federated:generic").unwrap();
    let state = StoredState {
        schema_version: 0,
        attributes: json!({
            "key": "fed",
            "members": [{"url": "https://a.example.com/artifactory/fed", "enabled": true}],
            "cleanup_on_delete": "true"
        }),
    };

    let upgraded = federated.upgrade_state(&state).unwrap();

    assert_eq!(upgraded.schema_version, 1);
    assert_eq!(upgraded.attributes["cleanup_on_delete"], json!(true));
    assert_eq!(
        upgraded.attributes["member"],
        json!([{"url": "https://a.example.com/artifactory/fed", "enabled": true}])
    );
    assert!(upgraded.attributes.get("members").is_none());
}

#[test]
fn remote_state_parses_timeouts() {
    let registry = SchemaRegistry::builtin();
    let remote = registry.get("remote:npm").unwrap();
    let state = StoredState {
        schema_version: 0,
        attributes: json!({
            "key": "npmjs",
            "url": "https://registry.npmjs.org",
            "socket_timeout_millis": "15000",
            "missed_retrieval_cache_period_seconds": "1800"
        }),
    };

    let cfg = remote.migrate(&state).unwrap();

    assert_eq!(cfg.get_int("socket_timeout_millis"), Some(15000));
    assert_eq!(cfg.get_int("missed_cache_period_seconds"), Some(1800));
    assert!(!cfg.contains("missed_retrieval_cache_period_seconds"));
}

#[test]
fn state_from_a_newer_schema_is_rejected() {
    let registry = SchemaRegistry::builtin();
    let debian = registry.get("local:debian").unwrap();
    let state = StoredState {
        schema_version: 9,
        attributes: json!({"key": "deb"}),
    };

    let err = debian.migrate(&state).unwrap_err();

    assert!(err.to_string().contains("from version 9"));
}

#[test]
fn stored_state_serializes_camel_case() {
    let state = legacy_state(&[], Some(true));

    let json = serde_json::to_value(&state).unwrap();

    assert_eq!(json["schemaVersion"], json!(0));
    assert_eq!(json["attributes"]["xray_index"], json!(true));
}

proptest! {
    #[test]
    fn upgrading_is_idempotent(
        formats in proptest::collection::vec(prop::sample::select(vec!["bz2", "lzma", "xz"]), 0..6),
        xray in proptest::option::of(any::<bool>()),
    ) {
        let registry = SchemaRegistry::builtin();
        let debian = registry.get("local:debian").unwrap();
        let state = legacy_state(&formats, xray);

        let once = debian.upgrade_state(&state).unwrap();
        let twice = debian.upgrade_state(&once).unwrap();

        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(debian.migrate(&state).unwrap(), debian.migrate(&once).unwrap());
    }
}
