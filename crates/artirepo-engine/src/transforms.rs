//! Custom pack and unpack transforms
//!
//! These cover the attributes whose wire shape the generic passes cannot
//! express: federation members, the remote content synchronisation object
//! and constant fields.

use artirepo_core::{ConfigurationModel, Value, WireModel};
use serde_json::{json, Map, Value as JsonValue};

use crate::pack::PackTransform;
use crate::unpack::UnpackTransform;

/// Federation members, sorted by URL
pub const PACK_MEMBERS: PackTransform = PackTransform {
    name: "members",
    apply: pack_members,
};

/// Remote content synchronisation object to its flat block
pub const PACK_CONTENT_SYNCHRONISATION: PackTransform = PackTransform {
    name: "content_synchronisation",
    apply: pack_content_synchronisation,
};

/// Docker API version, always `V2`
pub const PACK_DOCKER_API_VERSION: PackTransform = PackTransform {
    name: "api_version",
    apply: pack_docker_api_version,
};

/// Flat content synchronisation block to its nested wire object
pub const UNPACK_CONTENT_SYNCHRONISATION: UnpackTransform = UnpackTransform {
    name: "content_synchronisation",
    apply: unpack_content_synchronisation,
};

pub const DOCKER_API_VERSION: &str = "V2";

fn pack_members(wire: &WireModel, config: &mut ConfigurationModel) -> Result<(), String> {
    let members = match wire.get("members") {
        None | Some(JsonValue::Null) => return Ok(()),
        Some(JsonValue::Array(members)) => members,
        Some(other) => return Err(format!("members must be an array, got {}", other)),
    };

    let mut blocks = Vec::with_capacity(members.len());
    for (i, member) in members.iter().enumerate() {
        let url = member
            .get("url")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| format!("member {} has no url", i))?;
        let enabled = member
            .get("enabled")
            .and_then(JsonValue::as_bool)
            .ok_or_else(|| format!("member {} ({}) has no enabled flag", i, url))?;
        blocks.push(
            ConfigurationModel::new()
                .with("url", url)
                .with("enabled", enabled),
        );
    }
    blocks.sort_by(|a, b| a.get_str("url").cmp(&b.get_str("url")));

    config.set("member", Value::Blocks(blocks));
    Ok(())
}

fn pack_content_synchronisation(
    wire: &WireModel,
    config: &mut ConfigurationModel,
) -> Result<(), String> {
    let sync = match wire.get("contentSynchronisation") {
        None | Some(JsonValue::Null) => return Ok(()),
        Some(JsonValue::Object(sync)) => sync,
        Some(other) => {
            return Err(format!(
                "contentSynchronisation must be an object, got {}",
                other
            ))
        }
    };

    let flag = |path: &[&str]| -> Result<bool, String> {
        let mut current = sync.get(path[0]);
        for segment in &path[1..] {
            current = current.and_then(|v| v.get(*segment));
        }
        match current {
            None | Some(JsonValue::Null) => Ok(false),
            Some(JsonValue::Bool(b)) => Ok(*b),
            Some(other) => Err(format!("{} must be a bool, got {}", path.join("."), other)),
        }
    };

    let block = ConfigurationModel::new()
        .with("enabled", flag(&["enabled"])?)
        .with("statistics_enabled", flag(&["statistics", "enabled"])?)
        .with("properties_enabled", flag(&["properties", "enabled"])?)
        .with(
            "source_origin_absence_detection",
            flag(&["source", "originAbsenceDetection"])?,
        );

    config.set("content_synchronisation", Value::Blocks(vec![block]));
    Ok(())
}

fn pack_docker_api_version(_wire: &WireModel, config: &mut ConfigurationModel) -> Result<(), String> {
    config.set("api_version", DOCKER_API_VERSION);
    Ok(())
}

fn unpack_content_synchronisation(
    config: &ConfigurationModel,
    wire: &mut WireModel,
) -> Result<(), String> {
    let Some(value) = config.get("content_synchronisation") else {
        return Ok(());
    };
    let blocks = value
        .as_blocks()
        .ok_or_else(|| format!("expected nested block, got {}", value.kind_name()))?;
    let Some(block) = blocks.first() else {
        return Ok(());
    };
    if blocks.len() > 1 {
        return Err("at most one content_synchronisation block is allowed".to_string());
    }

    let flag = |name: &str| block.get_bool(name).unwrap_or(false);
    let mut sync = Map::new();
    sync.insert("enabled".into(), json!(flag("enabled")));
    sync.insert("statistics".into(), json!({"enabled": flag("statistics_enabled")}));
    sync.insert("properties".into(), json!({"enabled": flag("properties_enabled")}));
    sync.insert(
        "source".into(),
        json!({"originAbsenceDetection": flag("source_origin_absence_detection")}),
    );

    wire.set("contentSynchronisation", JsonValue::Object(sync))
        .map_err(|e| e.to_string())
}
