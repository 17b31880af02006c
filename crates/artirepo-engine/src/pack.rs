//! Wire model to configuration model
//!
//! Packing is a two-stage projection. The universal pass visits every wire
//! field, names it by the schema attribute bound to it, filters it through
//! the packer's predicate and copies it when an attribute binds it. A zero
//! value for an optional scalar without a default reads as unset. Custom
//! transforms then run in order and may overwrite or add attributes.

use artirepo_core::{
    json_kind, AttributeDefinition, AttributeKind, BlockSchema, ComposedSchema,
    ConfigurationModel, Value, WireBinding, WireModel,
};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use tracing::{debug, trace};

use crate::error::{EngineError, Result};
use crate::predicate::{self, Predicate};

pub type PackFn = fn(&WireModel, &mut ConfigurationModel) -> std::result::Result<(), String>;

/// A named wire-to-configuration transform
#[derive(Clone, Copy)]
pub struct PackTransform {
    pub name: &'static str,
    pub apply: PackFn,
}

impl std::fmt::Debug for PackTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PackTransform").field(&self.name).finish()
    }
}

/// Universal predicate pass followed by ordered custom transforms
#[derive(Debug, Clone)]
pub struct Packer {
    predicate: Predicate,
    transforms: Vec<PackTransform>,
}

impl Default for Packer {
    fn default() -> Self {
        Self::universal(Predicate::always())
    }
}

impl Packer {
    /// Packer whose universal pass keeps fields accepted by `filter`
    ///
    /// Class fields are always dropped.
    pub fn universal(filter: Predicate) -> Self {
        Self {
            predicate: predicate::all([predicate::no_class(), filter]),
            transforms: Vec::new(),
        }
    }

    /// Append a transform; transforms run after the universal pass, in insertion order
    pub fn then(mut self, transform: PackTransform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn transforms(&self) -> &[PackTransform] {
        &self.transforms
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn pack(&self, schema: &ComposedSchema, wire: &WireModel) -> Result<ConfigurationModel> {
        let mut config = ConfigurationModel::new();
        let variant = schema.variant().key();

        for (field, value) in wire.iter_fields() {
            if value.is_null() {
                continue;
            }
            let definition = schema.by_wire_name(&field);
            let name = definition.map(|d| d.name.as_str()).unwrap_or(field.as_str());

            if !self.predicate.test(name, &value) {
                trace!(variant = %variant, field = %field, "field excluded by predicate");
                continue;
            }
            let Some(definition) = definition else {
                trace!(variant = %variant, field = %field, "no attribute bound to wire field");
                continue;
            };

            let decoded = decode(definition, &value).map_err(|message| EngineError::PackDecode {
                variant: variant.clone(),
                field: field.clone(),
                message,
            })?;
            if definition.is_unset(&decoded) {
                trace!(variant = %variant, field = %field, "zero value read as unset");
                continue;
            }
            config.set(definition.name.clone(), decoded);
        }

        for transform in &self.transforms {
            (transform.apply)(wire, &mut config).map_err(|message| EngineError::PackTransform {
                variant: variant.clone(),
                transform: transform.name.to_string(),
                message,
            })?;
        }

        debug!(variant = %variant, key = wire.key(), attributes = config.len(), "packed wire model");
        Ok(config)
    }

    /// Pack into an existing state, replacing it only on success
    ///
    /// Attributes the server never returns (write-only and configuration-only)
    /// are carried over from `prior`. Wire-bound attributes the server no
    /// longer reports are dropped.
    pub fn pack_into(
        &self,
        schema: &ComposedSchema,
        wire: &WireModel,
        prior: &mut ConfigurationModel,
    ) -> Result<()> {
        let mut config = self.pack(schema, wire)?;

        for definition in schema.attributes() {
            if !matches!(definition.wire, WireBinding::WriteOnly(_) | WireBinding::ConfigOnly) {
                continue;
            }
            if let Some(value) = prior.get(&definition.name) {
                debug!(attribute = %definition.name, "keeping value the server does not return");
                config.set(definition.name.clone(), value.clone());
            }
        }

        *prior = config;
        Ok(())
    }
}

/// Pack with the default universal pass filtered by extra predicates
pub fn pack(
    schema: &ComposedSchema,
    wire: &WireModel,
    predicates: &[Predicate],
) -> Result<ConfigurationModel> {
    Packer::universal(predicate::all(predicates.iter().cloned())).pack(schema, wire)
}

/// Decode a wire value for an attribute
pub fn decode(definition: &AttributeDefinition, json: &JsonValue) -> std::result::Result<Value, String> {
    let mismatch = || {
        format!(
            "expected {} for `{}`, got {}",
            definition.kind.name(),
            definition.name,
            json_kind(json)
        )
    };

    match (&definition.kind, json) {
        (AttributeKind::String, JsonValue::String(s)) => Ok(Value::String(s.clone())),
        (AttributeKind::Bool, JsonValue::Bool(b)) => Ok(Value::Bool(*b)),
        (AttributeKind::Int, JsonValue::Number(n)) => n.as_i64().map(Value::Int).ok_or_else(mismatch),
        (AttributeKind::StringSet, JsonValue::Array(items)) => {
            let set: Option<BTreeSet<String>> =
                items.iter().map(|i| i.as_str().map(str::to_string)).collect();
            set.map(Value::StringSet).ok_or_else(mismatch)
        }
        (AttributeKind::StringList, JsonValue::Array(items)) => {
            let list: Option<Vec<String>> =
                items.iter().map(|i| i.as_str().map(str::to_string)).collect();
            list.map(Value::StringList).ok_or_else(mismatch)
        }
        (AttributeKind::NestedBlock(block), JsonValue::Array(items)) => items
            .iter()
            .map(|item| decode_block(block, item))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Blocks),
        (AttributeKind::NestedBlock(block), JsonValue::Object(_)) => {
            decode_block(block, json).map(|b| Value::Blocks(vec![b]))
        }
        _ => Err(mismatch()),
    }
}

fn decode_block(block: &BlockSchema, json: &JsonValue) -> std::result::Result<ConfigurationModel, String> {
    let obj = json
        .as_object()
        .ok_or_else(|| format!("expected object, got {}", json_kind(json)))?;

    let mut model = ConfigurationModel::new();
    for definition in block.attributes().values() {
        let Some(field) = definition.wire.readable_name() else {
            continue;
        };
        match obj.get(field) {
            None | Some(JsonValue::Null) => {}
            Some(value) => {
                let decoded = decode(definition, value)?;
                if !definition.is_unset(&decoded) {
                    model.set(definition.name.clone(), decoded);
                }
            }
        }
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::ignore;
    use artirepo_core::{
        compose, AttributeDefinition, PackageType, Rclass, RepoVariant, SchemaFragment,
    };
    use serde_json::json;

    fn schema() -> ComposedSchema {
        let fragment = SchemaFragment::new("test")
            .attr(AttributeDefinition::string("key").required().wire("key"))
            .attr(AttributeDefinition::string("description").wire("description"))
            .attr(AttributeDefinition::bool("offline").wire("offline").default_value(false))
            .attr(AttributeDefinition::string_set("property_sets").wire("propertySets"))
            .attr(AttributeDefinition::string("password").write_only("password"))
            .attr(AttributeDefinition::bool("cleanup_on_delete"));
        compose(RepoVariant::new(Rclass::Remote, PackageType::Generic), &[&fragment])
    }

    fn wire(fields: JsonValue) -> WireModel {
        WireModel::decode(RepoVariant::new(Rclass::Remote, PackageType::Generic), &fields).unwrap()
    }

    #[test]
    fn test_pack_copies_bound_fields() {
        let w = wire(json!({
            "key": "upstream",
            "rclass": "remote",
            "offline": false,
            "propertySets": ["b", "a"],
            "description": null,
            "somethingNew": 42
        }));

        let cfg = pack(&schema(), &w, &[]).unwrap();

        assert_eq!(cfg.get_str("key"), Some("upstream"));
        assert_eq!(cfg.get_bool("offline"), Some(false));
        assert_eq!(cfg.get("property_sets"), Some(&Value::string_set(["a", "b"])));
        assert!(!cfg.contains("description"));
        assert_eq!(cfg.len(), 3);
    }

    #[test]
    fn test_pack_reads_zero_value_as_unset() {
        let w = wire(json!({"key": "upstream", "description": "", "offline": false}));

        let cfg = pack(&schema(), &w, &[]).unwrap();

        assert!(!cfg.contains("description"));
        // Defaulted attributes keep an explicit zero
        assert_eq!(cfg.get_bool("offline"), Some(false));
    }

    #[test]
    fn test_pack_predicates_see_attribute_names() {
        let w = wire(json!({"key": "upstream", "offline": true}));

        let cfg = pack(&schema(), &w, &[ignore(&["offline"])]).unwrap();
        assert!(!cfg.contains("offline"));

        // The wire name is not what predicates are matched against
        let cfg = pack(&schema(), &w, &[ignore(&["propertySets"])]).unwrap();
        assert!(cfg.contains("key"));
    }

    #[test]
    fn test_pack_decode_error() {
        let w = wire(json!({"key": "upstream", "offline": "yes"}));

        let err = pack(&schema(), &w, &[]).unwrap_err();
        assert!(matches!(err, EngineError::PackDecode { ref field, .. } if field == "offline"));
    }

    #[test]
    fn test_transforms_run_after_universal_pass() {
        fn offline_flag(_wire: &WireModel, cfg: &mut ConfigurationModel) -> std::result::Result<(), String> {
            // Sees the universal pass output and overwrites it
            let seen = cfg.get_bool("offline").ok_or("offline not packed yet")?;
            cfg.set("offline", !seen);
            Ok(())
        }

        let packer = Packer::universal(Predicate::always()).then(PackTransform {
            name: "offline_flag",
            apply: offline_flag,
        });
        let cfg = packer
            .pack(&schema(), &wire(json!({"key": "upstream", "offline": true})))
            .unwrap();

        assert_eq!(cfg.get_bool("offline"), Some(false));
    }

    #[test]
    fn test_pack_into_is_atomic() {
        fn fail(_: &WireModel, _: &mut ConfigurationModel) -> std::result::Result<(), String> {
            Err("boom".to_string())
        }

        let packer = Packer::default().then(PackTransform { name: "fail", apply: fail });
        let mut prior = ConfigurationModel::new().with("key", "upstream").with("offline", true);
        let before = prior.clone();

        let err = packer
            .pack_into(&schema(), &wire(json!({"key": "upstream"})), &mut prior)
            .unwrap_err();

        assert!(matches!(err, EngineError::PackTransform { ref transform, .. } if transform == "fail"));
        assert_eq!(prior, before);
    }

    #[test]
    fn test_pack_into_keeps_unreturned_attributes() {
        let mut prior = ConfigurationModel::new()
            .with("key", "upstream")
            .with("description", "stale")
            .with("password", "s3cret")
            .with("cleanup_on_delete", true);

        Packer::default()
            .pack_into(&schema(), &wire(json!({"key": "upstream", "offline": true})), &mut prior)
            .unwrap();

        assert_eq!(prior.get_str("password"), Some("s3cret"));
        assert_eq!(prior.get_bool("cleanup_on_delete"), Some(true));
        assert_eq!(prior.get_bool("offline"), Some(true));
        assert!(!prior.contains("description"));
    }
}
