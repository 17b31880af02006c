//! Configuration model to wire model
//!
//! The generic pass walks the composed schema in attribute order. For each
//! attribute bound to a wire field it takes the configured value, falling
//! back to the schema default, and writes the wire encoding. An optional
//! scalar with neither is sent as its kind's zero value so the server clears
//! it; nullable scalars and collections are omitted. Custom transforms run
//! afterwards for attributes whose wire shape does not follow the generic rules.

use artirepo_core::{
    AttributeDefinition, AttributeKind, ComposedSchema, ConfigurationModel, Presence, Value,
    WireModel,
};
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::error::{EngineError, Result};

pub type UnpackFn = fn(&ConfigurationModel, &mut WireModel) -> std::result::Result<(), String>;

/// A named configuration-to-wire transform
#[derive(Clone, Copy)]
pub struct UnpackTransform {
    pub name: &'static str,
    pub apply: UnpackFn,
}

impl std::fmt::Debug for UnpackTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("UnpackTransform").field(&self.name).finish()
    }
}

/// Generic unpack followed by ordered custom transforms
#[derive(Debug, Clone, Default)]
pub struct Unpacker {
    transforms: Vec<UnpackTransform>,
}

impl Unpacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transform; transforms run in insertion order
    pub fn then(mut self, transform: UnpackTransform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn transforms(&self) -> &[UnpackTransform] {
        &self.transforms
    }

    pub fn unpack(&self, schema: &ComposedSchema, config: &ConfigurationModel) -> Result<WireModel> {
        let mut wire = unpack(config, schema)?;

        for transform in &self.transforms {
            (transform.apply)(config, &mut wire).map_err(|message| EngineError::Unpack {
                variant: schema.variant().key(),
                attribute: transform.name.to_string(),
                message,
            })?;
        }

        Ok(wire)
    }
}

/// Convert a configuration into the wire model for the schema's variant
///
/// Fails when a required attribute is missing or a value has the wrong kind.
pub fn unpack(config: &ConfigurationModel, schema: &ComposedSchema) -> Result<WireModel> {
    let variant = schema.variant();
    let mut wire = variant.new_wire_model(String::new());

    for definition in schema.attributes() {
        let Some(field) = sent_field(definition) else {
            continue;
        };
        let Some(value) = effective_value(config, definition) else {
            if definition.presence.is_required() {
                return Err(missing(schema, &definition.name));
            }
            if let Some(zero) = definition.unset_value() {
                wire.set(field, zero.to_json())?;
            }
            continue;
        };

        let encoded = encode(schema, &definition.name, definition, value)?;
        wire.set(field, encoded)?;
    }

    debug!(variant = %variant, key = wire.key(), "unpacked configuration");
    Ok(wire)
}

/// Wire field the generic pass writes for this attribute, if any
fn sent_field(definition: &AttributeDefinition) -> Option<&str> {
    if definition.presence == Presence::Computed {
        return None;
    }
    definition.wire.wire_name()
}

fn effective_value<'a>(
    config: &'a ConfigurationModel,
    definition: &'a AttributeDefinition,
) -> Option<&'a Value> {
    config.get(&definition.name).or(definition.default.as_ref())
}

fn missing(schema: &ComposedSchema, path: &str) -> EngineError {
    EngineError::Unpack {
        variant: schema.variant().key(),
        attribute: path.to_string(),
        message: "required attribute is missing".to_string(),
    }
}

fn encode(
    schema: &ComposedSchema,
    path: &str,
    definition: &AttributeDefinition,
    value: &Value,
) -> Result<JsonValue> {
    if !definition.kind.matches(value) {
        return Err(EngineError::Unpack {
            variant: schema.variant().key(),
            attribute: path.to_string(),
            message: format!(
                "expected {}, got {}",
                definition.kind.name(),
                value.kind_name()
            ),
        });
    }

    match (&definition.kind, value) {
        (AttributeKind::NestedBlock(block), Value::Blocks(blocks)) => {
            let mut items = Vec::with_capacity(blocks.len());
            for (i, nested) in blocks.iter().enumerate() {
                let block_path = format!("{}[{}]", path, i);
                items.push(encode_block(schema, &block_path, block.attributes(), nested)?);
            }
            Ok(JsonValue::Array(items))
        }
        // Scalars, sets (already sorted) and lists
        _ => Ok(value.to_json()),
    }
}

fn encode_block(
    schema: &ComposedSchema,
    path: &str,
    attributes: &IndexMap<String, AttributeDefinition>,
    config: &ConfigurationModel,
) -> Result<JsonValue> {
    let mut obj = Map::new();

    for definition in attributes.values() {
        let Some(field) = sent_field(definition) else {
            continue;
        };
        let attr_path = format!("{}.{}", path, definition.name);
        let Some(value) = effective_value(config, definition) else {
            if definition.presence.is_required() {
                return Err(missing(schema, &attr_path));
            }
            if let Some(zero) = definition.unset_value() {
                obj.insert(field.to_string(), zero.to_json());
            }
            continue;
        };
        obj.insert(
            field.to_string(),
            encode(schema, &attr_path, definition, value)?,
        );
    }

    Ok(JsonValue::Object(obj))
}
