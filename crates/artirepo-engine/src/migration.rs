//! Schema-version migration of persisted state
//!
//! Persisted state is a JSON object of attribute values tagged with the
//! schema version that wrote it. State from an older version is brought
//! forward by applying the declarative steps registered for each version it
//! passed through, then strictly decoded against the current schema. Every
//! operation is idempotent, so migrating already-current state is a plain
//! decode.

use artirepo_core::{json_kind, ComposedSchema, ConfigurationModel};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::error::{EngineError, Result};

/// Attribute values as persisted, with the schema version that wrote them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    pub schema_version: u32,
    pub attributes: JsonValue,
}

impl StoredState {
    /// Persist a configuration under the schema's current version
    pub fn current(schema: &ComposedSchema, config: &ConfigurationModel) -> Self {
        Self {
            schema_version: schema.version(),
            attributes: config.to_json(),
        }
    }
}

/// One idempotent state rewrite
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOp {
    /// Sort and deduplicate a string array
    ListToSet { attribute: String },
    /// Set a value when the attribute is absent or null
    DefaultIfAbsent { attribute: String, value: JsonValue },
    /// Move a value to a new attribute name
    Rename { from: String, to: String },
    /// Drop an attribute the schema no longer has
    Remove { attribute: String },
    /// Parse `"true"`/`"false"` into a bool
    StringToBool { attribute: String },
    /// Parse a decimal string into an integer
    StringToInt { attribute: String },
}

impl MigrationOp {
    pub fn list_to_set(attribute: &str) -> Self {
        Self::ListToSet {
            attribute: attribute.to_string(),
        }
    }

    pub fn default_if_absent(attribute: &str, value: impl Into<JsonValue>) -> Self {
        Self::DefaultIfAbsent {
            attribute: attribute.to_string(),
            value: value.into(),
        }
    }

    pub fn rename(from: &str, to: &str) -> Self {
        Self::Rename {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn remove(attribute: &str) -> Self {
        Self::Remove {
            attribute: attribute.to_string(),
        }
    }

    pub fn string_to_bool(attribute: &str) -> Self {
        Self::StringToBool {
            attribute: attribute.to_string(),
        }
    }

    pub fn string_to_int(attribute: &str) -> Self {
        Self::StringToInt {
            attribute: attribute.to_string(),
        }
    }

    /// Apply to an attribute map; a failure message means the state has an unexpected shape
    pub fn apply(&self, attributes: &mut Map<String, JsonValue>) -> std::result::Result<(), String> {
        match self {
            MigrationOp::ListToSet { attribute } => match attributes.get_mut(attribute) {
                None | Some(JsonValue::Null) => Ok(()),
                Some(JsonValue::Array(items)) => {
                    let mut strings = items
                        .iter()
                        .map(|i| i.as_str().map(str::to_string))
                        .collect::<Option<Vec<String>>>()
                        .ok_or_else(|| format!("{} must contain only strings", attribute))?;
                    strings.sort();
                    strings.dedup();
                    *items = strings.into_iter().map(JsonValue::String).collect();
                    Ok(())
                }
                Some(other) => Err(format!(
                    "{} must be an array, got {}",
                    attribute,
                    json_kind(other)
                )),
            },
            MigrationOp::DefaultIfAbsent { attribute, value } => {
                match attributes.get(attribute) {
                    None | Some(JsonValue::Null) => {
                        attributes.insert(attribute.clone(), value.clone());
                    }
                    Some(_) => {}
                }
                Ok(())
            }
            MigrationOp::Rename { from, to } => {
                let Some(value) = attributes.remove(from) else {
                    return Ok(());
                };
                match attributes.get(to) {
                    None | Some(JsonValue::Null) => {
                        attributes.insert(to.clone(), value);
                        Ok(())
                    }
                    Some(existing) if value.is_null() || *existing == value => Ok(()),
                    Some(_) => Err(format!(
                        "cannot rename {} to {}: both are set with different values",
                        from, to
                    )),
                }
            }
            MigrationOp::Remove { attribute } => {
                attributes.remove(attribute);
                Ok(())
            }
            MigrationOp::StringToBool { attribute } => match attributes.get_mut(attribute) {
                Some(slot @ JsonValue::String(_)) => {
                    let parsed = match slot.as_str().map(str::trim) {
                        Some("true") => true,
                        Some("false") | Some("") => false,
                        other => {
                            return Err(format!(
                                "{} is not a boolean: {:?}",
                                attribute,
                                other.unwrap_or_default()
                            ))
                        }
                    };
                    *slot = JsonValue::Bool(parsed);
                    Ok(())
                }
                None | Some(JsonValue::Null) | Some(JsonValue::Bool(_)) => Ok(()),
                Some(other) => Err(format!(
                    "{} must be a bool, got {}",
                    attribute,
                    json_kind(other)
                )),
            },
            MigrationOp::StringToInt { attribute } => match attributes.get_mut(attribute) {
                Some(slot @ JsonValue::String(_)) => {
                    let text = slot.as_str().unwrap_or_default().trim();
                    let parsed: i64 = text
                        .parse()
                        .map_err(|_| format!("{} is not an integer: {:?}", attribute, text))?;
                    *slot = JsonValue::from(parsed);
                    Ok(())
                }
                None | Some(JsonValue::Null) | Some(JsonValue::Number(_)) => Ok(()),
                Some(other) => Err(format!(
                    "{} must be an integer, got {}",
                    attribute,
                    json_kind(other)
                )),
            },
        }
    }
}

/// Operations that bring state written at `from_version` to `from_version + 1`
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationStep {
    pub from_version: u32,
    pub ops: Vec<MigrationOp>,
}

/// Ordered migration steps for one resource
#[derive(Debug, Clone, Default)]
pub struct Migrator {
    steps: Vec<MigrationStep>,
}

impl Migrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the operations upgrading state from `from_version`
    pub fn step(mut self, from_version: u32, ops: Vec<MigrationOp>) -> Self {
        self.steps.push(MigrationStep { from_version, ops });
        self.steps.sort_by_key(|s| s.from_version);
        self
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Decode stored state into a configuration for the schema's current version
    pub fn migrate(&self, state: &StoredState, schema: &ComposedSchema) -> Result<ConfigurationModel> {
        let variant = schema.variant().key();
        let target = schema.version();
        let error = |message: String| EngineError::Migration {
            variant: variant.clone(),
            from: state.schema_version,
            to: target,
            message,
        };

        if state.schema_version > target {
            return Err(error(format!(
                "state was written by a newer schema (version {})",
                state.schema_version
            )));
        }

        let mut attributes = match &state.attributes {
            JsonValue::Object(attributes) => attributes.clone(),
            other => {
                return Err(error(format!(
                    "expected an object of attributes, got {}",
                    json_kind(other)
                )))
            }
        };

        for step in self
            .steps
            .iter()
            .filter(|s| s.from_version >= state.schema_version && s.from_version < target)
        {
            debug!(variant = %variant, from = step.from_version, "applying migration step");
            for op in &step.ops {
                op.apply(&mut attributes).map_err(&error)?;
            }
        }

        schema
            .decode_state(&JsonValue::Object(attributes))
            .map_err(|e| error(e.to_string()))
    }

    /// Rewrite stored state at the schema's current version
    pub fn upgrade(&self, state: &StoredState, schema: &ComposedSchema) -> Result<StoredState> {
        let config = self.migrate(state, schema)?;
        Ok(StoredState::current(schema, &config))
    }
}
