//! Attribute schemas
//!
//! Schemas are built from `SchemaFragment`s: small, named groups of
//! attribute definitions shared across repository variants. `compose` merges
//! fragments in order into a `ComposedSchema`, where later fragments override
//! earlier ones on name collisions.
//!
//! Composition itself cannot fail. Conflicting definitions (same name,
//! incompatible kinds) are programming defects caught by `check_consistency`,
//! which the registry tests run over every built-in variant.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::error::{CoreError, Result, ValidationErrorInfo};
use crate::layout::default_layout;
use crate::validators::Validator;
use crate::value::{ConfigurationModel, Value};
use crate::wire::RepoVariant;

/// Name of the injected layout reference attribute
pub const LAYOUT_REF_ATTRIBUTE: &str = "repo_layout_ref";

/// Attributes of a nested block
#[derive(Debug, Clone, Default)]
pub struct BlockSchema {
    attributes: IndexMap<String, AttributeDefinition>,
    max_items: Option<usize>,
}

impl BlockSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute to the block
    pub fn attr(mut self, definition: AttributeDefinition) -> Self {
        self.attributes.insert(definition.name.clone(), definition);
        self
    }

    /// Limit the number of block instances (1 for single blocks)
    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn attributes(&self) -> &IndexMap<String, AttributeDefinition> {
        &self.attributes
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(name)
    }

    pub fn max(&self) -> Option<usize> {
        self.max_items
    }
}

/// Kind of an attribute value
#[derive(Debug, Clone)]
pub enum AttributeKind {
    String,
    Bool,
    Int,
    StringSet,
    StringList,
    NestedBlock(BlockSchema),
}

impl AttributeKind {
    pub fn name(&self) -> &'static str {
        match self {
            AttributeKind::String => "string",
            AttributeKind::Bool => "bool",
            AttributeKind::Int => "int",
            AttributeKind::StringSet => "set of string",
            AttributeKind::StringList => "list of string",
            AttributeKind::NestedBlock(_) => "nested block",
        }
    }

    /// Whether two definitions of the same attribute can coexist
    ///
    /// Nested blocks are compatible when every attribute they share is.
    pub fn is_compatible_with(&self, other: &AttributeKind) -> bool {
        match (self, other) {
            (AttributeKind::NestedBlock(a), AttributeKind::NestedBlock(b)) => {
                a.attributes.iter().all(|(name, def)| {
                    b.attributes
                        .get(name)
                        .map(|other| def.kind.is_compatible_with(&other.kind))
                        .unwrap_or(true)
                })
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }

    /// Whether a value has this kind (nested block contents are not inspected)
    pub fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (AttributeKind::String, Value::String(_))
                | (AttributeKind::Bool, Value::Bool(_))
                | (AttributeKind::Int, Value::Int(_))
                | (AttributeKind::StringSet, Value::StringSet(_))
                | (AttributeKind::StringList, Value::StringList(_))
                | (AttributeKind::NestedBlock(_), Value::Blocks(_))
        )
    }

    /// Value the wire carries for an unset scalar; `None` for collections
    pub fn zero_value(&self) -> Option<Value> {
        match self {
            AttributeKind::String => Some(Value::String(String::new())),
            AttributeKind::Bool => Some(Value::Bool(false)),
            AttributeKind::Int => Some(Value::Int(0)),
            _ => None,
        }
    }

    /// Decode a state JSON value (attribute-named) of this kind
    ///
    /// JSON null decodes as absent. Any other shape mismatch is an error.
    pub fn decode_state(&self, path: &str, json: &JsonValue) -> Result<Option<Value>> {
        let mismatch = || CoreError::InvalidValue {
            attribute: path.to_string(),
            expected: self.name().to_string(),
            actual: json_kind(json).to_string(),
        };

        let value = match (self, json) {
            (_, JsonValue::Null) => return Ok(None),
            (AttributeKind::String, JsonValue::String(s)) => Value::String(s.clone()),
            (AttributeKind::Bool, JsonValue::Bool(b)) => Value::Bool(*b),
            (AttributeKind::Int, JsonValue::Number(n)) => Value::Int(n.as_i64().ok_or_else(mismatch)?),
            (AttributeKind::StringSet, JsonValue::Array(items)) => {
                Value::StringSet(string_items(items).ok_or_else(mismatch)?.into_iter().collect())
            }
            (AttributeKind::StringList, JsonValue::Array(items)) => {
                Value::StringList(string_items(items).ok_or_else(mismatch)?)
            }
            (AttributeKind::NestedBlock(block), JsonValue::Array(items)) => {
                let mut blocks = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let block_path = format!("{}[{}]", path, i);
                    blocks.push(decode_state_object(&block.attributes, &block_path, item)?);
                }
                Value::Blocks(blocks)
            }
            _ => return Err(mismatch()),
        };

        Ok(Some(value))
    }
}

/// Short JSON type name for error messages
pub fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn string_items(items: &[JsonValue]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

fn decode_state_object(
    attributes: &IndexMap<String, AttributeDefinition>,
    path: &str,
    json: &JsonValue,
) -> Result<ConfigurationModel> {
    let obj = json.as_object().ok_or_else(|| CoreError::InvalidValue {
        attribute: path.to_string(),
        expected: "object".to_string(),
        actual: json_kind(json).to_string(),
    })?;

    let mut model = ConfigurationModel::new();
    for (name, value) in obj {
        let attr_path = join_path(path, name);
        let definition = attributes
            .get(name)
            .ok_or_else(|| CoreError::UnknownAttribute {
                attribute: attr_path.clone(),
            })?;
        if let Some(decoded) = definition.kind.decode_state(&attr_path, value)? {
            model.set(name.clone(), decoded);
        }
    }
    Ok(model)
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// How an attribute may be supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be set in configuration
    Required,
    /// May be set; absent means unset
    Optional,
    /// May be set; otherwise the default or the server's value applies
    OptionalComputed,
    /// Server-owned, read-only
    Computed,
}

impl Presence {
    pub fn is_required(&self) -> bool {
        matches!(self, Presence::Required)
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Presence::OptionalComputed | Presence::Computed)
    }
}

/// Where an attribute lives on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireBinding {
    /// Read and written as the named wire field
    Field(String),
    /// Written as the named wire field but never returned by the server
    WriteOnly(String),
    /// Translated by a dedicated pack/unpack transform
    Custom,
    /// Exists only in configuration, never sent
    ConfigOnly,
}

impl WireBinding {
    /// Wire field written by unpack, if any
    pub fn wire_name(&self) -> Option<&str> {
        match self {
            WireBinding::Field(name) | WireBinding::WriteOnly(name) => Some(name),
            _ => None,
        }
    }

    /// Wire field read back by pack, if any
    pub fn readable_name(&self) -> Option<&str> {
        match self {
            WireBinding::Field(name) => Some(name),
            _ => None,
        }
    }
}

/// One schema attribute
#[derive(Debug, Clone)]
pub struct AttributeDefinition {
    pub name: String,
    pub kind: AttributeKind,
    pub presence: Presence,
    pub default: Option<Value>,
    pub wire: WireBinding,
    pub description: Option<String>,
    pub sensitive: bool,
    /// Wire field distinguishes absent from its zero value
    pub nullable: bool,
    pub validators: Vec<Validator>,
}

impl AttributeDefinition {
    /// Create an optional, configuration-only attribute
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            presence: Presence::Optional,
            default: None,
            wire: WireBinding::ConfigOnly,
            description: None,
            sensitive: false,
            nullable: false,
            validators: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::String)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Bool)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Int)
    }

    pub fn string_set(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::StringSet)
    }

    pub fn string_list(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::StringList)
    }

    pub fn block(name: impl Into<String>, block: BlockSchema) -> Self {
        Self::new(name, AttributeKind::NestedBlock(block))
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.presence = Presence::OptionalComputed;
        self
    }

    pub fn computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    /// Set a default; makes the attribute optional+computed if it was optional
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        if self.presence == Presence::Optional {
            self.presence = Presence::OptionalComputed;
        }
        self.default = Some(value.into());
        self
    }

    /// Bind to a wire field read and written verbatim
    pub fn wire(mut self, field: impl Into<String>) -> Self {
        self.wire = WireBinding::Field(field.into());
        self
    }

    /// Bind to a wire field the server never returns
    pub fn write_only(mut self, field: impl Into<String>) -> Self {
        self.wire = WireBinding::WriteOnly(field.into());
        self
    }

    /// Mark as handled by a dedicated transform
    pub fn custom(mut self) -> Self {
        self.wire = WireBinding::Custom;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Omit the wire field when unset instead of sending its zero value
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Wire value standing for "unset"
    ///
    /// Only optional scalars without a default have one; the server keeps a
    /// field it is not sent, so clearing it means sending the zero value.
    pub fn unset_value(&self) -> Option<Value> {
        if self.presence != Presence::Optional || self.default.is_some() || self.nullable {
            return None;
        }
        self.kind.zero_value()
    }

    /// Whether `value` is this attribute's unset marker
    pub fn is_unset(&self, value: &Value) -> bool {
        self.unset_value().as_ref() == Some(value)
    }
}

/// A named, immutable group of attribute definitions
#[derive(Debug, Clone)]
pub struct SchemaFragment {
    name: String,
    attributes: IndexMap<String, AttributeDefinition>,
}

impl SchemaFragment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
        }
    }

    /// Add an attribute; a later definition of the same name replaces the earlier one
    pub fn attr(mut self, definition: AttributeDefinition) -> Self {
        self.attributes.insert(definition.name.clone(), definition);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.values()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// The final attribute map for one repository variant
#[derive(Debug, Clone)]
pub struct ComposedSchema {
    variant: RepoVariant,
    version: u32,
    fragments: Vec<String>,
    attributes: IndexMap<String, AttributeDefinition>,
    wire_index: HashMap<String, String>,
}

/// Merge fragments in order; later definitions win on name collisions
pub fn compose(variant: RepoVariant, fragments: &[&SchemaFragment]) -> ComposedSchema {
    let mut attributes: IndexMap<String, AttributeDefinition> = IndexMap::new();
    for fragment in fragments {
        for definition in fragment.attributes.values() {
            attributes.insert(definition.name.clone(), definition.clone());
        }
    }

    ComposedSchema::from_parts(
        variant,
        0,
        fragments.iter().map(|f| f.name.clone()).collect(),
        attributes,
    )
}

/// Compose and inject `repo_layout_ref` defaulting to the package type's layout
pub fn compose_with_layout(variant: RepoVariant, fragments: &[&SchemaFragment]) -> ComposedSchema {
    let layout = layout_fragment(variant);
    let mut all: Vec<&SchemaFragment> = fragments.to_vec();
    all.push(&layout);
    compose(variant, &all)
}

/// Fragment holding the layout reference for a variant
pub fn layout_fragment(variant: RepoVariant) -> SchemaFragment {
    SchemaFragment::new("layout").attr(
        AttributeDefinition::string(LAYOUT_REF_ATTRIBUTE)
            .wire("repoLayoutRef")
            .default_value(default_layout(variant.package_type))
            .description("Repository layout key for the repository"),
    )
}

/// Check fragments for definitions that cannot be composed together
///
/// Reports the first defect found: a default on a required attribute, a
/// default of the wrong kind, the same name defined with incompatible kinds
/// in two fragments, or two composed attributes bound to one wire field.
pub fn check_consistency(schema: &str, fragments: &[&SchemaFragment]) -> Result<()> {
    let mut seen: HashMap<&str, (&str, &AttributeKind)> = HashMap::new();

    for fragment in fragments {
        for definition in fragment.attributes.values() {
            check_definition(schema, "", definition)?;

            if let Some((previous, kind)) = seen.get(definition.name.as_str()) {
                if !kind.is_compatible_with(&definition.kind) {
                    return Err(CoreError::SchemaCompositionDefect {
                        schema: schema.to_string(),
                        attribute: definition.name.clone(),
                        message: format!(
                            "is a {} in fragment '{}' but a {} in fragment '{}'",
                            kind.name(),
                            previous,
                            definition.kind.name(),
                            fragment.name
                        ),
                    });
                }
            }
            seen.insert(&definition.name, (&fragment.name, &definition.kind));
        }
    }

    let mut composed: IndexMap<&str, &AttributeDefinition> = IndexMap::new();
    for fragment in fragments {
        for definition in fragment.attributes.values() {
            composed.insert(&definition.name, definition);
        }
    }
    let mut wire_fields: HashMap<&str, &str> = HashMap::new();
    for definition in composed.values() {
        let Some(field) = definition.wire.wire_name() else {
            continue;
        };
        if let Some(other) = wire_fields.insert(field, &definition.name) {
            return Err(CoreError::SchemaCompositionDefect {
                schema: schema.to_string(),
                attribute: definition.name.clone(),
                message: format!("binds wire field '{}' already bound by `{}`", field, other),
            });
        }
    }

    Ok(())
}

fn check_definition(schema: &str, prefix: &str, definition: &AttributeDefinition) -> Result<()> {
    let path = join_path(prefix, &definition.name);
    let defect = |message: String| CoreError::SchemaCompositionDefect {
        schema: schema.to_string(),
        attribute: path.clone(),
        message,
    };

    if let Some(default) = &definition.default {
        if definition.presence.is_required() {
            return Err(defect("is required but declares a default".to_string()));
        }
        if !definition.kind.matches(default) {
            return Err(defect(format!(
                "is a {} but its default is a {}",
                definition.kind.name(),
                default.kind_name()
            )));
        }
    }

    if let AttributeKind::NestedBlock(block) = &definition.kind {
        for nested in block.attributes.values() {
            check_definition(schema, &path, nested)?;
        }
    }

    Ok(())
}

/// Result of schema validation
#[derive(Debug)]
pub struct ValidationResult {
    /// Whether the values are valid
    pub is_valid: bool,
    /// Validation errors
    pub errors: Vec<ValidationErrorInfo>,
}

impl ValidationResult {
    /// Create a successful validation result
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    /// Create a failed validation result with errors
    pub fn failure(errors: Vec<ValidationErrorInfo>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

impl ComposedSchema {
    fn from_parts(
        variant: RepoVariant,
        version: u32,
        fragments: Vec<String>,
        attributes: IndexMap<String, AttributeDefinition>,
    ) -> Self {
        let wire_index = attributes
            .values()
            .filter_map(|def| {
                def.wire
                    .readable_name()
                    .map(|wire| (wire.to_string(), def.name.clone()))
            })
            .collect();

        Self {
            variant,
            version,
            fragments,
            attributes,
            wire_index,
        }
    }

    /// Set the schema version recorded in persisted state
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn variant(&self) -> RepoVariant {
        self.variant
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Names of the fragments this schema was composed from, in order
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attribute bound to a readable wire field
    pub fn by_wire_name(&self, wire_name: &str) -> Option<&AttributeDefinition> {
        self.wire_index
            .get(wire_name)
            .and_then(|name| self.attributes.get(name))
    }

    /// Model holding every attribute default
    pub fn defaults(&self) -> ConfigurationModel {
        self.attributes
            .values()
            .filter_map(|def| def.default.clone().map(|v| (def.name.clone(), v)))
            .collect()
    }

    /// Decode attribute-named state JSON strictly against this schema
    pub fn decode_state(&self, json: &JsonValue) -> Result<ConfigurationModel> {
        decode_state_object(&self.attributes, "", json)
    }

    /// Validate a configuration, collecting every failure
    pub fn validate(&self, config: &ConfigurationModel) -> ValidationResult {
        let mut errors = Vec::new();
        validate_attributes(&self.attributes, config, "", &mut errors);

        if errors.is_empty() {
            ValidationResult::success()
        } else {
            ValidationResult::failure(errors)
        }
    }

    /// Read-only schema for the matching data source
    ///
    /// `key` stays required; everything else becomes computed with no default.
    pub fn as_data_source(&self) -> ComposedSchema {
        let attributes = self
            .attributes
            .iter()
            .map(|(name, def)| {
                let def = if name == "key" {
                    let mut key = def.clone();
                    key.presence = Presence::Required;
                    key.default = None;
                    key
                } else {
                    computed_only(def)
                };
                (name.clone(), def)
            })
            .collect();

        ComposedSchema::from_parts(self.variant, self.version, self.fragments.clone(), attributes)
    }
}

fn computed_only(definition: &AttributeDefinition) -> AttributeDefinition {
    let mut def = definition.clone();
    def.presence = Presence::Computed;
    def.default = None;
    def.validators.clear();
    if let AttributeKind::NestedBlock(block) = &def.kind {
        let nested = BlockSchema {
            attributes: block
                .attributes
                .iter()
                .map(|(name, d)| (name.clone(), computed_only(d)))
                .collect(),
            max_items: block.max_items,
        };
        def.kind = AttributeKind::NestedBlock(nested);
    }
    def
}

fn validate_attributes(
    attributes: &IndexMap<String, AttributeDefinition>,
    config: &ConfigurationModel,
    prefix: &str,
    errors: &mut Vec<ValidationErrorInfo>,
) {
    for name in config.names() {
        if !attributes.contains_key(name) {
            errors.push(ValidationErrorInfo::new(
                join_path(prefix, name),
                "unknown attribute",
            ));
        }
    }

    for definition in attributes.values() {
        let path = join_path(prefix, &definition.name);
        let Some(value) = config.get(&definition.name) else {
            if definition.presence.is_required() {
                errors.push(ValidationErrorInfo::new(path, "required attribute is missing"));
            }
            continue;
        };

        if definition.presence == Presence::Computed {
            errors.push(ValidationErrorInfo::new(path, "attribute is computed and cannot be set"));
            continue;
        }

        if !definition.kind.matches(value) {
            errors.push(
                ValidationErrorInfo::new(path, "wrong value kind")
                    .with_expected(definition.kind.name(), value.kind_name()),
            );
            continue;
        }

        for validator in &definition.validators {
            if let Some(message) = validator.check(value) {
                errors.push(ValidationErrorInfo::new(path.clone(), message));
            }
        }

        if let (AttributeKind::NestedBlock(block), Value::Blocks(blocks)) = (&definition.kind, value) {
            if let Some(max) = block.max_items {
                if blocks.len() > max {
                    errors.push(
                        ValidationErrorInfo::new(path.clone(), "too many blocks")
                            .with_expected(format!("at most {}", max), blocks.len().to_string()),
                    );
                }
            }
            for (i, nested) in blocks.iter().enumerate() {
                validate_attributes(&block.attributes, nested, &format!("{}[{}]", path, i), errors);
            }
        }
    }
}
