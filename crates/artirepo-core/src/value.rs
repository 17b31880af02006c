//! Configuration values
//!
//! A `ConfigurationModel` is the user-facing side of a repository: the
//! attribute values from configuration or persisted state. Every value is one
//! of a closed set of kinds, so the pack/unpack engines match over a known
//! enumeration instead of inspecting arbitrary JSON.
//!
//! Absence is represented by the attribute not being in the model at all.
//! An explicit `false`, `0`, `""` or empty set is a present value.

use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Bool(bool),
    Int(i64),
    /// Unordered set of strings, kept sorted
    StringSet(BTreeSet<String>),
    /// Ordered list of strings
    StringList(Vec<String>),
    /// Nested block instances
    Blocks(Vec<ConfigurationModel>),
}

impl Value {
    /// Build a string set from any iterable of strings
    pub fn string_set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::StringSet(items.into_iter().map(Into::into).collect())
    }

    /// Build an ordered string list
    pub fn string_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::StringList(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the value's kind, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::StringSet(_) => "set of string",
            Value::StringList(_) => "list of string",
            Value::Blocks(_) => "nested block",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            Value::StringSet(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::StringList(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_blocks(&self) -> Option<&[ConfigurationModel]> {
        match self {
            Value::Blocks(b) => Some(b),
            _ => None,
        }
    }

    /// Convert to the state JSON representation (attribute names, sets sorted)
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::StringSet(set) => {
                JsonValue::Array(set.iter().cloned().map(JsonValue::String).collect())
            }
            Value::StringList(list) => {
                JsonValue::Array(list.iter().cloned().map(JsonValue::String).collect())
            }
            Value::Blocks(blocks) => {
                JsonValue::Array(blocks.iter().map(ConfigurationModel::to_json).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

/// Attribute values for one repository instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationModel {
    attributes: BTreeMap<String, Value>,
}

impl ConfigurationModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Get an attribute value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Set an attribute value, returning the previous one
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(name.into(), value.into())
    }

    /// Remove an attribute, making it absent
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter()
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

    /// String attribute shortcut
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Bool attribute shortcut
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Int attribute shortcut
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    /// Convert to a JSON object keyed by attribute name
    ///
    /// The output is deterministic: attributes are sorted by name and sets
    /// are sorted, so equal models always serialize to identical bytes.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl Serialize for ConfigurationModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl FromIterator<(String, Value)> for ConfigurationModel {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_is_not_false() {
        let cfg = ConfigurationModel::new().with("xray_index", false);

        assert_eq!(cfg.get_bool("xray_index"), Some(false));
        assert!(cfg.get("blacked_out").is_none());
    }

    #[test]
    fn test_string_set_is_sorted_and_deduplicated() {
        let value = Value::string_set(["xz", "bz2", "xz"]);

        assert_eq!(value.to_json(), serde_json::json!(["bz2", "xz"]));
    }

    #[test]
    fn test_string_list_keeps_order() {
        let value = Value::string_list(["remote", "local", "remote"]);

        assert_eq!(value.to_json(), serde_json::json!(["remote", "local", "remote"]));
    }

    #[test]
    fn test_to_json_is_deterministic() {
        let a = ConfigurationModel::new()
            .with("key", "my-repo")
            .with("description", "")
            .with("property_sets", Value::string_set(["b", "a"]));
        let b = ConfigurationModel::new()
            .with("property_sets", Value::string_set(["a", "b"]))
            .with("description", "")
            .with("key", "my-repo");

        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_nested_blocks_to_json() {
        let member = ConfigurationModel::new()
            .with("url", "https://peer.example.com/artifactory/fed")
            .with("enabled", true);
        let cfg = ConfigurationModel::new().with("member", Value::Blocks(vec![member]));

        assert_eq!(
            cfg.to_json(),
            serde_json::json!({
                "member": [{"enabled": true, "url": "https://peer.example.com/artifactory/fed"}]
            })
        );
    }
}
