//! Repository wire model
//!
//! The wire model is the JSON shape the Artifactory REST API accepts and
//! returns for a repository. It is an explicit composition of the invariant
//! `base` fields (`key`, `rclass`, `packageType`) plus the variant-specific
//! fields keyed by their wire name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Repository class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rclass {
    Local,
    Remote,
    Virtual,
    Federated,
    Distribution,
}

impl Rclass {
    pub const ALL: [Rclass; 5] = [
        Rclass::Local,
        Rclass::Remote,
        Rclass::Virtual,
        Rclass::Federated,
        Rclass::Distribution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rclass::Local => "local",
            Rclass::Remote => "remote",
            Rclass::Virtual => "virtual",
            Rclass::Federated => "federated",
            Rclass::Distribution => "distribution",
        }
    }
}

impl fmt::Display for Rclass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rclass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Rclass::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| CoreError::UnknownRclass(s.to_string()))
    }
}

macro_rules! package_types {
    ($($variant:ident => $key:literal, $wire:literal;)*) => {
        /// Artifact ecosystem served by a repository
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum PackageType {
            $($variant,)*
        }

        impl PackageType {
            pub const ALL: &'static [PackageType] = &[$(PackageType::$variant,)*];

            /// Name used in variant keys and resource names
            pub fn key_name(&self) -> &'static str {
                match self {
                    $(PackageType::$variant => $key,)*
                }
            }

            /// Value of the `packageType` wire field
            pub fn wire_name(&self) -> &'static str {
                match self {
                    $(PackageType::$variant => $wire,)*
                }
            }
        }
    };
}

package_types! {
    Alpine => "alpine", "alpine";
    Bower => "bower", "bower";
    Cargo => "cargo", "cargo";
    Chef => "chef", "chef";
    Cocoapods => "cocoapods", "cocoapods";
    Composer => "composer", "composer";
    Conan => "conan", "conan";
    Conda => "conda", "conda";
    Cran => "cran", "cran";
    Debian => "debian", "debian";
    Docker => "docker", "docker";
    Gems => "gems", "gems";
    Generic => "generic", "generic";
    GitLfs => "gitlfs", "gitlfs";
    Go => "go", "go";
    Gradle => "gradle", "gradle";
    Helm => "helm", "helm";
    HelmOci => "helmoci", "helmoci";
    HuggingFaceMl => "huggingfaceml", "huggingfaceml";
    Ivy => "ivy", "ivy";
    Maven => "maven", "maven";
    Npm => "npm", "npm";
    Nuget => "nuget", "nuget";
    Oci => "oci", "oci";
    Opkg => "opkg", "opkg";
    Pub => "pub", "pub";
    Puppet => "puppet", "puppet";
    Pypi => "pypi", "pypi";
    Rpm => "rpm", "rpm";
    Sbt => "sbt", "sbt";
    Swift => "swift", "swift";
    TerraformModule => "terraform_module", "terraform";
    TerraformProvider => "terraform_provider", "terraform";
    TerraformBackend => "terraformbackend", "terraformbackend";
    Vagrant => "vagrant", "vagrant";
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_name())
    }
}

impl FromStr for PackageType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        PackageType::ALL
            .iter()
            .copied()
            .find(|p| p.key_name() == s)
            .ok_or_else(|| CoreError::UnknownPackageType(s.to_string()))
    }
}

/// A repository variant: class plus package type (e.g. `local:alpine`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoVariant {
    pub rclass: Rclass,
    pub package_type: PackageType,
}

impl RepoVariant {
    pub fn new(rclass: Rclass, package_type: PackageType) -> Self {
        Self {
            rclass,
            package_type,
        }
    }

    /// Registry key, `<rclass>:<package type>`
    pub fn key(&self) -> String {
        format!("{}:{}", self.rclass, self.package_type)
    }

    /// Terraform resource type name (e.g. `artifactory_local_alpine_repository`)
    pub fn resource_name(&self) -> String {
        format!(
            "artifactory_{}_{}_repository",
            self.rclass, self.package_type
        )
    }

    /// Fields every wire model of this variant carries regardless of configuration
    pub fn invariant_fields(&self) -> Map<String, JsonValue> {
        let mut fields = Map::new();
        match self.package_type {
            PackageType::Docker => {
                fields.insert("dockerApiVersion".into(), JsonValue::from("V2"));
            }
            PackageType::Rpm if matches!(self.rclass, Rclass::Local | Rclass::Federated) => {
                fields.insert("yumRootDepth".into(), JsonValue::from(0));
            }
            PackageType::TerraformModule => {
                fields.insert("terraformType".into(), JsonValue::from("module"));
            }
            PackageType::TerraformProvider => {
                fields.insert("terraformType".into(), JsonValue::from("provider"));
            }
            _ => {}
        }
        fields
    }

    /// Zero-value wire model for this variant with the given key
    pub fn new_wire_model(&self, key: impl Into<String>) -> WireModel {
        let mut wire = WireModel::new(self.package_type, self.rclass, Map::new());
        wire.base.key = key.into();
        wire
    }
}

impl fmt::Display for RepoVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.rclass, self.package_type)
    }
}

impl FromStr for RepoVariant {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (rclass, package_type) = s
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidVariantKey(s.to_string()))?;
        Ok(Self::new(rclass.parse()?, package_type.parse()?))
    }
}

/// Invariant wire fields shared by every repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryBase {
    /// Primary identifier, immutable after creation
    pub key: String,
    pub rclass: Rclass,
    #[serde(rename = "packageType")]
    pub package_type: String,
}

/// Wire fields that live in `base` and are never stored in `fields`
pub const BASE_FIELDS: &[&str] = &["key", "rclass", "packageType"];

/// REST API representation of one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireModel {
    #[serde(flatten)]
    base: RepositoryBase,
    /// Never holds a base field; writes go through `set`
    #[serde(flatten)]
    fields: Map<String, JsonValue>,
}

impl WireModel {
    /// Zero-value wire model with variant invariants and `overrides` applied
    ///
    /// Overrides win over invariant defaults. Base fields in `overrides`
    /// are ignored; use `base` directly for those.
    pub fn new(package_type: PackageType, rclass: Rclass, overrides: Map<String, JsonValue>) -> Self {
        let variant = RepoVariant::new(rclass, package_type);
        let mut fields = variant.invariant_fields();
        for (name, value) in overrides {
            if !BASE_FIELDS.contains(&name.as_str()) {
                fields.insert(name, value);
            }
        }

        Self {
            base: RepositoryBase {
                key: String::new(),
                rclass,
                package_type: package_type.wire_name().to_string(),
            },
            fields,
        }
    }

    pub fn key(&self) -> &str {
        &self.base.key
    }

    pub fn base(&self) -> &RepositoryBase {
        &self.base
    }

    /// Get a wire field by name, including base fields
    pub fn get(&self, name: &str) -> Option<JsonValue> {
        match name {
            "key" => Some(JsonValue::from(self.base.key.clone())),
            "rclass" => Some(JsonValue::from(self.base.rclass.as_str())),
            "packageType" => Some(JsonValue::from(self.base.package_type.clone())),
            _ => self.fields.get(name).cloned(),
        }
    }

    /// Set a wire field; `key` is routed to the base, other base fields are immutable
    pub fn set(&mut self, name: &str, value: JsonValue) -> Result<()> {
        match name {
            "key" => match value {
                JsonValue::String(key) => {
                    self.base.key = key;
                    Ok(())
                }
                other => Err(CoreError::InvalidWire {
                    message: format!("key must be a string, got {}", other),
                }),
            },
            "rclass" | "packageType" => Err(CoreError::InvalidWire {
                message: format!("{} is fixed by the repository variant", name),
            }),
            _ => {
                self.fields.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    /// Remove a variant field
    pub fn remove(&mut self, name: &str) -> Option<JsonValue> {
        self.fields.remove(name)
    }

    /// All wire fields, base fields first
    pub fn iter_fields(&self) -> impl Iterator<Item = (String, JsonValue)> + '_ {
        BASE_FIELDS
            .iter()
            .filter_map(|name| self.get(name).map(|v| (name.to_string(), v)))
            .chain(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    /// Decode an API response body on top of the variant's constructor defaults
    ///
    /// Fields absent from the response keep their constructor values. The
    /// response's `rclass` and `packageType` must match the variant.
    pub fn decode(variant: RepoVariant, body: &JsonValue) -> Result<Self> {
        let obj = body.as_object().ok_or_else(|| CoreError::InvalidWire {
            message: "repository response is not a JSON object".to_string(),
        })?;

        let mut wire = variant.new_wire_model(String::new());

        match obj.get("key") {
            Some(JsonValue::String(key)) => wire.base.key = key.clone(),
            _ => {
                return Err(CoreError::InvalidWire {
                    message: "repository response has no key".to_string(),
                })
            }
        }

        if let Some(rclass) = obj.get("rclass").and_then(JsonValue::as_str) {
            let rclass: Rclass = rclass.parse()?;
            if rclass != variant.rclass {
                return Err(CoreError::InvalidWire {
                    message: format!(
                        "repository '{}' is a {} repository, expected {}",
                        wire.base.key, rclass, variant.rclass
                    ),
                });
            }
        }

        if let Some(package_type) = obj.get("packageType").and_then(JsonValue::as_str) {
            if !package_type.eq_ignore_ascii_case(variant.package_type.wire_name()) {
                return Err(CoreError::InvalidWire {
                    message: format!(
                        "repository '{}' has package type {}, expected {}",
                        wire.base.key,
                        package_type,
                        variant.package_type.wire_name()
                    ),
                });
            }
        }

        for (name, value) in obj {
            if !BASE_FIELDS.contains(&name.as_str()) {
                wire.fields.insert(name.clone(), value.clone());
            }
        }

        Ok(wire)
    }

    /// Encode as a JSON object
    pub fn to_json(&self) -> JsonValue {
        let mut obj = Map::new();
        for (name, value) in self.iter_fields() {
            obj.insert(name, value);
        }
        JsonValue::Object(obj)
    }
}
