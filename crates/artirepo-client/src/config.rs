//! Provider configuration
//!
//! Stored in `~/.config/artirepo/provider.yaml`. Environment variables
//! override the file, so CI pipelines can run without one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::credentials::Credentials;
use crate::error::{ClientError, Result};

/// Variables consulted for the instance URL, first match wins
pub const URL_VARS: &[&str] = &["JFROG_URL", "ARTIFACTORY_URL"];
/// Variables consulted for an access token, first match wins
pub const ACCESS_TOKEN_VARS: &[&str] = &["JFROG_ACCESS_TOKEN", "ARTIFACTORY_ACCESS_TOKEN"];
pub const API_KEY_VAR: &str = "ARTIFACTORY_API_KEY";

/// Connection settings for one Artifactory instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Base URL of the JFrog platform, e.g. `https://acme.jfrog.io`
    #[serde(default)]
    pub url: Option<String>,

    /// Scoped access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Legacy API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Refuse to run against an OSS instance
    #[serde(default = "default_check_license")]
    pub check_license: bool,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_check_license() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: None,
            access_token: None,
            api_key: None,
            username: None,
            password: None,
            timeout: default_timeout(),
            check_license: default_check_license(),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from default location, then apply the environment
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| ClientError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("artirepo").join("provider.yaml"))
    }

    /// Override settings from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Override settings from `lookup`; empty values are ignored
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(name).filter(|v| !v.is_empty()))
        };

        if let Some(url) = first(URL_VARS) {
            self.url = Some(url);
        }
        if let Some(token) = first(ACCESS_TOKEN_VARS) {
            self.access_token = Some(token);
        }
        if let Some(key) = first(&[API_KEY_VAR]) {
            self.api_key = Some(key);
        }
    }

    /// Parsed base URL, always ending in `/` so API paths join beneath it
    pub fn base_url(&self) -> Result<Url> {
        let raw = self.url.as_deref().filter(|u| !u.is_empty()).ok_or_else(|| {
            ClientError::InvalidConfig {
                message: format!("url is not set (set it in the file or via {})", URL_VARS.join(" or ")),
            }
        })?;

        let mut url = Url::parse(raw).map_err(|e| ClientError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl {
                url: raw.to_string(),
                reason: "URL must start with http:// or https://".to_string(),
            });
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Credentials to authenticate with: access token, then API key, then basic
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(token) = self.access_token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(Credentials::bearer(token));
        }
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(Credentials::api_key(key));
        }
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() => {
                Ok(Credentials::basic(username, password))
            }
            _ => Err(ClientError::MissingCredentials),
        }
    }

    /// Check the URL and credentials without connecting
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        self.credentials()?;
        if self.timeout.is_zero() {
            return Err(ClientError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
