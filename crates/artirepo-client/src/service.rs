//! Repository lifecycle
//!
//! `RepositoryService` drives create/read/update/delete for any registered
//! variant: configuration is validated and unpacked into a wire body, sent
//! through a `RestClient`, and the server's view is packed back into state.

use artirepo_core::validators::repo_key;
use artirepo_core::{ConfigurationModel, Value, WireModel};
use artirepo_engine::{RepositoryResource, SchemaRegistry, StoredState};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::error::{ClientError, Result};
use crate::http::{ApiRequest, ApiResponse, HttpRestClient, RestClient};

pub const REPOSITORIES_PATH: &str = "/artifactory/api/repositories";
pub const LICENSE_PATH: &str = "/artifactory/api/system/license";

/// License types without repository management support
const UNSUPPORTED_LICENSES: &[&str] = &["OSS", "Community Edition for C/C++", "JCR Edition"];

/// Endpoint of one repository; the key is encoded as a single path segment
fn repository_path(key: &str) -> String {
    format!("{}/{}", REPOSITORIES_PATH, urlencoding::encode(key))
}

fn check_key(key: &str) -> Result<()> {
    match repo_key().check(&Value::from(key)) {
        Some(message) => Err(ClientError::InvalidKey {
            key: key.to_string(),
            message,
        }),
        None => Ok(()),
    }
}

/// Lifecycle operations over a `RestClient`
pub struct RepositoryService<C: RestClient> {
    registry: Arc<SchemaRegistry>,
    client: C,
}

impl<C: RestClient> RepositoryService<C> {
    pub fn new(registry: Arc<SchemaRegistry>, client: C) -> Self {
        Self { registry, client }
    }

    /// Service over every built-in variant
    pub fn builtin(client: C) -> Self {
        Self::new(Arc::new(SchemaRegistry::builtin()), client)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn resource(&self, variant: &str) -> Result<&RepositoryResource> {
        Ok(self.registry.get(variant)?)
    }

    async fn call(
        &self,
        resource: &RepositoryResource,
        key: &str,
        request: ApiRequest,
    ) -> Result<ApiResponse> {
        self.client
            .send(request)
            .await
            .map_err(|e| e.for_repository(key, resource.variant().key()))
    }

    /// Send a create or update; a 404 here is a failed write, not an absent repository
    async fn write(
        &self,
        resource: &RepositoryResource,
        key: &str,
        request: ApiRequest,
    ) -> Result<()> {
        let response = self.call(resource, key, request).await?;
        if response.is_success() {
            return Ok(());
        }
        let message = match response.body {
            Some(JsonValue::String(text)) => text,
            _ => format!("write to repository {} was not accepted", key),
        };
        Err(ClientError::HttpError {
            status: response.status,
            message,
        }
        .for_repository(key, resource.variant().key()))
    }

    /// Fetch and decode the server's view; `None` when absent
    async fn fetch(&self, resource: &RepositoryResource, key: &str) -> Result<Option<WireModel>> {
        let response = self.call(resource, key, ApiRequest::get(repository_path(key))).await?;
        if response.is_not_found() {
            return Ok(None);
        }
        let body = response.body.ok_or_else(|| {
            ClientError::Serialization(format!("empty response for repository {}", key))
                .for_repository(key, resource.variant().key())
        })?;
        Ok(Some(resource.decode_wire(&body)?))
    }

    fn key_of(config: &ConfigurationModel) -> Result<String> {
        config
            .get_str("key")
            .map(str::to_string)
            .ok_or_else(|| ClientError::InvalidConfig {
                message: "configuration has no key".to_string(),
            })
    }

    /// Create a repository and return the state read back from the server
    pub async fn create(&self, variant: &str, config: &ConfigurationModel) -> Result<ConfigurationModel> {
        let resource = self.resource(variant)?;
        resource.validate(config)?;
        let key = Self::key_of(config)?;
        let wire = resource.unpack(config)?;

        info!(variant = variant, key = %key, "creating repository");
        self.write(resource, &key, ApiRequest::put(repository_path(&key), wire.to_json()))
            .await?;

        let state = self.read(variant, &key, config).await?;
        state.ok_or(ClientError::RepositoryNotFound { key })
    }

    /// Read a repository into state, keeping values the server never returns
    ///
    /// Returns `None` when the repository no longer exists.
    pub async fn read(
        &self,
        variant: &str,
        key: &str,
        prior: &ConfigurationModel,
    ) -> Result<Option<ConfigurationModel>> {
        let resource = self.resource(variant)?;
        check_key(key)?;
        let Some(wire) = self.fetch(resource, key).await? else {
            debug!(variant = variant, key = key, "repository not found");
            return Ok(None);
        };

        let mut state = prior.clone();
        resource.pack_into(&wire, &mut state)?;
        Ok(Some(state))
    }

    /// Update a repository and return the state read back from the server
    pub async fn update(&self, variant: &str, config: &ConfigurationModel) -> Result<ConfigurationModel> {
        let resource = self.resource(variant)?;
        resource.validate(config)?;
        let key = Self::key_of(config)?;
        let wire = resource.unpack(config)?;

        info!(variant = variant, key = %key, "updating repository");
        self.write(resource, &key, ApiRequest::post(repository_path(&key), wire.to_json()))
            .await?;

        let state = self.read(variant, &key, config).await?;
        state.ok_or(ClientError::RepositoryNotFound { key })
    }

    /// Delete a repository; deleting one that is already gone succeeds
    pub async fn delete(&self, variant: &str, key: &str) -> Result<()> {
        let resource = self.resource(variant)?;
        check_key(key)?;

        info!(variant = variant, key = key, "deleting repository");
        let response = self
            .call(resource, key, ApiRequest::delete(repository_path(key)))
            .await?;
        if response.is_not_found() {
            debug!(variant = variant, key = key, "repository already deleted");
        }
        Ok(())
    }

    /// Whether a repository with this key exists, whatever its variant
    pub async fn exists(&self, key: &str) -> Result<bool> {
        check_key(key)?;
        match self.client.send(ApiRequest::head(repository_path(key))).await {
            Ok(response) => Ok(response.is_success()),
            // Some versions answer HEAD on a missing key with 400
            Err(ClientError::HttpError { status: 400, .. }) => Ok(false),
            Err(e) => Err(e.for_repository(key, "any")),
        }
    }

    /// Read a repository for the data source, where every attribute is computed
    pub async fn read_data_source(&self, variant: &str, key: &str) -> Result<ConfigurationModel> {
        let resource = self.resource(variant)?;
        check_key(key)?;
        let wire = self
            .fetch(resource, key)
            .await?
            .ok_or_else(|| ClientError::RepositoryNotFound {
                key: key.to_string(),
            })?;
        Ok(resource.pack_data_source(&wire)?)
    }

    /// Bring persisted state to the variant's current schema version
    pub fn upgrade_state(&self, variant: &str, state: &StoredState) -> Result<StoredState> {
        let resource = self.resource(variant)?;
        Ok(resource.upgrade_state(state)?)
    }

    /// Check the instance license allows repository management
    pub async fn check_license(&self) -> Result<String> {
        let response = self.client.send(ApiRequest::get(LICENSE_PATH)).await?;
        let license_type = response
            .body
            .as_ref()
            .and_then(|b| b.get("type"))
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();

        if license_type.is_empty() || UNSUPPORTED_LICENSES.contains(&license_type.as_str()) {
            return Err(ClientError::Unlicensed { license_type });
        }
        debug!(license = %license_type, "license check passed");
        Ok(license_type)
    }
}

impl RepositoryService<HttpRestClient> {
    /// Connect to the configured instance, checking its license unless disabled
    pub async fn connect(config: &ProviderConfig) -> Result<Self> {
        let service = Self::builtin(HttpRestClient::new(config)?);
        if config.check_license {
            let license = service.check_license().await?;
            info!(license = %license, "connected to Artifactory");
        }
        Ok(service)
    }
}
