//! Mock REST client for testing
//!
//! Emulates the repository configuration endpoints of an Artifactory
//! instance in memory, useful for tests without a server.

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ClientError, Result};
use crate::http::{ApiRequest, ApiResponse, Method, RestClient};
use crate::service::{LICENSE_PATH, REPOSITORIES_PATH};

/// Fields the server accepts but never returns
const WRITE_ONLY_FIELDS: &[&str] = &["password"];

/// In-memory Artifactory for testing
#[derive(Clone)]
pub struct MockRestClient {
    /// Storage: repository key -> stored configuration
    store: Arc<RwLock<BTreeMap<String, Map<String, JsonValue>>>>,
    license_type: Arc<RwLock<String>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub heads: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl MockRestClient {
    /// Create a new empty mock with an Enterprise license
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(BTreeMap::new())),
            license_type: Arc::new(RwLock::new("Enterprise Plus".to_string())),
            operations: Arc::new(RwLock::new(OperationCounts::default())),
        }
    }

    /// Create with pre-populated repositories, keyed by their `key` field
    pub async fn with_repositories(repositories: Vec<JsonValue>) -> Self {
        let client = Self::new();
        {
            let mut store = client.store.write().await;
            for repository in repositories {
                if let JsonValue::Object(obj) = repository {
                    if let Some(key) = obj.get("key").and_then(JsonValue::as_str) {
                        store.insert(key.to_string(), obj.clone());
                    }
                }
            }
        }
        client
    }

    pub async fn set_license_type(&self, license_type: impl Into<String>) {
        *self.license_type.write().await = license_type.into();
    }

    /// Get operation counts for assertions
    pub async fn operation_counts(&self) -> OperationCounts {
        self.operations.read().await.clone()
    }

    /// Reset operation counts
    pub async fn reset_counts(&self) {
        *self.operations.write().await = OperationCounts::default();
    }

    /// Stored configuration as the server holds it, including write-only fields
    pub async fn stored(&self, key: &str) -> Option<JsonValue> {
        self.store
            .read()
            .await
            .get(key)
            .cloned()
            .map(JsonValue::Object)
    }

    /// Count stored repositories
    pub async fn repository_count(&self) -> usize {
        self.store.read().await.len()
    }

    async fn handle_repository(&self, request: ApiRequest, key: &str) -> Result<ApiResponse> {
        let mut ops = self.operations.write().await;
        let mut store = self.store.write().await;

        match request.method {
            Method::Get => {
                ops.gets += 1;
                Ok(match store.get(key) {
                    Some(stored) => {
                        let mut body = stored.clone();
                        for field in WRITE_ONLY_FIELDS {
                            body.remove(*field);
                        }
                        ApiResponse::ok(JsonValue::Object(body))
                    }
                    None => ApiResponse::not_found(),
                })
            }
            Method::Head => {
                ops.heads += 1;
                Ok(if store.contains_key(key) {
                    ApiResponse::new(200, None)
                } else {
                    ApiResponse::not_found()
                })
            }
            Method::Put => {
                ops.creates += 1;
                if store.contains_key(key) {
                    return Err(bad_request(format!(
                        "Case insensitive repository key already exists: {}",
                        key
                    )));
                }
                let body = object_body(request.body)?;
                store.insert(key.to_string(), body);
                Ok(ApiResponse::new(
                    200,
                    Some(json!(format!("Successfully created repository '{}'", key))),
                ))
            }
            Method::Post => {
                ops.updates += 1;
                let body = object_body(request.body)?;
                let Some(stored) = store.get_mut(key) else {
                    return Err(bad_request(format!("Repository {} does not exist", key)));
                };
                // Updates merge into the stored configuration
                for (field, value) in body {
                    stored.insert(field, value);
                }
                Ok(ApiResponse::new(200, None))
            }
            Method::Delete => {
                ops.deletes += 1;
                Ok(match store.remove(key) {
                    Some(_) => ApiResponse::new(200, None),
                    None => ApiResponse::not_found(),
                })
            }
        }
    }
}

impl Default for MockRestClient {
    fn default() -> Self {
        Self::new()
    }
}

fn bad_request(message: String) -> ClientError {
    ClientError::HttpError {
        status: 400,
        message,
    }
}

fn object_body(body: Option<JsonValue>) -> Result<Map<String, JsonValue>> {
    match body {
        Some(JsonValue::Object(obj)) => Ok(obj),
        _ => Err(bad_request("Request body must be a JSON object".to_string())),
    }
}

#[async_trait]
impl RestClient for MockRestClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        if request.path == LICENSE_PATH && request.method == Method::Get {
            let license_type = self.license_type.read().await.clone();
            return Ok(ApiResponse::ok(json!({
                "type": license_type,
                "validThrough": "Dec 31, 2099",
                "licensedTo": "JFrog"
            })));
        }

        let prefix = format!("{}/", REPOSITORIES_PATH);
        match request.path.strip_prefix(&prefix) {
            Some(segment) if !segment.is_empty() && !segment.contains('/') => {
                let key = urlencoding::decode(segment)
                    .map_err(|e| bad_request(format!("Malformed repository key: {}", e)))?
                    .into_owned();
                self.handle_repository(request, &key).await
            }
            _ => Ok(ApiResponse::not_found()),
        }
    }
}
