//! REST transport to Artifactory
//!
//! `RestClient` is the seam between the lifecycle service and the network.
//! Successful responses and `404 Not Found` come back as `ApiResponse` so
//! callers can tell absence from failure; every other status is an error.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value as JsonValue;
use std::time::Duration;
use url::Url;

use crate::config::ProviderConfig;
use crate::credentials::Credentials;
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Put,
    Post,
    Delete,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One call against the Artifactory REST API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the platform URL, e.g. `/artifactory/api/repositories/libs`
    pub path: String,
    pub body: Option<JsonValue>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::Head, path)
    }

    pub fn put(path: impl Into<String>, body: JsonValue) -> Self {
        Self::new(Method::Put, path).with_body(body)
    }

    pub fn post(path: impl Into<String>, body: JsonValue) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// JSON body; plain-text bodies are kept as a JSON string
    pub body: Option<JsonValue>,
}

impl ApiResponse {
    pub fn new(status: u16, body: Option<JsonValue>) -> Self {
        Self { status, body }
    }

    pub fn ok(body: JsonValue) -> Self {
        Self::new(200, Some(body))
    }

    pub fn not_found() -> Self {
        Self::new(404, None)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Transport used by the lifecycle service
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Send a request; `Ok` carries a 2xx or 404 response
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// `RestClient` over reqwest
pub struct HttpRestClient {
    client: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    timeout: Duration,
}

impl HttpRestClient {
    /// Build a client from validated provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        Self::with_parts(config.base_url()?, config.credentials()?, config.timeout)
    }

    pub fn with_parts(base_url: Url, credentials: Credentials, timeout: Duration) -> Result<Self> {
        if base_url.scheme() != "https" {
            tracing::warn!(
                "Sending {} credentials to {} over plain HTTP",
                credentials.scheme(),
                base_url
            );
        }

        let client = reqwest::Client::builder()
            // Redirects could forward the credential header to another host
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::NetworkError {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            credentials,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl RestClient for HttpRestClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request.path)?;
        let (header, value) = self.credentials.header();

        let mut builder = self
            .client
            .request(request.method.as_reqwest(), url.clone())
            .header(header, value);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| match ClientError::from(e) {
            ClientError::Timeout { .. } => ClientError::Timeout {
                seconds: self.timeout.as_secs(),
            },
            other => other,
        })?;
        let status = response.status();
        tracing::debug!(method = ?request.method, url = %url, status = status.as_u16(), "artifactory request");

        // Handle rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            tracing::warn!("Rate limited by {}, retry after {}s", url, retry_after);
            return Err(ClientError::RateLimited { retry_after });
        }

        // Handle auth errors
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::AuthRequired {
                url: url.to_string(),
            });
        }
        if status == StatusCode::FORBIDDEN {
            return Err(ClientError::AuthFailed {
                message: format!("Access denied to {}", url),
            });
        }

        let text = response.text().await?;
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(ApiResponse::new(status.as_u16(), parse_body(&text)));
        }

        Err(ClientError::HttpError {
            status: status.as_u16(),
            message: error_message(&text).unwrap_or_else(|| format!("Request to {} failed", url)),
        })
    }
}

fn parse_body(text: &str) -> Option<JsonValue> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| JsonValue::String(text.to_string())))
}

/// Message from an Artifactory error body: `{"errors":[{"status":400,"message":"..."}]}`
fn error_message(text: &str) -> Option<String> {
    match parse_body(text)? {
        JsonValue::String(s) => Some(s),
        json => {
            let messages: Vec<&str> = json
                .get("errors")?
                .as_array()?
                .iter()
                .filter_map(|e| e.get("message").and_then(JsonValue::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
    }
}
