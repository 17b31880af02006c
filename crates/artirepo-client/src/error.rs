//! Error types for REST and lifecycle operations

use artirepo_core::CoreError;
use artirepo_engine::EngineError;
use thiserror::Error;

/// Client operation errors
#[derive(Debug, Error)]
pub enum ClientError {
    // ============ Configuration Errors ============
    #[error("Invalid provider configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid Artifactory URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("No credentials configured; set an access token, an API key or a username and password")]
    MissingCredentials,

    // ============ Network Errors ============
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Rate limited by server. Retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    // ============ Authentication Errors ============
    #[error("Authentication required for {url}")]
    AuthRequired { url: String },

    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    #[error("Artifactory license `{license_type}` does not support this provider")]
    Unlicensed { license_type: String },

    // ============ Repository Errors ============
    #[error("Repository not found: {key}")]
    RepositoryNotFound { key: String },

    #[error("Invalid repository key '{key}': {message}")]
    InvalidKey { key: String, message: String },

    #[error("Request for repository {key} ({variant}) failed: {source}")]
    Request {
        key: String,
        variant: String,
        #[source]
        source: Box<ClientError>,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Core(#[from] CoreError),

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Attach the repository a transport error happened for
    pub fn for_repository(self, key: impl Into<String>, variant: impl Into<String>) -> Self {
        ClientError::Request {
            key: key.into(),
            variant: variant.into(),
            source: Box::new(self),
        }
    }

    /// HTTP status behind this error, looking through repository context
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::HttpError { status, .. } => Some(*status),
            ClientError::AuthRequired { .. } => Some(401),
            ClientError::AuthFailed { .. } => Some(403),
            ClientError::RateLimited { .. } => Some(429),
            ClientError::Request { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout { seconds: 30 }
        } else if e.is_connect() {
            ClientError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            ClientError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            ClientError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for ClientError {
    fn from(e: serde_yaml::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        ClientError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
