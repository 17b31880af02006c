//! Artifactory credentials
//!
//! Artifactory accepts three schemes: scoped access tokens as bearer
//! tokens, legacy API keys in their own header, and basic authentication.

use std::fmt;

use base64::Engine;

/// Header carrying a legacy API key
pub const API_KEY_HEADER: &str = "X-JFrog-Art-Api";

/// Credential types supported
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Access token sent as `Authorization: Bearer`
    Bearer { token: String },

    /// Legacy API key
    ApiKey { key: String },

    /// Basic authentication (username/password)
    Basic { username: String, password: String },
}

impl Credentials {
    /// Create bearer token credentials
    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer {
            token: token.into(),
        }
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Credentials::ApiKey { key: key.into() }
    }

    /// Create basic auth credentials
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Header name and value to send with each request
    pub fn header(&self) -> (&'static str, String) {
        match self {
            Credentials::Bearer { token } => ("Authorization", format!("Bearer {}", token)),
            Credentials::ApiKey { key } => (API_KEY_HEADER, key.clone()),
            Credentials::Basic { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                ("Authorization", format!("Basic {}", encoded))
            }
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Credentials::Bearer { .. } => "bearer",
            Credentials::ApiKey { .. } => "api-key",
            Credentials::Basic { .. } => "basic",
        }
    }
}

// Secrets stay out of logs and panics
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
            Credentials::ApiKey { .. } => f.debug_struct("ApiKey").field("key", &"***").finish(),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}
