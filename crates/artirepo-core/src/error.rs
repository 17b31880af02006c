//! Core error types

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Schema composition defect in {schema}: attribute `{attribute}` {message}")]
    SchemaCompositionDefect {
        schema: String,
        attribute: String,
        message: String,
    },

    #[error("Invalid value for `{attribute}`: expected {expected}, got {actual}")]
    InvalidValue {
        attribute: String,
        expected: String,
        actual: String,
    },

    #[error("Unknown attribute: {attribute}")]
    UnknownAttribute { attribute: String },

    #[error("Unknown repository class: {0}")]
    UnknownRclass(String),

    #[error("Unknown package type: {0}")]
    UnknownPackageType(String),

    #[error("Invalid repository variant key: {0} (expected '<rclass>:<package type>')")]
    InvalidVariantKey(String),

    #[error("Invalid wire model: {message}")]
    InvalidWire { message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// A single validation failure, located by attribute path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrorInfo {
    /// Attribute path (e.g. `member[0].url`)
    pub path: String,
    /// Human-readable message
    pub message: String,
    /// What was expected, when known
    pub expected: Option<String>,
    /// What was found, when known
    pub actual: Option<String>,
}

impl ValidationErrorInfo {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn with_expected(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

impl fmt::Display for ValidationErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let (Some(expected), Some(actual)) = (&self.expected, &self.actual) {
            write!(f, " (expected {}, got {})", expected, actual)?;
        }
        Ok(())
    }
}
