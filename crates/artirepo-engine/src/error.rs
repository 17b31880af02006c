//! Engine error types

use artirepo_core::{CoreError, ValidationErrorInfo};
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while translating or migrating repository state
#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    /// Configuration could not be turned into a wire model
    #[error("Cannot unpack `{attribute}` for {variant}: {message}")]
    #[diagnostic(code(artirepo::engine::unpack))]
    Unpack {
        variant: String,
        attribute: String,
        message: String,
    },

    /// A custom pack transform rejected the wire model
    #[error("Pack transform `{transform}` failed for {variant}: {message}")]
    #[diagnostic(code(artirepo::engine::pack_transform))]
    PackTransform {
        variant: String,
        transform: String,
        message: String,
    },

    /// A wire field did not have the shape its attribute expects
    #[error("Cannot pack wire field `{field}` for {variant}: {message}")]
    #[diagnostic(
        code(artirepo::engine::pack_decode),
        help("the server returned a value of an unexpected type")
    )]
    PackDecode {
        variant: String,
        field: String,
        message: String,
    },

    /// Persisted state could not be brought to the current schema version
    #[error("Cannot migrate {variant} state from version {from} to {to}: {message}")]
    #[diagnostic(code(artirepo::engine::migration))]
    Migration {
        variant: String,
        from: u32,
        to: u32,
        message: String,
    },

    /// Configuration failed attribute validation
    #[error("Configuration for {variant} is invalid ({} error(s))", .errors.len())]
    #[diagnostic(code(artirepo::engine::validation))]
    Validation {
        variant: String,
        errors: Vec<ValidationErrorInfo>,
        #[help]
        help: Option<String>,
    },

    /// No resource is registered under the key
    #[error("Unknown repository variant: {key}")]
    #[diagnostic(code(artirepo::engine::unknown_variant))]
    UnknownVariant {
        key: String,
        #[help]
        suggestion: Option<String>,
    },

    #[error(transparent)]
    #[diagnostic(code(artirepo::engine::core))]
    Core(#[from] CoreError),
}

impl EngineError {
    /// Build a validation error listing every failure in the help text
    pub fn validation(variant: impl Into<String>, errors: Vec<ValidationErrorInfo>) -> Self {
        let help = (!errors.is_empty()).then(|| {
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        });
        Self::Validation {
            variant: variant.into(),
            errors,
            help,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_help_lists_failures() {
        let err = EngineError::validation(
            "local:docker",
            vec![
                ValidationErrorInfo::new("key", "required attribute is missing"),
                ValidationErrorInfo::new("tag_retention", "0 is less than 1"),
            ],
        );

        assert_eq!(err.to_string(), "Configuration for local:docker is invalid (2 error(s))");
        let help = err.help().map(|h| h.to_string()).unwrap();
        assert!(help.contains("key: required attribute is missing"));
        assert!(help.contains("tag_retention: 0 is less than 1"));
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = EngineError::UnknownVariant {
            key: "local:alpin".to_string(),
            suggestion: Some("Did you mean `local:alpine`?".to_string()),
        };

        assert_eq!(
            err.code().map(|c| c.to_string()),
            Some("artirepo::engine::unknown_variant".to_string())
        );
    }
}
