use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// Errors raised while assembling a handler configuration.
///
/// These surface at startup only. Once a [`HandlerConfiguration`](crate::config::HandlerConfiguration)
/// is built, request-time resolution never fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Duplicate behavior rule for exception: {tag}")]
    DuplicateRule { tag: String },

    #[error("Invalid status code {code} for exception: {tag}")]
    InvalidStatus { tag: String, code: u16 },

    #[error("Invalid behavior rule '{rule}': {message}")]
    InvalidRule { rule: String, message: String },
}

impl ConfigurationError {
    pub fn duplicate_rule(tag: impl Into<String>) -> Self {
        Self::DuplicateRule { tag: tag.into() }
    }

    pub fn invalid_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Failure produced by an [`ExceptionSerializer`](crate::serializer::ExceptionSerializer).
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serializer failure: {0}")]
    Custom(String),
}
