use super::{Exception, ExceptionKind, Fault, ROOT_TAG};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single sub-error attached to a [`DomainError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub key: String,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Expected, caller-caused failure with a stable key.
///
/// Rendered as `{"key": .., "errors": [..], "message": ..}` when exposed.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DomainError {
    key: String,
    message: String,
    errors: Vec<ErrorDetail>,
}

impl DomainError {
    pub const TAG: &'static str = "DomainError";

    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Attach a sub-error.
    pub fn with_error(mut self, detail: ErrorDetail) -> Self {
        self.errors.push(detail);
        self
    }

    pub fn with_errors(mut self, details: impl IntoIterator<Item = ErrorDetail>) -> Self {
        self.errors.extend(details);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn errors(&self) -> &[ErrorDetail] {
        &self.errors
    }
}

impl Fault for DomainError {
    fn lineage(&self) -> Vec<&'static str> {
        vec![Self::TAG, ROOT_TAG]
    }

    fn kind(&self) -> ExceptionKind<'_> {
        ExceptionKind::Domain {
            key: &self.key,
            errors: &self.errors,
        }
    }
}

/// The caller is not allowed to perform the operation.
///
/// Its message is logged but never rendered; responses carry a fixed
/// `Forbidden` body instead.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AccessDeniedError {
    message: String,
}

impl AccessDeniedError {
    pub const TAG: &'static str = "AccessDeniedError";

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for AccessDeniedError {
    fn default() -> Self {
        Self::new("Attempted to perform an unauthorized operation.")
    }
}

impl Fault for AccessDeniedError {
    fn lineage(&self) -> Vec<&'static str> {
        vec![Self::TAG, ROOT_TAG]
    }

    fn kind(&self) -> ExceptionKind<'_> {
        ExceptionKind::AccessDenied
    }
}

/// Several independent failures raised together.
#[derive(Debug, Clone, Default)]
pub struct AggregateError {
    children: Vec<Exception>,
}

impl AggregateError {
    pub const TAG: &'static str = "AggregateError";

    pub fn new(children: impl IntoIterator<Item = Exception>) -> Self {
        Self {
            children: children.into_iter().collect(),
        }
    }

    pub fn children(&self) -> &[Exception] {
        &self.children
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "One or more errors occurred.")?;
        for child in &self.children {
            write!(f, " ({})", child)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

impl Fault for AggregateError {
    fn lineage(&self) -> Vec<&'static str> {
        vec![Self::TAG, ROOT_TAG]
    }

    fn kind(&self) -> ExceptionKind<'_> {
        ExceptionKind::Aggregate(&self.children)
    }
}
