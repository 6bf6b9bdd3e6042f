//! Client-safe views
//!
//! Only these structures are ever handed to a serializer. A fault contributes
//! its message, and for domain errors its key and sub-errors; nothing else it
//! carries can reach a response body.

use crate::exception::{ErrorDetail, Exception, ExceptionKind};
use serde::Serialize;
use uuid::Uuid;

pub const FORBIDDEN_KEY: &str = "Forbidden";
pub const FORBIDDEN_MESSAGE: &str = "Access to this resource is forbidden.";

/// Exposed view of a domain error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientErrorView {
    pub key: String,
    pub errors: Vec<ErrorDetail>,
    pub message: String,
}

/// Exposed view of any other exception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub message: String,
}

/// Fixed body sent for access-denied failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForbiddenView {
    pub key: &'static str,
    pub message: &'static str,
}

impl Default for ForbiddenView {
    fn default() -> Self {
        Self {
            key: FORBIDDEN_KEY,
            message: FORBIDDEN_MESSAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExceptionView {
    Domain(ClientErrorView),
    Message(MessageView),
}

impl ExceptionView {
    pub fn of(exception: &Exception) -> Self {
        match exception.kind() {
            ExceptionKind::Domain { key, errors } => Self::Domain(ClientErrorView {
                key: key.to_string(),
                errors: errors.to_vec(),
                message: exception.message(),
            }),
            _ => Self::Message(MessageView {
                message: exception.message(),
            }),
        }
    }
}

/// Body of a suppressed response.
///
/// `exception` is filled only in diagnostic mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalErrorRecord {
    pub log_entry_id: Uuid,
    pub exception: Option<ExceptionView>,
}

impl InternalErrorRecord {
    pub fn new(log_entry_id: Uuid) -> Self {
        Self {
            log_entry_id,
            exception: None,
        }
    }

    pub fn with_exception(mut self, exception: &Exception) -> Self {
        self.exception = Some(ExceptionView::of(exception));
        self
    }
}

/// Everything a serializer may be asked to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Exposed(ExceptionView),
    Forbidden(ForbiddenView),
    Internal(InternalErrorRecord),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::DomainError;

    #[derive(Debug, thiserror::Error)]
    #[error("query failed")]
    struct QueryFailed {
        #[allow(dead_code)]
        connection_string: String,
    }

    #[test]
    fn test_domain_view_field_order() {
        let exception = Exception::new(DomainError::new("DomainException", "erro"));
        let body = ResponseBody::Exposed(ExceptionView::of(&exception));

        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"key":"DomainException","errors":[],"message":"erro"}"#
        );
    }

    #[test]
    fn test_foreign_fields_never_serialized() {
        let exception = Exception::from_error(QueryFailed {
            connection_string: "postgres://secret".into(),
        });
        let json = serde_json::to_string(&ExceptionView::of(&exception)).unwrap();

        assert_eq!(json, r#"{"message":"query failed"}"#);
    }

    #[test]
    fn test_forbidden_body() {
        let json = serde_json::to_string(&ResponseBody::Forbidden(ForbiddenView::default())).unwrap();
        assert_eq!(
            json,
            r#"{"key":"Forbidden","message":"Access to this resource is forbidden."}"#
        );
    }
}
