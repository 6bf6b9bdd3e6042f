use crate::behavior::Visibility;
use crate::exception::{Exception, ExceptionKind};
use axum::http::StatusCode;

/// Outcome of the configuration passes for one (non-aggregate) exception.
#[derive(Debug, Clone)]
pub struct Decision {
    pub status: StatusCode,
    /// The exception to render; events may have replaced the original.
    pub exception: Exception,
    pub visibility: Visibility,
    /// Whether an event or a behavior rule took part.
    pub configured: bool,
}

impl Decision {
    /// The built-in classification, ignoring every event and rule.
    pub fn unconfigured(exception: &Exception) -> Self {
        let (status, visibility) = default_classification(exception);
        Self {
            status,
            exception: exception.clone(),
            visibility,
            configured: false,
        }
    }
}

/// Access denied → 403/Suppressed, domain → 400/Exposed, anything else →
/// 500/Suppressed.
pub fn default_classification(exception: &Exception) -> (StatusCode, Visibility) {
    match exception.kind() {
        ExceptionKind::AccessDenied => (StatusCode::FORBIDDEN, Visibility::Suppressed),
        ExceptionKind::Domain { .. } => (StatusCode::BAD_REQUEST, Visibility::Exposed),
        ExceptionKind::Aggregate(_) | ExceptionKind::Unexpected => {
            (StatusCode::INTERNAL_SERVER_ERROR, Visibility::Suppressed)
        }
    }
}
