use crate::behavior::Visibility;
use crate::exception::Exception;
use crate::interceptor::{EventResult, ExceptionEvent, Interception};
use axum::http::StatusCode;

/// An event built from a predicate and a mapping closure
pub struct MapException<P, F> {
    name: String,
    predicate: P,
    map: F,
}

impl<P, F> MapException<P, F>
where
    P: Fn(StatusCode, &Exception) -> bool + Send + Sync + 'static,
    F: Fn(StatusCode, &Exception) -> EventResult + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, predicate: P, map: F) -> Self {
        Self {
            name: name.into(),
            predicate,
            map,
        }
    }
}

impl<P, F> ExceptionEvent for MapException<P, F>
where
    P: Fn(StatusCode, &Exception) -> bool + Send + Sync + 'static,
    F: Fn(StatusCode, &Exception) -> EventResult + Send + Sync + 'static,
{
    fn is_eligible(&self, status: StatusCode, exception: &Exception) -> bool {
        (self.predicate)(status, exception)
    }

    fn intercept(&self, status: StatusCode, exception: &Exception) -> EventResult {
        (self.map)(status, exception)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Forces a status code and visibility for every exception carrying `tag`
pub struct ForTag {
    tag: String,
    status: StatusCode,
    visibility: Visibility,
}

impl ForTag {
    pub fn new(tag: impl Into<String>, status: StatusCode, visibility: Visibility) -> Self {
        Self {
            tag: tag.into(),
            status,
            visibility,
        }
    }
}

impl ExceptionEvent for ForTag {
    fn is_eligible(&self, _status: StatusCode, exception: &Exception) -> bool {
        exception.is_a(&self.tag)
    }

    fn intercept(&self, _status: StatusCode, exception: &Exception) -> EventResult {
        Ok(Interception::new(self.status, exception.clone()).with_visibility(self.visibility))
    }
}
