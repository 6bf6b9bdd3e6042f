//! Resolution engine
//!
//! [`ExceptionHandler`] turns an exception and an ambient status code into
//! rendered responses:
//!
//! ```text
//! 1. Aggregate?            → resolve each child from the ambient status,
//!    ↓                       the last child's status wins
//! 2. Interceptor chain     ← events, registration order
//!    ↓
//! 3. Behavior registry     ← only when no event chose a visibility
//!    ↓
//! 4. Default table         ← only when nothing above took part
//!    ↓
//! 5. Render                → Exposed view / Forbidden / {logEntryId} / nothing
//! ```
//!
//! The handler never fails. A failing event or serializer is logged with
//! `severity = "critical"` and the exception falls back to the default table,
//! rendered by the built-in serializer.

use crate::behavior::Visibility;
use crate::common::{CONTENT_TYPE_JSON, RenderedResponse, Resolution, ResponseSink};
use crate::config::{HandlerConfiguration, IgnoredLogging};
use crate::error::SerializeError;
use crate::exception::{Exception, ExceptionKind};
use crate::interceptor::{InterceptorFailure, panic_message};
use crate::serializer::{
    ExceptionSerializer, ExceptionView, ForbiddenView, InternalErrorRecord, JsonExceptionSerializer,
    ResponseBody, SerializeContext,
};
use axum::http::StatusCode;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use uuid::Uuid;

mod decision;
pub mod layer;

pub use decision::{Decision, default_classification};
pub use layer::{ExceptionLayer, ExceptionMiddleware};

/// Status assumed when the transport gives no better ambient value.
pub const DEFAULT_AMBIENT_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

/// Translates exceptions into HTTP responses.
///
/// Cheap to clone; the configuration is shared read-only.
///
/// # Example
/// ```
/// use meshestra_exception::prelude::*;
///
/// let handler = ExceptionHandler::new(HandlerConfiguration::default());
/// let exception = Exception::new(DomainError::new("NameRequired", "Name is required"));
///
/// let resolution = handler.resolve(&exception, StatusCode::INTERNAL_SERVER_ERROR);
/// assert_eq!(resolution.status, StatusCode::BAD_REQUEST);
/// assert_eq!(
///     resolution.bodies().next(),
///     Some(r#"{"key":"NameRequired","errors":[],"message":"Name is required"}"#)
/// );
/// ```
#[derive(Clone, Debug)]
pub struct ExceptionHandler {
    configuration: Arc<HandlerConfiguration>,
}

impl Default for ExceptionHandler {
    fn default() -> Self {
        Self::new(HandlerConfiguration::default())
    }
}

impl ExceptionHandler {
    pub fn new(configuration: HandlerConfiguration) -> Self {
        Self {
            configuration: Arc::new(configuration),
        }
    }

    pub fn from_arc(configuration: Arc<HandlerConfiguration>) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &HandlerConfiguration {
        &self.configuration
    }

    /// Resolve and write every response to `sink`.
    ///
    /// The ambient status is read from the sink. Each response is rendered in
    /// memory before its single write. Returns the final status.
    pub async fn handle<S>(&self, exception: &Exception, sink: &mut S) -> StatusCode
    where
        S: ResponseSink + ?Sized,
    {
        let resolution = self.resolve(exception, sink.status());

        for rendered in resolution.responses {
            sink.set_status(rendered.status);
            if let Some(body) = rendered.body {
                sink.set_content_type(CONTENT_TYPE_JSON);
                if let Err(e) = sink.write(body.as_bytes()).await {
                    tracing::error!(
                        status = rendered.status.as_u16(),
                        "Failed to write exception response: {}",
                        e
                    );
                }
            }
        }

        sink.set_status(resolution.status);
        resolution.status
    }

    /// Resolve `exception` into rendered responses.
    pub fn resolve(&self, exception: &Exception, ambient: StatusCode) -> Resolution {
        let mut responses = Vec::new();
        let status = self.resolve_into(exception, ambient, &mut responses);
        Resolution { status, responses }
    }

    fn resolve_into(
        &self,
        exception: &Exception,
        ambient: StatusCode,
        responses: &mut Vec<RenderedResponse>,
    ) -> StatusCode {
        if let Some(children) = exception.children().filter(|c| !c.is_empty()) {
            tracing::debug!(children = children.len(), "Resolving aggregate exception");
            // Sequential overwrite: the last child decides the status.
            let mut status = ambient;
            for child in children {
                status = self.resolve_into(child, ambient, responses);
            }
            return status;
        }

        let rendered = self.resolve_leaf(exception, ambient);
        let status = rendered.status;
        responses.push(rendered);
        status
    }

    /// Run the event and behavior passes for a single exception.
    ///
    /// A failing event discards the whole pass in favour of the default
    /// classification.
    pub fn decide(&self, exception: &Exception, ambient: StatusCode) -> Decision {
        match self.try_decide(exception, ambient) {
            Ok(decision) => decision,
            Err(failure) => {
                tracing::error!(
                    severity = "critical",
                    interceptor = %failure.event,
                    tag = exception.tag(),
                    "Exception event failed, using default classification: {}",
                    failure.message
                );
                Decision::unconfigured(exception)
            }
        }
    }

    fn try_decide(
        &self,
        exception: &Exception,
        ambient: StatusCode,
    ) -> Result<Decision, InterceptorFailure> {
        let outcome = self.configuration.events.apply_all(ambient, exception)?;

        let mut configured = outcome.eligible;
        let mut status = outcome.status;
        let mut visibility = outcome.visibility;
        let exception = outcome.exception;

        if visibility.is_none() {
            if let Some(rule) = self.configuration.behaviors.lookup(&exception) {
                tracing::debug!(
                    rule = rule.tag(),
                    tag = exception.tag(),
                    status = rule.status().as_u16(),
                    "Behavior rule matched"
                );
                configured = true;
                status = rule.status();
                visibility = Some(rule.visibility());
            }
        }

        let (default_status, default_visibility) = default_classification(&exception);
        if !configured {
            status = default_status;
        }

        Ok(Decision {
            status,
            visibility: visibility.unwrap_or(default_visibility),
            exception,
            configured,
        })
    }

    fn resolve_leaf(&self, exception: &Exception, ambient: StatusCode) -> RenderedResponse {
        let decision = self.decide(exception, ambient);
        let log_entry_id = Uuid::new_v4();
        let Some(body) = self.prepare(&decision, log_entry_id) else {
            self.log_decision(&decision, log_entry_id);
            return RenderedResponse::empty(decision.status);
        };

        let serializer = self.configuration.serializer();
        match self.serialize_with(serializer, &body, decision.status) {
            Ok(text) => {
                self.log_decision(&decision, log_entry_id);
                RenderedResponse::json(decision.status, text)
            }
            Err(message) => {
                tracing::error!(
                    severity = "critical",
                    serializer = serializer.name(),
                    tag = decision.exception.tag(),
                    "Exception serializer failed, using default classification: {}",
                    message
                );
                self.fallback(exception, log_entry_id)
            }
        }
    }

    /// Default classification rendered by the built-in serializer.
    ///
    /// Reuses the correlation id of the failed attempt.
    fn fallback(&self, exception: &Exception, log_entry_id: Uuid) -> RenderedResponse {
        let decision = Decision::unconfigured(exception);
        self.log_decision(&decision, log_entry_id);
        let Some(body) = self.prepare(&decision, log_entry_id) else {
            return RenderedResponse::empty(decision.status);
        };

        let serializer = JsonExceptionSerializer::new();
        match self.serialize_with(&serializer, &body, decision.status) {
            Ok(text) => RenderedResponse::json(decision.status, text),
            Err(message) => {
                tracing::error!(
                    severity = "critical",
                    serializer = serializer.name(),
                    log_entry_id = %log_entry_id,
                    "Built-in serializer failed: {}",
                    message
                );
                let text = serde_json::json!({ "logEntryId": log_entry_id }).to_string();
                RenderedResponse::json(decision.status, text)
            }
        }
    }

    fn serialize_with(
        &self,
        serializer: &dyn ExceptionSerializer,
        body: &ResponseBody,
        status: StatusCode,
    ) -> Result<String, String> {
        let context = SerializeContext {
            status,
            diagnostic: self.configuration.diagnostic,
        };
        catch_unwind(AssertUnwindSafe(|| serializer.serialize(body, &context)))
            .map_err(|panic| panic_message(&*panic))?
            .map_err(|e: SerializeError| e.to_string())
    }

    /// Build the body to serialize; `None` for ignored exceptions.
    fn prepare(&self, decision: &Decision, log_entry_id: Uuid) -> Option<ResponseBody> {
        let exception = &decision.exception;
        match (decision.visibility, exception.kind()) {
            (Visibility::Ignored, _) => None,
            (_, ExceptionKind::AccessDenied) => Some(ResponseBody::Forbidden(ForbiddenView::default())),
            (Visibility::Exposed, _) => Some(ResponseBody::Exposed(ExceptionView::of(exception))),
            (Visibility::Suppressed, _) => {
                let mut record = InternalErrorRecord::new(log_entry_id);
                if self.configuration.diagnostic {
                    record = record.with_exception(exception);
                }
                Some(ResponseBody::Internal(record))
            }
        }
    }

    /// One log entry per rendered response; suppressed exceptions carry the
    /// id sent to the client.
    fn log_decision(&self, decision: &Decision, log_entry_id: Uuid) {
        let exception = &decision.exception;
        let status = decision.status.as_u16();

        match (decision.visibility, exception.kind()) {
            (Visibility::Ignored, _) => match self.configuration.ignored_logging {
                IgnoredLogging::Off => {}
                IgnoredLogging::Debug => {
                    tracing::debug!(status, tag = exception.tag(), "Ignored exception: {}", exception)
                }
                IgnoredLogging::Info => {
                    tracing::info!(status, tag = exception.tag(), "Ignored exception: {}", exception)
                }
            },
            (_, ExceptionKind::AccessDenied) => {
                tracing::info!(status, tag = exception.tag(), "Access denied: {}", exception)
            }
            (Visibility::Exposed, _) => {
                tracing::info!(status, tag = exception.tag(), "Client error: {}", exception)
            }
            (Visibility::Suppressed, _) => {
                tracing::error!(
                    log_entry_id = %log_entry_id,
                    status,
                    tag = exception.tag(),
                    error = ?exception,
                    "{}: Unexpected error occurred: {}",
                    log_entry_id,
                    exception
                );
            }
        }
    }
}
