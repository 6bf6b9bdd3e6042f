use crate::behavior::Visibility;
use crate::exception::Exception;
use axum::http::StatusCode;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

pub mod builtins;

/// Standard return type for exception events
pub type EventResult = anyhow::Result<Interception>;

/// Output of an eligible [`ExceptionEvent`].
#[derive(Debug, Clone)]
pub struct Interception {
    pub status: StatusCode,
    pub exception: Exception,
    /// Overrides the visibility only when set.
    pub visibility: Option<Visibility>,
}

impl Interception {
    pub fn new(status: StatusCode, exception: Exception) -> Self {
        Self {
            status,
            exception,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }
}

/// The ExceptionEvent trait
///
/// Events can rewrite the status code, the exception and its visibility
/// before behavior rules are consulted. All eligible events run, in
/// registration order, each one seeing the output of the previous.
///
/// # Example
/// ```
/// use meshestra_exception::prelude::*;
///
/// struct HideTimeouts;
///
/// impl ExceptionEvent for HideTimeouts {
///     fn is_eligible(&self, _status: StatusCode, exception: &Exception) -> bool {
///         exception.is_a("Elapsed")
///     }
///
///     fn intercept(&self, _status: StatusCode, exception: &Exception) -> EventResult {
///         Ok(Interception::new(StatusCode::GATEWAY_TIMEOUT, exception.clone())
///             .with_visibility(Visibility::Suppressed))
///     }
/// }
/// ```
pub trait ExceptionEvent: Send + Sync + 'static {
    fn is_eligible(&self, status: StatusCode, exception: &Exception) -> bool;

    fn intercept(&self, status: StatusCode, exception: &Exception) -> EventResult;

    /// Name used when reporting failures of this event.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// An event failed or panicked; the whole pass is discarded.
#[derive(Debug, thiserror::Error)]
#[error("Exception event '{event}' failed: {message}")]
pub struct InterceptorFailure {
    pub event: String,
    pub message: String,
}

/// Running state after a full pass over the chain.
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub status: StatusCode,
    pub exception: Exception,
    pub visibility: Option<Visibility>,
    /// At least one event was eligible.
    pub eligible: bool,
}

/// Ordered list of exception events, shared read-only across requests.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    events: Vec<Arc<dyn ExceptionEvent>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<E: ExceptionEvent>(&mut self, event: E) {
        self.events.push(Arc::new(event));
    }

    pub fn add_arc(&mut self, event: Arc<dyn ExceptionEvent>) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Run every eligible event in registration order.
    pub fn apply_all(
        &self,
        status: StatusCode,
        exception: &Exception,
    ) -> Result<ChainOutcome, InterceptorFailure> {
        let mut outcome = ChainOutcome {
            status,
            exception: exception.clone(),
            visibility: None,
            eligible: false,
        };

        for event in &self.events {
            let eligible = catch_unwind(AssertUnwindSafe(|| {
                event.is_eligible(outcome.status, &outcome.exception)
            }))
            .map_err(|panic| failure(event.as_ref(), panic_message(&*panic)))?;

            if !eligible {
                continue;
            }

            tracing::debug!(
                event = event.name(),
                status = outcome.status.as_u16(),
                tag = outcome.exception.tag(),
                "Exception event is eligible"
            );

            let interception = catch_unwind(AssertUnwindSafe(|| {
                event.intercept(outcome.status, &outcome.exception)
            }))
            .map_err(|panic| failure(event.as_ref(), panic_message(&*panic)))?
            .map_err(|e| failure(event.as_ref(), format!("{:#}", e)))?;

            outcome.eligible = true;
            outcome.status = interception.status;
            outcome.exception = interception.exception;
            if interception.visibility.is_some() {
                outcome.visibility = interception.visibility;
            }
        }

        Ok(outcome)
    }
}

fn failure(event: &dyn ExceptionEvent, message: String) -> InterceptorFailure {
    InterceptorFailure {
        event: event.name().to_string(),
        message,
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
