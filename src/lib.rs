//! # Meshestra Exception
//!
//! Translates failures raised while serving a request into HTTP responses.
//!
//! A resolution walks three configurable layers before falling back to a
//! built-in classification:
//!
//! - **Exception events**: ordered interceptors that can rewrite the status
//!   code, the exception and its visibility
//! - **Behavior rules**: status and visibility per exception type, matched
//!   along the exception's lineage
//! - **Default table**: access denied → 403, domain errors → 400, anything
//!   else → 500 with a correlation id
//!
//! Exposed exceptions render a client view. Suppressed ones render only a
//! `logEntryId` that matches the server-side log entry.
//!
//! ## Quick Start
//!
//! ```rust
//! use meshestra_exception::prelude::*;
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("account {0} is locked")]
//! struct AccountLocked(u64);
//!
//! impl Fault for AccountLocked {}
//!
//! let handler = ExceptionHandler::new(
//!     HandlerConfiguration::builder()
//!         .for_exception::<AccountLocked>(StatusCode::LOCKED, Visibility::Suppressed)
//!         .build()
//!         .unwrap(),
//! );
//!
//! let resolution = handler.resolve(&Exception::new(AccountLocked(7)), StatusCode::OK);
//! assert_eq!(resolution.status, StatusCode::LOCKED);
//! assert!(resolution.bodies().next().unwrap().starts_with(r#"{"logEntryId":"#));
//! ```
//!
//! As tower middleware, inner service errors become exception responses:
//!
//! ```rust,no_run
//! use meshestra_exception::prelude::*;
//! use axum::{Router, routing::get};
//!
//! let handler = ExceptionHandler::new(HandlerConfiguration::default());
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "ok" }))
//!     .layer(ExceptionLayer::new(handler));
//! ```

pub mod behavior;
pub mod common;
pub mod config;
pub mod error;
pub mod exception;
pub mod handler;
pub mod interceptor;
pub mod serializer;

// Re-export core types
pub use behavior::{BehaviorRegistry, BehaviorRule, Visibility};
pub use common::{BufferedResponse, RenderedResponse, Resolution, ResponseSink};
pub use config::{ConfigService, HandlerConfiguration, HandlerConfigurationBuilder, IgnoredLogging};
pub use error::{ConfigurationError, Result, SerializeError};
pub use exception::{Exception, ExceptionFilter, ExceptionKind, Fault};
pub use handler::{ExceptionHandler, ExceptionLayer};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use meshestra_exception::prelude::*;
/// ```
pub mod prelude {
    pub use crate::behavior::Visibility;
    pub use crate::common::{BufferedResponse, Resolution, ResponseSink};
    pub use crate::config::{ConfigService, HandlerConfiguration, HandlerConfigurationBuilder};
    pub use crate::error::{ConfigurationError, Result};
    pub use crate::exception::{
        AccessDeniedError, AggregateError, DomainError, ErrorDetail, Exception, ExceptionFilter,
        ExceptionKind, Fault, ROOT_TAG,
    };
    pub use crate::handler::{ExceptionHandler, ExceptionLayer};
    pub use crate::interceptor::{EventResult, ExceptionEvent, Interception};
    pub use crate::serializer::{ExceptionSerializer, JsonExceptionSerializer, SerializerOptions};
    pub use async_trait::async_trait;
    pub use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
    };
}
