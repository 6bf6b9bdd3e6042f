use super::{
    ConfigService, EXCEPTION_RULES_KEY, HandlerConfiguration, IGNORED_LOGGING_KEY, IgnoredLogging,
};
use crate::behavior::{BehaviorRegistry, Visibility};
use crate::error::{ConfigurationError, Result};
use crate::interceptor::{ExceptionEvent, InterceptorChain};
use crate::serializer::{ExceptionSerializer, JsonExceptionSerializer};
use axum::http::StatusCode;
use std::error::Error as StdError;
use std::sync::Arc;
use strum::IntoEnumIterator;

/// Builder for an exception-handling configuration
///
/// Collects behavior rules, events and the serializer, then freezes them into
/// an immutable [`HandlerConfiguration`]. Registration errors are reported by
/// [`build`](Self::build), so a bad setup fails at startup.
///
/// # Example
/// ```
/// use meshestra_exception::prelude::*;
///
/// let configuration = HandlerConfiguration::builder()
///     .for_exception::<AccessDeniedError>(StatusCode::UNAUTHORIZED, Visibility::Exposed)
///     .for_exception_named("NullReference", StatusCode::METHOD_NOT_ALLOWED, Visibility::Suppressed)
///     .build()
///     .unwrap();
///
/// assert_eq!(configuration.behaviors().len(), 2);
/// ```
pub struct HandlerConfigurationBuilder {
    behaviors: BehaviorRegistry,
    events: InterceptorChain,
    serializer: Option<Arc<dyn ExceptionSerializer>>,
    diagnostic: bool,
    ignored_logging: IgnoredLogging,
    error: Option<ConfigurationError>,
}

impl HandlerConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            behaviors: BehaviorRegistry::new(),
            events: InterceptorChain::new(),
            serializer: None,
            diagnostic: false,
            ignored_logging: IgnoredLogging::default(),
            error: None,
        }
    }

    /// Start from the environment-backed settings in `config`.
    ///
    /// Reads the diagnostic toggle, the ignored-exception log policy and any
    /// name-keyed rules.
    pub fn from_config(config: &ConfigService) -> Result<Self> {
        let mut builder = Self::new().diagnostic_mode(config.is_development());

        if let Some(policy) = config.get(IGNORED_LOGGING_KEY) {
            let policy = policy.trim().parse::<IgnoredLogging>().map_err(|_| {
                ConfigurationError::invalid_rule(&policy, "expected off, debug or info")
            })?;
            builder = builder.ignored_logging(policy);
        }

        if let Some(rules) = config.get(EXCEPTION_RULES_KEY) {
            for (tag, status, visibility) in parse_rules(&rules)? {
                builder = builder.for_exception_named(tag, status, visibility);
            }
        }

        Ok(builder)
    }

    /// Register a rule for the type `T`.
    ///
    /// Matches errors of type `T`, including ones that arrived boxed, and
    /// faults that declare `T`'s tag in their lineage.
    pub fn for_exception<T>(mut self, status: StatusCode, visibility: Visibility) -> Self
    where
        T: StdError + 'static,
    {
        if self.error.is_none() {
            self.error = self.behaviors.register_type::<T>(status, visibility).err();
        }
        self
    }

    /// Register a rule for every exception whose lineage contains `name`.
    pub fn for_exception_named(
        mut self,
        name: impl Into<String>,
        status: StatusCode,
        visibility: Visibility,
    ) -> Self {
        if self.error.is_none() {
            self.error = self.behaviors.register(name, status, visibility).err();
        }
        self
    }

    /// Append an event to the interceptor chain.
    pub fn add_event<E: ExceptionEvent>(mut self, event: E) -> Self {
        self.events.add(event);
        self
    }

    pub fn add_event_arc(mut self, event: Arc<dyn ExceptionEvent>) -> Self {
        self.events.add_arc(event);
        self
    }

    /// Replace the default [`JsonExceptionSerializer`].
    pub fn set_serializer<S: ExceptionSerializer>(mut self, serializer: S) -> Self {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    /// Expose exception details and pretty-print bodies. Off by default.
    pub fn diagnostic_mode(mut self, enabled: bool) -> Self {
        self.diagnostic = enabled;
        self
    }

    pub fn ignored_logging(mut self, policy: IgnoredLogging) -> Self {
        self.ignored_logging = policy;
        self
    }

    pub fn build(mut self) -> Result<HandlerConfiguration> {
        if let Some(error) = self.error.take() {
            tracing::error!("Exception handling configuration rejected: {}", error);
            return Err(error);
        }
        let configuration = self.into_configuration();
        tracing::info!(
            rules = configuration.behaviors.len(),
            events = configuration.events.len(),
            serializer = configuration.serializer.name(),
            diagnostic = configuration.diagnostic,
            "Exception handling configured"
        );
        Ok(configuration)
    }

    pub(super) fn into_configuration(self) -> HandlerConfiguration {
        HandlerConfiguration {
            behaviors: self.behaviors,
            events: self.events,
            serializer: self
                .serializer
                .unwrap_or_else(|| Arc::new(JsonExceptionSerializer::new())),
            diagnostic: self.diagnostic,
            ignored_logging: self.ignored_logging,
        }
    }
}

impl Default for HandlerConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `Name=Status[:Visibility]` entries separated by commas.
///
/// Visibility defaults to `Exposed`.
fn parse_rules(rules: &str) -> Result<Vec<(String, StatusCode, Visibility)>> {
    rules
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_rule)
        .collect()
}

fn parse_rule(entry: &str) -> Result<(String, StatusCode, Visibility)> {
    let (name, rest) = entry
        .split_once('=')
        .ok_or_else(|| ConfigurationError::invalid_rule(entry, "expected Name=Status[:Visibility]"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigurationError::invalid_rule(entry, "missing exception name"));
    }

    let (status, visibility) = match rest.split_once(':') {
        Some((status, visibility)) => (status.trim(), Some(visibility.trim())),
        None => (rest.trim(), None),
    };

    let code = status
        .parse::<u16>()
        .map_err(|_| ConfigurationError::invalid_rule(entry, "status must be a number"))?;
    let status = StatusCode::from_u16(code).map_err(|_| ConfigurationError::InvalidStatus {
        tag: name.to_string(),
        code,
    })?;

    let visibility = match visibility {
        Some(value) => value
            .parse::<Visibility>()
            .map_err(|_| {
                let known: Vec<String> = Visibility::iter().map(|v| v.to_string()).collect();
                ConfigurationError::invalid_rule(
                    entry,
                    format!("unknown visibility, expected one of {}", known.join(", ")),
                )
            })?,
        None => Visibility::Exposed,
    };

    Ok((name.to_string(), status, visibility))
}
