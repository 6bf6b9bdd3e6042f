use crate::behavior::BehaviorRegistry;
use crate::interceptor::InterceptorChain;
use crate::serializer::ExceptionSerializer;
use dashmap::DashMap;
use std::env;
use std::fmt;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

mod builder;

pub use builder::HandlerConfigurationBuilder;

/// Selects diagnostic mode when equal to [`DEVELOPMENT`] (any case).
pub const ENVIRONMENT_KEY: &str = "MESHESTRA_ENVIRONMENT";
/// Name-keyed behavior rules, `Name=Status[:Visibility],...`.
pub const EXCEPTION_RULES_KEY: &str = "MESHESTRA_EXCEPTION_RULES";
/// Log policy for ignored exceptions: `off`, `debug` or `info`.
pub const IGNORED_LOGGING_KEY: &str = "MESHESTRA_IGNORED_EXCEPTION_LOG";

pub const DEVELOPMENT: &str = "development";

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Snapshot of the process environment.
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Whether the environment toggle selects diagnostic mode. Unset means
    /// production.
    pub fn is_development(&self) -> bool {
        self.get(ENVIRONMENT_KEY)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case(DEVELOPMENT))
    }
}

/// How exceptions resolved as `Ignored` are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IgnoredLogging {
    Off,
    #[default]
    Debug,
    Info,
}

/// Immutable exception-handling configuration.
///
/// Built once at startup through [`HandlerConfigurationBuilder`] and shared by
/// every request.
#[derive(Clone)]
pub struct HandlerConfiguration {
    pub(crate) behaviors: BehaviorRegistry,
    pub(crate) events: InterceptorChain,
    pub(crate) serializer: Arc<dyn ExceptionSerializer>,
    pub(crate) diagnostic: bool,
    pub(crate) ignored_logging: IgnoredLogging,
}

impl HandlerConfiguration {
    pub fn builder() -> HandlerConfigurationBuilder {
        HandlerConfigurationBuilder::new()
    }

    pub fn behaviors(&self) -> &BehaviorRegistry {
        &self.behaviors
    }

    pub fn events(&self) -> &InterceptorChain {
        &self.events
    }

    pub fn serializer(&self) -> &dyn ExceptionSerializer {
        self.serializer.as_ref()
    }

    pub fn is_diagnostic(&self) -> bool {
        self.diagnostic
    }

    pub fn ignored_logging(&self) -> IgnoredLogging {
        self.ignored_logging
    }
}

impl Default for HandlerConfiguration {
    fn default() -> Self {
        HandlerConfigurationBuilder::new().into_configuration()
    }
}

impl fmt::Debug for HandlerConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfiguration")
            .field("behaviors", &self.behaviors)
            .field("events", &self.events.len())
            .field("serializer", &self.serializer.name())
            .field("diagnostic", &self.diagnostic)
            .field("ignored_logging", &self.ignored_logging)
            .finish()
    }
}
