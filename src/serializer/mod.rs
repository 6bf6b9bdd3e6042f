//! Serializer strategy
//!
//! Turns a [`ResponseBody`] into the bytes written to the client. The default
//! [`JsonExceptionSerializer`] omits null fields, caps nesting depth and
//! pretty-prints only in diagnostic mode. Hosts may plug their own
//! serializer; views are still the only input it ever receives.

use crate::error::SerializeError;
use axum::http::StatusCode;
use serde_json::Value;

pub mod view;

pub use view::{
    ClientErrorView, ExceptionView, ForbiddenView, InternalErrorRecord, MessageView, ResponseBody,
};

pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Per-response information available to a serializer.
#[derive(Debug, Clone, Copy)]
pub struct SerializeContext {
    pub status: StatusCode,
    pub diagnostic: bool,
}

pub trait ExceptionSerializer: Send + Sync + 'static {
    fn serialize(
        &self,
        body: &ResponseBody,
        context: &SerializeContext,
    ) -> Result<String, SerializeError>;

    /// Name used when reporting failures of this serializer.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Formatting options for [`JsonExceptionSerializer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerOptions {
    /// `None` follows diagnostic mode.
    pub pretty: Option<bool>,
    pub include_nulls: bool,
    /// Containers nested deeper than this are dropped.
    pub max_depth: usize,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            pretty: None,
            include_nulls: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SerializerOptions {
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = Some(pretty);
        self
    }

    pub fn include_nulls(mut self, include: bool) -> Self {
        self.include_nulls = include;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Default JSON serializer with camelCase views.
#[derive(Debug, Clone, Default)]
pub struct JsonExceptionSerializer {
    options: SerializerOptions,
}

impl JsonExceptionSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SerializerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }
}

impl ExceptionSerializer for JsonExceptionSerializer {
    fn serialize(
        &self,
        body: &ResponseBody,
        context: &SerializeContext,
    ) -> Result<String, SerializeError> {
        let mut value = serde_json::to_value(body)?;
        truncate(&mut value, 0, self.options.max_depth);
        if !self.options.include_nulls {
            strip_nulls(&mut value);
        }

        let pretty = self.options.pretty.unwrap_or(context.diagnostic);
        let text = if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(text)
    }

    fn name(&self) -> &str {
        "JsonExceptionSerializer"
    }
}

fn truncate(value: &mut Value, depth: usize, max_depth: usize) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                descend(child, depth + 1, max_depth);
            }
        }
        Value::Array(items) => {
            for child in items.iter_mut() {
                descend(child, depth + 1, max_depth);
            }
        }
        _ => {}
    }
}

fn descend(child: &mut Value, depth: usize, max_depth: usize) {
    let container = matches!(child, Value::Object(_) | Value::Array(_));
    if container && depth >= max_depth {
        *child = Value::Null;
    } else {
        truncate(child, depth, max_depth);
    }
}

/// Remove null-valued object fields. Array slots are kept.
fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}
