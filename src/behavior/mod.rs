//! Behavior registry
//!
//! Maps exceptions to a declared `(status, visibility)` rule. Each rule pairs
//! a predicate with its outcome:
//!
//! - **typed** rules ([`BehaviorRegistry::register_type`]) match by concrete
//!   type, or by a fault that declares the type's tag in its lineage;
//! - **named** rules ([`BehaviorRegistry::register`]) match any exception
//!   whose lineage contains the tag.
//!
//! Lookup walks the rules in **registration order** and returns the first
//! match. Specificity is never inferred: a rule registered for a base type
//! before a rule for a derived type wins for both.

use crate::error::{ConfigurationError, Result};
use crate::exception::{Exception, type_tag};
use axum::http::StatusCode;
use std::any::{TypeId, type_name};
use std::error::Error as StdError;
use strum_macros::{Display, EnumIter, EnumString};

/// Rendering policy for a resolved exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Visibility {
    /// Render the client-safe view of the exception.
    #[strum(to_string = "Exposed", serialize = "Expose")]
    Exposed,

    /// Hide the exception behind a correlation id and log it as an error.
    #[strum(to_string = "Suppressed", serialize = "Suppress")]
    Suppressed,

    /// Drop the exception; only the status code is sent.
    #[strum(to_string = "Ignored", serialize = "Ignore")]
    Ignored,
}

#[derive(Debug, Clone, Copy)]
enum Matcher {
    Named,
    Typed {
        type_id: TypeId,
        type_name: &'static str,
        matches: fn(&Exception) -> bool,
    },
}

#[derive(Debug, Clone)]
pub struct BehaviorRule {
    tag: String,
    matcher: Matcher,
    status: StatusCode,
    visibility: Visibility,
}

impl BehaviorRule {
    /// Lineage tag for named rules, short type name for typed ones.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_typed(&self) -> bool {
        matches!(self.matcher, Matcher::Typed { .. })
    }

    pub fn matches(&self, exception: &Exception) -> bool {
        match self.matcher {
            Matcher::Named => exception.is_a(&self.tag),
            Matcher::Typed { matches, .. } => matches(exception),
        }
    }
}

/// Ordered set of behavior rules, built at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct BehaviorRegistry {
    rules: Vec<BehaviorRule>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule for every exception whose lineage contains `tag`.
    ///
    /// Fails if a named rule for the same tag already exists.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        status: StatusCode,
        visibility: Visibility,
    ) -> Result<()> {
        let tag = tag.into();
        let duplicate = self
            .rules
            .iter()
            .any(|rule| matches!(rule.matcher, Matcher::Named) && rule.tag == tag);
        if duplicate {
            return Err(ConfigurationError::duplicate_rule(tag));
        }
        self.push(tag, Matcher::Named, status, visibility);
        Ok(())
    }

    /// Register a rule for the type `T`.
    ///
    /// Fails if a typed rule for `T` already exists.
    pub fn register_type<T: StdError + 'static>(
        &mut self,
        status: StatusCode,
        visibility: Visibility,
    ) -> Result<()> {
        let type_id = TypeId::of::<T>();
        let duplicate = self.rules.iter().any(|rule| {
            matches!(rule.matcher, Matcher::Typed { type_id: existing, .. } if existing == type_id)
        });
        if duplicate {
            return Err(ConfigurationError::duplicate_rule(type_name::<T>()));
        }
        let matcher = Matcher::Typed {
            type_id,
            type_name: type_name::<T>(),
            matches: Exception::is::<T>,
        };
        self.push(type_tag::<T>().to_string(), matcher, status, visibility);
        Ok(())
    }

    fn push(&mut self, tag: String, matcher: Matcher, status: StatusCode, visibility: Visibility) {
        let rule_type = match matcher {
            Matcher::Typed { type_name, .. } => type_name,
            Matcher::Named => "",
        };
        tracing::debug!(
            %tag,
            rule_type,
            status = status.as_u16(),
            %visibility,
            "Registered behavior rule"
        );
        self.rules.push(BehaviorRule {
            tag,
            matcher,
            status,
            visibility,
        });
    }

    /// First registered rule matching the exception.
    pub fn lookup(&self, exception: &Exception) -> Option<&BehaviorRule> {
        self.rules.iter().find(|rule| rule.matches(exception))
    }

    /// Exact lookup by tag.
    pub fn lookup_name(&self, tag: &str) -> Option<&BehaviorRule> {
        self.rules.iter().find(|rule| rule.tag == tag)
    }

    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &BehaviorRule> {
        self.rules.iter()
    }
}
