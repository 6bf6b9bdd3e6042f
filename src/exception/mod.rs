//! Exception model
//!
//! Every failure that reaches the handler is wrapped in an [`Exception`], a
//! cheap-to-clone handle over a [`Fault`]. Faults declare two things
//! explicitly instead of relying on runtime type inspection:
//!
//! - their **lineage**: dispatch tags from the most-derived to the root
//!   (`"Exception"`), used by the behavior registry;
//! - their **kind**: how the default classification treats them.
//!
//! ```rust
//! use meshestra_exception::exception::{DomainError, Exception, ExceptionKind, Fault, ROOT_TAG};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("balance too low")]
//! struct InsufficientFunds;
//!
//! impl Fault for InsufficientFunds {
//!     fn lineage(&self) -> Vec<&'static str> {
//!         vec!["InsufficientFunds", DomainError::TAG, ROOT_TAG]
//!     }
//!
//!     fn kind(&self) -> ExceptionKind<'_> {
//!         ExceptionKind::Domain { key: "InsufficientFunds", errors: &[] }
//!     }
//! }
//!
//! let exception = Exception::new(InsufficientFunds);
//! assert!(exception.is_a(DomainError::TAG));
//! ```

use axum::response::Response;
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

pub mod builtin;
pub mod http;

pub use builtin::{AccessDeniedError, AggregateError, DomainError, ErrorDetail};

/// Type-erased error accepted at the transport boundary.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Root of every lineage.
pub const ROOT_TAG: &str = "Exception";

/// Classification used when no configuration applies.
#[derive(Debug, Clone, Copy)]
pub enum ExceptionKind<'a> {
    /// Container of independent child exceptions.
    Aggregate(&'a [Exception]),
    /// Expected, caller-caused failure that is safe to expose.
    Domain {
        key: &'a str,
        errors: &'a [ErrorDetail],
    },
    AccessDenied,
    Unexpected,
}

/// A failure that can flow through the exception pipeline.
pub trait Fault: StdError + Send + Sync + 'static {
    /// Dispatch tags, most-derived first. Must end with [`ROOT_TAG`].
    fn lineage(&self) -> Vec<&'static str> {
        vec![type_tag::<Self>(), ROOT_TAG]
    }

    fn kind(&self) -> ExceptionKind<'_> {
        ExceptionKind::Unexpected
    }
}

/// Short name of a type, used as its dispatch tag.
///
/// `alloc::string::FromUtf8Error` becomes `FromUtf8Error`; generic arguments
/// are dropped.
pub fn type_tag<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path)
}

/// Handle over a fault travelling through the pipeline.
#[derive(Clone)]
pub struct Exception {
    fault: Arc<dyn Fault>,
    any: Arc<dyn Any + Send + Sync>,
    /// The lineage was declared by the fault itself rather than derived from
    /// a foreign type name.
    declared: bool,
}

impl Exception {
    /// Wrap a fault that declares its own lineage and kind.
    pub fn new<F: Fault>(fault: F) -> Self {
        let fault = Arc::new(fault);
        Self {
            fault: fault.clone(),
            any: fault,
            declared: true,
        }
    }

    fn wrapped<F: Fault>(fault: F) -> Self {
        Self {
            declared: false,
            ..Self::new(fault)
        }
    }

    /// Wrap any error. Built-in faults keep their kind; other errors are
    /// classified as unexpected and tagged with their short type name.
    pub fn from_error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        match Self::builtin(&error) {
            Some(exception) => exception,
            None => Self::wrapped(Foreign(error)),
        }
    }

    /// Recover an exception from a boxed error, keeping built-in kinds intact.
    ///
    /// Other errors stay reachable through [`downcast_ref`](Self::downcast_ref)
    /// and [`is`](Self::is), so typed rules still apply to them.
    pub fn from_boxed(error: BoxError) -> Self {
        match Self::builtin(error.as_ref()) {
            Some(exception) => exception,
            None => Self::wrapped(Boxed(error)),
        }
    }

    fn builtin(error: &(dyn StdError + Send + Sync + 'static)) -> Option<Self> {
        if let Some(exception) = error.downcast_ref::<Exception>() {
            Some(exception.clone())
        } else if let Some(domain) = error.downcast_ref::<DomainError>() {
            Some(Self::new(domain.clone()))
        } else if let Some(denied) = error.downcast_ref::<AccessDeniedError>() {
            Some(Self::new(denied.clone()))
        } else {
            error
                .downcast_ref::<AggregateError>()
                .map(|aggregate| Self::new(aggregate.clone()))
        }
    }

    pub fn lineage(&self) -> Vec<&'static str> {
        self.fault.lineage()
    }

    /// Most-derived dispatch tag.
    pub fn tag(&self) -> &'static str {
        self.fault
            .lineage()
            .first()
            .copied()
            .unwrap_or(ROOT_TAG)
    }

    /// Whether `tag` appears anywhere in the lineage.
    pub fn is_a(&self, tag: &str) -> bool {
        self.fault.lineage().iter().any(|t| *t == tag)
    }

    /// Whether the exception is a `T`, or a fault declaring `T` in its
    /// lineage.
    ///
    /// Foreign and boxed errors match by concrete type only, so unrelated
    /// types sharing a short name never match each other.
    pub fn is<T: StdError + 'static>(&self) -> bool {
        self.downcast_ref::<T>().is_some() || (self.declared && self.is_a(type_tag::<T>()))
    }

    pub fn kind(&self) -> ExceptionKind<'_> {
        self.fault.kind()
    }

    /// Human-readable message.
    pub fn message(&self) -> String {
        self.fault.to_string()
    }

    pub fn children(&self) -> Option<&[Exception]> {
        match self.fault.kind() {
            ExceptionKind::Aggregate(children) => Some(children),
            _ => None,
        }
    }

    /// Borrow the concrete fault, or the foreign or boxed error it wraps.
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.any
            .downcast_ref::<T>()
            .or_else(|| self.any.downcast_ref::<Foreign<T>>().map(|f| &f.0))
            .or_else(|| {
                self.any
                    .downcast_ref::<Boxed>()
                    .and_then(|boxed| boxed.0.downcast_ref::<T>())
            })
    }
}

impl fmt::Debug for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exception")
            .field("tag", &self.tag())
            .field("fault", &self.fault)
            .finish()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.fault, f)
    }
}

impl StdError for Exception {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.fault.source()
    }
}

impl<F: Fault> From<F> for Exception {
    fn from(fault: F) -> Self {
        Self::new(fault)
    }
}

/// A foreign error carried as an unexpected fault.
struct Foreign<E>(E);

impl<E: fmt::Debug> fmt::Debug for Foreign<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<E: fmt::Display> fmt::Display for Foreign<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<E: StdError + 'static> StdError for Foreign<E> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl<E: StdError + Send + Sync + 'static> Fault for Foreign<E> {
    fn lineage(&self) -> Vec<&'static str> {
        vec![type_tag::<E>(), ROOT_TAG]
    }
}

/// A boxed error whose concrete type is no longer known.
#[derive(Debug)]
struct Boxed(BoxError);

impl fmt::Display for Boxed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for Boxed {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl Fault for Boxed {
    fn lineage(&self) -> Vec<&'static str> {
        vec!["Error", ROOT_TAG]
    }
}

/// The ExceptionFilter trait
///
/// Filters handle errors thrown during request processing.
/// They must return a valid Response.
pub trait ExceptionFilter: Send + Sync + 'static {
    /// Catch an exception and return a response
    fn catch(&self, error: BoxError) -> Response;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("null reference")]
    struct NullReference;

    #[test]
    fn test_type_tag_strips_path_and_generics() {
        assert_eq!(type_tag::<String>(), "String");
        assert_eq!(type_tag::<Vec<String>>(), "Vec");
        assert_eq!(type_tag::<NullReference>(), "NullReference");
    }

    #[test]
    fn test_foreign_error_lineage() {
        let exception = Exception::from_error(NullReference);
        assert_eq!(exception.lineage(), vec!["NullReference", ROOT_TAG]);
        assert!(exception.is::<NullReference>());
        assert!(matches!(exception.kind(), ExceptionKind::Unexpected));
        assert_eq!(exception.message(), "null reference");
        assert!(exception.downcast_ref::<NullReference>().is_some());
    }

    #[test]
    fn test_from_error_does_not_double_wrap() {
        let inner = Exception::new(DomainError::new("Key", "message"));
        let outer = Exception::from_error(inner);
        assert_eq!(outer.tag(), DomainError::TAG);
        assert!(outer.downcast_ref::<DomainError>().is_some());
    }

    #[test]
    fn test_from_boxed_keeps_builtin_kinds() {
        let boxed: BoxError = Box::new(DomainError::new("Key", "message"));
        let exception = Exception::from_boxed(boxed);
        assert!(matches!(
            exception.kind(),
            ExceptionKind::Domain { key: "Key", .. }
        ));

        let boxed: BoxError = Box::new(AccessDeniedError::default());
        assert!(matches!(
            Exception::from_boxed(boxed).kind(),
            ExceptionKind::AccessDenied
        ));

        let boxed: BoxError = Box::new(NullReference);
        let exception = Exception::from_boxed(boxed);
        assert_eq!(exception.lineage(), vec!["Error", ROOT_TAG]);
        assert_eq!(exception.message(), "null reference");
    }

    #[test]
    fn test_from_error_keeps_builtin_kinds() {
        let exception = Exception::from_error(DomainError::new("Key", "message"));
        assert!(matches!(
            exception.kind(),
            ExceptionKind::Domain { key: "Key", .. }
        ));
        assert_eq!(exception.tag(), DomainError::TAG);

        let exception = Exception::from_error(AccessDeniedError::default());
        assert!(matches!(exception.kind(), ExceptionKind::AccessDenied));

        let exception = Exception::from_error(AggregateError::new([Exception::from_error(
            NullReference,
        )]));
        assert_eq!(exception.children().map(<[Exception]>::len), Some(1));
    }

    #[test]
    fn test_boxed_error_keeps_its_type() {
        let boxed: BoxError = Box::new(NullReference);
        let exception = Exception::from_boxed(boxed);

        assert!(exception.is::<NullReference>());
        assert!(exception.downcast_ref::<NullReference>().is_some());
        assert!(!exception.is::<std::fmt::Error>());
    }

    #[test]
    fn test_types_sharing_a_short_name_stay_distinct() {
        let fmt_error = Exception::from_error(std::fmt::Error);
        let io_error = Exception::from_error(std::io::Error::other("disk full"));
        let text: BoxError = "plain string error".into();
        let text = Exception::from_boxed(text);

        assert_eq!(fmt_error.tag(), io_error.tag());
        assert!(fmt_error.is::<std::fmt::Error>());
        assert!(!fmt_error.is::<std::io::Error>());
        assert!(io_error.is::<std::io::Error>());
        assert!(!io_error.is::<std::fmt::Error>());
        assert!(!text.is::<std::io::Error>());
        assert!(!text.is::<std::fmt::Error>());
    }

    #[test]
    fn test_declared_lineage_matches_base_type() {
        #[derive(Debug, thiserror::Error)]
        #[error("balance too low")]
        struct InsufficientFunds;

        impl Fault for InsufficientFunds {
            fn lineage(&self) -> Vec<&'static str> {
                vec!["InsufficientFunds", DomainError::TAG, ROOT_TAG]
            }
        }

        let exception = Exception::new(InsufficientFunds);
        assert!(exception.is::<InsufficientFunds>());
        assert!(exception.is::<DomainError>());
        assert!(exception.downcast_ref::<DomainError>().is_none());
    }

    #[test]
    fn test_from_boxed_unwraps_exception() {
        let boxed: BoxError = Box::new(Exception::from_error(NullReference));
        assert_eq!(Exception::from_boxed(boxed).tag(), "NullReference");
    }
}
