//! Error types for the Plume framework.

use plume_core::{BoxError, ResolveError};
use thiserror::Error;

/// Errors surfaced by a bot invocation.
#[derive(Debug, Error)]
pub enum Error {
    /// A handler parameter could not be resolved. The handler never ran.
    #[error("cannot resolve dependency for parameter '{0}'")]
    UnresolvableDependency(String),

    /// A context entry exists under the parameter's name but has another type.
    #[error("parameter '{param}' resolved to a value that is not a `{expected}`")]
    TypeMismatch {
        /// Name of the parameter.
        param: String,
        /// Type the parameter was declared with.
        expected: &'static str,
    },

    /// The handler produced a value that is not a valid response.
    #[error("response must be a string or a response item, got {0}")]
    InvalidResponseType(String),

    /// A blocking handler used a capability that needs the async runtime.
    #[error("{0} is disabled in blocking handlers, use an async handler to call it")]
    DisabledCapability(&'static str),

    /// A settings handler returned a value that does not describe settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(#[source] serde_json::Error),

    /// A call to another bot failed.
    #[error("call to bot '{bot}' failed: {source}")]
    Remote {
        /// Name of the called bot.
        bot: String,
        /// Error reported by the bot client.
        #[source]
        source: BoxError,
    },

    /// The handler or one of its factories failed. The error is kept as-is.
    #[error(transparent)]
    Handler(BoxError),
}

impl Error {
    /// Wraps an arbitrary handler error.
    ///
    /// A boxed [`Error`] is unwrapped instead of being nested, so an error
    /// raised by the framework and bubbled up by user code keeps its variant.
    pub fn from_boxed(err: BoxError) -> Self {
        match err.downcast::<Error>() {
            Ok(err) => *err,
            Err(err) => Self::Handler(err),
        }
    }

    /// Returns `true` for errors raised before the handler executed.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Self::UnresolvableDependency(_) | Self::TypeMismatch { .. }
        )
    }

    /// Returns the handler error if it is of type `E`.
    pub fn downcast_handler_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Handler(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl From<ResolveError> for Error {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Unresolvable { param } => Self::UnresolvableDependency(param),
            ResolveError::TypeMismatch { param, expected } => Self::TypeMismatch { param, expected },
            ResolveError::Factory(err) => Self::from_boxed(err),
        }
    }
}

/// Result type for framework operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("quota exceeded")]
    struct QuotaExceeded;

    #[test]
    fn test_framework_error_not_double_wrapped() {
        let boxed: BoxError = Box::new(Error::DisabledCapability("remote_call"));

        let err = Error::from_boxed(boxed);

        assert!(matches!(err, Error::DisabledCapability("remote_call")));
    }

    #[test]
    fn test_foreign_error_kept_intact() {
        let err = Error::from_boxed(Box::new(QuotaExceeded));

        assert!(err.downcast_handler_ref::<QuotaExceeded>().is_some());
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn test_resolve_error_mapping() {
        let err = Error::from(ResolveError::unresolvable("config"));
        assert!(matches!(err, Error::UnresolvableDependency(ref p) if p == "config"));
        assert!(err.is_resolution());

        let err = Error::from(ResolveError::Factory(Box::new(QuotaExceeded)));
        assert!(!err.is_resolution());
        assert!(err.downcast_handler_ref::<QuotaExceeded>().is_some());
    }

    #[test]
    fn test_disabled_capability_message() {
        let err = Error::DisabledCapability("stream_call");

        let message = err.to_string();
        assert!(message.contains("stream_call"));
        assert!(message.contains("async"));
    }
}
