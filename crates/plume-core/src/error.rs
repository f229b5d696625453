//! Error types for dependency resolution.

use thiserror::Error;

/// A boxed, thread-safe error, used for failures raised by user factories.
///
/// This is the same shape as `tower::BoxError`, so errors flow between the
/// resolver and the handler layer without conversion.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while resolving a parameter list.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No rule could produce a value for the parameter.
    ///
    /// The parameter had no context entry, no declared dependency, no default
    /// and is not an auto-constructed data type.
    #[error("cannot resolve dependency for parameter '{param}'")]
    Unresolvable {
        /// Name of the parameter.
        param: String,
    },

    /// A value was found under the parameter's name but it has another type.
    #[error("parameter '{param}' resolved to a value that is not a `{expected}`")]
    TypeMismatch {
        /// Name of the parameter.
        param: String,
        /// Type the parameter was declared with.
        expected: &'static str,
    },

    /// A dependency factory failed. The factory's own error is kept untouched.
    #[error(transparent)]
    Factory(BoxError),
}

impl ResolveError {
    /// Creates an [`Unresolvable`](Self::Unresolvable) error.
    pub fn unresolvable(param: impl Into<String>) -> Self {
        Self::Unresolvable {
            param: param.into(),
        }
    }

    /// Creates a [`TypeMismatch`](Self::TypeMismatch) error for `T`.
    pub fn type_mismatch<T>(param: impl Into<String>) -> Self {
        Self::TypeMismatch {
            param: param.into(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// Returns the parameter name for unresolvable and mismatched parameters.
    pub fn param(&self) -> Option<&str> {
        match self {
            Self::Unresolvable { param } | Self::TypeMismatch { param, .. } => Some(param),
            Self::Factory(_) => None,
        }
    }
}

/// Result type for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
