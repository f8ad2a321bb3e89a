//! Proxy error types

use thiserror::Error;

/// Errors raised by traps, polyfills and the descriptor cache.
///
/// Script-visible variants carry the exact message text the engine adapter
/// should throw; `set`, `has` and `deleteProperty` never produce errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProxyError {
    /// Type error (e.g., calling a non-function)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Range error (e.g., index out of bounds)
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Generic script error, used for failures re-raised from user callbacks
    #[error("Error: {0}")]
    Error(String),

    /// Internal wiring error (wrong target shape, null target)
    #[error("InternalError: {0}")]
    InternalError(String),

    /// Configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ProxyError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// Create a generic error
    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// The message without the error-kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::TypeError(msg)
            | Self::RangeError(msg)
            | Self::Error(msg)
            | Self::InternalError(msg)
            | Self::Config(msg) => msg,
        }
    }

    /// Script-level error constructor name this error maps to.
    pub fn script_error_name(&self) -> &'static str {
        match self {
            Self::TypeError(_) => "TypeError",
            Self::RangeError(_) => "RangeError",
            Self::Error(_) | Self::InternalError(_) | Self::Config(_) => "Error",
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for proxy operations
pub type ProxyResult<T> = Result<T, ProxyError>;
