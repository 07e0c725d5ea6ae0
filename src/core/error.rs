//! Unified error handling for basesoap
//!
//! Every fallible operation in the crate returns [`SoapResult`], so callers
//! only ever have to match on one error type regardless of whether the
//! failure came from configuration, client acquisition or the SOAP call.

use std::fmt;

/// Unified error types for the SOAP request wrapper
#[derive(Debug)]
pub enum SoapError {
    /// Configuration-related errors
    Configuration(String),

    /// Validation errors
    Validation(String),

    /// File and I/O errors
    Io(std::io::Error),

    /// The client factory failed to produce a SOAP client
    ClientCreation(String),

    /// The SOAP client does not expose the requested operation
    UnknownOperation(String),

    /// The remote service answered with a fault, or the call failed in transit
    Fault(String),

    /// The call finished without a fault and without a response body
    EmptyResponse(String),

    /// Internal system errors
    Internal(String),
}

impl fmt::Display for SoapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoapError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            SoapError::Validation(msg) => write!(f, "Validation error: {msg}"),
            SoapError::Io(err) => write!(f, "I/O error: {err}"),
            SoapError::ClientCreation(msg) => write!(f, "Failed to create SOAP client: {msg}"),
            SoapError::UnknownOperation(op) => write!(f, "Unknown SOAP operation: {op}"),
            SoapError::Fault(msg) => write!(f, "SOAP fault: {msg}"),
            SoapError::EmptyResponse(op) => write!(f, "SOAP {op} returned no error or result"),
            SoapError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for SoapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SoapError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SoapError {
    fn from(err: std::io::Error) -> Self {
        SoapError::Io(err)
    }
}

impl From<validator::ValidationErrors> for SoapError {
    fn from(err: validator::ValidationErrors) -> Self {
        SoapError::Validation(err.to_string())
    }
}

/// Result type alias for SOAP operations
pub type SoapResult<T> = std::result::Result<T, SoapError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> SoapResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> SoapResult<T> {
        self.map_err(|e| SoapError::Internal(format!("{context}: {e}")))
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:literal $(,)?) => {
        $crate::core::error::SoapError::Configuration(format!($msg))
    };
    ($msg:expr) => {
        $crate::core::error::SoapError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::SoapError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:literal $(,)?) => {
        $crate::core::error::SoapError::Internal(format!($msg))
    };
    ($msg:expr) => {
        $crate::core::error::SoapError::Internal($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::SoapError::Internal(format!($fmt, $($arg)*))
    };
}
