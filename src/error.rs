//! Error types for the calwater application.
//!
//! Every variant carries owned strings only, so an error can be cloned and
//! memoized alongside a dataset whose load failed.

use thiserror::Error;

/// The main error type for calwater operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalWaterError {
    /// A requested entity or backing file does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// A query argument is missing or malformed
    #[error("Invalid parameter: {param} - {message}")]
    Validation { param: String, message: String },

    /// A backing file violates its expected schema
    #[error("Parse error in {dataset}: {message}")]
    Parse { dataset: String, message: String },

    /// Unexpected failure, e.g. the filesystem is unavailable at load time
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Server errors
    #[error("Server error: {message}")]
    Server { message: String },
}

impl CalWaterError {
    /// Shorthand for a validation error on a named parameter
    pub fn validation(param: &str, message: impl Into<String>) -> Self {
        CalWaterError::Validation {
            param: param.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        CalWaterError::NotFound {
            message: message.into(),
        }
    }

    /// Short machine-readable name of the error category
    pub fn kind(&self) -> &'static str {
        match self {
            CalWaterError::NotFound { .. } => "not_found",
            CalWaterError::Validation { .. } => "validation",
            CalWaterError::Parse { .. } => "parse",
            CalWaterError::Internal { .. } => "internal",
            CalWaterError::Config { .. } => "config",
            CalWaterError::Server { .. } => "server",
        }
    }
}

impl From<std::io::Error> for CalWaterError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => CalWaterError::NotFound {
                message: error.to_string(),
            },
            _ => CalWaterError::Internal {
                message: error.to_string(),
            },
        }
    }
}

/// Convenience type alias for Results with CalWaterError
pub type Result<T> = std::result::Result<T, CalWaterError>;
