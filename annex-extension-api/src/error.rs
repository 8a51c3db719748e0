//! Error types for extension authors

use thiserror::Error;

/// Errors that contributions can return from `execute`
#[derive(Error, Debug)]
pub enum ExtensionError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Deferred work failed
    #[error("Deferred task error: {0}")]
    Deferred(#[from] DeferredError),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),
}

impl ExtensionError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Outcome errors of deferred work
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeferredError {
    /// The work returned an error
    #[error("deferred task failed: {0}")]
    Failed(String),

    /// The work panicked
    #[error("deferred task panicked")]
    Panicked,

    /// The work was dropped before it produced a result
    #[error("deferred task was dropped before completing")]
    Dropped,

    /// No async runtime was available to start the work
    #[error("no async runtime available to start deferred task")]
    NoRuntime,
}

impl DeferredError {
    /// Create a failure with a message
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtensionError::Custom("something happened".to_string());
        assert_eq!(err.to_string(), "something happened");

        let err = ExtensionError::invalid_input("missing iteration");
        assert_eq!(err.to_string(), "Invalid input: missing iteration");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ExtensionError = io_err.into();

        assert!(matches!(err, ExtensionError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_deferred_error_conversion() {
        let err: ExtensionError = DeferredError::Panicked.into();
        assert!(matches!(err, ExtensionError::Deferred(DeferredError::Panicked)));
        assert!(err.to_string().contains("panicked"));
    }

    #[test]
    fn test_deferred_failed_helper() {
        let err = DeferredError::failed("index unavailable");
        assert_eq!(err.to_string(), "deferred task failed: index unavailable");
    }
}
