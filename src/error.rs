//! Error types for background removal sessions

use crate::client::ServiceFailure;
use thiserror::Error;

/// Result type alias for background removal operations
pub type Result<T> = std::result::Result<T, BgRemovalError>;

/// Error kinds surfaced by the session, the service client and the file services
#[derive(Error, Debug)]
pub enum BgRemovalError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// A non-image file was offered for selection
    #[error("Validation error: {0}")]
    Validation(String),

    /// `submit()` without both an image and a credential
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A removal request is already outstanding for this session
    #[error("A background removal request is already in progress")]
    AlreadyInProgress,

    /// Remote (non-2xx) or transport failure reported by the service client
    #[error(transparent)]
    Service(#[from] ServiceFailure),

    /// `download()` called while no result is held
    #[error("No processed image available for download")]
    NoResult,

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BgRemovalError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new precondition error
    pub fn precondition<S: Into<String>>(msg: S) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid: {})",
            parameter, value, valid_range
        ))
    }

    /// Whether retrying `submit()` may succeed after this error
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Service(_) | Self::Precondition(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = BgRemovalError::validation("text/plain is not an image");
        assert!(matches!(err, BgRemovalError::Validation(_)));

        let err = BgRemovalError::precondition("missing image or key");
        assert!(matches!(err, BgRemovalError::Precondition(_)));
    }

    #[test]
    fn test_error_display() {
        let err = BgRemovalError::precondition("missing image or key");
        assert_eq!(err.to_string(), "Precondition failed: missing image or key");

        let err = BgRemovalError::invalid_config("endpoint must be http(s)");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: endpoint must be http(s)"
        );
    }

    #[test]
    fn test_service_failure_is_transparent() {
        let err: BgRemovalError = ServiceFailure::http(403, "Forbidden", "bad key").into();
        assert_eq!(err.to_string(), "403: Forbidden - bad key");
        assert!(err.is_recoverable());
        assert!(!BgRemovalError::NoResult.is_recoverable());
    }

    #[test]
    fn test_contextual_errors() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = BgRemovalError::file_io_error("write download", Path::new("/out/cat-no-bg.png"), &io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("write download"));
        assert!(error_string.contains("/out/cat-no-bg.png"));

        let err = BgRemovalError::config_value_error("timeout", "0s", "> 0s");
        let error_string = err.to_string();
        assert!(error_string.contains("timeout"));
        assert!(error_string.contains("0s"));
    }
}
