//! Error types module
//!
//! All errors surfaced to the transport layer are unified under the
//! `AppError` enum, which can represent upload-session, operation-contract,
//! storage, and transformation-engine failures. The `ErrorMetadata` trait
//! lets each variant self-describe how it should be presented over HTTP.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like incomplete uploads
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "MISSING_CHUNK")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried by the client)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing chunk {0}")]
    MissingChunk(u32),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transformation failed: {0}")]
    Transform(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable,
/// suggested_action, log_level). Reduces duplication in the ErrorMetadata
/// impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (u16, &'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            LogLevel::Debug,
        ),
        AppError::MissingChunk(_) => (
            400,
            "MISSING_CHUNK",
            true,
            Some("Re-upload the missing chunk and call finalize again"),
            LogLevel::Warn,
        ),
        AppError::UnsupportedOperation(_) => (
            400,
            "UNSUPPORTED_OPERATION",
            false,
            Some("Use one of the documented operations"),
            LogLevel::Debug,
        ),
        AppError::MissingParameter(_) => (
            400,
            "MISSING_PARAMETER",
            false,
            Some("Provide all parameters required by the operation"),
            LogLevel::Debug,
        ),
        AppError::InvalidParameter { .. } => (
            400,
            "INVALID_PARAMETER",
            false,
            Some("Check parameter types and ranges"),
            LogLevel::Debug,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        AppError::Transform(_) => (
            500,
            "TRANSFORM_ERROR",
            false,
            Some("Check that the uploaded file is a valid media file"),
            LogLevel::Error,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource exists"),
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce chunk size or file size"),
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::MissingChunk(_) => "MissingChunk",
            AppError::UnsupportedOperation(_) => "UnsupportedOperation",
            AppError::MissingParameter(_) => "MissingParameter",
            AppError::InvalidParameter { .. } => "InvalidParameter",
            AppError::Storage(_) => "Storage",
            AppError::Transform(_) => "Transform",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including the source chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::MissingChunk(index) => format!("Missing chunk {}", index),
            AppError::UnsupportedOperation(name) => format!("Unsupported operation: {}", name),
            AppError::MissingParameter(name) => format!("Missing parameter: {}", name),
            AppError::InvalidParameter { name, reason } => {
                format!("Invalid parameter {}: {}", name, reason)
            }
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Transform(msg) => format!("Transformation failed: {}", msg),
            AppError::NotFound(msg) => msg.clone(),
            AppError::PayloadTooLarge(msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_missing_chunk() {
        let err = AppError::MissingChunk(3);
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "MISSING_CHUNK");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Missing chunk 3");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_invalid_parameter() {
        let err = AppError::InvalidParameter {
            name: "width".to_string(),
            reason: "must be a positive integer".to_string(),
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
        assert!(!err.is_recoverable());
        assert!(err.client_message().contains("width"));
        assert!(err.client_message().contains("positive integer"));
    }

    #[test]
    fn test_error_metadata_transform_is_server_error() {
        let err = AppError::Transform("ffmpeg exited with code 1".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "TRANSFORM_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_storage_hides_details() {
        let err = AppError::Storage("disk on fire".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.client_message(), "Failed to access storage");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let source = anyhow::anyhow!("root cause");
        let err = AppError::InternalWithSource {
            message: "wrapper".to_string(),
            source,
        };
        let details = err.detailed_message();
        assert!(details.contains("Caused by: root cause"));
    }
}
