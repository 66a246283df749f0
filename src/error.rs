//! Error types for Chatgate
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Chatgate operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, provider interactions, and session storage.
/// Note that provider *call* failures are deliberately not represented
/// here: the gateway converts every call failure into a textual
/// [`Outcome`](crate::providers::Outcome) so the transport always has
/// something to relay.
#[derive(Error, Debug)]
pub enum ChatgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider setup errors (client construction, registry wiring)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Session storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Chatgate operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ChatgateError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_provider_error_display() {
        let error = ChatgateError::Provider("registry empty".to_string());
        assert_eq!(error.to_string(), "Provider error: registry empty");
    }

    #[test]
    fn test_storage_error_display() {
        let error = ChatgateError::Storage("database connection failed".to_string());
        assert_eq!(
            error.to_string(),
            "Storage error: database connection failed"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ChatgateError = io_error.into();
        assert!(matches!(error, ChatgateError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let error: ChatgateError = json_error.into();
        assert!(matches!(error, ChatgateError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChatgateError>();
    }
}
