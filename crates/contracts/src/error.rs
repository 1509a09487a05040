//! Layered error definitions
//!
//! Categorized by source: config / resolution / backend

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum TelemetryError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Resolution Errors =====
    /// A client could not be constructed for the requested type
    #[error("cannot resolve client '{type_name}': {message}")]
    Resolution { type_name: String, message: String },

    // ===== Backend Errors =====
    /// A backend failed while handling a dispatched operation
    #[error("client '{client}' failed: {message}")]
    Backend { client: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl TelemetryError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create resolution error
    pub fn resolution(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Create backend operation error
    pub fn backend(client: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            client: client.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = TelemetryError::backend("primary", "connection reset");
        assert_eq!(err.to_string(), "client 'primary' failed: connection reset");
    }

    #[test]
    fn test_resolution_error_display() {
        let err = TelemetryError::resolution("file", "missing param 'path'");
        assert!(err.to_string().contains("cannot resolve client 'file'"));
    }
}
