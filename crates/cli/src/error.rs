//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// A worker task panicked or was cancelled
    #[error("Workload worker {worker} failed: {message}")]
    Worker { worker: usize, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn worker(worker: usize, message: impl Into<String>) -> Self {
        Self::Worker {
            worker,
            message: message.into(),
        }
    }
}
