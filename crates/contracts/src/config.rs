//! HubConfig - Config Loader output
//!
//! Describes which clients the dispatcher registers, in order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct HubConfig {
    /// Observability settings
    #[serde(default)]
    pub observability: ObservabilitySettings,

    /// Clients in registration order
    #[serde(default)]
    #[validate(nested)]
    pub clients: Vec<ClientConfig>,
}

/// Observability section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    /// Prometheus exporter port (None = disabled)
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClientConfig {
    /// Client name
    #[validate(length(min = 1, message = "client name cannot be empty"))]
    pub name: String,

    /// Client kind
    pub kind: ClientKind,

    /// Swallow and log this client's failures instead of aborting the fan-out
    #[serde(default)]
    pub isolate_failures: bool,

    /// Kind-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl ClientConfig {
    /// Create a config with no params
    pub fn new(name: impl Into<String>, kind: ClientKind) -> Self {
        Self {
            name: name.into(),
            kind,
            isolate_failures: false,
            params: HashMap::new(),
        }
    }

    /// Add a kind-specific parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Enable failure isolation
    pub fn isolated(mut self) -> Self {
        self.isolate_failures = true;
        self
    }
}

/// Built-in client kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    /// In-memory store, readable
    Memory,
    /// Logs writes via tracing
    Log,
    /// Appends JSON lines to a file
    File,
    /// Forwards writes to the metrics recorder
    Recorder,
}

impl ClientKind {
    /// Parameters a client of this kind cannot be built without
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::File => &["path"],
            Self::Memory | Self::Log | Self::Recorder => &[],
        }
    }

    /// Whether the kind answers reads
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl std::fmt::Display for ClientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Memory => "memory",
            Self::Log => "log",
            Self::File => "file",
            Self::Recorder => "recorder",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_kind_serde() {
        let kind: ClientKind = serde_json::from_str("\"recorder\"").unwrap();
        assert_eq!(kind, ClientKind::Recorder);
        assert_eq!(serde_json::to_string(&ClientKind::File).unwrap(), "\"file\"");
    }

    #[test]
    fn test_client_config_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"name": "mem", "kind": "memory"}"#).unwrap();
        assert!(!config.isolate_failures);
        assert!(config.params.is_empty());
    }

    #[test]
    fn test_empty_name_fails_validation() {
        let config = HubConfig {
            observability: ObservabilitySettings::default(),
            clients: vec![ClientConfig::new("", ClientKind::Log)],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_required_params() {
        assert_eq!(ClientKind::File.required_params(), &["path"]);
        assert!(ClientKind::Memory.required_params().is_empty());
        assert!(ClientKind::Memory.is_readable());
        assert!(!ClientKind::Log.is_readable());
    }
}
