//! Client resolution from configuration

use std::sync::Arc;
use std::time::Duration;

use contracts::{ttl_millis, ClientConfig, ClientKind, Result, TelemetryClient, TelemetryError};
use tracing::{debug, instrument, warn};

use crate::clients::{FileClient, LogClient, MemoryClient, RecorderClient};

/// Builds clients from their configuration
///
/// Any `Fn(&ClientConfig) -> Result<Arc<dyn TelemetryClient>>` closure is a
/// resolver, which keeps ad-hoc wiring in tests and binaries short.
pub trait ClientResolver: Send + Sync {
    /// Construct the client described by `config`
    ///
    /// # Errors
    /// Returns [`TelemetryError::Resolution`] when the client cannot be built
    fn resolve(&self, config: &ClientConfig) -> Result<Arc<dyn TelemetryClient>>;
}

impl<F> ClientResolver for F
where
    F: Fn(&ClientConfig) -> Result<Arc<dyn TelemetryClient>> + Send + Sync,
{
    fn resolve(&self, config: &ClientConfig) -> Result<Arc<dyn TelemetryClient>> {
        self(config)
    }
}

/// Resolver for the built-in [`ClientKind`]s
///
/// Memory clients accept an optional `sweep_interval_ms` param; when set and
/// a tokio runtime is running, expired events are purged in the background.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinResolver;

impl BuiltinResolver {
    /// Create a new BuiltinResolver
    pub fn new() -> Self {
        Self
    }

    fn memory(config: &ClientConfig) -> Result<Arc<dyn TelemetryClient>> {
        let client = Arc::new(MemoryClient::new(&config.name));

        if let Some(raw) = config.params.get("sweep_interval_ms") {
            let period = raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| {
                    TelemetryError::resolution(
                        config.kind.to_string(),
                        format!("invalid sweep_interval_ms '{raw}' for '{}'", config.name),
                    )
                })?;

            if tokio::runtime::Handle::try_current().is_ok() {
                let _sweeper = client.spawn_sweeper(period);
                debug!(client = %config.name, period_ms = ttl_millis(period), "Sweeper started");
            } else {
                warn!(client = %config.name, "No tokio runtime, expired events purge on read only");
            }
        }

        Ok(client)
    }

    fn file(config: &ClientConfig) -> Result<Arc<dyn TelemetryClient>> {
        let client = FileClient::from_params(&config.name, &config.params).map_err(|e| {
            TelemetryError::resolution(
                config.kind.to_string(),
                format!("'{}': {e}", config.name),
            )
        })?;
        Ok(Arc::new(client))
    }
}

impl ClientResolver for BuiltinResolver {
    #[instrument(
        name = "builtin_resolver_resolve",
        skip(self, config),
        fields(client = %config.name, kind = %config.kind)
    )]
    fn resolve(&self, config: &ClientConfig) -> Result<Arc<dyn TelemetryClient>> {
        match config.kind {
            ClientKind::Memory => Self::memory(config),
            ClientKind::Log => Ok(Arc::new(LogClient::new(&config.name))),
            ClientKind::File => Self::file(config),
            ClientKind::Recorder => Ok(Arc::new(RecorderClient::new(&config.name))),
        }
    }
}
