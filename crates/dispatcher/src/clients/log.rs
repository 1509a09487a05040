//! LogClient - logs telemetry writes via tracing

use std::time::Duration;

use contracts::{ttl_millis, EventKey, EventPayload, Result, TelemetryClient};
use tracing::info;

/// Write-only client that logs every write for debugging
///
/// Reads always answer "no data".
pub struct LogClient {
    name: String,
}

impl LogClient {
    /// Create a new LogClient with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TelemetryClient for LogClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn track_hit(&self, name: &str) -> Result<()> {
        info!(client = %self.name, hit = name, "Hit tracked");
        Ok(())
    }

    fn get_hit(&self, _name: &str) -> Result<u64> {
        Ok(0)
    }

    fn remove_hit(&self, name: &str) -> Result<()> {
        info!(client = %self.name, hit = name, "Hit removed");
        Ok(())
    }

    fn track_metric(&self, name: &str, variation: &str) -> Result<()> {
        info!(client = %self.name, metric = name, variation, "Metric tracked");
        Ok(())
    }

    fn get_metric(&self, _name: &str, _variation: &str) -> Result<i64> {
        Ok(0)
    }

    fn remove_metric(&self, name: &str, variation: &str) -> Result<()> {
        info!(client = %self.name, metric = name, variation, "Metric removed");
        Ok(())
    }

    fn track_event(&self, key: &EventKey, _payload: EventPayload) -> Result<()> {
        info!(client = %self.name, event = %key, "Event tracked");
        Ok(())
    }

    fn track_event_with_ttl(
        &self,
        key: &EventKey,
        _payload: EventPayload,
        ttl: Duration,
    ) -> Result<()> {
        info!(
            client = %self.name,
            event = %key,
            ttl_ms = ttl_millis(ttl),
            "Event tracked"
        );
        Ok(())
    }

    fn get_event(&self, _key: &EventKey) -> Result<Option<EventPayload>> {
        Ok(None)
    }

    fn track_exception(&self, exception_type: &str) -> Result<()> {
        info!(client = %self.name, exception = exception_type, "Exception tracked");
        Ok(())
    }

    fn track_dependency(&self, interface_type: &str, resolved_times: u64) -> Result<()> {
        info!(
            client = %self.name,
            interface = interface_type,
            resolved_times,
            "Dependency resolution tracked"
        );
        Ok(())
    }
}
