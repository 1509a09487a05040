//! RecorderClient - forwards telemetry writes to the metrics recorder

use std::time::Duration;

use contracts::{EventKey, EventPayload, Result, TelemetryClient};
use observability::metrics;

/// Write-only client backed by the global `metrics` recorder
///
/// With the Prometheus exporter installed (see `observability::init`) the
/// writes show up as `telemetry_hub_*` series; without a recorder they are
/// dropped.
pub struct RecorderClient {
    name: String,
}

impl RecorderClient {
    /// Create a new RecorderClient
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TelemetryClient for RecorderClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn track_hit(&self, name: &str) -> Result<()> {
        metrics::record_hit(name);
        Ok(())
    }

    fn get_hit(&self, _name: &str) -> Result<u64> {
        Ok(0)
    }

    fn remove_hit(&self, name: &str) -> Result<()> {
        metrics::record_hit_removed(name);
        Ok(())
    }

    fn track_metric(&self, name: &str, variation: &str) -> Result<()> {
        metrics::record_metric(name, variation);
        Ok(())
    }

    fn get_metric(&self, _name: &str, _variation: &str) -> Result<i64> {
        Ok(0)
    }

    fn remove_metric(&self, name: &str, variation: &str) -> Result<()> {
        metrics::record_metric_removed(name, variation);
        Ok(())
    }

    fn track_event(&self, key: &EventKey, _payload: EventPayload) -> Result<()> {
        metrics::record_event(key.type_name, &key.name, None);
        Ok(())
    }

    fn track_event_with_ttl(
        &self,
        key: &EventKey,
        _payload: EventPayload,
        ttl: Duration,
    ) -> Result<()> {
        metrics::record_event(key.type_name, &key.name, Some(ttl));
        Ok(())
    }

    fn get_event(&self, _key: &EventKey) -> Result<Option<EventPayload>> {
        Ok(None)
    }

    fn track_exception(&self, exception_type: &str) -> Result<()> {
        metrics::record_exception(exception_type);
        Ok(())
    }

    fn track_dependency(&self, interface_type: &str, resolved_times: u64) -> Result<()> {
        metrics::record_dependency(interface_type, resolved_times);
        Ok(())
    }
}
