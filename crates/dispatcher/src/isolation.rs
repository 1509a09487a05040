//! IsolatedClient - shields the fan-out from a failing client

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, instrument};

use contracts::{EventKey, EventPayload, Result, TelemetryClient};

use crate::metrics::ClientMetrics;

/// Wrapper that logs and swallows the inner client's failures
///
/// Write failures are counted and reported as success so the dispatcher
/// moves on to the next client. Read failures degrade to the default
/// answer (`0` / `None`), which the dispatcher treats as "no data".
pub struct IsolatedClient<C: ?Sized = dyn TelemetryClient> {
    inner: Arc<C>,
    metrics: Arc<ClientMetrics>,
}

impl<C: TelemetryClient + ?Sized> IsolatedClient<C> {
    /// Wrap `inner`
    pub fn new(inner: Arc<C>) -> Self {
        Self {
            inner,
            metrics: Arc::new(ClientMetrics::new()),
        }
    }

    /// Wrapped client
    pub fn inner(&self) -> &Arc<C> {
        &self.inner
    }

    /// Shared counters
    pub fn metrics(&self) -> &Arc<ClientMetrics> {
        &self.metrics
    }

    fn write(&self, op: &'static str, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => self.metrics.inc_write_count(),
            Err(e) => {
                self.metrics.inc_failure_count();
                error!(client = %self.inner.name(), op, error = %e, "Write failed");
                // Continue the fan-out - don't abort on a single client
            }
        }
        Ok(())
    }

    fn read<T: Default>(&self, op: &'static str, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.metrics.inc_read_count();
                Ok(value)
            }
            Err(e) => {
                self.metrics.inc_failure_count();
                error!(client = %self.inner.name(), op, error = %e, "Read failed");
                Ok(T::default())
            }
        }
    }
}

impl<C: TelemetryClient + ?Sized> TelemetryClient for IsolatedClient<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn track_hit(&self, name: &str) -> Result<()> {
        self.write("track_hit", self.inner.track_hit(name))
    }

    fn get_hit(&self, name: &str) -> Result<u64> {
        self.read("get_hit", self.inner.get_hit(name))
    }

    fn remove_hit(&self, name: &str) -> Result<()> {
        self.write("remove_hit", self.inner.remove_hit(name))
    }

    fn track_metric(&self, name: &str, variation: &str) -> Result<()> {
        self.write("track_metric", self.inner.track_metric(name, variation))
    }

    fn get_metric(&self, name: &str, variation: &str) -> Result<i64> {
        self.read("get_metric", self.inner.get_metric(name, variation))
    }

    fn remove_metric(&self, name: &str, variation: &str) -> Result<()> {
        self.write("remove_metric", self.inner.remove_metric(name, variation))
    }

    #[instrument(name = "isolated_track_event", skip(self, payload), fields(client = %self.inner.name(), event = %key))]
    fn track_event(&self, key: &EventKey, payload: EventPayload) -> Result<()> {
        self.write("track_event", self.inner.track_event(key, payload))
    }

    #[instrument(name = "isolated_track_event_with_ttl", skip(self, payload), fields(client = %self.inner.name(), event = %key))]
    fn track_event_with_ttl(
        &self,
        key: &EventKey,
        payload: EventPayload,
        ttl: Duration,
    ) -> Result<()> {
        self.write(
            "track_event_with_ttl",
            self.inner.track_event_with_ttl(key, payload, ttl),
        )
    }

    fn get_event(&self, key: &EventKey) -> Result<Option<EventPayload>> {
        self.read("get_event", self.inner.get_event(key))
    }

    fn track_exception(&self, exception_type: &str) -> Result<()> {
        self.write("track_exception", self.inner.track_exception(exception_type))
    }

    fn track_dependency(&self, interface_type: &str, resolved_times: u64) -> Result<()> {
        self.write(
            "track_dependency",
            self.inner.track_dependency(interface_type, resolved_times),
        )
    }
}
