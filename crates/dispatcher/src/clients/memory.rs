//! MemoryClient - in-process store answering every read

use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{EventKey, EventPayload, Result, TelemetryClient};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

struct StoredEvent {
    payload: EventPayload,
    expires_at: Option<Instant>,
}

impl StoredEvent {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Client that keeps all telemetry in memory
///
/// Event TTL is absolute from the moment of storage. Expired events read
/// as absent and are dropped lazily on read, by [`purge_expired`], or by
/// the background task from [`spawn_sweeper`].
///
/// [`purge_expired`]: MemoryClient::purge_expired
/// [`spawn_sweeper`]: MemoryClient::spawn_sweeper
pub struct MemoryClient {
    name: String,
    hits: DashMap<String, u64>,
    metrics: DashMap<(String, String), i64>,
    events: DashMap<EventKey, StoredEvent>,
    exceptions: DashMap<String, u64>,
    dependencies: DashMap<String, u64>,
}

impl MemoryClient {
    /// Create an empty MemoryClient
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hits: DashMap::new(),
            metrics: DashMap::new(),
            events: DashMap::new(),
            exceptions: DashMap::new(),
            dependencies: DashMap::new(),
        }
    }

    /// Times `exception_type` was tracked
    pub fn exception_count(&self, exception_type: &str) -> u64 {
        self.exceptions
            .get(exception_type)
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Last resolution count reported for `interface_type`
    pub fn dependency_count(&self, interface_type: &str) -> Option<u64> {
        self.dependencies.get(interface_type).map(|count| *count)
    }

    /// Number of stored events, expired ones included
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Drop every expired event, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut purged = 0;
        self.events.retain(|_, event| {
            let keep = !event.is_expired(now);
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }

    /// Run [`purge_expired`](Self::purge_expired) every `period` on the
    /// current tokio runtime
    ///
    /// The task holds a weak reference and stops once the client is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let client = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(client) = client.upgrade() else {
                    break;
                };
                let purged = client.purge_expired();
                if purged > 0 {
                    debug!(client = %client.name, purged, "Expired events purged");
                }
            }
        })
    }

    fn store_event(&self, key: &EventKey, payload: EventPayload, expires_at: Option<Instant>) {
        self.events
            .insert(key.clone(), StoredEvent { payload, expires_at });
    }
}

impl TelemetryClient for MemoryClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn track_hit(&self, name: &str) -> Result<()> {
        *self.hits.entry(name.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn get_hit(&self, name: &str) -> Result<u64> {
        Ok(self.hits.get(name).map(|count| *count).unwrap_or(0))
    }

    fn remove_hit(&self, name: &str) -> Result<()> {
        self.hits.remove(name);
        Ok(())
    }

    fn track_metric(&self, name: &str, variation: &str) -> Result<()> {
        *self
            .metrics
            .entry((name.to_string(), variation.to_string()))
            .or_insert(0) += 1;
        Ok(())
    }

    fn get_metric(&self, name: &str, variation: &str) -> Result<i64> {
        let key = (name.to_string(), variation.to_string());
        Ok(self.metrics.get(&key).map(|value| *value).unwrap_or(0))
    }

    fn remove_metric(&self, name: &str, variation: &str) -> Result<()> {
        self.metrics
            .remove(&(name.to_string(), variation.to_string()));
        Ok(())
    }

    fn track_event(&self, key: &EventKey, payload: EventPayload) -> Result<()> {
        self.store_event(key, payload, None);
        Ok(())
    }

    fn track_event_with_ttl(
        &self,
        key: &EventKey,
        payload: EventPayload,
        ttl: Duration,
    ) -> Result<()> {
        self.store_event(key, payload, Instant::now().checked_add(ttl));
        Ok(())
    }

    fn get_event(&self, key: &EventKey) -> Result<Option<EventPayload>> {
        let now = Instant::now();
        match self.events.get(key) {
            None => return Ok(None),
            Some(event) if !event.is_expired(now) => return Ok(Some(Arc::clone(&event.payload))),
            Some(_) => {}
        }

        // Read guard is released; drop the entry unless it was refreshed meanwhile
        self.events.remove_if(key, |_, event| event.is_expired(now));
        Ok(None)
    }

    fn track_exception(&self, exception_type: &str) -> Result<()> {
        *self
            .exceptions
            .entry(exception_type.to_string())
            .or_insert(0) += 1;
        Ok(())
    }

    fn track_dependency(&self, interface_type: &str, resolved_times: u64) -> Result<()> {
        self.dependencies
            .insert(interface_type.to_string(), resolved_times);
        Ok(())
    }
}
