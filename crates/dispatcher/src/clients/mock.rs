//! MockClient - scripted client for tests
//!
//! Answers reads from scripted values, records every call, and can be told
//! to fail reads or writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{EventKey, EventPayload, Result, TelemetryClient, TelemetryError};

/// A call received by [`MockClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    TrackHit(String),
    GetHit(String),
    RemoveHit(String),
    TrackMetric(String, String),
    GetMetric(String, String),
    RemoveMetric(String, String),
    TrackEvent(EventKey),
    TrackEventWithTtl(EventKey, Duration),
    GetEvent(EventKey),
    TrackException(String),
    TrackDependency(String, u64),
}

impl MockCall {
    fn op(&self) -> &'static str {
        match self {
            Self::TrackHit(_) => "track_hit",
            Self::GetHit(_) => "get_hit",
            Self::RemoveHit(_) => "remove_hit",
            Self::TrackMetric(..) => "track_metric",
            Self::GetMetric(..) => "get_metric",
            Self::RemoveMetric(..) => "remove_metric",
            Self::TrackEvent(_) => "track_event",
            Self::TrackEventWithTtl(..) => "track_event_with_ttl",
            Self::GetEvent(_) => "get_event",
            Self::TrackException(_) => "track_exception",
            Self::TrackDependency(..) => "track_dependency",
        }
    }

    fn is_read(&self) -> bool {
        matches!(
            self,
            Self::GetHit(_) | Self::GetMetric(..) | Self::GetEvent(_)
        )
    }
}

/// Scripted client
///
/// # Example
///
/// ```
/// use dispatcher::{MockCall, MockClient, TelemetryClient};
///
/// let client = MockClient::new("mock").with_hit("visits", 3);
/// assert_eq!(client.get_hit("visits").unwrap(), 3);
/// assert_eq!(client.calls(), vec![MockCall::GetHit("visits".into())]);
/// ```
#[derive(Default)]
pub struct MockClient {
    name: String,
    hits: HashMap<String, u64>,
    metrics: HashMap<(String, String), i64>,
    events: HashMap<EventKey, EventPayload>,
    calls: Mutex<Vec<MockCall>>,
    journal: Option<Arc<Mutex<Vec<String>>>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MockClient {
    /// Create a mock answering "no data" to every read
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Script the answer for hit `name`
    pub fn with_hit(mut self, name: impl Into<String>, value: u64) -> Self {
        self.hits.insert(name.into(), value);
        self
    }

    /// Script the answer for metric `(name, variation)`
    pub fn with_metric(
        mut self,
        name: impl Into<String>,
        variation: impl Into<String>,
        value: i64,
    ) -> Self {
        self.metrics.insert((name.into(), variation.into()), value);
        self
    }

    /// Script the answer for event `key`
    pub fn with_event(mut self, key: EventKey, payload: EventPayload) -> Self {
        self.events.insert(key, payload);
        self
    }

    /// Append `"<name>:<op>"` to a journal shared with other mocks
    pub fn with_journal(mut self, journal: &Arc<Mutex<Vec<String>>>) -> Self {
        self.journal = Some(Arc::clone(journal));
        self
    }

    /// Fail every write
    pub fn failing(self) -> Self {
        self.fail_writes.store(true, Ordering::Relaxed);
        self
    }

    /// Fail every read
    pub fn failing_reads(self) -> Self {
        self.fail_reads.store(true, Ordering::Relaxed);
        self
    }

    /// Toggle write failures at runtime
    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::Relaxed);
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn record(&self, call: MockCall) -> Result<()> {
        let op = call.op();
        let fail = if call.is_read() {
            self.fail_reads.load(Ordering::Relaxed)
        } else {
            self.fail_writes.load(Ordering::Relaxed)
        };

        if let Some(journal) = &self.journal {
            lock(journal).push(format!("{}:{}", self.name, op));
        }
        lock(&self.calls).push(call);

        if fail {
            return Err(TelemetryError::backend(
                &self.name,
                format!("{op}: mock failure"),
            ));
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TelemetryClient for MockClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn track_hit(&self, name: &str) -> Result<()> {
        self.record(MockCall::TrackHit(name.to_string()))
    }

    fn get_hit(&self, name: &str) -> Result<u64> {
        self.record(MockCall::GetHit(name.to_string()))?;
        Ok(self.hits.get(name).copied().unwrap_or(0))
    }

    fn remove_hit(&self, name: &str) -> Result<()> {
        self.record(MockCall::RemoveHit(name.to_string()))
    }

    fn track_metric(&self, name: &str, variation: &str) -> Result<()> {
        self.record(MockCall::TrackMetric(
            name.to_string(),
            variation.to_string(),
        ))
    }

    fn get_metric(&self, name: &str, variation: &str) -> Result<i64> {
        let key = (name.to_string(), variation.to_string());
        self.record(MockCall::GetMetric(key.0.clone(), key.1.clone()))?;
        Ok(self.metrics.get(&key).copied().unwrap_or(0))
    }

    fn remove_metric(&self, name: &str, variation: &str) -> Result<()> {
        self.record(MockCall::RemoveMetric(
            name.to_string(),
            variation.to_string(),
        ))
    }

    fn track_event(&self, key: &EventKey, _payload: EventPayload) -> Result<()> {
        self.record(MockCall::TrackEvent(key.clone()))
    }

    fn track_event_with_ttl(
        &self,
        key: &EventKey,
        _payload: EventPayload,
        ttl: Duration,
    ) -> Result<()> {
        self.record(MockCall::TrackEventWithTtl(key.clone(), ttl))
    }

    fn get_event(&self, key: &EventKey) -> Result<Option<EventPayload>> {
        self.record(MockCall::GetEvent(key.clone()))?;
        Ok(self.events.get(key).cloned())
    }

    fn track_exception(&self, exception_type: &str) -> Result<()> {
        self.record(MockCall::TrackException(exception_type.to_string()))
    }

    fn track_dependency(&self, interface_type: &str, resolved_times: u64) -> Result<()> {
        self.record(MockCall::TrackDependency(
            interface_type.to_string(),
            resolved_times,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_calls() {
        let client = MockClient::new("m");
        client.track_hit("a").unwrap();
        client.remove_metric("b", "c").unwrap();

        assert_eq!(
            client.calls(),
            vec![
                MockCall::TrackHit("a".into()),
                MockCall::RemoveMetric("b".into(), "c".into()),
            ]
        );
    }

    #[test]
    fn test_mock_failure_modes() {
        let client = MockClient::new("m").failing();
        assert!(client.track_hit("a").is_err());
        assert!(client.get_hit("a").is_ok());

        client.set_failing(false);
        assert!(client.track_hit("a").is_ok());
        assert_eq!(client.call_count(), 3);
    }

    #[test]
    fn test_mock_journal_is_shared() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let a = MockClient::new("a").with_journal(&journal);
        let b = MockClient::new("b").with_journal(&journal);

        b.track_exception("E").unwrap();
        a.get_metric("m", "v").unwrap();

        assert_eq!(
            *journal.lock().unwrap(),
            vec!["b:track_exception", "a:get_metric"]
        );
    }
}
