//! TelemetryDispatcher - registry and fan-out over telemetry clients
//!
//! Writes are broadcast to every registered client in registration order.
//! Reads walk the same order and return the first non-default answer; a
//! client answering `0` or `None` is skipped, never treated as authoritative.
//!
//! A client error is returned to the caller as-is and stops the walk, so a
//! broadcast that fails halfway leaves earlier clients updated and later
//! ones untouched. Wrap a client in [`IsolatedClient`] to opt out.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tracing::{info, instrument, trace};

use contracts::{ttl_millis, ClientConfig, HubConfig, Result, TelemetryClient, TelemetryEvent};

use crate::isolation::IsolatedClient;
use crate::metrics::ClientMetrics;
use crate::resolver::{BuiltinResolver, ClientResolver};

type ClientList = Vec<Arc<dyn TelemetryClient>>;

/// Ordered registry of telemetry clients
///
/// Registration appends to an immutable snapshot that is swapped in
/// atomically; every operation iterates the snapshot it loaded, so
/// concurrent registration never disturbs an in-flight fan-out.
pub struct TelemetryDispatcher {
    clients: ArcSwap<ClientList>,
}

impl TelemetryDispatcher {
    /// Create a dispatcher with no clients
    pub fn new() -> Self {
        Self {
            clients: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Register a client and hand it back
    ///
    /// The returned `Arc` is the one passed in.
    pub fn register<C: TelemetryClient + 'static>(&self, client: Arc<C>) -> Arc<C> {
        trace!(client = type_name::<C>(), name = client.name(), "register");
        let erased: Arc<dyn TelemetryClient> = client.clone();
        self.append(erased);
        client
    }

    /// Register an already type-erased client
    pub fn register_dyn(&self, client: Arc<dyn TelemetryClient>) -> Arc<dyn TelemetryClient> {
        trace!(client = client.type_name(), name = client.name(), "register");
        self.append(Arc::clone(&client));
        client
    }

    /// Construct a client through `factory`, then register it
    ///
    /// A factory error is returned unchanged and nothing is registered.
    pub fn register_with<C, F>(&self, factory: F) -> Result<Arc<C>>
    where
        C: TelemetryClient + 'static,
        F: FnOnce() -> Result<C>,
    {
        let client = factory()?;
        Ok(self.register(Arc::new(client)))
    }

    /// Resolve a client from `config`, then register it
    pub fn register_resolved<R>(
        &self,
        resolver: &R,
        config: &ClientConfig,
    ) -> Result<Arc<dyn TelemetryClient>>
    where
        R: ClientResolver + ?Sized,
    {
        let client = resolver.resolve(config)?;
        Ok(self.register_dyn(client))
    }

    /// Number of registered clients
    pub fn len(&self) -> usize {
        self.clients.load().len()
    }

    /// Whether no client is registered
    pub fn is_empty(&self) -> bool {
        self.clients.load().is_empty()
    }

    /// Names of registered clients, in registration order
    pub fn client_names(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    // ===== Hits =====

    /// Increment hit `name` on every client
    pub fn track_hit(&self, name: &str) -> Result<()> {
        trace!(hit = name, "track_hit");
        self.broadcast(|c| c.track_hit(name))
    }

    /// First positive count for hit `name`, or 0
    pub fn get_hit(&self, name: &str) -> Result<u64> {
        trace!(hit = name, "get_hit");
        let found = self.first_match(|c| Ok(Some(c.get_hit(name)?).filter(|v| *v > 0)))?;
        Ok(found.unwrap_or(0))
    }

    /// Remove hit `name` from every client
    pub fn remove_hit(&self, name: &str) -> Result<()> {
        trace!(hit = name, "remove_hit");
        self.broadcast(|c| c.remove_hit(name))
    }

    // ===== Metrics =====

    /// Increment metric `(name, variation)` on every client
    pub fn track_metric(&self, name: &str, variation: &str) -> Result<()> {
        trace!(metric = name, variation, "track_metric");
        self.broadcast(|c| c.track_metric(name, variation))
    }

    /// First nonzero value for metric `(name, variation)`, or 0
    pub fn get_metric(&self, name: &str, variation: &str) -> Result<i64> {
        trace!(metric = name, variation, "get_metric");
        let found =
            self.first_match(|c| Ok(Some(c.get_metric(name, variation)?).filter(|v| *v != 0)))?;
        Ok(found.unwrap_or(0))
    }

    /// Remove metric `(name, variation)` from every client
    pub fn remove_metric(&self, name: &str, variation: &str) -> Result<()> {
        trace!(metric = name, variation, "remove_metric");
        self.broadcast(|c| c.remove_metric(name, variation))
    }

    // ===== Events =====

    /// Store `event` on every client
    pub fn track_event<E: TelemetryEvent>(&self, event: &E) -> Result<()> {
        let key = event.key();
        trace!(event = %key, "track_event");
        let payload = event.erased_payload();
        self.broadcast(|c| c.track_event(&key, Arc::clone(&payload)))
    }

    /// Store `event` on every client with the same `ttl`
    pub fn track_event_with_ttl<E: TelemetryEvent>(&self, event: &E, ttl: Duration) -> Result<()> {
        let key = event.key();
        trace!(event = %key, ttl_ms = ttl_millis(ttl), "track_event_with_ttl");
        let payload = event.erased_payload();
        self.broadcast(|c| c.track_event_with_ttl(&key, Arc::clone(&payload), ttl))
    }

    /// First stored payload for `event`, or `None`
    ///
    /// A payload stored under the same key with a different type counts as
    /// no answer.
    pub fn get_event<E: TelemetryEvent>(&self, event: &E) -> Result<Option<E::Payload>> {
        let key = event.key();
        trace!(event = %key, "get_event");
        self.first_match(|c| {
            let payload = c.get_event(&key)?;
            Ok(payload.and_then(|p| p.downcast_ref::<E::Payload>().cloned()))
        })
    }

    // ===== Write-only signals =====

    /// Record an exception type on every client
    pub fn track_exception(&self, exception_type: &str) -> Result<()> {
        trace!(exception = exception_type, "track_exception");
        self.broadcast(|c| c.track_exception(exception_type))
    }

    /// Record exception type `E` on every client
    pub fn track_exception_of<E: ?Sized + 'static>(&self) -> Result<()> {
        self.track_exception(type_name::<E>())
    }

    /// Record a dependency resolution count on every client
    pub fn track_dependency(&self, interface_type: &str, resolved_times: u64) -> Result<()> {
        trace!(interface = interface_type, resolved_times, "track_dependency");
        self.broadcast(|c| c.track_dependency(interface_type, resolved_times))
    }

    /// Record a resolution count for interface type `T` on every client
    pub fn track_dependency_of<T: ?Sized + 'static>(&self, resolved_times: u64) -> Result<()> {
        self.track_dependency(type_name::<T>(), resolved_times)
    }

    fn snapshot(&self) -> Arc<ClientList> {
        self.clients.load_full()
    }

    fn append(&self, client: Arc<dyn TelemetryClient>) {
        self.clients.rcu(|current| {
            let mut next = ClientList::clone(current);
            next.push(Arc::clone(&client));
            next
        });
    }

    fn broadcast<F>(&self, mut op: F) -> Result<()>
    where
        F: FnMut(&dyn TelemetryClient) -> Result<()>,
    {
        for client in self.snapshot().iter() {
            op(client.as_ref())?;
        }
        Ok(())
    }

    fn first_match<T, F>(&self, mut query: F) -> Result<Option<T>>
    where
        F: FnMut(&dyn TelemetryClient) -> Result<Option<T>>,
    {
        for client in self.snapshot().iter() {
            if let Some(value) = query(client.as_ref())? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

impl Default for TelemetryDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TelemetryDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryDispatcher")
            .field("clients", &self.client_names())
            .finish()
    }
}

/// Builder for creating a TelemetryDispatcher from configuration
pub struct DispatcherBuilder {
    config: HubConfig,
    resolver: Box<dyn ClientResolver>,
}

impl DispatcherBuilder {
    /// Create a builder that resolves built-in client kinds
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            resolver: Box::new(BuiltinResolver::new()),
        }
    }

    /// Replace the resolver
    pub fn with_resolver(mut self, resolver: impl ClientResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Resolve and register every configured client, in order
    pub fn build(self) -> Result<TelemetryDispatcher> {
        self.build_with_metrics().map(|(dispatcher, _)| dispatcher)
    }

    /// Like [`build`](Self::build), also returning the counters of every
    /// client configured with `isolate_failures`
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(client_count = self.config.clients.len())
    )]
    pub fn build_with_metrics(
        self,
    ) -> Result<(TelemetryDispatcher, Vec<(String, Arc<ClientMetrics>)>)> {
        let dispatcher = TelemetryDispatcher::new();
        let mut isolated = Vec::new();

        for client_config in &self.config.clients {
            let client = self.resolver.resolve(client_config)?;
            let client = if client_config.isolate_failures {
                let wrapper = IsolatedClient::new(client);
                isolated.push((client_config.name.clone(), Arc::clone(wrapper.metrics())));
                Arc::new(wrapper) as Arc<dyn TelemetryClient>
            } else {
                client
            };
            dispatcher.register_dyn(client);
        }

        info!(
            clients = dispatcher.len(),
            isolated = isolated.len(),
            "Dispatcher built"
        );
        Ok((dispatcher, isolated))
    }
}

/// Convenience function to create a dispatcher from configuration
#[instrument(name = "dispatcher_create", skip(config))]
pub fn create_dispatcher(config: &HubConfig) -> Result<TelemetryDispatcher> {
    DispatcherBuilder::new(config.clone()).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MemoryClient, MockCall, MockClient};
    use contracts::{ClientKind, EventKey, TelemetryError};
    use std::sync::Mutex;

    struct PageView {
        path: String,
    }

    impl TelemetryEvent for PageView {
        type Payload = String;

        fn name(&self) -> &str {
            "page_view"
        }

        fn payload(&self) -> String {
            self.path.clone()
        }
    }

    fn journal() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn test_empty_dispatcher_reads_default() {
        let dispatcher = TelemetryDispatcher::new();
        let event = PageView { path: "/".into() };

        assert!(dispatcher.is_empty());
        assert_eq!(dispatcher.get_hit("x").unwrap(), 0);
        assert_eq!(dispatcher.get_metric("latency", "p99").unwrap(), 0);
        assert_eq!(dispatcher.get_event(&event).unwrap(), None);
    }

    #[test]
    fn test_empty_dispatcher_writes_succeed() {
        let dispatcher = TelemetryDispatcher::new();
        dispatcher.track_hit("x").unwrap();
        dispatcher.remove_metric("m", "v").unwrap();
        dispatcher.track_exception("io::Error").unwrap();
    }

    #[test]
    fn test_register_returns_same_instance() {
        let dispatcher = TelemetryDispatcher::new();
        let client = Arc::new(MockClient::new("a"));
        let returned = dispatcher.register(Arc::clone(&client));

        assert!(Arc::ptr_eq(&client, &returned));
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_fans_out_twice() {
        let dispatcher = TelemetryDispatcher::new();
        let client = dispatcher.register(Arc::new(MockClient::new("a")));
        dispatcher.register(Arc::clone(&client));

        dispatcher.track_hit("x").unwrap();
        assert_eq!(client.calls(), vec![
            MockCall::TrackHit("x".into()),
            MockCall::TrackHit("x".into()),
        ]);
    }

    #[test]
    fn test_track_hit_reaches_every_client_in_order() {
        let log = journal();
        let dispatcher = TelemetryDispatcher::new();
        let clients: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|n| dispatcher.register(Arc::new(MockClient::new(n).with_journal(&log))))
            .collect();

        dispatcher.track_hit("signup").unwrap();

        for client in &clients {
            assert_eq!(client.calls(), vec![MockCall::TrackHit("signup".into())]);
        }
        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:track_hit", "b:track_hit", "c:track_hit"]
        );
    }

    #[test]
    fn test_get_hit_skips_zero() {
        let dispatcher = TelemetryDispatcher::new();
        dispatcher.register(Arc::new(MockClient::new("a").with_hit("x", 0)));
        dispatcher.register(Arc::new(MockClient::new("b").with_hit("x", 5)));

        assert_eq!(dispatcher.get_hit("x").unwrap(), 5);
    }

    #[test]
    fn test_get_hit_uses_registration_order() {
        let dispatcher = TelemetryDispatcher::new();
        dispatcher.register(Arc::new(MockClient::new("a").with_hit("x", 3)));
        let second = dispatcher.register(Arc::new(MockClient::new("b").with_hit("x", 9)));

        assert_eq!(dispatcher.get_hit("x").unwrap(), 3);
        assert!(second.calls().is_empty());
    }

    #[test]
    fn test_get_metric_short_circuits() {
        let dispatcher = TelemetryDispatcher::new();
        let first =
            dispatcher.register(Arc::new(MockClient::new("a").with_metric("latency", "p99", 42)));
        let second = dispatcher.register(Arc::new(MockClient::new("b")));

        assert_eq!(dispatcher.get_metric("latency", "p99").unwrap(), 42);
        assert_eq!(first.calls().len(), 1);
        assert!(second.calls().is_empty());
    }

    #[test]
    fn test_get_metric_accepts_negative_values() {
        let dispatcher = TelemetryDispatcher::new();
        dispatcher.register(Arc::new(MockClient::new("a").with_metric("delta", "day", 0)));
        dispatcher.register(Arc::new(MockClient::new("b").with_metric("delta", "day", -4)));

        assert_eq!(dispatcher.get_metric("delta", "day").unwrap(), -4);
    }

    #[test]
    fn test_track_event_with_ttl_passes_same_ttl() {
        let dispatcher = TelemetryDispatcher::new();
        let a = dispatcher.register(Arc::new(MockClient::new("a")));
        let b = dispatcher.register(Arc::new(MockClient::new("b")));
        let ttl = Duration::from_secs(30);

        dispatcher
            .track_event_with_ttl(&PageView { path: "/home".into() }, ttl)
            .unwrap();

        let key = EventKey::of::<PageView>("page_view");
        for client in [&a, &b] {
            assert_eq!(
                client.calls(),
                vec![MockCall::TrackEventWithTtl(key.clone(), ttl)]
            );
        }
    }

    #[test]
    fn test_get_event_first_present_payload() {
        let dispatcher = TelemetryDispatcher::new();
        let key = EventKey::of::<PageView>("page_view");
        dispatcher.register(Arc::new(MockClient::new("empty")));
        dispatcher.register(Arc::new(
            MockClient::new("full").with_event(key, Arc::new("/pricing".to_string())),
        ));

        let payload = dispatcher
            .get_event(&PageView { path: String::new() })
            .unwrap();
        assert_eq!(payload.as_deref(), Some("/pricing"));
    }

    #[test]
    fn test_get_event_uses_registration_order() {
        let dispatcher = TelemetryDispatcher::new();
        let key = EventKey::of::<PageView>("page_view");
        let first = dispatcher.register(Arc::new(
            MockClient::new("first").with_event(key.clone(), Arc::new("/first".to_string())),
        ));
        let second = dispatcher.register(Arc::new(
            MockClient::new("second").with_event(key, Arc::new("/second".to_string())),
        ));

        let payload = dispatcher
            .get_event(&PageView { path: String::new() })
            .unwrap();
        assert_eq!(payload.as_deref(), Some("/first"));
        assert_eq!(first.calls().len(), 1);
        assert!(second.calls().is_empty());
    }

    #[test]
    fn test_get_event_skips_mismatched_payload_type() {
        let dispatcher = TelemetryDispatcher::new();
        let key = EventKey::of::<PageView>("page_view");
        dispatcher.register(Arc::new(
            MockClient::new("wrong").with_event(key.clone(), Arc::new(17_u32)),
        ));
        dispatcher.register(Arc::new(
            MockClient::new("right").with_event(key, Arc::new("/docs".to_string())),
        ));

        let payload = dispatcher
            .get_event(&PageView { path: String::new() })
            .unwrap();
        assert_eq!(payload.as_deref(), Some("/docs"));
    }

    #[test]
    fn test_remove_broadcasts_without_existence_check() {
        let dispatcher = TelemetryDispatcher::new();
        let a = dispatcher.register(Arc::new(MockClient::new("a")));
        let b = dispatcher.register(Arc::new(MockClient::new("b")));

        dispatcher.remove_hit("never").unwrap();
        dispatcher.remove_metric("never", "seen").unwrap();

        for client in [&a, &b] {
            assert_eq!(client.calls(), vec![
                MockCall::RemoveHit("never".into()),
                MockCall::RemoveMetric("never".into(), "seen".into()),
            ]);
        }
    }

    #[test]
    fn test_write_only_signals_broadcast() {
        let dispatcher = TelemetryDispatcher::new();
        let a = dispatcher.register(Arc::new(MockClient::new("a")));

        dispatcher.track_exception_of::<std::io::Error>().unwrap();
        dispatcher.track_dependency_of::<dyn TelemetryClient>(3).unwrap();

        assert_eq!(a.calls(), vec![
            MockCall::TrackException(type_name::<std::io::Error>().into()),
            MockCall::TrackDependency(type_name::<dyn TelemetryClient>().into(), 3),
        ]);
    }

    #[test]
    fn test_backend_error_aborts_fan_out() {
        let dispatcher = TelemetryDispatcher::new();
        let first = dispatcher.register(Arc::new(MockClient::new("first")));
        dispatcher.register(Arc::new(MockClient::new("broken").failing()));
        let last = dispatcher.register(Arc::new(MockClient::new("last")));

        let err = dispatcher.track_metric("orders", "eu").unwrap_err();

        assert!(matches!(err, TelemetryError::Backend { ref client, .. } if client == "broken"));
        assert_eq!(first.calls().len(), 1);
        assert!(last.calls().is_empty());
    }

    #[test]
    fn test_read_error_propagates() {
        let dispatcher = TelemetryDispatcher::new();
        dispatcher.register(Arc::new(MockClient::new("broken").failing_reads()));
        dispatcher.register(Arc::new(MockClient::new("ok").with_hit("x", 1)));

        assert!(dispatcher.get_hit("x").is_err());
    }

    #[test]
    fn test_register_with_factory() {
        let dispatcher = TelemetryDispatcher::new();
        let client = dispatcher
            .register_with(|| Ok(MemoryClient::new("mem")))
            .unwrap();

        dispatcher.track_hit("x").unwrap();
        assert_eq!(client.get_hit("x").unwrap(), 1);
    }

    #[test]
    fn test_register_with_failing_factory() {
        let dispatcher = TelemetryDispatcher::new();
        let result = dispatcher.register_with::<MemoryClient, _>(|| {
            Err(TelemetryError::resolution("MemoryClient", "no capacity"))
        });

        assert!(matches!(result, Err(TelemetryError::Resolution { .. })));
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_register_resolved() {
        let dispatcher = TelemetryDispatcher::new();
        let config = ClientConfig::new("mem", ClientKind::Memory);
        let client = dispatcher
            .register_resolved(&BuiltinResolver::new(), &config)
            .unwrap();

        assert_eq!(client.name(), "mem");
        assert_eq!(dispatcher.client_names(), vec!["mem"]);
    }

    #[test]
    fn test_builder_registers_in_config_order() {
        let config = HubConfig {
            clients: vec![
                ClientConfig::new("mem", ClientKind::Memory),
                ClientConfig::new("console", ClientKind::Log),
                ClientConfig::new("prom", ClientKind::Recorder).isolated(),
            ],
            ..HubConfig::default()
        };

        let (dispatcher, isolated) = DispatcherBuilder::new(config).build_with_metrics().unwrap();

        assert_eq!(dispatcher.client_names(), vec!["mem", "console", "prom"]);
        assert_eq!(isolated.len(), 1);
        assert_eq!(isolated[0].0, "prom");
    }

    #[test]
    fn test_builder_propagates_resolution_error() {
        let config = HubConfig {
            clients: vec![ClientConfig::new("audit", ClientKind::File)],
            ..HubConfig::default()
        };

        let result = create_dispatcher(&config);
        assert!(matches!(result, Err(TelemetryError::Resolution { .. })));
    }

    #[test]
    fn test_builder_with_custom_resolver() {
        let resolver = |config: &ClientConfig| -> Result<Arc<dyn TelemetryClient>> {
            Ok(Arc::new(MockClient::new(config.name.clone()).with_hit("x", 11)))
        };
        let config = HubConfig {
            clients: vec![ClientConfig::new("scripted", ClientKind::Log)],
            ..HubConfig::default()
        };

        let dispatcher = DispatcherBuilder::new(config)
            .with_resolver(resolver)
            .build()
            .unwrap();
        assert_eq!(dispatcher.get_hit("x").unwrap(), 11);
    }

    #[test]
    fn test_isolated_client_lets_fan_out_continue() {
        let dispatcher = TelemetryDispatcher::new();
        let broken: Arc<dyn TelemetryClient> = Arc::new(MockClient::new("broken").failing());
        let isolated = dispatcher.register(Arc::new(IsolatedClient::new(broken)));
        let last = dispatcher.register(Arc::new(MockClient::new("last")));

        dispatcher.track_hit("x").unwrap();

        assert_eq!(last.calls(), vec![MockCall::TrackHit("x".into())]);
        assert_eq!(isolated.metrics().failure_count(), 1);
    }
}
