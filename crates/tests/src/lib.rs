//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置文件 -> 分发器 -> client 的端到端测试
//! - 并发注册与分发
//! - 跨 client 的事件 TTL 与失败传播

#[cfg(test)]
mod contract_tests {
    use contracts::{ClientKind, EventKey, TelemetryError};

    #[test]
    fn test_error_messages_name_the_client() {
        let err = TelemetryError::backend("primary", "disk full");
        assert!(err.to_string().contains("primary"));

        let err = TelemetryError::resolution("file", "missing path");
        assert!(err.to_string().contains("missing path"));
    }

    #[test]
    fn test_event_keys_distinguish_types() {
        assert_ne!(EventKey::of::<u8>("a"), EventKey::of::<u16>("a"));
        assert!(ClientKind::Memory.is_readable());
        assert!(!ClientKind::Log.is_readable());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ClientConfig, ClientKind, HubConfig, TelemetryEvent};
    use dispatcher::{
        create_dispatcher, DispatcherBuilder, MemoryClient, MockClient, TelemetryClient,
        TelemetryDispatcher, TelemetryError,
    };

    struct Release {
        name: String,
        version: String,
    }

    impl Release {
        fn new(name: &str, version: &str) -> Self {
            Self {
                name: name.to_string(),
                version: version.to_string(),
            }
        }
    }

    impl TelemetryEvent for Release {
        type Payload = String;

        fn name(&self) -> &str {
            &self.name
        }

        fn payload(&self) -> String {
            self.version.clone()
        }
    }

    fn read_lines(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// End-to-end: TOML config -> DispatcherBuilder -> memory + file clients
    #[test]
    fn test_e2e_config_to_dispatcher() {
        let dir = tempfile::tempdir().unwrap();
        let audit_path = dir.path().join("audit.jsonl");

        let toml = format!(
            r#"
[[clients]]
name = "audit"
kind = "file"
[clients.params]
path = "{}"

[[clients]]
name = "primary"
kind = "memory"

[[clients]]
name = "console"
kind = "log"
isolate_failures = true
"#,
            audit_path.display()
        );

        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let (dispatcher, isolated) = DispatcherBuilder::new(config).build_with_metrics().unwrap();

        assert_eq!(dispatcher.client_names(), vec!["audit", "primary", "console"]);
        assert_eq!(isolated.len(), 1);
        assert_eq!(isolated[0].0, "console");

        dispatcher.track_hit("signup").unwrap();
        dispatcher.track_hit("signup").unwrap();
        dispatcher.track_metric("latency", "p99").unwrap();
        dispatcher
            .track_event(&Release::new("api", "1.4.0"))
            .unwrap();
        dispatcher.track_exception("Timeout").unwrap();

        // The file client answers 0, the memory client behind it answers
        assert_eq!(dispatcher.get_hit("signup").unwrap(), 2);
        assert_eq!(dispatcher.get_metric("latency", "p99").unwrap(), 1);
        assert_eq!(
            dispatcher.get_event(&Release::new("api", "")).unwrap(),
            Some("1.4.0".to_string())
        );

        let snapshot = isolated[0].1.snapshot();
        assert_eq!(snapshot.write_count, 5);
        assert_eq!(snapshot.failure_count, 0);

        drop(dispatcher);
        let lines = read_lines(&audit_path);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[3]["kind"], "event");
        assert_eq!(lines[4]["exception_type"], "Timeout");
    }

    #[test]
    fn test_e2e_invalid_config_rejected_before_build() {
        let json = r#"{"clients": [{"name": "a", "kind": "memory"}, {"name": "a", "kind": "log"}]}"#;
        let err = ConfigLoader::load_from_str(json, ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, TelemetryError::ConfigValidation { .. }));
    }

    #[test]
    fn test_resolution_error_propagates() {
        let mut config = HubConfig::default();
        config.clients.push(ClientConfig::new("primary", ClientKind::Memory));
        config.clients.push(ClientConfig::new("audit", ClientKind::File));

        let err = create_dispatcher(&config).unwrap_err();
        assert!(matches!(err, TelemetryError::Resolution { .. }));
    }

    #[test]
    fn test_custom_resolver_error_is_unchanged() {
        let mut config = HubConfig::default();
        config.clients.push(ClientConfig::new("remote", ClientKind::Log));

        let err = DispatcherBuilder::new(config)
            .with_resolver(|c: &ClientConfig| -> contracts::Result<Arc<dyn TelemetryClient>> {
                Err(TelemetryError::resolution(c.kind.to_string(), "endpoint unreachable"))
            })
            .build()
            .unwrap_err();

        match err {
            TelemetryError::Resolution { message, .. } => {
                assert_eq!(message, "endpoint unreachable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Registration racing with writes from several threads
    #[test]
    fn test_concurrent_register_and_track() {
        const THREADS: usize = 4;
        const HITS_PER_THREAD: u64 = 500;

        let dispatcher = Arc::new(TelemetryDispatcher::new());
        let first = dispatcher.register(Arc::new(MemoryClient::new("first")));
        let barrier = Arc::new(Barrier::new(THREADS + 1));

        let writers: Vec<_> = (0..THREADS)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..HITS_PER_THREAD {
                        dispatcher.track_hit("requests").unwrap();
                    }
                })
            })
            .collect();

        let registrar = {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..10)
                    .map(|i| dispatcher.register(Arc::new(MemoryClient::new(format!("late-{i}")))))
                    .collect::<Vec<_>>()
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        let late = registrar.join().unwrap();

        assert_eq!(dispatcher.len(), 11);
        assert_eq!(
            first.get_hit("requests").unwrap(),
            THREADS as u64 * HITS_PER_THREAD
        );
        // Late clients see a suffix of the writes, never more
        for client in late {
            assert!(client.get_hit("requests").unwrap() <= THREADS as u64 * HITS_PER_THREAD);
        }
    }

    #[test]
    fn test_event_ttl_across_clients() {
        let dispatcher = TelemetryDispatcher::new();
        let a = dispatcher.register(Arc::new(MemoryClient::new("a")));
        let b = dispatcher.register(Arc::new(MemoryClient::new("b")));

        dispatcher
            .track_event_with_ttl(&Release::new("canary", "2.0.0"), Duration::from_millis(30))
            .unwrap();
        dispatcher
            .track_event(&Release::new("stable", "1.9.0"))
            .unwrap();

        assert_eq!(a.event_count(), 2);
        assert_eq!(b.event_count(), 2);
        assert_eq!(
            dispatcher.get_event(&Release::new("canary", "")).unwrap(),
            Some("2.0.0".to_string())
        );

        thread::sleep(Duration::from_millis(60));

        assert_eq!(dispatcher.get_event(&Release::new("canary", "")).unwrap(), None);
        assert_eq!(
            dispatcher.get_event(&Release::new("stable", "")).unwrap(),
            Some("1.9.0".to_string())
        );
        // Both clients were consulted and dropped their expired copy
        assert_eq!(a.event_count(), 1);
        assert_eq!(b.event_count(), 1);
    }

    #[test]
    fn test_failure_aborts_fan_out_unless_isolated() {
        let mut config = HubConfig::default();
        config.clients.push(ClientConfig::new("flaky", ClientKind::Log));
        config.clients.push(ClientConfig::new("primary", ClientKind::Memory));

        let flaky = Arc::new(MockClient::new("flaky").failing());
        let primary = Arc::new(MemoryClient::new("primary"));

        let build = |config: HubConfig| {
            let flaky = Arc::clone(&flaky);
            let primary = Arc::clone(&primary);
            DispatcherBuilder::new(config)
                .with_resolver(move |c: &ClientConfig| -> contracts::Result<Arc<dyn TelemetryClient>> {
                    match c.kind {
                        ClientKind::Log => Ok(flaky.clone()),
                        _ => Ok(primary.clone()),
                    }
                })
                .build()
                .unwrap()
        };

        let strict = build(config.clone());
        assert!(strict.track_hit("x").is_err());
        assert_eq!(primary.get_hit("x").unwrap(), 0);

        config.clients[0].isolate_failures = true;
        let lenient = build(config);
        assert!(lenient.track_hit("x").is_ok());
        assert_eq!(primary.get_hit("x").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_configured_from_params() {
        let mut config = HubConfig::default();
        config.clients.push(
            ClientConfig::new("primary", ClientKind::Memory).with_param("sweep_interval_ms", "10"),
        );

        let dispatcher = create_dispatcher(&config).unwrap();
        dispatcher
            .track_event_with_ttl(&Release::new("canary", "2.0.0"), Duration::from_millis(5))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(dispatcher.get_event(&Release::new("canary", "")).unwrap(), None);
    }
}
