//! # Dispatcher
//!
//! Telemetry 分发模块。
//!
//! 负责：
//! - 维护有序的 client 注册表
//! - 写操作 fan-out 到所有 client
//! - 读操作按注册顺序取第一个非默认值
//! - 按配置解析并注册内置 client

pub mod clients;
pub mod dispatcher;
pub mod isolation;
pub mod metrics;
pub mod resolver;

pub use clients::{FileClient, LogClient, MemoryClient, MockCall, MockClient, RecorderClient};
pub use contracts::{EventKey, EventPayload, TelemetryClient, TelemetryError, TelemetryEvent};
pub use dispatcher::{create_dispatcher, DispatcherBuilder, TelemetryDispatcher};
pub use isolation::IsolatedClient;
pub use metrics::{ClientMetrics, MetricsSnapshot};
pub use resolver::{BuiltinResolver, ClientResolver};
