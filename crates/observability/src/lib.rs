//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式，按详细级别过滤)
//! - Prometheus 指标导出
//! - Telemetry 写操作指标记录 (供 `RecorderClient` 使用)
//! - 分发延迟统计
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{init_with_config, metrics, ObservabilityConfig};
//!
//! // 初始化 (-v: debug)
//! init_with_config(ObservabilityConfig::from_verbosity(1, false))?;
//!
//! // 记录一次 hit
//! metrics::record_hit("checkout");
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    describe_metrics, record_dependency, record_event, record_exception, record_hit,
    record_hit_removed, record_metric, record_metric_removed, DispatchStats, RunningStats,
    StatsSummary,
};

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 默认日志级别
    pub default_log_level: String,
    /// 是否允许 RUST_LOG 覆盖默认级别
    pub env_filter_override: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_port: None,
            default_log_level: "info".to_string(),
            env_filter_override: true,
        }
    }
}

impl ObservabilityConfig {
    /// 由 `-v` 次数与 `-q` 推导日志级别
    ///
    /// `quiet` 固定为 `warn` 且忽略 RUST_LOG。
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let default_log_level = if quiet {
            "warn"
        } else {
            match verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        };

        Self {
            default_log_level: default_log_level.to_string(),
            env_filter_override: !quiet,
            ..Self::default()
        }
    }

    /// 设置日志格式
    pub fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        if self.env_filter_override {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
        } else {
            EnvFilter::new(&self.default_log_level)
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 使用自定义配置初始化 Tracing，并按需启动 Prometheus 导出
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    // 1. Initialize Tracing
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    // 2. Initialize Prometheus Exporter (if enabled)
    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        level = %config.default_log_level,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
///
/// 用于 Tracing 已初始化、端口在加载配置后才确定的场景。
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    describe_metrics();
    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert!(config.metrics_port.is_none());
        assert_eq!(config.default_log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(ObservabilityConfig::from_verbosity(0, false).default_log_level, "info");
        assert_eq!(ObservabilityConfig::from_verbosity(1, false).default_log_level, "debug");
        assert_eq!(ObservabilityConfig::from_verbosity(5, false).default_log_level, "trace");
    }

    #[test]
    fn test_quiet_ignores_env_filter() {
        let config = ObservabilityConfig::from_verbosity(0, true);
        assert!(!config.env_filter_override);
        assert_eq!(config.env_filter().max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_with_log_format() {
        let config = ObservabilityConfig::from_verbosity(1, false).with_log_format(LogFormat::Json);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.default_log_level, "debug");
    }
}
