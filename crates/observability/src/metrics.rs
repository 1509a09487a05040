//! Telemetry 指标记录模块
//!
//! 将写操作转发到 `metrics` facade，并提供分发延迟的内存统计。

use std::collections::BTreeMap;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

const HITS_TOTAL: &str = "telemetry_hub_hits_total";
const HITS_REMOVED_TOTAL: &str = "telemetry_hub_hits_removed_total";
const METRIC_TRACKED_TOTAL: &str = "telemetry_hub_metric_tracked_total";
const METRIC_REMOVED_TOTAL: &str = "telemetry_hub_metric_removed_total";
const EVENTS_TOTAL: &str = "telemetry_hub_events_total";
const EVENT_TTL_SECONDS: &str = "telemetry_hub_event_ttl_seconds";
const EXCEPTIONS_TOTAL: &str = "telemetry_hub_exceptions_total";
const DEPENDENCY_RESOLVED: &str = "telemetry_hub_dependency_resolved";

/// 注册指标描述 (Prometheus HELP 文本)
pub fn describe_metrics() {
    describe_counter!(HITS_TOTAL, "Hits tracked, by hit name");
    describe_counter!(HITS_REMOVED_TOTAL, "Hit removals, by hit name");
    describe_counter!(METRIC_TRACKED_TOTAL, "Metric increments, by name and variation");
    describe_counter!(METRIC_REMOVED_TOTAL, "Metric removals, by name and variation");
    describe_counter!(EVENTS_TOTAL, "Events tracked, by event type and name");
    describe_histogram!(EVENT_TTL_SECONDS, Unit::Seconds, "TTL of events tracked with expiry, by event type");
    describe_counter!(EXCEPTIONS_TOTAL, "Exceptions tracked, by exception type");
    describe_gauge!(DEPENDENCY_RESOLVED, "Last reported resolution count per interface");
}

/// 记录 hit
pub fn record_hit(name: &str) {
    counter!(HITS_TOTAL, "name" => name.to_string()).increment(1);
}

/// 记录 hit 删除
pub fn record_hit_removed(name: &str) {
    counter!(HITS_REMOVED_TOTAL, "name" => name.to_string()).increment(1);
}

/// 记录 metric 自增
pub fn record_metric(name: &str, variation: &str) {
    counter!(
        METRIC_TRACKED_TOTAL,
        "name" => name.to_string(),
        "variation" => variation.to_string()
    )
    .increment(1);
}

/// 记录 metric 删除
pub fn record_metric_removed(name: &str, variation: &str) {
    counter!(
        METRIC_REMOVED_TOTAL,
        "name" => name.to_string(),
        "variation" => variation.to_string()
    )
    .increment(1);
}

/// 记录事件 (payload 不导出，只记录类型与名称)
pub fn record_event(type_name: &str, name: &str, ttl: Option<Duration>) {
    counter!(
        EVENTS_TOTAL,
        "type" => type_name.to_string(),
        "name" => name.to_string()
    )
    .increment(1);

    if let Some(ttl) = ttl {
        histogram!(EVENT_TTL_SECONDS, "type" => type_name.to_string()).record(ttl.as_secs_f64());
    }
}

/// 记录异常类型
pub fn record_exception(exception_type: &str) {
    counter!(EXCEPTIONS_TOTAL, "type" => exception_type.to_string()).increment(1);
}

/// 记录依赖解析次数
pub fn record_dependency(interface_type: &str, resolved_times: u64) {
    gauge!(DEPENDENCY_RESOLVED, "interface" => interface_type.to_string())
        .set(resolved_times as f64);
}

/// 分发延迟统计
///
/// 按操作名聚合调用耗时与失败次数，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchStats {
    /// 各操作耗时统计 (微秒)
    pub latency_us: BTreeMap<String, RunningStats>,

    /// 各操作失败次数
    pub failures: BTreeMap<String, u64>,
}

impl DispatchStats {
    /// 创建新的统计器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功调用
    pub fn record(&mut self, op: &str, elapsed: Duration) {
        self.latency_us
            .entry(op.to_string())
            .or_default()
            .push(elapsed.as_secs_f64() * 1_000_000.0);
    }

    /// 记录一次失败调用
    pub fn record_failure(&mut self, op: &str) {
        *self.failures.entry(op.to_string()).or_insert(0) += 1;
    }

    /// 合并另一个统计器 (多 worker 汇总)
    pub fn merge(&mut self, other: &DispatchStats) {
        for (op, stats) in &other.latency_us {
            self.latency_us.entry(op.clone()).or_default().merge(stats);
        }
        for (op, count) in &other.failures {
            *self.failures.entry(op.clone()).or_insert(0) += count;
        }
    }

    /// 总调用次数
    pub fn total_calls(&self) -> u64 {
        self.latency_us.values().map(RunningStats::count).sum()
    }

    /// 总失败次数
    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }
}

impl std::fmt::Display for DispatchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Latency (us) ===")?;
        for (op, stats) in &self.latency_us {
            writeln!(f, "{}: {}", op, StatsSummary::from(stats))?;
        }
        if !self.failures.is_empty() {
            writeln!(f, "Failures:")?;
            for (op, count) in &self.failures {
                writeln!(f, "  {}: {}", op, count)?;
            }
        }
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 合并另一组样本 (Chan 并行算法)
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        let mean = self.mean + delta * other.count as f64 / count as f64;
        let m2 = self.m2
            + other.m2
            + delta * delta * (self.count as f64 * other.count as f64) / count as f64;

        self.count = count;
        self.mean = mean;
        self.m2 = m2;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
