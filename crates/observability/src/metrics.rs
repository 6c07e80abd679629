//! 调度指标收集模块
//!
//! 通过 `metrics` facade 记录队列、消息源与分发的运行指标，
//! 并在内存中聚合分发延迟用于运行摘要。

use std::collections::HashMap;

use metrics::{counter, gauge, histogram};

/// 记录发送队列深度
pub fn record_queue_depth(depth: usize) {
    gauge!("pumpkin_release_queue_depth").set(depth as f64);
}

/// 记录消息入队
pub fn record_message_queued(adapter: &str) {
    counter!(
        "pumpkin_messages_queued_total",
        "adapter" => adapter.to_string()
    )
    .increment(1);
}

/// 记录被过滤的消息 (心跳邮件、空正文)
pub fn record_message_filtered(adapter: &str, reason: &'static str) {
    counter!(
        "pumpkin_messages_filtered_total",
        "adapter" => adapter.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// 记录消息分发
///
/// `lateness_ms` 为实际分发时间与 release time 的差值。
pub fn record_message_dispatched(source: &str, lateness_ms: f64, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "pumpkin_messages_dispatched_total",
        "source" => source.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("pumpkin_dispatch_lateness_ms").record(lateness_ms.max(0.0));
}

/// 记录参数降级 (转换失败或输出拒绝)
pub fn record_parameter_fallback(key: &str) {
    counter!(
        "pumpkin_parameter_fallbacks_total",
        "key" => key.to_string()
    )
    .increment(1);
}

/// 记录消息源连接结果
pub fn record_adapter_connect(adapter: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "pumpkin_adapter_connects_total",
        "adapter" => adapter.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录进入 backoff
pub fn record_adapter_backoff(adapter: &str, wait_ms: f64) {
    counter!(
        "pumpkin_adapter_backoffs_total",
        "adapter" => adapter.to_string()
    )
    .increment(1);
    histogram!(
        "pumpkin_adapter_backoff_ms",
        "adapter" => adapter.to_string()
    )
    .record(wait_ms);
}

/// 记录出站发送
pub fn record_outbound_sent(adapter: &str, heartbeat: bool, success: bool) {
    let kind = if heartbeat { "heartbeat" } else { "reply" };
    let status = if success { "success" } else { "failure" };
    counter!(
        "pumpkin_outbound_total",
        "adapter" => adapter.to_string(),
        "kind" => kind,
        "status" => status
    )
    .increment(1);
}

/// 记录心跳周期
pub fn record_heartbeat_period(period_secs: f64) {
    gauge!("pumpkin_heartbeat_period_seconds").set(period_secs);
}

/// 分发指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchMetricsAggregator {
    /// 分发总数
    pub total_dispatched: u64,

    /// 渲染失败数
    pub total_failed: u64,

    /// 参数降级次数
    pub total_fallbacks: u64,

    /// 分发延迟统计 (毫秒)
    pub lateness_stats: RunningStats,

    /// 各来源分发次数
    pub source_counts: HashMap<String, u64>,
}

impl DispatchMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, source: &str, lateness_ms: f64, fallbacks: usize, success: bool) {
        self.total_dispatched += 1;
        if !success {
            self.total_failed += 1;
        }
        self.total_fallbacks += fallbacks as u64;
        self.lateness_stats.push(lateness_ms.max(0.0));
        *self.source_counts.entry(source.to_string()).or_insert(0) += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_dispatched: self.total_dispatched,
            total_failed: self.total_failed,
            total_fallbacks: self.total_fallbacks,
            failure_rate: if self.total_dispatched > 0 {
                self.total_failed as f64 / self.total_dispatched as f64 * 100.0
            } else {
                0.0
            },
            lateness_ms: StatsSummary::from(&self.lateness_stats),
            source_counts: self.source_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_dispatched: u64,
    pub total_failed: u64,
    pub total_fallbacks: u64,
    pub failure_rate: f64,
    pub lateness_ms: StatsSummary,
    pub source_counts: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Metrics Summary ===")?;
        writeln!(f, "Dispatched messages: {}", self.total_dispatched)?;
        writeln!(
            f,
            "Render failures: {} ({:.2}%)",
            self.total_failed, self.failure_rate
        )?;
        writeln!(f, "Parameter fallbacks: {}", self.total_fallbacks)?;
        writeln!(f, "Lateness (ms): {}", self.lateness_ms)?;

        if !self.source_counts.is_empty() {
            writeln!(f, "Messages per source:")?;
            for (source, count) in &self.source_counts {
                writeln!(f, "  {}: {}", source, count)?;
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
