//! 桥接运行指标
//!
//! 原子计数器，读取线程与发布线程各自累加，任意线程可读取快照。

use std::sync::atomic::{AtomicU64, Ordering};

/// 桥接实时指标
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// 读取到的总行数
    pub lines_total: AtomicU64,
    /// 通过校验并写入状态的行数
    pub lines_valid: AtomicU64,
    /// 被整行丢弃的行数
    pub lines_rejected: AtomicU64,
    /// 单字段解析失败次数（字段保留旧值）
    pub field_errors: AtomicU64,
    /// 读超时次数（无数据时的正常现象）
    pub read_timeouts: AtomicU64,
    /// 发布周期触发次数
    pub publish_ticks: AtomicU64,
    /// 成功发布的消息数
    pub messages_published: AtomicU64,
    /// 发布失败次数
    pub publish_errors: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_total: self.lines_total.load(Ordering::Relaxed),
            lines_valid: self.lines_valid.load(Ordering::Relaxed),
            lines_rejected: self.lines_rejected.load(Ordering::Relaxed),
            field_errors: self.field_errors.load(Ordering::Relaxed),
            read_timeouts: self.read_timeouts.load(Ordering::Relaxed),
            publish_ticks: self.publish_ticks.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            publish_errors: self.publish_errors.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.lines_total.store(0, Ordering::Relaxed);
        self.lines_valid.store(0, Ordering::Relaxed);
        self.lines_rejected.store(0, Ordering::Relaxed);
        self.field_errors.store(0, Ordering::Relaxed);
        self.read_timeouts.store(0, Ordering::Relaxed);
        self.publish_ticks.store(0, Ordering::Relaxed);
        self.messages_published.store(0, Ordering::Relaxed);
        self.publish_errors.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub lines_total: u64,
    pub lines_valid: u64,
    pub lines_rejected: u64,
    pub field_errors: u64,
    pub read_timeouts: u64,
    pub publish_ticks: u64,
    pub messages_published: u64,
    pub publish_errors: u64,
}

impl MetricsSnapshot {
    /// 被丢弃行占比（百分比）
    ///
    /// 持续偏高通常意味着波特率或行格式配置错误。
    pub fn rejection_rate(&self) -> f64 {
        if self.lines_total == 0 {
            return 0.0;
        }
        (self.lines_rejected as f64 / self.lines_total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_reset() {
        let metrics = BridgeMetrics::new();
        metrics.lines_total.fetch_add(4, Ordering::Relaxed);
        metrics.lines_rejected.fetch_add(1, Ordering::Relaxed);
        metrics.messages_published.fetch_add(5, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.lines_total, 4);
        assert_eq!(snapshot.messages_published, 5);
        assert_eq!(snapshot.rejection_rate(), 25.0);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_rejection_rate_empty() {
        assert_eq!(MetricsSnapshot::default().rejection_rate(), 0.0);
    }
}
