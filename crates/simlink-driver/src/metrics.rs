//! 客户端性能指标模块
//!
//! 提供零开销的原子计数器，用于监控收发链路的健康状态。
//! 所有计数器都使用原子操作，可以在任何线程安全地读取，不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 客户端实时指标
///
/// # 使用示例
///
/// ```rust
/// use simlink_driver::DriverMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = DriverMetrics::new();
/// metrics.rx_frames_parsed.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.rx_frames_parsed, 1);
/// ```
#[derive(Debug, Default)]
pub struct DriverMetrics {
    /// RX 读取到的数据块数（一次 `receive` 调用计一次）
    pub rx_chunks_total: AtomicU64,

    /// RX 读取到的总字节数
    pub rx_bytes_total: AtomicU64,

    /// 成功解析并发布的遥测帧数
    pub rx_frames_parsed: AtomicU64,

    /// 非遥测帧（未知前缀）被忽略的次数
    pub rx_frames_ignored: AtomicU64,

    /// 严格模式下被拒绝的畸形帧数
    pub rx_frames_rejected: AtomicU64,

    /// RX 超时次数（正常现象，无数据时会超时）
    pub rx_timeouts: AtomicU64,

    /// RX 致命错误次数（对端关闭 / IO 错误）
    pub rx_errors: AtomicU64,

    /// 成功发送的电机指令数
    pub tx_commands_total: AtomicU64,

    /// 未连接时被丢弃的电机指令数
    pub tx_commands_dropped: AtomicU64,

    /// 发送失败次数
    pub tx_errors: AtomicU64,
}

impl DriverMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 使用 `Ordering::Relaxed`，不同计数器之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_chunks_total: self.rx_chunks_total.load(Ordering::Relaxed),
            rx_bytes_total: self.rx_bytes_total.load(Ordering::Relaxed),
            rx_frames_parsed: self.rx_frames_parsed.load(Ordering::Relaxed),
            rx_frames_ignored: self.rx_frames_ignored.load(Ordering::Relaxed),
            rx_frames_rejected: self.rx_frames_rejected.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            rx_errors: self.rx_errors.load(Ordering::Relaxed),
            tx_commands_total: self.tx_commands_total.load(Ordering::Relaxed),
            tx_commands_dropped: self.tx_commands_dropped.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（不可变，用于读取）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub rx_chunks_total: u64,
    pub rx_bytes_total: u64,
    pub rx_frames_parsed: u64,
    pub rx_frames_ignored: u64,
    pub rx_frames_rejected: u64,
    pub rx_timeouts: u64,
    pub rx_errors: u64,
    pub tx_commands_total: u64,
    pub tx_commands_dropped: u64,
    pub tx_errors: u64,
}

impl MetricsSnapshot {
    /// 遥测帧解析成功率（没有收到任何帧时返回 100%）
    pub fn parse_success_rate(&self) -> f64 {
        let total = self.rx_frames_parsed + self.rx_frames_rejected;
        if total == 0 {
            return 100.0;
        }
        (self.rx_frames_parsed as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_snapshot() {
        let metrics = DriverMetrics::new();
        metrics.rx_chunks_total.fetch_add(3, Ordering::Relaxed);
        metrics.tx_commands_dropped.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rx_chunks_total, 3);
        assert_eq!(snapshot.tx_commands_dropped, 1);
        assert_eq!(snapshot.rx_errors, 0);
    }

    #[test]
    fn test_parse_success_rate() {
        let snapshot = MetricsSnapshot {
            rx_frames_parsed: 3,
            rx_frames_rejected: 1,
            ..Default::default()
        };
        assert!((snapshot.parse_success_rate() - 75.0).abs() < 1e-9);
        assert_eq!(MetricsSnapshot::default().parse_success_rate(), 100.0);
    }
}
