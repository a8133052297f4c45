//! 共享状态
//!
//! 接收线程是唯一的写者：每解析出一帧遥测，就构造一个新的 [`SensorState`]
//! 并通过 `ArcSwap::store` 整体替换。读取方通过 `load` 拿到完整快照，
//! 永远不会看到新旧数据混合的中间状态。

use crate::heartbeat::ConnectionMonitor;
use crate::metrics::DriverMetrics;
use arc_swap::ArcSwap;
use simlink_protocol::SensorSnapshot;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 最新的传感器状态（带发布元数据）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorState {
    /// 传感器读数
    pub snapshot: SensorSnapshot,
    /// 发布时的系统时间（微秒，UNIX 纪元）；尚未收到遥测时为 0
    pub system_timestamp_us: u64,
    /// 发布序号（从 1 开始单调递增）；0 表示尚未收到遥测
    pub sequence: u64,
}

impl SensorState {
    /// 是否已经收到过遥测
    pub fn has_telemetry(&self) -> bool {
        self.sequence > 0
    }
}

/// 客户端共享上下文
///
/// 由控制句柄和接收线程通过 `Arc` 共同持有。
pub struct ClientContext {
    /// 最新传感器状态（无锁读取）
    pub sensors: ArcSwap<SensorState>,
    /// 接收线程运行标志
    pub running: AtomicBool,
    /// 遥测新鲜度
    pub connection_monitor: ConnectionMonitor,
    /// 收发指标
    pub metrics: DriverMetrics,
}

impl ClientContext {
    /// 创建上下文，初始为运行状态，快照为空
    pub fn new(connection_timeout: Duration) -> Self {
        Self {
            sensors: ArcSwap::from_pointee(SensorState::default()),
            running: AtomicBool::new(true),
            connection_monitor: ConnectionMonitor::new(connection_timeout),
            metrics: DriverMetrics::new(),
        }
    }

    /// 接收线程是否应当继续运行
    pub fn is_running(&self) -> bool {
        // Acquire: 看到 false 时必须同时看到停止前的所有写入
        self.running.load(Ordering::Acquire)
    }

    /// 请求接收线程停止
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// 发布一帧新的传感器快照
    ///
    /// 只能由接收线程调用（单写者）。
    pub fn publish(&self, snapshot: SensorSnapshot) {
        let sequence = self.sensors.load().sequence + 1;
        self.sensors.store(Arc::new(SensorState {
            snapshot,
            system_timestamp_us: system_time_us(),
            sequence,
        }));
        self.connection_monitor.register_telemetry();
    }

    /// 最新传感器读数（副本）
    pub fn latest(&self) -> SensorSnapshot {
        self.sensors.load().snapshot
    }

    /// 最新传感器状态（副本，含时间戳和序号）
    pub fn sensor_state(&self) -> SensorState {
        **self.sensors.load()
    }
}

fn system_time_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
