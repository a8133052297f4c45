//! 驱动层模块
//!
//! 本模块提供仿真链路客户端的核心功能，包括：
//! - 接收线程管理（阻塞读取 + 固定间隔轮询）
//! - 状态同步（ArcSwap 无锁读取传感器快照）
//! - 电机指令发送（best-effort，fire-and-forget）
//! - 生命周期控制（连接 / 断开，幂等且可重入保护）
//!
//! # 使用场景
//!
//! ```no_run
//! use simlink_driver::SimClient;
//!
//! let client = SimClient::connect("127.0.0.1", 50002)?;
//! client.send_motor_command(0.5, -0.25);
//! let sensors = client.read_latest_sensors();
//! println!("{} readings: {:?}", sensors.count(), sensors.values());
//! client.disconnect();
//! # Ok::<(), simlink_driver::DriverError>(())
//! ```

mod builder;
mod client;
pub mod config;
mod error;
pub mod heartbeat;
pub mod lifecycle;
pub mod metrics;
pub mod pipeline;
pub mod state;

pub use builder::SimClientBuilder;
pub use client::SimClient;
pub use config::{ClientConfig, ConfigError};
pub use error::DriverError;
pub use heartbeat::ConnectionMonitor;
pub use lifecycle::{AtomicLifecycle, ClientLifecycle};
pub use metrics::{DriverMetrics, MetricsSnapshot};
pub use pipeline::{PipelineConfig, process_chunk, rx_loop};
pub use state::{ClientContext, SensorState};

// 协议层常用类型
pub use simlink_protocol::{MotorCommand, SENSOR_CAPACITY, SensorSnapshot, TelemetryPolicy};
