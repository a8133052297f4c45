//! # Simlink Protocol
//!
//! 仿真链路文本协议定义（无 IO 依赖）
//!
//! ## 模块
//!
//! - `telemetry`: 传感器遥测帧解析（`S:<v1>,<v2>,...\n`）
//! - `command`: 电机指令编码（`L:<left>;R:<right>\n`）
//!
//! ## 帧格式
//!
//! 协议以换行符分隔，每行是一个逻辑帧（ASCII/UTF-8 文本）：
//!
//! ```text
//! Client -> Server:  L:0.50;R:-0.25\n
//! Server -> Client:  S:0.125,0.0,1.0,0.5\n
//! ```
//!
//! 未知前缀的帧会被静默忽略（向前兼容）。

pub mod command;
pub mod telemetry;

// 重新导出常用类型
pub use command::MotorCommand;
pub use telemetry::{
    SENSOR_CAPACITY, SensorSnapshot, TelemetryPolicy, parse_telemetry, parse_telemetry_strict,
    parse_with_policy, split_frames,
};

use thiserror::Error;

/// 遥测帧前缀
pub const TELEMETRY_PREFIX: &[u8] = b"S:";

/// 帧分隔符
pub const FRAME_DELIMITER: u8 = b'\n';

/// 协议解析错误
///
/// 默认的宽松解析（[`parse_telemetry`]）永远不会产生错误；
/// 只有严格模式和指令解码会返回此类型。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Unknown frame prefix: {0:?}")]
    UnknownPrefix(String),

    #[error("Malformed telemetry token #{index}: {token:?}")]
    MalformedToken { index: usize, token: String },

    #[error("Too many telemetry values: {count} (capacity {SENSOR_CAPACITY})")]
    TooManyValues { count: usize },

    #[error("Malformed motor command: {0:?}")]
    MalformedCommand(String),
}
