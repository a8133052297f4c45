//! 驱动层错误类型定义

use crate::config::ConfigError;
use simlink_transport::TransportError;
use thiserror::Error;

/// 驱动层错误类型
///
/// 调用方唯一可见的失败是连接阶段的错误（`Connect` / `Config`）；
/// 运行期间的传输错误只会终止接收线程，不会传播给读取方。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 连接仿真端失败
    #[error("Failed to connect to simulator at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: TransportError,
    },

    /// 未连接（或已断开）
    #[error("Not connected")]
    NotConnected,

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
