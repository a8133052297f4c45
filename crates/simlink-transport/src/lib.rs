//! # Simlink Transport Layer
//!
//! 传输层抽象：对双向字节流连接的统一封装。
//!
//! - `TransportAdapter`: 完整的双向传输（发送 / 接收 / 关闭）
//! - `SplittableAdapter`: 可分离为独立的 RX / TX 半连接，供双线程使用
//! - `tcp`: 基于 `std::net::TcpStream` 的实现
//! - `mock`: 内存管道实现（`mock` feature，用于测试）
//! - `subsystem`: 进程级传输子系统的 init / teardown 配对

use std::time::Duration;
use thiserror::Error;

pub mod subsystem;
pub mod tcp;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use subsystem::SubsystemGuard;
pub use tcp::{TcpRxAdapter, TcpTransport, TcpTxAdapter};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockPeer, MockRxAdapter, MockTransport, MockTxAdapter};

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },
    #[error("Address resolution failed: {0}")]
    AddressResolution(String),
    #[error("End of stream")]
    EndOfStream,
    #[error("Read timeout")]
    Timeout,
    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    /// 是否为致命错误（接收循环应当退出）
    ///
    /// 只有读超时是可恢复的。
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TransportError::Timeout)
    }
}

/// 双向字节流传输
pub trait TransportAdapter {
    /// 发送字节，返回实际写入的字节数
    fn send(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;

    /// 阻塞接收，返回读取的字节数（> 0）
    ///
    /// 对端关闭时返回 `TransportError::EndOfStream`，
    /// 设置了接收超时且超时时返回 `TransportError::Timeout`。
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// 关闭连接（幂等，重复调用安全）
    fn close(&mut self) -> Result<(), TransportError>;

    /// 设置接收超时（`None` 表示永久阻塞）
    fn set_receive_timeout(&mut self, _timeout: Option<Duration>) -> Result<(), TransportError> {
        Ok(())
    }

    /// 写入全部字节
    fn send_all(&mut self, mut bytes: &[u8]) -> Result<(), TransportError> {
        while !bytes.is_empty() {
            let written = self.send(bytes)?;
            if written == 0 {
                return Err(TransportError::Closed);
            }
            bytes = &bytes[written..];
        }
        Ok(())
    }
}

/// 只读半连接（由接收线程独占，不负责关闭连接）
pub trait RxAdapter {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    fn set_receive_timeout(&mut self, _timeout: Option<Duration>) -> Result<(), TransportError> {
        Ok(())
    }
}

/// 只写半连接（由生命周期控制器持有，负责关闭整个连接）
pub trait TxAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;

    /// 关闭整个连接（幂等）
    fn close(&mut self) -> Result<(), TransportError>;

    fn is_closed(&self) -> bool;

    fn send_all(&mut self, mut bytes: &[u8]) -> Result<(), TransportError> {
        while !bytes.is_empty() {
            let written = self.send(bytes)?;
            if written == 0 {
                return Err(TransportError::Closed);
            }
            bytes = &bytes[written..];
        }
        Ok(())
    }
}

/// 可分离的传输
pub trait SplittableAdapter: TransportAdapter {
    type RxAdapter: RxAdapter;
    type TxAdapter: TxAdapter;

    /// 分离为 RX / TX 半连接（消费原传输）
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), TransportError>;
}
