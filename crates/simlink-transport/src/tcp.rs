//! TCP 传输实现
//!
//! 基于 `std::net::TcpStream`。分离时使用 `try_clone()` 复制 socket 句柄：
//! 两个句柄共享同一个连接，因此 TX 半连接的 `close()`（`shutdown(Both)`）
//! 会同时终止 RX 半连接上的阻塞读取。
//!
//! # 注意
//!
//! - **严禁在分离后使用 `set_nonblocking()`**：该标志在两个句柄间共享。
//!   超时一律通过 `SO_RCVTIMEO`（`set_read_timeout`）实现。
//! - 读超时在 Unix 上表现为 `WouldBlock`，在 Windows 上表现为 `TimedOut`，
//!   两者都映射为 `TransportError::Timeout`。

use crate::{RxAdapter, SplittableAdapter, TransportAdapter, TransportError, TxAdapter};
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// TCP 传输（完整双向连接）
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
    closed: bool,
}

impl TcpTransport {
    /// 连接到 `host:port`
    ///
    /// 依次尝试解析出的每个地址，返回第一个成功的连接。
    ///
    /// # 参数
    /// - `connect_timeout`: 单个地址的连接超时，`None` 使用系统默认
    ///
    /// # 错误
    /// - `TransportError::AddressResolution`: 地址解析失败或没有可用地址
    /// - `TransportError::Connect`: 所有地址均连接失败（携带最后一个错误）
    pub fn connect(
        host: &str,
        port: u16,
        connect_timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let target = format!("{}:{}", host, port);
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| TransportError::AddressResolution(format!("{}: {}", target, e)))?
            .collect();

        if addrs.is_empty() {
            return Err(TransportError::AddressResolution(format!(
                "{}: no addresses",
                target
            )));
        }

        let mut last_error = None;
        for addr in addrs {
            let result = match connect_timeout {
                Some(timeout) if !timeout.is_zero() => TcpStream::connect_timeout(&addr, timeout),
                _ => TcpStream::connect(addr),
            };
            match result {
                Ok(stream) => return Self::from_stream(stream),
                Err(e) => {
                    debug!("TCP connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                },
            }
        }

        Err(TransportError::Connect {
            addr: target,
            source: last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotConnected)),
        })
    }

    /// 从已建立的 `TcpStream` 构造
    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        let peer = stream.peer_addr()?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to enable TCP_NODELAY on {}: {}", peer, e);
        }
        Ok(Self {
            stream,
            peer,
            closed: false,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl TransportAdapter for TcpTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(self.stream.write(bytes)?)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        read_stream(&mut self.stream, buf)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        shutdown_stream(&self.stream, self.peer, &mut self.closed)
    }

    fn set_receive_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        apply_read_timeout(&self.stream, timeout)
    }
}

impl SplittableAdapter for TcpTransport {
    type RxAdapter = TcpRxAdapter;
    type TxAdapter = TcpTxAdapter;

    fn split(self) -> Result<(TcpRxAdapter, TcpTxAdapter), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        let rx_stream = self.stream.try_clone().map_err(|e| {
            TransportError::Io(io::Error::other(format!(
                "Failed to clone TCP stream for RX: {}",
                e
            )))
        })?;

        Ok((
            TcpRxAdapter { stream: rx_stream },
            TcpTxAdapter {
                stream: self.stream,
                peer: self.peer,
                closed: false,
            },
        ))
    }
}

/// TCP 只读半连接
pub struct TcpRxAdapter {
    stream: TcpStream,
}

impl RxAdapter for TcpRxAdapter {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        read_stream(&mut self.stream, buf)
    }

    fn set_receive_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        apply_read_timeout(&self.stream, timeout)
    }
}

/// TCP 只写半连接
pub struct TcpTxAdapter {
    stream: TcpStream,
    peer: SocketAddr,
    closed: bool,
}

impl TcpTxAdapter {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl TxAdapter for TcpTxAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(self.stream.write(bytes)?)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        shutdown_stream(&self.stream, self.peer, &mut self.closed)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

fn read_stream(stream: &mut TcpStream, buf: &mut [u8]) -> Result<usize, TransportError> {
    match stream.read(buf) {
        Ok(0) if !buf.is_empty() => Err(TransportError::EndOfStream),
        Ok(n) => Ok(n),
        Err(e) => Err(map_read_error(e)),
    }
}

fn map_read_error(e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {
            TransportError::Timeout
        },
        _ => TransportError::Io(e),
    }
}

fn apply_read_timeout(stream: &TcpStream, timeout: Option<Duration>) -> Result<(), TransportError> {
    // 零时长会被 set_read_timeout 拒绝，按永久阻塞处理
    let timeout = timeout.filter(|t| !t.is_zero());
    stream.set_read_timeout(timeout)?;
    Ok(())
}

fn shutdown_stream(
    stream: &TcpStream,
    peer: SocketAddr,
    closed: &mut bool,
) -> Result<(), TransportError> {
    if *closed {
        return Ok(());
    }
    *closed = true;

    match stream.shutdown(Shutdown::Both) {
        Ok(()) => {
            trace!("TCP connection to {} shut down", peer);
            Ok(())
        },
        // 对端已经断开
        Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
        Err(e) => Err(TransportError::Io(e)),
    }
}
