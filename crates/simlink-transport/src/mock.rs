//! Mock 传输（内存管道）
//!
//! 用于在没有仿真端的情况下测试接收循环和生命周期。
//! [`MockTransport`] 是客户端一侧，[`MockPeer`] 扮演仿真端：
//! 推送遥测数据、注入错误、挂断连接、检查客户端发出的指令。

use crate::{RxAdapter, SplittableAdapter, TransportAdapter, TransportError, TxAdapter};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

enum MockEvent {
    Data(Vec<u8>),
    Error(io::ErrorKind),
}

/// 创建一对相连的 mock 端点
///
/// # 示例
///
/// ```rust
/// use simlink_transport::{TransportAdapter, mock};
///
/// let (mut transport, peer) = mock::pair();
/// peer.push(b"S:1,2\n");
///
/// let mut buf = [0u8; 64];
/// let n = transport.receive(&mut buf).unwrap();
/// assert_eq!(&buf[..n], b"S:1,2\n");
/// ```
pub fn pair() -> (MockTransport, MockPeer) {
    let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded();
    let (outbound_tx, outbound_rx) = crossbeam_channel::unbounded();
    let closed = Arc::new(AtomicBool::new(false));

    (
        MockTransport {
            rx: MockRxAdapter {
                inbound: inbound_rx,
                pending: Vec::new(),
                timeout: None,
                closed: closed.clone(),
            },
            tx: MockTxAdapter {
                outbound: outbound_tx,
                closed: closed.clone(),
            },
        },
        MockPeer {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
            closed,
        },
    )
}

/// 客户端一侧的 mock 传输
pub struct MockTransport {
    rx: MockRxAdapter,
    tx: MockTxAdapter,
}

impl TransportAdapter for MockTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        self.tx.send(bytes)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.rx.receive(buf)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.tx.close()
    }

    fn set_receive_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.rx.set_receive_timeout(timeout)
    }
}

impl SplittableAdapter for MockTransport {
    type RxAdapter = MockRxAdapter;
    type TxAdapter = MockTxAdapter;

    fn split(self) -> Result<(MockRxAdapter, MockTxAdapter), TransportError> {
        Ok((self.rx, self.tx))
    }
}

/// Mock 只读半连接
pub struct MockRxAdapter {
    inbound: Receiver<MockEvent>,
    /// 上一次读取未能放进缓冲区的剩余字节
    pending: Vec<u8>,
    timeout: Option<Duration>,
    closed: Arc<AtomicBool>,
}

impl MockRxAdapter {
    fn fill(&mut self, buf: &mut [u8], data: Vec<u8>) -> usize {
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        self.pending = data[n..].to_vec();
        n
    }
}

impl RxAdapter for MockRxAdapter {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        if !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            return Ok(self.fill(buf, pending));
        }

        let event = match self.timeout {
            Some(timeout) => self.inbound.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => TransportError::Timeout,
                RecvTimeoutError::Disconnected => TransportError::EndOfStream,
            })?,
            None => self.inbound.recv().map_err(|_| TransportError::EndOfStream)?,
        };

        match event {
            MockEvent::Data(data) if data.is_empty() => Err(TransportError::EndOfStream),
            MockEvent::Data(data) => Ok(self.fill(buf, data)),
            MockEvent::Error(kind) => Err(TransportError::Io(io::Error::from(kind))),
        }
    }

    fn set_receive_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.timeout = timeout.filter(|t| !t.is_zero());
        Ok(())
    }
}

/// Mock 只写半连接
pub struct MockTxAdapter {
    outbound: Sender<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl TxAdapter for MockTxAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(bytes.to_vec())
            .map_err(|_| TransportError::Io(io::Error::from(io::ErrorKind::BrokenPipe)))?;
        Ok(bytes.len())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// 仿真端（测试控制句柄）
pub struct MockPeer {
    inbound: Option<Sender<MockEvent>>,
    outbound: Receiver<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl MockPeer {
    /// 推送一段原始字节（一次 `receive` 读取到的数据块）
    pub fn push(&self, bytes: &[u8]) {
        self.send_event(MockEvent::Data(bytes.to_vec()));
    }

    /// 推送一帧遥测：`S:<v1>,<v2>,...\n`
    pub fn push_telemetry(&self, values: &[f32]) {
        let body: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.push(format!("S:{}\n", body.join(",")).as_bytes());
    }

    /// 让下一次接收返回 IO 错误
    pub fn inject_error(&self, kind: io::ErrorKind) {
        self.send_event(MockEvent::Error(kind));
    }

    /// 挂断：客户端在读完已推送的数据后收到 `EndOfStream`
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }

    /// 客户端是否已关闭连接
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 取出客户端已发送的全部数据
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.outbound.try_iter().collect()
    }

    /// 取出客户端已发送的数据（按行拼接为字符串）
    pub fn sent_text(&self) -> String {
        self.sent().into_iter().map(|b| String::from_utf8_lossy(&b).into_owned()).collect()
    }

    /// 等待客户端发送下一段数据
    pub fn recv_sent(&self, timeout: Duration) -> Option<Vec<u8>> {
        self.outbound.recv_timeout(timeout).ok()
    }

    fn send_event(&self, event: MockEvent) {
        if let Some(inbound) = &self.inbound {
            // 客户端已经丢弃 RX 时忽略
            let _ = inbound.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_receive() {
        let (mut transport, peer) = pair();
        peer.push_telemetry(&[1.0, 2.5]);

        let mut buf = [0u8; 64];
        let n = transport.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"S:1,2.5\n");
    }

    #[test]
    fn test_small_buffer_keeps_remainder() {
        let (mut transport, peer) = pair();
        peer.push(b"S:1,2,3\n");

        let mut buf = [0u8; 4];
        let n = transport.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"S:1,");
        let n = transport.receive(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"2,3\n");
    }

    #[test]
    fn test_timeout_and_hang_up() {
        let (mut transport, mut peer) = pair();
        transport.set_receive_timeout(Some(Duration::from_millis(10))).unwrap();

        let mut buf = [0u8; 16];
        assert!(matches!(
            transport.receive(&mut buf),
            Err(TransportError::Timeout)
        ));

        peer.hang_up();
        assert!(matches!(
            transport.receive(&mut buf),
            Err(TransportError::EndOfStream)
        ));
    }

    #[test]
    fn test_injected_error() {
        let (mut transport, peer) = pair();
        peer.inject_error(io::ErrorKind::ConnectionReset);

        let mut buf = [0u8; 16];
        match transport.receive(&mut buf) {
            Err(TransportError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("Expected Io error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_send_and_close() {
        let (transport, peer) = pair();
        let (_rx, mut tx) = transport.split().unwrap();

        tx.send_all(b"L:1.00;R:1.00\n").unwrap();
        assert_eq!(peer.sent_text(), "L:1.00;R:1.00\n");

        tx.close().unwrap();
        tx.close().unwrap();
        assert!(peer.is_closed());
        assert!(matches!(tx.send(b"x"), Err(TransportError::Closed)));
    }
}
