//! Pipeline IO 循环模块
//!
//! 接收线程的主循环：阻塞读取一个数据块，按换行拆分为帧，逐帧解析，
//! 把数据块中最后一帧有效遥测发布到共享状态，然后睡眠一个轮询间隔。

use crate::config::ConfigError;
use crate::state::ClientContext;
use serde::{Deserialize, Serialize};
use simlink_protocol::{SensorSnapshot, TelemetryPolicy, parse_with_policy, split_frames};
use simlink_transport::{RxAdapter, TransportError};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 接收缓冲区最小容量（字节）
pub const MIN_RECEIVE_BUFFER_SIZE: usize = 2048;

/// Pipeline 配置
///
/// 控制接收线程的缓冲、节奏、读超时和解析策略。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// 单次读取的缓冲区大小（字节，至少 2048）
    pub receive_buffer_size: usize,
    /// 每次循环后的睡眠间隔（毫秒，默认 50ms，即约 20Hz）
    pub poll_interval_ms: u64,
    /// 读超时（毫秒，默认 100ms）；0 表示完全阻塞读取
    ///
    /// 读超时决定了 `disconnect` 的最坏等待时间。
    pub receive_timeout_ms: u64,
    /// 遥测解析策略
    pub telemetry_policy: TelemetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            receive_buffer_size: MIN_RECEIVE_BUFFER_SIZE,
            poll_interval_ms: 50,
            receive_timeout_ms: 100,
            telemetry_policy: TelemetryPolicy::Lenient,
        }
    }
}

impl PipelineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// 读超时；`None` 表示阻塞读取
    pub fn receive_timeout(&self) -> Option<Duration> {
        (self.receive_timeout_ms > 0).then(|| Duration::from_millis(self.receive_timeout_ms))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.receive_buffer_size < MIN_RECEIVE_BUFFER_SIZE {
            return Err(ConfigError::Invalid(format!(
                "receive_buffer_size must be at least {} bytes, got {}",
                MIN_RECEIVE_BUFFER_SIZE, self.receive_buffer_size
            )));
        }
        Ok(())
    }
}

/// 处理一次读取到的数据块
///
/// 逐帧解析并更新指标，返回数据块中最后一帧有效遥测（若有）。
/// 非遥测帧被忽略；严格模式下的畸形帧被丢弃并记录警告。
///
/// 数据块先按换行拆分再解析，而不是把整块当作一行：一次读取可能包含
/// 多帧，整块解析时 `"HELLO\nS:1\n"` 会因首行前缀不符而整体丢弃，
/// 逐帧解析则得到 `[1.0]`。跨两次读取的半帧不会被拼接。
pub fn process_chunk(
    chunk: &[u8],
    ctx: &ClientContext,
    policy: TelemetryPolicy,
) -> Option<SensorSnapshot> {
    let mut latest = None;

    for frame in split_frames(chunk) {
        match parse_with_policy(frame, policy) {
            Ok(Some(snapshot)) => {
                ctx.metrics.rx_frames_parsed.fetch_add(1, Ordering::Relaxed);
                latest = Some(snapshot);
            },
            Ok(None) => {
                ctx.metrics.rx_frames_ignored.fetch_add(1, Ordering::Relaxed);
                trace!("Ignoring non-telemetry frame: {:?}", String::from_utf8_lossy(frame));
            },
            Err(e) => {
                ctx.metrics.rx_frames_rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping malformed telemetry frame: {}", e);
            },
        }
    }

    latest
}

/// RX 线程主循环
///
/// 每轮循环先检查运行标志，再阻塞读取。读超时是正常情况；
/// 对端关闭或 IO 错误会清除运行标志并退出。
/// 循环从不关闭连接，连接由控制句柄在 join 之后关闭。
///
/// # 参数
/// - `rx`: RX 适配器（只读）
/// - `ctx`: 共享状态上下文
/// - `config`: Pipeline 配置
pub fn rx_loop(mut rx: impl RxAdapter, ctx: Arc<ClientContext>, config: PipelineConfig) {
    // 设置线程优先级（可选 feature）
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("RX thread priority set to MAX (realtime)");
            },
            Err(e) => {
                warn!(
                    "Failed to set RX thread priority: {}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                );
            },
        }
    }

    let mut buf = vec![0u8; config.receive_buffer_size.max(MIN_RECEIVE_BUFFER_SIZE)];
    let poll_interval = config.poll_interval();

    loop {
        if !ctx.is_running() {
            trace!("RX thread: running flag is false, exiting");
            break;
        }

        match rx.receive(&mut buf) {
            Ok(n) => {
                ctx.metrics.rx_chunks_total.fetch_add(1, Ordering::Relaxed);
                ctx.metrics.rx_bytes_total.fetch_add(n as u64, Ordering::Relaxed);

                if let Some(snapshot) = process_chunk(&buf[..n], &ctx, config.telemetry_policy) {
                    ctx.publish(snapshot);
                }
            },
            Err(TransportError::Timeout) => {
                ctx.metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
            },
            Err(TransportError::EndOfStream) => {
                ctx.metrics.rx_errors.fetch_add(1, Ordering::Relaxed);
                info!("Simulator closed the connection, stopping RX thread");
                ctx.request_stop();
                break;
            },
            Err(e) => {
                ctx.metrics.rx_errors.fetch_add(1, Ordering::Relaxed);
                error!("RX thread: fatal transport error: {}", e);
                ctx.request_stop();
                break;
            },
        }

        // 阻塞读取期间可能已经收到停止请求
        if !ctx.is_running() {
            trace!("RX thread: stop requested during receive, exiting");
            break;
        }

        if !poll_interval.is_zero() {
            spin_sleep::sleep(poll_interval);
        }
    }

    debug!("RX thread exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlink_transport::{SplittableAdapter, mock};
    use std::thread;

    fn context() -> Arc<ClientContext> {
        Arc::new(ClientContext::new(Duration::from_secs(1)))
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            poll_interval_ms: 1,
            receive_timeout_ms: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.receive_buffer_size, 2048);
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.receive_timeout(), Some(Duration::from_millis(100)));
        assert_eq!(config.telemetry_policy, TelemetryPolicy::Lenient);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_config_validation() {
        let config = PipelineConfig {
            receive_buffer_size: 1024,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let blocking = PipelineConfig {
            receive_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(blocking.receive_timeout(), None);
    }

    #[test]
    fn test_process_chunk_keeps_last_frame() {
        let ctx = context();
        let snapshot = process_chunk(b"S:1,2\nS:3,4,5\n", &ctx, TelemetryPolicy::Lenient).unwrap();
        assert_eq!(snapshot.values(), &[3.0, 4.0, 5.0]);
        assert_eq!(ctx.metrics.snapshot().rx_frames_parsed, 2);
    }

    #[test]
    fn test_process_chunk_ignores_unknown_frames() {
        let ctx = context();
        assert!(process_chunk(b"HELLO\nL:1.00;R:1.00\n", &ctx, TelemetryPolicy::Lenient).is_none());
        assert_eq!(ctx.metrics.snapshot().rx_frames_ignored, 2);

        let snapshot = process_chunk(b"S:7\nHELLO\n", &ctx, TelemetryPolicy::Lenient).unwrap();
        assert_eq!(snapshot.values(), &[7.0]);
    }

    #[test]
    fn test_process_chunk_telemetry_after_unknown_line() {
        let ctx = context();
        let snapshot = process_chunk(b"HELLO\nS:1\n", &ctx, TelemetryPolicy::Lenient).unwrap();
        assert_eq!(snapshot.values(), &[1.0]);
        assert_eq!(ctx.metrics.snapshot().rx_frames_ignored, 1);
    }

    #[test]
    fn test_process_chunk_strict_rejects_malformed() {
        let ctx = context();
        let snapshot = process_chunk(b"S:1,2\nS:1,oops\n", &ctx, TelemetryPolicy::Strict).unwrap();
        assert_eq!(snapshot.values(), &[1.0, 2.0]);

        let metrics = ctx.metrics.snapshot();
        assert_eq!(metrics.rx_frames_parsed, 1);
        assert_eq!(metrics.rx_frames_rejected, 1);
    }

    #[test]
    fn test_process_chunk_lenient_substitutes_zero() {
        let ctx = context();
        let snapshot = process_chunk(b"S:1.5,abc,2.5\n", &ctx, TelemetryPolicy::Lenient).unwrap();
        assert_eq!(snapshot.values(), &[1.5, 0.0, 2.5]);
    }

    #[test]
    fn test_rx_loop_publishes_and_stops_on_request() {
        let (transport, peer) = mock::pair();
        let (mut rx, _tx) = transport.split().unwrap();
        rx.set_receive_timeout(Some(Duration::from_millis(10))).unwrap();

        let ctx = context();
        let handle = {
            let ctx = ctx.clone();
            thread::spawn(move || rx_loop(rx, ctx, fast_config()))
        };

        peer.push_telemetry(&[0.5, 1.5]);
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !ctx.sensor_state().has_telemetry() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(ctx.latest().values(), &[0.5, 1.5]);

        ctx.request_stop();
        handle.join().unwrap();
        assert_eq!(ctx.metrics.snapshot().rx_errors, 0);
    }

    #[test]
    fn test_rx_loop_exits_on_end_of_stream() {
        let (transport, mut peer) = mock::pair();
        let (rx, _tx) = transport.split().unwrap();

        let ctx = context();
        peer.push_telemetry(&[9.0]);
        peer.hang_up();

        rx_loop(rx, ctx.clone(), fast_config());

        assert!(!ctx.is_running());
        assert_eq!(ctx.latest().values(), &[9.0]);
        assert_eq!(ctx.metrics.snapshot().rx_errors, 1);
    }

    #[test]
    fn test_rx_loop_exits_on_io_error() {
        let (transport, peer) = mock::pair();
        let (rx, _tx) = transport.split().unwrap();

        let ctx = context();
        peer.inject_error(std::io::ErrorKind::ConnectionReset);

        rx_loop(rx, ctx.clone(), fast_config());

        assert!(!ctx.is_running());
        assert!(!ctx.sensor_state().has_telemetry());
    }
}
