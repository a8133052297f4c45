//! 仿真链路客户端
//!
//! [`SimClient`] 持有一个连接、一个后台接收线程和最新传感器快照。
//! 调用方线程负责发送电机指令和读取快照；接收线程负责读取与解析遥测。

use crate::error::DriverError;
use crate::lifecycle::{AtomicLifecycle, ClientLifecycle};
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{PipelineConfig, rx_loop};
use crate::state::{ClientContext, SensorState};
use parking_lot::Mutex;
use simlink_protocol::{MotorCommand, SensorSnapshot};
use simlink_transport::{RxAdapter, SplittableAdapter, SubsystemGuard, TxAdapter};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// 连接期间持有、断开时释放的资源
struct Session {
    rx_thread: Option<JoinHandle<()>>,
    subsystem: Option<SubsystemGuard>,
}

/// 仿真链路客户端（控制句柄）
///
/// 所有方法都只需要 `&self`，可以包在 `Arc` 里跨线程共享。
/// 句柄被 drop 时自动执行 [`disconnect`](Self::disconnect)。
pub struct SimClient {
    ctx: Arc<ClientContext>,
    /// 发送半连接；断开后为 `None`
    tx: Mutex<Option<Box<dyn TxAdapter + Send>>>,
    /// 串行化 `disconnect`
    session: Mutex<Session>,
    lifecycle: AtomicLifecycle,
    config: PipelineConfig,
    peer: String,
}

impl SimClient {
    /// 连接仿真端并启动接收线程（使用默认配置）
    ///
    /// # 错误
    /// - `DriverError::Connect`: 地址解析失败或连接被拒绝
    pub fn connect(host: &str, port: u16) -> Result<Self, DriverError> {
        crate::builder::SimClientBuilder::new().host(host).port(port).build()
    }

    /// 使用已建立的传输创建客户端
    ///
    /// 传输被拆分为 RX / TX 两半：RX 交给接收线程，TX 留在句柄里用于发送指令。
    ///
    /// # 参数
    /// - `transport`: 已连接的传输
    /// - `config`: Pipeline 配置
    /// - `connection_timeout`: 遥测新鲜度窗口，见 [`is_connected`](Self::is_connected)
    pub fn from_transport<T>(
        transport: T,
        config: PipelineConfig,
        connection_timeout: Duration,
    ) -> Result<Self, DriverError>
    where
        T: SplittableAdapter + Send + 'static,
        T::RxAdapter: Send + 'static,
        T::TxAdapter: Send + 'static,
    {
        let subsystem = SubsystemGuard::acquire()?;
        Self::start(
            transport,
            config,
            connection_timeout,
            subsystem,
            "custom transport".to_string(),
        )
    }

    pub(crate) fn start<T>(
        transport: T,
        config: PipelineConfig,
        connection_timeout: Duration,
        subsystem: SubsystemGuard,
        peer: String,
    ) -> Result<Self, DriverError>
    where
        T: SplittableAdapter + Send + 'static,
        T::RxAdapter: Send + 'static,
        T::TxAdapter: Send + 'static,
    {
        config.validate()?;

        // 分离适配器
        let (mut rx_adapter, tx_adapter) = transport.split()?;
        rx_adapter.set_receive_timeout(config.receive_timeout())?;

        let ctx = Arc::new(ClientContext::new(connection_timeout));

        let ctx_clone = ctx.clone();
        let config_clone = config.clone();
        let rx_thread = std::thread::Builder::new()
            .name("simlink-rx".to_string())
            .spawn(move || rx_loop(rx_adapter, ctx_clone, config_clone))
            .map_err(|e| DriverError::IoThread(e.to_string()))?;

        debug!("RX thread started for {}", peer);

        Ok(Self {
            ctx,
            tx: Mutex::new(Some(Box::new(tx_adapter))),
            session: Mutex::new(Session {
                rx_thread: Some(rx_thread),
                subsystem: Some(subsystem),
            }),
            lifecycle: AtomicLifecycle::new(ClientLifecycle::Running),
            config,
            peer,
        })
    }

    /// 发送电机指令（fire-and-forget）
    ///
    /// 编码为 `L:<left>;R:<right>\n`（两位小数）。未连接时为空操作，
    /// 发送失败只记录日志和指标，不会返回错误。
    pub fn send_motor_command(&self, left: f32, right: f32) {
        match self.try_send_motor_command(left, right) {
            Ok(()) => {},
            Err(DriverError::NotConnected) => {
                trace!("Motor command dropped: not connected");
            },
            Err(e) => {
                warn!("Failed to send motor command: {}", e);
            },
        }
    }

    /// 发送电机指令，返回发送结果
    ///
    /// # 错误
    /// - `DriverError::NotConnected`: 已断开
    /// - `DriverError::Transport`: 写入失败
    pub fn try_send_motor_command(&self, left: f32, right: f32) -> Result<(), DriverError> {
        self.send_command(MotorCommand::new(left, right))
    }

    /// 发送一条已构造的电机指令
    pub fn send_command(&self, command: MotorCommand) -> Result<(), DriverError> {
        let line = command.encode();
        let mut tx = self.tx.lock();

        let Some(adapter) = tx.as_mut().filter(|adapter| !adapter.is_closed()) else {
            self.ctx.metrics.tx_commands_dropped.fetch_add(1, Ordering::Relaxed);
            return Err(DriverError::NotConnected);
        };

        match adapter.send_all(line.as_bytes()) {
            Ok(()) => {
                self.ctx.metrics.tx_commands_total.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(e) => {
                self.ctx.metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
                Err(e.into())
            },
        }
    }

    /// 读取最新传感器快照（无锁，返回副本）
    ///
    /// 尚未收到遥测时返回空快照（count = 0）；断开后返回最后一次收到的快照。
    pub fn read_latest_sensors(&self) -> SensorSnapshot {
        self.ctx.latest()
    }

    /// 读取最新传感器状态（含系统时间戳和发布序号）
    pub fn sensor_state(&self) -> SensorState {
        self.ctx.sensor_state()
    }

    /// 等待接收到第一帧遥测
    ///
    /// # 错误
    /// - `DriverError::Timeout`: 超时未收到遥测
    /// - `DriverError::NotConnected`: 接收线程已经停止
    pub fn wait_for_telemetry(&self, timeout: Duration) -> Result<SensorSnapshot, DriverError> {
        let start = Instant::now();

        loop {
            let state = self.ctx.sensor_state();
            if state.has_telemetry() {
                return Ok(state.snapshot);
            }

            if !self.ctx.is_running() {
                return Err(DriverError::NotConnected);
            }

            if start.elapsed() >= timeout {
                return Err(DriverError::Timeout);
            }

            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// 断开连接
    ///
    /// 通知接收线程退出并等待其结束，然后关闭连接、释放传输子系统。
    /// 返回时接收线程已经终止。重复调用和并发调用都是安全的，
    /// 只有第一次调用会执行停止流程。
    ///
    /// 最坏等待时间约为一个读超时加一个轮询间隔；
    /// 配置为阻塞读取（`receive_timeout_ms = 0`）时需要等到对端发送数据或关闭连接。
    pub fn disconnect(&self) {
        let mut session = self.session.lock();

        if !self
            .lifecycle
            .transition(ClientLifecycle::Running, ClientLifecycle::Stopping)
        {
            trace!("disconnect() called while {}, ignoring", self.lifecycle.get());
            return;
        }

        info!("Disconnecting from {}", self.peer);

        // Release: 接收线程看到 false 时必须看到之前的所有写入
        self.ctx.request_stop();

        if let Some(handle) = session.rx_thread.take()
            && handle.join().is_err()
        {
            error!("RX thread panicked");
        }

        // 接收线程已退出，现在可以安全关闭连接
        if let Some(mut adapter) = self.tx.lock().take()
            && let Err(e) = adapter.close()
        {
            warn!("Failed to close connection to {}: {}", self.peer, e);
        }

        drop(session.subsystem.take());
        self.lifecycle.set(ClientLifecycle::Disconnected);

        info!("Disconnected from {}", self.peer);
    }

    /// 当前生命周期状态
    pub fn lifecycle(&self) -> ClientLifecycle {
        self.lifecycle.get()
    }

    /// 接收线程是否仍在运行（未断开，且未因对端关闭或 IO 错误而停止）
    pub fn is_running(&self) -> bool {
        self.lifecycle.get().is_running() && self.ctx.is_running()
    }

    /// 接收线程是否存活
    ///
    /// 正在断开（另一线程持有 session 锁）时返回 `false`。
    pub fn is_healthy(&self) -> bool {
        self.session
            .try_lock()
            .is_some_and(|session| session.rx_thread.as_ref().is_some_and(|h| !h.is_finished()))
    }

    /// 是否在连接超时窗口内收到过遥测
    pub fn is_connected(&self) -> bool {
        self.is_running() && self.ctx.connection_monitor.check_connection()
    }

    /// 距离上一帧遥测（或连接建立）的时间
    pub fn time_since_last_telemetry(&self) -> Duration {
        self.ctx.connection_monitor.time_since_last_telemetry()
    }

    /// 获取性能指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// Pipeline 配置
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 对端描述（TCP 连接为 `ip:port`）
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Drop for SimClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for SimClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimClient")
            .field("peer", &self.peer)
            .field("lifecycle", &self.lifecycle.get())
            .field("sequence", &self.ctx.sensor_state().sequence)
            .finish()
    }
}
