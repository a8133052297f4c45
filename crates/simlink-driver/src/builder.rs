//! Builder 模式实现
//!
//! 提供链式构造 `SimClient` 实例的便捷方式。

use crate::client::SimClient;
use crate::config::ClientConfig;
use crate::error::DriverError;
use crate::pipeline::PipelineConfig;
use simlink_protocol::TelemetryPolicy;
use simlink_transport::{SubsystemGuard, TcpTransport};
use std::time::Duration;
use tracing::info;

/// 将时长换算为毫秒，非零时长至少为 1ms
///
/// 配置中 0 有特殊含义（阻塞读取、不睡眠、系统默认连接超时），
/// 亚毫秒的非零时长不能被截断成 0。
fn duration_to_ms(duration: Duration) -> u64 {
    if duration.is_zero() {
        0
    } else {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
    }
}

/// SimClient Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use simlink_driver::{PipelineConfig, SimClientBuilder, TelemetryPolicy};
/// use std::time::Duration;
///
/// // 使用默认配置（127.0.0.1:50002）
/// let client = SimClientBuilder::new().build().unwrap();
///
/// // 自定义地址和 Pipeline 配置
/// let client = SimClientBuilder::new()
///     .host("192.168.1.20")
///     .port(19997)
///     .connect_timeout(Duration::from_secs(1))
///     .telemetry_policy(TelemetryPolicy::Strict)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimClientBuilder {
    config: ClientConfig,
}

impl SimClientBuilder {
    /// 创建新的 Builder（默认配置）
    pub fn new() -> Self {
        Self::default()
    }

    /// 从完整配置创建（例如从 TOML 文件加载的配置）
    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// 设置仿真端主机名或 IP
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// 设置仿真端端口
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// 设置 TCP 连接超时
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = duration_to_ms(timeout);
        self
    }

    /// 设置遥测新鲜度窗口
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout_ms = duration_to_ms(timeout);
        self
    }

    /// 设置 Pipeline 配置
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.config.pipeline = config;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.pipeline.poll_interval_ms = duration_to_ms(interval);
        self
    }

    /// 设置读超时（`None` 表示阻塞读取）
    pub fn receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.pipeline.receive_timeout_ms = timeout.map_or(0, duration_to_ms);
        self
    }

    pub fn telemetry_policy(mut self, policy: TelemetryPolicy) -> Self {
        self.config.pipeline.telemetry_policy = policy;
        self
    }

    /// 当前配置
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 连接仿真端并启动接收线程
    ///
    /// 连接失败时不会创建任何线程，传输子系统也会被释放。
    ///
    /// # 错误
    /// - `DriverError::Config`: 配置无效
    /// - `DriverError::Connect`: 地址解析失败、连接被拒绝或连接超时
    pub fn build(self) -> Result<SimClient, DriverError> {
        self.config.validate()?;

        let subsystem = SubsystemGuard::acquire()?;

        let address = self.config.address();
        let transport = TcpTransport::connect(
            &self.config.host,
            self.config.port,
            self.config.connect_timeout(),
        )
        .map_err(|source| DriverError::Connect {
            addr: address.clone(),
            source,
        })?;

        let peer = transport.peer_addr().to_string();
        info!("Connected to simulator at {} ({})", address, peer);

        let connection_timeout = self.config.connection_timeout();
        SimClient::start(
            transport,
            self.config.pipeline,
            connection_timeout,
            subsystem,
            peer,
        )
    }
}
