//! 客户端配置
//!
//! 配置可以直接在代码里构造，也可以从 TOML 文件加载。
//! 所有字段都有默认值，TOML 中省略的字段取默认值。
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 50002
//! connect_timeout_ms = 3000
//! connection_timeout_ms = 1000
//!
//! [pipeline]
//! receive_buffer_size = 2048
//! poll_interval_ms = 50
//! receive_timeout_ms = 100
//! telemetry_policy = "lenient"
//! ```

use crate::pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 默认仿真端地址
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// 默认仿真端端口
pub const DEFAULT_PORT: u16 = 50002;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 仿真端主机名或 IP
    pub host: String,
    /// 仿真端端口
    pub port: u16,
    /// 建立 TCP 连接的超时（毫秒）；0 表示使用系统默认
    pub connect_timeout_ms: u64,
    /// 遥测新鲜度窗口（毫秒），超过此时间未收到遥测视为连接失活
    pub connection_timeout_ms: u64,
    /// 接收线程配置
    pub pipeline: PipelineConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: 3000,
            connection_timeout_ms: 1000,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ClientConfig {
    /// 从 TOML 字符串解析（并校验）
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载（并校验）
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".to_string()));
        }
        if self.connection_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "connection_timeout_ms must be non-zero".to_string(),
            ));
        }
        self.pipeline.validate()
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}
