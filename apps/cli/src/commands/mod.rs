//! 命令定义和实现

pub mod config;
pub mod drive;
pub mod monitor;

pub use config::ConfigCommand;
pub use drive::DriveCommand;
pub use monitor::MonitorCommand;

use anyhow::{Context, Result};
use clap::Args;
use simlink_driver::{ClientConfig, SimClient, SimClientBuilder};
use std::path::PathBuf;
use std::time::Duration;

/// 连接参数（所有子命令共享）
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// TOML 配置文件
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 仿真端主机（覆盖配置文件）
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// 仿真端端口（覆盖配置文件）
    #[arg(short, long, global = true)]
    pub port: Option<u16>,
}

impl ConnectionArgs {
    /// 合并配置：默认值 < 配置文件 < 命令行参数
    pub fn resolve(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)
                .with_context(|| format!("加载配置文件失败: {}", path.display()))?,
            None => ClientConfig::default(),
        };

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }

        config.validate().context("配置无效")?;
        Ok(config)
    }
}

/// 连接仿真端并等待第一帧遥测（超时只警告，不失败）
pub fn connect(config: &ClientConfig, wait: Duration) -> Result<SimClient> {
    println!("⏳ 连接到仿真端 {}...", config.address());
    let client = SimClientBuilder::from_config(config.clone())
        .build()
        .with_context(|| format!("无法连接到 {}", config.address()))?;
    println!("✅ 已连接 ({})", client.peer());

    if !wait.is_zero() && client.wait_for_telemetry(wait).is_err() {
        tracing::warn!("No telemetry received within {:?}", wait);
    }
    Ok(client)
}
