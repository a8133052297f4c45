//! 电机驱动命令
//!
//! 按固定频率重复发送同一条电机指令，结束（或 Ctrl+C）时发送停止指令。

use crate::signal::Shutdown;
use crate::validation::{DEFAULT_SPEED_LIMIT, interval_for_rate, validate_speed};
use anyhow::{Context, Result};
use clap::Args;
use simlink_driver::{ClientConfig, MotorCommand};
use std::time::{Duration, Instant};

/// 驱动命令参数
#[derive(Args, Debug)]
pub struct DriveCommand {
    /// 左电机速度
    #[arg(short, long, allow_hyphen_values = true)]
    pub left: f32,

    /// 右电机速度
    #[arg(short, long, allow_hyphen_values = true)]
    pub right: f32,

    /// 持续时间（毫秒）
    #[arg(short, long, default_value_t = 1000)]
    pub duration_ms: u64,

    /// 发送频率（Hz）
    #[arg(long, default_value_t = 20)]
    pub rate: u32,

    /// 速度上限
    #[arg(long, default_value_t = DEFAULT_SPEED_LIMIT)]
    pub limit: f32,
}

impl DriveCommand {
    pub fn execute(&self, config: &ClientConfig) -> Result<()> {
        let command = MotorCommand::new(
            validate_speed("left", self.left, self.limit)?,
            validate_speed("right", self.right, self.limit)?,
        );
        let interval = interval_for_rate(self.rate)?;
        let duration = Duration::from_millis(self.duration_ms);
        let shutdown = Shutdown::install()?;

        let client = super::connect(config, Duration::ZERO)?;
        println!("🚗 驱动 {} ({} ms @ {} Hz)", command, self.duration_ms, self.rate);

        let start = Instant::now();
        while start.elapsed() < duration && client.is_running() {
            client.send_command(command).context("发送电机指令失败")?;
            if shutdown.wait(interval) {
                break;
            }
        }

        // 停止电机（仿真端已断开时忽略）
        if let Err(e) = client.send_command(MotorCommand::STOP) {
            tracing::warn!("Failed to send stop command: {}", e);
        }
        client.disconnect();

        let metrics = client.metrics();
        println!("✅ 已发送 {} 条指令", metrics.tx_commands_total);
        Ok(())
    }
}
