//! 遥测监控命令

use crate::signal::Shutdown;
use crate::validation::interval_for_rate;
use anyhow::Result;
use clap::Args;
use simlink_driver::{ClientConfig, MetricsSnapshot, SensorState};
use std::time::Duration;

/// 监控命令参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 刷新频率（Hz）
    #[arg(short, long, default_value_t = 10)]
    pub frequency: u32,

    /// 打印 N 次后退出（默认一直运行直到 Ctrl+C）
    #[arg(short = 'n', long)]
    pub count: Option<u64>,

    /// 连接后等待第一帧遥测的时间（毫秒）
    #[arg(long, default_value_t = 1000)]
    pub wait_ms: u64,
}

impl MonitorCommand {
    pub fn execute(&self, config: &ClientConfig) -> Result<()> {
        let interval = interval_for_rate(self.frequency)?;
        let shutdown = Shutdown::install()?;

        let client = super::connect(config, Duration::from_millis(self.wait_ms))?;
        println!("📊 监控中 ({} Hz)...", self.frequency);
        println!("按 Ctrl+C 停止\n");

        let mut iteration = 0u64;
        loop {
            iteration += 1;
            println!("{}", format_state(iteration, &client.sensor_state()));

            if !client.is_running() {
                println!("⚠️  仿真端已断开");
                break;
            }
            if self.count.is_some_and(|count| iteration >= count) {
                break;
            }
            if shutdown.wait(interval) {
                break;
            }
        }

        client.disconnect();
        println!("{}", format_metrics(&client.metrics()));
        println!("✅ 监控已结束");
        Ok(())
    }
}

fn format_state(iteration: u64, state: &SensorState) -> String {
    if !state.has_telemetry() {
        return format!("[{:>5}] (尚未收到遥测)", iteration);
    }

    let values: Vec<String> = state.snapshot.values().iter().map(|v| format!("{:.3}", v)).collect();
    format!(
        "[{:>5}] seq={} n={} [{}]",
        iteration,
        state.sequence,
        state.snapshot.count(),
        values.join(", ")
    )
}

fn format_metrics(metrics: &MetricsSnapshot) -> String {
    format!(
        "📈 帧: {} 解析 / {} 忽略 / {} 丢弃 (成功率 {:.1}%)，读超时 {}，指令 {} 发送 / {} 丢弃",
        metrics.rx_frames_parsed,
        metrics.rx_frames_ignored,
        metrics.rx_frames_rejected,
        metrics.parse_success_rate(),
        metrics.rx_timeouts,
        metrics.tx_commands_total,
        metrics.tx_commands_dropped,
    )
}
