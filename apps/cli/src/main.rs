//! # simlink CLI
//!
//! Command-line interface for a robot simulation reachable over TCP.
//!
//! ```bash
//! # 打印遥测（Ctrl+C 停止）
//! simlink-cli monitor --frequency 5
//!
//! # 以 (0.5, -0.5) 驱动 2 秒，然后停止电机
//! simlink-cli --host 192.168.1.20 drive --left 0.5 --right -0.5 --duration-ms 2000
//!
//! # 查看合并后的配置（配置文件 + 命令行覆盖）
//! simlink-cli --config simlink.toml config show
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod signal;
mod validation;

use commands::{ConfigCommand, ConnectionArgs, DriveCommand, MonitorCommand};

/// simlink CLI - 仿真链路命令行工具
#[derive(Parser, Debug)]
#[command(name = "simlink-cli")]
#[command(about = "Command-line interface for the simlink simulation client", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 监控传感器遥测
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 发送电机指令
    Drive {
        #[command(flatten)]
        args: DriveCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simlink_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.connection.resolve()?;

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&config),
        Commands::Monitor { args } => args.execute(&config),
        Commands::Drive { args } => args.execute(&config),
    }
}
