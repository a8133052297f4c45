//! 配置管理命令

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use simlink_driver::ClientConfig;

/// 输出格式
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Toml,
    Json,
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印合并后的配置
    Show {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Toml)]
        format: OutputFormat,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(&self, config: &ClientConfig) -> Result<()> {
        match self {
            ConfigCommand::Show { format } => {
                println!("{}", render(config, *format)?);
                Ok(())
            },
            ConfigCommand::Check => {
                config.validate().context("配置无效")?;
                println!("✅ 配置有效");
                println!("  仿真端: {}", config.address());
                println!("  连接超时: {:?}", config.connect_timeout());
                println!("  遥测超时: {:?}", config.connection_timeout());
                println!("  解析策略: {:?}", config.pipeline.telemetry_policy);
                Ok(())
            },
        }
    }
}

fn render(config: &ClientConfig, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Toml => Ok(config.to_toml_string()?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(config)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_toml_roundtrip() {
        let config = ClientConfig::default();
        let text = render(&config, OutputFormat::Toml).unwrap();
        assert_eq!(ClientConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_render_json() {
        let text = render(&ClientConfig::default(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["port"], 50002);
        assert_eq!(value["pipeline"]["telemetry_policy"], "lenient");
    }
}
