//! 输入验证模块

use anyhow::{Result, bail};
use std::time::Duration;

/// 电机速度上限（仿真端按 [-limit, limit] 解释）
pub const DEFAULT_SPEED_LIMIT: f32 = 10.0;

/// 验证电机速度
///
/// # 错误
/// 速度为 NaN / 无穷大，或超出 `[-limit, limit]`
pub fn validate_speed(name: &str, value: f32, limit: f32) -> Result<f32> {
    if !value.is_finite() {
        bail!("{} 速度无效: {}", name, value);
    }
    if value.abs() > limit {
        bail!("{} 速度 {:.2} 超出范围 [{:.2}, {:.2}]", name, value, -limit, limit);
    }
    Ok(value)
}

/// 频率（Hz）转换为节拍间隔
pub fn interval_for_rate(hz: u32) -> Result<Duration> {
    if hz == 0 || hz > 1000 {
        bail!("频率必须在 1..=1000 Hz 之间，得到 {}", hz);
    }
    Ok(Duration::from_secs_f64(1.0 / hz as f64))
}
