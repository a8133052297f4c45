//! 电机指令编码
//!
//! 指令格式：`L:<left>;R:<right>\n`，两个值均保留 2 位小数。

use crate::ProtocolError;
use std::fmt;

/// 左右轮电机指令（瞬态值，仅在一次发送内存在）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorCommand {
    pub left: f32,
    pub right: f32,
}

impl MotorCommand {
    /// 停止指令（左右轮均为 0）
    pub const STOP: Self = Self {
        left: 0.0,
        right: 0.0,
    };

    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// 编码为一行线协议文本（含结尾换行符）
    ///
    /// # 示例
    ///
    /// ```rust
    /// use simlink_protocol::MotorCommand;
    ///
    /// assert_eq!(MotorCommand::new(1.0, -0.333).encode(), "L:1.00;R:-0.33\n");
    /// ```
    pub fn encode(&self) -> String {
        format!("{}\n", self)
    }

    /// 解码一行指令文本（仿真端 / 测试工具使用）
    ///
    /// 末尾的 `\n` / `\r\n` 可选。
    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let malformed = || ProtocolError::MalformedCommand(line.to_string());

        let line = line.trim_end_matches(['\n', '\r']);
        let (left, right) = line.split_once(';').ok_or_else(malformed)?;
        let left = left.strip_prefix("L:").ok_or_else(malformed)?;
        let right = right.strip_prefix("R:").ok_or_else(malformed)?;

        Ok(Self {
            left: left.trim().parse().map_err(|_| malformed())?,
            right: right.trim().parse().map_err(|_| malformed())?,
        })
    }
}

impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L:{:.2};R:{:.2}", self.left, self.right)
    }
}

impl From<(f32, f32)> for MotorCommand {
    fn from((left, right): (f32, f32)) -> Self {
        Self { left, right }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_two_decimals() {
        assert_eq!(MotorCommand::new(1.0, -0.333).encode(), "L:1.00;R:-0.33\n");
        assert_eq!(MotorCommand::new(0.5, -0.25).encode(), "L:0.50;R:-0.25\n");
        assert_eq!(MotorCommand::STOP.encode(), "L:0.00;R:0.00\n");
        assert_eq!(MotorCommand::new(12.345_6, 100.0).encode(), "L:12.35;R:100.00\n");
    }

    #[test]
    fn test_display_has_no_newline() {
        assert_eq!(format!("{}", MotorCommand::new(0.1, 0.2)), "L:0.10;R:0.20");
    }

    #[test]
    fn test_decode() {
        let cmd = MotorCommand::decode("L:0.50;R:-0.25\n").unwrap();
        assert_eq!(cmd, MotorCommand::new(0.5, -0.25));

        let cmd = MotorCommand::decode("L:1;R:2\r\n").unwrap();
        assert_eq!(cmd, MotorCommand::new(1.0, 2.0));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        for line in ["", "L:1", "L:1;X:2", "R:1;L:2", "L:a;R:1", "S:1,2"] {
            assert!(
                matches!(
                    MotorCommand::decode(line),
                    Err(ProtocolError::MalformedCommand(_))
                ),
                "line {:?} should be rejected",
                line
            );
        }
    }
}
