//! 传感器遥测帧解析
//!
//! 遥测帧格式：`S:<v1>,<v2>,...,<vn>\n`，值的个数不固定（0 ~ 32+）。
//!
//! # 宽松解析策略
//!
//! 默认解析器（[`parse_telemetry`]）保留旧协议的宽松语义：
//! - 非 `S:` 前缀的帧返回 `None`（不是错误，直接丢弃）
//! - 无法解析的数值按 `0.0` 处理（取最长合法数值前缀，类似 C 的 `atof`）
//! - 空 token（如 `1,,2`）被跳过，与旧实现的分词器一致
//! - 超过 [`SENSOR_CAPACITY`] 的值被静默丢弃
//!
//! 严格解析器（[`parse_telemetry_strict`]）对上述情况返回 [`ProtocolError`]，
//! 通过 [`TelemetryPolicy`] 选择。

use crate::{FRAME_DELIMITER, ProtocolError, TELEMETRY_PREFIX};

/// 单帧遥测最多携带的传感器数量
pub const SENSOR_CAPACITY: usize = 32;

/// 传感器快照（最近一次完整解析的遥测帧）
///
/// 不变量：`count <= SENSOR_CAPACITY`，`count` 之后的槽位恒为 0 且不对外暴露。
/// 每次解析成功后整体替换，不做局部合并。
///
/// # 示例
///
/// ```rust
/// use simlink_protocol::SensorSnapshot;
///
/// let snapshot = SensorSnapshot::new(&[0.5, 1.0]);
/// assert_eq!(snapshot.count(), 2);
/// assert_eq!(snapshot.values(), &[0.5, 1.0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorSnapshot {
    values: [f32; SENSOR_CAPACITY],
    count: usize,
}

impl SensorSnapshot {
    /// 空快照（count = 0）
    pub const EMPTY: Self = Self {
        values: [0.0; SENSOR_CAPACITY],
        count: 0,
    };

    /// 从切片构造快照，超出容量的部分被截断
    pub fn new(values: &[f32]) -> Self {
        let mut snapshot = Self::EMPTY;
        for &value in values.iter().take(SENSOR_CAPACITY) {
            snapshot.push(value);
        }
        snapshot
    }

    /// 有效读数（长度等于 `count()`）
    pub fn values(&self) -> &[f32] {
        &self.values[..self.count]
    }

    /// 有效读数个数
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 获取第 `index` 个读数，越界返回 `None`
    pub fn get(&self, index: usize) -> Option<f32> {
        self.values().get(index).copied()
    }

    /// 追加一个读数；已满时返回 `false`
    fn push(&mut self, value: f32) -> bool {
        if self.count >= SENSOR_CAPACITY {
            return false;
        }
        self.values[self.count] = value;
        self.count += 1;
        true
    }
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// 遥测解析策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TelemetryPolicy {
    /// 宽松模式（默认，兼容旧协议）
    #[default]
    Lenient,
    /// 严格模式：畸形帧整体丢弃
    Strict,
}

/// 宽松解析遥测帧
///
/// 只考虑第一个逻辑行（第一个 `\n` 之前的内容），末尾 `\r` 会被去掉。
///
/// # 返回
/// - `Some(snapshot)`: 以 `S:` 开头的遥测帧（`S:` 空体返回 count = 0）
/// - `None`: 非遥测帧
///
/// # 示例
///
/// ```rust
/// use simlink_protocol::parse_telemetry;
///
/// let snapshot = parse_telemetry(b"S:1.0,bad,3.0\n").unwrap();
/// assert_eq!(snapshot.values(), &[1.0, 0.0, 3.0]);
///
/// assert!(parse_telemetry(b"L:0.50;R:0.50\n").is_none());
/// ```
pub fn parse_telemetry(raw: &[u8]) -> Option<SensorSnapshot> {
    let body = first_line(raw).strip_prefix(TELEMETRY_PREFIX)?;

    let mut snapshot = SensorSnapshot::EMPTY;
    for token in tokens(body).take(SENSOR_CAPACITY) {
        let value = std::str::from_utf8(token).map(lenient_f32).unwrap_or(0.0);
        snapshot.push(value);
    }
    Some(snapshot)
}

/// 严格解析遥测帧
///
/// # 错误
/// - `ProtocolError::UnknownPrefix`: 不是 `S:` 帧
/// - `ProtocolError::MalformedToken`: 空 token 或无法完整解析为浮点数的 token
/// - `ProtocolError::TooManyValues`: 值的个数超过 [`SENSOR_CAPACITY`]
pub fn parse_telemetry_strict(raw: &[u8]) -> Result<SensorSnapshot, ProtocolError> {
    let line = first_line(raw);
    let body = line
        .strip_prefix(TELEMETRY_PREFIX)
        .ok_or_else(|| ProtocolError::UnknownPrefix(String::from_utf8_lossy(line).into_owned()))?;

    let mut snapshot = SensorSnapshot::EMPTY;
    if body.is_empty() {
        return Ok(snapshot);
    }

    let count = body.split(|&b| b == b',').count();
    if count > SENSOR_CAPACITY {
        return Err(ProtocolError::TooManyValues { count });
    }

    for (index, token) in body.split(|&b| b == b',').enumerate() {
        let value = std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.trim().parse::<f32>().ok())
            .ok_or_else(|| ProtocolError::MalformedToken {
                index,
                token: String::from_utf8_lossy(token).into_owned(),
            })?;
        snapshot.push(value);
    }
    Ok(snapshot)
}

/// 按策略解析
///
/// 宽松模式下非遥测帧返回 `Ok(None)`；严格模式下非遥测帧同样返回 `Ok(None)`，
/// 只有 `S:` 帧内部的格式问题才会返回错误。
pub fn parse_with_policy(
    raw: &[u8],
    policy: TelemetryPolicy,
) -> Result<Option<SensorSnapshot>, ProtocolError> {
    match policy {
        TelemetryPolicy::Lenient => Ok(parse_telemetry(raw)),
        TelemetryPolicy::Strict => {
            if !first_line(raw).starts_with(TELEMETRY_PREFIX) {
                return Ok(None);
            }
            parse_telemetry_strict(raw).map(Some)
        },
    }
}

/// 将一次读取到的数据块拆分为逻辑帧
///
/// 一次 TCP 读取可能包含多个换行分隔的帧；空行被跳过，末尾 `\r` 被去掉。
/// 末尾没有换行的残片也作为一个帧返回（由解析器决定是否接受）。
pub fn split_frames(chunk: &[u8]) -> impl Iterator<Item = &[u8]> {
    chunk
        .split(|&b| b == FRAME_DELIMITER)
        .map(trim_carriage_return)
        .filter(|frame| !frame.is_empty())
}

fn first_line(raw: &[u8]) -> &[u8] {
    let end = raw.iter().position(|&b| b == FRAME_DELIMITER).unwrap_or(raw.len());
    trim_carriage_return(&raw[..end])
}

fn trim_carriage_return(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn tokens(body: &[u8]) -> impl Iterator<Item = &[u8]> {
    body.split(|&b| b == b',').filter(|token| !token.is_empty())
}

/// 尽力而为的数值转换：完整解析失败时取最长合法数值前缀，否则为 0.0
fn lenient_f32(token: &str) -> f32 {
    let token = token.trim();
    if let Ok(value) = token.parse::<f32>() {
        return value;
    }
    let end = numeric_prefix_len(token.as_bytes());
    token[..end].parse::<f32>().unwrap_or(0.0)
}

/// `[+-]digits[.digits][(e|E)[+-]digits]` 形式的最长前缀长度
fn numeric_prefix_len(bytes: &[u8]) -> usize {
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - frac_start;
        i = j;
    }

    if digits == 0 {
        return 0;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}
