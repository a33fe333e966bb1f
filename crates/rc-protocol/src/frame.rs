//! 串口行解析
//!
//! 将单行 CSV 文本校验并拆分为 [`ChannelFrame`]。校验是整行级别的：
//! 字段数量不符或存在非数字字段时整行丢弃，不产生任何部分结果。

use crate::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// 单帧最多的通道数（扩展格式）
pub const MAX_CHANNELS: usize = 9;

/// 行格式版本
///
/// - `Extended`: `timestamp,ch1..ch9,frequency[,sensor]`（11 或 12 个字段）
/// - `Legacy`: `timestamp,ch1..ch6,frequency[,distance_cm]`（8 或 9 个字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FrameFormat {
    /// 9 通道格式（当前固件）
    #[default]
    Extended,
    /// 6 通道格式（早期固件，末尾可带超声波距离）
    Legacy,
}

impl FrameFormat {
    /// 该格式包含的通道数
    pub const fn channel_count(self) -> usize {
        match self {
            FrameFormat::Extended => 9,
            FrameFormat::Legacy => 6,
        }
    }

    /// 允许的字段数量（不带 / 带末尾传感器字段）
    pub const fn allowed_field_counts(self) -> &'static [usize] {
        match self {
            FrameFormat::Extended => &[11, 12],
            FrameFormat::Legacy => &[8, 9],
        }
    }

    /// 频率字段的下标
    const fn frequency_index(self) -> usize {
        self.channel_count() + 1
    }

    /// 末尾传感器字段的下标
    const fn sensor_index(self) -> usize {
        self.channel_count() + 2
    }
}

impl FromStr for FrameFormat {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "extended" | "9" => Ok(FrameFormat::Extended),
            "legacy" | "6" => Ok(FrameFormat::Legacy),
            other => Err(ProtocolError::InvalidConfig(format!(
                "unknown frame format '{}', expected 'extended' or 'legacy'",
                other
            ))),
        }
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameFormat::Extended => write!(f, "extended"),
            FrameFormat::Legacy => write!(f, "legacy"),
        }
    }
}

/// 一行串口数据解析出的通道帧
///
/// 通道值为 `None` 表示该字段格式合法但超出 `i32` 范围（单字段解析失败），
/// 上层应保留该通道的上一次有效值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFrame {
    /// 单片机时间戳（毫秒，单调递增）
    pub timestamp: u64,
    /// 通道原始 PWM 值，下标 0 对应 ch1
    pub channels: [Option<i32>; MAX_CHANNELS],
    /// 本帧有效通道数（6 或 9）
    pub channel_count: usize,
    /// 单片机采样频率
    pub frequency: u32,
    /// 末尾可选传感器值（Legacy 格式下为距离，单位 cm）
    pub sensor: Option<i64>,
}

impl ChannelFrame {
    /// 解析一行串口数据
    ///
    /// 行尾的 `\n` 与 `\r` 会被剥离。
    ///
    /// # 错误
    /// - `ProtocolError::FieldCount`: 字段数量与格式不符
    /// - `ProtocolError::NonNumericField`: 存在非数字字段
    /// - `ProtocolError::Overflow`: 时间戳或频率溢出
    ///
    /// # Example
    ///
    /// ```
    /// use rc_protocol::{ChannelFrame, FrameFormat};
    ///
    /// let frame = ChannelFrame::parse("12345,1500,1500,1000,1678,1910,-1,0,0,0,50\r\n", FrameFormat::Extended).unwrap();
    /// assert_eq!(frame.timestamp, 12345);
    /// assert_eq!(frame.channel(6), Some(-1));
    /// assert_eq!(frame.frequency, 50);
    /// ```
    pub fn parse(line: &str, format: FrameFormat) -> Result<Self, ProtocolError> {
        let line = strip_line_ending(line);
        let fields: Vec<&str> = line.split(',').collect();

        let expected = format.allowed_field_counts();
        if !expected.contains(&fields.len()) {
            return Err(ProtocolError::FieldCount {
                format,
                expected,
                actual: fields.len(),
            });
        }

        let channel_count = format.channel_count();

        // 先整体校验，保证出错时不会产生部分结果
        for (index, field) in fields.iter().enumerate() {
            let signed = (1..=channel_count).contains(&index) || index == format.sensor_index();
            if !is_numeric(field, signed) {
                return Err(ProtocolError::NonNumericField {
                    index,
                    value: (*field).to_string(),
                });
            }
        }

        let timestamp = parse_field::<u64>(&fields, 0)?;
        let frequency = parse_field::<u32>(&fields, format.frequency_index())?;

        let mut channels = [None; MAX_CHANNELS];
        for (slot, field) in channels.iter_mut().zip(&fields[1..=channel_count]) {
            *slot = field.parse::<i32>().ok();
        }

        let sensor = fields
            .get(format.sensor_index())
            .and_then(|field| field.parse::<i64>().ok());

        Ok(Self {
            timestamp,
            channels,
            channel_count,
            frequency,
            sensor,
        })
    }

    /// 获取通道值（1-based，与接收机通道编号一致）
    ///
    /// 通道号越界或该字段解析失败时返回 `None`。
    pub fn channel(&self, index: usize) -> Option<i32> {
        if index == 0 || index > self.channel_count {
            return None;
        }
        self.channels[index - 1]
    }
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

fn is_numeric(field: &str, signed: bool) -> bool {
    let digits = if signed {
        field.strip_prefix('-').unwrap_or(field)
    } else {
        field
    };
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_field<T: FromStr>(fields: &[&str], index: usize) -> Result<T, ProtocolError> {
    fields[index]
        .parse::<T>()
        .map_err(|_| ProtocolError::Overflow {
            index,
            value: fields[index].to_string(),
        })
}
