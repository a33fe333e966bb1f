//! # RC Protocol
//!
//! RC 接收机串口遥测协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `frame`: 串口行格式校验与拆分（`ChannelFrame`）
//! - `layout`: 通道角色分配（哪个通道是转向、油门……）
//! - `mapping`: PWM → 归一化值映射（`PwmRange`）
//! - `discrete`: 离散通道分类（录制开关、驾驶模式、副接收机选择）
//! - `threshold`: 非线性反馈传感器的阈值表（`ThresholdTable`）
//!
//! ## 行格式
//!
//! ```text
//! timestamp,ch1,ch2,ch3,ch4,ch5,ch6[,ch7,ch8,ch9],frequency[,sensor]\n
//! ```
//!
//! 所有字段均为十进制整数，行尾可选 `\r`。

pub mod discrete;
pub mod frame;
pub mod layout;
pub mod mapping;
pub mod threshold;

// 重新导出常用类型
pub use discrete::*;
pub use frame::{ChannelFrame, FrameFormat, MAX_CHANNELS};
pub use layout::ChannelLayout;
pub use mapping::*;
pub use threshold::ThresholdTable;

use thiserror::Error;

/// 协议层错误类型
///
/// 任何一个错误都意味着整行被丢弃，不会产生 `ChannelFrame`。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid field count for {format:?} format: expected one of {expected:?}, got {actual}")]
    FieldCount {
        format: FrameFormat,
        expected: &'static [usize],
        actual: usize,
    },

    #[error("Non-numeric field at index {index}: {value:?}")]
    NonNumericField { index: usize, value: String },

    #[error("Numeric overflow at index {index}: {value:?}")]
    Overflow { index: usize, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
