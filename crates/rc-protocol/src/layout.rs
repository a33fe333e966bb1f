//! 通道角色分配
//!
//! 接收机通道编号与功能的对应关系随固件版本变化，这里用 1-based 通道号
//! 描述，`None` 表示该角色未接线。

use crate::ProtocolError;
use crate::frame::FrameFormat;

/// 通道角色 → 通道号（1-based）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelLayout {
    pub steering: Option<usize>,
    pub throttle: Option<usize>,
    /// 副接收机选择开关
    pub secondary_select: Option<usize>,
    /// 油门反馈传感器（经阈值表换算）
    pub throttle_feedback: Option<usize>,
    pub record: Option<usize>,
    pub drive_mode: Option<usize>,
    pub secondary_steering: Option<usize>,
    pub secondary_throttle: Option<usize>,
}

impl ChannelLayout {
    /// 9 通道固件布局（ch9 未使用）
    pub const fn extended() -> Self {
        Self {
            steering: Some(1),
            throttle: Some(2),
            secondary_select: Some(3),
            throttle_feedback: Some(4),
            record: Some(5),
            drive_mode: Some(6),
            secondary_steering: Some(7),
            secondary_throttle: Some(8),
        }
    }

    /// 6 通道固件布局
    pub const fn legacy() -> Self {
        Self {
            steering: Some(1),
            throttle: Some(2),
            secondary_select: None,
            throttle_feedback: None,
            record: Some(5),
            drive_mode: Some(6),
            secondary_steering: None,
            secondary_throttle: None,
        }
    }

    /// 格式对应的默认布局
    pub const fn for_format(format: FrameFormat) -> Self {
        match format {
            FrameFormat::Extended => Self::extended(),
            FrameFormat::Legacy => Self::legacy(),
        }
    }

    fn roles(&self) -> [(&'static str, Option<usize>); 8] {
        [
            ("steering", self.steering),
            ("throttle", self.throttle),
            ("secondary_select", self.secondary_select),
            ("throttle_feedback", self.throttle_feedback),
            ("record", self.record),
            ("drive_mode", self.drive_mode),
            ("secondary_steering", self.secondary_steering),
            ("secondary_throttle", self.secondary_throttle),
        ]
    }

    /// 校验所有已分配的通道号都在格式的通道范围内
    ///
    /// # 错误
    /// 通道号为 0 或超过 `format.channel_count()` 时返回 `ProtocolError::InvalidConfig`
    pub fn validate(&self, format: FrameFormat) -> Result<(), ProtocolError> {
        let count = format.channel_count();
        for (role, channel) in self.roles() {
            if let Some(index) = channel
                && (index == 0 || index > count)
            {
                return Err(ProtocolError::InvalidConfig(format!(
                    "{} mapped to channel {}, but {:?} format has channels 1..={}",
                    role, index, format, count
                )));
            }
        }
        Ok(())
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::extended()
    }
}
