//! 离散通道分类
//!
//! 录制开关、驾驶模式选择器和副接收机选择通道都是三段/两段开关，
//! 按固定阈值分类，不带迟滞。阈值由配置提供，不同硬件标定不同。

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 驾驶模式（控制权归属）
///
/// 数值与下游消息协议中的枚举编码一致。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoPrimitive, TryFromPrimitive,
)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[repr(u8)]
pub enum DriveMode {
    /// 尚未收到有效读数
    #[default]
    Invalid = 0,
    /// 人工驾驶
    User = 1,
    /// 自动驾驶
    Pilot = 2,
    /// 辅助驾驶（人机共驾）
    Copilot = 3,
}

impl DriveMode {
    /// 小写名称（文本消息负载使用）
    pub const fn as_str(self) -> &'static str {
        match self {
            DriveMode::Invalid => "invalid",
            DriveMode::User => "user",
            DriveMode::Pilot => "pilot",
            DriveMode::Copilot => "copilot",
        }
    }
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 录制开关阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordSwitch {
    /// 低于该值 → 录制开启
    pub threshold: i32,
}

impl RecordSwitch {
    pub const fn new(threshold: i32) -> Self {
        Self { threshold }
    }

    /// 分类：`value < threshold` 表示录制开启
    pub fn classify(&self, value: i32) -> bool {
        value < self.threshold
    }
}

impl Default for RecordSwitch {
    fn default() -> Self {
        Self::new(1800)
    }
}

/// 驾驶模式分段
///
/// ```text
/// value < 0                      → 无读数，保持原模式
/// value > pilot_above            → Pilot
/// copilot_above < value ≤ pilot  → Copilot（仅三段模式）
/// 其余                           → User
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriveModeBands {
    /// 高于该值 → Pilot
    pub pilot_above: i32,
    /// 高于该值（且不高于 `pilot_above`）→ Copilot；`None` 表示两段模式
    pub copilot_above: Option<i32>,
}

impl DriveModeBands {
    /// 三段模式（9 通道固件默认）：User / Copilot / Pilot
    pub const fn three_band() -> Self {
        Self {
            pilot_above: 1800,
            copilot_above: Some(1200),
        }
    }

    /// 两段模式（6 通道固件默认）：User / Pilot
    pub const fn two_band() -> Self {
        Self {
            pilot_above: 1800,
            copilot_above: None,
        }
    }

    /// 校验 `copilot_above < pilot_above`
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self.copilot_above {
            Some(copilot) if copilot >= self.pilot_above => Err(ProtocolError::InvalidConfig(
                format!(
                    "drive mode bands require copilot_above < pilot_above, got {} >= {}",
                    copilot, self.pilot_above
                ),
            )),
            _ => Ok(()),
        }
    }

    /// 分类，负值（无读数）返回 `None`
    ///
    /// # Example
    ///
    /// ```
    /// use rc_protocol::{DriveMode, DriveModeBands};
    ///
    /// let bands = DriveModeBands::three_band();
    /// assert_eq!(bands.classify(-1), None);
    /// assert_eq!(bands.classify(998), Some(DriveMode::User));
    /// assert_eq!(bands.classify(1500), Some(DriveMode::Copilot));
    /// assert_eq!(bands.classify(1987), Some(DriveMode::Pilot));
    /// ```
    pub fn classify(&self, value: i32) -> Option<DriveMode> {
        if value < 0 {
            return None;
        }
        if value > self.pilot_above {
            return Some(DriveMode::Pilot);
        }
        match self.copilot_above {
            Some(copilot) if value > copilot => Some(DriveMode::Copilot),
            _ => Some(DriveMode::User),
        }
    }
}

impl Default for DriveModeBands {
    fn default() -> Self {
        Self::three_band()
    }
}

/// 副接收机选择阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SecondarySelect {
    /// 高于该值 → 使用副接收机的转向/油门
    pub threshold: i32,
}

impl SecondarySelect {
    pub const fn new(threshold: i32) -> Self {
        Self { threshold }
    }

    pub fn classify(&self, value: i32) -> bool {
        value > self.threshold
    }
}

impl Default for SecondarySelect {
    fn default() -> Self {
        Self::new(1900)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_switch() {
        let record = RecordSwitch::default();
        assert!(record.classify(998));
        assert!(record.classify(1003));
        assert!(!record.classify(1800));
        assert!(!record.classify(1850));
        assert!(!record.classify(1987));
    }

    #[test]
    fn test_three_band_drive_mode() {
        let bands = DriveModeBands::three_band();
        assert_eq!(bands.classify(0), Some(DriveMode::User));
        assert_eq!(bands.classify(1200), Some(DriveMode::User));
        assert_eq!(bands.classify(1201), Some(DriveMode::Copilot));
        assert_eq!(bands.classify(1800), Some(DriveMode::Copilot));
        assert_eq!(bands.classify(1801), Some(DriveMode::Pilot));
        assert_eq!(bands.classify(-1), None);
    }

    #[test]
    fn test_two_band_drive_mode() {
        let bands = DriveModeBands::two_band();
        assert_eq!(bands.classify(998), Some(DriveMode::User));
        assert_eq!(bands.classify(1500), Some(DriveMode::User));
        assert_eq!(bands.classify(1800), Some(DriveMode::User));
        assert_eq!(bands.classify(1850), Some(DriveMode::Pilot));
        assert_eq!(bands.classify(1987), Some(DriveMode::Pilot));
    }

    #[test]
    fn test_drive_mode_bands_validate() {
        assert!(DriveModeBands::three_band().validate().is_ok());
        assert!(DriveModeBands::two_band().validate().is_ok());
        let bad = DriveModeBands {
            pilot_above: 1500,
            copilot_above: Some(1600),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_secondary_select() {
        let select = SecondarySelect::default();
        assert!(!select.classify(1012));
        assert!(!select.classify(1900));
        assert!(select.classify(1950));
    }

    #[test]
    fn test_drive_mode_codes() {
        assert_eq!(u8::from(DriveMode::Invalid), 0);
        assert_eq!(u8::from(DriveMode::Pilot), 2);
        assert_eq!(DriveMode::try_from(3u8).unwrap(), DriveMode::Copilot);
        assert!(DriveMode::try_from(7u8).is_err());
        assert_eq!(DriveMode::User.to_string(), "user");
    }
}
