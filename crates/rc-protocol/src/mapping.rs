//! PWM → 归一化值映射
//!
//! 转向与油门都使用"三点分段线性"映射：
//!
//! ```text
//!   min ─────────── center ─────────── max
//!  -1.0              0.0               1.0
//! ```
//!
//! 输入先被钳位到 `[min, max]`，中点两侧分别线性缩放，因此支持
//! 不在算术中点的 center（非对称标定）。早期固件使用的两点仿射公式
//! 等价于 `center = min + (max - min) / 2` 的特例。

use crate::ProtocolError;

/// 默认油门 PWM 下限
pub const MIN_PWM_THROTTLE: i32 = 972;
/// 默认油门 PWM 上限
pub const MAX_PWM_THROTTLE: i32 = 1954;
/// 默认转向 PWM 下限（早期固件标定）
pub const MIN_PWM_STEERING: i32 = 960;
/// 默认转向 PWM 上限（早期固件标定）
pub const MAX_PWM_STEERING: i32 = 1980;

/// 默认油门标定（对称中点）
pub const DEFAULT_THROTTLE: PwmRange = PwmRange::new(MIN_PWM_THROTTLE, MAX_PWM_THROTTLE);
/// 默认转向标定（对称中点）
pub const DEFAULT_STEERING: PwmRange = PwmRange::new(MIN_PWM_STEERING, MAX_PWM_STEERING);

/// PWM 通道标定 `{min, max, center}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PwmRange {
    /// 最小 PWM 值（映射为 -1.0）
    pub min: i32,
    /// 最大 PWM 值（映射为 1.0）
    pub max: i32,
    /// 中点 PWM 值（映射为 0.0），不要求是算术中点
    pub center: i32,
}

impl PwmRange {
    /// 对称标定，中点为 `min + (max - min) / 2`（整数除法）
    pub const fn new(min: i32, max: i32) -> Self {
        let center = min as i64 + (max as i64 - min as i64) / 2;
        Self {
            min,
            max,
            center: center as i32,
        }
    }

    /// 非对称标定，显式指定中点
    pub const fn asymmetric(min: i32, max: i32, center: i32) -> Self {
        Self { min, max, center }
    }

    /// 校验 `min < center < max`
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.min < self.center && self.center < self.max {
            Ok(())
        } else {
            Err(ProtocolError::InvalidConfig(format!(
                "PWM range requires min < center < max, got min={} center={} max={}",
                self.min, self.center, self.max
            )))
        }
    }

    /// 钳位到 `[min, max]`
    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }

    /// 三点分段线性映射到 `[-1.0, 1.0]`
    ///
    /// # Example
    ///
    /// ```
    /// use rc_protocol::PwmRange;
    ///
    /// let range = PwmRange::asymmetric(1000, 1700, 1500);
    /// assert_eq!(range.to_percent(1500), 0.0);
    /// assert_eq!(range.to_percent(1600), 0.5);
    /// assert_eq!(range.to_percent(500), -1.0);
    /// ```
    pub fn to_percent(&self, value: i32) -> f32 {
        let value = i64::from(self.clamp(value));
        let (min, max, center) = self.wide();
        if value == center {
            return 0.0;
        }
        let offset = (value - center) as f64;
        let percent = if value < center {
            offset / (center - min) as f64
        } else {
            offset / (max - center) as f64
        };
        percent as f32
    }

    /// 两点仿射映射 `[min, max] → [-1.0, 1.0]`（忽略 center）
    ///
    /// 早期固件的公式，仅用于标定数据对比；中点不在算术中点时与
    /// [`PwmRange::to_percent`] 结果不同。
    pub fn affine_percent(&self, value: i32) -> f32 {
        let value = i64::from(self.clamp(value));
        let (min, max, _) = self.wide();
        ((value - min) as f64 / (max - min) as f64 * 2.0 - 1.0) as f32
    }

    /// 差值在 `i64` 中计算，避免极端标定溢出
    fn wide(&self) -> (i64, i64, i64) {
        (
            i64::from(self.min),
            i64::from(self.max),
            i64::from(self.center),
        )
    }
}

impl Default for PwmRange {
    fn default() -> Self {
        DEFAULT_THROTTLE
    }
}
