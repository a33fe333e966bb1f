//! 非线性反馈传感器阈值表
//!
//! 油门反馈传感器的原始读数随档位单调递减，且在低档位区间变化剧烈，
//! 因此用查表代替线性映射。相邻两项之间取半差值，而不是线性插值。

use crate::ProtocolError;

/// 阈值表
///
/// - `steps`: 归一化档位（递增）
/// - `data`: 对应的原始阈值（递减）
/// - `min_valid`: 低于该值的读数视为无效
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThresholdTable {
    #[cfg_attr(feature = "serde", serde(rename = "threshold_steps"))]
    pub steps: Vec<f64>,
    pub data: Vec<i32>,
    pub min_valid: i32,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            steps: vec![
                0.07, 0.08, 0.09, 0.1, 0.125, 0.15, 0.2, 0.25, 0.3, 0.35, 0.4, 0.5, 0.6, 0.7, 0.8,
                0.9, 1.0,
            ],
            data: vec![
                8700, 4800, 3500, 2550, 1850, 1387, 992, 840, 750, 700, 655, 620, 590, 570, 553,
                549, 548,
            ],
            min_valid: 500,
        }
    }
}

impl ThresholdTable {
    /// 构造并校验
    pub fn new(steps: Vec<f64>, data: Vec<i32>, min_valid: i32) -> Result<Self, ProtocolError> {
        let table = Self {
            steps,
            data,
            min_valid,
        };
        table.validate()?;
        Ok(table)
    }

    /// 校验长度一致、非空、`steps` 递增、`data` 递减
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.steps.is_empty() || self.steps.len() != self.data.len() {
            return Err(ProtocolError::InvalidConfig(format!(
                "threshold table requires equal non-zero lengths, got {} steps and {} data",
                self.steps.len(),
                self.data.len()
            )));
        }
        if self.steps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ProtocolError::InvalidConfig(
                "threshold steps must be strictly increasing".to_string(),
            ));
        }
        if self.data.windows(2).any(|w| w[0] <= w[1]) {
            return Err(ProtocolError::InvalidConfig(
                "threshold data must be strictly decreasing".to_string(),
            ));
        }
        Ok(())
    }

    /// 查表
    ///
    /// ```text
    /// raw < min_valid 或 raw > data[0]     → 0.0
    /// raw == data[i]                        → steps[i]
    /// min_valid <= raw < data[last]         → 1.0
    /// data[i-1] > raw > data[i]             → steps[i-1] - (steps[i-1] - steps[i]) / 2
    /// ```
    ///
    /// 表为空时返回 0.0。
    ///
    /// # Example
    ///
    /// ```
    /// use rc_protocol::ThresholdTable;
    ///
    /// let table = ThresholdTable::default();
    /// assert_eq!(table.value_of(8700), 0.07);
    /// assert!((table.value_of(800) - 0.275).abs() < 1e-9);
    /// assert_eq!(table.value_of(499), 0.0);
    /// ```
    pub fn value_of(&self, raw: i32) -> f64 {
        let (Some(&first), Some(&last)) = (self.data.first(), self.data.last()) else {
            return 0.0;
        };
        if raw < self.min_valid || raw > first {
            return 0.0;
        }
        if raw < last {
            return 1.0;
        }

        for (i, &threshold) in self.data.iter().enumerate() {
            if raw == threshold {
                return self.steps[i];
            }
            if i > 0 && raw > threshold {
                let upper = self.steps[i - 1];
                let lower = self.steps[i];
                return upper - (upper - lower) / 2.0;
            }
        }
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_out_of_range_is_zero() {
        let table = ThresholdTable::default();
        assert_eq!(table.value_of(499), 0.0);
        assert_eq!(table.value_of(-1), 0.0);
        assert_eq!(table.value_of(8701), 0.0);
        assert_eq!(table.value_of(11000), 0.0);
    }

    #[test]
    fn test_below_last_is_full_scale() {
        let table = ThresholdTable::default();
        assert_eq!(table.value_of(500), 1.0);
        assert_eq!(table.value_of(520), 1.0);
        assert_eq!(table.value_of(547), 1.0);
    }

    #[test]
    fn test_exact_entries() {
        let table = ThresholdTable::default();
        for (step, raw) in table.steps.iter().zip(&table.data) {
            assert_eq!(table.value_of(*raw), *step, "raw {}", raw);
        }
    }

    #[test]
    fn test_half_gap_between_entries() {
        let table = ThresholdTable::default();
        assert!(approx(table.value_of(800), 0.275));
        assert!(approx(table.value_of(6750), 0.075));
        assert!(approx(table.value_of(1000), 0.175));
        assert!(approx(table.value_of(551), 0.85));
    }

    #[test]
    fn test_validate() {
        assert!(ThresholdTable::default().validate().is_ok());
        assert!(ThresholdTable::new(vec![0.1, 0.2], vec![900], 500).is_err());
        assert!(ThresholdTable::new(vec![], vec![], 500).is_err());
        assert!(ThresholdTable::new(vec![0.2, 0.1], vec![900, 800], 500).is_err());
        assert!(ThresholdTable::new(vec![0.1, 0.2], vec![800, 900], 500).is_err());
        assert!(ThresholdTable::new(vec![0.1, 0.2], vec![900, 800], 500).is_ok());
    }

    #[test]
    fn test_empty_table_is_zero() {
        let table = ThresholdTable {
            steps: vec![],
            data: vec![],
            min_valid: 0,
        };
        assert_eq!(table.value_of(100), 0.0);
    }
}
