//! PWM 映射与行解析的属性测试
//!
//! 使用 proptest 验证钳位、单调性和值域。

use proptest::prelude::*;
use rc_protocol::{ChannelFrame, FrameFormat, PwmRange, ThresholdTable};

fn pwm_range() -> impl Strategy<Value = PwmRange> {
    (500i32..1400, 100i32..600, 100i32..600)
        .prop_map(|(min, low, high)| PwmRange::asymmetric(min, min + low + high, min + low))
}

/// 覆盖整个 `i32` 取值范围的合法标定
fn full_domain_range() -> impl Strategy<Value = PwmRange> {
    (any::<i32>(), any::<i32>(), any::<i32>()).prop_filter_map(
        "min < center < max",
        |(a, b, c)| {
            let mut v = [a, b, c];
            v.sort_unstable();
            (v[0] < v[1] && v[1] < v[2]).then(|| PwmRange::asymmetric(v[0], v[2], v[1]))
        },
    )
}

proptest! {
    /// 低于下限的输入与下限映射结果相同
    #[test]
    fn clamp_below_min_idempotent(range in pwm_range(), below in 0i32..5000) {
        prop_assert_eq!(range.to_percent(range.min - below), range.to_percent(range.min));
        prop_assert_eq!(range.to_percent(range.min), -1.0);
    }

    /// 高于上限的输入与上限映射结果相同
    #[test]
    fn clamp_above_max_idempotent(range in pwm_range(), above in 0i32..5000) {
        prop_assert_eq!(range.to_percent(range.max + above), range.to_percent(range.max));
        prop_assert_eq!(range.to_percent(range.max), 1.0);
    }

    /// 中点精确映射为 0
    #[test]
    fn center_maps_to_zero(range in pwm_range()) {
        prop_assert_eq!(range.to_percent(range.center), 0.0);
    }

    /// 输出始终在 [-1, 1]
    #[test]
    fn output_in_unit_range(range in pwm_range(), value in -10_000i32..10_000) {
        let percent = range.to_percent(value);
        prop_assert!((-1.0..=1.0).contains(&percent));
    }

    /// 单调不减
    #[test]
    fn monotonic_non_decreasing(range in pwm_range(), a in 0i32..3000, b in 0i32..3000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(range.to_percent(lo) <= range.to_percent(hi));
    }

    /// 阈值表输出在 [0, 1]，低于 min_valid 时为 0
    #[test]
    fn threshold_table_bounded(raw in -1000i32..20_000) {
        let table = ThresholdTable::default();
        let value = table.value_of(raw);
        prop_assert!((0.0..=1.0).contains(&value));
        if raw < table.min_valid {
            prop_assert_eq!(value, 0.0);
        }
    }

    /// 任意 9 通道整数行都能解析，且通道值原样保留
    #[test]
    fn extended_line_roundtrips_channels(
        timestamp in any::<u64>(),
        channels in proptest::array::uniform9(-3000i32..3000),
        frequency in any::<u32>(),
    ) {
        let body: Vec<String> = channels.iter().map(|c| c.to_string()).collect();
        let line = format!("{},{},{}\n", timestamp, body.join(","), frequency);
        let frame = ChannelFrame::parse(&line, FrameFormat::Extended).unwrap();
        prop_assert_eq!(frame.timestamp, timestamp);
        prop_assert_eq!(frame.frequency, frequency);
        for (i, value) in channels.iter().enumerate() {
            prop_assert_eq!(frame.channel(i + 1), Some(*value));
        }
    }

    /// 极端标定下映射不溢出，端点与中点保持精确值
    #[test]
    fn full_domain_mapping_bounded(range in full_domain_range(), value in any::<i32>()) {
        let percent = range.to_percent(value);
        prop_assert!((-1.0..=1.0).contains(&percent));
        prop_assert_eq!(range.to_percent(range.min), -1.0);
        prop_assert_eq!(range.to_percent(range.max), 1.0);
        prop_assert_eq!(range.to_percent(range.center), 0.0);

        let affine = range.affine_percent(value);
        prop_assert!((-1.0..=1.0).contains(&affine));
    }

    /// 对称构造的中点落在 [min, max] 内
    #[test]
    fn symmetric_center_within_bounds(a in any::<i32>(), b in any::<i32>()) {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        let range = PwmRange::new(min, max);
        prop_assert!(range.min <= range.center && range.center <= range.max);
    }
}
