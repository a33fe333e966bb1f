//! 行解码器
//!
//! 把一行串口文本变成对 [`VehicleState`] 的一次原子更新：
//!
//! 1. 整行校验（失败则整行丢弃，状态不变）
//! 2. 在锁外完成所有通道的映射与分类
//! 3. 加锁一次，写入所有字段
//!
//! 单个通道解析失败时只保留该字段的旧值，同一行的其它字段照常更新。

use crate::state::{BridgeContext, VehicleState};
use rc_protocol::{
    ChannelFrame, ChannelLayout, DEFAULT_STEERING, DEFAULT_THROTTLE, DriveMode, DriveModeBands,
    FrameFormat, ProtocolError, PwmRange, RecordSwitch, SecondarySelect, ThresholdTable,
};
use tracing::{debug, error, info, trace, warn};

/// 解码配置（构造后不可变，由 [`LineDecoder`] 独占）
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    pub format: FrameFormat,
    pub layout: ChannelLayout,
    pub steering: PwmRange,
    pub throttle: PwmRange,
    pub secondary_steering: PwmRange,
    pub secondary_throttle: PwmRange,
    pub record: RecordSwitch,
    pub drive_mode: DriveModeBands,
    pub secondary_select: SecondarySelect,
    pub feedback: ThresholdTable,
}

impl DecoderConfig {
    /// 9 通道固件预设
    pub fn extended() -> Self {
        Self {
            format: FrameFormat::Extended,
            layout: ChannelLayout::extended(),
            steering: DEFAULT_THROTTLE,
            throttle: DEFAULT_THROTTLE,
            secondary_steering: DEFAULT_THROTTLE,
            secondary_throttle: DEFAULT_THROTTLE,
            record: RecordSwitch::default(),
            drive_mode: DriveModeBands::three_band(),
            secondary_select: SecondarySelect::default(),
            feedback: ThresholdTable::default(),
        }
    }

    /// 6 通道固件预设（两段驾驶模式，早期转向标定）
    pub fn legacy() -> Self {
        Self {
            format: FrameFormat::Legacy,
            layout: ChannelLayout::legacy(),
            steering: DEFAULT_STEERING,
            throttle: DEFAULT_THROTTLE,
            secondary_steering: DEFAULT_STEERING,
            secondary_throttle: DEFAULT_THROTTLE,
            record: RecordSwitch::default(),
            drive_mode: DriveModeBands::two_band(),
            secondary_select: SecondarySelect::default(),
            feedback: ThresholdTable::default(),
        }
    }

    pub fn for_format(format: FrameFormat) -> Self {
        match format {
            FrameFormat::Extended => Self::extended(),
            FrameFormat::Legacy => Self::legacy(),
        }
    }

    /// 校验所有标定与通道分配
    pub fn validate(&self) -> Result<(), ProtocolError> {
        self.layout.validate(self.format)?;
        self.steering.validate()?;
        self.throttle.validate()?;
        self.secondary_steering.validate()?;
        self.secondary_throttle.validate()?;
        self.drive_mode.validate()?;
        self.feedback.validate()?;
        Ok(())
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::extended()
    }
}

/// 单行解码结果
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// 已写入状态，`field_errors` 为保留旧值的字段数
    Applied { field_errors: usize },
    /// 整行丢弃，状态未修改
    Rejected(ProtocolError),
}

impl DecodeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, DecodeOutcome::Applied { .. })
    }
}

/// 一行数据解码后的待写入值，`None` 表示不修改该字段
#[derive(Debug, Default)]
struct Decoded {
    steering: Option<f32>,
    throttle: Option<f32>,
    secondary_steering: Option<f32>,
    secondary_throttle: Option<f32>,
    throttle_feedback: Option<f32>,
    record_enabled: Option<bool>,
    drive_mode: Option<DriveMode>,
    use_secondary_rc: Option<bool>,
    distance_cm: Option<i32>,
}

/// 行解码器
#[derive(Debug, Clone)]
pub struct LineDecoder {
    config: DecoderConfig,
}

impl LineDecoder {
    /// 创建解码器
    ///
    /// # 错误
    /// 配置校验失败时返回 `ProtocolError::InvalidConfig`
    pub fn new(config: DecoderConfig) -> Result<Self, ProtocolError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// 解码一行并写入共享状态
    ///
    /// # Example
    ///
    /// ```
    /// use rc_driver::{BridgeContext, DecoderConfig, LineDecoder};
    /// use rc_protocol::DriveMode;
    ///
    /// let decoder = LineDecoder::new(DecoderConfig::legacy()).unwrap();
    /// let ctx = BridgeContext::new();
    /// decoder.decode_line("12345,1500,1500,0,0,998,1987,50\n", &ctx);
    ///
    /// let state = ctx.snapshot();
    /// assert!(state.record_enabled);
    /// assert_eq!(state.drive_mode, DriveMode::Pilot);
    /// ```
    pub fn decode_line(&self, line: &str, ctx: &BridgeContext) -> DecodeOutcome {
        trace!("decoding line {:?}", line);

        let frame = match ChannelFrame::parse(line, self.config.format) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping malformed serial line {:?}: {}", line.trim_end(), e);
                return DecodeOutcome::Rejected(e);
            },
        };

        let (decoded, field_errors) = self.decode_frame(&frame);

        let (previous_record, previous_mode, current) = ctx.update(|state| {
            let previous_record = state.record_enabled;
            let previous_mode = state.drive_mode;
            apply(&decoded, frame.timestamp, state);
            (previous_record, previous_mode, *state)
        });

        if decoded.record_enabled.is_some() && previous_record != current.record_enabled {
            info!("Record toggled: {}", current.record_enabled);
        }
        if decoded.drive_mode.is_some() && previous_mode != current.drive_mode {
            info!("Drive mode changed: {} -> {}", previous_mode, current.drive_mode);
        }

        DecodeOutcome::Applied { field_errors }
    }

    /// 锁外完成所有映射与分类
    fn decode_frame(&self, frame: &ChannelFrame) -> (Decoded, usize) {
        let cfg = &self.config;
        let layout = &cfg.layout;
        let mut errors = 0;
        let mut decoded = Decoded::default();

        if let Some(raw) = role_value(frame, layout.steering, "steering", &mut errors) {
            let value = cfg.steering.to_percent(raw);
            debug!("steering: raw={} value={:.3}", raw, value);
            decoded.steering = Some(value);
        }
        if let Some(raw) = role_value(frame, layout.throttle, "throttle", &mut errors) {
            let value = cfg.throttle.to_percent(raw);
            debug!("throttle: raw={} value={:.3}", raw, value);
            decoded.throttle = Some(value);
        }
        if let Some(raw) = role_value(frame, layout.secondary_select, "secondary_select", &mut errors)
        {
            decoded.use_secondary_rc = Some(cfg.secondary_select.classify(raw));
        }
        if let Some(raw) =
            role_value(frame, layout.throttle_feedback, "throttle_feedback", &mut errors)
        {
            let value = cfg.feedback.value_of(raw) as f32;
            debug!("throttle_feedback: raw={} value={:.3}", raw, value);
            decoded.throttle_feedback = Some(value);
        }
        if let Some(raw) = role_value(frame, layout.record, "record", &mut errors) {
            decoded.record_enabled = Some(cfg.record.classify(raw));
        }
        if let Some(raw) = role_value(frame, layout.drive_mode, "drive_mode", &mut errors) {
            decoded.drive_mode = cfg.drive_mode.classify(raw);
        }
        if let Some(raw) =
            role_value(frame, layout.secondary_steering, "secondary_steering", &mut errors)
        {
            decoded.secondary_steering = Some(cfg.secondary_steering.to_percent(raw));
        }
        if let Some(raw) =
            role_value(frame, layout.secondary_throttle, "secondary_throttle", &mut errors)
        {
            decoded.secondary_throttle = Some(cfg.secondary_throttle.to_percent(raw));
        }

        if cfg.format == FrameFormat::Legacy
            && let Some(sensor) = frame.sensor
        {
            match i32::try_from(sensor) {
                Ok(distance) => decoded.distance_cm = Some(distance),
                Err(_) => {
                    error!("Distance value {} out of range, keeping previous value", sensor);
                    errors += 1;
                },
            }
        }

        (decoded, errors)
    }
}

/// 读取某个角色对应的通道值；角色未分配时静默返回 `None`
fn role_value(
    frame: &ChannelFrame,
    channel: Option<usize>,
    role: &str,
    errors: &mut usize,
) -> Option<i32> {
    let index = channel?;
    match frame.channel(index) {
        Some(raw) => Some(raw),
        None => {
            error!(
                "Failed to parse {} value on channel {}, keeping previous value",
                role, index
            );
            *errors += 1;
            None
        },
    }
}

fn apply(decoded: &Decoded, timestamp: u64, state: &mut VehicleState) {
    if let Some(v) = decoded.steering {
        state.steering = v;
    }
    if let Some(v) = decoded.throttle {
        state.throttle = v;
    }
    if let Some(v) = decoded.secondary_steering {
        state.secondary_steering = v;
    }
    if let Some(v) = decoded.secondary_throttle {
        state.secondary_throttle = v;
    }
    if let Some(v) = decoded.throttle_feedback {
        state.throttle_feedback = v;
    }
    if let Some(v) = decoded.record_enabled {
        state.record_enabled = v;
    }
    if let Some(v) = decoded.drive_mode {
        state.drive_mode = v;
    }
    if let Some(v) = decoded.use_secondary_rc {
        state.use_secondary_rc = v;
    }
    if let Some(v) = decoded.distance_cm {
        state.distance_cm = Some(v);
    }
    state.last_timestamp = timestamp;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(config: DecoderConfig, line: &str) -> (DecodeOutcome, VehicleState) {
        let decoder = LineDecoder::new(config).unwrap();
        let ctx = BridgeContext::new();
        let outcome = decoder.decode_line(line, &ctx);
        (outcome, ctx.snapshot())
    }

    #[test]
    fn test_extended_line() {
        let (outcome, state) = decode(
            DecoderConfig::extended(),
            "12345,1463,1954,1012,800,998,1987,1463,1463,0,50\n",
        );
        assert_eq!(outcome, DecodeOutcome::Applied { field_errors: 0 });
        assert_eq!(state.last_timestamp, 12345);
        assert_eq!(state.steering, 0.0);
        assert_eq!(state.throttle, 1.0);
        assert!(!state.use_secondary_rc);
        assert!((state.throttle_feedback - 0.275).abs() < 1e-6);
        assert!(state.record_enabled);
        assert_eq!(state.drive_mode, DriveMode::Pilot);
    }

    #[test]
    fn test_legacy_line_with_distance() {
        let (outcome, state) = decode(
            DecoderConfig::legacy(),
            "12345,1958,998,0,0,1987,998,50,42\n",
        );
        assert!(outcome.is_applied());
        assert!((state.steering - 0.9569).abs() < 0.001);
        assert!(!state.record_enabled);
        assert_eq!(state.drive_mode, DriveMode::User);
        assert_eq!(state.distance_cm, Some(42));
    }

    #[test]
    fn test_rejected_line_leaves_state_unchanged() {
        let decoder = LineDecoder::new(DecoderConfig::extended()).unwrap();
        let ctx = BridgeContext::new();
        decoder.decode_line("1,1500,1500,1000,0,998,1987,1500,1500,0,50\n", &ctx);
        let before = ctx.snapshot();

        let outcome = decoder.decode_line("12350,invalid line\n", &ctx);
        assert!(matches!(
            outcome,
            DecodeOutcome::Rejected(ProtocolError::FieldCount { .. })
        ));
        assert_eq!(ctx.snapshot(), before);
    }

    #[test]
    fn test_field_error_keeps_previous_value() {
        let decoder = LineDecoder::new(DecoderConfig::extended()).unwrap();
        let ctx = BridgeContext::new();
        decoder.decode_line("1,1954,1954,1000,0,998,1987,1500,1500,0,50\n", &ctx);

        let outcome = decoder.decode_line(
            "2,99999999999,972,1000,0,1900,1987,1500,1500,0,50\n",
            &ctx,
        );
        assert_eq!(outcome, DecodeOutcome::Applied { field_errors: 1 });

        let state = ctx.snapshot();
        assert_eq!(state.steering, 1.0);
        assert_eq!(state.throttle, -1.0);
        assert!(!state.record_enabled);
        assert_eq!(state.last_timestamp, 2);
    }

    #[test]
    fn test_negative_drive_mode_keeps_previous() {
        let decoder = LineDecoder::new(DecoderConfig::extended()).unwrap();
        let ctx = BridgeContext::new();
        decoder.decode_line("1,1500,1500,1000,0,998,1500,1500,1500,0,50\n", &ctx);
        assert_eq!(ctx.snapshot().drive_mode, DriveMode::Copilot);

        decoder.decode_line("2,1500,1500,1000,0,998,-1,1500,1500,0,50\n", &ctx);
        assert_eq!(ctx.snapshot().drive_mode, DriveMode::Copilot);
    }

    #[test]
    fn test_secondary_select_switches_effective_values() {
        let (_, state) = decode(
            DecoderConfig::extended(),
            "1,1000,1000,1950,0,998,998,2000,2008,0,50\n",
        );
        assert!(state.use_secondary_rc);
        assert_eq!(state.throttle(), 1.0);
        assert_eq!(state.steering(), 1.0);
        assert!(state.throttle < 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DecoderConfig {
            layout: ChannelLayout::extended(),
            ..DecoderConfig::legacy()
        };
        assert!(LineDecoder::new(config).is_err());
    }
}
