//! # 桥接配置文件
//!
//! TOML 格式，所有段落均可省略（使用行格式对应的预设）：
//!
//! ```toml
//! format = "legacy"
//!
//! [serial]
//! device = "/dev/ttyUSB0"
//! baud = 115200
//!
//! [mqtt]
//! broker = "tcp://127.0.0.1:1883"
//! client_id = "robocar-rc"
//!
//! [publish]
//! frequency = 25.0
//! encoding = "json"
//! topic_base = "robocar/rc"
//!
//! [steering]
//! min = 960
//! max = 1980
//! center = 1470
//!
//! [drive_mode]
//! pilot_above = 1800
//! copilot_above = 1200
//!
//! [feedback]
//! threshold_file = "throttle_feedback.json"
//! ```

use crate::calibration::load_threshold_table;
use anyhow::{Context, Result};
use rc_driver::{DecoderConfig, PayloadEncoding, Topics};
use rc_protocol::{DriveModeBands, FrameFormat, PwmRange, RecordSwitch, SecondarySelect};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 桥接配置文件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeFileConfig {
    /// 行格式（默认 extended）
    pub format: Option<FrameFormat>,
    pub serial: SerialSection,
    pub mqtt: MqttSection,
    pub publish: PublishSection,
    pub topics: TopicsSection,
    pub steering: Option<PwmSection>,
    pub throttle: Option<PwmSection>,
    pub secondary_steering: Option<PwmSection>,
    pub secondary_throttle: Option<PwmSection>,
    pub drive_mode: Option<DriveModeSection>,
    pub record: Option<ThresholdSection>,
    pub secondary: Option<ThresholdSection>,
    pub feedback: FeedbackSection,
}

/// 串口设置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialSection {
    pub device: Option<String>,
    pub baud: Option<u32>,
    pub read_timeout_ms: Option<u64>,
}

/// MQTT 连接设置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MqttSection {
    pub broker: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub qos: Option<u8>,
    pub retain: Option<bool>,
}

/// 发布设置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishSection {
    /// 发布频率（Hz）
    pub frequency: Option<f64>,
    /// `text` 或 `json`
    pub encoding: Option<String>,
    pub topic_base: Option<String>,
}

/// 单个主题覆盖
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopicsSection {
    pub throttle: Option<String>,
    pub steering: Option<String>,
    pub drive_mode: Option<String>,
    pub switch_record: Option<String>,
    pub throttle_feedback: Option<String>,
    pub distance_cm: Option<String>,
}

/// PWM 标定；省略 `center` 时取算术中点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PwmSection {
    pub min: i32,
    pub max: i32,
    pub center: Option<i32>,
}

impl PwmSection {
    pub fn to_range(self) -> PwmRange {
        match self.center {
            Some(center) => PwmRange::asymmetric(self.min, self.max, center),
            None => PwmRange::new(self.min, self.max),
        }
    }
}

/// 驾驶模式分段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriveModeSection {
    pub pilot_above: Option<i32>,
    pub copilot_above: Option<i32>,
    /// 关闭 Copilot 段（User / Pilot 两段）
    pub two_band: bool,
}

impl DriveModeSection {
    fn apply(self, preset: DriveModeBands) -> DriveModeBands {
        let copilot_above = if self.two_band {
            None
        } else {
            self.copilot_above.or(preset.copilot_above)
        };
        DriveModeBands {
            pilot_above: self.pilot_above.unwrap_or(preset.pilot_above),
            copilot_above,
        }
    }
}

/// 单阈值开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdSection {
    pub threshold: i32,
}

/// 油门反馈标定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedbackSection {
    /// JSON 阈值表路径，相对路径以配置文件所在目录为基准
    pub threshold_file: Option<PathBuf>,
}

/// 加载桥接配置文件
///
/// `feedback.threshold_file` 的相对路径会被解析为相对于配置文件目录。
pub fn load_bridge_config<P: AsRef<Path>>(path: P) -> Result<BridgeFileConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    let mut config = BridgeFileConfig::from_toml(&content)
        .with_context(|| format!("invalid config file {}", path.display()))?;

    if let Some(file) = config.feedback.threshold_file.as_mut()
        && file.is_relative()
        && let Some(dir) = path.parent()
    {
        *file = dir.join(&*file);
    }
    Ok(config)
}

impl BridgeFileConfig {
    /// 解析 TOML 文本
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 序列化为 TOML 文本
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 行格式（未配置时为 extended）
    pub fn frame_format(&self) -> FrameFormat {
        self.format.unwrap_or_default()
    }

    /// 生成解码配置：格式预设 + 文件覆盖，并校验
    pub fn decoder_config(&self) -> Result<DecoderConfig> {
        let mut config = DecoderConfig::for_format(self.frame_format());

        if let Some(section) = self.steering {
            config.steering = section.to_range();
        }
        if let Some(section) = self.throttle {
            config.throttle = section.to_range();
        }
        if let Some(section) = self.secondary_steering {
            config.secondary_steering = section.to_range();
        }
        if let Some(section) = self.secondary_throttle {
            config.secondary_throttle = section.to_range();
        }
        if let Some(section) = self.drive_mode {
            config.drive_mode = section.apply(config.drive_mode);
        }
        if let Some(section) = self.record {
            config.record = RecordSwitch::new(section.threshold);
        }
        if let Some(section) = self.secondary {
            config.secondary_select = SecondarySelect::new(section.threshold);
        }
        if let Some(path) = &self.feedback.threshold_file {
            config.feedback = load_threshold_table(path)?;
        }

        config.validate().context("invalid decoder configuration")?;
        Ok(config)
    }

    /// 负载格式（未配置时为 `None`）
    pub fn encoding(&self) -> Result<Option<PayloadEncoding>> {
        self.publish
            .encoding
            .as_deref()
            .map(|s| s.parse::<PayloadEncoding>().map_err(anyhow::Error::msg))
            .transpose()
    }

    /// 生成发布主题：`topic_base` 前缀 + 单个主题覆盖
    ///
    /// `base` 优先于文件中的 `publish.topic_base`。
    pub fn topics(&self, base: Option<&str>) -> Topics {
        let base = base
            .or(self.publish.topic_base.as_deref())
            .unwrap_or("robocar/rc");
        let mut topics = Topics::with_base(base);
        let overrides = &self.topics;
        if let Some(t) = &overrides.throttle {
            topics.throttle = t.clone();
        }
        if let Some(t) = &overrides.steering {
            topics.steering = t.clone();
        }
        if let Some(t) = &overrides.drive_mode {
            topics.drive_mode = t.clone();
        }
        if let Some(t) = &overrides.switch_record {
            topics.switch_record = t.clone();
        }
        if let Some(t) = &overrides.throttle_feedback {
            topics.throttle_feedback = t.clone();
        }
        if let Some(t) = &overrides.distance_cm {
            topics.distance_cm = Some(t.clone());
        }
        topics
    }
}
