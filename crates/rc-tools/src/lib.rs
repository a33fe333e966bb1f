//! # RC Tools
//!
//! 桥接程序的配置文件支持：
//!
//! - `config`: TOML 桥接配置（串口、MQTT、发布、标定覆盖）
//! - `calibration`: JSON 油门反馈阈值表

pub mod calibration;
pub mod config;

pub use calibration::{load_threshold_table, parse_threshold_table, save_threshold_table};
pub use config::{
    BridgeFileConfig, DriveModeSection, FeedbackSection, MqttSection, PublishSection, PwmSection,
    SerialSection, ThresholdSection, TopicsSection, load_bridge_config,
};
