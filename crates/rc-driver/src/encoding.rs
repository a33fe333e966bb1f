//! 消息负载编码
//!
//! 发布线程只产出带类型的值，负载格式在此统一处理。编码是纯函数：
//! 同一个值永远得到相同的字节。

use rc_protocol::DriveMode;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// 一条待发布的通道值
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValue {
    Throttle(f32),
    Steering(f32),
    ThrottleFeedback(f32),
    DriveMode(DriveMode),
    SwitchRecord(bool),
    DistanceCm(i32),
}

/// 负载格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadEncoding {
    /// 纯文本：浮点 `{:.2}`、`ON`/`OFF`、模式名
    #[default]
    Text,
    /// JSON 消息（带置信度字段，模式为数值编码）
    Json,
}

impl FromStr for PayloadEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(PayloadEncoding::Text),
            "json" => Ok(PayloadEncoding::Json),
            other => Err(format!(
                "unknown payload encoding '{}', expected 'text' or 'json'",
                other
            )),
        }
    }
}

impl fmt::Display for PayloadEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadEncoding::Text => f.write_str("text"),
            PayloadEncoding::Json => f.write_str("json"),
        }
    }
}

#[derive(Serialize)]
struct ThrottleMessage {
    throttle: f32,
    confidence: f32,
}

#[derive(Serialize)]
struct SteeringMessage {
    steering: f32,
    confidence: f32,
}

#[derive(Serialize)]
struct DriveModeMessage {
    drive_mode: u8,
}

/// 结构化消息沿用下游约定：`enabled` 与开关读数取反
#[derive(Serialize)]
struct SwitchRecordMessage {
    enabled: bool,
}

#[derive(Serialize)]
struct DistanceMessage {
    distance_cm: i32,
}

impl PayloadEncoding {
    /// 编码一条通道值
    ///
    /// # 错误
    /// JSON 序列化失败时返回 `serde_json::Error`
    pub fn encode(&self, value: ChannelValue) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            PayloadEncoding::Text => Ok(encode_text(value).into_bytes()),
            PayloadEncoding::Json => encode_json(value),
        }
    }
}

fn encode_text(value: ChannelValue) -> String {
    match value {
        ChannelValue::Throttle(v) | ChannelValue::Steering(v) | ChannelValue::ThrottleFeedback(v) => {
            format!("{:.2}", v)
        },
        ChannelValue::DriveMode(mode) => mode.as_str().to_string(),
        ChannelValue::SwitchRecord(true) => "ON".to_string(),
        ChannelValue::SwitchRecord(false) => "OFF".to_string(),
        ChannelValue::DistanceCm(d) => d.to_string(),
    }
}

fn encode_json(value: ChannelValue) -> Result<Vec<u8>, serde_json::Error> {
    match value {
        ChannelValue::Throttle(v) | ChannelValue::ThrottleFeedback(v) => {
            serde_json::to_vec(&ThrottleMessage {
                throttle: v,
                confidence: 1.0,
            })
        },
        ChannelValue::Steering(v) => serde_json::to_vec(&SteeringMessage {
            steering: v,
            confidence: 1.0,
        }),
        ChannelValue::DriveMode(mode) => serde_json::to_vec(&DriveModeMessage {
            drive_mode: mode.into(),
        }),
        ChannelValue::SwitchRecord(record) => {
            serde_json::to_vec(&SwitchRecordMessage { enabled: !record })
        },
        ChannelValue::DistanceCm(distance_cm) => {
            serde_json::to_vec(&DistanceMessage { distance_cm })
        },
    }
}
