//! 命令行参数与配置合并
//!
//! 优先级：命令行 / 环境变量 > 配置文件 > 内置默认值。

use anyhow::{Context, Result};
use clap::Parser;
use rc_driver::{DEFAULT_PUBLISH_FREQUENCY, DecoderConfig, PayloadEncoding, Topics};
use rc_protocol::FrameFormat;
use rc_tools::{BridgeFileConfig, load_bridge_config};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DEVICE: &str = "/dev/serial0";
pub const DEFAULT_BAUD: u32 = 115200;
pub const DEFAULT_BROKER: &str = "tcp://127.0.0.1:1883";
pub const DEFAULT_CLIENT_ID: &str = "robocar-rc-bridge";
const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

/// RC 接收机串口 → MQTT 桥接
#[derive(Parser, Debug, Default)]
#[command(name = "rc-bridge")]
#[command(about = "Publish RC receiver channels read from a serial port to MQTT topics", long_about = None)]
#[command(version)]
pub struct Args {
    /// 串口设备（`-` 表示从标准输入读取）
    ///
    /// 默认: /dev/serial0
    #[arg(long, env = "RC_DEVICE")]
    pub device: Option<String>,

    /// 串口波特率
    ///
    /// 默认: 115200
    #[arg(long, env = "RC_BAUD")]
    pub baud: Option<u32>,

    /// 每秒发布次数
    ///
    /// 默认: 25
    #[arg(long = "mqtt-pub-frequency", env = "MQTT_PUB_FREQUENCY")]
    pub pub_frequency: Option<f64>,

    /// 行格式：extended（9 通道）或 legacy（6 通道）
    #[arg(long, env = "RC_FORMAT")]
    pub format: Option<FrameFormat>,

    /// 负载格式：text 或 json
    #[arg(long, env = "MQTT_PAYLOAD_ENCODING")]
    pub encoding: Option<PayloadEncoding>,

    /// TOML 配置文件
    #[arg(long, env = "RC_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// 油门反馈阈值表（JSON），覆盖配置文件中的 `feedback.threshold_file`
    #[arg(long = "threshold-config")]
    pub threshold_config: Option<PathBuf>,

    /// MQTT broker 地址
    #[arg(long = "mqtt-broker", env = "MQTT_BROKER")]
    pub mqtt_broker: Option<String>,

    #[arg(long = "mqtt-username", env = "MQTT_USERNAME")]
    pub mqtt_username: Option<String>,

    #[arg(long = "mqtt-password", env = "MQTT_PASSWORD", hide_env_values = true)]
    pub mqtt_password: Option<String>,

    #[arg(long = "mqtt-client-id", env = "MQTT_CLIENT_ID")]
    pub mqtt_client_id: Option<String>,

    /// MQTT QoS（0、1、2）
    #[arg(long = "mqtt-qos", env = "MQTT_QOS", value_parser = clap::value_parser!(u8).range(0..=2))]
    pub mqtt_qos: Option<u8>,

    /// 发布 retained 消息
    #[arg(long = "mqtt-retain", env = "MQTT_RETAIN")]
    pub mqtt_retain: bool,

    /// 主题前缀
    #[arg(long = "mqtt-topic-base", env = "MQTT_TOPIC_BASE")]
    pub topic_base: Option<String>,

    #[arg(long = "topic-throttle")]
    pub topic_throttle: Option<String>,

    #[arg(long = "topic-steering")]
    pub topic_steering: Option<String>,

    #[arg(long = "topic-drive-mode")]
    pub topic_drive_mode: Option<String>,

    #[arg(long = "topic-switch-record")]
    pub topic_switch_record: Option<String>,

    #[arg(long = "topic-throttle-feedback")]
    pub topic_throttle_feedback: Option<String>,

    /// 距离主题（仅 legacy 格式带距离字段）
    #[arg(long = "topic-distance")]
    pub topic_distance: Option<String>,

    /// 不连接 MQTT，只把要发布的消息写入日志
    #[arg(long)]
    pub dry_run: bool,

    /// 输出原始值与每条发布消息（debug 日志）
    #[arg(long)]
    pub debug: bool,
}

/// MQTT 连接参数
#[derive(Debug, Clone, PartialEq)]
pub struct MqttSettings {
    pub broker: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
    pub qos: u8,
    pub retain: bool,
}

/// 合并后的运行参数
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub device: String,
    pub baud: u32,
    pub read_timeout: Duration,
    pub publish_frequency: f64,
    pub decoder: DecoderConfig,
    pub topics: Topics,
    pub encoding: PayloadEncoding,
    pub mqtt: MqttSettings,
    pub dry_run: bool,
}

impl Args {
    /// 读取配置文件（如有）
    pub fn load_file_config(&self) -> Result<BridgeFileConfig> {
        match &self.config {
            Some(path) => load_bridge_config(path),
            None => Ok(BridgeFileConfig::default()),
        }
    }

    /// 合并命令行与配置文件
    pub fn resolve(&self, mut file: BridgeFileConfig) -> Result<Settings> {
        if let Some(format) = self.format {
            file.format = Some(format);
        }
        if let Some(path) = &self.threshold_config {
            file.feedback.threshold_file = Some(path.clone());
        }
        let decoder = file.decoder_config()?;

        let encoding = match self.encoding {
            Some(encoding) => encoding,
            None => file.encoding()?.unwrap_or_default(),
        };

        let mut topics = file.topics(self.topic_base.as_deref());
        let overrides = [
            (&mut topics.throttle, &self.topic_throttle),
            (&mut topics.steering, &self.topic_steering),
            (&mut topics.drive_mode, &self.topic_drive_mode),
            (&mut topics.switch_record, &self.topic_switch_record),
            (&mut topics.throttle_feedback, &self.topic_throttle_feedback),
        ];
        for (topic, value) in overrides {
            if let Some(value) = value {
                *topic = value.clone();
            }
        }
        if let Some(distance) = &self.topic_distance {
            topics.distance_cm = Some(distance.clone());
        }

        let mqtt_file = &file.mqtt;
        let mqtt = MqttSettings {
            broker: self
                .mqtt_broker
                .clone()
                .or_else(|| mqtt_file.broker.clone())
                .unwrap_or_else(|| DEFAULT_BROKER.to_string()),
            username: self
                .mqtt_username
                .clone()
                .or_else(|| mqtt_file.username.clone()),
            password: self
                .mqtt_password
                .clone()
                .or_else(|| mqtt_file.password.clone()),
            client_id: self
                .mqtt_client_id
                .clone()
                .or_else(|| mqtt_file.client_id.clone())
                .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            qos: self.mqtt_qos.or(mqtt_file.qos).unwrap_or(0),
            retain: self.mqtt_retain || mqtt_file.retain.unwrap_or(false),
        };
        if mqtt.qos > 2 {
            anyhow::bail!("invalid MQTT QoS {}, expected 0, 1 or 2", mqtt.qos);
        }

        let publish_frequency = self
            .pub_frequency
            .or(file.publish.frequency)
            .unwrap_or(DEFAULT_PUBLISH_FREQUENCY);
        rc_driver::period_from_frequency(publish_frequency)
            .context("invalid --mqtt-pub-frequency")?;

        Ok(Settings {
            device: self
                .device
                .clone()
                .or_else(|| file.serial.device.clone())
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            baud: self.baud.or(file.serial.baud).unwrap_or(DEFAULT_BAUD),
            read_timeout: Duration::from_millis(
                file.serial.read_timeout_ms.unwrap_or(DEFAULT_READ_TIMEOUT_MS),
            ),
            publish_frequency,
            decoder,
            topics,
            encoding,
            mqtt,
            dry_run: self.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rc_protocol::DriveModeBands;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rc-bridge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = Args::default()
            .resolve(BridgeFileConfig::default())
            .unwrap();
        assert_eq!(settings.device, DEFAULT_DEVICE);
        assert_eq!(settings.baud, 115200);
        assert_eq!(settings.publish_frequency, 25.0);
        assert_eq!(settings.encoding, PayloadEncoding::Text);
        assert_eq!(settings.decoder, DecoderConfig::extended());
        assert_eq!(settings.mqtt.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(settings.mqtt.qos, 0);
        assert!(!settings.mqtt.retain);
    }

    #[test]
    fn test_flags_parse() {
        let args = parse(&[
            "--device",
            "/dev/ttyUSB0",
            "--baud",
            "57600",
            "--mqtt-pub-frequency",
            "10",
            "--format",
            "legacy",
            "--encoding",
            "json",
            "--mqtt-topic-base",
            "car",
            "--topic-steering",
            "car/angle",
            "--dry-run",
        ]);
        let settings = args.resolve(BridgeFileConfig::default()).unwrap();
        assert_eq!(settings.device, "/dev/ttyUSB0");
        assert_eq!(settings.baud, 57600);
        assert_eq!(settings.publish_frequency, 10.0);
        assert_eq!(settings.decoder.format, FrameFormat::Legacy);
        assert_eq!(settings.decoder.drive_mode, DriveModeBands::two_band());
        assert_eq!(settings.encoding, PayloadEncoding::Json);
        assert_eq!(settings.topics.throttle, "car/throttle");
        assert_eq!(settings.topics.steering, "car/angle");
        assert!(settings.dry_run);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = BridgeFileConfig::from_toml(
            r#"
[serial]
device = "/dev/ttyAMA0"
baud = 9600

[mqtt]
broker = "tcp://broker:1883"
qos = 1

[publish]
frequency = 50.0
"#,
        )
        .unwrap();

        let settings = parse(&["--baud", "230400"]).resolve(file).unwrap();
        assert_eq!(settings.device, "/dev/ttyAMA0");
        assert_eq!(settings.baud, 230400);
        assert_eq!(settings.publish_frequency, 50.0);
        assert_eq!(settings.mqtt.broker, "tcp://broker:1883");
        assert_eq!(settings.mqtt.qos, 1);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(
            Args::try_parse_from(["rc-bridge", "--mqtt-qos", "3"]).is_err()
        );
        assert!(Args::try_parse_from(["rc-bridge", "--format", "twelve"]).is_err());
        assert!(
            parse(&["--mqtt-pub-frequency", "0"])
                .resolve(BridgeFileConfig::default())
                .is_err()
        );
    }

    #[test]
    fn test_config_file_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        std::fs::write(&path, "format = \"legacy\"\n[publish]\nencoding = \"json\"\n").unwrap();

        let args = parse(&["--config", path.to_str().unwrap()]);
        let settings = args.resolve(args.load_file_config().unwrap()).unwrap();
        assert_eq!(settings.decoder.format, FrameFormat::Legacy);
        assert_eq!(settings.encoding, PayloadEncoding::Json);
    }
}
