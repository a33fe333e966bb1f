//! MQTT 发布端
//!
//! 基于 rumqttc 同步客户端；网络事件循环运行在独立的 `rc-mqtt` 线程中，
//! 断线后由 rumqttc 自动重连。

use crate::args::MqttSettings;
use anyhow::{Context, Result, bail};
use rc_driver::{MessageSink, SinkError};
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_MQTT_PORT: u16 = 1883;
const REQUEST_CAPACITY: usize = 64;
const KEEP_ALIVE: Duration = Duration::from_secs(10);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// 解析 broker 地址
///
/// 支持 `tcp://host:port`、`mqtt://host:port`、`host:port` 与 `host`（默认端口 1883）。
pub fn parse_broker(broker: &str) -> Result<(String, u16)> {
    let rest = match broker.split_once("://") {
        Some(("tcp" | "mqtt", rest)) => rest,
        Some((scheme, _)) => bail!("unsupported MQTT broker scheme '{}'", scheme),
        None => broker,
    };
    let rest = rest.trim_end_matches('/');

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("invalid MQTT broker port in '{}'", broker))?;
            (host, port)
        },
        None => (rest, DEFAULT_MQTT_PORT),
    };
    if host.is_empty() {
        bail!("missing MQTT broker host in '{}'", broker);
    }
    Ok((host.to_string(), port))
}

/// 数值 QoS → [`QoS`]
pub fn qos_from_u8(qos: u8) -> Result<QoS> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => bail!("invalid MQTT QoS {}, expected 0, 1 or 2", other),
    }
}

/// MQTT 消息 sink
pub struct MqttSink {
    client: Client,
    qos: QoS,
    retain: bool,
    closing: Arc<AtomicBool>,
    event_thread: Option<JoinHandle<()>>,
}

impl MqttSink {
    /// 创建客户端并启动事件循环线程
    ///
    /// 连接在后台建立，broker 不可达时不会阻塞启动。
    pub fn connect(settings: &MqttSettings) -> Result<Self> {
        let (host, port) = parse_broker(&settings.broker)?;
        let qos = qos_from_u8(settings.qos)?;

        let mut options = MqttOptions::new(settings.client_id.clone(), host, port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);
        if let Some(username) = &settings.username {
            options.set_credentials(
                username.clone(),
                settings.password.clone().unwrap_or_default(),
            );
        }

        let (client, connection) = Client::new(options, REQUEST_CAPACITY);
        let closing = Arc::new(AtomicBool::new(false));
        let closing_clone = closing.clone();
        let broker = settings.broker.clone();

        let event_thread = thread::Builder::new()
            .name("rc-mqtt".into())
            .spawn(move || event_loop(connection, &broker, &closing_clone))
            .context("failed to spawn MQTT event thread")?;

        info!(
            "MQTT client '{}' connecting to {} (qos={}, retain={})",
            settings.client_id, settings.broker, settings.qos, settings.retain
        );

        Ok(Self {
            client,
            qos,
            retain: settings.retain,
            closing,
            event_thread: Some(event_thread),
        })
    }
}

fn event_loop(mut connection: Connection, broker: &str, closing: &AtomicBool) {
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!("Connected to MQTT broker {} ({:?})", broker, ack.code);
            },
            Ok(event) => {
                debug!("MQTT event: {:?}", event);
            },
            Err(e) => {
                if closing.load(Ordering::Acquire) {
                    break;
                }
                warn!("MQTT connection error: {}", e);
                thread::sleep(RECONNECT_DELAY);
            },
        }
    }
    debug!("MQTT event thread exited");
}

impl MessageSink for MqttSink {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        self.client
            .try_publish(topic, self.qos, self.retain, payload)
            .map_err(|e| SinkError::Publish {
                topic: topic.to_string(),
                message: e.to_string(),
            })
    }
}

impl Drop for MqttSink {
    fn drop(&mut self) {
        self.closing.store(true, Ordering::Release);
        if let Err(e) = self.client.disconnect() {
            debug!("MQTT disconnect failed: {}", e);
        }
        if let Some(handle) = self.event_thread.take()
            && handle.join().is_err()
        {
            warn!("MQTT event thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_broker() {
        assert_eq!(
            parse_broker("tcp://127.0.0.1:1883").unwrap(),
            ("127.0.0.1".to_string(), 1883)
        );
        assert_eq!(
            parse_broker("mqtt://broker.local:8883/").unwrap(),
            ("broker.local".to_string(), 8883)
        );
        assert_eq!(
            parse_broker("localhost").unwrap(),
            ("localhost".to_string(), 1883)
        );
        assert_eq!(
            parse_broker("example.com:1884").unwrap(),
            ("example.com".to_string(), 1884)
        );
    }

    #[test]
    fn test_parse_broker_errors() {
        assert!(parse_broker("ws://broker:80").is_err());
        assert!(parse_broker("tcp://broker:port").is_err());
        assert!(parse_broker("tcp://:1883").is_err());
        assert!(parse_broker("").is_err());
    }

    #[test]
    fn test_qos_from_u8() {
        assert_eq!(qos_from_u8(0).unwrap(), QoS::AtMostOnce);
        assert_eq!(qos_from_u8(1).unwrap(), QoS::AtLeastOnce);
        assert_eq!(qos_from_u8(2).unwrap(), QoS::ExactlyOnce);
        assert!(qos_from_u8(3).is_err());
    }
}
