//! Builder 模式实现
//!
//! 提供链式构造 `RcBridge` 实例的便捷方式。

use crate::bridge::{BridgeConfig, RcBridge};
use crate::decoder::DecoderConfig;
use crate::encoding::PayloadEncoding;
use crate::error::DriverError;
use crate::sink::{MessageSink, Topics};
use rc_serial::LineSource;
use std::sync::Arc;

/// RcBridge Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use rc_driver::{DecoderConfig, LogSink, PayloadEncoding, RcBridgeBuilder, Topics};
/// use rc_serial::SerialPortSource;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let source = SerialPortSource::open("/dev/serial0", 115200, Duration::from_millis(100)).unwrap();
/// let bridge = RcBridgeBuilder::new()
///     .decoder_config(DecoderConfig::legacy())
///     .topics(Topics::with_base("robocar/rc"))
///     .encoding(PayloadEncoding::Json)
///     .publish_frequency(25.0)
///     .build(source, Arc::new(LogSink))
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct RcBridgeBuilder {
    config: BridgeConfig,
}

impl RcBridgeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置解码配置（默认 9 通道预设）
    pub fn decoder_config(mut self, decoder: DecoderConfig) -> Self {
        self.config.decoder = decoder;
        self
    }

    pub fn topics(mut self, topics: Topics) -> Self {
        self.config.topics = topics;
        self
    }

    pub fn encoding(mut self, encoding: PayloadEncoding) -> Self {
        self.config.encoding = encoding;
        self
    }

    /// 设置发布频率（Hz，默认 25）
    pub fn publish_frequency(mut self, hz: f64) -> Self {
        self.config.publish_frequency = hz;
        self
    }

    /// 当前累积的配置
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// 启动桥接
    ///
    /// # 错误
    /// 同 [`RcBridge::start`]
    pub fn build(
        self,
        source: impl LineSource + Send + 'static,
        sink: Arc<dyn MessageSink>,
    ) -> Result<RcBridge, DriverError> {
        RcBridge::start(source, sink, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::mock::RecordingSink;
    use rc_protocol::FrameFormat;
    use rc_serial::mock::ChannelLineSource;

    #[test]
    fn test_builder_accumulates_config() {
        let builder = RcBridgeBuilder::new()
            .decoder_config(DecoderConfig::legacy())
            .topics(Topics::with_base("car"))
            .encoding(PayloadEncoding::Json)
            .publish_frequency(10.0);
        let config = builder.config();
        assert_eq!(config.decoder.format, FrameFormat::Legacy);
        assert_eq!(config.topics.throttle, "car/throttle");
        assert_eq!(config.encoding, PayloadEncoding::Json);
        assert_eq!(config.publish_frequency, 10.0);
    }

    #[test]
    fn test_builder_build() {
        let (_tx, source) = ChannelLineSource::new();
        let mut bridge = RcBridgeBuilder::new()
            .build(source, Arc::new(RecordingSink::new()))
            .unwrap();
        assert!(bridge.is_healthy());
        bridge.stop();
    }
}
