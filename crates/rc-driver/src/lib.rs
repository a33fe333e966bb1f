//! # RC Driver
//!
//! RC 接收机桥接驱动层：
//! - 读取线程：逐行解码串口数据，写入共享状态
//! - 发布线程：按固定频率发布最新状态
//! - 共享状态：单把互斥锁保护的 `VehicleState`
//!
//! 消息总线通过 [`MessageSink`] 注入，行数据源通过 [`rc_serial::LineSource`] 注入。

mod bridge;
mod builder;
pub mod decoder;
pub mod encoding;
mod error;
pub mod metrics;
pub mod pipeline;
pub mod sink;
pub mod state;

pub use bridge::{BridgeConfig, RcBridge};
pub use builder::RcBridgeBuilder;
pub use decoder::{DecodeOutcome, DecoderConfig, LineDecoder};
pub use encoding::{ChannelValue, PayloadEncoding};
pub use error::{DriverError, SinkError};
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use pipeline::{
    DEFAULT_PUBLISH_FREQUENCY, ReaderExit, period_from_frequency, publish_loop, publish_snapshot,
    publish_value, reader_loop,
};
pub use sink::{LogSink, MessageSink, Topics};
pub use state::{BridgeContext, VehicleState};
