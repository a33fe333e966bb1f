//! 读取线程与发布线程
//!
//! - `reader_loop`: 阻塞读取行数据，逐行解码写入共享状态
//! - `publish_loop`: 按固定周期复制一份状态快照并逐主题发布
//!
//! 两个线程之间只通过 [`BridgeContext`] 的互斥锁交换数据，没有队列：
//! 发布线程永远发布最新状态，读取线程从不等待发布。

use crate::decoder::{DecodeOutcome, LineDecoder};
use crate::encoding::{ChannelValue, PayloadEncoding};
use crate::error::{DriverError, SinkError};
use crate::metrics::BridgeMetrics;
use crate::sink::{MessageSink, Topics};
use crate::state::BridgeContext;
use crossbeam_channel::{Receiver, select};
use rc_serial::{LineSource, SerialError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 默认发布频率（Hz）
pub const DEFAULT_PUBLISH_FREQUENCY: f64 = 25.0;

/// 读取线程退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// 对端关闭（EOF）
    EndOfStream,
    /// 运行标志被清除
    Stopped,
    /// 底层读取失败
    Failed,
}

/// 将发布频率转换为周期
///
/// # 错误
/// 频率不是有限正数，或周期无法表示时返回 `DriverError::InvalidFrequency`
pub fn period_from_frequency(hz: f64) -> Result<Duration, DriverError> {
    if !hz.is_finite() || hz <= 0.0 {
        return Err(DriverError::InvalidFrequency(hz));
    }
    match Duration::try_from_secs_f64(1.0 / hz) {
        Ok(period) if !period.is_zero() => Ok(period),
        _ => Err(DriverError::InvalidFrequency(hz)),
    }
}

/// 读取线程主循环
///
/// 每次读超时都会检查 `is_running`，因此停止延迟不超过数据源的读超时。
/// 单行失败不重试，直接读下一行。
pub fn reader_loop(
    mut source: impl LineSource,
    decoder: LineDecoder,
    ctx: Arc<BridgeContext>,
    metrics: Arc<BridgeMetrics>,
    is_running: Arc<AtomicBool>,
) -> ReaderExit {
    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("Reader thread: is_running flag is false, exiting");
            return ReaderExit::Stopped;
        }

        let line = match source.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => {
                warn!("Serial stream ended: remote connection closed");
                return ReaderExit::EndOfStream;
            },
            Err(SerialError::Timeout) => {
                metrics.read_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(e) => {
                error!("Reader thread: unable to read serial line: {}", e);
                return ReaderExit::Failed;
            },
        };

        metrics.lines_total.fetch_add(1, Ordering::Relaxed);
        match decoder.decode_line(&line, &ctx) {
            DecodeOutcome::Applied { field_errors } => {
                metrics.lines_valid.fetch_add(1, Ordering::Relaxed);
                if field_errors > 0 {
                    metrics
                        .field_errors
                        .fetch_add(field_errors as u64, Ordering::Relaxed);
                }
            },
            DecodeOutcome::Rejected(_) => {
                metrics.lines_rejected.fetch_add(1, Ordering::Relaxed);
            },
        }
    }
}

/// 发布线程主循环
///
/// 收到停止消息或发送端全部关闭时退出，定时器随之释放。
pub fn publish_loop(
    ctx: Arc<BridgeContext>,
    sink: Arc<dyn MessageSink>,
    topics: Topics,
    encoding: PayloadEncoding,
    period: Duration,
    shutdown_rx: Receiver<()>,
    metrics: Arc<BridgeMetrics>,
) {
    info!(
        "Publisher thread started: period {:?}, {} payloads",
        period, encoding
    );
    let ticker = crossbeam_channel::tick(period);

    loop {
        select! {
            recv(shutdown_rx) -> _ => {
                info!("Publisher thread: shutdown requested, exiting");
                break;
            },
            recv(ticker) -> _ => {
                publish_snapshot(&ctx, sink.as_ref(), &topics, encoding, &metrics);
            },
        }
    }
}

/// 发布一次当前状态
///
/// 只在复制快照时持有锁；编码与发布都在锁外进行。
/// 返回成功发布的消息数。
pub fn publish_snapshot(
    ctx: &BridgeContext,
    sink: &dyn MessageSink,
    topics: &Topics,
    encoding: PayloadEncoding,
    metrics: &BridgeMetrics,
) -> usize {
    let state = ctx.snapshot();
    metrics.publish_ticks.fetch_add(1, Ordering::Relaxed);

    let mut messages = vec![
        (&topics.throttle, ChannelValue::Throttle(state.throttle())),
        (
            &topics.throttle_feedback,
            ChannelValue::ThrottleFeedback(state.throttle_feedback),
        ),
        (&topics.steering, ChannelValue::Steering(state.steering())),
        (&topics.drive_mode, ChannelValue::DriveMode(state.drive_mode)),
        (
            &topics.switch_record,
            ChannelValue::SwitchRecord(state.record_enabled),
        ),
    ];
    if let (Some(topic), Some(distance)) = (&topics.distance_cm, state.distance_cm) {
        messages.push((topic, ChannelValue::DistanceCm(distance)));
    }

    let mut published = 0;
    for (topic, value) in messages {
        match publish_value(sink, topic, encoding, value) {
            Ok(()) => {
                debug!("published {:?} to {}", value, topic);
                published += 1;
            },
            Err(e) => {
                error!("Unable to publish {:?}: {}", value, e);
                metrics.publish_errors.fetch_add(1, Ordering::Relaxed);
            },
        }
    }
    metrics
        .messages_published
        .fetch_add(published as u64, Ordering::Relaxed);
    published
}

/// 编码并发布单条消息
///
/// # 错误
/// - `SinkError::Encode`: 负载编码失败
/// - `SinkError::Publish`: sink 拒绝该消息
pub fn publish_value(
    sink: &dyn MessageSink,
    topic: &str,
    encoding: PayloadEncoding,
    value: ChannelValue,
) -> Result<(), SinkError> {
    let payload = encoding.encode(value).map_err(|e| SinkError::Encode {
        topic: topic.to_string(),
        message: e.to_string(),
    })?;
    sink.publish(topic, payload)
}
