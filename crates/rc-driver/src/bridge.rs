//! 桥接 API
//!
//! `RcBridge` 持有读取线程与发布线程，封装共享状态与生命周期。

use crate::decoder::{DecoderConfig, LineDecoder};
use crate::encoding::PayloadEncoding;
use crate::error::DriverError;
use crate::metrics::{BridgeMetrics, MetricsSnapshot};
use crate::pipeline::{
    DEFAULT_PUBLISH_FREQUENCY, ReaderExit, period_from_frequency, publish_loop, reader_loop,
};
use crate::sink::{MessageSink, Topics};
use crate::state::{BridgeContext, VehicleState};
use crossbeam_channel::Sender;
use rc_protocol::DriveMode;
use rc_serial::LineSource;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, info};

/// 线程 join 的等待上限
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Extension trait for timeout-capable thread joins
trait JoinTimeout<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<T>;
}

impl<T: Send + 'static> JoinTimeout<T> for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<T> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // watchdog 线程代为 join，超时后由进程退出回收
        std::thread::spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Thread join timeout"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(Box::new(
                std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "Thread panicked during join",
                ),
            )),
        }
    }
}

/// 桥接配置
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub decoder: DecoderConfig,
    pub topics: Topics,
    pub encoding: PayloadEncoding,
    /// 发布频率（Hz）
    pub publish_frequency: f64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            topics: Topics::default(),
            encoding: PayloadEncoding::default(),
            publish_frequency: DEFAULT_PUBLISH_FREQUENCY,
        }
    }
}

/// RC 接收机 → 消息总线桥接
pub struct RcBridge {
    ctx: Arc<BridgeContext>,
    metrics: Arc<BridgeMetrics>,
    /// 运行标志（读取线程在每次读超时后检查）
    is_running: Arc<AtomicBool>,
    /// 发布线程停止信号
    shutdown_tx: Option<Sender<()>>,
    reader_thread: Option<JoinHandle<ReaderExit>>,
    publisher_thread: Option<JoinHandle<()>>,
}

impl RcBridge {
    /// 启动读取线程与发布线程
    ///
    /// # 参数
    /// - `source`: 行数据源（会被移动到读取线程）
    /// - `sink`: 消息发布接口
    /// - `config`: 解码与发布配置
    ///
    /// # 错误
    /// - `DriverError::Protocol`: 解码配置非法
    /// - `DriverError::InvalidFrequency`: 发布频率非法
    /// - `DriverError::Spawn`: 线程创建失败
    pub fn start(
        source: impl LineSource + Send + 'static,
        sink: Arc<dyn MessageSink>,
        config: BridgeConfig,
    ) -> Result<Self, DriverError> {
        let period = period_from_frequency(config.publish_frequency)?;
        let decoder = LineDecoder::new(config.decoder)?;

        let ctx = Arc::new(BridgeContext::new());
        let metrics = Arc::new(BridgeMetrics::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let reader_thread = {
            let ctx = ctx.clone();
            let metrics = metrics.clone();
            let is_running = is_running.clone();
            std::thread::Builder::new()
                .name("rc-reader".to_string())
                .spawn(move || reader_loop(source, decoder, ctx, metrics, is_running))
                .map_err(|source| DriverError::Spawn {
                    name: "reader",
                    source,
                })?
        };

        let publisher_thread = {
            let ctx = ctx.clone();
            let metrics = metrics.clone();
            let topics = config.topics;
            let encoding = config.encoding;
            std::thread::Builder::new()
                .name("rc-publisher".to_string())
                .spawn(move || {
                    publish_loop(ctx, sink, topics, encoding, period, shutdown_rx, metrics)
                })
        };
        let publisher_thread = match publisher_thread {
            Ok(handle) => handle,
            Err(source) => {
                is_running.store(false, Ordering::Release);
                return Err(DriverError::Spawn {
                    name: "publisher",
                    source,
                });
            },
        };

        info!(
            "RC bridge started, publishing at {} Hz",
            config.publish_frequency
        );

        Ok(Self {
            ctx,
            metrics,
            is_running,
            shutdown_tx: Some(shutdown_tx),
            reader_thread: Some(reader_thread),
            publisher_thread: Some(publisher_thread),
        })
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> VehicleState {
        self.ctx.snapshot()
    }

    /// 有效油门（已按副接收机选择）
    pub fn throttle(&self) -> f32 {
        self.snapshot().throttle()
    }

    /// 有效转向（已按副接收机选择）
    pub fn steering(&self) -> f32 {
        self.snapshot().steering()
    }

    pub fn drive_mode(&self) -> DriveMode {
        self.snapshot().drive_mode
    }

    pub fn record_enabled(&self) -> bool {
        self.snapshot().record_enabled
    }

    pub fn throttle_feedback(&self) -> f32 {
        self.snapshot().throttle_feedback
    }

    /// 共享状态上下文
    pub fn context(&self) -> Arc<BridgeContext> {
        self.ctx.clone()
    }

    /// 检查线程健康状态
    ///
    /// # 返回
    /// - `(reader_alive, publisher_alive)`
    pub fn check_health(&self) -> (bool, bool) {
        let reader_alive = self
            .reader_thread
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false);
        let publisher_alive = self
            .publisher_thread
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false);
        (reader_alive, publisher_alive)
    }

    pub fn is_healthy(&self) -> bool {
        let (reader_alive, publisher_alive) = self.check_health();
        reader_alive && publisher_alive
    }

    /// 获取性能指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 停止两个线程并等待退出（可重复调用）
    ///
    /// 返回读取线程的退出原因；已停止过或 join 失败时返回 `None`。
    pub fn stop(&mut self) -> Option<ReaderExit> {
        self.is_running.store(false, Ordering::Release);

        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        let mut reader_exit = None;
        if let Some(handle) = self.reader_thread.take() {
            match handle.join_timeout(JOIN_TIMEOUT) {
                Ok(exit) => reader_exit = Some(exit),
                Err(_e) => error!(
                    "Reader thread panicked or failed to shut down within {:?}",
                    JOIN_TIMEOUT
                ),
            }
        }

        if let Some(handle) = self.publisher_thread.take()
            && let Err(_e) = handle.join_timeout(JOIN_TIMEOUT)
        {
            error!(
                "Publisher thread panicked or failed to shut down within {:?}",
                JOIN_TIMEOUT
            );
        }

        if let Some(exit) = reader_exit {
            info!("RC bridge stopped (reader exit: {:?})", exit);
        }
        reader_exit
    }
}

impl Drop for RcBridge {
    fn drop(&mut self) {
        self.stop();
    }
}
