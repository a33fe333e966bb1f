//! RC 接收机桥接程序主入口
//!
//! 从串口读取接收机输出的 CSV 通道行，按固定频率把归一化后的控制量发布到 MQTT。

mod args;
mod mqtt;

use anyhow::{Context, Result, bail};
use args::{Args, Settings};
use clap::Parser;
use mqtt::MqttSink;
use rc_driver::{LogSink, MessageSink, RcBridge, RcBridgeBuilder, ReaderExit};
use rc_serial::{LineSource, ReaderSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(100);

fn init_tracing(debug: bool) {
    let default_level = if debug {
        "rc_bridge=debug,rc_driver=debug,rc_serial=debug"
    } else {
        "rc_bridge=info,rc_driver=info,rc_serial=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// 打开行数据源：`-` 为标准输入，否则为串口设备
fn open_source(settings: &Settings) -> Result<Box<dyn LineSource + Send>> {
    if settings.device == "-" {
        info!("Reading receiver lines from stdin");
        return Ok(Box::new(ReaderSource::new(std::io::stdin())));
    }
    open_serial(settings)
}

#[cfg(unix)]
fn open_serial(settings: &Settings) -> Result<Box<dyn LineSource + Send>> {
    let port =
        rc_serial::SerialPortSource::open(&settings.device, settings.baud, settings.read_timeout)
            .with_context(|| format!("unable to open serial device {}", settings.device))?;
    info!(
        "Opened serial device {} at {} baud",
        settings.device, settings.baud
    );
    Ok(Box::new(port))
}

#[cfg(not(unix))]
fn open_serial(settings: &Settings) -> Result<Box<dyn LineSource + Send>> {
    bail!(
        "serial devices are not supported on this platform ({}); use --device -",
        settings.device
    )
}

fn open_sink(settings: &Settings) -> Result<Arc<dyn MessageSink>> {
    if settings.dry_run {
        info!("Dry run: messages are logged instead of published");
        return Ok(Arc::new(LogSink));
    }
    Ok(Arc::new(MqttSink::connect(&settings.mqtt)?))
}

/// 阻塞直到读取线程结束、发布线程异常或收到退出信号
fn supervise(bridge: &RcBridge, running: &AtomicBool) -> bool {
    loop {
        if !running.load(Ordering::Acquire) {
            info!("Received interrupt signal, shutting down");
            return true;
        }
        let (reader_alive, publisher_alive) = bridge.check_health();
        if !reader_alive {
            return true;
        }
        if !publisher_alive {
            error!("Publisher thread exited unexpectedly");
            return false;
        }
        std::thread::sleep(HEALTH_CHECK_INTERVAL);
    }
}

fn run(args: Args) -> Result<()> {
    let file_config = args.load_file_config()?;
    let settings = args.resolve(file_config)?;

    info!(
        "rc-bridge starting (format={}, encoding={}, frequency={} Hz)",
        settings.decoder.format, settings.encoding, settings.publish_frequency
    );

    let source = open_source(&settings)?;
    let sink = open_sink(&settings)?;

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::Release);
    })
    .context("failed to set signal handler")?;

    let mut bridge = RcBridgeBuilder::new()
        .decoder_config(settings.decoder.clone())
        .topics(settings.topics.clone())
        .encoding(settings.encoding)
        .publish_frequency(settings.publish_frequency)
        .build(source, sink)
        .context("failed to start RC bridge")?;

    let publisher_ok = supervise(&bridge, &running);
    let exit = bridge.stop();

    let metrics = bridge.metrics();
    info!(
        "Lines: {} total, {} valid, {} rejected ({:.1}%), {} field errors; messages: {} published, {} failed",
        metrics.lines_total,
        metrics.lines_valid,
        metrics.lines_rejected,
        metrics.rejection_rate(),
        metrics.field_errors,
        metrics.messages_published,
        metrics.publish_errors
    );

    match exit {
        Some(ReaderExit::Failed) => bail!("serial read failed on {}", settings.device),
        Some(ReaderExit::EndOfStream) => info!("Input stream ended, exiting"),
        Some(ReaderExit::Stopped) | None => {},
    }
    if !publisher_ok {
        bail!("publisher thread exited unexpectedly");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    if let Err(e) = run(args) {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
