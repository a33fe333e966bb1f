//! # RC Serial
//!
//! 行数据源抽象层：把字节流（串口、管道、TCP、文件）切分成以 `\n`
//! 结尾的文本行，交给上层解码。
//!
//! ## 读取语义
//!
//! - `Ok(Some(line))`: 读到一行完整数据（含行尾 `\n`）
//! - `Ok(None)`: 对端关闭（EOF），读取线程应正常退出
//! - `Err(SerialError::Timeout)`: 超时内没有完整的行，调用方可检查退出标志后重试

use std::time::Duration;
use thiserror::Error;

pub mod assembler;
pub mod reader;

#[cfg(unix)]
pub mod serial_port;

#[cfg(feature = "mock")]
pub mod mock;

pub use assembler::{LineAssembler, MAX_LINE_LEN};
pub use reader::ReaderSource;

#[cfg(unix)]
pub use serial_port::{SerialPortSource, baud_rate};

/// 默认读超时（读取线程检查退出标志的最大间隔）
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// 行数据源统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to open serial device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to configure serial device {path}: {message}")]
    Configure { path: String, message: String },

    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    #[error("Read timeout")]
    Timeout,
}

/// 行数据源
pub trait LineSource {
    /// 读取下一行
    ///
    /// # 错误
    /// - `SerialError::Timeout`: 超时内没有完整的行
    /// - `SerialError::Io`: 底层读取失败
    fn read_line(&mut self) -> Result<Option<String>, SerialError>;
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn read_line(&mut self) -> Result<Option<String>, SerialError> {
        (**self).read_line()
    }
}
