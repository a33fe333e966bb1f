//! termios 串口行数据源
//!
//! 设备以 `O_NOCTTY` 打开并设置为 raw 模式，读取前用 `poll` 等待数据，
//! 超时返回 [`SerialError::Timeout`]，`read` 返回 0 字节视为对端关闭。

use crate::{LineAssembler, LineSource, SerialError};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::termios::{self, BaudRate, SetArg};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::fd::AsFd;
use std::os::unix::fs::OpenOptionsExt;
use std::time::Duration;
use tracing::{debug, info, trace};

const READ_CHUNK: usize = 256;

/// 将数值波特率转换为 termios 常量
///
/// 支持 9600 ~ 230400 的常用波特率。
pub fn baud_rate(baud: u32) -> Result<BaudRate, SerialError> {
    match baud {
        9600 => Ok(BaudRate::B9600),
        19200 => Ok(BaudRate::B19200),
        38400 => Ok(BaudRate::B38400),
        57600 => Ok(BaudRate::B57600),
        115200 => Ok(BaudRate::B115200),
        230400 => Ok(BaudRate::B230400),
        other => Err(SerialError::UnsupportedBaudRate(other)),
    }
}

/// 串口行数据源
pub struct SerialPortSource {
    path: String,
    file: File,
    read_timeout: Duration,
    assembler: LineAssembler,
}

impl SerialPortSource {
    /// 打开并配置串口
    ///
    /// # 参数
    /// - `path`: 设备路径，如 `/dev/serial0`、`/dev/ttyUSB0`
    /// - `baud`: 波特率
    /// - `read_timeout`: 单次 `read_line` 的等待上限（最大 65535ms）
    ///
    /// # 错误
    /// - `SerialError::Open`: 设备不存在或无权限
    /// - `SerialError::Configure`: termios 设置失败
    /// - `SerialError::UnsupportedBaudRate`: 不支持的波特率
    pub fn open(path: &str, baud: u32, read_timeout: Duration) -> Result<Self, SerialError> {
        let rate = baud_rate(baud)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)
            .map_err(|source| SerialError::Open {
                path: path.to_string(),
                source,
            })?;

        let configure_err = |e: nix::errno::Errno| SerialError::Configure {
            path: path.to_string(),
            message: e.to_string(),
        };

        let mut tio = termios::tcgetattr(file.as_fd()).map_err(configure_err)?;
        termios::cfmakeraw(&mut tio);
        termios::cfsetspeed(&mut tio, rate).map_err(configure_err)?;
        termios::tcsetattr(file.as_fd(), SetArg::TCSANOW, &tio).map_err(configure_err)?;
        // 丢弃打开前积压的半行数据
        termios::tcflush(file.as_fd(), termios::FlushArg::TCIFLUSH).map_err(configure_err)?;

        info!("Serial device {} opened at {} baud", path, baud);

        Ok(Self {
            path: path.to_string(),
            file,
            read_timeout,
            assembler: LineAssembler::new(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 等待可读，超时返回 `Timeout`
    fn wait_readable(&self) -> Result<(), SerialError> {
        let timeout_ms = self.read_timeout.as_millis().min(65535) as u16;
        let pollfd = PollFd::new(self.file.as_fd(), PollFlags::POLLIN);
        match poll(&mut [pollfd], PollTimeout::from(timeout_ms)) {
            Ok(0) => Err(SerialError::Timeout),
            Ok(_) => Ok(()),
            Err(nix::errno::Errno::EINTR) => Err(SerialError::Timeout),
            Err(e) => Err(SerialError::Io(std::io::Error::other(format!(
                "poll failed: {}",
                e
            )))),
        }
    }
}

impl LineSource for SerialPortSource {
    fn read_line(&mut self) -> Result<Option<String>, SerialError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.assembler.next_line() {
                trace!("serial line: {:?}", line);
                return Ok(Some(line));
            }

            self.wait_readable()?;

            match self.file.read(&mut chunk) {
                Ok(0) => {
                    debug!("Serial device {} reported end of stream", self.path);
                    return Ok(None);
                },
                Ok(n) => self.assembler.push(&chunk[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                    return Err(SerialError::Timeout);
                },
                Err(e) => return Err(SerialError::Io(e)),
            }
        }
    }
}
