//! 通用 `Read` 行数据源（管道、TCP、文件、`Cursor`）

use crate::{LineAssembler, LineSource, SerialError};
use std::io::{ErrorKind, Read};
use tracing::debug;

const READ_CHUNK: usize = 256;

/// 基于任意 [`Read`] 的行数据源
///
/// 读超时由底层流决定（例如 `TcpStream::set_read_timeout`），
/// `WouldBlock` / `TimedOut` 被转换为 [`SerialError::Timeout`]。
pub struct ReaderSource<R: Read> {
    inner: R,
    assembler: LineAssembler,
    eof: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            assembler: LineAssembler::new(),
            eof: false,
        }
    }

    /// 取回底层流
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> LineSource for ReaderSource<R> {
    fn read_line(&mut self) -> Result<Option<String>, SerialError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.assembler.next_line() {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(None);
            }

            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    if self.assembler.pending() > 0 {
                        debug!(
                            "Discarding {} bytes of unterminated data at end of stream",
                            self.assembler.pending()
                        );
                    }
                    return Ok(None);
                },
                Ok(n) => self.assembler.push(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(SerialError::Timeout);
                },
                Err(e) => return Err(SerialError::Io(e)),
            }
        }
    }
}
