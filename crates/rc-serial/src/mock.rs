//! Mock 行数据源（测试用）
//!
//! 通过 crossbeam channel 喂入行数据：接收超时映射为 `Timeout`，
//! 发送端全部关闭映射为 EOF。

use crate::{DEFAULT_READ_TIMEOUT, LineSource, SerialError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

pub struct ChannelLineSource {
    rx: Receiver<String>,
    read_timeout: Duration,
}

impl ChannelLineSource {
    /// 创建数据源，返回 (发送端, 数据源)
    pub fn new() -> (Sender<String>, Self) {
        Self::with_timeout(DEFAULT_READ_TIMEOUT)
    }

    pub fn with_timeout(read_timeout: Duration) -> (Sender<String>, Self) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (tx, Self { rx, read_timeout })
    }

    /// 预先装入的固定行序列，读完即 EOF
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (tx, source) = Self::new();
        for line in lines {
            let _ = tx.send(line.into());
        }
        source
    }
}

impl LineSource for ChannelLineSource {
    fn read_line(&mut self) -> Result<Option<String>, SerialError> {
        match self.rx.recv_timeout(self.read_timeout) {
            Ok(line) => Ok(Some(line)),
            Err(RecvTimeoutError::Timeout) => Err(SerialError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lines_then_eof() {
        let mut source = ChannelLineSource::from_lines(["a\n", "b\n"]);
        assert_eq!(source.read_line().unwrap().as_deref(), Some("a\n"));
        assert_eq!(source.read_line().unwrap().as_deref(), Some("b\n"));
        assert_eq!(source.read_line().unwrap(), None);
    }

    #[test]
    fn test_timeout_while_sender_alive() {
        let (tx, mut source) = ChannelLineSource::with_timeout(Duration::from_millis(5));
        assert!(matches!(source.read_line(), Err(SerialError::Timeout)));
        tx.send("x\n".to_string()).unwrap();
        assert_eq!(source.read_line().unwrap().as_deref(), Some("x\n"));
        drop(tx);
        assert_eq!(source.read_line().unwrap(), None);
    }
}
