//! 字节流 → 文本行

use tracing::warn;

/// 单行最大长度（字节），超出的行被整行丢弃
pub const MAX_LINE_LEN: usize = 512;

/// 行组装器
///
/// 累积任意分片的字节，按 `\n` 切出完整行。没有换行且超过
/// [`MAX_LINE_LEN`] 的数据会被丢弃，直到下一个 `\n` 之后重新同步。
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
    discarding: bool,
    dropped: u64,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加读到的字节
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// 取出下一行完整数据（含行尾 `\n`）
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            match self.buffer.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
                    if self.discarding {
                        self.discarding = false;
                        continue;
                    }
                    if raw.len() > MAX_LINE_LEN {
                        self.drop_line(raw.len());
                        continue;
                    }
                    return Some(String::from_utf8_lossy(&raw).into_owned());
                },
                None => {
                    if self.buffer.len() > MAX_LINE_LEN {
                        if !self.discarding {
                            self.drop_line(self.buffer.len());
                            self.discarding = true;
                        }
                        self.buffer.clear();
                    }
                    return None;
                },
            }
        }
    }

    fn drop_line(&mut self, len: usize) {
        self.dropped += 1;
        warn!(
            "Dropping serial line longer than {} bytes ({} bytes buffered)",
            MAX_LINE_LEN, len
        );
    }

    /// 未组成完整行的残留字节数
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// 因超长被丢弃的行数
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_across_chunks() {
        let mut assembler = LineAssembler::new();
        assembler.push(b"12345,1500,15");
        assert_eq!(assembler.next_line(), None);
        assembler.push(b"00\r\n678,");
        assert_eq!(assembler.next_line().as_deref(), Some("12345,1500,1500\r\n"));
        assert_eq!(assembler.next_line(), None);
        assert_eq!(assembler.pending(), 4);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut assembler = LineAssembler::new();
        assembler.push(b"a\nb\n\nc");
        assert_eq!(assembler.next_line().as_deref(), Some("a\n"));
        assert_eq!(assembler.next_line().as_deref(), Some("b\n"));
        assert_eq!(assembler.next_line().as_deref(), Some("\n"));
        assert_eq!(assembler.next_line(), None);
    }

    #[test]
    fn test_oversized_line_dropped_then_resync() {
        let mut assembler = LineAssembler::new();
        assembler.push(&[b'1'; MAX_LINE_LEN + 10]);
        assert_eq!(assembler.next_line(), None);
        assert_eq!(assembler.dropped(), 1);
        assert_eq!(assembler.pending(), 0);

        assembler.push(b"999\nok\n");
        assert_eq!(assembler.next_line().as_deref(), Some("ok\n"));
        assert_eq!(assembler.dropped(), 1);
    }

    #[test]
    fn test_oversized_complete_line_dropped() {
        let mut assembler = LineAssembler::new();
        let mut data = vec![b'2'; MAX_LINE_LEN + 1];
        data.extend_from_slice(b"\nnext\n");
        assembler.push(&data);
        assert_eq!(assembler.next_line().as_deref(), Some("next\n"));
        assert_eq!(assembler.dropped(), 1);
    }
}
