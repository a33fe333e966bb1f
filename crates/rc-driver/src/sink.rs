//! 消息发布边界
//!
//! 发布线程只依赖 [`MessageSink`]，具体总线（MQTT、日志、测试记录）由调用方注入。

use crate::error::SinkError;
use tracing::debug;

/// 消息总线发布接口
pub trait MessageSink: Send + Sync {
    /// 发布一条消息（fire-and-forget，不做重试）
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SinkError>;
}

impl<S: MessageSink + ?Sized> MessageSink for std::sync::Arc<S> {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        (**self).publish(topic, payload)
    }
}

impl<S: MessageSink + ?Sized> MessageSink for Box<S> {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        (**self).publish(topic, payload)
    }
}

/// 只写日志的 sink（dry-run 模式）
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        debug!("publish {} => {}", topic, String::from_utf8_lossy(&payload));
        Ok(())
    }
}

/// 发布主题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub throttle: String,
    pub steering: String,
    pub drive_mode: String,
    pub switch_record: String,
    pub throttle_feedback: String,
    /// 仅 6 通道固件带距离字段，未配置时不发布
    pub distance_cm: Option<String>,
}

impl Topics {
    /// 以 `base` 为前缀生成全部主题（不含距离主题）
    ///
    /// # Example
    ///
    /// ```
    /// use rc_driver::Topics;
    ///
    /// let topics = Topics::with_base("robocar/rc/");
    /// assert_eq!(topics.throttle, "robocar/rc/throttle");
    /// assert_eq!(topics.distance_cm, None);
    /// ```
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let topic = |name: &str| format!("{}/{}", base, name);
        Self {
            throttle: topic("throttle"),
            steering: topic("steering"),
            drive_mode: topic("drive_mode"),
            switch_record: topic("switch_record"),
            throttle_feedback: topic("throttle_feedback"),
            distance_cm: None,
        }
    }

    /// 启用距离主题 `<base>/distance_cm`
    pub fn with_distance(mut self, topic: impl Into<String>) -> Self {
        self.distance_cm = Some(topic.into());
        self
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::with_base("robocar/rc")
    }
}

/// 测试用 sink
pub mod mock {
    use super::MessageSink;
    use crate::error::SinkError;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// 记录每个主题最后一条负载和全部发布顺序
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        inner: Mutex<Recorded>,
    }

    #[derive(Debug, Default)]
    struct Recorded {
        last: HashMap<String, Vec<u8>>,
        history: Vec<(String, Vec<u8>)>,
        fail_topic: Option<String>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// 使发往 `topic` 的发布返回错误
        pub fn fail_on(&self, topic: impl Into<String>) {
            self.inner.lock().fail_topic = Some(topic.into());
        }

        pub fn last(&self, topic: &str) -> Option<Vec<u8>> {
            self.inner.lock().last.get(topic).cloned()
        }

        /// 最后一条负载（按 UTF-8 解码）
        pub fn last_text(&self, topic: &str) -> Option<String> {
            self.last(topic)
                .map(|payload| String::from_utf8_lossy(&payload).into_owned())
        }

        pub fn history(&self) -> Vec<(String, Vec<u8>)> {
            self.inner.lock().history.clone()
        }

        pub fn publish_count(&self) -> usize {
            self.inner.lock().history.len()
        }

        pub fn clear(&self) {
            let mut inner = self.inner.lock();
            inner.last.clear();
            inner.history.clear();
        }
    }

    impl MessageSink for RecordingSink {
        fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), SinkError> {
            let mut inner = self.inner.lock();
            if inner.fail_topic.as_deref() == Some(topic) {
                return Err(SinkError::Publish {
                    topic: topic.to_string(),
                    message: "injected failure".to_string(),
                });
            }
            inner.last.insert(topic.to_string(), payload.clone());
            inner.history.push((topic.to_string(), payload));
            Ok(())
        }
    }
}
