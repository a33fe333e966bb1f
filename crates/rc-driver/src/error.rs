//! 驱动层错误类型定义

use rc_protocol::ProtocolError;
use rc_serial::SerialError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口 / 行数据源错误
    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),

    /// 协议解析或配置错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 发布频率非法（必须为有限正数）
    #[error("Invalid publish frequency: {0} Hz")]
    InvalidFrequency(f64),

    /// 线程启动失败
    #[error("Failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// 消息总线发布错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// 单条消息发布失败
    #[error("Failed to publish to {topic}: {message}")]
    Publish { topic: String, message: String },

    /// 负载编码失败
    #[error("Failed to encode payload for {topic}: {message}")]
    Encode { topic: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试 DriverError 的 Display 实现
    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Serial(SerialError::Timeout);
        assert!(err.to_string().contains("Read timeout"));

        let err = DriverError::InvalidFrequency(0.0);
        assert_eq!(err.to_string(), "Invalid publish frequency: 0 Hz");

        let err = SinkError::Publish {
            topic: "robocar/throttle".to_string(),
            message: "queue full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("robocar/throttle") && msg.contains("queue full"));

        let err = SinkError::Encode {
            topic: "robocar/steering".to_string(),
            message: "invalid value".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to encode payload for robocar/steering: invalid value"
        );
    }

    /// 测试 From<ProtocolError> 转换
    #[test]
    fn test_from_protocol_error() {
        let err: DriverError = ProtocolError::InvalidConfig("bad".to_string()).into();
        match err {
            DriverError::Protocol(ProtocolError::InvalidConfig(msg)) => assert_eq!(msg, "bad"),
            other => panic!("Expected Protocol variant, got {:?}", other),
        }
    }
}
