//! 共享车辆状态
//!
//! 读取线程是唯一写者，发布线程（以及对外 API）是读者。所有字段由
//! 同一把互斥锁保护：一行数据的多字段更新在一次加锁内完成，读者拿到的
//! 快照永远不会是"半行"状态。

use parking_lot::Mutex;
use rc_protocol::DriveMode;

/// 最近一次解码得到的车辆状态
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleState {
    /// 主接收机转向 [-1, 1]
    pub steering: f32,
    /// 主接收机油门 [-1, 1]
    pub throttle: f32,
    /// 副接收机转向 [-1, 1]
    pub secondary_steering: f32,
    /// 副接收机油门 [-1, 1]
    pub secondary_throttle: f32,
    /// 油门反馈 [0, 1]（阈值表换算）
    pub throttle_feedback: f32,
    /// 驾驶模式，启动时为 `Invalid`
    pub drive_mode: DriveMode,
    pub record_enabled: bool,
    /// 副接收机选择开关状态
    pub use_secondary_rc: bool,
    /// 超声波距离（6 通道固件的末尾字段）
    pub distance_cm: Option<i32>,
    /// 最近一行有效数据的单片机时间戳
    pub last_timestamp: u64,
}

impl VehicleState {
    /// 有效油门：副接收机选择开关打开时返回副接收机的值
    pub fn throttle(&self) -> f32 {
        if self.use_secondary_rc {
            self.secondary_throttle
        } else {
            self.throttle
        }
    }

    /// 有效转向：副接收机选择开关打开时返回副接收机的值
    pub fn steering(&self) -> f32 {
        if self.use_secondary_rc {
            self.secondary_steering
        } else {
            self.steering
        }
    }
}

/// 读取线程与发布线程共享的上下文
#[derive(Debug, Default)]
pub struct BridgeContext {
    vehicle: Mutex<VehicleState>,
}

impl BridgeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在锁内复制一份快照
    pub fn snapshot(&self) -> VehicleState {
        *self.vehicle.lock()
    }

    /// 在一次加锁内修改状态
    pub fn update<R>(&self, f: impl FnOnce(&mut VehicleState) -> R) -> R {
        let mut guard = self.vehicle.lock();
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = VehicleState::default();
        assert_eq!(state.drive_mode, DriveMode::Invalid);
        assert_eq!(state.throttle(), 0.0);
        assert!(!state.record_enabled);
        assert_eq!(state.distance_cm, None);
    }

    #[test]
    fn test_secondary_selection_at_read_time() {
        let mut state = VehicleState {
            throttle: 0.2,
            steering: -0.3,
            secondary_throttle: 1.0,
            secondary_steering: 1.0,
            ..Default::default()
        };
        assert_eq!(state.throttle(), 0.2);
        assert_eq!(state.steering(), -0.3);

        state.use_secondary_rc = true;
        assert_eq!(state.throttle(), 1.0);
        assert_eq!(state.steering(), 1.0);
    }

    #[test]
    fn test_context_update_and_snapshot() {
        let ctx = BridgeContext::new();
        let previous = ctx.update(|s| {
            let prev = s.last_timestamp;
            s.last_timestamp = 42;
            s.drive_mode = DriveMode::Pilot;
            prev
        });
        assert_eq!(previous, 0);

        let snap = ctx.snapshot();
        assert_eq!(snap.last_timestamp, 42);
        assert_eq!(snap.drive_mode, DriveMode::Pilot);
    }
}
