//! 舵机会话门面
//!
//! 调用方的唯一入口：持有一个已配置的传输后端，负责输入钳位并
//! 把协议级响应解释为类型化结果。

use crate::{ServoTransport, SessionError};
use std::time::Duration;
use sts_protocol::{ServoBatch, ServoData, ServoId, ServoTelemetry};
use tracing::debug;

/// 位置指令的合法区间
const POSITION_RANGE: (i32, i32) = (0, 1000);
/// 运动时间的合法区间（毫秒）
const TIME_RANGE: (i32, i32) = (0, 30_000);

/// 舵机会话
///
/// 越界的移动输入被静默钳位到合法区间，从不拒绝；这是与既有
/// 上位机行为的兼容约定。
pub struct ServoSession {
    transport: Box<dyn ServoTransport>,
}

impl ServoSession {
    pub fn new(transport: Box<dyn ServoTransport>) -> Self {
        ServoSession { transport }
    }

    /// 移动到目标位置
    ///
    /// `position` 钳位到 [0, 1000]，`time` 钳位到 [0, 30000] 毫秒。
    pub fn move_to(&mut self, id: ServoId, position: i32, time: i32) -> Result<(), SessionError> {
        let clamped_position = position.clamp(POSITION_RANGE.0, POSITION_RANGE.1) as i16;
        let clamped_time = time.clamp(TIME_RANGE.0, TIME_RANGE.1) as u16;
        if i32::from(clamped_position) != position || i32::from(clamped_time) != time {
            debug!(
                "move_to inputs clamped: position {} -> {}, time {} -> {}",
                position, clamped_position, time, clamped_time
            );
        }
        self.transport.move_to(id, clamped_position, clamped_time)
    }

    /// 读取当前位置（有符号，负值表示跨零回绕）
    pub fn read_position(&mut self, id: ServoId, deadline: Duration) -> Result<i16, SessionError> {
        self.transport.read_position(id, deadline)
    }

    /// 读取单个舵机的完整遥测记录
    pub fn read_telemetry(&mut self, id: ServoId) -> Result<ServoTelemetry, SessionError> {
        self.transport.read_telemetry(id)
    }

    /// 单事务批量移动
    pub fn batch_move(&mut self, batch: &ServoBatch) -> Result<(), SessionError> {
        self.transport.batch_move(batch)
    }

    /// 使能协处理器侧自主轮询
    ///
    /// 生效时机在下一个轮询周期，调用返回不代表立即生效。
    pub fn enable_readout(&mut self) -> Result<(), SessionError> {
        self.transport.set_readout(true)
    }

    /// 关闭协处理器侧自主轮询
    pub fn disable_readout(&mut self) -> Result<(), SessionError> {
        self.transport.set_readout(false)
    }

    /// 使能运动输出
    pub fn enable_movement(&mut self) -> Result<(), SessionError> {
        self.transport.set_movement(true)
    }

    /// 关闭运动输出
    pub fn disable_movement(&mut self) -> Result<(), SessionError> {
        self.transport.set_movement(false)
    }

    /// 轮询全部舵机遥测块
    pub fn poll_telemetry(&mut self) -> Result<ServoData, SessionError> {
        self.transport.poll_telemetry()
    }
}
