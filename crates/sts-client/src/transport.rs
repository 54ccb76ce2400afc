//! 传输后端抽象
//!
//! [`ServoTransport`] 是会话与链路之间的对象安全接口；串口与邮箱
//! 两个后端各自实现其支持的子集，不支持的操作返回
//! [`SessionError::Unsupported`]。

use crate::SessionError;
use std::time::Duration;
use sts_mailbox::{MailboxChannel, MailboxPort};
use sts_protocol::{Command, ServoBatch, ServoData, ServoId, ServoTelemetry};
use sts_serial::{ByteChannel, SerialLink};

/// 舵机传输后端
///
/// 所有方法同步阻塞；超时和链路故障以错误上报，不做自动重试。
pub trait ServoTransport: Send {
    /// 移动到目标位置（输入已由会话层钳位）
    fn move_to(&mut self, id: ServoId, position: i16, time: u16) -> Result<(), SessionError>;

    /// 读取当前位置
    fn read_position(&mut self, id: ServoId, deadline: Duration) -> Result<i16, SessionError>;

    /// 读取完整遥测记录
    fn read_telemetry(&mut self, id: ServoId) -> Result<ServoTelemetry, SessionError>;

    /// 单事务批量移动（最多 16 路）
    fn batch_move(&mut self, batch: &ServoBatch) -> Result<(), SessionError>;

    /// 开关协处理器侧自主轮询
    fn set_readout(&mut self, enabled: bool) -> Result<(), SessionError>;

    /// 开关运动输出
    fn set_movement(&mut self, enabled: bool) -> Result<(), SessionError>;

    /// 轮询全部舵机遥测块
    fn poll_telemetry(&mut self) -> Result<ServoData, SessionError>;
}

/// 串口后端
///
/// 逐帧寻址单个舵机；批量写、遥测块和协处理器开关在此链路上
/// 没有对应的线缆协议，返回 `Unsupported`。
pub struct SerialBackend<C: ByteChannel> {
    link: SerialLink<C>,
}

impl<C: ByteChannel> SerialBackend<C> {
    pub fn new(link: SerialLink<C>) -> Self {
        SerialBackend { link }
    }
}

impl<C: ByteChannel> ServoTransport for SerialBackend<C> {
    fn move_to(&mut self, id: ServoId, position: i16, time: u16) -> Result<(), SessionError> {
        let position = position.to_le_bytes();
        let time = time.to_le_bytes();
        let params = [position[0], position[1], time[0], time[1]];
        // 移动指令没有响应帧，发出即返回
        self.link.send(id, Command::MoveTimeWrite, &params)?;
        Ok(())
    }

    fn read_position(&mut self, id: ServoId, deadline: Duration) -> Result<i16, SessionError> {
        Ok(self.link.read_position(id, deadline)?)
    }

    fn read_telemetry(&mut self, _id: ServoId) -> Result<ServoTelemetry, SessionError> {
        Err(SessionError::Unsupported("telemetry record read"))
    }

    fn batch_move(&mut self, _batch: &ServoBatch) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("batch move"))
    }

    fn set_readout(&mut self, _enabled: bool) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("readout toggle"))
    }

    fn set_movement(&mut self, _enabled: bool) -> Result<(), SessionError> {
        Err(SessionError::Unsupported("movement toggle"))
    }

    fn poll_telemetry(&mut self) -> Result<ServoData, SessionError> {
        Err(SessionError::Unsupported("telemetry poll"))
    }
}

/// 邮箱后端
///
/// 每个操作都是一次完整的邮箱事务；设备调用本身阻塞至协处理器
/// 应答，`read_position` 的 deadline 参数在此链路上不生效。
pub struct MailboxBackend<P: MailboxPort> {
    channel: MailboxChannel<P>,
}

impl<P: MailboxPort> MailboxBackend<P> {
    pub fn new(channel: MailboxChannel<P>) -> Self {
        MailboxBackend { channel }
    }
}

impl<P: MailboxPort> ServoTransport for MailboxBackend<P> {
    fn move_to(&mut self, id: ServoId, position: i16, time: u16) -> Result<(), SessionError> {
        // 速度 0 表示不限速，由时间参数支配运动曲线
        self.channel.servo_move(id, position, time, 0)?;
        Ok(())
    }

    fn read_position(&mut self, id: ServoId, _deadline: Duration) -> Result<i16, SessionError> {
        Ok(self.channel.read_position(id)?)
    }

    fn read_telemetry(&mut self, id: ServoId) -> Result<ServoTelemetry, SessionError> {
        Ok(self.channel.read_telemetry(id)?)
    }

    fn batch_move(&mut self, batch: &ServoBatch) -> Result<(), SessionError> {
        self.channel.write_multiple(batch)?;
        Ok(())
    }

    fn set_readout(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.channel.set_readout(enabled)?;
        Ok(())
    }

    fn set_movement(&mut self, enabled: bool) -> Result<(), SessionError> {
        self.channel.set_movement(enabled)?;
        Ok(())
    }

    fn poll_telemetry(&mut self) -> Result<ServoData, SessionError> {
        Ok(self.channel.poll_servo_data()?)
    }
}
