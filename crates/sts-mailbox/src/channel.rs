//! 邮箱传输本体
//!
//! 每个依赖操作（单读/单写、批量写、使能开关、遥测轮询）都是
//! 一次 [`MailboxChannel::call`]：编组载荷 → 缓存刷新 → 触发
//! 协处理器 → 缓存失效 → 读回结果。顺序不变量由单一代码路径
//! 无条件强制——不存在绕过刷新直接触发的途径。违反该顺序会
//! 读到陈旧或写了一半的数据，而硬件不会给出任何错误信号。

use crate::port::MailboxPort;
use crate::MailboxError;
use sts_protocol::{
    decode_position, MailboxCommand, ProtocolError, ServoBatch, ServoData, ServoId, ServoRegister,
    ServoTelemetry, MAILBOX_CALL_MSTIME, MAILBOX_RESULT_OFFSET, TELEMETRY_RECORD_LEN,
};
use tracing::trace;

/// 电机模式下的旋转方向（最高位编码进速度字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpinDirection {
    Forward,
    Reverse,
}

/// 邮箱传输
///
/// 不做任何自动重试；每个失败都原样上报给调用方。
pub struct MailboxChannel<P: MailboxPort> {
    port: P,
}

impl<P: MailboxPort> MailboxChannel<P> {
    pub fn new(port: P) -> Self {
        MailboxChannel { port }
    }

    /// 执行一次完整的邮箱事务
    ///
    /// 1. 把命令载荷编码进共享区域基偏移处
    /// 2. `flush` —— 严格先于触发
    /// 3. `trigger` —— 阻塞直至协处理器应答
    /// 4. `invalidate` —— 严格先于任何结果读取
    ///
    /// # 错误
    /// - `Protocol`: 载荷编码失败
    /// - `Ioctl { stage }`: 对应阶段的设备调用失败
    pub fn call(&mut self, command: &MailboxCommand) -> Result<(), MailboxError> {
        let opcode = command.opcode();
        command.encode_payload(self.port.region_mut())?;

        self.port.flush()?;
        self.port.trigger(opcode, MAILBOX_CALL_MSTIME)?;
        self.port.invalidate()?;

        trace!("Mailbox call {:?} completed", opcode);
        Ok(())
    }

    /// 失效后从共享区域读回结果
    pub fn read_back(&self, offset: usize, len: usize) -> Result<Vec<u8>, MailboxError> {
        let region = self.port.region();
        if offset + len > region.len() {
            return Err(MailboxError::Protocol(ProtocolError::RegionTooSmall {
                needed: offset + len,
                available: region.len(),
            }));
        }
        Ok(region[offset..offset + len].to_vec())
    }

    /// 单舵机寄存器写
    pub fn servo_write(
        &mut self,
        id: ServoId,
        register: ServoRegister,
        data: &[u8],
    ) -> Result<(), MailboxError> {
        self.call(&MailboxCommand::Write {
            id,
            register,
            data: data.to_vec(),
        })
    }

    /// 单舵机寄存器读（结果位于固定偏移 [`MAILBOX_RESULT_OFFSET`]）
    pub fn servo_read(
        &mut self,
        id: ServoId,
        register: ServoRegister,
        len: u8,
    ) -> Result<Vec<u8>, MailboxError> {
        self.call(&MailboxCommand::Read { id, register, len })?;
        self.read_back(MAILBOX_RESULT_OFFSET, len as usize)
    }

    /// 移动舵机：目标位置寄存器一次写入 位置/时间/速度 三个字段
    pub fn servo_move(
        &mut self,
        id: ServoId,
        position: i16,
        time: u16,
        speed: u16,
    ) -> Result<(), MailboxError> {
        let mut data = [0u8; 6];
        data[0..2].copy_from_slice(&position.to_le_bytes());
        data[2..4].copy_from_slice(&time.to_le_bytes());
        data[4..6].copy_from_slice(&speed.to_le_bytes());
        self.servo_write(id, ServoRegister::GoalPosition, &data)
    }

    /// 读取当前位置
    pub fn read_position(&mut self, id: ServoId) -> Result<i16, MailboxError> {
        let data = self.servo_read(id, ServoRegister::CurrentLocation, 2)?;
        Ok(decode_position(data[0], data[1]))
    }

    /// 读取完整遥测记录（30 字节，原子地单次调用返回）
    pub fn read_telemetry(&mut self, id: ServoId) -> Result<ServoTelemetry, MailboxError> {
        let data = self.servo_read(id, ServoRegister::TelemetryBase, TELEMETRY_RECORD_LEN as u8)?;
        Ok(ServoTelemetry::from_bytes(&data)?)
    }

    /// 设置工作模式
    pub fn set_servo_mode(&mut self, id: ServoId, mode: u8) -> Result<(), MailboxError> {
        self.servo_write(id, ServoRegister::Mode, &[mode])
    }

    /// 设置目标速度（方向编码在最高位）
    pub fn set_servo_speed(
        &mut self,
        id: ServoId,
        speed: u16,
        direction: SpinDirection,
    ) -> Result<(), MailboxError> {
        let mut value = speed & 0x7FFF;
        if direction == SpinDirection::Reverse {
            value |= 0x8000;
        }
        self.servo_write(id, ServoRegister::GoalSpeed, &value.to_le_bytes())
    }

    /// 批量写：最多 16 舵机的单次邮箱事务
    pub fn write_multiple(&mut self, batch: &ServoBatch) -> Result<(), MailboxError> {
        self.call(&MailboxCommand::WriteMultiple(batch.clone()))
    }

    /// 轮询全部舵机遥测
    pub fn poll_servo_data(&mut self) -> Result<ServoData, MailboxError> {
        self.call(&MailboxCommand::Poll)?;
        let block = self.read_back(0, ServoData::ENCODED_LEN)?;
        Ok(ServoData::from_bytes(&block)?)
    }

    /// 使能/关闭协处理器侧自主轮询
    ///
    /// 开关在协处理器的下一个轮询周期才生效，调用方不得假设
    /// 立即生效。
    pub fn set_readout(&mut self, enabled: bool) -> Result<(), MailboxError> {
        self.call(&if enabled {
            MailboxCommand::ReadoutEnable
        } else {
            MailboxCommand::ReadoutDisable
        })
    }

    /// 使能/关闭运动
    pub fn set_movement(&mut self, enabled: bool) -> Result<(), MailboxError> {
        self.call(&if enabled {
            MailboxCommand::MovementEnable
        } else {
            MailboxCommand::MovementDisable
        })
    }
}
