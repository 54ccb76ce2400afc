//! 舵机 ID、指令码与寄存器地址定义

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 广播/"任意响应者"哨兵 ID
///
/// 发送时表示广播；等待响应时表示接受任意舵机的应答
/// （不校验响应帧中的 ID 字段）。
pub const BROADCAST_ID: u8 = 0xFE;

/// 舵机 ID（1–253 为普通单元）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServoId(u8);

impl ServoId {
    /// 广播 ID（见 [`BROADCAST_ID`]）
    pub const BROADCAST: ServoId = ServoId(BROADCAST_ID);

    /// 创建普通舵机 ID
    ///
    /// # 错误
    /// - `InvalidValue`: 不在 1–253 范围内
    pub fn new(raw: u8) -> Result<Self, ProtocolError> {
        match raw {
            1..=253 => Ok(ServoId(raw)),
            _ => Err(ProtocolError::InvalidValue {
                field: "ServoId",
                value: raw,
            }),
        }
    }

    /// 原始字节值
    pub fn get(self) -> u8 {
        self.0
    }

    /// 是否为广播/通配 ID
    pub fn is_broadcast(self) -> bool {
        self.0 == BROADCAST_ID
    }
}

/// 串口指令码
///
/// 有响应的指令有固定的响应参数长度，收包侧据此校验响应形状。
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Command {
    /// 带时间的位置移动（位置 lo/hi + 时间 lo/hi）
    MoveTimeWrite = 1,
    /// 读取舵机 ID（响应 1 字节）
    IdRead = 14,
    /// 读取当前位置（响应 2 字节，小端有符号）
    PosRead = 28,
    /// 工作模式写入（模式 + 保留 + 速度 lo/hi）
    ModeWrite = 29,
    /// 目标速度写入（速度 lo/hi，最高位为方向）
    SpeedWrite = 30,
}

impl Command {
    /// 响应参数区长度（无响应的指令返回 None）
    pub fn response_params_len(self) -> Option<usize> {
        match self {
            Command::IdRead => Some(1),
            Command::PosRead => Some(2),
            _ => None,
        }
    }
}

/// 舵机寄存器地址（邮箱链路的读写目标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ServoRegister {
    /// 工作模式
    Mode = 0x21,
    /// 遥测记录起始（30 字节连续读）
    TelemetryBase = 0x28,
    /// 目标位置（位置/时间/速度 各 2 字节）
    GoalPosition = 0x2A,
    /// 目标速度
    GoalSpeed = 0x2E,
    /// 当前位置
    CurrentLocation = 0x38,
}

/// 协处理器邮箱操作码（SYS_CMD 编号段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MailboxOpcode {
    /// 读取全部舵机遥测（轮询块）
    GetServoValues = 0x21,
    /// 单舵机寄存器写
    ServoWrite = 0x22,
    /// 单舵机寄存器读
    ServoRead = 0x23,
    /// 使能协处理器侧自主轮询
    ReadoutEnable = 0x24,
    /// 关闭协处理器侧自主轮询
    ReadoutDisable = 0x25,
    /// 批量写（最多 16 舵机一次事务）
    WriteMultiple = 0x26,
    /// 使能运动
    MovementEnable = 0x27,
    /// 关闭运动
    MovementDisable = 0x28,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_servo_id_range() {
        assert!(ServoId::new(0).is_err());
        assert!(ServoId::new(1).is_ok());
        assert!(ServoId::new(253).is_ok());
        assert!(ServoId::new(254).is_err());
        assert!(ServoId::new(255).is_err());
    }

    #[test]
    fn test_broadcast_id() {
        assert!(ServoId::BROADCAST.is_broadcast());
        assert_eq!(ServoId::BROADCAST.get(), 0xFE);
        assert!(!ServoId::new(7).unwrap().is_broadcast());
    }

    #[test]
    fn test_command_codes() {
        assert_eq!(u8::from(Command::MoveTimeWrite), 1);
        assert_eq!(u8::from(Command::PosRead), 28);
        assert_eq!(Command::try_from(28u8).unwrap(), Command::PosRead);
        assert!(Command::try_from(0u8).is_err());
    }

    #[test]
    fn test_command_response_lens() {
        assert_eq!(Command::PosRead.response_params_len(), Some(2));
        assert_eq!(Command::IdRead.response_params_len(), Some(1));
        assert_eq!(Command::MoveTimeWrite.response_params_len(), None);
        assert_eq!(Command::SpeedWrite.response_params_len(), None);
    }

    #[test]
    fn test_mailbox_opcode_block() {
        // SYS_CMD 段是连续的 0x21..=0x28
        assert_eq!(u8::from(MailboxOpcode::GetServoValues), 0x21);
        assert_eq!(u8::from(MailboxOpcode::MovementDisable), 0x28);
        assert_eq!(
            MailboxOpcode::try_from(0x26u8).unwrap(),
            MailboxOpcode::WriteMultiple
        );
    }
}
