//! 邮箱命令的载荷编码
//!
//! 邮箱链路把命令编组进共享内存后触发协处理器。不同形状的
//! 命令统一建模为 [`MailboxCommand`] 标签联合，每个变体有一个
//! 显式的编码分支——绝不通过裸结构体覆盖共享缓冲区。

use crate::constants::MAX_SERVOS;
use crate::ids::{MailboxOpcode, ServoId, ServoRegister};
use crate::ProtocolError;

/// 批量写条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchEntry {
    pub id: ServoId,
    pub position: i16,
    pub time: u16,
    pub speed: u16,
}

/// 批量写命令：最多 16 个 (id, 位置, 时间, 速度) 元组
///
/// 由调用方构造、单次邮箱事务消费后即丢弃。
/// `only_write_positions` 选择协处理器侧"仅写位置"模式。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServoBatch {
    only_write_positions: bool,
    entries: Vec<BatchEntry>,
}

impl ServoBatch {
    /// 编码后的固定长度：
    /// 1 标志 + 16 ID + 16×2 位置 + 16×2 时间 + 16×2 速度
    pub const ENCODED_LEN: usize = 1 + MAX_SERVOS + 3 * (2 * MAX_SERVOS);

    pub fn new(only_write_positions: bool) -> Self {
        ServoBatch {
            only_write_positions,
            entries: Vec::new(),
        }
    }

    /// 追加一个条目
    ///
    /// # 错误
    /// - `BatchFull`: 已有 16 条
    pub fn push(&mut self, entry: BatchEntry) -> Result<(), ProtocolError> {
        if self.entries.len() >= MAX_SERVOS {
            return Err(ProtocolError::BatchFull { max: MAX_SERVOS });
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn only_write_positions(&self) -> bool {
        self.only_write_positions
    }

    /// 编码为共享内存布局（固定 113 字节，未用槽位清零）
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        if buf.len() < Self::ENCODED_LEN {
            return Err(ProtocolError::RegionTooSmall {
                needed: Self::ENCODED_LEN,
                available: buf.len(),
            });
        }

        let buf = &mut buf[..Self::ENCODED_LEN];
        buf.fill(0);
        buf[0] = self.only_write_positions as u8;

        let positions_base = 1 + MAX_SERVOS;
        let times_base = positions_base + 2 * MAX_SERVOS;
        let speeds_base = times_base + 2 * MAX_SERVOS;

        for (i, entry) in self.entries.iter().enumerate() {
            buf[1 + i] = entry.id.get();
            buf[positions_base + 2 * i..positions_base + 2 * i + 2]
                .copy_from_slice(&entry.position.to_le_bytes());
            buf[times_base + 2 * i..times_base + 2 * i + 2]
                .copy_from_slice(&entry.time.to_le_bytes());
            buf[speeds_base + 2 * i..speeds_base + 2 * i + 2]
                .copy_from_slice(&entry.speed.to_le_bytes());
        }

        Ok(Self::ENCODED_LEN)
    }
}

/// 邮箱命令（协处理器操作码 + 载荷形状）
///
/// 共享内存的所有权约定：持有硬件信号量的一侧独占整个区域，
/// 协议保证严格交替（主机写 → 触发 → 协处理器写/应答 → 主机读），
/// 两侧绝不并发访问。
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MailboxCommand {
    /// 读取全部舵机遥测（无载荷，结果为轮询块）
    Poll,
    /// 单舵机寄存器写
    Write {
        id: ServoId,
        register: ServoRegister,
        data: Vec<u8>,
    },
    /// 单舵机寄存器读（结果在 [`crate::MAILBOX_RESULT_OFFSET`] 处）
    Read {
        id: ServoId,
        register: ServoRegister,
        len: u8,
    },
    /// 批量写
    WriteMultiple(ServoBatch),
    ReadoutEnable,
    ReadoutDisable,
    MovementEnable,
    MovementDisable,
}

impl MailboxCommand {
    /// 对应的协处理器操作码
    pub fn opcode(&self) -> MailboxOpcode {
        match self {
            MailboxCommand::Poll => MailboxOpcode::GetServoValues,
            MailboxCommand::Write { .. } => MailboxOpcode::ServoWrite,
            MailboxCommand::Read { .. } => MailboxOpcode::ServoRead,
            MailboxCommand::WriteMultiple(_) => MailboxOpcode::WriteMultiple,
            MailboxCommand::ReadoutEnable => MailboxOpcode::ReadoutEnable,
            MailboxCommand::ReadoutDisable => MailboxOpcode::ReadoutDisable,
            MailboxCommand::MovementEnable => MailboxOpcode::MovementEnable,
            MailboxCommand::MovementDisable => MailboxOpcode::MovementDisable,
        }
    }

    /// 把载荷编码进共享内存基偏移处，返回写入的字节数
    ///
    /// 每个变体一条显式编码路径：
    /// - `Write`: `[id, register, len, data...]`
    /// - `Read`: `[id, register, len]`
    /// - `WriteMultiple`: 批量布局（见 [`ServoBatch::encode`]）
    /// - 其余变体无载荷
    pub fn encode_payload(&self, region: &mut [u8]) -> Result<usize, ProtocolError> {
        match self {
            MailboxCommand::Poll
            | MailboxCommand::ReadoutEnable
            | MailboxCommand::ReadoutDisable
            | MailboxCommand::MovementEnable
            | MailboxCommand::MovementDisable => Ok(0),

            MailboxCommand::Write { id, register, data } => {
                if data.len() > u8::MAX as usize {
                    return Err(ProtocolError::ParameterTooLarge {
                        len: data.len(),
                        max: u8::MAX as usize,
                    });
                }
                let needed = 3 + data.len();
                if region.len() < needed {
                    return Err(ProtocolError::RegionTooSmall {
                        needed,
                        available: region.len(),
                    });
                }
                region[0] = id.get();
                region[1] = u8::from(*register);
                region[2] = data.len() as u8;
                region[3..needed].copy_from_slice(data);
                Ok(needed)
            }

            MailboxCommand::Read { id, register, len } => {
                if region.len() < 3 {
                    return Err(ProtocolError::RegionTooSmall {
                        needed: 3,
                        available: region.len(),
                    });
                }
                region[0] = id.get();
                region[1] = u8::from(*register);
                region[2] = *len;
                Ok(3)
            }

            MailboxCommand::WriteMultiple(batch) => batch.encode(region),
        }
    }
}
