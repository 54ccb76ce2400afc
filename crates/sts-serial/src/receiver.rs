//! 收包有限状态机
//!
//! ```text
//! AwaitSync1 → AwaitSync2 → Collecting → (完成 | 再同步)
//! ```
//!
//! 状态机逐字节推进，对垃圾字节再同步而不报错：
//! - `AwaitSync1` 下非 0x55 的字节直接丢弃，状态不变
//! - `AwaitSync2` 下第二个字节不是 0x55 则回到 `AwaitSync1`
//!   （该字节同样被丢弃，不会作为新的候选帧头重试）
//! - 收满 5 字节后检查长度字节：超界（参数数 > 7）强制再同步
//! - 收满整帧（长度字节 + 4）后依次检查校验和策略、
//!   指令码、响应者 ID；任何不匹配静默再同步继续等待
//!
//! 状态机本身不持有时限；整体时限由链路引擎在每轮迭代检查。

use sts_protocol::{
    checksum, Command, Frame, ServoId, FRAME_SENTINEL, MAX_RESPONSE_LENGTH_FIELD,
};
use tracing::warn;

/// 校验和策略
///
/// 原固件的校验分支被一个恒真条件旁路，实际上从不因校验和
/// 拒绝响应。这里把它显式化为策略：默认严格校验；`Lenient`
/// 保留观测到的固件行为（仅凭指令码与 ID 匹配接受）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChecksumPolicy {
    /// 校验和不匹配的帧被拒绝并再同步（默认）
    #[default]
    Strict,
    /// 忽略校验和，仅匹配指令码与响应者 ID
    Lenient,
}

/// 一次 `push` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RxStep {
    /// 还在收包（或字节被静默丢弃）
    Pending,
    /// 一个完整帧因下列原因被拒绝，状态机已再同步
    Rejected(RejectReason),
    /// 收到匹配的完整帧
    Complete(Frame),
}

/// 完整帧被拒绝的原因（仅用于日志与测试观察，不对外报错）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// 长度字节超界（参数数 > 7）
    LengthOutOfBounds(u8),
    /// 校验和不匹配（仅 Strict 策略）
    ChecksumMismatch,
    /// 指令码与所等待的不符
    CommandMismatch(u8),
    /// 响应者 ID 与所寻址的不符（且未用广播通配）
    ResponderMismatch(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    AwaitSync1,
    AwaitSync2,
    Collecting,
}

/// 收包状态机
#[derive(Debug)]
pub struct FrameReceiver {
    state: RxState,
    buf: Vec<u8>,
    addressed_id: ServoId,
    awaited_command: u8,
    policy: ChecksumPolicy,
}

impl FrameReceiver {
    /// 为一次等待创建状态机
    ///
    /// `addressed_id` 为 [`ServoId::BROADCAST`] 时接受任意响应者。
    pub fn new(addressed_id: ServoId, awaited_command: Command, policy: ChecksumPolicy) -> Self {
        FrameReceiver {
            state: RxState::AwaitSync1,
            buf: Vec::with_capacity(MAX_RESPONSE_LENGTH_FIELD as usize + 4),
            addressed_id,
            awaited_command: awaited_command.into(),
            policy,
        }
    }

    fn reset(&mut self) {
        self.state = RxState::AwaitSync1;
        self.buf.clear();
    }

    /// 喂入一个字节，推进状态机
    pub fn push(&mut self, byte: u8) -> RxStep {
        match self.state {
            RxState::AwaitSync1 => {
                if byte == FRAME_SENTINEL {
                    self.buf.push(byte);
                    self.state = RxState::AwaitSync2;
                }
                // 非帧头字节静默丢弃
                RxStep::Pending
            }
            RxState::AwaitSync2 => {
                if byte == FRAME_SENTINEL {
                    self.buf.push(byte);
                    self.state = RxState::Collecting;
                } else {
                    // 第二字节不是帧头：丢弃并从头再同步
                    self.reset();
                }
                RxStep::Pending
            }
            RxState::Collecting => {
                self.buf.push(byte);

                // 收满 5 字节后长度字节可用，先做界检查
                if self.buf.len() == 5 {
                    let length = self.buf[3];
                    if length < 2 || length > MAX_RESPONSE_LENGTH_FIELD {
                        warn!("Invalid packet length {}, resyncing", length);
                        self.reset();
                        return RxStep::Rejected(RejectReason::LengthOutOfBounds(length));
                    }
                }

                // 总帧长 = 长度字节 + 4（含校验和）
                if self.buf.len() >= 5 && self.buf.len() == self.buf[3] as usize + 4 {
                    return self.validate();
                }
                RxStep::Pending
            }
        }
    }

    /// 整帧已缓冲：按策略校验并匹配指令码/响应者 ID
    fn validate(&mut self) -> RxStep {
        let last = self.buf.len() - 1;
        let sid = self.buf[2];
        let cmd = self.buf[4];

        if self.policy == ChecksumPolicy::Strict {
            let expected = checksum(&self.buf[2..last]);
            if self.buf[last] != expected {
                warn!(
                    "Invalid checksum from servo {}: expected 0x{:02X}, got 0x{:02X}",
                    sid, expected, self.buf[last]
                );
                self.reset();
                return RxStep::Rejected(RejectReason::ChecksumMismatch);
            }
        }

        if cmd != self.awaited_command {
            warn!(
                "Unexpected command 0x{:02X} (awaiting 0x{:02X})",
                cmd, self.awaited_command
            );
            self.reset();
            return RxStep::Rejected(RejectReason::CommandMismatch(cmd));
        }

        if !self.addressed_id.is_broadcast() && sid != self.addressed_id.get() {
            warn!(
                "Unexpected servo ID {} (addressing {})",
                sid,
                self.addressed_id.get()
            );
            self.reset();
            return RxStep::Rejected(RejectReason::ResponderMismatch(sid));
        }

        let frame = Frame {
            servo_id: sid,
            command: cmd,
            params: self.buf[5..last].to_vec(),
        };
        self.reset();
        RxStep::Complete(frame)
    }
}
