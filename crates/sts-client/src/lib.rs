//! STS 舵机会话层
//!
//! 在两条传输链路之上提供统一的调用门面：
//!
//! - 串口链路（[`sts_serial`]）：逐帧寻址单个舵机
//! - 协处理器邮箱（[`sts_mailbox`]）：共享内存批量读写
//!
//! 会话负责输入钳位和响应解释；链路差异通过 [`ServoTransport`]
//! 抹平，串口不支持的批量/轮询操作以 `Unsupported` 上报而非静默
//! 降级。

pub mod session;
pub mod transport;

pub use session::ServoSession;
pub use transport::{MailboxBackend, SerialBackend, ServoTransport};

use sts_mailbox::MailboxError;
use sts_serial::SerialError;
use thiserror::Error;

/// 会话层错误类型
#[derive(Error, Debug)]
pub enum SessionError {
    /// 串口链路错误
    #[error("Serial transport error: {0}")]
    Serial(#[from] SerialError),

    /// 邮箱链路错误
    #[error("Mailbox transport error: {0}")]
    Mailbox(#[from] MailboxError),

    /// 当前传输链路不支持该操作
    #[error("Operation not supported on this transport: {0}")]
    Unsupported(&'static str),
}

impl SessionError {
    /// 是否为响应超时（调用方可据此决定重试）
    ///
    /// 两条链路的超时都归入此类：串口的整体时限耗尽，以及
    /// 邮箱触发阶段的 mstime 到期。
    pub fn is_timeout(&self) -> bool {
        match self {
            SessionError::Serial(e) => e.is_timeout(),
            SessionError::Mailbox(e) => e.is_timeout(),
            SessionError::Unsupported(_) => false,
        }
    }
}
