//! # STS Mailbox
//!
//! 共享内存邮箱传输：把舵机命令编组进一块与协处理器物理共享的
//! 内存窗口，通过阻塞的邮箱设备调用触发对侧，并在边界两侧执行
//! 必需的缓存维护（写后刷新、读前失效）。
//!
//! ## 模块
//!
//! - [`port`]: 邮箱端口抽象（区域访问 + 刷新/触发/失效三原语）
//! - [`channel`]: 传输本体，无条件强制 刷新 → 触发 → 失效 顺序
//! - [`cvitek`]: Linux/CVITEK 后端（`/dev/cvi-rtos-cmdqu` +
//!   `/dev/mem` 映射 + `/dev/ion` 缓存控制）
//!
//! ## 并发约定
//!
//! 每次 `call` 同步阻塞在邮箱设备上直至协处理器应答，这在事实上
//! 串行化了并发调用——但这是阻塞 ioctl 的副作用而非显式锁，
//! 多线程调用方必须自行在整个 `call` 外加互斥，避免两个线程
//! 交错写共享内存。

pub mod channel;
pub mod port;

#[cfg(target_os = "linux")]
pub mod cvitek;

pub use channel::{MailboxChannel, SpinDirection};
pub use port::MailboxPort;

#[cfg(target_os = "linux")]
pub use cvitek::CvitekPort;

use sts_protocol::ProtocolError;
use thiserror::Error;

/// 邮箱调用的失败阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    /// 触发前的缓存刷新
    Flush,
    /// 阻塞的邮箱请求本身
    Trigger,
    /// 读取结果前的缓存失效
    Invalidate,
}

/// 邮箱传输错误类型
///
/// 三个设备资源的打开/映射失败各自独立上报；调用中段的
/// ioctl 失败携带失败阶段。核心内部没有任何进程级致命路径。
#[derive(Error, Debug)]
pub enum MailboxError {
    /// 载荷编码错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 邮箱设备打开失败
    #[error("Mailbox device unavailable: {0}")]
    MailboxUnavailable(#[source] std::io::Error),

    /// 共享内存窗口映射失败
    #[error("Shared region mapping failed: {0}")]
    MappingFailed(#[source] std::io::Error),

    /// 缓存控制设备打开失败
    #[error("Cache control device unavailable: {0}")]
    CacheControlUnavailable(#[source] std::io::Error),

    /// 调用中段的 ioctl 失败（携带阶段）
    #[error("Ioctl failed at {stage:?} stage: {source}")]
    Ioctl {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
}

impl MailboxError {
    /// 是否为协处理器应答超时
    ///
    /// 邮箱请求阻塞至多控制块里的 mstime 毫秒；到期时设备以
    /// `ETIMEDOUT` 使触发阶段失败。缓存阶段的失败不属于超时。
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            MailboxError::Ioctl {
                stage: Stage::Trigger,
                source,
            } if source.kind() == std::io::ErrorKind::TimedOut
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_stage() {
        let err = MailboxError::Ioctl {
            stage: Stage::Trigger,
            source: std::io::Error::from_raw_os_error(libc_errno_timedout()),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Trigger"), "message: {}", msg);
    }

    fn libc_errno_timedout() -> i32 {
        110 // ETIMEDOUT
    }

    #[test]
    fn test_trigger_etimedout_is_timeout() {
        let err = MailboxError::Ioctl {
            stage: Stage::Trigger,
            source: std::io::Error::from_raw_os_error(libc_errno_timedout()),
        };
        assert!(err.is_timeout());
    }

    #[test]
    fn test_other_failures_are_not_timeouts() {
        // 同为 ETIMEDOUT 但发生在缓存阶段
        let err = MailboxError::Ioctl {
            stage: Stage::Invalidate,
            source: std::io::Error::from_raw_os_error(libc_errno_timedout()),
        };
        assert!(!err.is_timeout());

        // 触发阶段的非超时失败（EIO）
        let err = MailboxError::Ioctl {
            stage: Stage::Trigger,
            source: std::io::Error::from_raw_os_error(5),
        };
        assert!(!err.is_timeout());
    }
}
