//! # STS Serial
//!
//! 串口链路引擎：在一条共享字节通道上发送舵机命令并等待
//! 经过校验的响应。
//!
//! ## 分层
//!
//! - [`channel`]: 字节通道抽象（带时限读一字节 / 整体写）
//! - [`receiver`]: 收包有限状态机（帧头同步、长度界检查、
//!   校验和策略、命令/ID 匹配、垃圾字节再同步）
//! - [`link`]: 引擎本体（写互斥、整体时限、逐片读取）
//!
//! ## 并发约定
//!
//! 写方通过作用域锁互斥，锁只覆盖写入本身；一个调用方的发送
//! 与另一个调用方的等待响应可能交错，排序责任在调用方。
//! 引擎只保证两次写入的字节绝不交错。

pub mod channel;
pub mod link;
pub mod receiver;

pub use channel::{ByteChannel, SerialPortChannel};
pub use link::{LinkConfig, SerialLink};
pub use receiver::{ChecksumPolicy, FrameReceiver, RejectReason, RxStep};

use sts_protocol::ProtocolError;
use thiserror::Error;

/// 串口链路错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    /// 底层通道 IO 错误
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 编码阶段协议错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 整体时限内未收到匹配的响应
    ///
    /// 帧级错误（坏帧头、坏长度、不匹配的响应）在引擎内部
    /// 通过再同步静默恢复，只会以额外延迟的形式计入时限；
    /// 唯一对外的失败就是这个超时。
    #[error("Response timeout")]
    ResponseTimeout,

    /// 响应形状不符合所等待的指令
    #[error("Unexpected response shape: {0}")]
    BadResponse(&'static str),
}

impl SerialError {
    /// 是否为时限超时（可区分的结果，调用方自行决定是否重试）
    pub fn is_timeout(&self) -> bool {
        matches!(self, SerialError::ResponseTimeout)
    }
}
