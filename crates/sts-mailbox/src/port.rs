//! 邮箱端口抽象
//!
//! 传输层对硬件只有四个诉求：访问共享区域、刷新、触发、失效。
//! 真实后端见 [`crate::cvitek`]；测试通过记录操作序列的 mock
//! 端口验证传输层的顺序不变量。

use crate::MailboxError;
use sts_protocol::MailboxOpcode;

/// 邮箱端口
///
/// # 语义
/// - `region`/`region_mut`: 共享内存窗口的主机侧视图
/// - `flush`: 把主机写入的缓存行回写到物理内存
/// - `trigger`: 阻塞的邮箱请求，直至协处理器应答或设备超时；
///   `mstime` 为写入控制块辅助字段的毫秒时限
/// - `invalidate`: 失效主机侧缓存，随后读取的是协处理器写回的数据
///
/// 端口不保证调用顺序；顺序不变量由 [`crate::MailboxChannel`]
/// 无条件强制。
pub trait MailboxPort: Send {
    fn region(&self) -> &[u8];
    fn region_mut(&mut self) -> &mut [u8];
    fn flush(&mut self) -> Result<(), MailboxError>;
    fn trigger(&mut self, opcode: MailboxOpcode, mstime: u16) -> Result<(), MailboxError>;
    fn invalidate(&mut self) -> Result<(), MailboxError>;
}
