//! 硬件相关常量定义
//!
//! 集中定义所有协议相关的常量，避免在代码中散落"魔法数"。

/// 串口帧头字节（连续出现两次）
pub const FRAME_SENTINEL: u8 = 0x55;

/// 帧开销：2 字节帧头 + ID + 长度 + 指令 + 校验和
pub const FRAME_OVERHEAD: usize = 6;

/// 编码侧参数区上限（长度字节必须能容纳 参数数 + 2）
pub const MAX_FRAME_PARAMS: usize = 250;

/// 接收侧响应参数上限（实际总线上观测到的最大响应为 7 字节参数）
pub const MAX_RESPONSE_PARAMS: usize = 7;

/// 接收侧长度字节上限（`MAX_RESPONSE_PARAMS + 2`）
pub const MAX_RESPONSE_LENGTH_FIELD: u8 = 9;

/// 单条总线上最多支持的舵机数
pub const MAX_SERVOS: usize = 16;

/// 遥测记录长度（`TelemetryBase` 起连续 30 字节）
pub const TELEMETRY_RECORD_LEN: usize = 30;

/// 协处理器轮询块中每个舵机记录的步长
///
/// 轮询块是固件内存里的结构体原样拷贝，记录按 C 自然对齐布局：
/// `lock_mark` 之后与 `current_current` 之前各有一个填充字节，
/// 共 34 字节。与单舵机读取的 30 字节紧凑寄存器布局不同。
pub const SERVO_DATA_STRIDE: usize = 34;

/// 共享内存窗口的物理基地址（协处理器侧约定）
pub const SHARED_REGION_PADDR: u32 = 0x9FD0_0000;

/// 共享内存窗口大小
///
/// 必须容纳最大的编组结构：16 舵机批量写命令（113 字节）
/// 以及轮询返回的 `ServoData` 块（16 × 34 + 4 = 548 字节）。
pub const SHARED_REGION_SIZE: usize = 1024;

/// 舵机读结果在共享内存中的偏移（协处理器侧约定）
pub const MAILBOX_RESULT_OFFSET: usize = 5;

/// 邮箱调用的固定阻塞时限（毫秒），写入控制块的辅助时间字段
pub const MAILBOX_CALL_MSTIME: u16 = 100;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::ServoBatch;

    #[test]
    fn test_shared_region_fits_largest_structures() {
        // 批量写命令
        assert!(ServoBatch::ENCODED_LEN <= SHARED_REGION_SIZE);
        // 轮询块：16 × 32 + 4 字节计数器
        assert!(MAX_SERVOS * SERVO_DATA_STRIDE + 4 <= SHARED_REGION_SIZE);
    }

    #[test]
    fn test_length_field_bound() {
        assert_eq!(MAX_RESPONSE_LENGTH_FIELD as usize, MAX_RESPONSE_PARAMS + 2);
    }
}
