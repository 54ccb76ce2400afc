//! # STS Protocol
//!
//! 舵机总线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量定义
//! - `ids`: 舵机 ID、串口指令码、寄存器地址、邮箱操作码
//! - `frame`: 串口帧编码/解码与校验和
//! - `telemetry`: 遥测记录解析（30 字节记录）
//! - `mailbox`: 邮箱命令的载荷编码（共享内存格式）
//!
//! ## 字节序
//!
//! 串口帧与共享内存格式统一使用小端字节序（LSB 在前）。
//! 位置等有符号 16 位值超过 32767 时按二进制补码回绕为负值，
//! 本模块提供 `decode_position` 统一处理。

pub mod constants;
pub mod frame;
pub mod ids;
pub mod mailbox;
pub mod telemetry;

// 重新导出常用类型
pub use constants::*;
pub use frame::*;
pub use ids::*;
pub use mailbox::*;
pub use telemetry::*;

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// 参数区超过长度字节可表达的上限
    #[error("Parameter field too large: {len} bytes (max {max})")]
    ParameterTooLarge { len: usize, max: usize },

    /// 帧头不是 0x55 0x55
    #[error("Invalid frame header: expected 0x55 0x55, got 0x{b0:02X} 0x{b1:02X}")]
    InvalidHeader { b0: u8, b1: u8 },

    /// 长度字节与实际帧长不一致
    #[error("Invalid frame length: length byte {length}, frame size {actual}")]
    InvalidLength { length: u8, actual: usize },

    /// 校验和不匹配
    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// 字段取值非法
    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: u8 },

    /// 批量命令已达最大舵机数
    #[error("Servo batch full (max {max} entries)")]
    BatchFull { max: usize },

    /// 目标缓冲区放不下编码结果
    #[error("Region too small: need {needed} bytes, have {available}")]
    RegionTooSmall { needed: usize, available: usize },
}

/// 从响应参数重建小端有符号 16 位位置值
///
/// 超过有符号范围中点的值按二进制补码回绕为负
/// （即减去 65536），与固件行为逐字节一致：
///
/// ```
/// use sts_protocol::decode_position;
///
/// assert_eq!(decode_position(0xFF, 0x7F), 32767);
/// assert_eq!(decode_position(0x00, 0x80), -32768);
/// ```
pub fn decode_position(low: u8, high: u8) -> i16 {
    i16::from_le_bytes([low, high])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_position_positive_max() {
        assert_eq!(decode_position(0xFF, 0x7F), 32767);
    }

    #[test]
    fn test_decode_position_negative_min() {
        // 0x8000 回绕为 -32768
        assert_eq!(decode_position(0x00, 0x80), -32768);
    }

    #[test]
    fn test_decode_position_zero() {
        assert_eq!(decode_position(0x00, 0x00), 0);
    }

    #[test]
    fn test_decode_position_wraparound() {
        // 65535 -> -1
        assert_eq!(decode_position(0xFF, 0xFF), -1);
        // 500（常见的中位位置）
        assert_eq!(decode_position(0xF4, 0x01), 500);
    }
}
