//! 遥测记录解析
//!
//! 同一组字段有两种线上布局：
//!
//! - 寄存器块（[`ServoTelemetry::from_bytes`]）：单舵机读取从
//!   `TelemetryBase` (0x28) 起连续 30 字节，偏移与固件侧寄存器表
//!   一致，10..=14 与 27 为保留字节，无填充。
//! - 轮询记录（[`ServoTelemetry::from_poll_record`]）：协处理器把
//!   自己内存里的结构体原样拷贝进共享区域，记录按 C 自然对齐
//!   布局占 34 字节——`lock_mark` (16) 之后与 `current_current`
//!   (32) 之前各有一个填充字节。
//!
//! 两者都是单次读取整体返回、立即被调用方消费，不做任何持久化。

use crate::constants::{MAX_SERVOS, SERVO_DATA_STRIDE, TELEMETRY_RECORD_LEN};
use crate::ProtocolError;

/// 单舵机遥测记录（30 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServoTelemetry {
    pub torque_switch: u8,
    pub acceleration: u8,
    pub target_location: i16,
    pub running_time: u16,
    pub running_speed: u16,
    pub torque_limit: u16,
    pub lock_mark: u8,
    pub current_location: i16,
    pub current_speed: i16,
    pub current_load: i16,
    pub current_voltage: u8,
    pub current_temperature: u8,
    pub async_write_flag: u8,
    pub servo_status: u8,
    pub mobile_sign: u8,
    pub current_current: u16,
}

impl ServoTelemetry {
    /// 从 30 字节寄存器块解析
    ///
    /// # 错误
    /// - `InvalidLength`: 输入不足 30 字节
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < TELEMETRY_RECORD_LEN {
            return Err(ProtocolError::InvalidLength {
                length: TELEMETRY_RECORD_LEN as u8,
                actual: data.len(),
            });
        }

        Ok(ServoTelemetry {
            torque_switch: data[0],
            acceleration: data[1],
            target_location: i16::from_le_bytes([data[2], data[3]]),
            running_time: u16::from_le_bytes([data[4], data[5]]),
            running_speed: u16::from_le_bytes([data[6], data[7]]),
            torque_limit: u16::from_le_bytes([data[8], data[9]]),
            // data[10..=14] 保留
            lock_mark: data[15],
            current_location: i16::from_le_bytes([data[16], data[17]]),
            current_speed: i16::from_le_bytes([data[18], data[19]]),
            current_load: i16::from_le_bytes([data[20], data[21]]),
            current_voltage: data[22],
            current_temperature: data[23],
            async_write_flag: data[24],
            servo_status: data[25],
            mobile_sign: data[26],
            // data[27] 保留
            current_current: u16::from_le_bytes([data[28], data[29]]),
        })
    }

    /// 从轮询块中的 34 字节对齐记录解析
    ///
    /// 偏移为 C 自然对齐布局：`lock_mark` 16、`current_location` 18、
    /// `current_speed` 20、`current_load` 22、电压/温度 24/25、
    /// `current_current` 32。
    ///
    /// # 错误
    /// - `InvalidLength`: 输入不足 34 字节
    pub fn from_poll_record(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < SERVO_DATA_STRIDE {
            return Err(ProtocolError::InvalidLength {
                length: SERVO_DATA_STRIDE as u8,
                actual: data.len(),
            });
        }

        Ok(ServoTelemetry {
            torque_switch: data[0],
            acceleration: data[1],
            target_location: i16::from_le_bytes([data[2], data[3]]),
            running_time: u16::from_le_bytes([data[4], data[5]]),
            running_speed: u16::from_le_bytes([data[6], data[7]]),
            torque_limit: u16::from_le_bytes([data[8], data[9]]),
            // data[10..=15] 保留
            lock_mark: data[16],
            // data[17] 对齐填充
            current_location: i16::from_le_bytes([data[18], data[19]]),
            current_speed: i16::from_le_bytes([data[20], data[21]]),
            current_load: i16::from_le_bytes([data[22], data[23]]),
            current_voltage: data[24],
            current_temperature: data[25],
            async_write_flag: data[26],
            servo_status: data[27],
            mobile_sign: data[28],
            // data[29..=30] 保留，data[31] 对齐填充
            current_current: u16::from_le_bytes([data[32], data[33]]),
        })
    }
}

/// 协处理器轮询块：全部 16 舵机遥测 + 任务运行计数
///
/// 每个舵机记录按 [`SERVO_DATA_STRIDE`]（34 字节）排列，
/// 计数器位于块偏移 544 处，总长 548 字节。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServoData {
    pub servo: [ServoTelemetry; MAX_SERVOS],
    pub task_run_count: u32,
}

impl ServoData {
    /// 轮询块的总编码长度
    pub const ENCODED_LEN: usize = MAX_SERVOS * SERVO_DATA_STRIDE + 4;

    /// 从共享内存轮询块解析
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < Self::ENCODED_LEN {
            return Err(ProtocolError::InvalidLength {
                length: 0,
                actual: data.len(),
            });
        }

        let mut servo = [ServoTelemetry::default(); MAX_SERVOS];
        for (i, slot) in servo.iter_mut().enumerate() {
            let base = i * SERVO_DATA_STRIDE;
            *slot = ServoTelemetry::from_poll_record(&data[base..base + SERVO_DATA_STRIDE])?;
        }

        let count_base = MAX_SERVOS * SERVO_DATA_STRIDE;
        let task_run_count = u32::from_le_bytes([
            data[count_base],
            data[count_base + 1],
            data[count_base + 2],
            data[count_base + 3],
        ]);

        Ok(ServoData {
            servo,
            task_run_count,
        })
    }
}
