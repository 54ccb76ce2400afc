//! 串口帧编码/解码与校验和
//!
//! 帧格式：
//!
//! ```text
//! 0x55 0x55 | id | len | cmd | params[0..N] | checksum
//! ```
//!
//! - `len` 恒等于 `N + 2`（参数数 + 指令与校验和之外的计数约定）
//! - `checksum = 255 - ((id + len + cmd + sum(params)) mod 256)`
//!
//! 校验和只覆盖 id 起至参数区末尾的字节，帧头两字节不参与。
//! 编码与解码共用同一个 [`checksum`] 函数，调用方传入去掉帧头
//! 与校验和字节后的切片。

use crate::constants::{FRAME_OVERHEAD, FRAME_SENTINEL, MAX_FRAME_PARAMS};
use crate::ProtocolError;

/// 解码后的串口帧
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    /// 响应者/目标舵机 ID（原始字节，可能为广播哨兵）
    pub servo_id: u8,
    /// 指令码（原始字节，响应帧可能携带枚举之外的值）
    pub command: u8,
    /// 参数区
    pub params: Vec<u8>,
}

/// 计算校验和
///
/// `body` 为 id 起至参数区末尾的字节（不含帧头、不含校验和字节）。
/// 纯函数：`255 - (sum(body) mod 256)`。
pub fn checksum(body: &[u8]) -> u8 {
    let sum: u8 = body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    255 - sum
}

/// 编码一个串口帧
///
/// # 错误
/// - `ParameterTooLarge`: `params.len() > 250`（长度字节放不下）
pub fn encode_frame(servo_id: u8, command: u8, params: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if params.len() > MAX_FRAME_PARAMS {
        return Err(ProtocolError::ParameterTooLarge {
            len: params.len(),
            max: MAX_FRAME_PARAMS,
        });
    }

    let mut frame = Vec::with_capacity(FRAME_OVERHEAD + params.len());
    frame.push(FRAME_SENTINEL);
    frame.push(FRAME_SENTINEL);
    frame.push(servo_id);
    frame.push((params.len() + 2) as u8);
    frame.push(command);
    frame.extend_from_slice(params);
    frame.push(checksum(&frame[2..]));
    Ok(frame)
}

/// 解码一个完整的串口帧
///
/// 结构性校验：帧头、长度字节与实际帧长的一致性、校验和。
/// 接收方向上的长度上限（参数数 ≤ 7）由串口链路引擎在收包
/// 过程中强制，这里不重复。
///
/// # 错误
/// - `InvalidHeader`: 帧头两字节不全为 0x55
/// - `InvalidLength`: 帧长不足或长度字节与帧长不一致
/// - `ChecksumMismatch`: 校验和不匹配
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, ProtocolError> {
    if bytes.len() < FRAME_OVERHEAD {
        return Err(ProtocolError::InvalidLength {
            length: bytes.get(3).copied().unwrap_or(0),
            actual: bytes.len(),
        });
    }
    if bytes[0] != FRAME_SENTINEL || bytes[1] != FRAME_SENTINEL {
        return Err(ProtocolError::InvalidHeader {
            b0: bytes[0],
            b1: bytes[1],
        });
    }

    let length = bytes[3];
    // len = N + 2，总帧长 = N + 6 = len + 4
    if (length as usize) < 2 || length as usize + 4 != bytes.len() {
        return Err(ProtocolError::InvalidLength {
            length,
            actual: bytes.len(),
        });
    }

    let expected = checksum(&bytes[2..bytes.len() - 1]);
    let actual = bytes[bytes.len() - 1];
    if expected != actual {
        return Err(ProtocolError::ChecksumMismatch { expected, actual });
    }

    Ok(Frame {
        servo_id: bytes[2],
        command: bytes[4],
        params: bytes[5..bytes.len() - 1].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_move_frame() {
        // 移动 1 号舵机到 500，耗时 1000ms
        let frame = encode_frame(1, 1, &[0xF4, 0x01, 0xE8, 0x03]).unwrap();
        assert_eq!(frame[0], 0x55);
        assert_eq!(frame[1], 0x55);
        assert_eq!(frame[2], 1);
        assert_eq!(frame[3], 6); // 4 参数 + 2
        assert_eq!(frame[4], 1);
        assert_eq!(frame.len(), 10);

        // 校验和手算：255 - (1 + 6 + 1 + 0xF4 + 0x01 + 0xE8 + 0x03) mod 256
        let sum = (1u32 + 6 + 1 + 0xF4 + 0x01 + 0xE8 + 0x03) % 256;
        assert_eq!(frame[9], (255 - sum) as u8);
    }

    #[test]
    fn test_encode_rejects_oversized_params() {
        let params = vec![0u8; 251];
        let err = encode_frame(1, 1, &params).unwrap_err();
        assert!(matches!(
            err,
            crate::ProtocolError::ParameterTooLarge { len: 251, .. }
        ));

        // 250 恰好可编码
        let params = vec![0u8; 250];
        assert!(encode_frame(1, 1, &params).is_ok());
    }

    #[test]
    fn test_decode_rejects_bad_header() {
        let mut frame = encode_frame(1, 28, &[]).unwrap();
        frame[1] = 0x12;
        assert!(matches!(
            decode_frame(&frame),
            Err(crate::ProtocolError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_inconsistent_length() {
        let mut frame = encode_frame(1, 28, &[0x01, 0x02]).unwrap();
        frame[3] = 9; // 声称 7 参数，实际 2
        assert!(matches!(
            decode_frame(&frame),
            Err(crate::ProtocolError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        let mut frame = encode_frame(1, 28, &[0x01, 0x02]).unwrap();
        let last = frame.len() - 1;
        frame[last] = frame[last].wrapping_add(1);
        assert!(matches!(
            decode_frame(&frame),
            Err(crate::ProtocolError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_roundtrip_basic() {
        let frame = encode_frame(7, 28, &[0xAA, 0xBB]).unwrap();
        let decoded = decode_frame(&frame).unwrap();
        assert_eq!(decoded.servo_id, 7);
        assert_eq!(decoded.command, 28);
        assert_eq!(decoded.params, vec![0xAA, 0xBB]);
    }

    #[test]
    fn test_checksum_is_pure() {
        let body = [1u8, 6, 1, 0xF4, 0x01, 0xE8, 0x03];
        let a = checksum(&body);
        let b = checksum(&body);
        assert_eq!(a, b);
    }

    #[test]
    fn test_checksum_known_vector() {
        // 255 - (1 + 4 + 28) = 222
        assert_eq!(checksum(&[1, 4, 28]), 222);
    }

    proptest! {
        /// 任意合法 (id, cmd, params) 的编码都能解码回原值
        #[test]
        fn prop_roundtrip(
            id in 0u8..=255,
            cmd in 0u8..=255,
            params in proptest::collection::vec(any::<u8>(), 0..=250),
        ) {
            let frame = encode_frame(id, cmd, &params).unwrap();
            let decoded = decode_frame(&frame).unwrap();
            prop_assert_eq!(decoded.servo_id, id);
            prop_assert_eq!(decoded.command, cmd);
            prop_assert_eq!(decoded.params, params);
        }

        /// 编码出的帧重算校验和永远匹配
        #[test]
        fn prop_checksum_validates(
            id in 0u8..=255,
            cmd in 0u8..=255,
            params in proptest::collection::vec(any::<u8>(), 0..=250),
        ) {
            let frame = encode_frame(id, cmd, &params).unwrap();
            let body = &frame[2..frame.len() - 1];
            prop_assert_eq!(checksum(body), frame[frame.len() - 1]);
        }
    }
}
