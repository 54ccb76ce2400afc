//! 串口链路引擎
//!
//! 在一条共享字节通道上实现"发出命令、在时限内收到经过校验的
//! 响应、否则超时"的契约。不做任何自动重试；所有超时原样
//! 上报，由调用方决定是否重试。

use crate::channel::ByteChannel;
use crate::receiver::{ChecksumPolicy, FrameReceiver, RxStep};
use crate::SerialError;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use sts_protocol::{decode_position, encode_frame, Command, Frame, ServoId};
use tracing::trace;

/// 链路配置
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    /// 单次字节读取的时间片（叠加在整体时限之内）
    pub slice_timeout: Duration,
    /// 收包校验和策略（见 [`ChecksumPolicy`]）
    pub checksum_policy: ChecksumPolicy,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            slice_timeout: Duration::from_millis(10),
            checksum_policy: ChecksumPolicy::default(),
        }
    }
}

/// 串口链路引擎
///
/// 通道由锁保护：`send` 只在写入期间持锁，等待响应的读取
/// 逐时间片持锁。两次写入的字节绝不交错；发送与等待响应
/// 跨调用方的交错排序是调用方的责任。
///
/// 所有等待都阻塞当前执行上下文直至完成或超时；除时限外
/// 没有其他取消原语。
pub struct SerialLink<C: ByteChannel> {
    channel: Mutex<C>,
    config: LinkConfig,
}

impl<C: ByteChannel> SerialLink<C> {
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, LinkConfig::default())
    }

    pub fn with_config(channel: C, config: LinkConfig) -> Self {
        SerialLink {
            channel: Mutex::new(channel),
            config,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// 发送一帧（不等待响应）
    ///
    /// 作用域锁只覆盖写入；写完即释放。
    pub fn send(&self, id: ServoId, command: Command, params: &[u8]) -> Result<(), SerialError> {
        let frame = encode_frame(id.get(), command.into(), params)?;
        let mut channel = self.channel.lock();
        channel.write_all(&frame)?;
        Ok(())
    }

    /// 发送并等待匹配的响应帧
    ///
    /// 收包状态机对垃圾字节与不匹配的帧静默再同步；超时不早于
    /// `deadline`，不晚于 `deadline + slice_timeout`。收到的帧还要
    /// 满足指令约定的响应参数数（[`Command::response_params_len`]），
    /// 通过校验但形状不符的帧以 `BadResponse` 上报。
    ///
    /// # 错误
    /// - `ResponseTimeout`: 时限内未收到匹配响应
    /// - `BadResponse`: 响应参数数与指令约定不符
    /// - `Io`: 通道读写失败
    pub fn send_and_await(
        &self,
        id: ServoId,
        command: Command,
        params: &[u8],
        deadline: Duration,
    ) -> Result<Frame, SerialError> {
        self.send(id, command, params)?;

        let mut rx = FrameReceiver::new(id, command, self.config.checksum_policy);
        let start = Instant::now();

        loop {
            // 每轮一个读取时间片；锁不跨时间片持有
            let byte = {
                let mut channel = self.channel.lock();
                channel.read_byte(self.config.slice_timeout)?
            };

            if let Some(byte) = byte {
                match rx.push(byte) {
                    RxStep::Complete(frame) => {
                        if let Some(expected) = command.response_params_len() {
                            if frame.params.len() != expected {
                                return Err(SerialError::BadResponse(
                                    "response parameter count mismatch",
                                ));
                            }
                        }
                        return Ok(frame);
                    }
                    RxStep::Rejected(reason) => {
                        trace!("Frame rejected ({:?}), still waiting", reason);
                    }
                    RxStep::Pending => {}
                }
            }

            // 每轮迭代只做一次时限检查
            if start.elapsed() >= deadline {
                return Err(SerialError::ResponseTimeout);
            }
        }
    }

    /// 读取当前位置（小端有符号 16 位，带补码回绕）
    pub fn read_position(&self, id: ServoId, deadline: Duration) -> Result<i16, SerialError> {
        let frame = self.send_and_await(id, Command::PosRead, &[], deadline)?;
        match frame.params.as_slice() {
            [low, high, ..] => Ok(decode_position(*low, *high)),
            _ => Err(SerialError::BadResponse("position response too short")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex as StdMutex};

    /// 预先编排好接收字节的测试通道
    struct ScriptedChannel {
        incoming: VecDeque<u8>,
        written: Arc<StdMutex<Vec<u8>>>,
    }

    impl ScriptedChannel {
        fn new(incoming: Vec<u8>) -> (Self, Arc<StdMutex<Vec<u8>>>) {
            let written = Arc::new(StdMutex::new(Vec::new()));
            (
                ScriptedChannel {
                    incoming: incoming.into(),
                    written: written.clone(),
                },
                written,
            )
        }
    }

    impl ByteChannel for ScriptedChannel {
        fn read_byte(&mut self, _timeout: Duration) -> io::Result<Option<u8>> {
            Ok(self.incoming.pop_front())
        }

        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.written.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }
    }

    /// 每个时间片真实休眠的静默通道（用于超时窗口测试）
    struct SilentChannel;

    impl ByteChannel for SilentChannel {
        fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
            std::thread::sleep(timeout);
            Ok(None)
        }

        fn write_all(&mut self, _bytes: &[u8]) -> io::Result<()> {
            Ok(())
        }
    }

    fn id(raw: u8) -> ServoId {
        ServoId::new(raw).unwrap()
    }

    #[test]
    fn test_send_writes_full_frame() {
        let (channel, written) = ScriptedChannel::new(vec![]);
        let link = SerialLink::new(channel);

        link.send(id(1), Command::MoveTimeWrite, &[0xF4, 0x01, 0xE8, 0x03])
            .unwrap();

        let bytes = written.lock().unwrap();
        assert_eq!(
            *bytes,
            encode_frame(1, 1, &[0xF4, 0x01, 0xE8, 0x03]).unwrap()
        );
    }

    #[test]
    fn test_send_and_await_happy_path() {
        let response = encode_frame(1, 28, &[0xF4, 0x01]).unwrap();
        let (channel, _) = ScriptedChannel::new(response);
        let link = SerialLink::new(channel);

        let frame = link
            .send_and_await(id(1), Command::PosRead, &[], Duration::from_millis(100))
            .unwrap();
        assert_eq!(frame.params, vec![0xF4, 0x01]);
    }

    #[test]
    fn test_send_and_await_resyncs_through_garbage() {
        // 伪帧头 + 不匹配的帧 + 有效响应
        let mut stream = vec![0x55, 0x12];
        stream.extend_from_slice(&encode_frame(2, 28, &[0x00, 0x00]).unwrap());
        stream.extend_from_slice(&encode_frame(1, 28, &[0xF4, 0x01]).unwrap());

        let (channel, _) = ScriptedChannel::new(stream);
        let link = SerialLink::new(channel);

        let frame = link
            .send_and_await(id(1), Command::PosRead, &[], Duration::from_millis(100))
            .unwrap();
        assert_eq!(frame.servo_id, 1);
        assert_eq!(frame.params, vec![0xF4, 0x01]);
    }

    #[test]
    fn test_await_rejects_wrong_response_shape() {
        // 校验和、指令码、ID 都匹配，但 PosRead 的响应应为 2 参数
        let response = encode_frame(1, 28, &[0xF4]).unwrap();
        let (channel, _) = ScriptedChannel::new(response);
        let link = SerialLink::new(channel);

        let err = link
            .send_and_await(id(1), Command::PosRead, &[], Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, SerialError::BadResponse(_)));
    }

    #[test]
    fn test_read_position_decodes_wraparound() {
        let response = encode_frame(1, 28, &[0x00, 0x80]).unwrap();
        let (channel, _) = ScriptedChannel::new(response);
        let link = SerialLink::new(channel);

        let position = link.read_position(id(1), Duration::from_millis(100)).unwrap();
        assert_eq!(position, -32768);
    }

    #[test]
    fn test_timeout_on_silent_channel() {
        let deadline = Duration::from_millis(50);
        let slice = Duration::from_millis(10);
        let link = SerialLink::with_config(
            SilentChannel,
            LinkConfig {
                slice_timeout: slice,
                checksum_policy: ChecksumPolicy::Strict,
            },
        );

        let start = Instant::now();
        let err = link
            .send_and_await(id(1), Command::PosRead, &[], deadline)
            .unwrap_err();
        let elapsed = start.elapsed();

        assert!(err.is_timeout());
        // 不早于时限，不晚于时限 + 一个时间片（加少量调度余量）
        assert!(elapsed >= deadline, "returned early: {:?}", elapsed);
        assert!(
            elapsed <= deadline + slice + Duration::from_millis(20),
            "returned late: {:?}",
            elapsed
        );
    }

    #[test]
    fn test_timeout_with_only_unmatched_frames() {
        // 通道里只有不匹配的帧：引擎静默再同步直到超时
        let mut stream = Vec::new();
        for _ in 0..3 {
            stream.extend_from_slice(&encode_frame(2, 28, &[0x00, 0x00]).unwrap());
        }
        let (channel, _) = ScriptedChannel::new(stream);
        let link = SerialLink::with_config(
            channel,
            LinkConfig {
                slice_timeout: Duration::from_millis(1),
                checksum_policy: ChecksumPolicy::Strict,
            },
        );

        let err = link
            .send_and_await(id(1), Command::PosRead, &[], Duration::from_millis(20))
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
