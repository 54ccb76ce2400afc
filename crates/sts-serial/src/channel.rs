//! 字节通道抽象
//!
//! 链路引擎只消费两个原语：带时限读一个字节、整体写 N 个字节。
//! 波特率等串口参数（8N1、无流控）在打开通道时固定，
//! 不属于引擎的关注点。

use crate::SerialError;
use std::io;
use std::time::Duration;
use tracing::trace;

/// 原始字节通道
///
/// # 语义
/// - `read_byte`: 阻塞至多 `timeout`，`Ok(None)` 表示该时间片内
///   没有字节到达（非错误，引擎据此推进整体时限）
/// - `write_all`: 写完全部字节才返回
pub trait ByteChannel: Send {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>>;
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// 基于 `serialport` 的操作系统串口通道
///
/// # 示例
///
/// ```no_run
/// use sts_serial::SerialPortChannel;
///
/// let channel = SerialPortChannel::open("/dev/ttyUSB0", 115_200).unwrap();
/// ```
pub struct SerialPortChannel {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialPortChannel {
    /// 以 8N1、无流控打开串口
    ///
    /// # 错误
    /// - `SerialError::Io`: 设备不存在、权限不足等
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, SerialError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(10))
            .open()
            .map_err(io::Error::from)?;

        trace!("Serial port '{}' opened at {} baud (8N1)", path, baud_rate);
        Ok(SerialPortChannel { port })
    }
}

impl ByteChannel for SerialPortChannel {
    fn read_byte(&mut self, timeout: Duration) -> io::Result<Option<u8>> {
        self.port.set_timeout(timeout).map_err(io::Error::from)?;

        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.port, bytes)
    }
}
