//! Linux/CVITEK 邮箱后端
//!
//! 三个内核资源共同构成端口：
//!
//! - `/dev/cvi-rtos-cmdqu`: 邮箱设备，`_IOW('r', 2, unsigned long)`
//!   发出阻塞请求，直至协处理器应答
//! - `/dev/mem` + `mmap`: 固定物理窗口 `0x9FD0_0000` 的主机侧映射
//! - `/dev/ion`: 缓存控制设备，`ION_IOC_CUSTOM` 承载
//!   `FLUSH_PHY_RANGE` / `INVALIDATE_PHY_RANGE`
//!
//! 三者各自独立打开、独立失败上报；析构时逐一解除映射并关闭
//! 描述符，部分初始化状态下同样安全（映射有独立的守卫，文件
//! 描述符由 `File` 自动关闭）。

use crate::port::MailboxPort;
use crate::{MailboxError, Stage};
use bilge::prelude::*;
use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::io;
use std::num::NonZeroUsize;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::ptr::NonNull;
use std::slice;
use sts_protocol::{MailboxOpcode, SHARED_REGION_PADDR, SHARED_REGION_SIZE};
use tracing::{info, trace};

const MAILBOX_DEVICE: &str = "/dev/cvi-rtos-cmdqu";
const MEM_DEVICE: &str = "/dev/mem";
const ION_DEVICE: &str = "/dev/ion";

const ION_IOC_CVITEK_FLUSH_PHY_RANGE: libc::c_uint = 4;
const ION_IOC_CVITEK_INVALIDATE_PHY_RANGE: libc::c_uint = 5;

/// `ION_IOC_CUSTOM` 的载荷
#[repr(C)]
struct IonCustomData {
    cmd: libc::c_uint,
    arg: libc::c_ulong,
}

/// 物理范围缓存操作的参数块
#[repr(C)]
struct CacheRange {
    /// 虚拟地址（物理范围操作不使用，置 0）
    start: libc::c_ulong,
    size: u32,
    paddr: u64,
}

/// 邮箱控制块的标志字节：低 7 位操作码 + 最高位 block 标志
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy)]
struct CmdFlags {
    cmd_id: u7,
    block: u1,
}

/// 邮箱控制块（固定 8 字节，8 字节对齐）
///
/// `param_ptr` 携带共享窗口的物理基地址，协处理器据此定位载荷。
#[repr(C, align(8))]
#[derive(Debug, Clone, Copy)]
struct CmdQueueEntry {
    ip_id: u8,
    flags: u8,
    mstime: u16,
    param_ptr: u32,
}

nix::ioctl_readwrite!(ion_ioc_custom, b'I', 6, IonCustomData);
nix::ioctl_write_ptr_bad!(
    rtos_cmdqu_send_wait,
    nix::request_code_write!(b'r', 2, std::mem::size_of::<libc::c_ulong>()),
    CmdQueueEntry
);

/// 共享窗口映射的守卫：无论构造走到哪一步失败，都保证解除映射
struct Mapping {
    ptr: NonNull<libc::c_void>,
}

impl Drop for Mapping {
    fn drop(&mut self) {
        // 映射来自本守卫的独占所有权，解除一次且仅一次
        if let Err(e) = unsafe { munmap(self.ptr, SHARED_REGION_SIZE) } {
            trace!("munmap of shared region failed: {}", e);
        }
    }
}

// 映射指针只经由 &self / &mut self 访问，单一所有者
unsafe impl Send for Mapping {}

/// CVITEK 邮箱端口
pub struct CvitekPort {
    mailbox: File,
    ion: File,
    mapping: Mapping,
    /// 映射存续期间必须保持打开
    _mem: File,
}

impl CvitekPort {
    /// 打开全部三个设备并映射共享窗口
    ///
    /// # 错误
    /// - `MailboxUnavailable`: 邮箱设备打开失败
    /// - `MappingFailed`: `/dev/mem` 打开或 `mmap` 失败
    /// - `CacheControlUnavailable`: 缓存控制设备打开失败
    ///
    /// 任何一步失败都会回收先前已获取的资源。
    pub fn open() -> Result<Self, MailboxError> {
        let mailbox = OpenOptions::new()
            .read(true)
            .write(true)
            .open(MAILBOX_DEVICE)
            .map_err(MailboxError::MailboxUnavailable)?;

        let mem = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(MEM_DEVICE)
            .map_err(MailboxError::MappingFailed)?;

        let len = const { NonZeroUsize::new(SHARED_REGION_SIZE).unwrap() };
        let ptr = unsafe {
            mmap(
                None,
                len,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &mem,
                SHARED_REGION_PADDR as libc::off_t,
            )
        }
        .map_err(|e| MailboxError::MappingFailed(io::Error::from(e)))?;
        let mapping = Mapping { ptr };

        let ion = OpenOptions::new()
            .read(true)
            .write(true)
            .open(ION_DEVICE)
            .map_err(MailboxError::CacheControlUnavailable)?;

        info!(
            "CVITEK mailbox port ready (shared window 0x{:08X}, {} bytes)",
            SHARED_REGION_PADDR, SHARED_REGION_SIZE
        );

        Ok(CvitekPort {
            mailbox,
            ion,
            mapping,
            _mem: mem,
        })
    }

    fn cache_op(&mut self, cmd: libc::c_uint, stage: Stage) -> Result<(), MailboxError> {
        let range = CacheRange {
            start: 0,
            size: SHARED_REGION_SIZE as u32,
            paddr: SHARED_REGION_PADDR as u64,
        };
        let mut data = IonCustomData {
            cmd,
            arg: &range as *const CacheRange as libc::c_ulong,
        };

        unsafe { ion_ioc_custom(self.ion.as_raw_fd(), &mut data) }.map_err(|e| {
            MailboxError::Ioctl {
                stage,
                source: io::Error::from(e),
            }
        })?;
        Ok(())
    }
}

impl MailboxPort for CvitekPort {
    fn region(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.mapping.ptr.as_ptr().cast(), SHARED_REGION_SIZE) }
    }

    fn region_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.mapping.ptr.as_ptr().cast(), SHARED_REGION_SIZE) }
    }

    fn flush(&mut self) -> Result<(), MailboxError> {
        self.cache_op(ION_IOC_CVITEK_FLUSH_PHY_RANGE, Stage::Flush)
    }

    fn trigger(&mut self, opcode: MailboxOpcode, mstime: u16) -> Result<(), MailboxError> {
        let flags = CmdFlags::new(u7::new(u8::from(opcode)), u1::new(0));
        let entry = CmdQueueEntry {
            ip_id: 0,
            flags: flags.into(),
            mstime,
            param_ptr: SHARED_REGION_PADDR,
        };

        trace!("Mailbox trigger {:?} (mstime {})", opcode, mstime);
        unsafe { rtos_cmdqu_send_wait(self.mailbox.as_raw_fd(), &entry) }.map_err(|e| {
            MailboxError::Ioctl {
                stage: Stage::Trigger,
                source: io::Error::from(e),
            }
        })?;
        Ok(())
    }

    fn invalidate(&mut self) -> Result<(), MailboxError> {
        self.cache_op(ION_IOC_CVITEK_INVALIDATE_PHY_RANGE, Stage::Invalidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmdqu_entry_layout() {
        // 控制块与内核约定：8 字节、8 字节对齐
        assert_eq!(std::mem::size_of::<CmdQueueEntry>(), 8);
        assert_eq!(std::mem::align_of::<CmdQueueEntry>(), 8);
    }

    #[test]
    fn test_cmd_flags_packing() {
        // 低 7 位操作码，最高位 block
        let flags = CmdFlags::new(u7::new(0x21), u1::new(0));
        assert_eq!(u8::from(flags), 0x21);

        let flags = CmdFlags::new(u7::new(0x21), u1::new(1));
        assert_eq!(u8::from(flags), 0xA1);
    }

    #[test]
    fn test_cache_range_layout() {
        // start(c_ulong) + size(u32, 填充到 8) + paddr(u64)
        assert_eq!(
            std::mem::size_of::<CacheRange>(),
            std::mem::size_of::<libc::c_ulong>() + 8 + 8
        );
    }
}
