//! DW_apb_i2c register map
//!
//! Offsets and bit positions follow the Synopsys DesignWare APB I2C databook. Only the registers
//! touched by this driver are listed.

use core::ptr::NonNull;

use super::Instance;

/// Registers of the peripheral, by byte offset from the block's base address
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum Register {
    /// IC_CON: control
    Con = 0x00,
    /// IC_TAR: target address (controller operation)
    Tar = 0x04,
    /// IC_SAR: own address (target operation)
    Sar = 0x08,
    /// IC_DATA_CMD: data and command FIFO port
    DataCmd = 0x10,
    /// IC_SS_SCL_HCNT
    SsSclHcnt = 0x14,
    /// IC_SS_SCL_LCNT
    SsSclLcnt = 0x18,
    /// IC_FS_SCL_HCNT
    FsSclHcnt = 0x1C,
    /// IC_FS_SCL_LCNT
    FsSclLcnt = 0x20,
    /// IC_INTR_STAT: masked (active) interrupt causes
    IntrStat = 0x2C,
    /// IC_INTR_MASK
    IntrMask = 0x30,
    /// IC_RAW_INTR_STAT: unmasked interrupt causes
    RawIntrStat = 0x34,
    /// IC_RX_TL: receive FIFO threshold
    RxTl = 0x38,
    /// IC_TX_TL: transmit FIFO threshold
    TxTl = 0x3C,
    ClrIntr = 0x40,
    ClrRxUnder = 0x44,
    ClrRxOver = 0x48,
    ClrTxOver = 0x4C,
    ClrRdReq = 0x50,
    ClrTxAbrt = 0x54,
    ClrRxDone = 0x58,
    ClrActivity = 0x5C,
    ClrStopDet = 0x60,
    ClrStartDet = 0x64,
    ClrGenCall = 0x68,
    /// IC_ENABLE
    Enable = 0x6C,
    /// IC_STATUS
    Status = 0x70,
    /// IC_TXFLR: transmit FIFO level
    TxFlr = 0x74,
    /// IC_RXFLR: receive FIFO level
    RxFlr = 0x78,
    /// IC_TX_ABRT_SOURCE
    TxAbrtSource = 0x80,
    /// IC_ENABLE_STATUS
    EnableStatus = 0x9C,
    /// IC_FS_SPKLEN: spike suppression length
    FsSpklen = 0xA0,
}

impl Register {
    /// Byte offset of the register
    #[inline(always)]
    pub const fn offset(self) -> usize {
        self as u32 as usize
    }
}

bitflags::bitflags! {
    /// Interrupt causes, as laid out in IC_INTR_STAT, IC_INTR_MASK and IC_RAW_INTR_STAT
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Interrupt: u32 {
        const RX_UNDER = 1 << 0;
        const RX_OVER = 1 << 1;
        const RX_FULL = 1 << 2;
        const TX_OVER = 1 << 3;
        const TX_EMPTY = 1 << 4;
        const RD_REQ = 1 << 5;
        const TX_ABRT = 1 << 6;
        const RX_DONE = 1 << 7;
        const ACTIVITY = 1 << 8;
        const STOP_DET = 1 << 9;
        const START_DET = 1 << 10;
        const GEN_CALL = 1 << 11;
        const RESTART_DET = 1 << 12;
    }
}

bitflags::bitflags! {
    /// Transmit abort causes, as laid out in IC_TX_ABRT_SOURCE
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AbortSource: u32 {
        const ADDR7_NOACK = 1 << 0;
        const ADDR10_1_NOACK = 1 << 1;
        const ADDR10_2_NOACK = 1 << 2;
        const TXDATA_NOACK = 1 << 3;
        const GCALL_NOACK = 1 << 4;
        const GCALL_READ = 1 << 5;
        const HS_ACKDET = 1 << 6;
        const SBYTE_ACKDET = 1 << 7;
        const HS_NORSTRT = 1 << 8;
        const SBYTE_NORSTRT = 1 << 9;
        const READ_10B_NORSTRT = 1 << 10;
        const MASTER_DIS = 1 << 11;
        const ARB_LOST = 1 << 12;
        const SLVFLUSH_TXFIFO = 1 << 13;
        const SLV_ARBLOST = 1 << 14;
        const SLVRD_INTX = 1 << 15;
        const USER_ABRT = 1 << 16;
    }
}

// IC_CON
pub(crate) const CON_MASTER_MODE: u32 = 1 << 0;
pub(crate) const CON_SPEED_SHIFT: u32 = 1;
pub(crate) const CON_SPEED_STANDARD: u32 = 1 << CON_SPEED_SHIFT;
pub(crate) const CON_SPEED_FAST: u32 = 2 << CON_SPEED_SHIFT;
pub(crate) const CON_10BITADDR_SLAVE: u32 = 1 << 3;
pub(crate) const CON_10BITADDR_MASTER: u32 = 1 << 4;
pub(crate) const CON_RESTART_EN: u32 = 1 << 5;
pub(crate) const CON_SLAVE_DISABLE: u32 = 1 << 6;
pub(crate) const CON_STOP_DET_IFADDRESSED: u32 = 1 << 7;

// IC_TAR
pub(crate) const TAR_ADDRESS_MASK: u32 = 0x3FF;
pub(crate) const TAR_SPECIAL: u32 = 1 << 11;
pub(crate) const TAR_10BITADDR_MASTER: u32 = 1 << 12;

// IC_SAR
pub(crate) const SAR_ADDRESS_MASK: u32 = 0x3FF;

// IC_DATA_CMD
pub(crate) const DATA_CMD_DAT_MASK: u32 = 0xFF;
pub(crate) const DATA_CMD_WRITE: u32 = 0;
pub(crate) const DATA_CMD_READ: u32 = 1 << 8;
pub(crate) const DATA_CMD_STOP: u32 = 1 << 9;

// IC_ENABLE / IC_ENABLE_STATUS
pub(crate) const ENABLE_ENABLE: u32 = 1 << 0;
pub(crate) const ENABLE_STATUS_IC_EN: u32 = 1 << 0;

// IC_STATUS
pub(crate) const STATUS_TFNF: u32 = 1 << 1;
pub(crate) const STATUS_RFNE: u32 = 1 << 3;
pub(crate) const STATUS_SLV_ACTIVITY: u32 = 1 << 6;

/// A register block mapped into the address space at a fixed base address
///
/// All accesses are volatile 32-bit reads and writes.
#[derive(Debug)]
pub struct Mmio {
    base: NonNull<u32>,
}

impl Mmio {
    /// Create an accessor for the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the 4-byte aligned base address of a DW_apb_i2c register block that is
    /// valid for the lifetime of the returned value, and no other code may access the block
    /// while the accessor exists.
    pub unsafe fn new(base: *mut u32) -> Option<Self> {
        NonNull::new(base).map(|base| Mmio { base })
    }

    #[inline(always)]
    fn ptr(&self, reg: Register) -> *mut u32 {
        // Offsets are multiples of four, so the pointer stays aligned
        unsafe { self.base.as_ptr().byte_add(reg.offset()) }
    }
}

impl Instance for Mmio {
    #[inline(always)]
    fn read(&self, reg: Register) -> u32 {
        // SAFETY: the pointer is inside the block promised by the caller of `Mmio::new`
        unsafe { core::ptr::read_volatile(self.ptr(reg)) }
    }

    #[inline(always)]
    fn write(&self, reg: Register, value: u32) {
        // SAFETY: the pointer is inside the block promised by the caller of `Mmio::new`
        unsafe { core::ptr::write_volatile(self.ptr(reg), value) }
    }
}

// SAFETY: the block is exclusively owned by the accessor (see `Mmio::new`)
unsafe impl Send for Mmio {}
