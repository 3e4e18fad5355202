//! Inter Integrated Circuit (I2C)
//!
//! This module drives a DesignWare APB I2C peripheral as either a controller
//! (master) or a target (slave). Transfers are interrupt driven: the caller
//! starts a transfer on a [`Transfer`] descriptor, and the peripheral's
//! interrupt handler steps the transfer state machine with
//! [`I2c::service`] until the descriptor reports completion.
//!
//! # Usage
//!
//! The driver is created from anything implementing [`Instance`], usually an
//! [`Mmio`] register block, together with the peripheral's input clock:
//!
//! ```no_run
//! use dw_i2c_hal::i2c::{Config, Mmio, Speed};
//! use dw_i2c_hal::prelude::*;
//!
//! let regs = unsafe { Mmio::new(0x4901_0000 as *mut u32) }.unwrap();
//! let mut i2c = regs.i2c(100_000.kHz(), Config::new(Speed::Fast));
//! i2c.master_init(0x50).unwrap();
//! ```
//!
//! ## Controller
//!
//! ```no_run
//! # use dw_i2c_hal::i2c::{Config, I2c, Mmio, Speed, Status, Transfer};
//! # use dw_i2c_hal::prelude::*;
//! # let regs = unsafe { Mmio::new(0x4901_0000 as *mut u32) }.unwrap();
//! # let mut i2c = regs.i2c(100_000.kHz(), Config::new(Speed::Fast));
//! // Write a register address, then read two bytes back
//! let reg = [0x00];
//! let mut value = [0u8; 2];
//! let mut xfer = Transfer::write_read(&reg, &mut value);
//! i2c.start_master_receive(&mut xfer);
//!
//! // In the interrupt handler
//! i2c.service(&mut xfer);
//! if xfer.status.contains(Status::DONE) {
//!     // ...
//! }
//! ```
//!
//! The driver also implements the blocking embedded-hal I2C traits by polling
//! the same state machine.
//!
//! ## Target
//!
//! ```no_run
//! # use dw_i2c_hal::i2c::{AddressMode, Config, Mmio, Speed, Transfer};
//! # use dw_i2c_hal::prelude::*;
//! # let regs = unsafe { Mmio::new(0x4901_0000 as *mut u32) }.unwrap();
//! # let mut i2c = regs.i2c(100_000.kHz(), Config::new(Speed::Fast));
//! i2c.slave_init(0x18, AddressMode::SevenBit).unwrap();
//!
//! let mut buf = [0u8; 4];
//! let mut xfer = Transfer::read(&mut buf);
//! i2c.start_slave_receive(&mut xfer);
//! ```

use crate::time::KiloHertz;

pub mod config;
pub use config::Config;

mod abort;
pub use abort::{master_abort_error, slave_abort_error};

mod hal;

mod i2c_def;
pub use i2c_def::{AbortSource, Interrupt, Mmio, Register};
use i2c_def::*;

mod isr;

pub mod timing;
pub use timing::{compute_scl_counts, compute_spike_length, BusSpeed, Speed};

pub mod transfer;
pub use transfer::{Condition, RoleState, Status, Transfer};

#[cfg(test)]
mod mock;

/// Number of enable-status polls before `enable`/`disable` give up
///
/// The databook bounds the delay by a few bus clock periods once the bus is idle, so this is
/// only reached when the peripheral is held by an ongoing transfer.
pub const ENABLE_POLL_LIMIT: u32 = 100_000;

/// Interrupt causes serviced during a controller write
const MASTER_TX_INTERRUPTS: Interrupt = Interrupt::TX_EMPTY
    .union(Interrupt::TX_ABRT)
    .union(Interrupt::STOP_DET)
    .union(Interrupt::TX_OVER);

/// Interrupt causes serviced during a controller read
const MASTER_RX_INTERRUPTS: Interrupt = MASTER_TX_INTERRUPTS
    .union(Interrupt::RX_FULL)
    .union(Interrupt::RX_OVER)
    .union(Interrupt::RX_UNDER);

/// Interrupt causes serviced while answering a controller read
const SLAVE_TX_INTERRUPTS: Interrupt = Interrupt::RD_REQ
    .union(Interrupt::TX_ABRT)
    .union(Interrupt::STOP_DET)
    .union(Interrupt::TX_OVER);

/// Interrupt causes serviced while receiving a controller write
const SLAVE_RX_INTERRUPTS: Interrupt = Interrupt::RX_FULL
    .union(Interrupt::STOP_DET)
    .union(Interrupt::RX_OVER)
    .union(Interrupt::RX_UNDER)
    .union(Interrupt::GEN_CALL);

/// Addressing mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressMode {
    /// 7-bit addressing mode
    SevenBit,
    /// 10-bit addressing mode
    TenBit,
}

/// I2C error
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Arbitration lost, or the bus was lost while operating as a target
    LostBus,
    /// No device acknowledged the address (7-bit, or either 10-bit address byte)
    AddressNack,
    /// The target acknowledged its address but not a data byte
    DataNack,
    /// A 10-bit read was attempted with repeated starts disabled
    TenBitReadNoRestart,
    /// The transfer was aborted for a reason not covered above
    Undefined,
    /// The enable status did not follow the enable bit within `ENABLE_POLL_LIMIT` polls
    EnableTimeout,
}

impl Error {
    /// Status flags reporting this error on a transfer descriptor
    pub const fn status(self) -> Status {
        match self {
            Error::LostBus => Status::ARBITRATION_LOST,
            Error::AddressNack => Status::ADDRESS_NACK,
            Error::DataNack => Status::INCOMPLETE,
            Error::TenBitReadNoRestart
            | Error::Undefined
            | Error::EnableTimeout => Status::BUS_ERROR,
        }
    }
}

/// Access to the registers of one peripheral instance
///
/// Implementations must perform each access exactly once and in program order: several
/// registers clear interrupt causes as a side effect of being read.
pub trait Instance {
    /// Read a register
    fn read(&self, reg: Register) -> u32;

    /// Write a register
    fn write(&self, reg: Register, value: u32);

    /// Read-modify-write a register
    #[inline(always)]
    fn modify<F: FnOnce(u32) -> u32>(&self, reg: Register, f: F) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }
}

impl<T: Instance + ?Sized> Instance for &T {
    #[inline(always)]
    fn read(&self, reg: Register) -> u32 {
        (**self).read(reg)
    }

    #[inline(always)]
    fn write(&self, reg: Register, value: u32) {
        (**self).write(reg, value)
    }
}

#[derive(Debug)]
pub struct I2c<I2C> {
    i2c: I2C,
    config: Config,
    bus: BusSpeed,
}

pub trait I2cExt<I2C: Instance>: Sized {
    /// Create an I2c instance. `clock` is the peripheral's input clock. The peripheral is not
    /// touched until `master_init` or `slave_init` is called.
    fn i2c(self, clock: KiloHertz, config: impl Into<Config>) -> I2c<I2C>;
}

impl<I2C: Instance> I2cExt<I2C> for I2C {
    fn i2c(self, clock: KiloHertz, config: impl Into<Config>) -> I2c<I2C> {
        I2c::new(self, clock, config)
    }
}

impl<I2C: Instance> I2c<I2C> {
    /// Create a new I2C driver.
    ///
    /// The SCL timing for the configured speed is derived from `clock`, the
    /// frequency of the peripheral's input clock.
    ///
    /// # Panics
    ///
    /// Panics if `clock` is zero.
    pub fn new(i2c: I2C, clock: KiloHertz, config: impl Into<Config>) -> Self {
        let config = config.into();
        let bus = BusSpeed::new(clock, config.speed);

        I2c { i2c, config, bus }
    }

    /// Timing values derived for this instance
    pub fn bus_speed(&self) -> &BusSpeed {
        &self.bus
    }

    /// Static configuration of this instance
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Releases the register block
    pub fn free(self) -> I2C {
        self.i2c
    }

    interrupt_clear_fns!(
        Intr, RxUnder, RxOver, TxOver, TxAbrt, StopDet, StartDet, GenCall,
    );

    /// Enable the peripheral.
    ///
    /// This busy-waits until the enable status reflects the change and must
    /// not be called from the peripheral's own interrupt handler.
    pub fn enable(&mut self) -> Result<(), Error> {
        self.set_enabled(true)
    }

    /// Disable the peripheral.
    ///
    /// This busy-waits until the enable status reflects the change and must
    /// not be called from the peripheral's own interrupt handler.
    pub fn disable(&mut self) -> Result<(), Error> {
        self.set_enabled(false)
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), Error> {
        self.i2c.write(
            Register::Enable,
            if enabled { ENABLE_ENABLE } else { 0 },
        );

        for _ in 0..ENABLE_POLL_LIMIT {
            let status =
                self.i2c.read(Register::EnableStatus) & ENABLE_STATUS_IC_EN;
            if (status != 0) == enabled {
                return Ok(());
            }
            core::hint::spin_loop();
        }

        #[cfg(feature = "log")]
        log::warn!("I2C enable status stuck, requested enabled={}", enabled);

        #[cfg(feature = "defmt")]
        defmt::warn!("I2C enable status stuck, requested enabled={}", enabled);

        Err(Error::EnableTimeout)
    }

    /// Program the SCL counts, spike length and FIFO thresholds. The
    /// peripheral must be disabled. Returns the speed field for IC_CON.
    fn configure_timing(&self) -> u32 {
        let bus = &self.bus;
        let speed = match bus.speed() {
            Speed::Standard => {
                self.i2c.write(Register::SsSclHcnt, bus.high_count());
                self.i2c.write(Register::SsSclLcnt, bus.low_count());
                CON_SPEED_STANDARD
            }
            Speed::Fast | Speed::FastPlus => {
                self.i2c.write(Register::FsSclHcnt, bus.high_count());
                self.i2c.write(Register::FsSclLcnt, bus.low_count());
                CON_SPEED_FAST
            }
        };
        self.i2c.write(Register::FsSpklen, bus.spike_length());

        self.i2c
            .write(Register::TxTl, u32::from(self.config.tx_fifo_threshold));
        self.i2c
            .write(Register::RxTl, u32::from(self.config.rx_fifo_threshold));

        speed
    }

    /// Change the target address used by controller transfers.
    ///
    /// The address is masked to 10 bits. In 10-bit mode, controller reads
    /// (`role == RoleState::MasterReceive`) require repeated starts, so
    /// restarts are enabled regardless of the static configuration. Any other
    /// call restores the configured restart setting.
    pub fn set_target_address(
        &mut self,
        address: u16,
        mode: AddressMode,
        role: RoleState,
    ) -> Result<(), Error> {
        self.disable()?;

        let mut tar = u32::from(address) & TAR_ADDRESS_MASK;
        if self.config.general_call {
            tar |= TAR_SPECIAL;
        }
        if mode == AddressMode::TenBit {
            tar |= TAR_10BITADDR_MASTER;
        }

        let restart = self.config.restart
            || (mode == AddressMode::TenBit && role == RoleState::MasterReceive);
        self.i2c.modify(Register::Con, |con| {
            let con = match mode {
                AddressMode::TenBit => con | CON_10BITADDR_MASTER,
                AddressMode::SevenBit => con & !CON_10BITADDR_MASTER,
            };
            if restart {
                con | CON_RESTART_EN
            } else {
                con & !CON_RESTART_EN
            }
        });
        self.i2c.write(Register::Tar, tar);

        self.enable()
    }

    /// Configure the peripheral as a controller talking to the 7-bit
    /// `target_address`, with all interrupts masked.
    pub fn master_init(&mut self, target_address: u16) -> Result<(), Error> {
        self.disable()?;
        self.i2c.write(Register::IntrMask, 0);

        let speed = self.configure_timing();

        let mut tar = u32::from(target_address) & TAR_ADDRESS_MASK;
        if self.config.general_call {
            tar |= TAR_SPECIAL;
        }
        self.i2c.write(Register::Tar, tar);

        let mut con = CON_MASTER_MODE | CON_SLAVE_DISABLE | speed;
        if self.config.restart {
            con |= CON_RESTART_EN;
        }
        self.i2c.write(Register::Con, con);

        self.enable()
    }

    /// Configure the peripheral as a target listening on `address`, with all
    /// interrupts masked.
    pub fn slave_init(
        &mut self,
        address: u16,
        mode: AddressMode,
    ) -> Result<(), Error> {
        self.disable()?;
        self.i2c.write(Register::IntrMask, 0);

        let speed = self.configure_timing();

        self.i2c
            .write(Register::Sar, u32::from(address) & SAR_ADDRESS_MASK);

        let mut con = CON_RESTART_EN | CON_STOP_DET_IFADDRESSED | speed;
        if mode == AddressMode::TenBit {
            con |= CON_10BITADDR_SLAVE;
        }
        self.i2c.write(Register::Con, con);

        self.enable()
    }

    #[inline(always)]
    fn unmask_interrupts(&self, interrupts: Interrupt) {
        self.i2c
            .modify(Register::IntrMask, |mask| mask | interrupts.bits());
    }

    #[inline(always)]
    fn mask_interrupts(&self, interrupts: Interrupt) {
        self.i2c
            .modify(Register::IntrMask, |mask| mask & !interrupts.bits());
    }

    /// True if any unmasked interrupt cause is active
    pub fn interrupt_pending(&self) -> bool {
        self.i2c.read(Register::IntrStat) != 0
    }

    /// Start writing `xfer.tx_buffer` to the programmed target
    pub fn start_master_transmit(&mut self, xfer: &mut Transfer<'_>) {
        xfer.begin(RoleState::MasterTransmit);
        self.unmask_interrupts(MASTER_TX_INTERRUPTS);
    }

    /// Start reading `xfer.rx_total` bytes from the programmed target,
    /// preceded by a write of `xfer.tx_buffer` in write-read mode
    pub fn start_master_receive(&mut self, xfer: &mut Transfer<'_>) {
        xfer.begin(RoleState::MasterReceive);
        self.unmask_interrupts(MASTER_RX_INTERRUPTS);
    }

    /// Start answering controller reads from `xfer.tx_buffer`
    pub fn start_slave_transmit(&mut self, xfer: &mut Transfer<'_>) {
        xfer.begin(RoleState::SlaveTransmit);
        self.unmask_interrupts(SLAVE_TX_INTERRUPTS);
    }

    /// Start receiving a controller write into `xfer.rx_buffer`
    pub fn start_slave_receive(&mut self, xfer: &mut Transfer<'_>) {
        xfer.begin(RoleState::SlaveReceive);
        self.unmask_interrupts(SLAVE_RX_INTERRUPTS);
    }
}
