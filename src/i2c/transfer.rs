//! Transfer descriptor
//!
//! A [`Transfer`] carries one transfer's buffers, progress counters and
//! status between interrupts. The caller owns it and hands it to the step
//! functions of [`I2c`](super::I2c) on every interrupt of the peripheral it
//! belongs to.

use super::Error;

/// Active state machine variant
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RoleState {
    /// No transfer in progress
    #[default]
    Idle,
    /// Controller writing to a target
    MasterTransmit,
    /// Controller reading from a target, optionally after a write phase
    MasterReceive,
    /// Target answering a controller read
    SlaveTransmit,
    /// Target receiving a controller write
    SlaveReceive,
}

/// Bus condition that ends a controller transfer
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Condition {
    /// Release the bus with a STOP condition
    #[default]
    Stop,
    /// Keep the bus so the next operation starts with a repeated START
    Restart,
}

bitflags::bitflags! {
    /// Completion and error flags of a transfer
    ///
    /// Flags accumulate over the lifetime of a transfer and are only cleared
    /// when the next transfer is started.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u32 {
        /// The transfer reached a STOP condition
        const DONE = 1 << 0;
        /// Fewer bytes than requested were transferred
        const INCOMPLETE = 1 << 1;
        /// A controller read of this target was serviced
        const SLAVE_TRANSMIT_ACTIVE = 1 << 2;
        /// A controller write to this target was serviced
        const SLAVE_RECEIVE_ACTIVE = 1 << 3;
        /// No device acknowledged the address
        const ADDRESS_NACK = 1 << 4;
        /// A general call was received
        const GENERAL_CALL = 1 << 5;
        /// Arbitration was lost
        const ARBITRATION_LOST = 1 << 6;
        /// The transfer was aborted for another reason
        const BUS_ERROR = 1 << 7;
        /// Reserved for bus recovery, never set by this driver
        const BUS_CLEARED = 1 << 8;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Status {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Status({=u32:#x})", self.bits())
    }
}

/// Transfer descriptor
///
/// Populate the buffers and totals (the constructors do this) and
/// `next_condition`, start the transfer with one of the `I2c::start_*`
/// functions, then call [`I2c::service`](super::I2c::service) from the
/// interrupt handler and inspect `status` after each call.
#[derive(Debug, Default)]
pub struct Transfer<'a> {
    /// Bytes to transmit
    pub tx_buffer: Option<&'a [u8]>,
    /// Number of bytes to transmit
    pub tx_total: usize,
    /// Number of bytes placed in the transmit FIFO
    pub tx_sent: usize,
    /// Destination of received bytes
    pub rx_buffer: Option<&'a mut [u8]>,
    /// Number of bytes to receive
    pub rx_total: usize,
    /// Number of bytes read back from the receive FIFO
    pub rx_received: usize,
    /// Number of read requests pushed into the transmit FIFO
    pub rx_commands_issued: usize,
    /// Transmit FIFO overruns observed
    pub tx_overrun_count: u32,
    /// Receive FIFO overruns and underruns observed
    pub rx_overrun_count: u32,
    /// Error classified by the current interrupt, until it is folded into `status`
    pub last_error: Option<Error>,
    /// Active state machine variant
    pub role_state: RoleState,
    /// Condition ending a controller transfer
    pub next_condition: Condition,
    /// Accumulated completion and error flags
    pub status: Status,
    /// Transmit `tx_buffer` before receiving (register address write, then read)
    pub write_read_mode: bool,
    /// An abort was classified and the closing STOP has not been seen yet
    pub abort_pending: bool,
}

impl Default for Status {
    fn default() -> Self {
        Status::empty()
    }
}

impl<'a> Transfer<'a> {
    /// An empty descriptor: no buffers, idle, ending with STOP
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for writing `bytes`
    pub fn write(bytes: &'a [u8]) -> Self {
        Transfer {
            tx_buffer: Some(bytes),
            tx_total: bytes.len(),
            ..Self::default()
        }
    }

    /// Descriptor for reading `buffer.len()` bytes
    pub fn read(buffer: &'a mut [u8]) -> Self {
        Transfer {
            rx_total: buffer.len(),
            rx_buffer: Some(buffer),
            ..Self::default()
        }
    }

    /// Descriptor for writing `bytes` and then reading `buffer.len()` bytes
    /// in the same controller transfer
    pub fn write_read(bytes: &'a [u8], buffer: &'a mut [u8]) -> Self {
        Transfer {
            tx_buffer: Some(bytes),
            tx_total: bytes.len(),
            rx_total: buffer.len(),
            rx_buffer: Some(buffer),
            write_read_mode: true,
            ..Self::default()
        }
    }

    /// Set the condition ending the transfer
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.next_condition = condition;
        self
    }

    /// True once a STOP has ended the transfer, successfully or not
    pub fn is_finished(&self) -> bool {
        self.status.contains(Status::DONE) || self.role_state == RoleState::Idle
    }

    /// Prepare the descriptor for a new transfer in `role`. `tx_total` is
    /// clamped to the length of `tx_buffer`, so the final command of a write
    /// is always a buffered byte.
    pub(crate) fn begin(&mut self, role: RoleState) {
        self.tx_total = self
            .tx_buffer
            .map_or(0, |buf| self.tx_total.min(buf.len()));
        self.tx_sent = 0;
        self.rx_received = 0;
        self.rx_commands_issued = 0;
        self.last_error = None;
        self.status = Status::empty();
        self.abort_pending = false;
        self.role_state = role;
    }

    pub(crate) fn tx_remaining(&self) -> usize {
        self.tx_total.saturating_sub(self.tx_sent)
    }

    pub(crate) fn rx_remaining(&self) -> usize {
        self.rx_total.saturating_sub(self.rx_received)
    }

    /// Next byte to transmit, if any remain
    pub(crate) fn next_tx_byte(&self) -> Option<u8> {
        if self.tx_sent >= self.tx_total {
            return None;
        }
        self.tx_buffer?.get(self.tx_sent).copied()
    }

    /// Store a received byte. Bytes beyond the end of `rx_buffer` are
    /// counted but dropped.
    pub(crate) fn push_rx_byte(&mut self, byte: u8) {
        if let Some(slot) = self
            .rx_buffer
            .as_deref_mut()
            .and_then(|buf| buf.get_mut(self.rx_received))
        {
            *slot = byte;
        }
        self.rx_received += 1;
    }

    pub(crate) fn count_tx_overrun(&mut self) {
        self.tx_overrun_count = self.tx_overrun_count.saturating_add(1);
    }

    pub(crate) fn count_rx_overrun(&mut self) {
        self.rx_overrun_count = self.rx_overrun_count.saturating_add(1);
    }
}
