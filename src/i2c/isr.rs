//! Transfer state machine
//!
//! One step function per role, each called from the peripheral's interrupt
//! handler (usually through [`I2c::service`]). A step never blocks: every loop
//! is bounded by the FIFO depth and the bytes left in the transfer.
//!
//! Every step follows the same sequence: snapshot the active interrupts,
//! classify any abort, acknowledge the interrupt, then either record the
//! abort or move data through the FIFOs, and finally close the transfer if a
//! STOP condition was detected.

use super::i2c_def::*;
use super::{
    Condition, Error, I2c, Instance, Interrupt, RoleState, Status, Transfer,
    MASTER_RX_INTERRUPTS, MASTER_TX_INTERRUPTS, SLAVE_RX_INTERRUPTS,
    SLAVE_TX_INTERRUPTS,
};

/// Direction of a FIFO pump
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Direction {
    /// Transmit buffer to transmit FIFO, as data
    Write,
    /// Read requests to transmit FIFO, one per expected byte
    ReadRequest,
    /// Receive FIFO to receive buffer
    Read,
}

#[inline(always)]
fn stop_tag(stop: bool) -> u32 {
    if stop {
        DATA_CMD_STOP
    } else {
        0
    }
}

impl<I2C: Instance> I2c<I2C> {
    /// Step the transfer in `xfer` according to its role. Does nothing when
    /// the transfer is idle.
    ///
    /// Returns the error classified by this interrupt, if any.
    pub fn service(&mut self, xfer: &mut Transfer<'_>) -> Option<Error> {
        match xfer.role_state {
            RoleState::Idle => None,
            RoleState::MasterTransmit => self.master_transmit_isr(xfer),
            RoleState::MasterReceive => self.master_receive_isr(xfer),
            RoleState::SlaveTransmit => self.slave_transmit_isr(xfer),
            RoleState::SlaveReceive => self.slave_receive_isr(xfer),
        }
    }

    #[inline(always)]
    fn active_interrupts(&self) -> Interrupt {
        Interrupt::from_bits_truncate(self.i2c.read(Register::IntrStat))
    }

    #[inline(always)]
    fn tx_fifo_not_full(&self) -> bool {
        self.i2c.read(Register::Status) & STATUS_TFNF != 0
    }

    #[inline(always)]
    fn rx_fifo_not_empty(&self) -> bool {
        self.i2c.read(Register::Status) & STATUS_RFNE != 0
    }

    #[inline(always)]
    fn rx_fifo_level(&self) -> usize {
        self.i2c.read(Register::RxFlr) as usize
    }

    #[inline(always)]
    fn slave_active(&self) -> bool {
        self.i2c.read(Register::Status) & STATUS_SLV_ACTIVITY != 0
    }

    /// Store the classification and acknowledge the interrupt
    fn acknowledge(&self, xfer: &mut Transfer<'_>, error: Option<Error>) {
        xfer.last_error = error;
        self.clear_intr();
        interrupt_clear_clock_sync_delay!(self.i2c, Register::RawIntrStat);
    }

    /// Fold the stored error into the status and hold the transfer until the
    /// closing STOP
    fn record_abort(&self, xfer: &mut Transfer<'_>) {
        if let Some(error) = xfer.last_error.take() {
            xfer.abort_pending = true;
            xfer.status |= error.status();
        }
        self.clear_tx_abrt();
    }

    /// Move data between `xfer` and the FIFOs in `direction` until the FIFO
    /// blocks or the direction is exhausted. `stop` marks the final command
    /// with the STOP bit.
    ///
    /// Returns true once nothing is left to move in `direction`.
    fn pump_fifo(
        &self,
        direction: Direction,
        xfer: &mut Transfer<'_>,
        stop: bool,
    ) -> bool {
        loop {
            match direction {
                Direction::Write => {
                    let remaining = xfer.tx_remaining();
                    if remaining == 0 {
                        return true;
                    }
                    if !self.tx_fifo_not_full() {
                        return false;
                    }
                    // `begin` clamps `tx_total` to the buffer length
                    let Some(byte) = xfer.next_tx_byte() else {
                        return true;
                    };
                    self.i2c.write(
                        Register::DataCmd,
                        u32::from(byte)
                            | DATA_CMD_WRITE
                            | stop_tag(stop && remaining == 1),
                    );
                    xfer.tx_sent += 1;
                }
                Direction::ReadRequest => {
                    if xfer.rx_commands_issued >= xfer.rx_total {
                        return true;
                    }
                    if !self.tx_fifo_not_full() {
                        return false;
                    }
                    let last = xfer.rx_commands_issued + 1 == xfer.rx_total;
                    self.i2c.write(
                        Register::DataCmd,
                        DATA_CMD_READ | stop_tag(stop && last),
                    );
                    xfer.rx_commands_issued += 1;
                }
                Direction::Read => {
                    if xfer.rx_remaining() == 0 {
                        return true;
                    }
                    if !self.rx_fifo_not_empty() {
                        return false;
                    }
                    let data = self.i2c.read(Register::DataCmd);
                    xfer.push_rx_byte((data & DATA_CMD_DAT_MASK) as u8);
                }
            }
        }
    }

    /// Close the transfer after a STOP condition and mask the role's
    /// interrupts.
    fn finish_on_stop(&self, xfer: &mut Transfer<'_>, group: Interrupt) {
        self.mask_interrupts(group);

        if xfer.abort_pending {
            xfer.abort_pending = false;
            xfer.status = Status::empty();
        } else {
            match xfer.role_state {
                RoleState::MasterReceive | RoleState::SlaveReceive => {
                    let remaining = xfer.rx_remaining();
                    if remaining > 0 && self.rx_fifo_level() + 1 >= remaining
                    {
                        self.pump_fifo(Direction::Read, xfer, false);
                    }

                    xfer.status |= Status::DONE;
                    if xfer.rx_remaining() > 0 {
                        xfer.status |= Status::INCOMPLETE;
                    }
                }
                _ => xfer.status |= Status::DONE,
            }
        }

        #[cfg(feature = "log")]
        log::trace!("I2C {:?} stopped: {:?}", xfer.role_state, xfer.status);

        #[cfg(feature = "defmt")]
        defmt::trace!("I2C {} stopped: {}", xfer.role_state, xfer.status);

        xfer.role_state = RoleState::Idle;
    }

    /// Controller transmit step
    ///
    /// Fills the transmit FIFO from `xfer.tx_buffer`. TX_EMPTY is masked once
    /// the last byte is queued; the transfer completes on STOP_DET.
    pub fn master_transmit_isr(
        &mut self,
        xfer: &mut Transfer<'_>,
    ) -> Option<Error> {
        let active = self.active_interrupts();
        let error = self.classify_master_error(xfer);
        self.acknowledge(xfer, error);

        if error.is_some() {
            self.record_abort(xfer);
        } else if xfer.abort_pending {
            // The transfer is dead until the STOP that closes it
        } else if xfer.tx_buffer.is_none() || xfer.tx_total == 0 {
            self.mask_interrupts(MASTER_TX_INTERRUPTS);
            xfer.status |= Status::DONE | Status::INCOMPLETE;
            return error;
        } else {
            let stop = xfer.next_condition == Condition::Stop;
            if self.pump_fifo(Direction::Write, xfer, stop) {
                self.mask_interrupts(Interrupt::TX_EMPTY);
            }
        }

        if active.contains(Interrupt::STOP_DET) {
            self.finish_on_stop(xfer, MASTER_TX_INTERRUPTS);
        }

        error
    }

    /// Controller receive step
    ///
    /// In write-read mode the transmit buffer is queued first. Read requests
    /// follow, one per expected byte, and received bytes are drained into
    /// `xfer.rx_buffer` on RX_FULL.
    pub fn master_receive_isr(
        &mut self,
        xfer: &mut Transfer<'_>,
    ) -> Option<Error> {
        let active = self.active_interrupts();
        let error = self.classify_master_error(xfer);
        self.acknowledge(xfer, error);

        if error.is_some() {
            self.record_abort(xfer);
        } else if xfer.abort_pending {
            // The transfer is dead until the STOP that closes it
        } else if xfer.rx_buffer.is_none() || xfer.rx_total == 0 {
            self.mask_interrupts(MASTER_RX_INTERRUPTS);
            xfer.status |= Status::DONE | Status::INCOMPLETE;
            return error;
        } else {
            if xfer.write_read_mode
                && self.pump_fifo(Direction::Write, xfer, false)
            {
                xfer.write_read_mode = false;
            }

            if !xfer.write_read_mode {
                let stop = xfer.next_condition == Condition::Stop;
                if self.pump_fifo(Direction::ReadRequest, xfer, stop) {
                    self.mask_interrupts(Interrupt::TX_EMPTY);
                }
            }

            if active.contains(Interrupt::RX_FULL)
                && self.pump_fifo(Direction::Read, xfer, false)
            {
                self.mask_interrupts(Interrupt::RX_FULL);
            }
        }

        if active.contains(Interrupt::STOP_DET) {
            self.finish_on_stop(xfer, MASTER_RX_INTERRUPTS);
        }

        error
    }

    /// Target transmit step
    ///
    /// Answers a controller read from `xfer.tx_buffer` while the target is
    /// addressed.
    pub fn slave_transmit_isr(
        &mut self,
        xfer: &mut Transfer<'_>,
    ) -> Option<Error> {
        let active = self.active_interrupts();
        let error = self.classify_slave_error(xfer);
        self.acknowledge(xfer, error);

        if error.is_some() {
            self.record_abort(xfer);
        } else if !xfer.abort_pending && self.slave_active() {
            xfer.status |= Status::SLAVE_TRANSMIT_ACTIVE;
            self.pump_fifo(Direction::Write, xfer, false);
        }

        if active.contains(Interrupt::STOP_DET) {
            self.finish_on_stop(xfer, SLAVE_TX_INTERRUPTS);
        }

        error
    }

    /// Target receive step
    ///
    /// Drains a controller write into `xfer.rx_buffer` on RX_FULL.
    pub fn slave_receive_isr(
        &mut self,
        xfer: &mut Transfer<'_>,
    ) -> Option<Error> {
        let active = self.active_interrupts();
        let error = self.classify_slave_error(xfer);
        self.acknowledge(xfer, error);

        if active.contains(Interrupt::GEN_CALL) {
            xfer.status |= Status::GENERAL_CALL;
        }

        if error.is_some() {
            self.record_abort(xfer);
        } else if !xfer.abort_pending && active.contains(Interrupt::RX_FULL) {
            xfer.status |= Status::SLAVE_RECEIVE_ACTIVE;
            if self.pump_fifo(Direction::Read, xfer, false) {
                self.mask_interrupts(Interrupt::RX_FULL);
            }
        }

        if active.contains(Interrupt::STOP_DET) {
            self.finish_on_stop(xfer, SLAVE_RX_INTERRUPTS);
        }

        error
    }
}
