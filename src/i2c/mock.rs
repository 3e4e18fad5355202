//! Register-level test double
//!
//! Models the parts of the peripheral the driver depends on: the transmit and
//! receive FIFOs behind IC_DATA_CMD, latched and level interrupt causes,
//! clear-on-read registers, the abort source and the enable handshake. With
//! [`MockI2c::with_bus`] a simulated bus consumes queued commands whenever
//! the interrupt status is read, answering read requests and raising
//! STOP_DET after a command carrying the STOP bit.

use std::cell::{RefCell, RefMut};
use std::collections::VecDeque;

use super::i2c_def::*;
use super::{Instance, Interrupt};

/// Byte returned for read requests once the scripted responses run out
const IDLE_BUS_BYTE: u8 = 0xFF;

#[derive(Debug, Default)]
pub(crate) struct Bus {
    /// Commands consumed from the transmit FIFO, in bus order
    pub written: Vec<u32>,
    /// Bytes returned for read requests
    pub responses: VecDeque<u8>,
    /// Abort with the given source once this many commands were consumed
    pub nack: Option<(usize, AbortSource)>,
}

#[derive(Debug)]
pub(crate) struct State {
    pub regs: [u32; 64],
    pub tx_fifo: VecDeque<u32>,
    pub rx_fifo: VecDeque<u8>,
    pub depth: usize,
    /// Latched (edge) interrupt causes
    pub raw: Interrupt,
    pub abort_source: AbortSource,
    pub slave_active: bool,
    /// IC_ENABLE_STATUS follows writes to IC_ENABLE
    pub enable_follows: bool,
    pub bus: Option<Bus>,
}

impl State {
    fn index(reg: Register) -> usize {
        reg.offset() / 4
    }

    fn level_interrupts(&self) -> Interrupt {
        let mut level = Interrupt::empty();
        if self.tx_fifo.len() <= self.regs[Self::index(Register::TxTl)] as usize {
            level |= Interrupt::TX_EMPTY;
        }
        if self.rx_fifo.len() > self.regs[Self::index(Register::RxTl)] as usize {
            level |= Interrupt::RX_FULL;
        }
        level
    }

    fn raw_interrupts(&self) -> Interrupt {
        self.raw | self.level_interrupts()
    }

    /// Register value as software would read it, without side effects
    fn peek(&self, reg: Register) -> u32 {
        match reg {
            Register::RawIntrStat => self.raw_interrupts().bits(),
            Register::IntrStat => {
                self.raw_interrupts().bits()
                    & self.regs[Self::index(Register::IntrMask)]
            }
            Register::TxAbrtSource => self.abort_source.bits(),
            Register::TxFlr => self.tx_fifo.len() as u32,
            Register::RxFlr => self.rx_fifo.len() as u32,
            Register::Status => {
                let mut status = 0;
                if self.tx_fifo.len() < self.depth {
                    status |= STATUS_TFNF;
                }
                if !self.rx_fifo.is_empty() {
                    status |= STATUS_RFNE;
                }
                if self.slave_active {
                    status |= STATUS_SLV_ACTIVITY;
                }
                status
            }
            reg => self.regs[Self::index(reg)],
        }
    }

    fn receive(&mut self, byte: u8) {
        if self.rx_fifo.len() >= self.depth {
            self.raw |= Interrupt::RX_OVER;
        } else {
            self.rx_fifo.push_back(byte);
        }
    }

    /// Let the simulated bus consume as many queued commands as it can
    fn run_bus(&mut self) {
        let Some(mut bus) = self.bus.take() else {
            return;
        };

        while let Some(&cmd) = self.tx_fifo.front() {
            if let Some((at, source)) = bus.nack {
                if bus.written.len() == at {
                    self.tx_fifo.clear();
                    self.abort_source = source;
                    self.raw |= Interrupt::TX_ABRT | Interrupt::STOP_DET;
                    bus.nack = None;
                    break;
                }
            }

            if cmd & DATA_CMD_READ != 0 {
                // Clock stretching until software makes room
                if self.rx_fifo.len() >= self.depth {
                    break;
                }
                let byte = bus.responses.pop_front().unwrap_or(IDLE_BUS_BYTE);
                self.rx_fifo.push_back(byte);
            }

            self.tx_fifo.pop_front();
            bus.written.push(cmd);
            if cmd & DATA_CMD_STOP != 0 {
                self.raw |= Interrupt::STOP_DET;
            }
        }

        self.bus = Some(bus);
    }
}

pub(crate) struct MockI2c {
    state: RefCell<State>,
}

impl MockI2c {
    /// Peripheral with FIFOs of `depth` entries and no bus attached
    pub fn new(depth: usize) -> Self {
        MockI2c {
            state: RefCell::new(State {
                regs: [0; 64],
                tx_fifo: VecDeque::new(),
                rx_fifo: VecDeque::new(),
                depth,
                raw: Interrupt::empty(),
                abort_source: AbortSource::empty(),
                slave_active: false,
                enable_follows: true,
                bus: None,
            }),
        }
    }

    /// Peripheral with a simulated bus answering read requests with
    /// `responses`
    pub fn with_bus(depth: usize, responses: &[u8]) -> Self {
        let mock = Self::new(depth);
        mock.state().bus = Some(Bus {
            responses: responses.iter().copied().collect(),
            ..Bus::default()
        });
        mock
    }

    pub fn state(&self) -> RefMut<'_, State> {
        self.state.borrow_mut()
    }

    /// Register value without read side effects
    pub fn reg(&self, reg: Register) -> u32 {
        self.state.borrow().peek(reg)
    }

    /// Latched interrupt causes
    pub fn raw(&self) -> Interrupt {
        self.state.borrow().raw
    }

    pub fn raise(&self, interrupts: Interrupt) {
        self.state().raw |= interrupts;
    }

    /// Abort the current transfer: flush the transmit FIFO and latch TX_ABRT
    pub fn set_abort(&self, source: AbortSource) {
        let mut state = self.state();
        state.tx_fifo.clear();
        state.abort_source = source;
        state.raw |= Interrupt::TX_ABRT;
    }

    /// Deliver bytes from the bus into the receive FIFO
    pub fn push_rx(&self, bytes: &[u8]) {
        let mut state = self.state();
        for &byte in bytes {
            state.receive(byte);
        }
    }

    /// Commands sent on the simulated bus so far
    pub fn written(&self) -> Vec<u32> {
        self.state
            .borrow()
            .bus
            .as_ref()
            .map(|bus| bus.written.clone())
            .unwrap_or_default()
    }

    /// Make the simulated bus abort after `after` commands
    pub fn nack_after(&self, after: usize, source: AbortSource) {
        if let Some(bus) = self.state().bus.as_mut() {
            bus.nack = Some((after, source));
        }
    }
}

impl Instance for MockI2c {
    fn read(&self, reg: Register) -> u32 {
        let mut state = self.state();
        let clear = match reg {
            Register::IntrStat => {
                state.run_bus();
                return state.peek(reg);
            }
            Register::DataCmd => {
                return match state.rx_fifo.pop_front() {
                    Some(byte) => u32::from(byte),
                    None => {
                        state.raw |= Interrupt::RX_UNDER;
                        0
                    }
                };
            }
            Register::ClrIntr => {
                state.abort_source = AbortSource::empty();
                Interrupt::all()
            }
            Register::ClrTxAbrt => {
                state.abort_source = AbortSource::empty();
                Interrupt::TX_ABRT
            }
            Register::ClrRxUnder => Interrupt::RX_UNDER,
            Register::ClrRxOver => Interrupt::RX_OVER,
            Register::ClrTxOver => Interrupt::TX_OVER,
            Register::ClrRdReq => Interrupt::RD_REQ,
            Register::ClrRxDone => Interrupt::RX_DONE,
            Register::ClrActivity => Interrupt::ACTIVITY,
            Register::ClrStopDet => Interrupt::STOP_DET,
            Register::ClrStartDet => Interrupt::START_DET,
            Register::ClrGenCall => Interrupt::GEN_CALL,
            reg => return state.peek(reg),
        };

        let value = (state.raw & clear).bits();
        state.raw.remove(clear);
        value
    }

    fn write(&self, reg: Register, value: u32) {
        let mut state = self.state();
        match reg {
            Register::DataCmd => {
                if state.tx_fifo.len() >= state.depth {
                    state.raw |= Interrupt::TX_OVER;
                } else {
                    state.tx_fifo.push_back(value);
                }
            }
            Register::Enable => {
                state.regs[State::index(reg)] = value;
                if state.enable_follows {
                    state.regs[State::index(Register::EnableStatus)] =
                        value & ENABLE_STATUS_IC_EN;
                }
            }
            reg => state.regs[State::index(reg)] = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_registers_clear_on_read() {
        let mock = MockI2c::new(4);
        mock.raise(Interrupt::STOP_DET | Interrupt::GEN_CALL);

        assert_eq!(
            mock.read(Register::ClrStopDet),
            Interrupt::STOP_DET.bits()
        );
        assert_eq!(mock.raw(), Interrupt::GEN_CALL);
        assert_eq!(mock.read(Register::ClrIntr), Interrupt::GEN_CALL.bits());
        assert!(mock.raw().is_empty());
    }

    #[test]
    fn fifos_flag_overflow_and_underflow() {
        let mock = MockI2c::new(1);

        mock.write(Register::DataCmd, 0x12);
        mock.write(Register::DataCmd, 0x34);
        assert_eq!(mock.reg(Register::TxFlr), 1);
        assert_eq!(mock.reg(Register::Status) & STATUS_TFNF, 0);

        assert_eq!(mock.read(Register::DataCmd), 0);
        assert_eq!(mock.raw(), Interrupt::TX_OVER | Interrupt::RX_UNDER);
    }

    #[test]
    fn bus_answers_reads_and_detects_stop() {
        let mock = MockI2c::with_bus(4, &[0xA5]);

        mock.write(Register::DataCmd, 0x01);
        mock.write(Register::DataCmd, DATA_CMD_READ | DATA_CMD_STOP);
        let _ = mock.read(Register::IntrStat);

        assert_eq!(mock.written(), [0x01, DATA_CMD_READ | DATA_CMD_STOP]);
        assert_eq!(mock.read(Register::DataCmd), 0xA5);
        assert!(mock.raw().contains(Interrupt::STOP_DET));
    }
}
