use embedded_hal::i2c::{self, Operation};

use super::*;

impl i2c::Error for Error {
    fn kind(&self) -> i2c::ErrorKind {
        match self {
            Error::LostBus => i2c::ErrorKind::ArbitrationLoss,
            Error::AddressNack => i2c::ErrorKind::NoAcknowledge(
                i2c::NoAcknowledgeSource::Address,
            ),
            Error::DataNack => {
                i2c::ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Data)
            }
            Error::TenBitReadNoRestart | Error::Undefined => {
                i2c::ErrorKind::Bus
            }
            Error::EnableTimeout => i2c::ErrorKind::Other,
        }
    }
}

impl<I2C> i2c::ErrorType for I2c<I2C> {
    type Error = Error;
}

fn is_empty(operation: &Operation<'_>) -> bool {
    match operation {
        Operation::Write(bytes) => bytes.is_empty(),
        Operation::Read(buffer) => buffer.is_empty(),
    }
}

/// Condition ending the phase followed by `rest`: only the last phase of a
/// transaction releases the bus
fn phase_condition(rest: &[Operation<'_>]) -> Condition {
    if rest.iter().all(is_empty) {
        Condition::Stop
    } else {
        Condition::Restart
    }
}

/// Role for the whole transaction, or `None` if it moves no bytes
fn transaction_role(operations: &[Operation<'_>]) -> Option<RoleState> {
    let mut role = None;
    for operation in operations.iter().filter(|op| !is_empty(op)) {
        match operation {
            Operation::Read(_) => return Some(RoleState::MasterReceive),
            Operation::Write(_) => role = Some(RoleState::MasterTransmit),
        }
    }
    role
}

/// True once every command of a phase is queued and every byte it reads has
/// arrived
fn phase_drained(xfer: &Transfer<'_>) -> bool {
    !xfer.write_read_mode
        && xfer.tx_sent >= xfer.tx_total
        && xfer.rx_received >= xfer.rx_total
}

impl<I2C: Instance> I2c<I2C> {
    /// Poll the state machine until the phase in `xfer` is over. A phase
    /// ending with STOP is over on STOP_DET; a phase ending with a restart
    /// once it is drained, leaving the bus held for the next phase. After an
    /// error the bus is released, so polling continues until the STOP.
    ///
    /// Returns the first error classified during the phase.
    fn poll_transfer(&mut self, xfer: &mut Transfer<'_>) -> Result<(), Error> {
        let mut first_error = None;
        while !xfer.is_finished() {
            if first_error.is_none()
                && xfer.next_condition == Condition::Restart
                && phase_drained(xfer)
            {
                return Ok(());
            }
            if self.interrupt_pending() {
                if let Some(error) = self.service(xfer) {
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None if xfer.status.contains(Status::INCOMPLETE) => {
                Err(Error::DataNack)
            }
            None => Ok(()),
        }
    }

    /// Run one phase of a transaction on the programmed target
    fn run_phase(&mut self, mut xfer: Transfer<'_>) -> Result<(), Error> {
        if xfer.rx_total > 0 {
            self.start_master_receive(&mut xfer);
        } else {
            self.start_master_transmit(&mut xfer);
        }
        self.poll_transfer(&mut xfer)
    }

    fn run_phases(
        &mut self,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        let mut operations = operations;
        loop {
            // Phases are queued back to back without STOP. The peripheral
            // inserts a repeated start where the direction changes, so
            // adjacent operations of the same kind share one frame.
            let ops = core::mem::take(&mut operations);
            let skip = ops.first().is_some_and(is_empty);
            let paired = matches!(
                ops,
                [Operation::Write(_), Operation::Read(buffer), ..]
                    if !buffer.is_empty()
            );
            operations = if ops.is_empty() {
                return Ok(());
            } else if skip {
                &mut ops[1..]
            } else if paired {
                let [Operation::Write(bytes), Operation::Read(buffer), rest @ ..] =
                    ops
                else {
                    unreachable!()
                };
                let condition = phase_condition(rest);
                self.run_phase(
                    Transfer::write_read(bytes, buffer)
                        .with_condition(condition),
                )?;
                rest
            } else {
                match ops {
                    [] => return Ok(()),
                    [Operation::Write(bytes), rest @ ..] => {
                        let condition = phase_condition(rest);
                        self.run_phase(
                            Transfer::write(bytes).with_condition(condition),
                        )?;
                        rest
                    }
                    [Operation::Read(buffer), rest @ ..] => {
                        let condition = phase_condition(rest);
                        self.run_phase(
                            Transfer::read(buffer).with_condition(condition),
                        )?;
                        rest
                    }
                }
            };
        }
    }

    /// Run `operations` as one bus transaction: a single START, repeated
    /// starts between reads and writes, a single STOP after the last
    /// operation. Empty operations are skipped.
    fn run_operations(
        &mut self,
        address: u16,
        address_mode: AddressMode,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        let Some(role) = transaction_role(operations) else {
            return Ok(());
        };
        self.set_target_address(address, address_mode, role)?;

        let result = self.run_phases(operations);
        // Earlier phases may have left other master causes unmasked
        self.mask_interrupts(MASTER_RX_INTERRUPTS);
        result
    }
}

impl<I2C: Instance> i2c::I2c<i2c::SevenBitAddress> for I2c<I2C> {
    fn transaction(
        &mut self,
        address: i2c::SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        I2c::run_operations(
            self,
            u16::from(address),
            AddressMode::SevenBit,
            operations,
        )
    }
}

impl<I2C: Instance> i2c::I2c<i2c::TenBitAddress> for I2c<I2C> {
    fn transaction(
        &mut self,
        address: i2c::TenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        I2c::run_operations(self, address, AddressMode::TenBit, operations)
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::i2c::{
        Error as _, ErrorKind, I2c as _, NoAcknowledgeSource,
    };

    use super::super::mock::MockI2c;
    use super::*;

    fn master(mock: &MockI2c) -> I2c<&MockI2c> {
        let mut i2c =
            I2c::new(mock, KiloHertz::from_raw(100_000), Config::default());
        i2c.master_init(0x00).unwrap();
        i2c
    }

    #[test]
    fn write_read_is_one_transfer() {
        let mock = MockI2c::with_bus(8, &[0xAB, 0xCD]);
        let mut i2c = master(&mock);
        let mut buf = [0u8; 2];

        i2c.write_read(0x50u8, &[0x07], &mut buf).unwrap();

        assert_eq!(buf, [0xAB, 0xCD]);
        assert_eq!(mock.reg(Register::Tar), 0x50);
        assert_eq!(
            mock.written(),
            [0x07, DATA_CMD_READ, DATA_CMD_READ | DATA_CMD_STOP]
        );
    }

    #[test]
    fn consecutive_writes_share_one_frame() {
        let mock = MockI2c::with_bus(8, &[]);
        let mut i2c = master(&mock);

        i2c.transaction(
            0x21u8,
            &mut [
                Operation::Write(&[1, 2]),
                Operation::Write(&[]),
                Operation::Write(&[3]),
            ],
        )
        .unwrap();

        assert_eq!(mock.written(), [1, 2, 3 | DATA_CMD_STOP]);
        assert_eq!(mock.reg(Register::IntrMask), 0);
    }

    #[test]
    fn transaction_ends_with_a_single_stop() {
        let mock = MockI2c::with_bus(8, &[0x42]);
        let mut i2c = master(&mock);
        let mut buf = [0u8; 1];

        i2c.transaction(
            0x21u8,
            &mut [
                Operation::Write(&[1]),
                Operation::Write(&[2]),
                Operation::Read(&mut buf),
            ],
        )
        .unwrap();

        let written = mock.written();
        assert_eq!(written, [1, 2, DATA_CMD_READ | DATA_CMD_STOP]);
        let stops = written
            .iter()
            .filter(|&&cmd| cmd & DATA_CMD_STOP != 0)
            .count();
        assert_eq!(stops, 1);
        assert_eq!(buf, [0x42]);
    }

    #[test]
    fn read_after_read_continues_the_frame() {
        let mock = MockI2c::with_bus(2, &[1, 2, 3, 4, 5]);
        let mut i2c = master(&mock);
        let mut first = [0u8; 3];
        let mut second = [0u8; 2];

        i2c.transaction(
            0x21u8,
            &mut [Operation::Read(&mut first), Operation::Read(&mut second)],
        )
        .unwrap();

        assert_eq!(first, [1, 2, 3]);
        assert_eq!(second, [4, 5]);
        assert_eq!(
            mock.written(),
            [
                DATA_CMD_READ,
                DATA_CMD_READ,
                DATA_CMD_READ,
                DATA_CMD_READ,
                DATA_CMD_READ | DATA_CMD_STOP
            ]
        );
    }

    #[test]
    fn write_after_read_ends_the_frame() {
        let mock = MockI2c::with_bus(8, &[0x11]);
        let mut i2c = master(&mock);
        let mut buf = [0u8; 1];

        i2c.transaction(
            0x21u8,
            &mut [Operation::Read(&mut buf), Operation::Write(&[0x22])],
        )
        .unwrap();

        assert_eq!(buf, [0x11]);
        assert_eq!(mock.written(), [DATA_CMD_READ, 0x22 | DATA_CMD_STOP]);
    }

    #[test]
    fn empty_transaction_touches_nothing() {
        let mock = MockI2c::with_bus(8, &[]);
        let mut i2c = master(&mock);

        i2c.transaction(0x21u8, &mut [Operation::Write(&[])]).unwrap();

        assert!(mock.written().is_empty());
        assert_eq!(mock.reg(Register::Tar), 0x00);
    }

    #[test]
    fn abort_in_an_early_phase_ends_the_transaction() {
        let mock = MockI2c::with_bus(8, &[]);
        mock.nack_after(0, AbortSource::ADDR7_NOACK);
        let mut i2c = master(&mock);
        let mut buf = [0u8; 2];

        let result = i2c.transaction(
            0x33u8,
            &mut [Operation::Read(&mut buf), Operation::Write(&[1])],
        );

        assert_eq!(result, Err(Error::AddressNack));
        assert!(mock.written().is_empty());
        assert_eq!(mock.reg(Register::IntrMask), 0);
    }

    #[test]
    fn address_nack_is_reported() {
        let mock = MockI2c::with_bus(8, &[]);
        mock.nack_after(0, AbortSource::ADDR7_NOACK);
        let mut i2c = master(&mock);

        let error = i2c.write(0x33u8, &[1, 2]).unwrap_err();

        assert_eq!(error, Error::AddressNack);
        assert_eq!(
            error.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        assert_eq!(mock.reg(Register::IntrMask), 0);
    }

    #[test]
    fn data_nack_stops_the_transaction() {
        let mock = MockI2c::with_bus(8, &[]);
        mock.nack_after(1, AbortSource::TXDATA_NOACK);
        let mut i2c = master(&mock);

        let result = i2c.transaction(
            0x33u8,
            &mut [Operation::Write(&[1, 2]), Operation::Write(&[3])],
        );

        assert_eq!(result, Err(Error::DataNack));
        assert_eq!(mock.written(), [1]);
    }

    #[test]
    fn ten_bit_read_enables_restart() {
        let mock = MockI2c::with_bus(8, &[0x5A]);
        let mut i2c = I2c::new(
            &mock,
            KiloHertz::from_raw(100_000),
            Config::default().restart(false),
        );
        i2c.master_init(0x00).unwrap();
        let mut buf = [0u8; 1];

        i2c.read(0x2A5u16, &mut buf).unwrap();

        assert_eq!(buf, [0x5A]);
        assert_eq!(
            mock.reg(Register::Tar),
            0x2A5 | TAR_10BITADDR_MASTER
        );
        assert_ne!(mock.reg(Register::Con) & CON_RESTART_EN, 0);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(Error::LostBus.kind(), ErrorKind::ArbitrationLoss);
        assert_eq!(
            Error::DataNack.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
        );
        assert_eq!(Error::Undefined.kind(), ErrorKind::Bus);
        assert_eq!(Error::EnableTimeout.kind(), ErrorKind::Other);
    }
}
