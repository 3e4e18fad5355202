//! Abort classification
//!
//! Turns the raw interrupt and abort-source flags into the error taxonomy of
//! each role. Overruns are not errors: they are counted on the transfer
//! descriptor and acknowledged here.

use super::{AbortSource, Error, I2c, Instance, Interrupt, Register, Transfer};

/// Error reported for a controller abort with the given abort sources.
///
/// When several sources are set the first match wins, in the order lost
/// arbitration, address not acknowledged (7-bit or either 10-bit address
/// byte), data not acknowledged, 10-bit read without restart.
pub fn master_abort_error(source: AbortSource) -> Error {
    if source.contains(AbortSource::ARB_LOST) {
        Error::LostBus
    } else if source.intersects(
        AbortSource::ADDR7_NOACK
            | AbortSource::ADDR10_1_NOACK
            | AbortSource::ADDR10_2_NOACK,
    ) {
        Error::AddressNack
    } else if source.contains(AbortSource::TXDATA_NOACK) {
        Error::DataNack
    } else if source.contains(AbortSource::READ_10B_NORSTRT) {
        Error::TenBitReadNoRestart
    } else {
        Error::Undefined
    }
}

/// Error reported for a target abort with the given abort sources. Only a
/// lost bus is an error for the target; other causes are acknowledged
/// silently.
pub fn slave_abort_error(source: AbortSource) -> Option<Error> {
    source
        .intersects(AbortSource::ARB_LOST | AbortSource::SLV_ARBLOST)
        .then_some(Error::LostBus)
}

impl<I2C: Instance> I2c<I2C> {
    #[inline(always)]
    fn raw_interrupts(&self) -> Interrupt {
        Interrupt::from_bits_truncate(self.i2c.read(Register::RawIntrStat))
    }

    #[inline(always)]
    fn abort_source(&self) -> AbortSource {
        AbortSource::from_bits_truncate(self.i2c.read(Register::TxAbrtSource))
    }

    /// Count and acknowledge FIFO overruns. A receive underrun counts as a
    /// receive overrun.
    fn count_overruns(&self, raw: Interrupt, xfer: &mut Transfer<'_>) {
        if raw.contains(Interrupt::TX_OVER) {
            xfer.count_tx_overrun();
            self.clear_tx_over();
        }
        if raw.intersects(Interrupt::RX_OVER | Interrupt::RX_UNDER) {
            xfer.count_rx_overrun();
            self.clear_rx_over();
            self.clear_rx_under();
        }
    }

    /// Classify the pending controller abort, if any. Without an abort the
    /// overruns are counted instead.
    pub(crate) fn classify_master_error(
        &self,
        xfer: &mut Transfer<'_>,
    ) -> Option<Error> {
        let raw = self.raw_interrupts();
        if !raw.contains(Interrupt::TX_ABRT) {
            self.count_overruns(raw, xfer);
            return None;
        }

        let source = self.abort_source();
        let error = master_abort_error(source);
        self.clear_tx_abrt();

        #[cfg(feature = "log")]
        log::debug!("I2C controller abort {:?}: {:?}", source, error);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "I2C controller abort {=u32:#x}: {}",
            source.bits(),
            error
        );

        Some(error)
    }

    /// Classify the pending target abort, if any, after acknowledging the
    /// bus condition flags and counting overruns.
    pub(crate) fn classify_slave_error(
        &self,
        xfer: &mut Transfer<'_>,
    ) -> Option<Error> {
        let raw = self.raw_interrupts();

        if raw.contains(Interrupt::START_DET) {
            self.clear_start_det();
        }
        if raw.contains(Interrupt::STOP_DET) {
            self.clear_stop_det();
        }
        if raw.contains(Interrupt::GEN_CALL) {
            self.clear_gen_call();
        }
        self.count_overruns(raw, xfer);

        if !raw.contains(Interrupt::TX_ABRT) {
            return None;
        }

        let source = self.abort_source();
        let error = slave_abort_error(source);
        self.clear_tx_abrt();

        if let Some(_error) = error {
            #[cfg(feature = "log")]
            log::debug!("I2C target abort {:?}: {:?}", source, _error);

            #[cfg(feature = "defmt")]
            defmt::debug!(
                "I2C target abort {=u32:#x}: {}",
                source.bits(),
                _error
            );
        }

        error
    }
}
