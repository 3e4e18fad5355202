/// This macro is used to insert a double read of a peripheral register to give the peripheral
/// enough time to process a read of a clear-on-read register. This prevents an interrupt from
/// firing immediately a second time after an ISR exits. It's necessary due to delayed
/// synchronization between a peripheral and the CPU due to the different clocks of the
/// peripheral and CPU. The register that is passed in should not produce undesireable side
/// effects when read.
///
/// See ARM Application Note 321 Section 4.9
macro_rules! interrupt_clear_clock_sync_delay {
    ($i2c:expr, $status_reg:expr) => {
        let _ = $i2c.read($status_reg);
        let _ = $i2c.read($status_reg);
    };
}

/// Generates one acknowledge method per interrupt cause. Each DesignWare interrupt cause has a
/// dedicated clear register that clears the cause when it is read, so `clear_tx_abrt` reads
/// `Register::ClrTxAbrt` and discards the value.
macro_rules! interrupt_clear_fns {
    ($($cause:ident),+ $(,)?) => {
        paste::item! {
            $(
                #[inline(always)]
                pub(crate) fn [<clear_ $cause:snake>](&self) {
                    let _ = self.i2c.read(Register::[<Clr $cause>]);
                }
            )+
        }
    };
}
