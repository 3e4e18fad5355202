//! SCL timing
//!
//! The peripheral times SCL in cycles of its input clock. These functions
//! convert the minimum high and low periods of each I2C speed class into
//! register counts, together with the spike suppression length that the
//! counts are floored against.
//!
//! The counts are derived from `clock_ns`, the input clock period truncated to
//! whole nanoseconds. For input clocks above 1 GHz that period is zero, so the
//! count is instead scaled by the whole number of cycles per nanosecond. That
//! branch truncates rather than rounds up.

use crate::time::KiloHertz;

/// Fast mode spike suppression limit (ns)
const SPIKE_SUPPRESSION_NS: u32 = 50;

/// Bus speed class
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    /// Standard-mode (Sm), up to 100 kbit/s
    Standard,
    /// Fast-mode (Fm), up to 400 kbit/s
    Fast,
    /// Fast-mode Plus (Fm+), up to 1 Mbit/s
    FastPlus,
}

impl Speed {
    /// Minimum SCL high period (ns)
    pub const fn min_high_ns(self) -> u32 {
        match self {
            Speed::Standard => 4400,
            Speed::Fast => 790,
            Speed::FastPlus => 290,
        }
    }

    /// Minimum SCL low period (ns)
    pub const fn min_low_ns(self) -> u32 {
        match self {
            Speed::Standard => 5200,
            Speed::Fast => 1600,
            Speed::FastPlus => 550,
        }
    }
}

/// Number of input clock cycles covering at least `min_ns`.
///
/// # Panics
///
/// Panics if `clock_khz` is zero.
fn cycles_for(clock_khz: u32, min_ns: u32) -> u32 {
    if clock_khz <= 1_000_000 {
        let clock_ns = 1_000_000 / clock_khz;
        min_ns.div_ceil(clock_ns)
    } else {
        min_ns * (clock_khz / 1_000_000)
    }
}

/// Spike suppression length (IC_FS_SPKLEN) for an input clock of `clock_khz`.
///
/// # Panics
///
/// Panics if `clock_khz` is zero.
pub fn compute_spike_length(clock_khz: u32) -> u32 {
    cycles_for(clock_khz, SPIKE_SUPPRESSION_NS)
}

/// SCL high and low counts for `speed` with an input clock of `clock_khz`.
///
/// The counts are floored at the hardware minimums of `spike + 5` (high) and
/// `spike + 7` (low).
///
/// # Panics
///
/// Panics if `clock_khz` is zero.
pub fn compute_scl_counts(clock_khz: u32, speed: Speed) -> (u32, u32) {
    let spike = compute_spike_length(clock_khz);

    let high = cycles_for(clock_khz, speed.min_high_ns());
    let low = cycles_for(clock_khz, speed.min_low_ns());

    (
        core::cmp::max(high, spike + 5),
        core::cmp::max(low, spike + 7),
    )
}

/// Timing register values for one bus speed and input clock
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusSpeed {
    speed: Speed,
    clock_khz: u32,
    high_count: u32,
    low_count: u32,
    spike_length: u32,
}

impl BusSpeed {
    /// Derive the timing register values for `speed` from the peripheral's
    /// input clock.
    ///
    /// # Panics
    ///
    /// Panics if `clock` is zero.
    pub fn new(clock: KiloHertz, speed: Speed) -> Self {
        let clock_khz = clock.raw();
        let (high_count, low_count) = compute_scl_counts(clock_khz, speed);
        let spike_length = compute_spike_length(clock_khz);

        #[cfg(feature = "log")]
        log::debug!(
            "I2C timing: clock={}kHz speed={:?} hcnt={} lcnt={} spklen={}",
            clock_khz,
            speed,
            high_count,
            low_count,
            spike_length
        );

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "I2C timing: clock={}kHz speed={} hcnt={} lcnt={} spklen={}",
            clock_khz,
            speed,
            high_count,
            low_count,
            spike_length
        );

        BusSpeed {
            speed,
            clock_khz,
            high_count,
            low_count,
            spike_length,
        }
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn clock(&self) -> KiloHertz {
        KiloHertz::from_raw(self.clock_khz)
    }

    /// SCL high count
    pub fn high_count(&self) -> u32 {
        self.high_count
    }

    /// SCL low count
    pub fn low_count(&self) -> u32 {
        self.low_count
    }

    /// Spike suppression length
    pub fn spike_length(&self) -> u32 {
        self.spike_length
    }
}
