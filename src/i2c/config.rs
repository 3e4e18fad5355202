use super::Speed;

/// A structure for specifying the static I2C configuration
///
/// This structure uses the builder pattern to generate the configuration:
///
/// ```
/// use dw_i2c_hal::i2c::{Config, Speed};
///
/// let config = Config::new(Speed::Fast).general_call(true).rx_fifo_threshold(3);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Bus speed class
    pub(crate) speed: Speed,
    /// Address the general call address instead of the target (controller operation only)
    pub(crate) general_call: bool,
    /// Allow repeated start conditions
    pub(crate) restart: bool,
    /// TX_EMPTY fires when the transmit FIFO holds this many entries or fewer
    pub(crate) tx_fifo_threshold: u8,
    /// RX_FULL fires when the receive FIFO holds more than this many entries
    pub(crate) rx_fifo_threshold: u8,
}

impl Config {
    /// Create a default configuration for the given speed class: repeated starts enabled, no
    /// general call, and interrupts on an empty transmit FIFO and on every received byte.
    pub const fn new(speed: Speed) -> Self {
        Config {
            speed,
            general_call: false,
            restart: true,
            tx_fifo_threshold: 0,
            rx_fifo_threshold: 0,
        }
    }

    /// Set the bus speed class
    pub const fn speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    /// When enabled, controller transfers are sent to the general call address (0x00) rather
    /// than to the programmed target address.
    pub const fn general_call(mut self, enable: bool) -> Self {
        self.general_call = enable;
        self
    }

    /// Enable or disable repeated start conditions. 10-bit controller reads always enable them.
    pub const fn restart(mut self, enable: bool) -> Self {
        self.restart = enable;
        self
    }

    /// Transmit FIFO level at or below which TX_EMPTY is raised
    pub const fn tx_fifo_threshold(mut self, level: u8) -> Self {
        self.tx_fifo_threshold = level;
        self
    }

    /// Receive FIFO level above which RX_FULL is raised. A level of 0 raises RX_FULL for every
    /// received byte.
    pub const fn rx_fifo_threshold(mut self, level: u8) -> Self {
        self.rx_fifo_threshold = level;
        self
    }
}

impl From<Speed> for Config {
    fn from(speed: Speed) -> Self {
        Config::new(speed)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(Speed::Standard)
    }
}
