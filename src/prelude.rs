//! Prelude

pub use crate::i2c::I2cExt as _dw_i2c_hal_i2c_I2cExt;
pub use crate::i2c::Instance as _dw_i2c_hal_i2c_Instance;

pub use fugit::RateExtU32 as _;
