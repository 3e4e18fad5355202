//! Interrupt-driven I2C transfer engine for DesignWare APB I2C peripherals
//!
//! The [`i2c`] module contains the driver. It is split into a clock/timing
//! configurator, static configuration, an abort classifier and the transfer
//! state machine that is stepped from the peripheral's interrupt handler.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod prelude;

#[macro_use]
mod macros;

pub mod time;

pub mod i2c;
