//! `embedded-hal` driver for the SN3218, an 18-channel LED PWM driver on I2C.
//!
//! The chip is write-only. The driver keeps its own copy of the on/off state
//! so single channels can be switched, toggled and queried. PWM and on/off
//! writes are staged by the chip and only reach the outputs after
//! `update()`.
//!
//! ```ignore
//! use sn3218::{Sn3218, ALTERNATE_ADDRESS};
//!
//! let mut leds = Sn3218::new_blocking(i2c, ALTERNATE_ADDRESS);
//! leds.reset()?;
//! leds.wake()?;
//! leds.set_pwm(0, 128)?;
//! leds.led_on(0)?;
//! leds.update()?;
//! ```
//!
//! Both blocking (`embedded_hal::i2c::I2c`) and async
//! (`embedded_hal_async::i2c::I2c`) buses are supported.
#![no_std]

#[cfg(feature = "command")]
pub mod command;
pub mod config;
pub mod scan;
pub mod selftest;
pub mod sn3218;
mod state;

#[cfg(test)]
mod test_utils;

pub use config::{ALTERNATE_ADDRESS, CHANNEL_COUNT, CHANNEL_LAST, DEFAULT_ADDRESS};
pub use sn3218::{Async, Blocking, Mode, Sn3218, Sn3218Error};
pub use state::encode_led_control;
