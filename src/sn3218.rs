use crate::config::*;
use crate::state::State;

use embedded_hal::i2c::{Error, ErrorKind};
use log::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sn3218Error {
    /// Channel outside 0-17, rejected before touching the bus
    InvalidChannel(u8),
    /// The bus transaction failed
    Bus(ErrorKind),
}

impl Error for Sn3218Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Sn3218Error::Bus(kind) => *kind,
            Sn3218Error::InvalidChannel(_) => ErrorKind::Other,
        }
    }
}

impl core::fmt::Display for Sn3218Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Sn3218Error::InvalidChannel(channel) => {
                write!(f, "invalid channel {} (expected 0-{})", channel, CHANNEL_LAST)
            }
            Sn3218Error::Bus(kind) => write!(f, "bus error: {}", kind),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Sn3218Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Sn3218Error::InvalidChannel(channel) => {
                defmt::write!(fmt, "InvalidChannel({})", channel)
            }
            Sn3218Error::Bus(kind) => {
                defmt::write!(fmt, "Bus({})", defmt::Debug2Format(kind))
            }
        }
    }
}

pub trait Mode {}

#[derive(Debug)]
pub struct Async;
#[derive(Debug)]
pub struct Blocking;

impl Mode for Async {}
impl Mode for Blocking {}

/// SN3218 driver.
///
/// Every register write is a single bus `transaction`, so a shared-bus
/// wrapper (e.g. `embedded_hal_bus::i2c::CriticalSectionDevice`) holds its
/// lock for the whole write and nothing can interleave with it.
pub struct Sn3218<BUS, M: Mode> {
    bus: BUS,
    address: u8,
    state: State,
    _phantom: core::marker::PhantomData<M>,
}

// General implementation
impl<BUS, M: Mode> Sn3218<BUS, M> {
    /// Create a new SN3218 driver
    /// # Arguments
    /// * `bus` - The I2C bus to use
    /// * `address` - The I2C address of the device, usually
    ///   [`DEFAULT_ADDRESS`] or [`ALTERNATE_ADDRESS`]
    ///
    /// # Returns
    /// A new SN3218 driver with every LED marked off
    pub fn new(bus: BUS, address: u8) -> Self {
        Self {
            bus,
            address,
            state: State::default(),
            _phantom: core::marker::PhantomData,
        }
    }

    pub fn into_inner(self) -> BUS {
        self.bus
    }

    pub fn inner(&self) -> &BUS {
        &self.bus
    }

    pub fn inner_mut(&mut self) -> &mut BUS {
        &mut self.bus
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Whether the channel was last switched on. This is the driver's own
    /// record, the chip is never queried.
    ///
    /// Out of range channels report `false`.
    pub fn led_state(&self, channel: u8) -> bool {
        self.state.is_on(channel)
    }

    /// The whole on/off mirror, bit `n` being channel `n`
    pub fn led_mask(&self) -> u32 {
        self.state.leds
    }

    fn check_channel(&self, channel: u8) -> Result<(), Sn3218Error> {
        if channel > CHANNEL_LAST {
            warn!(
                "sn3218@{:#04x}: rejected channel {}",
                self.address, channel
            );
            return Err(Sn3218Error::InvalidChannel(channel));
        }
        Ok(())
    }

    // Reports the last channel of the range, saturated at 255
    fn check_channel_range(
        &self,
        start: u8,
        count: usize,
    ) -> Result<(), Sn3218Error> {
        self.check_channel(start)?;

        if count == 0 {
            return Err(Sn3218Error::InvalidChannel(start));
        }

        let last = start as usize + count - 1;
        self.check_channel(u8::try_from(last).unwrap_or(u8::MAX))
    }

    fn apply_led_masks(&mut self, and_mask: u32, or_mask: u32) -> [u8; 3] {
        self.state.apply(and_mask, or_mask);
        debug!(
            "sn3218@{:#04x}: leds {:#07x}",
            self.address, self.state.leds
        );
        self.state.control_registers()
    }

    fn bus_error<E: Error>(&self, register: u8, error: E) -> Sn3218Error {
        let kind = error.kind();
        warn!(
            "sn3218@{:#04x}: write to {:#04x} failed: {:?}",
            self.address, register, kind
        );
        Sn3218Error::Bus(kind)
    }
}

impl<BUS: embedded_hal::i2c::I2c> Sn3218<BUS, Blocking> {
    pub fn new_blocking(bus: BUS, address: u8) -> Self {
        Self::new(bus, address)
    }

    /// Write consecutive registers in one transaction, starting at `register`
    pub fn write_registers(
        &mut self,
        register: u8,
        values: &[u8],
    ) -> Result<(), Sn3218Error> {
        trace!(
            "sn3218@{:#04x}: write {:#04x} {:02x?}",
            self.address,
            register,
            values
        );

        self.bus
            .transaction(
                self.address,
                &mut [
                    embedded_hal::i2c::Operation::Write(&[register]),
                    embedded_hal::i2c::Operation::Write(values),
                ],
            )
            .map_err(|e| self.bus_error(register, e))
    }

    pub fn write_register(
        &mut self,
        register: u8,
        value: u8,
    ) -> Result<(), Sn3218Error> {
        self.write_registers(register, &[value])
    }

    /// Set the PWM duty cycle of a channel. Takes effect on the next
    /// `update()`.
    ///
    /// # Arguments
    /// * `channel` - 0 to 17
    /// * `value` - 0 (off) to 255 (fully on)
    pub fn set_pwm(&mut self, channel: u8, value: u8) -> Result<(), Sn3218Error> {
        self.check_channel(channel)?;
        self.write_register(PWM_REGISTER_BASE + channel, value)
    }

    /// Set the PWM duty cycle of consecutive channels in one transaction
    ///
    /// # Arguments
    /// * `start` - The first channel to set
    /// * `values` - One value per channel, must not run past channel 17
    ///
    /// # Returns
    /// * Err(Sn3218Error::InvalidChannel(last)) if the range runs past
    ///   channel 17, `last` being the range's final channel saturated at 255
    pub fn set_pwm_many(
        &mut self,
        start: u8,
        values: &[u8],
    ) -> Result<(), Sn3218Error> {
        self.check_channel_range(start, values.len())?;
        self.write_registers(PWM_REGISTER_BASE + start, values)
    }

    pub fn led_on(&mut self, channel: u8) -> Result<(), Sn3218Error> {
        self.check_channel(channel)?;
        self.led_control(u32::MAX, 1 << channel)
    }

    pub fn led_off(&mut self, channel: u8) -> Result<(), Sn3218Error> {
        self.check_channel(channel)?;
        self.led_control(!(1 << channel), 0)
    }

    pub fn led_toggle(&mut self, channel: u8) -> Result<(), Sn3218Error> {
        self.check_channel(channel)?;

        if self.led_state(channel) {
            self.led_off(channel)
        } else {
            self.led_on(channel)
        }
    }

    /// Switch many LEDs at once: the mirror becomes
    /// `(mirror & and_mask) | or_mask` and all three control registers are
    /// rewritten.
    ///
    /// The mirror is updated even when the write fails.
    pub fn led_control(
        &mut self,
        and_mask: u32,
        or_mask: u32,
    ) -> Result<(), Sn3218Error> {
        let registers = self.apply_led_masks(and_mask, or_mask);
        self.write_registers(LED_CONTROL_REGISTER_BASE, &registers)
    }

    /// Latch the pending PWM and LED control values onto the outputs
    pub fn update(&mut self) -> Result<(), Sn3218Error> {
        self.write_register(UPDATE_REGISTER, TRIGGER_VALUE)
    }

    /// Reset every register to its power-on default
    pub fn reset(&mut self) -> Result<(), Sn3218Error> {
        self.state.clear();
        self.write_register(RESET_REGISTER, TRIGGER_VALUE)
    }

    pub fn shutdown(&mut self) -> Result<(), Sn3218Error> {
        self.write_register(SHUTDOWN_REGISTER, SHUTDOWN_SOFTWARE_SHUTDOWN)
    }

    pub fn wake(&mut self) -> Result<(), Sn3218Error> {
        self.write_register(SHUTDOWN_REGISTER, SHUTDOWN_NORMAL_OPERATION)
    }
}

impl<BUS: embedded_hal_async::i2c::I2c> Sn3218<BUS, Async> {
    pub fn new_async(bus: BUS, address: u8) -> Self {
        Self::new(bus, address)
    }

    pub async fn write_registers(
        &mut self,
        register: u8,
        values: &[u8],
    ) -> Result<(), Sn3218Error> {
        trace!(
            "sn3218@{:#04x}: write {:#04x} {:02x?}",
            self.address,
            register,
            values
        );

        let result = self
            .bus
            .transaction(
                self.address,
                &mut [
                    embedded_hal_async::i2c::Operation::Write(&[register]),
                    embedded_hal_async::i2c::Operation::Write(values),
                ],
            )
            .await;

        result.map_err(|e| self.bus_error(register, e))
    }

    pub async fn write_register(
        &mut self,
        register: u8,
        value: u8,
    ) -> Result<(), Sn3218Error> {
        self.write_registers(register, &[value]).await
    }

    pub async fn set_pwm(
        &mut self,
        channel: u8,
        value: u8,
    ) -> Result<(), Sn3218Error> {
        self.check_channel(channel)?;
        self.write_register(PWM_REGISTER_BASE + channel, value).await
    }

    pub async fn set_pwm_many(
        &mut self,
        start: u8,
        values: &[u8],
    ) -> Result<(), Sn3218Error> {
        self.check_channel_range(start, values.len())?;
        self.write_registers(PWM_REGISTER_BASE + start, values).await
    }

    pub async fn led_on(&mut self, channel: u8) -> Result<(), Sn3218Error> {
        self.check_channel(channel)?;
        self.led_control(u32::MAX, 1 << channel).await
    }

    pub async fn led_off(&mut self, channel: u8) -> Result<(), Sn3218Error> {
        self.check_channel(channel)?;
        self.led_control(!(1 << channel), 0).await
    }

    pub async fn led_toggle(&mut self, channel: u8) -> Result<(), Sn3218Error> {
        self.check_channel(channel)?;

        if self.led_state(channel) {
            self.led_off(channel).await
        } else {
            self.led_on(channel).await
        }
    }

    pub async fn led_control(
        &mut self,
        and_mask: u32,
        or_mask: u32,
    ) -> Result<(), Sn3218Error> {
        let registers = self.apply_led_masks(and_mask, or_mask);
        self.write_registers(LED_CONTROL_REGISTER_BASE, &registers)
            .await
    }

    pub async fn update(&mut self) -> Result<(), Sn3218Error> {
        self.write_register(UPDATE_REGISTER, TRIGGER_VALUE).await
    }

    pub async fn reset(&mut self) -> Result<(), Sn3218Error> {
        self.state.clear();
        self.write_register(RESET_REGISTER, TRIGGER_VALUE).await
    }

    pub async fn shutdown(&mut self) -> Result<(), Sn3218Error> {
        self.write_register(SHUTDOWN_REGISTER, SHUTDOWN_SOFTWARE_SHUTDOWN)
            .await
    }

    pub async fn wake(&mut self) -> Result<(), Sn3218Error> {
        self.write_register(SHUTDOWN_REGISTER, SHUTDOWN_NORMAL_OPERATION)
            .await
    }
}
