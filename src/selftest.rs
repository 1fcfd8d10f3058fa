//! Walks every channel through a list of PWM levels, one channel lit at a
//! time. Meant to be stepped from a main loop so it can be interleaved with
//! other work.

use crate::config::CHANNEL_LAST;
use crate::sn3218::{Async, Blocking, Sn3218, Sn3218Error};

use log::{info, trace};

pub const SELF_TEST_LEVELS: [u8; 2] = [128, 255];
/// How long each channel stays lit
pub const SELF_TEST_STEP_DELAY_MS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTestStatus {
    /// First channel of the first level done
    Started,
    Running,
    /// Last channel of the last level done, the next step starts over
    Finished,
}

#[derive(Debug, Clone)]
pub struct SelfTest<'a> {
    levels: &'a [u8],
    level: usize,
    channel: u8,
}

impl SelfTest<'static> {
    pub fn new() -> Self {
        Self::with_levels(&SELF_TEST_LEVELS)
    }
}

impl Default for SelfTest<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SelfTest<'a> {
    pub fn with_levels(levels: &'a [u8]) -> Self {
        Self {
            levels,
            level: 0,
            channel: 0,
        }
    }

    /// Channel lit by the next step
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// PWM level used by the next step, `None` without levels
    pub fn level(&self) -> Option<u8> {
        self.levels.get(self.level).copied()
    }

    fn begin_step(&self) -> bool {
        let starting = self.level == 0 && self.channel == 0;
        if starting {
            info!("LED test starting");
        }
        trace!("testing channel={} pwmLevel={:?}", self.channel, self.level());
        starting
    }

    fn advance(&mut self, starting: bool) -> SelfTestStatus {
        if self.channel < CHANNEL_LAST {
            self.channel += 1;
        } else {
            self.channel = 0;
            self.level += 1;
        }

        if self.level >= self.levels.len() {
            self.level = 0;
            info!("LED test finished");
            SelfTestStatus::Finished
        } else if starting {
            SelfTestStatus::Started
        } else {
            SelfTestStatus::Running
        }
    }

    /// Light the current channel for [`SELF_TEST_STEP_DELAY_MS`], then move on.
    /// On error the position is kept so the next step retries the channel.
    pub fn step<BUS, D>(
        &mut self,
        driver: &mut Sn3218<BUS, Blocking>,
        delay: &mut D,
    ) -> Result<SelfTestStatus, Sn3218Error>
    where
        BUS: embedded_hal::i2c::I2c,
        D: embedded_hal::delay::DelayNs,
    {
        let Some(level) = self.level() else {
            return Ok(SelfTestStatus::Finished);
        };
        let starting = self.begin_step();

        if self.channel == 0 {
            driver.led_control(0, 0)?;
        }

        driver.set_pwm(self.channel, level)?;
        driver.led_on(self.channel)?;
        driver.update()?;
        delay.delay_ms(SELF_TEST_STEP_DELAY_MS);
        driver.led_off(self.channel)?;

        Ok(self.advance(starting))
    }

    /// Step until a full pass over every level is done
    pub fn run<BUS, D>(
        &mut self,
        driver: &mut Sn3218<BUS, Blocking>,
        delay: &mut D,
    ) -> Result<(), Sn3218Error>
    where
        BUS: embedded_hal::i2c::I2c,
        D: embedded_hal::delay::DelayNs,
    {
        while self.step(driver, delay)? != SelfTestStatus::Finished {}
        Ok(())
    }

    pub async fn step_async<BUS, D>(
        &mut self,
        driver: &mut Sn3218<BUS, Async>,
        delay: &mut D,
    ) -> Result<SelfTestStatus, Sn3218Error>
    where
        BUS: embedded_hal_async::i2c::I2c,
        D: embedded_hal_async::delay::DelayNs,
    {
        let Some(level) = self.level() else {
            return Ok(SelfTestStatus::Finished);
        };
        let starting = self.begin_step();

        if self.channel == 0 {
            driver.led_control(0, 0).await?;
        }

        driver.set_pwm(self.channel, level).await?;
        driver.led_on(self.channel).await?;
        driver.update().await?;
        delay.delay_ms(SELF_TEST_STEP_DELAY_MS).await;
        driver.led_off(self.channel).await?;

        Ok(self.advance(starting))
    }

    pub async fn run_async<BUS, D>(
        &mut self,
        driver: &mut Sn3218<BUS, Async>,
        delay: &mut D,
    ) -> Result<(), Sn3218Error>
    where
        BUS: embedded_hal_async::i2c::I2c,
        D: embedded_hal_async::delay::DelayNs,
    {
        while self.step_async(driver, delay).await? != SelfTestStatus::Finished {}
        Ok(())
    }
}
