//! JSON command surface.
//!
//! A command is a JSON object such as `{"pwm0": 128, "led0": 1, "led5": 0}`.
//! `pwm<N>` sets the PWM value of channel `N` (values outside 0-255 become
//! 0), `led<N>` switches channel `N` on for a non-zero value and off for 0.
//! Other keys are ignored. Entries run in document order and the outputs are
//! latched once at the end.

use crate::config::CHANNEL_COUNT;
use crate::sn3218::{Async, Blocking, Sn3218, Sn3218Error};

use core::fmt;
use log::{info, warn};
use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};

/// Enough for a PWM and an on/off entry per channel
pub const MAX_COMMANDS: usize = 2 * CHANNEL_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pwm { channel: u8, value: u8 },
    Led { channel: u8, on: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Pwm(u8),
    Led(u8),
}

impl Command {
    /// Build a command from one JSON entry. `None` for keys that are not
    /// `pwm<N>` or `led<N>`.
    pub fn parse(key: &str, value: i64) -> Option<Self> {
        parse_key(key).map(|target| Self::new(target, value))
    }

    fn new(target: Target, value: i64) -> Self {
        match target {
            Target::Pwm(channel) => Command::Pwm {
                channel,
                value: u8::try_from(value).unwrap_or(0),
            },
            Target::Led(channel) => Command::Led {
                channel,
                on: value != 0,
            },
        }
    }
}

fn parse_key(key: &str) -> Option<Target> {
    if let Some(digits) = key.strip_prefix("pwm") {
        parse_channel(digits).map(Target::Pwm)
    } else if let Some(digits) = key.strip_prefix("led") {
        parse_channel(digits).map(Target::Led)
    } else {
        None
    }
}

// Leading digits only, trailing text is ignored. Numbers too large for a
// channel saturate so the driver rejects them.
fn parse_channel(digits: &str) -> Option<u8> {
    let digits = digits.as_bytes();
    let len = digits.iter().take_while(|c| c.is_ascii_digit()).count();

    if len == 0 {
        return None;
    }

    let channel = digits[..len].iter().fold(0u32, |acc, c| {
        acc.saturating_mul(10).saturating_add(u32::from(c - b'0'))
    });

    Some(u8::try_from(channel).unwrap_or(u8::MAX))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    commands: heapless::Vec<Command, MAX_COMMANDS>,
    overflow: bool,
}

impl CommandBatch {
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

impl<'de> Deserialize<'de> for CommandBatch {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(CommandBatchVisitor)
    }
}

struct CommandBatchVisitor;

impl<'de> Visitor<'de> for CommandBatchVisitor {
    type Value = CommandBatch;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object of pwm<N> and led<N> entries")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut batch = CommandBatch::default();

        while let Some(key) = map.next_key::<&'de str>()? {
            let Some(target) = parse_key(key) else {
                map.next_value::<IgnoredAny>()?;
                continue;
            };

            let value = map.next_value::<i64>()?;
            if batch.commands.push(Command::new(target, value)).is_err() {
                batch.overflow = true;
            }
        }

        Ok(batch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Not a JSON object of integer entries
    Parse,
    /// More than [`MAX_COMMANDS`] entries
    TooManyEntries,
    /// A bus error, the remaining entries were not applied
    Driver(Sn3218Error),
}

impl From<Sn3218Error> for CommandError {
    fn from(error: Sn3218Error) -> Self {
        CommandError::Driver(error)
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Parse => f.write_str("malformed command"),
            CommandError::TooManyEntries => {
                write!(f, "more than {} command entries", MAX_COMMANDS)
            }
            CommandError::Driver(error) => write!(f, "{}", error),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for CommandError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            CommandError::Parse => defmt::write!(fmt, "Parse"),
            CommandError::TooManyEntries => defmt::write!(fmt, "TooManyEntries"),
            CommandError::Driver(error) => defmt::write!(fmt, "Driver({})", error),
        }
    }
}

/// Outcome of a command that reached the bus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandSummary {
    pub applied: usize,
    /// Entries naming a channel outside 0-17
    pub skipped: usize,
}

impl CommandSummary {
    fn record(&mut self, result: Result<(), Sn3218Error>) -> Result<(), CommandError> {
        match result {
            Ok(()) => self.applied += 1,
            Err(Sn3218Error::InvalidChannel(channel)) => {
                warn!("command: skipping channel {}", channel);
                self.skipped += 1;
            }
            Err(error) => return Err(error.into()),
        }
        Ok(())
    }
}

pub fn parse(json: &str) -> Result<CommandBatch, CommandError> {
    let (batch, _) = serde_json_core::from_str::<CommandBatch>(json).map_err(|_e| {
        warn!("command: parse error: {:?}", _e);
        CommandError::Parse
    })?;

    if batch.overflow {
        return Err(CommandError::TooManyEntries);
    }

    Ok(batch)
}

fn log_command(command: &Command) {
    match *command {
        Command::Pwm { channel, value } => info!("pwm {}={}", channel, value),
        Command::Led { channel, on: true } => info!("led {} on", channel),
        Command::Led { channel, on: false } => info!("led {} off", channel),
    }
}

/// Parse `json` and apply it to the driver, then latch the outputs
pub fn handle<BUS: embedded_hal::i2c::I2c>(
    driver: &mut Sn3218<BUS, Blocking>,
    json: &str,
) -> Result<CommandSummary, CommandError> {
    let batch = parse(json)?;
    let mut summary = CommandSummary::default();

    for command in batch.commands() {
        log_command(command);

        let result = match *command {
            Command::Pwm { channel, value } => driver.set_pwm(channel, value),
            Command::Led { channel, on: true } => driver.led_on(channel),
            Command::Led { channel, on: false } => driver.led_off(channel),
        };
        summary.record(result)?;
    }

    driver.update()?;

    Ok(summary)
}

pub async fn handle_async<BUS: embedded_hal_async::i2c::I2c>(
    driver: &mut Sn3218<BUS, Async>,
    json: &str,
) -> Result<CommandSummary, CommandError> {
    let batch = parse(json)?;
    let mut summary = CommandSummary::default();

    for command in batch.commands() {
        log_command(command);

        let result = match *command {
            Command::Pwm { channel, value } => driver.set_pwm(channel, value).await,
            Command::Led { channel, on: true } => driver.led_on(channel).await,
            Command::Led { channel, on: false } => driver.led_off(channel).await,
        };
        summary.record(result)?;
    }

    driver.update().await?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ALTERNATE_ADDRESS;
    use crate::test_utils::*;

    use core::fmt::Write;

    #[test]
    fn parse_key_test() {
        assert_eq!(
            Command::parse("pwm12", 7),
            Some(Command::Pwm { channel: 12, value: 7 })
        );
        assert_eq!(
            Command::parse("led0", 3),
            Some(Command::Led { channel: 0, on: true })
        );
        assert_eq!(
            Command::parse("led17", 0),
            Some(Command::Led { channel: 17, on: false })
        );
        assert_eq!(
            Command::parse("pwm5abc", 1),
            Some(Command::Pwm { channel: 5, value: 1 })
        );
        assert_eq!(
            Command::parse("led999999999999", 1),
            Some(Command::Led { channel: u8::MAX, on: true })
        );
        assert_eq!(Command::parse("led", 1), None);
        assert_eq!(Command::parse("ledx", 1), None);
        assert_eq!(Command::parse("brightness", 1), None);
    }

    #[test]
    fn pwm_value_range_test() {
        assert_eq!(
            Command::parse("pwm1", 255),
            Some(Command::Pwm { channel: 1, value: 255 })
        );
        assert_eq!(
            Command::parse("pwm1", 256),
            Some(Command::Pwm { channel: 1, value: 0 })
        );
        assert_eq!(
            Command::parse("pwm1", -1),
            Some(Command::Pwm { channel: 1, value: 0 })
        );
    }

    #[test]
    fn parse_test() {
        let batch = parse(r#"{"pwm2":64,"name":"desk","led2":1,"led4":0}"#).unwrap();

        assert_eq!(
            batch.commands(),
            [
                Command::Pwm { channel: 2, value: 64 },
                Command::Led { channel: 2, on: true },
                Command::Led { channel: 4, on: false },
            ]
        );
    }

    #[test]
    fn parse_error_test() {
        assert_eq!(parse(r#"{"pwm0":"#), Err(CommandError::Parse));
        assert_eq!(parse(r#"[1,2]"#), Err(CommandError::Parse));
        assert_eq!(parse(r#"{"pwm0":"high"}"#), Err(CommandError::Parse));
        // Values are integers only, quoted numbers and booleans included
        assert_eq!(parse(r#"{"pwm0":"128"}"#), Err(CommandError::Parse));
        assert_eq!(parse(r#"{"led0":true}"#), Err(CommandError::Parse));
    }

    #[test]
    fn too_many_entries_test() {
        let mut json: heapless::String<512> = heapless::String::new();
        json.push('{').unwrap();
        for channel in 0..=MAX_COMMANDS {
            if channel > 0 {
                json.push(',').unwrap();
            }
            write!(json, "\"pwm{}\":1", channel).unwrap();
        }
        json.push('}').unwrap();

        assert_eq!(parse(&json), Err(CommandError::TooManyEntries));
    }

    #[test]
    fn handle_test() {
        let mut bus = FakeI2cBus::<8>::new();

        let mut sn3218 = Sn3218::new_blocking(&mut bus, ALTERNATE_ADDRESS);
        let summary = handle(&mut sn3218, r#"{"pwm0":128,"led0":1}"#).unwrap();

        assert_eq!(summary, CommandSummary { applied: 2, skipped: 0 });
        assert!(sn3218.led_state(0));

        assert_eq!(
            bus.write_data().as_slice(),
            [0x01, 0x80, 0x13, 0x01, 0x00, 0x00, 0x16, 0x00]
        );
    }

    #[test]
    fn handle_skips_invalid_channels_test() {
        let mut bus = FakeI2cBus::<8>::new();

        let mut sn3218 = Sn3218::new_blocking(&mut bus, ALTERNATE_ADDRESS);
        let summary = handle(
            &mut sn3218,
            r#"{"pwm3":300,"led3":0,"pwm40":5,"led18":1,"mode":"auto"}"#,
        )
        .unwrap();

        assert_eq!(summary, CommandSummary { applied: 2, skipped: 2 });
        assert_eq!(sn3218.led_mask(), 0);

        assert_eq!(
            bus.write_data().as_slice(),
            [0x04, 0x00, 0x13, 0x00, 0x00, 0x00, 0x16, 0x00]
        );
    }

    #[test]
    fn handle_parse_error_test() {
        let mut bus = FakeI2cBus::<8>::new();

        let mut sn3218 = Sn3218::new_blocking(&mut bus, ALTERNATE_ADDRESS);
        assert_eq!(
            handle(&mut sn3218, "not json"),
            Err(CommandError::Parse)
        );

        assert_eq!(bus.attempts, 0);
    }

    #[test]
    fn handle_bus_error_test() {
        let mut bus = FakeI2cBus::<8>::new();
        bus.fail_all = true;

        let mut sn3218 = Sn3218::new_blocking(&mut bus, ALTERNATE_ADDRESS);
        let result = handle(&mut sn3218, r#"{"led1":1,"led2":1}"#);

        assert!(matches!(
            result,
            Err(CommandError::Driver(Sn3218Error::Bus(_)))
        ));
        assert_eq!(bus.attempts, 1);
    }

    #[test]
    fn handle_async_test() {
        let mut bus = FakeI2cBus::<8>::new();

        embassy_futures::block_on(async {
            let mut sn3218 = Sn3218::new_async(&mut bus, ALTERNATE_ADDRESS);
            let summary = handle_async(&mut sn3218, r#"{"led17":1,"pwm17":255}"#)
                .await
                .unwrap();
            assert_eq!(summary, CommandSummary { applied: 2, skipped: 0 });
        });

        // Channel 17 sits above the encoded control bits
        assert_eq!(
            bus.write_data().as_slice(),
            [0x13, 0x00, 0x00, 0x00, 0x12, 0xff, 0x16, 0x00]
        );
    }
}
