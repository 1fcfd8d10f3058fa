use crate::config::*;

/// On/off mirror of the LED control registers. The chip cannot be read back,
/// so this is the only record of what was last requested.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub leds: u32,
}

impl State {
    pub fn is_on(&self, channel: u8) -> bool {
        channel <= CHANNEL_LAST && self.leds & (1 << channel) != 0
    }

    /// Applies `(leds & and_mask) | or_mask`, keeping only the channel bits
    pub fn apply(&mut self, and_mask: u32, or_mask: u32) {
        self.leds = ((self.leds & and_mask) | or_mask) & CHANNEL_MASK;
    }

    pub fn clear(&mut self) {
        self.leds = 0;
    }

    pub fn control_registers(&self) -> [u8; LED_CONTROL_REGISTER_COUNT] {
        encode_led_control(self.leds)
    }
}

/// Packs an on/off mask into the three LED control register values.
pub fn encode_led_control(leds: u32) -> [u8; LED_CONTROL_REGISTER_COUNT] {
    let mut registers = [0; LED_CONTROL_REGISTER_COUNT];

    for (index, register) in registers.iter_mut().enumerate() {
        let shift = LED_CONTROL_SHIFT * index as u32;
        *register = ((leds >> shift) & LED_CONTROL_REGISTER_MASK) as u8;
    }

    registers
}
