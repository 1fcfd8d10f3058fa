pub const SHUTDOWN_REGISTER: u8 = 0x00;
pub const PWM_REGISTER_BASE: u8 = 0x01;
pub const LED_CONTROL1_REGISTER: u8 = 0x13;
pub const LED_CONTROL2_REGISTER: u8 = 0x14;
pub const LED_CONTROL3_REGISTER: u8 = 0x15;
/// The three control registers are written together, starting here
pub const LED_CONTROL_REGISTER_BASE: u8 = LED_CONTROL1_REGISTER;
pub const UPDATE_REGISTER: u8 = 0x16;
pub const RESET_REGISTER: u8 = 0x17;

pub const SHUTDOWN_SOFTWARE_SHUTDOWN: u8 = 0x00;
pub const SHUTDOWN_NORMAL_OPERATION: u8 = 0x01;

/// Any value written to the update or reset register triggers it
pub const TRIGGER_VALUE: u8 = 0x00;

/// Address documented for the chip (0b010_0100)
pub const DEFAULT_ADDRESS: u8 = 0x24;
/// Address the chip actually answers on in bus scans of real boards
pub const ALTERNATE_ADDRESS: u8 = 0x54;

pub const CHANNEL_COUNT: usize = 18;
/// Highest valid channel, 0-based (channel 0 is OUT1)
pub const CHANNEL_LAST: u8 = 17;
pub const CHANNEL_MASK: u32 = (1 << CHANNEL_COUNT) - 1;

pub const LED_CONTROL_REGISTER_COUNT: usize = 3;
pub const LED_CONTROL_REGISTER_MASK: u32 = 0x3f;
/// Stride between the control registers in the mirror word. The first two
/// registers share bit 5.
pub const LED_CONTROL_SHIFT: u32 = 5;
