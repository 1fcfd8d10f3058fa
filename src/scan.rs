//! I2C bus scan, mainly to find which address the SN3218 answers on.

use crate::config::ALTERNATE_ADDRESS;

use embedded_hal::i2c::{Error, ErrorKind, I2c};
use log::{info, warn};

/// First and last address scanned. 0x00 and 0x78-0x7f are reserved.
pub const SCAN_FIRST_ADDRESS: u8 = 0x01;
pub const SCAN_LAST_ADDRESS: u8 = 0x77;

const SCAN_ADDRESS_COUNT: usize = (SCAN_LAST_ADDRESS - SCAN_FIRST_ADDRESS) as usize + 1;

/// Name of a device commonly found at `address`. Built-in peripherals of the
/// board (0x28, 0x61) have no name and show up as unknown devices.
pub fn known_device(address: u8) -> Option<&'static str> {
    match address {
        0x36 => Some("MAX17043 Fuel Gauge"),
        0x48 => Some("TMP112A temperature sensor or ADS1015 ADC"),
        ALTERNATE_ADDRESS => Some("SN3218 LED Driver"),
        0x69 => Some("AM1805 RTC/Watchdog"),
        0x6b => Some("bq24195 PMIC"),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Addresses that acknowledged, in ascending order
    pub found: heapless::Vec<u8, SCAN_ADDRESS_COUNT>,
    /// Addresses that failed with something other than a NACK
    pub errors: heapless::Vec<u8, SCAN_ADDRESS_COUNT>,
}

impl ScanReport {
    pub fn contains(&self, address: u8) -> bool {
        self.found.contains(&address)
    }

    /// Whether any responding address is a device with a known name
    pub fn found_named(&self) -> bool {
        self.found
            .iter()
            .any(|&address| known_device(address).is_some())
    }

    pub fn found_sn3218(&self) -> bool {
        self.contains(ALTERNATE_ADDRESS)
    }

    fn record<E: Error>(&mut self, address: u8, result: Result<(), E>) {
        match result {
            Ok(()) => {
                match known_device(address) {
                    Some(name) => info!("{} found at address {:#04x}", name, address),
                    None => info!("Unknown I2C device found at address {:#04x}", address),
                }
                // Capacity covers every scanned address
                let _ = self.found.push(address);
            }
            Err(e) => match e.kind() {
                ErrorKind::NoAcknowledge(_) => {}
                kind => {
                    warn!("Unknown error at address {:#04x}: {:?}", address, kind);
                    let _ = self.errors.push(address);
                }
            },
        }
    }
}

/// Address every device with an empty write
pub fn scan<BUS: I2c>(bus: &mut BUS) -> ScanReport {
    info!("Scanning I2C bus...");

    let mut report = ScanReport::default();
    for address in SCAN_FIRST_ADDRESS..=SCAN_LAST_ADDRESS {
        report.record(address, bus.write(address, &[]));
    }

    info!("{} devices found", report.found.len());
    report
}

pub async fn scan_async<BUS: embedded_hal_async::i2c::I2c>(bus: &mut BUS) -> ScanReport {
    info!("Scanning I2C bus...");

    let mut report = ScanReport::default();
    for address in SCAN_FIRST_ADDRESS..=SCAN_LAST_ADDRESS {
        report.record(address, bus.write(address, &[]).await);
    }

    info!("{} devices found", report.found.len());
    report
}
