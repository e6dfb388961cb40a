//! DS18B20 digital thermometer on a one-wire bus.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, info, warn};

use crate::config::ProbeConfig;
use crate::error::SensorError;
use crate::onewire::{CMD_SKIP_ROM, OneWire, RomCode, crc8};
use crate::traits::ProbeThermometer;

const CMD_CONVERT_T: u8 = 0x44;
const CMD_READ_SCRATCHPAD: u8 = 0xBE;

const FAMILY_CODE: u8 = 0x28;
const SCRATCHPAD_LEN: usize = 9;
const CONVERSION_POLL_MS: u32 = 10;

pub struct Ds18b20<P, D> {
    bus: OneWire<P, D>,
    config: ProbeConfig,
    converted: bool,
}

impl<P, D> Ds18b20<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(bus: OneWire<P, D>, config: ProbeConfig) -> Self {
        Self {
            bus,
            config,
            converted: false,
        }
    }

    /// Poll read slots until the probes release the line, which they do
    /// once the conversion has finished.
    fn wait_for_conversion(&mut self) -> Result<(), SensorError> {
        let mut waited = 0;
        loop {
            if self.bus.read_bit()? {
                return Ok(());
            }
            if waited >= self.config.conversion_timeout_ms {
                return Err(SensorError::Timeout);
            }
            self.bus.delay_ms(CONVERSION_POLL_MS);
            waited += CONVERSION_POLL_MS;
        }
    }

    fn read_scratchpad(&mut self, rom: &RomCode) -> Result<[u8; SCRATCHPAD_LEN], SensorError> {
        if !self.bus.reset()? {
            return Err(SensorError::NotFound);
        }
        self.bus.select(rom)?;
        self.bus.write_byte(CMD_READ_SCRATCHPAD)?;

        let mut scratchpad = [0u8; SCRATCHPAD_LEN];
        self.bus.read_bytes(&mut scratchpad)?;

        // An all-zero pad passes the CRC but means nobody answered
        if scratchpad.iter().all(|&b| b == 0) {
            return Err(SensorError::NotFound);
        }
        if crc8(&scratchpad[..SCRATCHPAD_LEN - 1]) != scratchpad[SCRATCHPAD_LEN - 1] {
            return Err(SensorError::Crc);
        }
        Ok(scratchpad)
    }
}

impl<P, D> ProbeThermometer for Ds18b20<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn begin(&mut self) {
        match self.bus.search_first() {
            Ok(Some(rom)) if rom[0] == FAMILY_CODE => info!("DS18B20 found: {:02X?}", rom),
            Ok(Some(rom)) => warn!("First one-wire device is not a DS18B20: {:02X?}", rom),
            Ok(None) => warn!("No DS18B20 on the one-wire bus"),
            Err(e) => warn!("One-wire search failed: {}", e),
        }
    }

    fn request_conversion(&mut self) -> Result<(), SensorError> {
        self.converted = false;
        if !self.bus.reset()? {
            return Err(SensorError::NotFound);
        }
        self.bus.write_byte(CMD_SKIP_ROM)?;
        self.bus.write_byte(CMD_CONVERT_T)?;
        self.wait_for_conversion()?;
        self.converted = true;
        Ok(())
    }

    fn read_first_celsius(&mut self) -> Result<f32, SensorError> {
        if !self.converted {
            return Err(SensorError::NotConverted);
        }
        let rom = self.bus.search_first()?.ok_or(SensorError::NotFound)?;
        let scratchpad = self.read_scratchpad(&rom)?;
        let celsius = raw_to_celsius([scratchpad[0], scratchpad[1]]);
        debug!("DS18B20 {:02X?}: {} C", rom, celsius);
        Ok(celsius)
    }
}

/// Temperature register (LSB, MSB) to Celsius. Two's complement, 1/16 °C.
pub fn raw_to_celsius(bytes: [u8; 2]) -> f32 {
    i16::from_le_bytes(bytes) as f32 / 16.0
}
