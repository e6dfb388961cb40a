//! Bit-banged one-wire bus master (standard speed).
//!
//! The data line needs a pull-up (4.7 kOhm is typical) and a pin configured
//! open-drain, so that driving it high releases the line and reading it
//! returns the actual bus level.
//!
//! Time slots run inside a critical section: a read sample has to land
//! within 15 µs of the slot start.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::SensorError;

/// 64-bit ROM code: family byte, 48-bit serial, CRC byte.
pub type RomCode = [u8; 8];

pub const CMD_SEARCH_ROM: u8 = 0xF0;
pub const CMD_MATCH_ROM: u8 = 0x55;
pub const CMD_SKIP_ROM: u8 = 0xCC;

// Slot timings in microseconds
const RESET_LOW_US: u32 = 480;
const PRESENCE_SAMPLE_US: u32 = 70;
const RESET_RECOVERY_US: u32 = 410;
const WRITE_ONE_LOW_US: u32 = 6;
const WRITE_ONE_RELEASE_US: u32 = 64;
const WRITE_ZERO_LOW_US: u32 = 60;
const WRITE_ZERO_RELEASE_US: u32 = 10;
const READ_LOW_US: u32 = 6;
const READ_SAMPLE_US: u32 = 9;
const READ_RECOVERY_US: u32 = 55;

pub struct OneWire<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> OneWire<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    /// Reset pulse. Returns whether any device answered with a presence pulse.
    pub fn reset(&mut self) -> Result<bool, SensorError> {
        self.release()?;
        if !self.sample()? {
            // Line held low: shorted or missing pull-up
            return Err(SensorError::Bus);
        }

        self.drive_low()?;
        self.delay.delay_us(RESET_LOW_US);
        let present = critical_section::with(|_| {
            self.release()?;
            self.delay.delay_us(PRESENCE_SAMPLE_US);
            self.sample().map(|level| !level)
        })?;
        self.delay.delay_us(RESET_RECOVERY_US);

        Ok(present)
    }

    pub fn write_bit(&mut self, bit: bool) -> Result<(), SensorError> {
        let (low, release) = if bit {
            (WRITE_ONE_LOW_US, WRITE_ONE_RELEASE_US)
        } else {
            (WRITE_ZERO_LOW_US, WRITE_ZERO_RELEASE_US)
        };
        critical_section::with(|_| {
            self.drive_low()?;
            self.delay.delay_us(low);
            self.release()?;
            self.delay.delay_us(release);
            Ok(())
        })
    }

    pub fn read_bit(&mut self) -> Result<bool, SensorError> {
        let bit = critical_section::with(|_| {
            self.drive_low()?;
            self.delay.delay_us(READ_LOW_US);
            self.release()?;
            self.delay.delay_us(READ_SAMPLE_US);
            self.sample()
        })?;
        self.delay.delay_us(READ_RECOVERY_US);
        Ok(bit)
    }

    /// LSB first
    pub fn write_byte(&mut self, byte: u8) -> Result<(), SensorError> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8, SensorError> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), SensorError> {
        for b in buf.iter_mut() {
            *b = self.read_byte()?;
        }
        Ok(())
    }

    /// Address a single device for the next function command.
    pub fn select(&mut self, rom: &RomCode) -> Result<(), SensorError> {
        self.write_byte(CMD_MATCH_ROM)?;
        for &b in rom {
            self.write_byte(b)?;
        }
        Ok(())
    }

    /// Search ROM, always taking the 0 branch at a discrepancy. That yields
    /// the first device in search order. `Ok(None)` when the bus is empty.
    pub fn search_first(&mut self) -> Result<Option<RomCode>, SensorError> {
        if !self.reset()? {
            return Ok(None);
        }
        self.write_byte(CMD_SEARCH_ROM)?;

        let mut rom: RomCode = [0; 8];
        for index in 0..64 {
            let id_bit = self.read_bit()?;
            let complement = self.read_bit()?;

            let direction = match (id_bit, complement) {
                (true, true) => return Ok(None),
                (false, false) => false,
                (bit, _) => bit,
            };

            if direction {
                rom[index / 8] |= 1 << (index % 8);
            }
            self.write_bit(direction)?;
        }

        if crc8(&rom[..7]) != rom[7] {
            return Err(SensorError::Crc);
        }
        Ok(Some(rom))
    }

    pub fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn drive_low(&mut self) -> Result<(), SensorError> {
        self.pin.set_low().map_err(|_| SensorError::Bus)
    }

    fn release(&mut self) -> Result<(), SensorError> {
        self.pin.set_high().map_err(|_| SensorError::Bus)
    }

    fn sample(&mut self) -> Result<bool, SensorError> {
        self.pin.is_high().map_err(|_| SensorError::Bus)
    }
}

/// Dallas/Maxim CRC-8 (x^8 + x^5 + x^4 + 1, reflected).
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}
