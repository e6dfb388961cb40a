//! Hardware abstraction traits

use smart_leds::RGB8;

use crate::error::{IndicatorError, SensorError, SerialError};

/// Trait for the single-wire temperature probe bus
pub trait ProbeThermometer {
    /// Prepare the bus. Never fails; a missing probe shows up on read.
    fn begin(&mut self);

    /// Start a temperature conversion on every probe and wait for it
    fn request_conversion(&mut self) -> Result<(), SensorError>;

    /// Read the first probe on the bus in Celsius
    fn read_first_celsius(&mut self) -> Result<f32, SensorError>;
}

/// Trait for the I2C temperature/humidity/pressure sensor
pub trait EnvironmentSensor {
    /// Detect and configure the sensor
    fn init(&mut self) -> Result<(), SensorError>;

    /// Read temperature in Celsius
    fn read_temperature(&mut self) -> Result<f32, SensorError>;

    /// Read relative humidity in percent
    fn read_humidity(&mut self) -> Result<f32, SensorError>;

    /// Read pressure in Pascal
    fn read_pressure(&mut self) -> Result<f32, SensorError>;
}

/// Trait for the single RGB status pixel
pub trait StatusIndicator {
    /// Set the color and flush it to the LED
    fn show(&mut self, color: RGB8) -> Result<(), IndicatorError>;
}

/// Trait for the byte-oriented command link
pub trait SerialPort {
    /// Next received byte, or `None` when nothing is pending. Must not block.
    fn read_byte(&mut self) -> Result<Option<u8>, SerialError>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError>;
}

/// Monotonic milliseconds since boot
pub trait Clock {
    fn now_ms(&self) -> u64;
}
