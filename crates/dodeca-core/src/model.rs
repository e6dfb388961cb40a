// Model of the data read in this app

use core::fmt::{self, Write};

/// One acquisition pass over all sensors. NaN means "no valid reading".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Milliseconds since boot when the pass started
    pub timestamp_ms: u64,
    /// DS18B20, °C
    pub probe_temperature: f32,
    /// BME280, °C
    pub env_temperature: f32,
    /// BME280, % relative humidity
    pub env_humidity: f32,
    /// BME280, Pa
    pub env_pressure: f32,
}

impl Default for Reading {
    fn default() -> Self {
        Self {
            timestamp_ms: 0,
            probe_temperature: f32::NAN,
            env_temperature: f32::NAN,
            env_humidity: f32::NAN,
            env_pressure: f32::NAN,
        }
    }
}

/// Renders the tab-separated response line, without the line terminator.
impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.timestamp_ms)?;
        for (value, decimals) in [
            (self.probe_temperature, 1),
            (self.env_temperature, 1),
            (self.env_humidity, 1),
            (self.env_pressure, 0),
        ] {
            f.write_char('\t')?;
            write_fixed(f, value, decimals)?;
        }
        Ok(())
    }
}

/// Fixed-point float with the spellings the host parser expects for
/// non-finite values.
fn write_fixed(f: &mut fmt::Formatter<'_>, value: f32, decimals: usize) -> fmt::Result {
    if value.is_nan() {
        f.write_str("nan")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "inf" } else { "-inf" })
    } else {
        write!(f, "{:.*}", decimals, value)
    }
}
