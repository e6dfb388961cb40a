//! Build-time configuration for the logger.
//!
//! There is no config file on the device; [`Config::default`] carries the
//! values the deployed loggers run with.

/// Reply sent for the `id?` query. The host software matches on this string.
pub const IDENTIFICATION: &str = "Arduino, Dodecahedron logger";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub serial: SerialConfig,
    pub environment: EnvironmentConfig,
    pub probe: ProbeConfig,
    pub indicator: IndicatorConfig,
    pub identification: &'static str,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            environment: EnvironmentConfig::default(),
            probe: ProbeConfig::default(),
            indicator: IndicatorConfig::default(),
            identification: IDENTIFICATION,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self { baud_rate: 9600 }
    }
}

/// BME280 setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// 0x76 (SDO low) or 0x77 (SDO high)
    pub i2c_address: u8,
    pub init_retry_interval_ms: u32,
    /// `None` retries forever.
    pub init_retry_limit: Option<u32>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            i2c_address: 0x76,
            init_retry_interval_ms: 1_000,
            init_retry_limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Worst case for a 12-bit DS18B20 conversion is 750 ms.
    pub conversion_timeout_ms: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            conversion_timeout_ms: 750,
        }
    }
}

/// Brightness levels of the status pixel, 0-255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorConfig {
    pub dim: u8,
    pub bright: u8,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self { dim: 3, bright: 8 }
    }
}
