//! Error types shared by the drivers and the logger.

use thiserror::Error;

/// Failure of a single sensor operation. Never sent over the serial link:
/// the logger turns it into a NaN reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("sensor did not respond")]
    NotFound,
    #[error("no completed conversion to read")]
    NotConverted,
    #[error("CRC mismatch")]
    Crc,
    #[error("bus I/O error")]
    Bus,
    #[error("timed out")]
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SerialError {
    #[error("serial read failed")]
    Read,
    #[error("serial write failed")]
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("failed to write status pixel")]
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoggerError {
    #[error("environment sensor not found after {attempts} attempts")]
    SensorInit { attempts: u32 },
    #[error(transparent)]
    Serial(#[from] SerialError),
    #[error("response line does not fit the output buffer")]
    LineOverflow,
}
