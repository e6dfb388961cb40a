//! Hardware-independent core of the Dodecahedron logger
//!
//! Holds everything that does not touch an esp peripheral directly: the
//! serial command protocol, the reading model and its wire format, the status
//! indicator colors, the one-wire / DS18B20 driver (generic over
//! `embedded-hal`), and the [`logic::DataLogger`] that sequences them.
//!
//! It is `#![no_std]` so it builds for the ESP32-S3 and for the host, where
//! the tests run.

#![cfg_attr(not(test), no_std)]

pub mod command;
pub mod config;
pub mod ds18b20;
pub mod error;
pub mod indicator;
pub mod logic;
pub mod model;
pub mod onewire;
pub mod traits;

pub use command::{Command, CommandReader};
pub use config::Config;
pub use error::{IndicatorError, LoggerError, SensorError, SerialError};
pub use indicator::IndicatorState;
pub use logic::{DataLogger, Hardware};
pub use model::Reading;
