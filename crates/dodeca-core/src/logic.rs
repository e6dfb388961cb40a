//! Business logic layer (hardware-independent)
//!
//! [`DataLogger`] owns every peripheral seam and the last reading. The
//! firmware calls [`DataLogger::setup`] once and then [`DataLogger::poll`] in
//! a tight loop; everything runs to completion on the caller's thread.

use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use heapless::String;
use log::{debug, info, warn};

use crate::command::{Command, CommandReader};
use crate::config::Config;
use crate::error::{LoggerError, SensorError};
use crate::indicator::IndicatorState;
use crate::model::Reading;
use crate::traits::{Clock, EnvironmentSensor, ProbeThermometer, SerialPort, StatusIndicator};

/// Written to the serial link on every failed environment sensor init.
pub const SENSOR_MISSING_MESSAGE: &str = "Could not find a valid BME280 sensor, check wiring!";

/// Room for a u64 timestamp and four fully expanded floats.
pub const LINE_CAPACITY: usize = 192;

const LINE_TERMINATOR: &[u8] = b"\r\n";

/// The peripherals the logger drives.
pub struct Hardware<P, E, I, S, C, D> {
    pub probe: P,
    pub environment: E,
    pub indicator: I,
    pub serial: S,
    pub clock: C,
    pub delay: D,
}

pub struct DataLogger<P, E, I, S, C, D> {
    config: Config,
    hw: Hardware<P, E, I, S, C, D>,
    commands: CommandReader,
    reading: Reading,
    indicator_state: IndicatorState,
}

impl<P, E, I, S, C, D> DataLogger<P, E, I, S, C, D>
where
    P: ProbeThermometer,
    E: EnvironmentSensor,
    I: StatusIndicator,
    S: SerialPort,
    C: Clock,
    D: DelayNs,
{
    pub fn new(config: Config, hw: Hardware<P, E, I, S, C, D>) -> Self {
        Self {
            config,
            hw,
            commands: CommandReader::new(),
            reading: Reading::default(),
            indicator_state: IndicatorState::Initializing,
        }
    }

    /// Bring up the sensors. Blocks until the environment sensor answers,
    /// or fails once `init_retry_limit` attempts have been used up.
    pub fn setup(&mut self) -> Result<(), LoggerError> {
        self.set_indicator(IndicatorState::Initializing);
        info!("{} starting", self.config.identification);

        self.hw.probe.begin();

        let env = self.config.environment;
        let mut failures = 0u32;
        while let Err(e) = self.hw.environment.init() {
            failures += 1;
            warn!(
                "BME280 init at 0x{:02X} failed ({}), attempt {}",
                env.i2c_address, e, failures
            );
            if let Err(e) = self.write_line(SENSOR_MISSING_MESSAGE) {
                warn!("Could not report missing sensor: {}", e);
            }
            if env.init_retry_limit.is_some_and(|limit| failures >= limit) {
                return Err(LoggerError::SensorInit { attempts: failures });
            }
            self.hw.delay.delay_ms(env.init_retry_interval_ms);
        }

        // The first humidity reading after init is unreliable; drop a full set.
        let _ = self.hw.environment.read_temperature();
        let _ = self.hw.environment.read_humidity();
        let _ = self.hw.environment.read_pressure();
        debug!("Discarded warm-up readings");

        self.set_indicator(IndicatorState::Idle);
        info!("Ready");
        Ok(())
    }

    /// One pass of the command loop. Returns the command handled, if a
    /// complete one was waiting.
    pub fn poll(&mut self) -> Result<Option<Command>, LoggerError> {
        let Some(command) = self.next_command()? else {
            return Ok(None);
        };
        debug!("Command: {:?}", command);

        self.set_indicator(IndicatorState::Sampling);
        let result = self.execute(command);
        self.set_indicator(IndicatorState::Idle);

        result.map(|()| Some(command))
    }

    /// The reading sent in the last response.
    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    pub fn indicator_state(&self) -> IndicatorState {
        self.indicator_state
    }

    fn next_command(&mut self) -> Result<Option<Command>, LoggerError> {
        while let Some(byte) = self.hw.serial.read_byte()? {
            if let Some(line) = self.commands.push(byte) {
                return Ok(Some(Command::parse(line)));
            }
        }
        Ok(None)
    }

    fn execute(&mut self, command: Command) -> Result<(), LoggerError> {
        match command {
            Command::Identify => self.write_line(self.config.identification),
            Command::ReadSensors => {
                self.reading = self.acquire();

                let mut line: String<LINE_CAPACITY> = String::new();
                write!(line, "{}", self.reading).map_err(|_| LoggerError::LineOverflow)?;
                self.write_line(&line)
            }
        }
    }

    /// Probe first, then BME280 temperature, humidity, pressure.
    fn acquire(&mut self) -> Reading {
        let timestamp_ms = self.hw.clock.now_ms();

        if let Err(e) = self.hw.probe.request_conversion() {
            debug!("DS18B20 conversion failed: {}", e);
        }
        let probe_temperature = or_nan(self.hw.probe.read_first_celsius(), "DS18B20 temperature");

        let env_temperature = or_nan(self.hw.environment.read_temperature(), "BME280 temperature");
        let env_humidity = or_nan(self.hw.environment.read_humidity(), "BME280 humidity");
        let env_pressure = or_nan(self.hw.environment.read_pressure(), "BME280 pressure");

        Reading {
            timestamp_ms,
            probe_temperature,
            env_temperature,
            env_humidity,
            env_pressure,
        }
    }

    fn write_line(&mut self, line: &str) -> Result<(), LoggerError> {
        self.hw.serial.write_all(line.as_bytes())?;
        self.hw.serial.write_all(LINE_TERMINATOR)?;
        Ok(())
    }

    /// The pixel is informational only, so a failed write is just logged.
    fn set_indicator(&mut self, state: IndicatorState) {
        self.indicator_state = state;
        if let Err(e) = self.hw.indicator.show(state.color(&self.config.indicator)) {
            warn!("Status pixel: {}", e);
        }
    }
}

fn or_nan(value: Result<f32, SensorError>, what: &str) -> f32 {
    value.unwrap_or_else(|e| {
        warn!("{} read failed: {}", what, e);
        f32::NAN
    })
}
