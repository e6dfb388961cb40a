//! esp-hal bindings for the core traits.

use bme280::{Measurements, i2c::BME280};
use dodeca_core::error::{IndicatorError, SensorError, SerialError};
use dodeca_core::traits::{Clock, EnvironmentSensor, SerialPort, StatusIndicator};
use esp_hal::{
    Blocking,
    delay::Delay,
    gpio::{AnyPin, DriveMode, Flex, OutputConfig, Pull},
    i2c::master::{Config as I2cConfig, ConfigError as I2cConfigError, Error as I2cError, I2c},
    peripherals::{I2C0, UART1},
    time::{Instant, Rate},
    uart::{Config as UartConfig, ConfigError as UartConfigError, Uart},
};
use log::{debug, warn};
use smart_leds::{RGB8, SmartLedsWrite};

const I2C_FREQ_KHZ: u32 = 100;
const BME280_SECONDARY_ADDRESS: u8 = 0x77;

pub struct Bme280Hardware<'a> {
    sensor: BME280<I2c<'a, Blocking>>,
    delay: Delay,
}

impl<'a> Bme280Hardware<'a> {
    pub fn new<SDA, SCL>(
        i2c_periph: I2C0<'a>,
        sda: SDA,
        scl: SCL,
        address: u8,
    ) -> Result<Self, I2cConfigError>
    where
        SDA: Into<AnyPin<'a>>,
        SCL: Into<AnyPin<'a>>,
    {
        let i2c = I2c::new(
            i2c_periph,
            I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQ_KHZ)),
        )?
        .with_sda(sda.into())
        .with_scl(scl.into());

        // The driver only knows the two strap addresses
        let sensor = if address == BME280_SECONDARY_ADDRESS {
            BME280::new_secondary(i2c)
        } else {
            BME280::new_primary(i2c)
        };

        Ok(Self {
            sensor,
            delay: Delay::new(),
        })
    }

    /// One forced-mode measurement; the individual reads pick a field from it.
    fn measure(&mut self) -> Result<Measurements<I2cError>, SensorError> {
        self.sensor.measure(&mut self.delay).map_err(|e| {
            warn!("BME280 measurement failed: {:?}", e);
            SensorError::Bus
        })
    }
}

impl EnvironmentSensor for Bme280Hardware<'_> {
    fn init(&mut self) -> Result<(), SensorError> {
        self.sensor.init(&mut self.delay).map_err(|e| {
            debug!("BME280 init: {:?}", e);
            SensorError::NotFound
        })
    }

    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        Ok(self.measure()?.temperature)
    }

    fn read_humidity(&mut self) -> Result<f32, SensorError> {
        Ok(self.measure()?.humidity)
    }

    fn read_pressure(&mut self) -> Result<f32, SensorError> {
        Ok(self.measure()?.pressure)
    }
}

/// Command link on UART1. UART0 stays with the esp-println console.
pub struct UartPort<'a> {
    uart: Uart<'a, Blocking>,
}

impl<'a> UartPort<'a> {
    pub fn new<RX, TX>(
        uart_periph: UART1<'a>,
        rx: RX,
        tx: TX,
        baud_rate: u32,
    ) -> Result<Self, UartConfigError>
    where
        RX: Into<AnyPin<'a>>,
        TX: Into<AnyPin<'a>>,
    {
        let uart = Uart::new(uart_periph, UartConfig::default().with_baudrate(baud_rate))?
            .with_rx(rx.into())
            .with_tx(tx.into());

        Ok(Self { uart })
    }
}

impl SerialPort for UartPort<'_> {
    fn read_byte(&mut self) -> Result<Option<u8>, SerialError> {
        if !self.uart.read_ready() {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        match self.uart.read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(e) => {
                warn!("UART read: {:?}", e);
                Err(SerialError::Read)
            }
        }
    }

    fn write_all(&mut self, mut bytes: &[u8]) -> Result<(), SerialError> {
        while !bytes.is_empty() {
            let written = self.uart.write(bytes).map_err(|_| SerialError::Write)?;
            bytes = &bytes[written..];
        }
        self.uart.flush().map_err(|_| SerialError::Write)
    }
}

/// Single addressable pixel behind any smart-leds writer.
pub struct StatusPixel<L> {
    led: L,
}

impl<L> StatusPixel<L> {
    pub fn new(led: L) -> Self {
        Self { led }
    }
}

impl<L> StatusIndicator for StatusPixel<L>
where
    L: SmartLedsWrite<Color = RGB8>,
{
    fn show(&mut self, color: RGB8) -> Result<(), IndicatorError> {
        self.led
            .write(core::iter::once(color))
            .map_err(|_| IndicatorError::Write)
    }
}

pub struct EspClock;

impl Clock for EspClock {
    fn now_ms(&self) -> u64 {
        Instant::now().duration_since_epoch().as_millis()
    }
}

/// Open-drain data pin for the one-wire bus, released high.
pub fn one_wire_pin<'a, P>(gpio: P) -> Flex<'a>
where
    P: Into<AnyPin<'a>>,
{
    let mut pin = Flex::new(gpio.into());
    pin.apply_output_config(
        &OutputConfig::default()
            .with_drive_mode(DriveMode::OpenDrain)
            .with_pull(Pull::Up),
    );
    pin.set_high();
    pin.set_output_enable(true);
    pin.set_input_enable(true);
    pin
}
