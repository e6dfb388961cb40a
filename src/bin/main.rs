#![no_std]
#![no_main]

use dodeca_core::{
    Config, DataLogger, Hardware, IndicatorState, ds18b20::Ds18b20, onewire::OneWire,
    traits::StatusIndicator,
};
use embassy_executor::Spawner;
use embassy_futures::yield_now;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::{delay::Delay, rmt::Rmt, time::Rate, timer::timg::TimerGroup};
use esp_hal_smartled::{SmartLedsAdapter, smart_led_buffer};
use log::{error, info, warn};

use dodeca_logger::hardware::{self, Bme280Hardware, EspClock, StatusPixel, UartPort};

const HEART_BEAT_INTERVAL_MS: u64 = 5_000;

// Wiring (ESP32-S3-DevKitC-1)
// BME280   - I2C0, GPIO8 (SDA), GPIO9 (SCL)
// DS18B20  - GPIO5, 4.7k pull-up to 3V3
// Host     - UART1, GPIO18 (RX), GPIO17 (TX)
// NeoPixel - GPIO48 via RMT

esp_bootloader_esp_idf::esp_app_desc!();

#[embassy_executor::task]
async fn run_heartbeat() {
    loop {
        info!("[HEARTBEAT] System is alive");
        Timer::after(Duration::from_millis(HEART_BEAT_INTERVAL_MS)).await;
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    info!("=== Dodecahedron logger ===");

    // Initialize RTOS timer for embassy
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    if let Err(e) = spawner.spawn(run_heartbeat()) {
        error!("Failed to spawn heartbeat: {:?}", e);
    }

    let config = Config::default();

    // Blue before the serial link is opened
    let rmt = Rmt::new(peripherals.RMT, Rate::from_mhz(80)).expect("RMT init failed");
    let mut rmt_buffer = smart_led_buffer!(1);
    let mut indicator = StatusPixel::new(SmartLedsAdapter::new(
        rmt.channel0,
        peripherals.GPIO48,
        &mut rmt_buffer,
    ));
    if let Err(e) = indicator.show(IndicatorState::Initializing.color(&config.indicator)) {
        warn!("Status pixel: {}", e);
    }

    let serial = UartPort::new(
        peripherals.UART1,
        peripherals.GPIO18,
        peripherals.GPIO17,
        config.serial.baud_rate,
    )
    .expect("UART1 config rejected");

    let probe = Ds18b20::new(
        OneWire::new(hardware::one_wire_pin(peripherals.GPIO5), Delay::new()),
        config.probe,
    );

    let environment = Bme280Hardware::new(
        peripherals.I2C0,
        peripherals.GPIO8,
        peripherals.GPIO9,
        config.environment.i2c_address,
    )
    .expect("I2C0 config rejected");

    let mut logger = DataLogger::new(
        config,
        Hardware {
            probe,
            environment,
            indicator,
            serial,
            clock: EspClock,
            delay: Delay::new(),
        },
    );

    if let Err(e) = logger.setup() {
        error!("Setup failed: {}", e);
        loop {
            Timer::after(Duration::from_secs(1)).await;
        }
    }

    loop {
        if let Err(e) = logger.poll() {
            warn!("Command failed: {}", e);
        }
        yield_now().await;
    }
}
