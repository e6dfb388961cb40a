#![no_std]
#![no_main]

use dodeca_core::{
    Config, IndicatorState, Reading,
    ds18b20::Ds18b20,
    onewire::OneWire,
    traits::{EnvironmentSensor, ProbeThermometer, StatusIndicator},
};
use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::{delay::Delay, rmt::Rmt, time::Rate, timer::timg::TimerGroup};
use esp_hal_smartled::{SmartLedsAdapter, smart_led_buffer};
use heapless::String;

use dodeca_logger::hardware::{self, Bme280Hardware, StatusPixel};

esp_bootloader_esp_idf::esp_app_desc!();

// Test result tracking
struct TestResults {
    passed: u32,
    failed: u32,
    total: u32,
}

impl TestResults {
    fn new() -> Self {
        Self {
            passed: 0,
            failed: 0,
            total: 0,
        }
    }

    fn assert(&mut self, condition: bool, test_name: &str) {
        self.total += 1;
        if condition {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!("  ✗ {} FAILED", test_name);
        }
    }

    fn assert_eq<T: PartialEq + core::fmt::Debug>(&mut self, left: T, right: T, test_name: &str) {
        self.total += 1;
        if left == right {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!("  ✗ {} FAILED: {:?} != {:?}", test_name, left, right);
        }
    }

    fn assert_range(&mut self, value: f32, min: f32, max: f32, test_name: &str) {
        self.total += 1;
        if value >= min && value <= max {
            self.passed += 1;
            esp_println::println!("  ✓ {} ({:.2})", test_name, value);
        } else {
            self.failed += 1;
            esp_println::println!(
                "  ✗ {} FAILED: {:.2} outside [{:.2}, {:.2}]",
                test_name,
                value,
                min,
                max
            );
        }
    }

    fn print_summary(&self) {
        esp_println::println!("\n==========================================");
        esp_println::println!("Test Summary:");
        esp_println::println!("  Total:  {}", self.total);
        esp_println::println!("  Passed: {}", self.passed);
        esp_println::println!("  Failed: {}", self.failed);
        if self.failed == 0 {
            esp_println::println!("\n✓ ALL TESTS PASSED!");
        } else {
            esp_println::println!("\n✗ SOME TESTS FAILED");
        }
        esp_println::println!("==========================================");
    }
}

fn test_line_format(results: &mut TestResults) {
    use core::fmt::Write;

    esp_println::println!("\n[TEST] Response line format");

    let reading = Reading {
        timestamp_ms: 123_456,
        probe_temperature: 21.3,
        env_temperature: 21.5,
        env_humidity: 45.2,
        env_pressure: 101_325.0,
    };
    let mut line = String::<64>::new();
    let _ = write!(line, "{}", reading);
    results.assert_eq(line.as_str(), "123456\t21.3\t21.5\t45.2\t101325", "documented example");

    let missing = Reading {
        probe_temperature: f32::NAN,
        ..reading
    };
    let mut line = String::<64>::new();
    let _ = write!(line, "{}", missing);
    results.assert(line.contains("\tnan\t"), "missing probe renders nan");
}

fn test_bme280_sensor(results: &mut TestResults, bme280: &mut Bme280Hardware<'_>) {
    esp_println::println!("\n[TEST] BME280 Sensor Tests");

    match bme280.init() {
        Ok(()) => results.assert(true, "BME280 initialization"),
        Err(e) => {
            esp_println::println!("  Failed to initialize BME280: {}", e);
            results.assert(false, "BME280 initialization");
            return;
        }
    }

    // Warm-up set, as the logger does
    let _ = bme280.read_temperature();
    let _ = bme280.read_humidity();
    let _ = bme280.read_pressure();

    esp_println::println!("  Reading 3 samples...");
    for _ in 0..3 {
        match bme280.read_temperature() {
            Ok(t) => results.assert_range(t, -40.0, 85.0, "temperature in sensor range"),
            Err(e) => {
                esp_println::println!("    Temperature read failed: {}", e);
                results.assert(false, "read temperature");
            }
        }
        match bme280.read_humidity() {
            Ok(h) => results.assert_range(h, 0.0, 100.0, "humidity in 0-100 %"),
            Err(_) => results.assert(false, "read humidity"),
        }
        match bme280.read_pressure() {
            Ok(p) => results.assert_range(p, 30_000.0, 110_000.0, "pressure in sensor range"),
            Err(_) => results.assert(false, "read pressure"),
        }
    }
}

fn test_ds18b20_probe<P>(results: &mut TestResults, probe: &mut P)
where
    P: ProbeThermometer,
{
    esp_println::println!("\n[TEST] DS18B20 Probe Tests");

    probe.begin();
    results.assert(probe.request_conversion().is_ok(), "conversion completes");

    match probe.read_first_celsius() {
        Ok(t) => results.assert_range(t, -55.0, 125.0, "probe temperature in range"),
        Err(e) => {
            esp_println::println!("  Failed to read probe: {}", e);
            results.assert(false, "read probe");
        }
    }
}

async fn test_status_pixel<I>(results: &mut TestResults, pixel: &mut I, config: &Config)
where
    I: StatusIndicator,
{
    esp_println::println!("\n[TEST] Status pixel (watch the LED)");

    for state in [
        IndicatorState::Initializing,
        IndicatorState::Idle,
        IndicatorState::Sampling,
        IndicatorState::Idle,
    ] {
        esp_println::println!("  {:?}", state);
        results.assert(pixel.show(state.color(&config.indicator)).is_ok(), "pixel write");
        Timer::after(Duration::from_millis(1_000)).await;
    }
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_println::println!("\n==========================================");
    esp_println::println!("=== Hardware Unit Test Runner ===");
    esp_println::println!("==========================================");

    let config = Config::default();
    let mut results = TestResults::new();

    // Run tests that don't need hardware
    test_line_format(&mut results);

    // Initialize RTOS timer for embassy (this consumes TIMG0)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    match Bme280Hardware::new(
        peripherals.I2C0,
        peripherals.GPIO8,
        peripherals.GPIO9,
        config.environment.i2c_address,
    ) {
        Ok(mut bme280) => test_bme280_sensor(&mut results, &mut bme280),
        Err(e) => {
            esp_println::println!("  I2C config rejected: {:?}", e);
            results.assert(false, "I2C0 configuration");
        }
    }

    let mut probe = Ds18b20::new(
        OneWire::new(hardware::one_wire_pin(peripherals.GPIO5), Delay::new()),
        config.probe,
    );
    test_ds18b20_probe(&mut results, &mut probe);

    match Rmt::new(peripherals.RMT, Rate::from_mhz(80)) {
        Ok(rmt) => {
            let mut rmt_buffer = smart_led_buffer!(1);
            let mut pixel = StatusPixel::new(SmartLedsAdapter::new(
                rmt.channel0,
                peripherals.GPIO48,
                &mut rmt_buffer,
            ));
            test_status_pixel(&mut results, &mut pixel, &config).await;
        }
        Err(e) => {
            esp_println::println!("  RMT config rejected: {:?}", e);
            results.assert(false, "RMT configuration");
        }
    }

    // Print summary
    results.print_summary();

    esp_println::println!("\nTest run complete. Looping...");
    loop {
        Timer::after(Duration::from_millis(1000)).await;
    }
}
