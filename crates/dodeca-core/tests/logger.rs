use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use dodeca_core::config::{Config, EnvironmentConfig};
use dodeca_core::logic::SENSOR_MISSING_MESSAGE;
use dodeca_core::traits::{Clock, EnvironmentSensor, ProbeThermometer, SerialPort, StatusIndicator};
use dodeca_core::{
    Command, DataLogger, Hardware, IndicatorError, IndicatorState, LoggerError, SensorError,
    SerialError,
};
use embedded_hal::delay::DelayNs;
use smart_leds::RGB8;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Led(RGB8),
    ProbeBegin,
    ProbeConvert,
    ProbeRead,
    EnvInit,
    EnvTemperature,
    EnvHumidity,
    EnvPressure,
    Write(String),
    DelayMs(u32),
}

type Log = Rc<RefCell<Vec<Event>>>;

struct MockProbe {
    log: Log,
    value: Result<f32, SensorError>,
}

impl ProbeThermometer for MockProbe {
    fn begin(&mut self) {
        self.log.borrow_mut().push(Event::ProbeBegin);
    }

    fn request_conversion(&mut self) -> Result<(), SensorError> {
        self.log.borrow_mut().push(Event::ProbeConvert);
        self.value.map(|_| ())
    }

    fn read_first_celsius(&mut self) -> Result<f32, SensorError> {
        self.log.borrow_mut().push(Event::ProbeRead);
        self.value
    }
}

struct MockEnvironment {
    log: Log,
    init_failures: u32,
    /// Values handed out in order: temperature, humidity, pressure, repeat.
    values: VecDeque<Result<f32, SensorError>>,
}

impl MockEnvironment {
    fn next(&mut self, event: Event) -> Result<f32, SensorError> {
        self.log.borrow_mut().push(event);
        self.values.pop_front().unwrap_or(Ok(0.0))
    }
}

impl EnvironmentSensor for MockEnvironment {
    fn init(&mut self) -> Result<(), SensorError> {
        self.log.borrow_mut().push(Event::EnvInit);
        if self.init_failures > 0 {
            self.init_failures -= 1;
            Err(SensorError::NotFound)
        } else {
            Ok(())
        }
    }

    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        self.next(Event::EnvTemperature)
    }

    fn read_humidity(&mut self) -> Result<f32, SensorError> {
        self.next(Event::EnvHumidity)
    }

    fn read_pressure(&mut self) -> Result<f32, SensorError> {
        self.next(Event::EnvPressure)
    }
}

struct MockIndicator {
    log: Log,
    fail: bool,
}

impl StatusIndicator for MockIndicator {
    fn show(&mut self, color: RGB8) -> Result<(), IndicatorError> {
        self.log.borrow_mut().push(Event::Led(color));
        if self.fail { Err(IndicatorError::Write) } else { Ok(()) }
    }
}

struct MockSerial {
    log: Log,
    rx: Rc<RefCell<VecDeque<u8>>>,
    pending: String,
    fail_writes: bool,
}

impl SerialPort for MockSerial {
    fn read_byte(&mut self) -> Result<Option<u8>, SerialError> {
        Ok(self.rx.borrow_mut().pop_front())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        if self.fail_writes {
            return Err(SerialError::Write);
        }
        // Log whole lines so the event order is easy to assert on
        self.pending.push_str(std::str::from_utf8(bytes).unwrap());
        while let Some(end) = self.pending.find("\r\n") {
            let line = self.pending[..end].to_string();
            self.pending.drain(..end + 2);
            self.log.borrow_mut().push(Event::Write(line));
        }
        Ok(())
    }
}

struct MockClock {
    now: Cell<u64>,
    step: u64,
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

struct MockDelay {
    log: Log,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(Event::DelayMs(ms));
    }
}

type TestLogger =
    DataLogger<MockProbe, MockEnvironment, MockIndicator, MockSerial, MockClock, MockDelay>;

struct Bench {
    log: Log,
    config: Config,
    probe: Result<f32, SensorError>,
    init_failures: u32,
    env_values: Vec<Result<f32, SensorError>>,
    fail_writes: bool,
    fail_indicator: bool,
}

impl Bench {
    fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            config: Config::default(),
            probe: Ok(21.3),
            init_failures: 0,
            env_values: Vec::new(),
            fail_writes: false,
            fail_indicator: false,
        }
    }

    fn build(self) -> Rig {
        let log = self.log;
        let rx = Rc::new(RefCell::new(VecDeque::new()));
        let hw = Hardware {
            probe: MockProbe {
                log: log.clone(),
                value: self.probe,
            },
            environment: MockEnvironment {
                log: log.clone(),
                init_failures: self.init_failures,
                values: self.env_values.into(),
            },
            indicator: MockIndicator {
                log: log.clone(),
                fail: self.fail_indicator,
            },
            serial: MockSerial {
                log: log.clone(),
                rx: rx.clone(),
                pending: String::new(),
                fail_writes: self.fail_writes,
            },
            clock: MockClock {
                now: Cell::new(123_456),
                step: 1_000,
            },
            delay: MockDelay { log: log.clone() },
        };
        Rig {
            logger: DataLogger::new(self.config, hw),
            log,
            rx,
        }
    }
}

struct Rig {
    logger: TestLogger,
    log: Log,
    rx: Rc<RefCell<VecDeque<u8>>>,
}

impl Rig {
    fn send(&self, bytes: &[u8]) {
        self.rx.borrow_mut().extend(bytes.iter().copied());
    }

    fn writes(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Write(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, event: &Event) -> usize {
        self.log.borrow().iter().filter(|e| *e == event).count()
    }

    fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    /// Run setup and forget everything it logged.
    fn ready(mut self) -> Self {
        self.logger.setup().unwrap();
        self.log.borrow_mut().clear();
        self
    }
}

/// Logger that has completed setup, with the warm-up reads already served.
fn ready_rig(env_values: &[f32]) -> Rig {
    let mut bench = Bench::new();
    bench.env_values = [-1.0, -1.0, -1.0]
        .iter()
        .chain(env_values)
        .map(|&v| Ok(v))
        .collect();
    bench.build().ready()
}

const BLUE: RGB8 = RGB8 { r: 0, g: 0, b: 8 };
const DIM_GREEN: RGB8 = RGB8 { r: 0, g: 3, b: 0 };
const BRIGHT_GREEN: RGB8 = RGB8 { r: 0, g: 8, b: 0 };

#[test]
fn setup_sequence() {
    let mut rig = Bench::new().build();
    assert_eq!(rig.logger.indicator_state(), IndicatorState::Initializing);

    rig.logger.setup().unwrap();

    assert_eq!(
        rig.events(),
        vec![
            Event::Led(BLUE),
            Event::ProbeBegin,
            Event::EnvInit,
            Event::EnvTemperature,
            Event::EnvHumidity,
            Event::EnvPressure,
            Event::Led(DIM_GREEN),
        ]
    );
    assert_eq!(rig.logger.indicator_state(), IndicatorState::Idle);
    assert!(rig.writes().is_empty());
}

#[test]
fn init_retries_once_per_second_until_sensor_answers() {
    let mut bench = Bench::new();
    bench.init_failures = 3;
    let mut rig = bench.build();

    rig.logger.setup().unwrap();

    assert_eq!(rig.count(&Event::EnvInit), 4);
    assert_eq!(rig.count(&Event::DelayMs(1_000)), 3);
    assert_eq!(rig.writes(), vec![SENSOR_MISSING_MESSAGE; 3]);

    // Message, then delay, then the next attempt
    let events = rig.events();
    let first = events.iter().position(|e| *e == Event::EnvInit).unwrap();
    assert_eq!(events[first + 1], Event::Write(SENSOR_MISSING_MESSAGE.to_string()));
    assert_eq!(events[first + 2], Event::DelayMs(1_000));
    assert_eq!(events[first + 3], Event::EnvInit);

    // Stays blue until the sensor answers
    let green = events.iter().position(|e| *e == Event::Led(DIM_GREEN)).unwrap();
    let last_init = events.iter().rposition(|e| *e == Event::EnvInit).unwrap();
    assert!(green > last_init);
    assert_eq!(rig.count(&Event::Led(BLUE)), 1);
}

#[test]
fn bounded_retry_gives_up() {
    let mut bench = Bench::new();
    bench.init_failures = 10;
    bench.config.environment = EnvironmentConfig {
        init_retry_limit: Some(2),
        ..EnvironmentConfig::default()
    };
    let mut rig = bench.build();

    assert_eq!(rig.logger.setup(), Err(LoggerError::SensorInit { attempts: 2 }));
    assert_eq!(rig.count(&Event::EnvInit), 2);
    assert_eq!(rig.count(&Event::DelayMs(1_000)), 1);
    assert_eq!(rig.logger.indicator_state(), IndicatorState::Initializing);
}

#[test]
fn init_keeps_retrying_when_serial_is_down() {
    let mut bench = Bench::new();
    bench.init_failures = 2;
    bench.fail_writes = true;
    let mut rig = bench.build();

    rig.logger.setup().unwrap();
    assert_eq!(rig.count(&Event::EnvInit), 3);
    assert_eq!(rig.logger.indicator_state(), IndicatorState::Idle);
}

#[test]
fn warm_up_values_never_reach_a_response() {
    let mut rig = ready_rig(&[21.5, 45.2, 101_325.0]);
    rig.send(b"?\n");

    assert_eq!(rig.logger.poll(), Ok(Some(Command::ReadSensors)));
    assert_eq!(rig.writes(), vec!["123456\t21.3\t21.5\t45.2\t101325"]);
}

#[test]
fn identify_replies_without_touching_sensors() {
    let mut rig = ready_rig(&[]);
    rig.send(b"id?\n");

    assert_eq!(rig.logger.poll(), Ok(Some(Command::Identify)));
    assert_eq!(
        rig.events(),
        vec![
            Event::Led(BRIGHT_GREEN),
            Event::Write("Arduino, Dodecahedron logger".to_string()),
            Event::Led(DIM_GREEN),
        ]
    );
}

#[test]
fn any_other_line_samples_every_sensor_once_in_order() {
    let requests: [&[u8]; 6] = [b"?\n", b"\n", b"  \n", b"ID?\n", b"id?x\n", b"\xff\x00\x80\n"];
    for request in requests {
        let mut rig = ready_rig(&[21.5, 45.2, 101_325.0]);
        rig.send(request);

        assert_eq!(rig.logger.poll(), Ok(Some(Command::ReadSensors)), "{:?}", request);
        assert_eq!(
            rig.events(),
            vec![
                Event::Led(BRIGHT_GREEN),
                Event::ProbeConvert,
                Event::ProbeRead,
                Event::EnvTemperature,
                Event::EnvHumidity,
                Event::EnvPressure,
                Event::Write("123456\t21.3\t21.5\t45.2\t101325".to_string()),
                Event::Led(DIM_GREEN),
            ],
            "{:?}",
            request
        );
    }
}

#[test]
fn crlf_terminated_identify() {
    let mut rig = ready_rig(&[]);
    rig.send(b"id?\r\n");

    assert_eq!(rig.logger.poll(), Ok(Some(Command::Identify)));
    assert_eq!(rig.writes(), vec!["Arduino, Dodecahedron logger"]);
}

#[test]
fn nothing_happens_without_a_complete_line() {
    let mut rig = ready_rig(&[]);
    assert_eq!(rig.logger.poll(), Ok(None));

    rig.send(b"id");
    assert_eq!(rig.logger.poll(), Ok(None));
    assert!(rig.events().is_empty());
    assert_eq!(rig.logger.indicator_state(), IndicatorState::Idle);

    rig.send(b"?\n");
    assert_eq!(rig.logger.poll(), Ok(Some(Command::Identify)));
}

#[test]
fn one_command_per_poll() {
    let mut rig = ready_rig(&[]);
    rig.send(b"id?\nid?\n");

    assert_eq!(rig.logger.poll(), Ok(Some(Command::Identify)));
    assert_eq!(rig.writes().len(), 1);
    assert_eq!(rig.logger.poll(), Ok(Some(Command::Identify)));
    assert_eq!(rig.writes().len(), 2);
    assert_eq!(rig.logger.poll(), Ok(None));
}

#[test]
fn missing_probe_is_reported_as_nan() {
    let mut bench = Bench::new();
    bench.probe = Err(SensorError::NotFound);
    bench.env_values = [-1.0, -1.0, -1.0, 21.5, 45.2, 101_325.0]
        .into_iter()
        .map(Ok)
        .collect();
    let mut rig = bench.build().ready();

    rig.send(b"?\n");
    rig.logger.poll().unwrap();

    let line = &rig.writes()[0];
    let fields: Vec<&str> = line.split('\t').collect();
    assert_eq!(fields.len(), 5);
    assert_eq!(fields[1], "nan");
    assert!(rig.logger.reading().probe_temperature.is_nan());
}

#[test]
fn failed_environment_reads_pass_through_as_nan() {
    let mut bench = Bench::new();
    bench.env_values = vec![
        Ok(-1.0),
        Ok(-1.0),
        Ok(-1.0),
        Ok(21.5),
        Err(SensorError::Bus),
        Ok(101_325.0),
    ];
    let mut rig = bench.build().ready();

    rig.send(b"?\n");
    rig.logger.poll().unwrap();

    assert_eq!(rig.writes(), vec!["123456\t21.3\t21.5\tnan\t101325"]);
    assert_eq!(rig.count(&Event::EnvPressure), 1);
}

#[test]
fn timestamps_do_not_decrease() {
    let mut rig = ready_rig(&[]);
    for _ in 0..3 {
        rig.send(b"?\n");
        rig.logger.poll().unwrap();
    }

    let stamps: Vec<u64> = rig
        .writes()
        .iter()
        .map(|line| line.split('\t').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(stamps.len(), 3);
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn reading_is_kept_after_response() {
    let mut rig = ready_rig(&[21.5, 45.2, 101_325.0]);
    rig.send(b"?\n");
    rig.logger.poll().unwrap();

    let reading = rig.logger.reading();
    assert_eq!(reading.timestamp_ms, 123_456);
    assert_eq!(reading.probe_temperature, 21.3);
    assert_eq!(reading.env_temperature, 21.5);
    assert_eq!(reading.env_humidity, 45.2);
    assert_eq!(reading.env_pressure, 101_325.0);
}

#[test]
fn serial_failure_is_returned_and_indicator_returns_to_idle() {
    let mut bench = Bench::new();
    bench.fail_writes = true;
    let mut rig = bench.build().ready();

    rig.send(b"id?\n");
    assert_eq!(rig.logger.poll(), Err(LoggerError::Serial(SerialError::Write)));
    assert_eq!(rig.logger.indicator_state(), IndicatorState::Idle);
    assert_eq!(rig.events().last(), Some(&Event::Led(DIM_GREEN)));
}

#[test]
fn broken_indicator_does_not_stop_logging() {
    let mut bench = Bench::new();
    bench.fail_indicator = true;
    let mut rig = bench.build().ready();

    rig.send(b"id?\n");
    assert_eq!(rig.logger.poll(), Ok(Some(Command::Identify)));
    assert_eq!(rig.writes(), vec!["Arduino, Dodecahedron logger"]);
}
