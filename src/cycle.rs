// VitalsWatch: Polling Cycle
//
// Once per period: read the vitals, drop the whole cycle if either is
// missing, otherwise read everything else in a fixed order, assemble one
// Sample and hand it to every sink.  BLE and telemetry share this one clock.

use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::i2c::I2c;

use crate::bus::SharedBus;
use crate::config::MonitorConfig;
use crate::pedometer::PedometerConfigError;
use crate::publish::Sink;
use crate::sample::Sample;
use crate::sensors::{SensorSuite, Sensors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Sampling,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// Vitals were unavailable; nothing else was read or published.
    Skipped,
    Published(Sample),
}

pub struct Monitor<'a, S> {
    sensors: S,
    sinks: Vec<Box<dyn Sink + 'a>>,
    period: Duration,
    state: CycleState,
}

impl<'a, S: SensorSuite> Monitor<'a, S> {
    pub fn new(sensors: S, config: MonitorConfig) -> Self {
        Self {
            sensors,
            sinks: Vec::new(),
            period: config.period,
            state: CycleState::Idle,
        }
    }

    /// Sinks receive samples in the order they were added.
    pub fn add_sink(&mut self, sink: impl Sink + 'a) {
        log::info!("Publishing to {} sink", sink.name());
        self.sinks.push(Box::new(sink));
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    /// One pass Idle -> Sampling -> Idle.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        self.state = CycleState::Sampling;
        let outcome = self.sample_and_publish();
        self.state = CycleState::Idle;
        outcome
    }

    fn sample_and_publish(&mut self) -> CycleOutcome {
        let vitals = self.sensors.read_vitals();
        if !vitals.is_valid() {
            log::warn!(
                "Invalid pulse-ox reading (HR {}, SpO2 {}), check sensor contact",
                vitals.heart_rate,
                vitals.spo2
            );
            return CycleOutcome::Skipped;
        }

        let skin_temperature = self.sensors.read_skin_temperature();
        let motion = self.sensors.read_motion();
        let ambient_temperature = self.sensors.read_ambient_temperature();
        let step_count = self.sensors.read_step_count();

        let sample = Sample {
            heart_rate: vitals.heart_rate,
            spo2: vitals.spo2,
            skin_temperature,
            ambient_temperature,
            accel: motion.accel,
            gyro: motion.gyro,
            step_count,
        };
        log::info!("{}", sample);

        for sink in self.sinks.iter_mut() {
            sink.publish(&sample);
        }
        CycleOutcome::Published(sample)
    }

    /// Run cycles forever at the configured period.
    pub fn run(&mut self) -> ! {
        log::info!("Monitor loop started (period {:?})", self.period);

        loop {
            let tick_start = Instant::now();

            self.run_cycle();

            // Sleep for the remainder of the period; a slow cycle (HTTP) just
            // starts the next one immediately.
            let elapsed = tick_start.elapsed();
            if elapsed < self.period {
                thread::sleep(self.period - elapsed);
            }
        }
    }
}

impl<'a, I2C: I2c> Monitor<'a, Sensors<'a, I2C>> {
    /// Initialise every sensor on `bus` and build the monitor around them.
    ///
    /// A pedometer configuration failure yields no monitor at all, so the
    /// caller has nothing left to sample with and must halt.
    pub fn bring_up(bus: SharedBus<'a, I2C>, config: MonitorConfig) -> Result<Self, PedometerConfigError> {
        let sensors = Sensors::new(bus);
        let report = sensors.init()?;
        log::info!(
            "Sensor check: IMU:{} PulseOx:{} Ambient:{}",
            report.imu,
            report.pulse_ox,
            report.ambient
        );
        Ok(Self::new(sensors, config))
    }
}
