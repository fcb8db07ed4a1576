// VitalsWatch: Sensor Access Layer
//
// Uniform read operations over the three peripherals plus the step counter.
// Reads never fail from the cycle's point of view: a bus error is logged and
// replaced by a degraded value, except for the vitals, where it becomes the
// "unavailable" sentinel and so gates the whole cycle.

use embedded_hal::i2c::I2c;

use crate::bus::SharedBus;
use crate::drivers::ambient::Mcp9808;
use crate::drivers::imu::Lsm6ds3;
use crate::drivers::pulse_ox::PulseOximeter;
use crate::pedometer::{Pedometer, PedometerConfigError};
use crate::sample::{Motion, Vitals};

/// Everything the polling cycle needs to read.
pub trait SensorSuite {
    fn read_vitals(&mut self) -> Vitals;
    fn read_skin_temperature(&mut self) -> f32;
    fn read_motion(&mut self) -> Motion;
    fn read_ambient_temperature(&mut self) -> f32;
    fn read_step_count(&mut self) -> u16;

    /// Heart rate, SpO2 and skin temperature in one call.
    fn read_pulse_ox(&mut self) -> (f32, f32, f32) {
        let vitals = self.read_vitals();
        let skin = self.read_skin_temperature();
        (vitals.heart_rate, vitals.spo2, skin)
    }
}

/// Init outcome of each peripheral, for the boot log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitReport {
    pub imu: bool,
    pub pulse_ox: bool,
    pub ambient: bool,
}

pub struct Sensors<'a, I2C> {
    imu: Lsm6ds3<'a, I2C>,
    pulse_ox: PulseOximeter<'a, I2C>,
    ambient: Mcp9808<'a, I2C>,
    pedometer: Pedometer<'a, I2C>,
}

impl<'a, I2C: I2c> Sensors<'a, I2C> {
    pub fn new(bus: SharedBus<'a, I2C>) -> Self {
        Self {
            imu: Lsm6ds3::new(bus),
            pulse_ox: PulseOximeter::new(bus),
            ambient: Mcp9808::new(bus),
            pedometer: Pedometer::new(bus),
        }
    }

    /// Bring up every peripheral.  IMU, pulse-ox and ambient failures are
    /// logged and tolerated; a pedometer configuration failure is returned
    /// and must stop the firmware.
    pub fn init(&self) -> Result<InitReport, PedometerConfigError> {
        let report = InitReport {
            imu: log_init("LSM6DS3", self.imu.init()),
            pulse_ox: log_init("Pulse oximeter", self.pulse_ox.init()),
            ambient: log_init("MCP9808", self.ambient.init()),
        };

        // Runs after the IMU init so its accelerometer settings win.
        self.pedometer.configure()?;

        Ok(report)
    }

    pub fn pedometer(&self) -> &Pedometer<'a, I2C> {
        &self.pedometer
    }
}

fn log_init(name: &str, result: anyhow::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::error!("{} init failed: {} (continuing)", name, e);
            false
        }
    }
}

impl<I2C: I2c> SensorSuite for Sensors<'_, I2C> {
    fn read_vitals(&mut self) -> Vitals {
        self.pulse_ox.read_vitals().unwrap_or_else(|e| {
            log::warn!("Pulse oximeter read error: {}", e);
            Vitals::unavailable()
        })
    }

    fn read_skin_temperature(&mut self) -> f32 {
        self.pulse_ox.read_skin_temperature().unwrap_or_else(|e| {
            log::warn!("Skin temperature read error: {}", e);
            0.0
        })
    }

    fn read_motion(&mut self) -> Motion {
        self.imu.read_motion().unwrap_or_else(|e| {
            log::warn!("IMU read error: {}", e);
            Motion::default()
        })
    }

    fn read_ambient_temperature(&mut self) -> f32 {
        self.ambient.read_temperature().unwrap_or_else(|e| {
            log::warn!("Ambient temperature read error: {}", e);
            0.0
        })
    }

    fn read_step_count(&mut self) -> u16 {
        self.pedometer.read_step_count().unwrap_or_else(|e| {
            log::warn!("Step counter read error: {}", e);
            0
        })
    }
}
