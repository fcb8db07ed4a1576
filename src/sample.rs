// VitalsWatch: Sample Types

use std::fmt;

/// In-band "no valid reading" marker used by the pulse oximeter.
pub const UNAVAILABLE: f32 = -1.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

// ---------------------------------------------------------------------------
// Raw sensor readings
// ---------------------------------------------------------------------------

/// 6-axis IMU reading: accel in g, gyro in °/s.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Motion {
    pub accel: Vec3,
    pub gyro: Vec3,
}

/// Heart rate (bpm) and SpO2 (%) from the pulse oximeter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vitals {
    pub heart_rate: f32,
    pub spo2: f32,
}

impl Vitals {
    pub const fn unavailable() -> Self {
        Self {
            heart_rate: UNAVAILABLE,
            spo2: UNAVAILABLE,
        }
    }

    /// Both values must be real readings; one missing invalidates the pair.
    pub fn is_valid(&self) -> bool {
        self.heart_rate != UNAVAILABLE && self.spo2 != UNAVAILABLE
    }
}

// ---------------------------------------------------------------------------
// Sample: one cycle's worth of readings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub heart_rate: f32,
    pub spo2: f32,
    pub skin_temperature: f32,
    pub ambient_temperature: f32,
    pub accel: Vec3,
    pub gyro: Vec3,
    pub step_count: u16,
}

impl Sample {
    pub fn is_valid(&self) -> bool {
        Vitals {
            heart_rate: self.heart_rate,
            spo2: self.spo2,
        }
        .is_valid()
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HR {:.1} bpm | SpO2 {:.1}% | skin {:.2}°C | ambient {:.2}°C | \
             accel ({:.3}, {:.3}, {:.3}) g | gyro ({:.2}, {:.2}, {:.2}) °/s | steps {}",
            self.heart_rate,
            self.spo2,
            self.skin_temperature,
            self.ambient_temperature,
            self.accel.x,
            self.accel.y,
            self.accel.z,
            self.gyro.x,
            self.gyro.y,
            self.gyro.z,
            self.step_count,
        )
    }
}
