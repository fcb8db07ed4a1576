// VitalsWatch: BLE Publish Sink
//
// Each physical quantity lives in its own read+notify characteristic as
// human-readable text.  Vectors are "x,y,z" with 4 decimals; scalars use 2
// decimals; the step count is a plain integer.

use crate::config::*;
use crate::publish::Sink;
use crate::sample::{Sample, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    Accel,
    Gyro,
    Spo2,
    HeartRate,
    AmbientTemperature,
    SkinTemperature,
    StepCount,
}

impl Characteristic {
    /// Publish order.
    pub const ALL: [Characteristic; 7] = [
        Self::Accel,
        Self::Gyro,
        Self::Spo2,
        Self::HeartRate,
        Self::AmbientTemperature,
        Self::SkinTemperature,
        Self::StepCount,
    ];

    pub const fn uuid(&self) -> u128 {
        match self {
            Self::Accel => ACCEL_UUID,
            Self::Gyro => GYRO_UUID,
            Self::Spo2 => SPO2_UUID,
            Self::HeartRate => HEART_RATE_UUID,
            Self::AmbientTemperature => AMBIENT_TEMP_UUID,
            Self::SkinTemperature => SKIN_TEMP_UUID,
            Self::StepCount => STEP_COUNT_UUID,
        }
    }

    /// Index into [`Characteristic::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

fn format_vec3(v: &Vec3) -> String {
    format!("{:.4},{:.4},{:.4}", v.x, v.y, v.z)
}

/// Text value of one characteristic for `sample`.
pub fn encode(characteristic: Characteristic, sample: &Sample) -> String {
    match characteristic {
        Characteristic::Accel => format_vec3(&sample.accel),
        Characteristic::Gyro => format_vec3(&sample.gyro),
        Characteristic::Spo2 => format!("{:.2}", sample.spo2),
        Characteristic::HeartRate => format!("{:.2}", sample.heart_rate),
        Characteristic::AmbientTemperature => format!("{:.2}", sample.ambient_temperature),
        Characteristic::SkinTemperature => format!("{:.2}", sample.skin_temperature),
        Characteristic::StepCount => sample.step_count.to_string(),
    }
}

/// The GATT server side: store a characteristic value and notify whoever
/// subscribed.  Having no subscriber is not an error.
pub trait GattNotifier {
    fn set_and_notify(&mut self, characteristic: Characteristic, value: &[u8]) -> anyhow::Result<()>;
}

/// Send one characteristic value to every subscriber.  A peer that fails
/// (e.g. mid-disconnect) is logged and skipped; the others still get the
/// value.  Returns how many peers were reached.
pub fn notify_subscribers<P, E>(
    characteristic: Characteristic,
    subscribers: impl IntoIterator<Item = P>,
    mut send: impl FnMut(&P) -> Result<(), E>,
) -> usize
where
    P: std::fmt::Display,
    E: std::fmt::Debug,
{
    let mut reached = 0;
    for peer in subscribers {
        match send(&peer) {
            Ok(()) => reached += 1,
            Err(e) => log::warn!("BLE notify {:?} to {} failed: {:?}", characteristic, peer, e),
        }
    }
    reached
}

pub struct BlePublisher<N> {
    notifier: N,
}

impl<N: GattNotifier> BlePublisher<N> {
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }
}

impl<N: GattNotifier> Sink for BlePublisher<N> {
    fn name(&self) -> &'static str {
        "ble"
    }

    fn publish(&mut self, sample: &Sample) {
        for characteristic in Characteristic::ALL {
            let value = encode(characteristic, sample);
            if let Err(e) = self.notifier.set_and_notify(characteristic, value.as_bytes()) {
                log::warn!("BLE notify {:?} failed: {}", characteristic, e);
            }
        }
    }
}
