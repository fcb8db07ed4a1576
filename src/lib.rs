// VitalsWatch: wrist sensor hub
//
// Polls an IMU (with embedded pedometer), a pulse oximeter and an ambient
// temperature sensor over one I2C bus and republishes each reading as BLE
// GATT characteristics, optionally pushing the same sample to ThingSpeak.

pub mod bus;
pub mod config;
pub mod cycle;
pub mod drivers;
pub mod pedometer;
pub mod publish;
pub mod sample;
pub mod sensors;

#[cfg(target_os = "espidf")]
pub mod platform;

#[cfg(all(target_os = "espidf", not(feature = "experimental")))]
compile_error!("the BLE GATT server needs esp-idf-svc's `bt` module; enable the `experimental` feature");
