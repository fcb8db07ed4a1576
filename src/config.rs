// VitalsWatch: Hardware & System Configuration
// Target: Seeed Studio Xiao ESP32-C3 (RISC-V)

use std::time::Duration;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (Xiao ESP32-C3 pinout)
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 6; // D4 - I2C data line
pub const PIN_I2C_SCL: i32 = 7; // D5 - I2C clock line
pub const PIN_STEP_INT1: i32 = 2; // D0 - LSM6DS3 INT1 (wired, not consumed)

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_BAUDRATE_KHZ: u32 = 400;
pub const I2C_ADDR_LSM6DS3: u8 = 0x6A;
pub const I2C_ADDR_PULSE_OX: u8 = 0x57;
pub const I2C_ADDR_MCP9808: u8 = 0x18;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------
/// Cycle period when only BLE is published.
pub const CYCLE_PERIOD_BLE: Duration = Duration::from_secs(1);
/// ThingSpeak accepts one update per 15 s on the free tier, and BLE shares
/// the same clock.
pub const CYCLE_PERIOD_TELEMETRY: Duration = Duration::from_secs(15);
pub const HALT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// BLE
// ---------------------------------------------------------------------------
pub const BLE_DEVICE_NAME: &str = "ESP32_SensorHub";
pub const BLE_APP_ID: u16 = 0;
pub const BLE_MAX_CONNECTIONS: usize = 3;
/// Preferred connection interval advertised to centrals (1.25 ms units).
pub const BLE_PREFERRED_INTERVAL_MIN: i32 = 0x06;
pub const BLE_PREFERRED_INTERVAL_MAX: i32 = 0x12;
pub const BLE_CHARACTERISTIC_MAX_LEN: usize = 64;

pub const SERVICE_UUID: u128 = 0x4fafc201_1fb5_459e_8fcc_c5c9c331914b;
pub const ACCEL_UUID: u128 = 0xbeb5483e_36e1_4688_b7f5_ea07361b26a8;
pub const GYRO_UUID: u128 = 0xbeb5483e_36e1_4688_b7f5_ea07361b26a9;
pub const SPO2_UUID: u128 = 0xbeb5483e_36e1_4688_b7f5_ea07361b26aa;
pub const HEART_RATE_UUID: u128 = 0xbeb5483e_36e1_4688_b7f5_ea07361b26ab;
pub const AMBIENT_TEMP_UUID: u128 = 0xbeb5483e_36e1_4688_b7f5_ea07361b26ac;
pub const SKIN_TEMP_UUID: u128 = 0xbeb5483e_36e1_4688_b7f5_ea07361b26af;
pub const STEP_COUNT_UUID: u128 = 0xbeb5483e_36e1_4688_b7f5_ea07361b26b0;

// ---------------------------------------------------------------------------
// Telemetry (ThingSpeak)
// ---------------------------------------------------------------------------
pub const THINGSPEAK_URL: &str = "http://api.thingspeak.com/update";
pub const THINGSPEAK_CHANNEL: u32 = 2_818_443;
pub const THINGSPEAK_WRITE_KEY: &str = env_or_empty(option_env!("THINGSPEAK_WRITE_KEY"));

pub const WIFI_SSID: &str = env_or_empty(option_env!("WIFI_SSID"));
pub const WIFI_PASSWORD: &str = env_or_empty(option_env!("WIFI_PASSWORD"));

const fn env_or_empty(value: Option<&'static str>) -> &'static str {
    match value {
        Some(v) => v,
        None => "",
    }
}

// ---------------------------------------------------------------------------
// LSM6DS3 Sensor Scale Factors
// ---------------------------------------------------------------------------
pub const ACCEL_SCALE_2G: f32 = 0.061 / 1000.0; // g/LSB at ±2 g
pub const GYRO_SCALE_2000: f32 = 70.0 / 1000.0; // °/s/LSB at ±2000 °/s

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Settings of the polling cycle that depend on the build variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub period: Duration,
    pub telemetry: bool,
}

impl MonitorConfig {
    pub fn from_features() -> Self {
        if cfg!(feature = "telemetry") {
            Self {
                period: CYCLE_PERIOD_TELEMETRY,
                telemetry: true,
            }
        } else {
            Self {
                period: CYCLE_PERIOD_BLE,
                telemetry: false,
            }
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from_features()
    }
}
