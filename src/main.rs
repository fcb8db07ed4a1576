// VitalsWatch: Firmware Entry Point
//
// Boot sequence:
//   1. Bring up the shared I2C bus.
//   2. Initialise IMU, pulse oximeter and ambient sensor (failures logged).
//   3. Configure the pedometer; on failure halt forever.
//   4. Start the BLE GATT server (and WiFi when built with `telemetry`).
//   5. Run the polling cycle forever.

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("vitalswatch is firmware for the ESP32-C3; build it for an espidf target");
}

#[cfg(target_os = "espidf")]
mod firmware {
    use std::sync::{Arc, Mutex};
    use std::thread;

    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;
    use esp_idf_svc::bt::BtDriver;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    use vitalswatch::bus::SharedBus;
    use vitalswatch::config::*;
    use vitalswatch::cycle::Monitor;
    use vitalswatch::platform::ble::GattServer;
    use vitalswatch::platform::http::HttpClient;
    use vitalswatch::platform::wifi::WifiLink;
    use vitalswatch::publish::ble::BlePublisher;
    use vitalswatch::publish::telemetry::TelemetryPublisher;

    pub fn run() -> anyhow::Result<()> {
        // Link esp-idf-sys runtime patches and initialise logging.
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        log::info!("VitalsWatch firmware starting…");

        // ---- Peripherals --------------------------------------------------
        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        // ---- I2C bus (shared by IMU, pulse oximeter, MCP9808) -------------
        let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_KHZ.kHz().into());
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio6, // SDA
            peripherals.pins.gpio7, // SCL
            &i2c_config,
        )?;
        log::info!(
            "I2C at {} kHz on SDA=GPIO{} SCL=GPIO{} (step INT1 on GPIO{} not polled)",
            I2C_BAUDRATE_KHZ,
            PIN_I2C_SDA,
            PIN_I2C_SCL,
            PIN_STEP_INT1
        );
        // The bus lives for the entire programme (embedded firmware never
        // exits), so leaking it gives every driver a plain 'static reference.
        let i2c_bus: &'static Mutex<I2cDriver<'static>> = Box::leak(Box::new(Mutex::new(i2c)));

        // ---- Sensors ------------------------------------------------------
        let config = MonitorConfig::from_features();
        let mut monitor = match Monitor::bring_up(SharedBus::new(i2c_bus), config) {
            Ok(monitor) => monitor,
            Err(e) => {
                log::error!("{}; halting", e);
                halt();
            }
        };

        // ---- Radio --------------------------------------------------------
        let (wifi_modem, bt_modem) = peripherals.modem.split();

        let bt = Arc::new(BtDriver::new(bt_modem, Some(nvs.clone()))?);
        let gatt = GattServer::start(bt)?;
        monitor.add_sink(BlePublisher::new(gatt));

        if config.telemetry {
            let link = WifiLink::start(wifi_modem, sysloop, Some(nvs))?;
            log::info!("Telemetry channel {} enabled", THINGSPEAK_CHANNEL);
            monitor.add_sink(TelemetryPublisher::new(link, HttpClient));
        }

        monitor.run()
    }

    /// Idle forever; only a power cycle or reflash recovers.
    fn halt() -> ! {
        loop {
            thread::sleep(HALT_POLL_INTERVAL);
        }
    }
}
