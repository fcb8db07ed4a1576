// VitalsWatch: WiFi Station
//
// Associates once at boot.  Failure is not fatal: telemetry is skipped while
// the link is down, and each skipped cycle asks the driver to reconnect.

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::WifiModem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use crate::config::*;
use crate::publish::telemetry::Connectivity;

pub struct WifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl WifiLink {
    pub fn start(
        modem: WifiModem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> anyhow::Result<Self> {
        let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), nvs)?, sysloop)?;

        let auth_method = if WIFI_PASSWORD.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: WIFI_SSID
                .try_into()
                .map_err(|_| anyhow::anyhow!("WiFi SSID too long"))?,
            password: WIFI_PASSWORD
                .try_into()
                .map_err(|_| anyhow::anyhow!("WiFi password too long"))?,
            auth_method,
            ..Default::default()
        }))?;

        wifi.start()?;
        log::info!("Connecting to WiFi '{}'", WIFI_SSID);

        let mut link = Self { wifi };
        match link.associate() {
            Ok(()) => log::info!("WiFi connected"),
            Err(e) => log::error!("WiFi connection failed: {} (telemetry paused)", e),
        }
        Ok(link)
    }

    fn associate(&mut self) -> anyhow::Result<()> {
        self.wifi.connect()?;
        self.wifi.wait_netif_up()?;
        let ip = self.wifi.wifi().sta_netif().get_ip_info()?;
        log::info!("WiFi IP: {}", ip.ip);
        Ok(())
    }
}

impl Connectivity for WifiLink {
    fn is_connected(&mut self) -> bool {
        if self.wifi.is_connected().unwrap_or(false) {
            return true;
        }
        // Non-blocking; the result shows up on a later cycle.
        if let Err(e) = self.wifi.wifi_mut().connect() {
            log::debug!("WiFi reconnect request failed: {}", e);
        }
        false
    }
}
