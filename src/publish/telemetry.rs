// VitalsWatch: Telemetry Publish Sink (ThingSpeak)
//
// One best-effort GET per cycle.  Only the X axis of each motion vector is
// sent; Y and Z stay BLE-only.  No retry, no backoff, no queue: a failed push
// is simply lost and the next cycle tries again.

use crate::config::*;
use crate::publish::Sink;
use crate::sample::Sample;

/// Network link state as seen by the telemetry sink.
pub trait Connectivity {
    fn is_connected(&mut self) -> bool;
}

/// Blocking HTTP GET returning the response status.
pub trait HttpGet {
    fn get(&mut self, url: &str) -> anyhow::Result<u16>;
}

/// `field1`..`field7` in channel order.
pub fn query_string(sample: &Sample) -> String {
    format!(
        "field1={:.2}&field2={:.2}&field3={:.2}&field4={:.2}&field5={}&field6={:.2}&field7={:.2}",
        sample.heart_rate,
        sample.spo2,
        sample.ambient_temperature,
        sample.skin_temperature,
        sample.step_count,
        sample.accel.x,
        sample.gyro.x,
    )
}

pub fn request_url(base: &str, write_key: &str, sample: &Sample) -> String {
    format!("{}?api_key={}&{}", base, write_key, query_string(sample))
}

pub struct TelemetryPublisher<C, H> {
    link: C,
    http: H,
    base_url: String,
    write_key: String,
}

impl<C: Connectivity, H: HttpGet> TelemetryPublisher<C, H> {
    pub fn new(link: C, http: H) -> Self {
        Self::with_endpoint(link, http, THINGSPEAK_URL, THINGSPEAK_WRITE_KEY)
    }

    pub fn with_endpoint(link: C, http: H, base_url: &str, write_key: &str) -> Self {
        if write_key.is_empty() {
            log::warn!("Telemetry write key is empty; updates will be rejected");
        }
        Self {
            link,
            http,
            base_url: base_url.to_owned(),
            write_key: write_key.to_owned(),
        }
    }
}

impl<C: Connectivity, H: HttpGet> Sink for TelemetryPublisher<C, H> {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    fn publish(&mut self, sample: &Sample) {
        if !self.link.is_connected() {
            log::warn!("WiFi not connected, skipping telemetry update");
            return;
        }

        let url = request_url(&self.base_url, &self.write_key, sample);
        match self.http.get(&url) {
            Ok(status) if (200..300).contains(&status) => {
                log::info!("Telemetry update sent (HTTP {})", status);
            }
            Ok(status) => log::warn!("Telemetry update rejected (HTTP {})", status),
            Err(e) => log::warn!("Telemetry request failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::sample::Vec3;

    struct Link<'a>(&'a Cell<bool>);

    impl Connectivity for Link<'_> {
        fn is_connected(&mut self) -> bool {
            self.0.get()
        }
    }

    struct Http {
        status: anyhow::Result<u16>,
        urls: Vec<String>,
    }

    impl Http {
        fn replying(status: u16) -> Self {
            Self { status: Ok(status), urls: Vec::new() }
        }
    }

    impl HttpGet for &mut Http {
        fn get(&mut self, url: &str) -> anyhow::Result<u16> {
            self.urls.push(url.to_owned());
            match &self.status {
                Ok(s) => Ok(*s),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }
    }

    fn sample() -> Sample {
        Sample {
            heart_rate: 72.5,
            spo2: 98.0,
            skin_temperature: 36.1,
            ambient_temperature: 24.3,
            accel: Vec3::new(0.01, -0.02, 0.98),
            gyro: Vec3::new(1.2, -0.5, 0.3),
            step_count: 1532,
        }
    }

    #[test]
    fn query_maps_fields_in_channel_order() {
        assert_eq!(
            query_string(&sample()),
            "field1=72.50&field2=98.00&field3=24.30&field4=36.10&field5=1532&field6=0.01&field7=1.20"
        );
    }

    #[test]
    fn url_carries_write_key() {
        let url = request_url("http://api.thingspeak.com/update", "KEY123", &sample());
        assert!(url.starts_with("http://api.thingspeak.com/update?api_key=KEY123&field1=72.50&"));
    }

    #[test]
    fn one_request_per_publish_when_connected() {
        let up = Cell::new(true);
        let mut http = Http::replying(200);
        let mut sink = TelemetryPublisher::with_endpoint(Link(&up), &mut http, "http://h/update", "K");
        sink.publish(&sample());
        drop(sink);
        assert_eq!(http.urls.len(), 1);
        assert!(http.urls[0].ends_with("&field6=0.01&field7=1.20"));
    }

    #[test]
    fn disconnected_skips_request() {
        let up = Cell::new(false);
        let mut http = Http::replying(200);
        TelemetryPublisher::with_endpoint(Link(&up), &mut http, "http://h/update", "K").publish(&sample());
        assert!(http.urls.is_empty());
    }

    #[test]
    fn error_status_and_transport_errors_are_not_retried() {
        let up = Cell::new(true);
        let mut http = Http::replying(500);
        TelemetryPublisher::with_endpoint(Link(&up), &mut http, "http://h/update", "K").publish(&sample());
        assert_eq!(http.urls.len(), 1);

        let mut http = Http { status: Err(anyhow::anyhow!("timeout")), urls: Vec::new() };
        TelemetryPublisher::with_endpoint(Link(&up), &mut http, "http://h/update", "K").publish(&sample());
        assert_eq!(http.urls.len(), 1);
    }
}
