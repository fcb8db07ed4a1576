// VitalsWatch: HTTP Client
//
// A fresh connection per request; the telemetry rate is far too low to be
// worth keeping one open.

use embedded_svc::http::client::Client;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

use crate::config::*;
use crate::publish::telemetry::HttpGet;

#[derive(Default)]
pub struct HttpClient;

impl HttpGet for HttpClient {
    fn get(&mut self, url: &str) -> anyhow::Result<u16> {
        let connection = EspHttpConnection::new(&Configuration {
            timeout: Some(HTTP_TIMEOUT),
            ..Default::default()
        })?;
        let mut client = Client::wrap(connection);

        let response = client.get(url)?.submit()?;
        Ok(response.status())
    }
}
