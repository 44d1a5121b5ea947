// PulseWatch: ESP-IDF HTTP Transport
//
// One reusable `EspHttpConnection` with a hard timeout. Owns the Wi-Fi
// handle so the link stays up for as long as the transport lives.

use std::time::{Duration, Instant};

use embedded_svc::http::client::Client;
use embedded_svc::http::Method as HttpMethod;
use embedded_svc::io::{Read, Write};
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::io::EspIOError;
use esp_idf_svc::sys;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use pulsewatch::delivery::{Method, Transport};
use pulsewatch::error::TransportError;

/// Response bytes read back before the rest of the body is abandoned.
const MAX_DRAIN_BYTES: usize = 4096;

pub struct EspTransport {
    client: Client<EspHttpConnection>,
    wifi: BlockingWifi<EspWifi<'static>>,
    timeout: Duration,
}

impl EspTransport {
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>, timeout: Duration) -> anyhow::Result<Self> {
        let config = Configuration {
            timeout: Some(timeout),
            crt_bundle_attach: Some(sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let client = Client::wrap(EspHttpConnection::new(&config)?);
        Ok(Self { client, wifi, timeout })
    }

    fn exchange(
        &mut self,
        method: HttpMethod,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<u16, EspIOError> {
        let content_length = body.len().to_string();
        let mut all_headers = headers.to_vec();
        all_headers.push(("Content-Length", &content_length));

        let started = Instant::now();
        let mut request = self.client.request(method, url, &all_headers)?;
        request.write_all(body)?;
        request.flush()?;
        let mut response = request.submit()?;
        let status = response.status();

        // Body is not used; drain it so the connection can be reused, but
        // stop at the request deadline or after MAX_DRAIN_BYTES.
        let mut buf = [0u8; 256];
        let mut drained = 0;
        while drained < MAX_DRAIN_BYTES && started.elapsed() < self.timeout {
            match response.read(&mut buf)? {
                0 => break,
                n => drained += n,
            }
        }

        Ok(status)
    }
}

impl Transport for EspTransport {
    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn request(
        &mut self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<u16, TransportError> {
        let method = match method {
            Method::Post => HttpMethod::Post,
            Method::Put => HttpMethod::Put,
        };
        self.exchange(method, url, headers, body).map_err(classify)
    }
}

fn classify(e: EspIOError) -> TransportError {
    let code = e.0.code();
    let timed_out = [sys::ESP_ERR_TIMEOUT, sys::ESP_ERR_HTTP_EAGAIN];
    if timed_out.iter().any(|&c| c as sys::esp_err_t == code) {
        TransportError::TimedOut
    } else {
        TransportError::Io(e.to_string())
    }
}
