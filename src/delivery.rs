// PulseWatch: Delivery Client
//
// One HTTP request per call, no retries. The transport is built with a
// bounded timeout; a blocked request is the main source of tick jitter.

use std::time::{Duration, Instant};

use crate::error::{DeliveryError, TransportError};

pub const CONTENT_TYPE_JSON: (&str, &str) = ("Content-Type", "application/json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

/// Blocking request primitive supplied by the network stack.
///
/// Implementations must give up after their configured timeout and report
/// [`TransportError::TimedOut`]. The response body is read and discarded.
pub trait Transport {
    /// Whether the link is up. Requests are not attempted while it is down.
    fn is_connected(&self) -> bool {
        true
    }

    fn request(
        &mut self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<u16, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn request(
        &mut self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<u16, TransportError> {
        (**self).request(method, url, headers, body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub ok: bool,
    pub status: Option<u16>,
    pub error: Option<DeliveryError>,
}

impl DeliveryOutcome {
    fn delivered(status: u16) -> Self {
        Self { ok: true, status: Some(status), error: None }
    }

    fn rejected(status: u16) -> Self {
        Self {
            ok: false,
            status: Some(status),
            error: Some(DeliveryError::HttpStatus(status)),
        }
    }

    fn failed(error: TransportError) -> Self {
        Self {
            ok: false,
            status: None,
            error: Some(DeliveryError::Transport(error)),
        }
    }
}

pub struct DeliveryClient<T> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> DeliveryClient<T> {
    /// `timeout` must match the bound the transport was built with. An answer
    /// that arrives after it is reported as [`TransportError::TimedOut`].
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn send(&mut self, endpoint: &str, method: Method, payload: &[u8]) -> DeliveryOutcome {
        if !self.transport.is_connected() {
            log::warn!("{} {} skipped: network down", method.as_str(), endpoint);
            return DeliveryOutcome::failed(TransportError::NotConnected);
        }

        let started = Instant::now();
        let result = self
            .transport
            .request(method, endpoint, &[CONTENT_TYPE_JSON], payload);
        let elapsed = started.elapsed();

        let outcome = match result {
            _ if elapsed > self.timeout => {
                log::warn!(
                    "{} {} answered after {} ms, over the {} ms bound",
                    method.as_str(),
                    endpoint,
                    elapsed.as_millis(),
                    self.timeout.as_millis()
                );
                DeliveryOutcome::failed(TransportError::TimedOut)
            }
            Ok(status) if (200..=299).contains(&status) => DeliveryOutcome::delivered(status),
            Ok(status) => DeliveryOutcome::rejected(status),
            Err(e) => DeliveryOutcome::failed(e),
        };

        match &outcome.error {
            None => log::debug!(
                "{} {} -> {:?} in {} ms",
                method.as_str(),
                endpoint,
                outcome.status,
                elapsed.as_millis()
            ),
            Some(e) => log::warn!("{} {} failed: {}", method.as_str(), endpoint, e),
        }
        outcome
    }
}
