// PulseWatch: Simulated Collaborators
//
// Stand-ins for the sensor and the network so the loop can run on a host:
// the dry-run binary uses them, and so do the tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::delivery::{Method, Transport};
use crate::error::TransportError;
use crate::sensor::IrSensor;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Returns the scripted magnitudes in order, then `idle` forever.
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    values: VecDeque<u32>,
    idle: u32,
}

impl ScriptedSensor {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            values: values.into_iter().collect(),
            idle: 0,
        }
    }

    pub fn idle_at(mut self, idle: u32) -> Self {
        self.idle = idle;
        self
    }
}

impl IrSensor for ScriptedSensor {
    fn read_raw_ir(&mut self) -> u32 {
        self.values.pop_front().unwrap_or(self.idle)
    }
}

/// A finger that rests on the sensor for a while, then lifts off, repeatedly.
pub struct WanderingFinger {
    rng: StdRng,
    tick: u32,
    contact_ticks: u32,
    period_ticks: u32,
}

impl WanderingFinger {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            tick: 0,
            contact_ticks: 20,
            period_ticks: 25,
        }
    }
}

impl IrSensor for WanderingFinger {
    fn read_raw_ir(&mut self) -> u32 {
        let phase = self.tick % self.period_ticks;
        self.tick = self.tick.wrapping_add(1);
        if phase < self.contact_ticks {
            self.rng.gen_range(60_000..90_000)
        } else {
            self.rng.gen_range(0..10_000)
        }
    }
}

// ---------------------------------------------------------------------------
// Transports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug, Default)]
struct Recorder {
    requests: Vec<SentRequest>,
    responses: VecDeque<Result<u16, TransportError>>,
}

/// Records every request and answers from a script (200 once it runs out).
/// Clones share state, so one handle can be kept for inspection.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    inner: Arc<Mutex<Recorder>>,
    connected: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Recorder::default())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn push_response(&self, response: Result<u16, TransportError>) {
        self.lock().responses.push_back(response);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn requests(&self) -> Vec<SentRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorder> {
        // A panicking test thread must not hide what was recorded.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for RecordingTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn request(
        &mut self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<u16, TransportError> {
        let mut inner = self.lock();
        inner.requests.push(SentRequest {
            method,
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.to_vec(),
        });
        inner.responses.pop_front().unwrap_or(Ok(200))
    }
}

/// Logs what would have been sent and reports success.
#[derive(Debug, Default)]
pub struct DryRunTransport;

impl Transport for DryRunTransport {
    fn request(
        &mut self,
        method: Method,
        url: &str,
        _headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<u16, TransportError> {
        log::info!("{} {} {}", method.as_str(), url, String::from_utf8_lossy(body));
        Ok(200)
    }
}
