// PulseWatch: Time Sources
//
// The loop needs two clocks: a monotonic millisecond counter for scheduling
// and wall-clock epoch seconds for the record. On the device the latter is
// only meaningful once SNTP has synchronised the system time.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub trait Clock {
    /// Milliseconds since an arbitrary start point. Never goes backwards.
    fn now_millis(&self) -> u64;
    /// Seconds since the Unix epoch.
    fn now_epoch_seconds(&self) -> i64;
}

/// `std` clocks. ESP-IDF backs both with its system timer / SNTP-set RTC.
#[derive(Debug, Clone)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { started: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn now_epoch_seconds(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Hand-driven clock. Clones share the same time, so a test can keep one
/// handle and give the other to the loop.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
    epoch: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(millis: u64, epoch_seconds: i64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
            epoch: Arc::new(AtomicI64::new(epoch_seconds)),
        }
    }

    /// Moves both clocks forward; epoch seconds follow whole elapsed seconds.
    pub fn advance_millis(&self, delta: u64) {
        let before = self.millis.fetch_add(delta, Ordering::Relaxed);
        let whole_secs = (before + delta) / 1000 - before / 1000;
        self.epoch.fetch_add(whole_secs as i64, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::Relaxed)
    }

    fn now_epoch_seconds(&self) -> i64 {
        self.epoch.load(Ordering::Relaxed)
    }
}
