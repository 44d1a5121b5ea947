// PulseWatch: Telemetry Loop
//
// One tick: sample -> estimate -> (contact only) derive + build -> decide ->
// deliver fast and/or slow. Ticks never overlap. Nothing survives a restart;
// the slow timer starts out eligible again.

use std::thread;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::config::{Config, STATS_LOG_EVERY_TICKS};
use crate::delivery::{DeliveryClient, DeliveryOutcome, Method, Transport};
use crate::error::PayloadError;
use crate::events::{HeartRateEstimate, TelemetryRecord};
use crate::metrics;
use crate::payload::{self, ReadingContext};
use crate::scheduler::UploadScheduler;
use crate::sensor::{HeartRateStrategy, IrSensor, SensorSource};

/// What happened during a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub estimate: HeartRateEstimate,
    pub record: Option<TelemetryRecord>,
    pub fast: Option<DeliveryOutcome>,
    pub slow: Option<DeliveryOutcome>,
}

impl TickReport {
    fn without_record(estimate: HeartRateEstimate) -> Self {
        Self {
            estimate,
            record: None,
            fast: None,
            slow: None,
        }
    }

    pub fn attempted_uploads(&self) -> usize {
        usize::from(self.fast.is_some()) + usize::from(self.slow.is_some())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub no_contact: u64,
    pub skipped: u64,
    pub fast_ok: u64,
    pub fast_failed: u64,
    pub slow_ok: u64,
    pub slow_failed: u64,
}

impl core::fmt::Display for LoopStats {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "ticks={} no_contact={} skipped={} fast={}/{} slow={}/{}",
            self.ticks,
            self.no_contact,
            self.skipped,
            self.fast_ok,
            self.fast_ok + self.fast_failed,
            self.slow_ok,
            self.slow_ok + self.slow_failed,
        )
    }
}

pub struct TelemetryLoop<S, H, C, T> {
    config: Config,
    source: SensorSource<S, H>,
    clock: C,
    scheduler: UploadScheduler,
    delivery: DeliveryClient<T>,
    stats: LoopStats,
}

impl<S, H, C, T> TelemetryLoop<S, H, C, T>
where
    S: IrSensor,
    H: HeartRateStrategy,
    C: Clock,
    T: Transport,
{
    pub fn new(config: Config, sensor: S, strategy: H, clock: C, transport: T) -> Self {
        let source = SensorSource::new(sensor, strategy, config.detection_threshold);
        let scheduler = UploadScheduler::new(config.policy.slow_interval_ms);
        let delivery = DeliveryClient::new(transport, config.http_timeout);
        Self {
            config,
            source,
            clock,
            scheduler,
            delivery,
            stats: LoopStats::default(),
        }
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn scheduler(&self) -> &UploadScheduler {
        &self.scheduler
    }

    pub fn tick(&mut self) -> TickReport {
        self.stats.ticks += 1;
        let now = self.clock.now_millis();

        let reading = self.source.sample();
        let estimate = self.source.estimate_heart_rate(reading);
        let built = if estimate.present {
            match self.build(estimate) {
                Ok(built) => Some(built),
                Err(e) => {
                    self.stats.skipped += 1;
                    log::error!("tick skipped: {}", e);
                    return TickReport::without_record(estimate);
                }
            }
        } else {
            None
        };

        let decision = self.scheduler.decide(now, built.is_some());
        let Some((record, body)) = built else {
            self.stats.no_contact += 1;
            log::debug!("no contact (ir={})", reading.ir_magnitude);
            return TickReport::without_record(estimate);
        };
        let policy = &self.config.policy;

        let fast = decision.do_fast.then(|| {
            let outcome = self.delivery.send(&policy.fast_endpoint, Method::Post, &body);
            if outcome.ok {
                self.stats.fast_ok += 1;
                log::info!(
                    "Sent hr={} stress={} bp={}",
                    record.heart_rate,
                    record.stress,
                    record.blood_pressure
                );
            } else {
                self.stats.fast_failed += 1;
            }
            outcome
        });

        let slow = decision.do_slow.then(|| {
            let url = payload::slow_path_url(&policy.slow_endpoint, record.timestamp);
            let outcome = self.delivery.send(&url, Method::Put, &body);
            if outcome.ok {
                self.stats.slow_ok += 1;
                log::info!("Stored reading {}", record.timestamp);
            } else {
                self.stats.slow_failed += 1;
            }
            outcome
        });

        TickReport {
            estimate,
            record: Some(record),
            fast,
            slow,
        }
    }

    fn build(
        &self,
        estimate: HeartRateEstimate,
    ) -> Result<(TelemetryRecord, Vec<u8>), PayloadError> {
        let derived = metrics::derive(estimate.bpm);
        let context = ReadingContext {
            activity: &self.config.activity,
            age: self.config.age,
            timestamp: self.clock.now_epoch_seconds(),
            utc_offset_secs: self.config.utc_offset_secs,
        };
        let record = payload::build(&derived, &context)?;
        let body = payload::encode(&record)?;
        Ok((record, body))
    }

    /// Tick forever at `tick_interval_ms`. A tick that overruns the interval
    /// (slow network) is followed immediately by the next one.
    pub fn run(&mut self) -> ! {
        log::info!(
            "Telemetry loop started (tick {} ms, slow upload every {} ms)",
            self.config.policy.tick_interval_ms,
            self.config.policy.slow_interval_ms
        );
        let interval = Duration::from_millis(self.config.policy.tick_interval_ms);

        loop {
            let tick_start = Instant::now();

            self.tick();
            if self.stats.ticks % STATS_LOG_EVERY_TICKS == 0 {
                log::info!("Stats: {}", self.stats);
            }

            let elapsed = tick_start.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{DeliveryError, TransportError};
    use crate::events::StressLevel;
    use crate::sensor::FixedHeartRate;
    use crate::sim::{RecordingTransport, ScriptedSensor};

    type TestLoop = TelemetryLoop<ScriptedSensor, FixedHeartRate, ManualClock, RecordingTransport>;

    fn config() -> Config {
        let mut config = Config::from_build_env();
        config.policy.fast_endpoint = "http://10.0.0.2:5000/data".into();
        config.policy.slow_endpoint = "https://db.example.com".into();
        config.age = 45;
        config.activity = "resting".into();
        config.utc_offset_secs = 0;
        config
    }

    fn harness(config: Config, magnitudes: Vec<u32>) -> (TestLoop, ManualClock, RecordingTransport) {
        let clock = ManualClock::new(0, 1_700_000_000);
        let transport = RecordingTransport::new();
        let looped = TelemetryLoop::new(
            config,
            ScriptedSensor::new(magnitudes),
            FixedHeartRate(90),
            clock.clone(),
            transport.clone(),
        );
        (looped, clock, transport)
    }

    #[test]
    fn contact_builds_record_and_uploads_both_paths() {
        let (mut looped, _clock, transport) = harness(config(), vec![60_000]);

        let report = looped.tick();

        let record = report.record.expect("record");
        assert_eq!(record.heart_rate, 90);
        assert_eq!(record.blood_pressure, "120/80");
        assert_eq!(record.stress, StressLevel::Medium);
        assert_eq!(record.activity, "resting");
        assert_eq!(record.age, 45);
        assert_eq!(record.timestamp, 1_700_000_000);

        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].method, Method::Post);
        assert_eq!(sent[0].url, "http://10.0.0.2:5000/data");
        assert_eq!(sent[1].method, Method::Put);
        assert_eq!(sent[1].url, "https://db.example.com/readings/1700000000.json");
        assert_eq!(sent[0].body, sent[1].body);
    }

    #[test]
    fn no_contact_makes_no_network_calls() {
        let (mut looped, _clock, transport) = harness(config(), vec![10_000]);

        let report = looped.tick();

        assert_eq!(report.estimate, HeartRateEstimate::NO_CONTACT);
        assert_eq!(report.record, None);
        assert_eq!(report.attempted_uploads(), 0);
        assert!(transport.requests().is_empty());
        assert_eq!(looped.stats().no_contact, 1);
        assert_eq!(looped.scheduler().last_slow_upload_at(), None);
    }

    #[test]
    fn contact_after_long_gap_uploads_slow_at_once() {
        let mut magnitudes = vec![60_000];
        magnitudes.extend([0; 45]);
        magnitudes.push(60_000);
        let (mut looped, clock, _transport) = harness(config(), magnitudes);

        assert!(looped.tick().slow.is_some());
        clock.advance_millis(1_000);
        for _ in 0..45 {
            let report = looped.tick();
            assert_eq!(report.attempted_uploads(), 0);
            assert_eq!(looped.scheduler().last_slow_upload_at(), Some(0));
            clock.advance_millis(1_000);
        }

        let resumed = looped.tick();
        assert!(resumed.fast.is_some());
        assert!(resumed.slow.is_some());
        assert_eq!(looped.scheduler().last_slow_upload_at(), Some(46_000));
        assert_eq!(looped.stats().no_contact, 45);
    }

    #[test]
    fn slow_path_is_rate_limited_across_ticks() {
        let (mut looped, clock, transport) = harness(config(), vec![60_000; 32]);

        let mut slow_at = Vec::new();
        for _ in 0..32 {
            let now = clock.now_millis();
            let report = looped.tick();
            assert!(report.fast.is_some());
            if report.slow.is_some() {
                slow_at.push(now);
            }
            clock.advance_millis(1_000);
        }

        assert_eq!(slow_at, vec![0, 30_000]);
        let puts = transport
            .requests()
            .iter()
            .filter(|r| r.method == Method::Put)
            .count();
        assert_eq!(puts, 2);
        assert_eq!(looped.stats().fast_ok, 32);
    }

    #[test]
    fn failed_slow_upload_waits_a_full_interval() {
        let (mut looped, clock, transport) = harness(config(), vec![60_000; 40]);
        transport.push_response(Ok(200));
        transport.push_response(Err(TransportError::TimedOut));

        let first = looped.tick();
        assert_eq!(
            first.slow.and_then(|o| o.error),
            Some(DeliveryError::Transport(TransportError::TimedOut))
        );

        for _ in 1..30 {
            clock.advance_millis(1_000);
            assert!(looped.tick().slow.is_none());
        }
        clock.advance_millis(1_000);
        assert!(looped.tick().slow.is_some());
        assert_eq!(looped.stats().slow_failed, 1);
        assert_eq!(looped.stats().slow_ok, 1);
    }

    #[test]
    fn fast_failure_does_not_stop_slow_attempt() {
        let (mut looped, _clock, transport) = harness(config(), vec![60_000]);
        transport.push_response(Ok(503));

        let report = looped.tick();

        assert_eq!(report.fast.map(|o| o.error), Some(Some(DeliveryError::HttpStatus(503))));
        assert!(report.slow.is_some_and(|o| o.ok));
        assert_eq!(looped.stats().fast_failed, 1);
    }

    #[test]
    fn invalid_profile_skips_tick_without_touching_scheduler() {
        let mut bad = config();
        bad.age = 0;
        let (mut looped, _clock, transport) = harness(bad, vec![60_000, 60_000]);

        let report = looped.tick();
        looped.tick();

        assert!(report.estimate.present);
        assert_eq!(report.record, None);
        assert!(transport.requests().is_empty());
        assert_eq!(looped.stats().skipped, 2);
        assert_eq!(looped.scheduler().last_slow_upload_at(), None);
    }

    #[test]
    fn offline_link_drops_record_and_keeps_ticking() {
        let (mut looped, clock, transport) = harness(config(), vec![60_000, 60_000]);
        transport.set_connected(false);

        let report = looped.tick();
        assert!(!report.fast.as_ref().is_some_and(|o| o.ok));
        assert!(transport.requests().is_empty());

        transport.set_connected(true);
        clock.advance_millis(1_000);
        let report = looped.tick();
        assert!(report.fast.is_some_and(|o| o.ok));
        // Slow slot was spent on the offline tick.
        assert!(report.slow.is_none());
    }

    #[test]
    fn stats_line_is_readable() {
        let stats = LoopStats {
            ticks: 10,
            no_contact: 2,
            skipped: 0,
            fast_ok: 7,
            fast_failed: 1,
            slow_ok: 1,
            slow_failed: 0,
        };
        assert_eq!(stats.to_string(), "ticks=10 no_contact=2 skipped=0 fast=7/8 slow=1/1");
    }
}
