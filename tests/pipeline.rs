// End-to-end ticks through the public API with simulated collaborators.

use std::time::Duration;

use pulsewatch::clock::ManualClock;
use pulsewatch::config::Config;
use pulsewatch::delivery::Method;
use pulsewatch::error::{DeliveryError, TransportError};
use pulsewatch::events::StressLevel;
use pulsewatch::sensor::{FixedHeartRate, SyntheticHeartRate};
use pulsewatch::sim::{RecordingTransport, ScriptedSensor};
use pulsewatch::TelemetryLoop;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

fn config() -> Config {
    let mut config = Config::from_build_env();
    config.policy.fast_endpoint = "http://192.168.1.20:5000/data".into();
    config.policy.slow_endpoint = "https://vitals.example.firebaseio.com".into();
    config.age = 45;
    config.activity = "resting".into();
    config.utc_offset_secs = 19_800;
    config.http_timeout = Duration::from_secs(5);
    config
}

#[test]
fn finger_on_sensor_produces_expected_record_and_uploads() {
    init_logging();
    let clock = ManualClock::new(0, 1_700_000_000);
    let transport = RecordingTransport::new();
    let mut telemetry = TelemetryLoop::new(
        config(),
        ScriptedSensor::new([60_000]),
        FixedHeartRate(90),
        clock,
        transport.clone(),
    );

    let report = telemetry.tick();

    let record = report.record.clone().expect("contact should build a record");
    assert_eq!(record.heart_rate, 90);
    assert_eq!(record.blood_pressure, "120/80");
    assert_eq!(record.stress, StressLevel::Medium);
    assert_eq!(record.activity, "resting");
    assert_eq!(record.age, 45);
    assert_eq!(record.timestamp, 1_700_000_000);
    assert_eq!(record.time, "03:43:20");

    let sent = transport.requests();
    assert_eq!(sent.len(), 2);

    let fast = &sent[0];
    assert_eq!(fast.method, Method::Post);
    assert_eq!(fast.url, "http://192.168.1.20:5000/data");
    let body: serde_json::Value = serde_json::from_slice(&fast.body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "heartrate": 90,
            "bp": "120/80",
            "stress": "medium",
            "activity": "resting",
            "age": 45,
            "timestamp": 1_700_000_000i64,
            "time": "03:43:20",
        })
    );

    let slow = &sent[1];
    assert_eq!(slow.method, Method::Put);
    assert_eq!(
        slow.url,
        "https://vitals.example.firebaseio.com/readings/1700000000.json"
    );
    assert_eq!(slow.body, fast.body);
}

#[test]
fn no_finger_means_no_record_and_no_traffic() {
    init_logging();
    let transport = RecordingTransport::new();
    let mut telemetry = TelemetryLoop::new(
        config(),
        ScriptedSensor::new([10_000]),
        SyntheticHeartRate::seeded(3),
        ManualClock::new(0, 1_700_000_000),
        transport.clone(),
    );

    let report = telemetry.tick();

    assert!(!report.estimate.present);
    assert_eq!(report.estimate.bpm, 0);
    assert!(report.record.is_none());
    assert_eq!(report.attempted_uploads(), 0);
    assert!(transport.requests().is_empty());
}

#[test]
fn a_minute_of_contact_with_a_flaky_fast_endpoint() {
    init_logging();
    let clock = ManualClock::new(0, 1_700_000_000);
    let transport = RecordingTransport::new();
    let mut telemetry = TelemetryLoop::new(
        config(),
        ScriptedSensor::new(std::iter::repeat(75_000).take(61)),
        SyntheticHeartRate::seeded(11),
        clock.clone(),
        transport.clone(),
    );

    let mut slow_urls = Vec::new();
    for second in 0..61 {
        // Every fifth fast POST is answered with a server error.
        if second % 5 == 0 {
            transport.push_response(Ok(500));
        }
        let report = telemetry.tick();
        let record = report.record.expect("contact every tick");
        assert!((65..120).contains(&record.heart_rate));
        if second % 5 == 0 {
            assert_eq!(
                report.fast.and_then(|o| o.error),
                Some(DeliveryError::HttpStatus(500))
            );
        }
        if let Some(outcome) = report.slow {
            assert!(outcome.ok);
            slow_urls.push(format!("/readings/{}.json", record.timestamp));
        }
        clock.advance_millis(1_000);
    }

    assert_eq!(
        slow_urls,
        vec![
            "/readings/1700000000.json",
            "/readings/1700000030.json",
            "/readings/1700000060.json",
        ]
    );
    let stats = *telemetry.stats();
    assert_eq!(stats.ticks, 61);
    assert_eq!(stats.fast_failed, 13);
    assert_eq!(stats.fast_ok, 48);
    assert_eq!(stats.slow_ok, 3);
}

#[test]
fn lost_link_drops_readings_without_stalling() {
    init_logging();
    let clock = ManualClock::new(0, 1_700_000_000);
    let transport = RecordingTransport::new();
    transport.set_connected(false);
    let mut telemetry = TelemetryLoop::new(
        config(),
        ScriptedSensor::new([60_000, 60_000, 60_000]),
        FixedHeartRate(110),
        clock.clone(),
        transport.clone(),
    );

    for _ in 0..3 {
        let report = telemetry.tick();
        assert_eq!(
            report.fast.and_then(|o| o.error),
            Some(DeliveryError::Transport(TransportError::NotConnected))
        );
        clock.advance_millis(1_000);
    }

    assert!(transport.requests().is_empty());
    assert_eq!(telemetry.stats().fast_failed, 3);
    assert_eq!(telemetry.stats().slow_failed, 1);
}
