// PulseWatch: Payload Builder
//
// Assembles the uploaded record from the derived metrics plus the user
// context, and renders it to JSON. No I/O: the timestamp is handed in.

use crate::error::PayloadError;
use crate::events::{DerivedMetrics, TelemetryRecord};
use crate::metrics::DIASTOLIC_PLACEHOLDER;

const SECS_PER_DAY: i64 = 86_400;

/// Everything in a record that does not come from the sensor.
#[derive(Debug, Clone, Copy)]
pub struct ReadingContext<'a> {
    pub activity: &'a str,
    pub age: i32,
    /// Epoch seconds.
    pub timestamp: i64,
    /// Offset used for the human-readable `time` field.
    pub utc_offset_secs: i64,
}

pub fn build(metrics: &DerivedMetrics, context: &ReadingContext<'_>) -> Result<TelemetryRecord, PayloadError> {
    if context.age <= 0 {
        return Err(PayloadError::InvalidInput("age must be positive"));
    }
    if context.activity.is_empty() {
        return Err(PayloadError::InvalidInput("activity must not be empty"));
    }

    Ok(TelemetryRecord {
        heart_rate: metrics.heart_rate,
        blood_pressure: format!("{}/{}", metrics.systolic_estimate, DIASTOLIC_PLACEHOLDER),
        stress: metrics.stress_level,
        activity: context.activity.to_string(),
        age: context.age,
        timestamp: context.timestamp,
        time: format_clock(context.timestamp, context.utc_offset_secs),
    })
}

pub fn encode(record: &TelemetryRecord) -> Result<Vec<u8>, PayloadError> {
    serde_json::to_vec(record).map_err(|e| PayloadError::Encode(e.to_string()))
}

/// `HH:MM:SS` of `epoch_seconds` shifted by `utc_offset_secs`.
pub fn format_clock(epoch_seconds: i64, utc_offset_secs: i64) -> String {
    let secs_of_day = (epoch_seconds + utc_offset_secs).rem_euclid(SECS_PER_DAY);
    format!(
        "{:02}:{:02}:{:02}",
        secs_of_day / 3600,
        (secs_of_day % 3600) / 60,
        secs_of_day % 60
    )
}

/// Per-timestamp key on the slow endpoint: `<base>/readings/<epoch>.json`.
/// Two records in the same second share a key; the later write wins.
pub fn slow_path_url(base: &str, epoch_seconds: i64) -> String {
    format!("{}/readings/{}.json", base.trim_end_matches('/'), epoch_seconds)
}
