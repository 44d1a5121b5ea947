// PulseWatch: Readings & Data Types

use serde::Serialize;

// ---------------------------------------------------------------------------
// Raw sensor sample
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reading {
    pub ir_magnitude: u32,
}

impl Reading {
    pub fn new(ir_magnitude: u32) -> Self {
        Self { ir_magnitude }
    }
}

// ---------------------------------------------------------------------------
// Heart-rate estimate
// ---------------------------------------------------------------------------
/// `present == false` means no finger on the sensor; `bpm` is 0 in that case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartRateEstimate {
    pub bpm: u16,
    pub present: bool,
}

impl HeartRateEstimate {
    pub const NO_CONTACT: Self = Self { bpm: 0, present: false };

    pub fn contact(bpm: u16) -> Self {
        Self { bpm, present: true }
    }
}

// ---------------------------------------------------------------------------
// Derived metrics
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

impl StressLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl core::fmt::Display for StressLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedMetrics {
    pub heart_rate: u16,
    pub stress_level: StressLevel,
    pub systolic_estimate: i32,
}

// ---------------------------------------------------------------------------
// Uploaded record
// ---------------------------------------------------------------------------
/// One reading as it goes over the wire. Built once per tick with contact,
/// never mutated, dropped after both uploads resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryRecord {
    #[serde(rename = "heartrate")]
    pub heart_rate: u16,
    /// `"<systolic>/80"`
    #[serde(rename = "bp")]
    pub blood_pressure: String,
    pub stress: StressLevel,
    pub activity: String,
    pub age: i32,
    /// Epoch seconds.
    pub timestamp: i64,
    /// Local wall-clock `HH:MM:SS`.
    pub time: String,
}
