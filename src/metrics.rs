// PulseWatch: Derived Metrics
//
// Rough secondary figures computed from the heart rate. The systolic value is
// a placeholder approximation and carries no clinical meaning.

use crate::events::{DerivedMetrics, StressLevel};

/// Diastolic value reported alongside every systolic estimate.
pub const DIASTOLIC_PLACEHOLDER: i32 = 80;

/// Lower bounds are inclusive: 80 is `Medium`, 100 is `High`.
pub fn derive_stress(bpm: u16) -> StressLevel {
    match bpm {
        0..=79 => StressLevel::Low,
        80..=99 => StressLevel::Medium,
        _ => StressLevel::High,
    }
}

/// `110 + (bpm - 70) / 2` with truncating division; 0 when there is no reading.
pub fn derive_systolic(bpm: u16) -> i32 {
    if bpm == 0 {
        return 0;
    }
    110 + (i32::from(bpm) - 70) / 2
}

pub fn derive(bpm: u16) -> DerivedMetrics {
    DerivedMetrics {
        heart_rate: bpm,
        stress_level: derive_stress(bpm),
        systolic_estimate: derive_systolic(bpm),
    }
}
