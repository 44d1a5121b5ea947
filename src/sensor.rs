// PulseWatch: Sensor Source
//
// Wraps the raw IR channel of the pulse-oximeter and turns each sample into a
// heart-rate estimate. Contact detection is a fixed threshold on the IR
// magnitude; the beats-per-minute value itself comes from a pluggable
// strategy so real peak detection can replace the placeholder later.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::*;
use crate::events::{HeartRateEstimate, Reading};

/// Raw IR channel of the sensor driver.
///
/// Must not fail: a disconnected or faulty sensor reports a low (or zero)
/// magnitude instead.
pub trait IrSensor {
    fn read_raw_ir(&mut self) -> u32;
}

impl<T: IrSensor + ?Sized> IrSensor for Box<T> {
    fn read_raw_ir(&mut self) -> u32 {
        (**self).read_raw_ir()
    }
}

/// Produces a bpm value for a reading that is known to have contact.
/// Implementations must return a value in
/// [`BPM_PLAUSIBLE_MIN`]..=[`BPM_PLAUSIBLE_MAX`].
pub trait HeartRateStrategy {
    fn bpm(&mut self, reading: Reading) -> u16;
}

/// Placeholder that draws a uniformly random bpm, in lieu of signal processing.
pub struct SyntheticHeartRate<R: Rng = StdRng> {
    rng: R,
}

impl SyntheticHeartRate<StdRng> {
    pub fn from_entropy() -> Self {
        Self { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl<R: Rng> HeartRateStrategy for SyntheticHeartRate<R> {
    fn bpm(&mut self, _reading: Reading) -> u16 {
        self.rng.gen_range(SYNTHETIC_BPM_LOW..SYNTHETIC_BPM_HIGH)
    }
}

/// Always reports the same bpm. Used for bring-up and deterministic runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedHeartRate(pub u16);

impl HeartRateStrategy for FixedHeartRate {
    fn bpm(&mut self, _reading: Reading) -> u16 {
        self.0.clamp(BPM_PLAUSIBLE_MIN, BPM_PLAUSIBLE_MAX)
    }
}

pub struct SensorSource<S, H> {
    sensor: S,
    strategy: H,
    threshold: u32,
}

impl<S: IrSensor, H: HeartRateStrategy> SensorSource<S, H> {
    pub fn new(sensor: S, strategy: H, threshold: u32) -> Self {
        Self { sensor, strategy, threshold }
    }

    pub fn sample(&mut self) -> Reading {
        Reading::new(self.sensor.read_raw_ir())
    }

    pub fn estimate_heart_rate(&mut self, reading: Reading) -> HeartRateEstimate {
        if reading.ir_magnitude < self.threshold {
            return HeartRateEstimate::NO_CONTACT;
        }
        let bpm = self
            .strategy
            .bpm(reading)
            .clamp(BPM_PLAUSIBLE_MIN, BPM_PLAUSIBLE_MAX);
        HeartRateEstimate::contact(bpm)
    }
}
