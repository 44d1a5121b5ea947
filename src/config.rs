// PulseWatch: Hardware & System Configuration
// Target: ESP32 (ESP-IDF std) with a MAX30102/MAX30105 pulse-oximeter on I2C

use std::time::Duration;

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 21;
pub const PIN_I2C_SCL: i32 = 22;

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_MAX3010X: u8 = 0x57;
pub const I2C_BAUDRATE_HZ: u32 = 100_000; // standard mode, as the sensor library defaults to
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------
/// Raw IR magnitude at or above which a finger is considered present.
pub const DETECTION_THRESHOLD: u32 = 50_000;

/// Plausible range a heart-rate strategy may report while contact is present.
pub const BPM_PLAUSIBLE_MIN: u16 = 40;
pub const BPM_PLAUSIBLE_MAX: u16 = 180;

/// Range the synthetic placeholder strategy draws from (upper bound exclusive).
pub const SYNTHETIC_BPM_LOW: u16 = 65;
pub const SYNTHETIC_BPM_HIGH: u16 = 120;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const TICK_INTERVAL_MS: u64 = 1_000;
pub const SLOW_UPLOAD_INTERVAL_MS: u64 = 30_000;
pub const HTTP_TIMEOUT_MS: u64 = 5_000;
pub const WIFI_RETRY_DELAY_MS: u64 = 500;
pub const SNTP_POLL_INTERVAL_MS: u64 = 1_000;
pub const STATS_LOG_EVERY_TICKS: u64 = 60;

// ---------------------------------------------------------------------------
// Wall clock
// ---------------------------------------------------------------------------
/// Offset applied when rendering the human-readable `time` field (IST, +5:30).
pub const UTC_OFFSET_SECS: i64 = 19_800;

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------
pub const USER_AGE: u32 = 45;
pub const USER_ACTIVITY: &str = "resting"; // "resting", "walking" or "exercise"

// ---------------------------------------------------------------------------
// Build-time secrets and endpoints
// ---------------------------------------------------------------------------
pub const WIFI_SSID: &str = build_env(option_env!("PULSEWATCH_WIFI_SSID"));
pub const WIFI_PASSWORD: &str = build_env(option_env!("PULSEWATCH_WIFI_PASSWORD"));
pub const FAST_URL: &str = build_env(option_env!("PULSEWATCH_FAST_URL"));
pub const SLOW_BASE_URL: &str = build_env(option_env!("PULSEWATCH_SLOW_BASE_URL"));

const fn build_env(value: Option<&'static str>) -> &'static str {
    match value {
        Some(v) => v,
        None => "",
    }
}

/// Where and how often readings are uploaded. Fixed after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Receives an HTTP POST on every tick with contact.
    pub fast_endpoint: String,
    /// Base URL; records are PUT to `<base>/readings/<epoch>.json`.
    pub slow_endpoint: String,
    pub slow_interval_ms: u64,
    pub tick_interval_ms: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            fast_endpoint: FAST_URL.to_string(),
            slow_endpoint: SLOW_BASE_URL.to_string(),
            slow_interval_ms: SLOW_UPLOAD_INTERVAL_MS,
            tick_interval_ms: TICK_INTERVAL_MS,
        }
    }
}

/// Process-wide configuration, built once at startup and handed to the loop.
#[derive(Debug, Clone)]
pub struct Config {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub policy: UploadPolicy,
    pub age: i32,
    pub activity: String,
    pub detection_threshold: u32,
    pub http_timeout: Duration,
    pub utc_offset_secs: i64,
}

impl Config {
    /// Configuration baked in from the build environment and the constants above.
    pub fn from_build_env() -> Self {
        Self {
            wifi_ssid: WIFI_SSID.to_string(),
            wifi_password: WIFI_PASSWORD.to_string(),
            policy: UploadPolicy::default(),
            age: USER_AGE as i32,
            activity: USER_ACTIVITY.to_string(),
            detection_threshold: DETECTION_THRESHOLD,
            http_timeout: Duration::from_millis(HTTP_TIMEOUT_MS),
            utc_offset_secs: UTC_OFFSET_SECS,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy.fast_endpoint.is_empty() {
            return Err(ConfigError::Invalid("fast endpoint is empty"));
        }
        if self.policy.slow_endpoint.is_empty() {
            return Err(ConfigError::Invalid("slow endpoint base is empty"));
        }
        if self.policy.slow_interval_ms == 0 {
            return Err(ConfigError::Invalid("slow upload interval must be positive"));
        }
        if self.policy.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick interval must be positive"));
        }
        if self.age <= 0 {
            return Err(ConfigError::Invalid("age must be positive"));
        }
        if self.activity.is_empty() {
            return Err(ConfigError::Invalid("activity is empty"));
        }
        if self.http_timeout.is_zero() {
            return Err(ConfigError::Invalid("http timeout must be positive"));
        }
        Ok(())
    }
}
