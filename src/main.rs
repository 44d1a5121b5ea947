// PulseWatch: Firmware Entry Point
//
// Boot sequence (ESP-IDF):
//   1. Join Wi-Fi, retrying until associated.
//   2. Identify and configure the MAX3010x; halt if it is missing.
//   3. Wait for SNTP so records carry a real timestamp.
//   4. Tick the telemetry loop once per second, forever.
//
// On any other target the same loop runs as a dry-run against a simulated
// finger and a transport that only logs what it would send.

#[cfg(target_os = "espidf")]
mod drivers;
#[cfg(target_os = "espidf")]
mod net;

use pulsewatch::clock::SystemClock;
use pulsewatch::config::Config;
use pulsewatch::sensor::SyntheticHeartRate;
use pulsewatch::TelemetryLoop;

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------
#[cfg(target_os = "espidf")]
fn main() {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("PulseWatch firmware starting");

    if let Err(e) = run_device() {
        // Nothing useful can happen without a sensor or a clock: park here.
        log::error!("Fatal error: {:#}", e);
        loop {
            std::thread::sleep(std::time::Duration::from_secs(1));
        }
    }
}

#[cfg(target_os = "espidf")]
fn run_device() -> anyhow::Result<()> {
    use esp_idf_hal::gpio::Pin;
    use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
    use esp_idf_hal::prelude::*;
    use pulsewatch::config::{I2C_BAUDRATE_HZ, PIN_I2C_SCL, PIN_I2C_SDA};
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    use crate::drivers::max3010x::Max3010x;

    let config = Config::from_build_env();
    config.validate()?;

    // ---- Peripherals ------------------------------------------------------
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ---- Network ----------------------------------------------------------
    let wifi = net::wifi::connect(
        peripherals.modem,
        sys_loop,
        nvs,
        &config.wifi_ssid,
        &config.wifi_password,
    )?;

    // ---- Sensor (pins: config::PIN_I2C_SDA / PIN_I2C_SCL) -----------------
    let sda = peripherals.pins.gpio21;
    let scl = peripherals.pins.gpio22;
    anyhow::ensure!(
        sda.pin() == PIN_I2C_SDA && scl.pin() == PIN_I2C_SCL,
        "I2C pins out of sync with config (SDA={}, SCL={})",
        PIN_I2C_SDA,
        PIN_I2C_SCL
    );
    log::info!("I2C on SDA=GPIO{} SCL=GPIO{}", PIN_I2C_SDA, PIN_I2C_SCL);
    let i2c_config = I2cConfig::new().baudrate(I2C_BAUDRATE_HZ.Hz().into());
    let i2c = I2cDriver::new(peripherals.i2c0, sda, scl, &i2c_config)?;
    let mut sensor = Max3010x::new(i2c);
    sensor.init()?;

    // ---- Clock ------------------------------------------------------------
    let _sntp = net::sntp::sync()?;

    let transport = net::http::EspTransport::new(wifi, config.http_timeout)?;
    log::info!("Boot complete, entering telemetry loop");

    let mut telemetry = TelemetryLoop::new(
        config,
        sensor,
        SyntheticHeartRate::from_entropy(),
        SystemClock::new(),
        transport,
    );
    telemetry.run()
}

// ---------------------------------------------------------------------------
// Host dry-run
// ---------------------------------------------------------------------------
#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use pulsewatch::sim::{DryRunTransport, WanderingFinger};
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    log::info!("PulseWatch dry-run starting (no hardware, no network)");

    let mut config = Config::from_build_env();
    if config.policy.fast_endpoint.is_empty() {
        config.policy.fast_endpoint = "http://localhost:5000/data".into();
    }
    if config.policy.slow_endpoint.is_empty() {
        config.policy.slow_endpoint = "http://localhost:9000".into();
    }
    config.validate()?;

    let mut telemetry = TelemetryLoop::new(
        config,
        WanderingFinger::new(0x5eed),
        SyntheticHeartRate::from_entropy(),
        SystemClock::new(),
        DryRunTransport,
    );
    telemetry.run()
}
