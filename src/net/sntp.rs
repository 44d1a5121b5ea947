// PulseWatch: Wall-Clock Sync
//
// Records carry epoch seconds, so the first tick waits for SNTP.

use std::thread;
use std::time::{Duration, Instant};

use esp_idf_svc::sntp::{EspSntp, SyncStatus};

use pulsewatch::config::SNTP_POLL_INTERVAL_MS;
use pulsewatch::error::SetupError;

const SYNC_TIMEOUT: Duration = Duration::from_secs(60);

/// The returned handle must be kept alive to keep the clock disciplined.
pub fn sync() -> Result<EspSntp<'static>, SetupError> {
    let sntp = EspSntp::new_default().map_err(|e| {
        log::error!("SNTP start failed: {}", e);
        SetupError::TimeSync
    })?;

    let started = Instant::now();
    while sntp.get_sync_status() != SyncStatus::Completed {
        if started.elapsed() > SYNC_TIMEOUT {
            return Err(SetupError::TimeSync);
        }
        log::info!("Waiting for time sync...");
        thread::sleep(Duration::from_millis(SNTP_POLL_INTERVAL_MS));
    }

    log::info!("Time synchronised");
    Ok(sntp)
}
