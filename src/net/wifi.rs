// PulseWatch: Wi-Fi Association
//
// Association happens before any reading exists, so it is retried forever.

use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use pulsewatch::config::WIFI_RETRY_DELAY_MS;
use pulsewatch::error::SetupError;

pub fn connect(
    modem: Modem,
    sys_loop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    ssid: &str,
    password: &str,
) -> anyhow::Result<BlockingWifi<EspWifi<'static>>> {
    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sys_loop.clone(), Some(nvs))?, sys_loop)?;

    let auth_method = if password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    let client_conf = ClientConfiguration {
        ssid: ssid
            .try_into()
            .map_err(|_| anyhow!("SSID '{ssid}' is too long"))?,
        password: password
            .try_into()
            .map_err(|_| anyhow!("Wi-Fi password is too long"))?,
        auth_method,
        ..Default::default()
    };
    wifi.set_configuration(&Configuration::Client(client_conf))?;
    wifi.start()?;
    log::info!("Wi-Fi started, joining '{}'", ssid);

    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match associate(&mut wifi) {
            Ok(()) => break,
            Err(e) => {
                if attempts == 1 || attempts % 20 == 0 {
                    log::warn!("{} (attempt {})", e, attempts);
                }
                thread::sleep(Duration::from_millis(WIFI_RETRY_DELAY_MS));
            }
        }
    }

    let ip = wifi.wifi().sta_netif().get_ip_info()?;
    log::info!("Wi-Fi connected after {} attempt(s), ip {}", attempts, ip.ip);
    Ok(wifi)
}

fn associate(wifi: &mut BlockingWifi<EspWifi<'static>>) -> Result<(), SetupError> {
    wifi.connect()
        .map_err(|e| SetupError::NetworkAssociation(e.to_string()))?;
    wifi.wait_netif_up()
        .map_err(|e| SetupError::NetworkAssociation(e.to_string()))?;
    Ok(())
}
