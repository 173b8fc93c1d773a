use anyhow::Result;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use subspace_panel::debug_flags::{self, DEBUG_FEED};

const CONNECT_ATTEMPTS: u32 = 5;

pub struct WifiLink {
    pub wifi: Box<EspWifi<'static>>,
    pub ip_address: Option<String>,
}

impl WifiLink {
    pub fn is_up(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }
}

fn log_ap_info(label: &str) {
    unsafe {
        let mut ap_info: esp_idf_sys::wifi_ap_record_t = core::mem::zeroed();
        let rc = esp_idf_sys::esp_wifi_sta_get_ap_info(&mut ap_info);
        if rc == esp_idf_sys::ESP_OK {
            let ssid = core::str::from_utf8(&ap_info.ssid)
                .unwrap_or("?")
                .trim_end_matches('\0');
            info!(
                "WiFi [{}]: assoc=YES rssi={} ch={} ssid={}",
                label, ap_info.rssi, ap_info.primary, ssid
            );
        } else {
            info!("WiFi [{}]: assoc=NO (ap_info err={})", label, rc);
        }
    }
}

/// Up to five connect attempts with a full stop/start between them.
/// Returns the station IP once the netif is up, or `None` if every attempt
/// failed.
fn connect_with_retries(blocking: &mut BlockingWifi<&mut EspWifi<'static>>) -> Result<Option<String>> {
    let mut connected = false;
    for attempt in 1..=CONNECT_ATTEMPTS {
        let t0 = unsafe { esp_idf_sys::esp_timer_get_time() };
        let result = blocking.connect();
        let elapsed_ms = (unsafe { esp_idf_sys::esp_timer_get_time() } - t0) / 1000;
        match result {
            Ok(_) => {
                info!("WiFi connect OK on attempt {} ({}ms)", attempt, elapsed_ms);
                if debug_flags::is_on(&DEBUG_FEED) {
                    log_ap_info(&format!("attempt {}", attempt));
                }
                connected = true;
                break;
            }
            Err(e) => {
                warn!(
                    "WiFi connect attempt {}/{} failed after {}ms: {}",
                    attempt, CONNECT_ATTEMPTS, elapsed_ms, e
                );
                if attempt < CONNECT_ATTEMPTS {
                    let _ = blocking.disconnect();
                    blocking.stop().ok();
                    std::thread::sleep(std::time::Duration::from_millis(500));
                    blocking.start().ok();
                    std::thread::sleep(std::time::Duration::from_millis(300));
                }
            }
        }
    }
    if !connected {
        return Ok(None);
    }

    blocking.wait_netif_up()?;
    let ip_info = blocking.wifi().sta_netif().get_ip_info()?;
    info!("WiFi connected, IP: {}", ip_info.ip);
    Ok(Some(ip_info.ip.to_string()))
}

pub fn connect_wifi(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    ssid: &str,
    password: &str,
) -> Result<WifiLink> {
    let mut esp_wifi = Box::new(EspWifi::new(modem, sysloop.clone(), None)?);

    let auth = if password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };

    let mut wifi_ssid = heapless::String::<32>::new();
    let mut wifi_pass = heapless::String::<64>::new();
    if wifi_ssid.push_str(ssid).is_err() || wifi_pass.push_str(password).is_err() {
        anyhow::bail!("Wi-Fi SSID or password too long");
    }

    esp_wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: wifi_ssid,
        password: wifi_pass,
        auth_method: auth,
        ..Default::default()
    }))?;

    let ip_address = {
        let mut blocking = BlockingWifi::wrap(esp_wifi.as_mut(), sysloop)?;
        blocking.start()?;
        info!("WiFi connecting to '{}'...", ssid);
        connect_with_retries(&mut blocking)?
    };
    if ip_address.is_none() {
        warn!("WiFi failed after {} attempts; will retry later", CONNECT_ATTEMPTS);
    }

    Ok(WifiLink {
        wifi: esp_wifi,
        ip_address,
    })
}

/// Bring a dropped station link back up.
pub fn reconnect(link: &mut WifiLink, sysloop: EspSystemEventLoop) -> Result<bool> {
    let mut blocking = BlockingWifi::wrap(link.wifi.as_mut(), sysloop)?;
    let _ = blocking.start();
    let ip = connect_with_retries(&mut blocking)?;
    let up = ip.is_some();
    if up {
        link.ip_address = ip;
    }
    Ok(up)
}
