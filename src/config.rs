// NVS keys and level helpers are only reached with the `device` feature.
#![cfg_attr(not(feature = "device"), allow(dead_code))]

use crate::feed;

pub const NS: &str = "panel_cfg";

const KEY_WIFI_SSID: &str = "wifi_ssid";
const KEY_WIFI_PASS: &str = "wifi_pass";
const KEY_AIO_USER: &str = "aio_user";
const KEY_AIO_KEY: &str = "aio_key";
const KEY_FEED: &str = "aio_feed";
const KEY_BACKLIGHT: &str = "backlight";
const KEY_LED: &str = "led_bright";

pub const DEFAULT_FEED_KEY: &str = "rx";
pub const DEFAULT_BACKLIGHT: f32 = 0.7;
pub const DEFAULT_LED_BRIGHTNESS: f32 = 0.2;

/// Build-time fallback from `wifi.local.rs`, empty when absent.
fn local_default(value: Option<&'static str>) -> String {
    value.unwrap_or_default().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub aio_username: String,
    pub aio_key: String,
    pub feed_key: String,
    pub backlight: f32,
    pub led_brightness: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wifi_ssid: local_default(option_env!("LOCAL_WIFI_SSID")),
            wifi_pass: local_default(option_env!("LOCAL_WIFI_PASS")),
            aio_username: local_default(option_env!("LOCAL_AIO_USERNAME")),
            aio_key: local_default(option_env!("LOCAL_AIO_KEY")),
            feed_key: DEFAULT_FEED_KEY.to_string(),
            backlight: DEFAULT_BACKLIGHT,
            led_brightness: DEFAULT_LED_BRIGHTNESS,
        }
    }
}

impl Config {
    pub fn has_wifi(&self) -> bool {
        !self.wifi_ssid.is_empty()
    }

    pub fn has_feed(&self) -> bool {
        !self.aio_username.is_empty() && !self.aio_key.is_empty() && !self.feed_key.is_empty()
    }

    pub fn feed_url(&self) -> String {
        feed::last_data_url(&self.aio_username, &self.feed_key)
    }
}

/// `****abcd` for keys longer than four characters.
pub fn mask_secret(secret: &str) -> String {
    let n = secret.chars().count();
    if n <= 4 {
        return secret.to_string();
    }
    let tail: String = secret.chars().skip(n - 4).collect();
    format!("****{}", tail)
}

/// Levels are stored as whole percent.
fn level_to_pct(level: f32) -> u8 {
    (level.clamp(0.0, 1.0) * 100.0).round() as u8
}

fn pct_to_level(pct: u8) -> f32 {
    pct.min(100) as f32 / 100.0
}

#[cfg(feature = "device")]
mod nvs {
    use anyhow::Result;
    use esp_idf_svc::nvs::{EspNvs, NvsDefault};
    use log::info;

    use super::*;

    /// Read a string from NVS, returning None if the key is absent or on error.
    fn nvs_get_str(nvs: &EspNvs<NvsDefault>, key: &str) -> Option<String> {
        let len = match nvs.str_len(key) {
            Ok(Some(len)) => len,
            _ => return None,
        };

        let mut buf = vec![0u8; len];
        match nvs.get_str(key, &mut buf) {
            Ok(Some(val)) => {
                let s = val.trim_end_matches('\0').to_string();
                if s.is_empty() { None } else { Some(s) }
            }
            _ => None,
        }
    }

    impl Config {
        /// Load configuration from NVS, falling back to defaults for any
        /// missing keys.
        pub fn load(nvs: &EspNvs<NvsDefault>) -> Config {
            let defaults = Config::default();

            let wifi_ssid = nvs_get_str(nvs, KEY_WIFI_SSID).unwrap_or(defaults.wifi_ssid);
            info!("NVS wifi_ssid = {:?}", wifi_ssid);

            let wifi_pass = nvs_get_str(nvs, KEY_WIFI_PASS).unwrap_or(defaults.wifi_pass);
            info!("NVS wifi_pass = <{} chars>", wifi_pass.len());

            let aio_username = nvs_get_str(nvs, KEY_AIO_USER).unwrap_or(defaults.aio_username);
            info!("NVS aio_user = {:?}", aio_username);

            let aio_key = nvs_get_str(nvs, KEY_AIO_KEY).unwrap_or(defaults.aio_key);
            info!("NVS aio_key = <{} chars>", aio_key.len());

            let feed_key = nvs_get_str(nvs, KEY_FEED).unwrap_or(defaults.feed_key);
            info!("NVS aio_feed = {:?}", feed_key);

            let backlight = nvs
                .get_u8(KEY_BACKLIGHT)
                .unwrap_or(None)
                .map(pct_to_level)
                .unwrap_or(defaults.backlight);
            info!("NVS backlight = {:.2}", backlight);

            let led_brightness = nvs
                .get_u8(KEY_LED)
                .unwrap_or(None)
                .map(pct_to_level)
                .unwrap_or(defaults.led_brightness);
            info!("NVS led_bright = {:.2}", led_brightness);

            Config {
                wifi_ssid,
                wifi_pass,
                aio_username,
                aio_key,
                feed_key,
                backlight,
                led_brightness,
            }
        }

        pub fn save_wifi(nvs: &mut EspNvs<NvsDefault>, ssid: &str, pass: &str) -> Result<()> {
            nvs.set_str(KEY_WIFI_SSID, ssid)?;
            nvs.set_str(KEY_WIFI_PASS, pass)?;
            info!("NVS saved wifi_ssid={:?}", ssid);
            Ok(())
        }

        pub fn save_aio_username(nvs: &mut EspNvs<NvsDefault>, user: &str) -> Result<()> {
            nvs.set_str(KEY_AIO_USER, user)?;
            info!("NVS saved aio_user={:?}", user);
            Ok(())
        }

        pub fn save_aio_key(nvs: &mut EspNvs<NvsDefault>, key: &str) -> Result<()> {
            nvs.set_str(KEY_AIO_KEY, key)?;
            info!("NVS saved aio_key=<{} chars>", key.len());
            Ok(())
        }

        pub fn save_feed_key(nvs: &mut EspNvs<NvsDefault>, feed: &str) -> Result<()> {
            nvs.set_str(KEY_FEED, feed)?;
            info!("NVS saved aio_feed={:?}", feed);
            Ok(())
        }

        pub fn save_backlight(nvs: &mut EspNvs<NvsDefault>, level: f32) -> Result<()> {
            nvs.set_u8(KEY_BACKLIGHT, level_to_pct(level))?;
            info!("NVS saved backlight={}%", level_to_pct(level));
            Ok(())
        }

        pub fn save_led_brightness(nvs: &mut EspNvs<NvsDefault>, level: f32) -> Result<()> {
            nvs.set_u8(KEY_LED, level_to_pct(level))?;
            info!("NVS saved led_bright={}%", level_to_pct(level));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.feed_key, "rx");
        assert_eq!(c.backlight, 0.7);
        assert_eq!(c.led_brightness, 0.2);
    }

    #[test]
    fn feed_needs_user_key_and_feed() {
        let mut c = Config {
            aio_username: "picard".into(),
            aio_key: "aio_abc123".into(),
            ..Config::default()
        };
        assert!(c.has_feed());
        assert_eq!(c.feed_url(), "https://io.adafruit.com/api/v2/picard/feeds/rx/data/last");
        c.aio_key.clear();
        assert!(!c.has_feed());
    }

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask_secret("abc"), "abc");
        assert_eq!(mask_secret("aio_XYZ1234"), "****1234");
    }

    #[test]
    fn level_percent_round_trip() {
        assert_eq!(level_to_pct(0.7), 70);
        assert_eq!(level_to_pct(1.5), 100);
        assert_eq!(pct_to_level(20), 0.2);
        assert_eq!(pct_to_level(250), 1.0);
    }
}
