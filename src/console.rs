//! Serial console: command parsing (host-testable) and, on the device, the
//! stdin reader thread that applies commands to NVS and the live config.

#[derive(Debug, Clone, PartialEq)]
pub enum DebugTarget {
    Touch,
    Sensors,
    Feed,
    All,
    Show,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Empty,
    Help,
    Status,
    Reboot,
    WifiShow,
    WifiSet { ssid: String, pass: String },
    WifiClear,
    AioShow,
    AioSetUser(String),
    AioSetKey(String),
    AioSetFeed(String),
    Backlight(f32),
    Led(f32),
    Debug(DebugTarget),
    /// A known command with bad arguments; carries the usage line.
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    /// Wi-Fi credentials are only read at boot. Feed settings are re-read on
    /// every poll and apply immediately.
    pub fn needs_reboot(&self) -> bool {
        matches!(self, Command::WifiSet { .. } | Command::WifiClear)
    }
}

pub const HELP: &[&str] = &[
    "commands:",
    "  wifi show                  - show Wi-Fi config",
    "  wifi set <ssid> <pass>     - set Wi-Fi credentials",
    "  wifi clear                 - clear Wi-Fi override",
    "  aio show                   - show Adafruit IO config",
    "  aio set-user <name>        - set Adafruit IO username",
    "  aio set-key <key>          - set Adafruit IO key",
    "  aio set-feed <feed>        - set feed key (default rx)",
    "  backlight <0..1|N%>        - set display backlight",
    "  led <0..1|N%>              - set status LED brightness",
    "  debug <module>             - toggle debug for module",
    "    modules: touch, sensors, feed, all",
    "  debug show                 - show debug flag status",
    "  status                     - show system status",
    "  reboot                     - reboot device",
];

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"').trim_matches('\'')
}

/// `0.5` or `50%`, within 0..=1 once scaled.
pub fn parse_level(s: &str) -> Option<f32> {
    let s = s.trim();
    let v = match s.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().ok()? / 100.0,
        None => s.parse::<f32>().ok()?,
    };
    (0.0..=1.0).contains(&v).then_some(v)
}

pub fn parse(line: &str) -> Command {
    let clean = line.trim().trim_end_matches('\\');
    if clean.is_empty() {
        return Command::Empty;
    }
    let mut parts = clean.splitn(3, char::is_whitespace);
    let cmd = parts.next().unwrap_or("");
    let sub = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    match cmd {
        "help" | "?" => Command::Help,
        "status" => Command::Status,
        "reboot" => Command::Reboot,
        "wifi" => match sub {
            "show" | "" => Command::WifiShow,
            "set" => {
                let (ssid, pass) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let ssid = unquote(ssid);
                if ssid.is_empty() {
                    return Command::Usage("usage: wifi set <ssid> <password>");
                }
                Command::WifiSet {
                    ssid: ssid.to_string(),
                    pass: unquote(pass).to_string(),
                }
            }
            "clear" => Command::WifiClear,
            _ => Command::Usage("usage: wifi show|set <ssid> <pass>|clear"),
        },
        "aio" => {
            let arg = unquote(rest);
            match sub {
                "show" | "" => Command::AioShow,
                "set-user" if !arg.is_empty() => Command::AioSetUser(arg.to_string()),
                "set-key" if !arg.is_empty() => Command::AioSetKey(arg.to_string()),
                "set-feed" if !arg.is_empty() => Command::AioSetFeed(arg.to_string()),
                _ => Command::Usage("usage: aio show|set-user <name>|set-key <key>|set-feed <feed>"),
            }
        }
        "backlight" => match parse_level(sub) {
            Some(v) => Command::Backlight(v),
            None => Command::Usage("usage: backlight <0..1|N%>"),
        },
        "led" => match parse_level(sub) {
            Some(v) => Command::Led(v),
            None => Command::Usage("usage: led <0..1|N%>"),
        },
        "debug" => match sub {
            "show" | "" => Command::Debug(DebugTarget::Show),
            "touch" => Command::Debug(DebugTarget::Touch),
            "sensors" | "sensor" | "lidar" | "temp" => Command::Debug(DebugTarget::Sensors),
            "feed" | "aio" => Command::Debug(DebugTarget::Feed),
            "all" => Command::Debug(DebugTarget::All),
            _ => Command::Usage("unknown module. options: touch, sensors, feed, all"),
        },
        other => Command::Unknown(other.to_string()),
    }
}

/// Toggle the selected flag(s); `all` turns everything on unless it already is.
pub fn apply_debug(target: &DebugTarget) -> String {
    use crate::debug_flags::*;
    let on_off = |on: bool| if on { "ON" } else { "OFF" };
    match target {
        DebugTarget::Show => format!("debug: {}", status_line()),
        DebugTarget::Touch => format!("debug touch: {}", on_off(toggle(&DEBUG_TOUCH))),
        DebugTarget::Sensors => format!("debug sensors: {}", on_off(toggle(&DEBUG_SENSORS))),
        DebugTarget::Feed => format!("debug feed: {}", on_off(toggle(&DEBUG_FEED))),
        DebugTarget::All => {
            let any_off = !is_on(&DEBUG_TOUCH) || !is_on(&DEBUG_SENSORS) || !is_on(&DEBUG_FEED);
            set_all(any_off);
            format!("debug all: {}", on_off(any_off))
        }
    }
}

#[cfg(feature = "device")]
pub use device::spawn_console;

#[cfg(feature = "device")]
mod device {
    use anyhow::Result;
    use esp_idf_svc::nvs::{EspNvs, NvsDefault};
    use log::{info, warn};
    use std::io::{self, Read};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::config::{mask_secret, Config};
    use crate::debug_flags::{self, REQUEST_BACKLIGHT, REQUEST_LED_BRIGHTNESS};

    pub fn spawn_console(
        nvs: Arc<Mutex<EspNvs<NvsDefault>>>,
        config: Arc<Mutex<Config>>,
    ) -> Result<()> {
        std::thread::Builder::new()
            .name("console".into())
            .stack_size(8192)
            .spawn(move || {
                info!("console: ready (type 'help')");
                let stdin = io::stdin();
                let mut reader = stdin.lock();
                let mut line = String::new();
                let mut buf = [0u8; 1];
                let mut in_escape = false;
                loop {
                    match reader.read(&mut buf) {
                        Ok(1) => {
                            let ch = buf[0];
                            if in_escape {
                                if (ch as char).is_ascii_alphabetic() || ch == b'~' {
                                    in_escape = false;
                                }
                                continue;
                            }
                            if ch == 0x1b {
                                in_escape = true;
                                continue;
                            }
                            if ch == b'\n' || ch == b'\r' {
                                if line.is_empty() {
                                    continue;
                                }
                                info!("> {}", line);
                                if let Err(e) = execute(parse(&line), &nvs, &config) {
                                    warn!("console: error: {}", e);
                                }
                                line.clear();
                            } else if ch == 0x7f || ch == 0x08 {
                                line.pop();
                            } else if ch >= 0x20 {
                                line.push(ch as char);
                            }
                        }
                        Ok(_) => std::thread::sleep(std::time::Duration::from_millis(50)),
                        Err(_) => std::thread::sleep(std::time::Duration::from_millis(100)),
                    }
                }
            })?;
        Ok(())
    }

    fn execute(
        cmd: Command,
        nvs: &Arc<Mutex<EspNvs<NvsDefault>>>,
        config: &Arc<Mutex<Config>>,
    ) -> Result<()> {
        let reboot_hint = cmd.needs_reboot();
        match cmd {
            Command::Empty => {}
            Command::Help => HELP.iter().for_each(|l| info!("{}", l)),
            Command::Status => {
                let cfg = config.lock().unwrap();
                info!("wifi: {}", if cfg.has_wifi() { cfg.wifi_ssid.as_str() } else { "not configured" });
                info!("aio user: {}", cfg.aio_username);
                info!("aio key: {} ({} chars)", mask_secret(&cfg.aio_key), cfg.aio_key.len());
                info!("aio feed: {}", cfg.feed_key);
                info!("backlight: {:.2}  led: {:.2}", cfg.backlight, cfg.led_brightness);
                let heap_kb = unsafe { esp_idf_sys::esp_get_free_heap_size() } / 1024;
                info!("free heap: {} KB", heap_kb);
                info!("debug: {}", debug_flags::status_line());
            }
            Command::Reboot => {
                info!("console: rebooting now");
                std::thread::sleep(std::time::Duration::from_millis(100));
                unsafe { esp_idf_sys::esp_restart() };
            }
            Command::WifiShow => {
                let cfg = config.lock().unwrap();
                info!("wifi ssid: {}", cfg.wifi_ssid);
                let pass_len = cfg.wifi_pass.len();
                info!(
                    "wifi pass: {} ({} chars)",
                    if pass_len == 0 { "<empty>" } else { "********" },
                    pass_len
                );
            }
            Command::WifiSet { ssid, pass } => {
                Config::save_wifi(&mut nvs.lock().unwrap(), &ssid, &pass)?;
                let mut cfg = config.lock().unwrap();
                cfg.wifi_ssid = ssid.clone();
                cfg.wifi_pass = pass.clone();
                info!("saved: SSID='{}' pass=******** ({} chars)", ssid, pass.len());
            }
            Command::WifiClear => {
                Config::save_wifi(&mut nvs.lock().unwrap(), "", "")?;
                let mut cfg = config.lock().unwrap();
                cfg.wifi_ssid.clear();
                cfg.wifi_pass.clear();
                info!("Wi-Fi override cleared");
            }
            Command::AioShow => {
                let cfg = config.lock().unwrap();
                info!("aio user: {}", cfg.aio_username);
                info!("aio key: {} ({} chars)", mask_secret(&cfg.aio_key), cfg.aio_key.len());
                info!("aio feed: {}", cfg.feed_key);
                info!("aio url: {}", cfg.feed_url());
            }
            Command::AioSetUser(user) => {
                Config::save_aio_username(&mut nvs.lock().unwrap(), &user)?;
                config.lock().unwrap().aio_username = user;
                info!("feed uses it from the next poll");
            }
            Command::AioSetKey(key) => {
                Config::save_aio_key(&mut nvs.lock().unwrap(), &key)?;
                info!("saved: aio key='{}' ({} chars)", mask_secret(&key), key.len());
                config.lock().unwrap().aio_key = key;
                info!("feed uses it from the next poll");
            }
            Command::AioSetFeed(feed) => {
                Config::save_feed_key(&mut nvs.lock().unwrap(), &feed)?;
                config.lock().unwrap().feed_key = feed;
                info!("feed uses it from the next poll");
            }
            Command::Backlight(v) => {
                Config::save_backlight(&mut nvs.lock().unwrap(), v)?;
                config.lock().unwrap().backlight = v;
                debug_flags::request(&REQUEST_BACKLIGHT, v);
                info!("backlight: {:.2}", v);
            }
            Command::Led(v) => {
                Config::save_led_brightness(&mut nvs.lock().unwrap(), v)?;
                config.lock().unwrap().led_brightness = v;
                debug_flags::request(&REQUEST_LED_BRIGHTNESS, v);
                info!("led brightness: {:.2}", v);
            }
            Command::Debug(target) => info!("{}", apply_debug(&target)),
            Command::Usage(usage) => info!("{}", usage),
            Command::Unknown(cmd) => warn!("console: unknown command '{}' (type 'help')", cmd),
        }
        if reboot_hint {
            info!("type 'reboot' to apply");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_commands() {
        assert_eq!(parse("  "), Command::Empty);
        assert_eq!(parse("help"), Command::Help);
        assert_eq!(parse("?"), Command::Help);
        assert_eq!(parse("status\\"), Command::Status);
        assert_eq!(parse("reboot"), Command::Reboot);
        assert_eq!(parse("warp 9"), Command::Unknown("warp".into()));
    }

    #[test]
    fn wifi_set_strips_quotes_and_keeps_spaces_in_password() {
        assert_eq!(
            parse("wifi set \"Enterprise\" 'make it so'"),
            Command::WifiSet {
                ssid: "Enterprise".into(),
                pass: "make it so".into()
            }
        );
        assert_eq!(
            parse("wifi set OpenNet"),
            Command::WifiSet {
                ssid: "OpenNet".into(),
                pass: String::new()
            }
        );
        assert!(matches!(parse("wifi set"), Command::Usage(_)));
        assert_eq!(parse("wifi"), Command::WifiShow);
        assert_eq!(parse("wifi clear"), Command::WifiClear);
    }

    #[test]
    fn only_wifi_changes_wait_for_reboot() {
        assert!(parse("wifi set Enterprise engage").needs_reboot());
        assert!(parse("wifi clear").needs_reboot());
        assert!(!parse("aio set-user picard").needs_reboot());
        assert!(!parse("aio set-key aio_1701").needs_reboot());
        assert!(!parse("aio set-feed rx").needs_reboot());
        assert!(!parse("backlight 50%").needs_reboot());
    }

    #[test]
    fn aio_commands() {
        assert_eq!(parse("aio show"), Command::AioShow);
        assert_eq!(parse("aio set-user picard"), Command::AioSetUser("picard".into()));
        assert_eq!(parse("aio set-key 'aio_123'"), Command::AioSetKey("aio_123".into()));
        assert_eq!(parse("aio set-feed rx"), Command::AioSetFeed("rx".into()));
        assert!(matches!(parse("aio set-key"), Command::Usage(_)));
    }

    #[test]
    fn levels() {
        assert_eq!(parse("backlight 0.5"), Command::Backlight(0.5));
        assert_eq!(parse("backlight 25%"), Command::Backlight(0.25));
        assert_eq!(parse("led 1"), Command::Led(1.0));
        assert!(matches!(parse("backlight 2"), Command::Usage(_)));
        assert!(matches!(parse("led bright"), Command::Usage(_)));
        assert_eq!(parse_level("-0.1"), None);
    }

    #[test]
    fn debug_targets() {
        assert_eq!(parse("debug"), Command::Debug(DebugTarget::Show));
        assert_eq!(parse("debug touch"), Command::Debug(DebugTarget::Touch));
        assert_eq!(parse("debug lidar"), Command::Debug(DebugTarget::Sensors));
        assert_eq!(parse("debug feed"), Command::Debug(DebugTarget::Feed));
        assert_eq!(parse("debug all"), Command::Debug(DebugTarget::All));
        assert!(matches!(parse("debug imu"), Command::Usage(_)));
    }

    #[test]
    fn apply_debug_show_reports_flags() {
        assert!(apply_debug(&DebugTarget::Show).starts_with("debug: touch="));
    }
}
