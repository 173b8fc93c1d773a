mod board;
mod http_client;
mod wifi;

use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{AnyIOPin, AnyInputPin, OutputPin, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::i2s::config::{DataBitWidth, StdConfig};
use esp_idf_hal::i2s::{I2sDriver, I2sTx};
use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_hal::rmt::{config::TransmitConfig, TxRmtDriver};
use esp_idf_hal::spi::{config::Config as SpiConfig, SpiDeviceDriver, SpiDriverConfig, MODE_0};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};
use log::{info, warn};
use mipidsi::interface::SpiInterface;
use mipidsi::models::ILI9341Rgb565;
use mipidsi::options::{ColorOrder, Orientation, Rotation};
use mipidsi::Builder;

use subspace_panel::config::{self, Config};
use subspace_panel::console;
use subspace_panel::debug_flags::{self, DEBUG_FEED, DEBUG_SENSORS, REQUEST_BACKLIGHT, REQUEST_LED_BRIGHTNESS};
use subspace_panel::feed::{self, FeedRecord};
use subspace_panel::framebuffer::{Framebuffer, FB_HEIGHT, FB_WIDTH};
use subspace_panel::media::{self, ImageSlot, ImageStore, PixelOrder, Sound};
use subspace_panel::panel::{Effect, Panel};
use subspace_panel::render;
use subspace_panel::sensors::{self, Adt7410, LidarLite, SensorFailures, SensorSnapshot};
use subspace_panel::touch::{self, Ft6206, TouchEdge, TouchTracker};

use board::{Backlight, CpuTemp, LightSensor, Speaker, StatusLed};

// ── Display ─────────────────────────────────────────────────────────
const SPI_BAUD_MHZ: u32 = 40;
const DISPLAY_BUFFER_BYTES: usize = 512;

// ── I2C ──────────────────────────────────────────────────────────────
const I2C_FREQ_HZ: u32 = 100_000;

// ── LED ──────────────────────────────────────────────────────────────
const LED_ORDER: PixelOrder = PixelOrder::Rgb;

// ── Timing ──────────────────────────────────────────────────────────
const TICK_MS: u64 = 20;
const SENSOR_INTERVAL_MS: u32 = 1_000;
const FEED_INTERVAL_SECS: u64 = 10;
const FEED_RETRY_SECS: u64 = 30;
const WIFI_RETRY_INTERVAL_MS: u32 = 300_000;

fn load_image(images: &mut ImageStore, slot: ImageSlot, path: &str) {
    match board::read_asset(path).and_then(|bytes| images.set(slot, bytes)) {
        Ok(()) => info!("Loaded {}", path),
        Err(e) => {
            warn!("Image {} unavailable: {}", path, e);
            images.clear(slot);
        }
    }
}

fn request_sound(audio: Option<&SyncSender<Sound>>, sound: Sound) {
    if let Some(tx) = audio {
        if tx.try_send(sound).is_err() {
            info!("Audio busy, dropping {:?}", sound);
        }
    }
}

/// Side effects produced by the panel's touch handling.
fn run_effects(
    effects: Vec<Effect>,
    images: &mut ImageStore,
    led: Option<&mut StatusLed>,
    audio: Option<&SyncSender<Sound>>,
) -> bool {
    let mut led = led;
    let mut redraw = false;
    for effect in effects {
        match effect {
            Effect::PlaySound(sound) => request_sound(audio, sound),
            Effect::SetLed(color) => {
                if let Some(led) = led.as_deref_mut() {
                    if let Err(e) = led.set_color(color) {
                        warn!("LED write failed: {}", e);
                    }
                }
            }
            Effect::SetImage { slot, path } => {
                load_image(images, slot, &path);
                redraw = true;
            }
        }
    }
    redraw
}

fn spawn_feed_thread(cfg: Arc<Mutex<Config>>, latest: Arc<Mutex<Option<FeedRecord>>>) -> Result<()> {
    std::thread::Builder::new()
        .name("feed".into())
        .stack_size(16384)
        .spawn(move || {
            let mut consecutive_failures: u32 = 0;
            loop {
                let (user, key, feed_key) = {
                    let c = cfg.lock().unwrap();
                    (c.aio_username.clone(), c.aio_key.clone(), c.feed_key.clone())
                };
                if user.is_empty() || key.is_empty() {
                    std::thread::sleep(Duration::from_secs(FEED_RETRY_SECS));
                    continue;
                }
                match http_client::fetch_last(&user, &key, &feed_key) {
                    Ok(record) => {
                        if debug_flags::is_on(&DEBUG_FEED) {
                            info!("Feed {}: id={} value={:?}", feed_key, record.id, record.value);
                        }
                        consecutive_failures = 0;
                        *latest.lock().unwrap() = Some(record);
                        std::thread::sleep(Duration::from_secs(FEED_INTERVAL_SECS));
                    }
                    Err(e) => {
                        consecutive_failures = consecutive_failures.saturating_add(1);
                        if feed::should_warn(consecutive_failures) {
                            warn!("Feed fetch failed ({} consecutive): {}", consecutive_failures, e);
                        } else {
                            info!("Feed fetch failed ({} consecutive)", consecutive_failures);
                        }
                        std::thread::sleep(Duration::from_secs(FEED_RETRY_SECS));
                    }
                }
            }
        })?;
    Ok(())
}

fn main() -> Result<()> {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("BOOT subspace panel v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 1. Storage ──
    if let Err(e) = board::mount_spiffs() {
        warn!("SPIFFS unavailable, running without images and sounds: {}", e);
    }

    // ── 2. NVS config ──
    let nvs = EspNvs::new(nvs_partition, config::NS, true)?;
    let cfg = Config::load(&nvs);

    // ── 3. Display + backlight + loading splash ──
    let spi = SpiDeviceDriver::new_single(
        peripherals.spi2,
        pins.gpio12,
        pins.gpio11,
        Option::<AnyInputPin>::None,
        Some(pins.gpio10),
        &SpiDriverConfig::new(),
        &SpiConfig::new().baudrate(SPI_BAUD_MHZ.MHz().into()).data_mode(MODE_0),
    )?;
    let dc = PinDriver::output(pins.gpio9.downgrade_output())?;
    let rst = PinDriver::output(pins.gpio14.downgrade_output())?;
    let buffer: &'static mut [u8] = Box::leak(Box::new([0u8; DISPLAY_BUFFER_BYTES]));
    let di = SpiInterface::new(spi, dc, buffer);
    let mut display: board::PanelDisplay = Builder::new(ILI9341Rgb565, di)
        .reset_pin(rst)
        .display_size(FB_HEIGHT as u16, FB_WIDTH as u16)
        .orientation(Orientation {
            rotation: Rotation::Deg90,
            mirrored: true,
        })
        .color_order(ColorOrder::Bgr)
        .init(&mut Ets)
        .map_err(|e| anyhow!("display init: {:?}", e))?;
    info!("ILI9341 ready ({}x{})", FB_WIDTH, FB_HEIGHT);

    let mut fb = Framebuffer::new(FB_WIDTH, FB_HEIGHT);
    let mut images = ImageStore::new();
    load_image(&mut images, ImageSlot::Background, media::LOADING_IMAGE);
    render::draw_splash(&mut fb, &images, "Starting...");
    board::flush(&mut display, &fb)?;

    let ledc_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new().frequency(Hertz(5_000)),
    )?;
    let ledc = LedcDriver::new(peripherals.ledc.channel0, ledc_timer, pins.gpio21)?;
    let mut backlight = Backlight::new(ledc, cfg.backlight)?;

    // ── 4. Console ──
    let nvs = Arc::new(Mutex::new(nvs));
    let cfg = Arc::new(Mutex::new(cfg));
    console::spawn_console(nvs.clone(), cfg.clone())?;

    // ── 5. I2C bus: touch, temperature, distance ──
    let i2c_config = I2cConfig::new().baudrate(Hertz(I2C_FREQ_HZ));
    let mut i2c = I2cDriver::new(peripherals.i2c0, pins.gpio8, pins.gpio7, &i2c_config)?;

    let touch_ctl = match Ft6206::init(&mut i2c, touch::FT6206_ADDR) {
        Ok(t) => Some(t),
        Err(e) => {
            warn!("FT6206 touch controller not found: {:?}", e);
            None
        }
    };
    let mut tracker = TouchTracker::new();

    let adt = match Adt7410::probe(&mut i2c, sensors::ADT7410_ADDR) {
        Ok(mut adt) => {
            if let Err(e) = adt.set_high_resolution(&mut i2c, true) {
                warn!("ADT7410 resolution: {}", e);
            }
            info!("ADT7410 ready");
            Some(adt)
        }
        Err(e) => {
            warn!("ADT7410 unavailable ({}), using SoC temperature", e);
            None
        }
    };
    let cpu_temp = if adt.is_none() {
        CpuTemp::new()
            .map_err(|e| warn!("SoC temperature sensor: {}", e))
            .ok()
    } else {
        None
    };
    let mut lidar = LidarLite::new(sensors::LIDAR_LITE_ADDR);

    // ── 6. Light sensor, LED, audio ──
    let adc = AdcDriver::new(peripherals.adc1)?;
    let adc_cfg = AdcChannelConfig {
        attenuation: DB_11,
        ..Default::default()
    };
    let mut light = LightSensor::new(AdcChannelDriver::new(adc, pins.gpio2, &adc_cfg)?);

    let mut led = match TxRmtDriver::new(
        peripherals.rmt.channel0,
        pins.gpio48,
        &TransmitConfig::new().clock_divider(2),
    ) {
        Ok(tx) => Some(StatusLed::new(tx, LED_ORDER, cfg.lock().unwrap().led_brightness)),
        Err(e) => {
            warn!("Status LED unavailable: {}", e);
            None
        }
    };

    let i2s_cfg = StdConfig::philips(board::AUDIO_SAMPLE_RATE, DataBitWidth::Bits16);
    let audio = I2sDriver::<I2sTx>::new_std_tx(
        peripherals.i2s0,
        &i2s_cfg,
        pins.gpio4,
        pins.gpio6,
        Option::<AnyIOPin>::None,
        pins.gpio5,
    )
    .map_err(anyhow::Error::from)
    .and_then(Speaker::new)
    .and_then(board::spawn_audio)
    .map_err(|e| warn!("Audio unavailable: {}", e))
    .ok();

    // ── 7. WiFi + feed thread ──
    let (wifi_ssid, wifi_pass, feed_ready) = {
        let c = cfg.lock().unwrap();
        (c.wifi_ssid.clone(), c.wifi_pass.clone(), c.has_feed())
    };
    let mut wifi_link = if !wifi_ssid.is_empty() {
        render::draw_splash(&mut fb, &images, &format!("Connecting to '{}'...", wifi_ssid));
        board::flush(&mut display, &fb)?;
        match wifi::connect_wifi(peripherals.modem, sysloop.clone(), &wifi_ssid, &wifi_pass) {
            Ok(link) => {
                let status = match link.ip_address.as_deref() {
                    Some(ip) => format!("Connected, IP {}", ip),
                    None => "WiFi not connected, retrying later".to_string(),
                };
                render::draw_splash(&mut fb, &images, &status);
                board::flush(&mut display, &fb)?;
                Some(link)
            }
            Err(e) => {
                warn!("WiFi failed: {}", e);
                None
            }
        }
    } else {
        warn!("No WiFi SSID configured (use console: wifi set <ssid> <pass>)");
        None
    };

    let feed_data: Arc<Mutex<Option<FeedRecord>>> = Arc::new(Mutex::new(None));
    if wifi_link.is_some() {
        if !feed_ready {
            warn!("No Adafruit IO credentials (use console: aio user/key)");
        }
        spawn_feed_thread(cfg.clone(), feed_data.clone())?;
    }

    // ── 8. Panel ──
    load_image(&mut images, ImageSlot::Background, media::BACKGROUND_IMAGE);
    let mut panel = Panel::new();
    if let Some(led) = led.as_mut() {
        led.set_color(panel.view.led()).ok();
    }

    let mut snapshot = SensorSnapshot::default();
    let mut sensor_failures = SensorFailures::default();
    let mut last_sensor_ms = board::now_ms().wrapping_sub(SENSOR_INTERVAL_MS);
    let mut last_wifi_retry_ms = board::now_ms();

    loop {
        let t = board::now_ms();

        // Touch
        if let Some(ref ft) = touch_ctl {
            let sample = match ft.read(&mut i2c) {
                Ok(sample) => sample,
                Err(_) => {
                    tracker.record_error();
                    None
                }
            };
            match tracker.update(sample) {
                Some(TouchEdge::Pressed(p)) => {
                    let effects = panel.press(p);
                    run_effects(effects, &mut images, led.as_mut(), audio.as_ref());
                }
                Some(TouchEdge::Released) => {
                    let effects = panel.release();
                    if run_effects(effects, &mut images, led.as_mut(), audio.as_ref()) {
                        panel.dirty = true;
                    }
                }
                None => {}
            }
        }

        // Sensors
        if t.wrapping_sub(last_sensor_ms) >= SENSOR_INTERVAL_MS {
            last_sensor_ms = t;
            let distance = lidar.distance_cm(&mut i2c);
            let temp = match (adt.as_ref(), cpu_temp.as_ref()) {
                (Some(adt), _) => adt.temperature_c(&mut i2c).map_err(anyhow::Error::from),
                (None, Some(cpu)) => cpu.celsius(),
                (None, None) => Err(anyhow!("no temperature source")),
            };
            snapshot.record(&mut sensor_failures, distance, temp, light.percent());
            if debug_flags::is_on(&DEBUG_SENSORS) {
                info!("Sensors: {:?}", snapshot);
            }
            panel.apply_reading(&snapshot);
        }

        // Feed records from the background thread
        if let Ok(mut fd) = feed_data.try_lock() {
            if let Some(record) = fd.take() {
                panel.apply_feed(&record);
            }
        }

        // Console level requests
        if let Some(level) = debug_flags::take_request(&REQUEST_BACKLIGHT) {
            if let Err(e) = backlight.set(level) {
                warn!("Backlight: {}", e);
            }
        }
        if let Some(level) = debug_flags::take_request(&REQUEST_LED_BRIGHTNESS) {
            if let Some(led) = led.as_mut() {
                if let Err(e) = led.set_brightness(level) {
                    warn!("LED brightness: {}", e);
                }
            }
        }

        // Retry WiFi association every 5 minutes while disconnected.
        if t.wrapping_sub(last_wifi_retry_ms) >= WIFI_RETRY_INTERVAL_MS {
            last_wifi_retry_ms = t;
            if let Some(link) = wifi_link.as_mut() {
                if !link.is_up() {
                    info!("WiFi retry window reached; attempting reconnect...");
                    match wifi::reconnect(link, sysloop.clone()) {
                        Ok(true) => info!(
                            "WiFi back up, IP {}",
                            link.ip_address.as_deref().unwrap_or("?")
                        ),
                        Ok(false) => info!("WiFi reconnect did not succeed; retrying in 5 minutes"),
                        Err(e) => warn!("WiFi reconnect error: {}", e),
                    }
                }
            }
        }

        // Redraw if needed
        if panel.dirty {
            render::draw_panel(&mut fb, &panel, &images);
            if let Err(e) = board::flush(&mut display, &fb) {
                warn!("{}", e);
            }
            panel.dirty = false;
        }

        std::thread::sleep(Duration::from_millis(TICK_MS));
    }
}
