//! Peripheral bring-up and thin drivers for the panel hardware.
//!
//! Wiring (ESP32-S3 DevKitC-1 with breakout parts):
//!
//! | Part              | Pins                                   |
//! |-------------------|----------------------------------------|
//! | ILI9341 (SPI2)    | SCLK 12, MOSI 11, CS 10, DC 9, RST 14  |
//! | Backlight (LEDC)  | 21                                     |
//! | I2C0              | SDA 8, SCL 7 (FT6206, ADT7410, LIDAR)  |
//! | WS2812 (RMT ch0)  | 48                                     |
//! | I2S0 amplifier    | BCLK 4, WS 5, DOUT 6                   |
//! | Light sensor      | 2 (ADC1)                               |

use std::sync::mpsc::{self, SyncSender};

use anyhow::{anyhow, bail, Context, Result};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::adc::ADC1;
use esp_idf_hal::delay::BLOCK;
use esp_idf_hal::gpio::{AnyOutputPin, Gpio2, Output, PinDriver};
use esp_idf_hal::i2s::{I2sDriver, I2sTx};
use esp_idf_hal::ledc::LedcDriver;
use esp_idf_hal::rmt::{FixedLengthSignal, PinState, Pulse, TxRmtDriver};
use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriver};
use log::{debug, info, warn};
use mipidsi::interface::SpiInterface;
use mipidsi::models::ILI9341Rgb565;

use subspace_panel::debug_flags::{self, DEBUG_SENSORS};
use subspace_panel::framebuffer::{Framebuffer, FB_HEIGHT, FB_WIDTH};
use subspace_panel::media::{backlight_duty, PixelOrder, Rgb, Sound, Wav};
use subspace_panel::sensors::light_percent;

pub const SPIFFS_BASE: &str = "/spiffs";
pub const AUDIO_SAMPLE_RATE: u32 = 22_050;

pub type PanelDisplay = mipidsi::Display<
    SpiInterface<
        'static,
        SpiDeviceDriver<'static, SpiDriver<'static>>,
        PinDriver<'static, AnyOutputPin, Output>,
    >,
    ILI9341Rgb565,
    PinDriver<'static, AnyOutputPin, Output>,
>;

pub fn esp_check(res: esp_idf_sys::esp_err_t, msg: &str) -> Result<()> {
    if res != esp_idf_sys::ESP_OK {
        Err(anyhow!("{} (err {})", msg, res))
    } else {
        Ok(())
    }
}

pub fn now_ms() -> u32 {
    unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u32 }
}

// ── Storage ─────────────────────────────────────────────────────────

/// Mount the `storage` SPIFFS partition holding `images/` and `sounds/`.
pub fn mount_spiffs() -> Result<()> {
    let conf = esp_idf_sys::esp_vfs_spiffs_conf_t {
        base_path: c"/spiffs".as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 4,
        format_if_mount_failed: false,
    };
    esp_check(
        unsafe { esp_idf_sys::esp_vfs_spiffs_register(&conf) },
        "esp_vfs_spiffs_register",
    )?;

    let mut total = 0usize;
    let mut used = 0usize;
    if unsafe { esp_idf_sys::esp_spiffs_info(core::ptr::null(), &mut total, &mut used) }
        == esp_idf_sys::ESP_OK
    {
        info!("SPIFFS mounted: {}/{} bytes used", used, total);
    }
    Ok(())
}

/// Read an asset by its relative path, e.g. `images/BGimage.bmp`.
pub fn read_asset(path: &str) -> Result<Vec<u8>> {
    let full = format!("{}/{}", SPIFFS_BASE, path);
    std::fs::read(&full).with_context(|| format!("reading {}", full))
}

// ── Display ─────────────────────────────────────────────────────────

/// Push the whole framebuffer to the panel in one window write.
pub fn flush(display: &mut PanelDisplay, fb: &Framebuffer) -> Result<()> {
    display
        .fill_contiguous(
            &Rectangle::new(Point::zero(), Size::new(FB_WIDTH, FB_HEIGHT)),
            fb.colors(),
        )
        .map_err(|e| anyhow!("display flush: {:?}", e))
}

pub struct Backlight {
    driver: LedcDriver<'static>,
}

impl Backlight {
    pub fn new(driver: LedcDriver<'static>, level: f32) -> Result<Self> {
        let mut bl = Self { driver };
        bl.set(level)?;
        Ok(bl)
    }

    pub fn set(&mut self, level: f32) -> Result<()> {
        let duty = backlight_duty(level, self.driver.get_max_duty());
        self.driver.set_duty(duty)?;
        info!("Backlight {:.2} (duty {})", level.clamp(0.0, 1.0), duty);
        Ok(())
    }
}

// ── Status LED ──────────────────────────────────────────────────────

/// Single WS2812 on an RMT channel.
pub struct StatusLed {
    tx: TxRmtDriver<'static>,
    order: PixelOrder,
    brightness: f32,
    color: Rgb,
}

impl StatusLed {
    pub fn new(tx: TxRmtDriver<'static>, order: PixelOrder, brightness: f32) -> Self {
        Self {
            tx,
            order,
            brightness,
            color: Rgb::BLACK,
        }
    }

    pub fn set_color(&mut self, color: Rgb) -> Result<()> {
        self.color = color;
        self.write(color.scaled(self.brightness).wire_word(self.order))
    }

    /// Change brightness and re-send the current colour.
    pub fn set_brightness(&mut self, brightness: f32) -> Result<()> {
        self.brightness = brightness.clamp(0.0, 1.0);
        self.set_color(self.color)
    }

    fn write(&mut self, word: u32) -> Result<()> {
        // WS2812 timing: T0H=0.35us, T0L=0.8us, T1H=0.7us, T1L=0.6us
        let ticks_hz = self.tx.counter_clock()?;
        let ns = core::time::Duration::from_nanos;
        let t0h = Pulse::new_with_duration(ticks_hz, PinState::High, &ns(350))?;
        let t0l = Pulse::new_with_duration(ticks_hz, PinState::Low, &ns(800))?;
        let t1h = Pulse::new_with_duration(ticks_hz, PinState::High, &ns(700))?;
        let t1l = Pulse::new_with_duration(ticks_hz, PinState::Low, &ns(600))?;

        let mut signal = FixedLengthSignal::<24>::new();
        for idx in 0..24 {
            let is_one = (word >> (23 - idx)) & 1 == 1;
            let pair = if is_one { (t1h, t1l) } else { (t0h, t0l) };
            signal.set(idx, &pair)?;
        }
        self.tx.start_blocking(&signal)?;
        Ok(())
    }
}

// ── Audio ───────────────────────────────────────────────────────────

pub struct Speaker {
    i2s: I2sDriver<'static, I2sTx>,
}

impl Speaker {
    pub fn new(mut i2s: I2sDriver<'static, I2sTx>) -> Result<Self> {
        i2s.tx_enable()?;
        Ok(Self { i2s })
    }

    /// Play a parsed clip to completion. The first channel is duplicated to
    /// both I2S slots.
    pub fn play(&mut self, wav: &Wav) -> Result<()> {
        if wav.sample_rate != AUDIO_SAMPLE_RATE {
            warn!(
                "WAV is {} Hz, I2S runs at {} Hz; pitch will be off",
                wav.sample_rate, AUDIO_SAMPLE_RATE
            );
        }
        let mut out = Vec::with_capacity(wav.frames() * 4);
        for s in wav.mono_i16() {
            let b = s.to_le_bytes();
            out.extend_from_slice(&[b[0], b[1], b[0], b[1]]);
        }
        let mut sent = 0;
        while sent < out.len() {
            sent += self.i2s.write(&out[sent..], BLOCK)?;
        }
        Ok(())
    }
}

fn play_sound(speaker: &mut Speaker, sound: Sound) -> Result<()> {
    let bytes = read_asset(sound.path())?;
    let wav = Wav::parse(&bytes)?;
    debug!("Playing {} ({} ms)", sound.path(), wav.duration_ms());
    speaker.play(&wav)
}

/// Audio runs on its own thread so playback never stalls touch polling.
/// Requests arriving while a clip plays are dropped once the queue is full.
pub fn spawn_audio(mut speaker: Speaker) -> Result<SyncSender<Sound>> {
    let (tx, rx) = mpsc::sync_channel::<Sound>(2);
    std::thread::Builder::new()
        .name("audio".into())
        .stack_size(8192)
        .spawn(move || {
            for sound in rx {
                if let Err(e) = play_sound(&mut speaker, sound) {
                    warn!("Sound {:?} failed: {}", sound, e);
                }
            }
        })?;
    Ok(tx)
}

// ── On-chip sensors ─────────────────────────────────────────────────

/// SoC die temperature, used when no ADT7410 answers.
pub struct CpuTemp {
    handle: esp_idf_sys::temperature_sensor_handle_t,
}

impl CpuTemp {
    pub fn new() -> Result<Self> {
        let cfg = esp_idf_sys::temperature_sensor_config_t {
            range_min: -10,
            range_max: 80,
            ..Default::default()
        };
        let mut handle: esp_idf_sys::temperature_sensor_handle_t = core::ptr::null_mut();
        esp_check(
            unsafe { esp_idf_sys::temperature_sensor_install(&cfg, &mut handle) },
            "temperature_sensor_install",
        )?;
        esp_check(
            unsafe { esp_idf_sys::temperature_sensor_enable(handle) },
            "temperature_sensor_enable",
        )?;
        Ok(Self { handle })
    }

    pub fn celsius(&self) -> Result<f32> {
        let mut c = 0.0f32;
        esp_check(
            unsafe { esp_idf_sys::temperature_sensor_get_celsius(self.handle, &mut c) },
            "temperature_sensor_get_celsius",
        )?;
        Ok(c)
    }
}

const ADC_MAX_RAW: u16 = 4095;

pub struct LightSensor {
    channel: AdcChannelDriver<'static, Gpio2, AdcDriver<'static, ADC1>>,
}

impl LightSensor {
    pub fn new(channel: AdcChannelDriver<'static, Gpio2, AdcDriver<'static, ADC1>>) -> Self {
        Self { channel }
    }

    pub fn percent(&mut self) -> Result<u8> {
        let raw = self.channel.read_raw()?;
        if raw > ADC_MAX_RAW {
            bail!("ADC raw value out of range: {}", raw);
        }
        if debug_flags::is_on(&DEBUG_SENSORS) {
            info!("Light ADC raw={}", raw);
        }
        Ok(light_percent(raw, ADC_MAX_RAW))
    }
}
