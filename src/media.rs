//! Sounds, bitmaps, the status LED colour and the backlight.

use anyhow::{anyhow, bail, Result};
use embedded_graphics::pixelcolor::Rgb565;
use tinybmp::Bmp;

// ── Assets ──────────────────────────────────────────────────────────

/// Shown from power-on until the main loop starts.
pub const LOADING_IMAGE: &str = "images/loading.bmp";
pub const BACKGROUND_IMAGE: &str = "images/BGimage.bmp";
pub const SUBSPACE_GRAPHIC: &str = "images/Sensor-graphic-subspace.bmp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Demo,
    Beep,
    Tab,
}

impl Sound {
    pub fn path(self) -> &'static str {
        match self {
            Sound::Demo => "sounds/sound.wav",
            Sound::Beep => "sounds/beep.wav",
            Sound::Tab => "sounds/tab.wav",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Background,
    Icon,
}

/// Raw BMP bytes per slot, validated on insert and decoded at draw time.
#[derive(Debug, Default)]
pub struct ImageStore {
    background: Option<Vec<u8>>,
    icon: Option<Vec<u8>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the image in `slot`. On a parse error the slot is left empty.
    pub fn set(&mut self, slot: ImageSlot, bytes: Vec<u8>) -> Result<()> {
        let entry = self.slot_mut(slot);
        *entry = None;
        Bmp::<Rgb565>::from_slice(&bytes).map_err(|e| anyhow!("bad bitmap: {:?}", e))?;
        *entry = Some(bytes);
        Ok(())
    }

    pub fn clear(&mut self, slot: ImageSlot) {
        *self.slot_mut(slot) = None;
    }

    pub fn get(&self, slot: ImageSlot) -> Option<Bmp<'_, Rgb565>> {
        let bytes = match slot {
            ImageSlot::Background => self.background.as_deref(),
            ImageSlot::Icon => self.icon.as_deref(),
        }?;
        Bmp::from_slice(bytes).ok()
    }

    fn slot_mut(&mut self, slot: ImageSlot) -> &mut Option<Vec<u8>> {
        match slot {
            ImageSlot::Background => &mut self.background,
            ImageSlot::Icon => &mut self.icon,
        }
    }
}

// ── WAV ─────────────────────────────────────────────────────────────

/// A PCM WAV file borrowed from its backing bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wav<'a> {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub data: &'a [u8],
}

impl<'a> Wav<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            bail!("not a RIFF/WAVE file");
        }

        let mut fmt: Option<(u16, u32, u16)> = None;
        let mut data: Option<&[u8]> = None;
        let mut pos = 12usize;

        while pos + 8 <= bytes.len() {
            let id = &bytes[pos..pos + 4];
            let len = u32::from_le_bytes([bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]])
                as usize;
            let body = pos + 8;
            // Truncated trailing chunks are clipped rather than rejected.
            let end = body.saturating_add(len).min(bytes.len());

            match id {
                b"fmt " => {
                    if end - body < 16 {
                        bail!("fmt chunk too short ({} bytes)", end - body);
                    }
                    let b = &bytes[body..end];
                    let format = u16::from_le_bytes([b[0], b[1]]);
                    if format != 1 {
                        bail!("unsupported WAV format {} (PCM only)", format);
                    }
                    let channels = u16::from_le_bytes([b[2], b[3]]);
                    let rate = u32::from_le_bytes([b[4], b[5], b[6], b[7]]);
                    let bits = u16::from_le_bytes([b[14], b[15]]);
                    fmt = Some((channels, rate, bits));
                }
                b"data" => data = Some(&bytes[body..end]),
                _ => {}
            }

            // Chunks are word aligned.
            pos = body.saturating_add(len).saturating_add(len & 1);
        }

        let (channels, sample_rate, bits_per_sample) = fmt.ok_or_else(|| anyhow!("missing fmt chunk"))?;
        let data = data.ok_or_else(|| anyhow!("missing data chunk"))?;
        if channels == 0 || !matches!(bits_per_sample, 8 | 16) {
            bail!("unsupported layout: {} ch, {} bit", channels, bits_per_sample);
        }

        Ok(Self {
            channels,
            sample_rate,
            bits_per_sample,
            data,
        })
    }

    pub fn frames(&self) -> usize {
        self.data.len() / (self.channels as usize * (self.bits_per_sample as usize / 8))
    }

    pub fn duration_ms(&self) -> u32 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frames() as u64 * 1000 / self.sample_rate as u64) as u32
    }

    /// First channel as signed 16-bit samples. 8-bit PCM is unsigned and is
    /// re-centred.
    pub fn mono_i16(&self) -> Vec<i16> {
        let step = self.channels as usize * (self.bits_per_sample as usize / 8);
        self.data
            .chunks_exact(step)
            .map(|frame| match self.bits_per_sample {
                8 => ((frame[0] as i16) - 128) << 8,
                _ => i16::from_le_bytes([frame[0], frame[1]]),
            })
            .collect()
    }
}

// ── Status LED ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const YELLOW: Rgb = Rgb::new(255, 150, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const PURPLE: Rgb = Rgb::new(180, 0, 255);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    /// Scale every channel by `brightness` (clamped to 0..=1).
    pub fn scaled(self, brightness: f32) -> Self {
        let k = brightness.clamp(0.0, 1.0);
        let s = |c: u8| (c as f32 * k + 0.5) as u8;
        Self::new(s(self.r), s(self.g), s(self.b))
    }

    /// 24-bit word in the order the LED shifts it in, MSB first.
    pub fn wire_word(self, order: PixelOrder) -> u32 {
        let (a, b, c) = match order {
            PixelOrder::Rgb => (self.r, self.g, self.b),
            PixelOrder::Grb => (self.g, self.r, self.b),
        };
        ((a as u32) << 16) | ((b as u32) << 8) | c as u32
    }

    pub fn to_grb_word(self) -> u32 {
        self.wire_word(PixelOrder::Grb)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOrder {
    Rgb,
    Grb,
}

// ── Backlight ───────────────────────────────────────────────────────

/// PWM duty for a backlight level in 0.0..=1.0 (out-of-range values clamp).
pub fn backlight_duty(value: f32, max_duty: u32) -> u32 {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    (v * max_duty as f32).round() as u32
}
