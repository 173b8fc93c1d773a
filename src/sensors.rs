//! ADT7410 temperature and LIDAR-Lite v3 distance over I2C, plus the
//! snapshot the sensors view renders.
//!
//! Drivers borrow the bus per call so one `I2c` can be shared with the touch
//! controller.

use core::fmt;

use embedded_hal::i2c::I2c;
use log::{debug, info, warn};

use crate::debug_flags::{self, DEBUG_SENSORS};
use crate::feed::should_warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The bus transaction failed.
    Bus,
    /// Nothing answering with the expected ID.
    NotFound,
    /// The device stayed busy past the poll limit.
    Busy,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Bus => write!(f, "I2C bus error"),
            SensorError::NotFound => write!(f, "device not found"),
            SensorError::Busy => write!(f, "device busy"),
        }
    }
}

impl std::error::Error for SensorError {}

// ── ADT7410 ─────────────────────────────────────────────────────────

pub const ADT7410_ADDR: u8 = 0x48;

const ADT_REG_TEMP: u8 = 0x00;
const ADT_REG_CONFIG: u8 = 0x03;
const ADT_REG_ID: u8 = 0x0B;
const ADT_ID_MASK: u8 = 0xF8;
const ADT_ID_VALUE: u8 = 0xC8;
const ADT_CONFIG_16BIT: u8 = 0x80;

#[derive(Debug)]
pub struct Adt7410 {
    addr: u8,
    high_resolution: bool,
}

impl Adt7410 {
    /// Check the manufacturer ID. A NACK reads as `NotFound`.
    pub fn probe<I: I2c>(i2c: &mut I, addr: u8) -> Result<Self, SensorError> {
        let mut id = [0u8; 1];
        i2c.write_read(addr, &[ADT_REG_ID], &mut id)
            .map_err(|_| SensorError::NotFound)?;
        if id[0] & ADT_ID_MASK != ADT_ID_VALUE {
            debug!("ADT7410: unexpected id 0x{:02X} at 0x{:02X}", id[0], addr);
            return Err(SensorError::NotFound);
        }
        Ok(Self {
            addr,
            high_resolution: false,
        })
    }

    pub fn high_resolution(&self) -> bool {
        self.high_resolution
    }

    pub fn set_high_resolution<I: I2c>(&mut self, i2c: &mut I, on: bool) -> Result<(), SensorError> {
        let mut cfg = [0u8; 1];
        i2c.write_read(self.addr, &[ADT_REG_CONFIG], &mut cfg)
            .map_err(|_| SensorError::Bus)?;
        let new = if on {
            cfg[0] | ADT_CONFIG_16BIT
        } else {
            cfg[0] & !ADT_CONFIG_16BIT
        };
        i2c.write(self.addr, &[ADT_REG_CONFIG, new])
            .map_err(|_| SensorError::Bus)?;
        self.high_resolution = on;
        Ok(())
    }

    pub fn temperature_c<I: I2c>(&self, i2c: &mut I) -> Result<f32, SensorError> {
        let mut buf = [0u8; 2];
        i2c.write_read(self.addr, &[ADT_REG_TEMP], &mut buf)
            .map_err(|_| SensorError::Bus)?;
        let raw = i16::from_be_bytes(buf);
        let c = if self.high_resolution {
            raw as f32 / 128.0
        } else {
            (raw >> 3) as f32 / 16.0
        };
        if debug_flags::is_on(&DEBUG_SENSORS) {
            debug!("ADT7410 raw=0x{:04X} -> {:.2} C", raw as u16, c);
        }
        Ok(c)
    }
}

// ── LIDAR-Lite v3 ───────────────────────────────────────────────────

pub const LIDAR_LITE_ADDR: u8 = 0x62;

const LL_REG_ACQ_COMMAND: u8 = 0x00;
const LL_REG_STATUS: u8 = 0x01;
/// 0x0F with the auto-increment bit set, so one read returns both bytes.
const LL_REG_DISTANCE: u8 = 0x8F;
const LL_MEASURE_BIAS: u8 = 0x04;
const LL_MEASURE: u8 = 0x03;
const LL_STATUS_BUSY: u8 = 0x01;
/// A receiver bias correction is taken every this many measurements.
const LL_BIAS_EVERY: u16 = 100;
const LL_MAX_POLLS: u16 = 1000;

#[derive(Debug)]
pub struct LidarLite {
    addr: u8,
    max_polls: u16,
    until_bias: u16,
}

impl LidarLite {
    pub fn new(addr: u8) -> Self {
        Self {
            addr,
            max_polls: LL_MAX_POLLS,
            until_bias: 0,
        }
    }

    pub fn with_max_polls(mut self, max_polls: u16) -> Self {
        self.max_polls = max_polls.max(1);
        self
    }

    /// Trigger one acquisition and return the distance in centimetres.
    pub fn distance_cm<I: I2c>(&mut self, i2c: &mut I) -> Result<u16, SensorError> {
        let command = if self.until_bias == 0 {
            self.until_bias = LL_BIAS_EVERY;
            LL_MEASURE_BIAS
        } else {
            LL_MEASURE
        };
        self.until_bias -= 1;

        i2c.write(self.addr, &[LL_REG_ACQ_COMMAND, command])
            .map_err(|_| SensorError::Bus)?;

        let mut status = [0u8; 1];
        for _ in 0..self.max_polls {
            i2c.write_read(self.addr, &[LL_REG_STATUS], &mut status)
                .map_err(|_| SensorError::Bus)?;
            if status[0] & LL_STATUS_BUSY == 0 {
                let mut buf = [0u8; 2];
                i2c.write_read(self.addr, &[LL_REG_DISTANCE], &mut buf)
                    .map_err(|_| SensorError::Bus)?;
                let cm = u16::from_be_bytes(buf);
                if debug_flags::is_on(&DEBUG_SENSORS) {
                    debug!("LIDAR cmd=0x{:02X} -> {} cm", command, cm);
                }
                return Ok(cm);
            }
        }
        Err(SensorError::Busy)
    }
}

// ── Readings ────────────────────────────────────────────────────────

pub fn celsius_to_kelvin(c: f32) -> f32 {
    c + 273.15
}

/// Raw ADC reading as a 0..=100 percentage of `max_raw`.
pub fn light_percent(raw: u16, max_raw: u16) -> u8 {
    if max_raw == 0 {
        return 0;
    }
    (raw.min(max_raw) as u32 * 100 / max_raw as u32) as u8
}

/// Latest good value per sensor; `None` means never read.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSnapshot {
    pub distance_cm: Option<u16>,
    pub temp_c: Option<f32>,
    pub light_pct: Option<u8>,
}

/// Consecutive failed reads per sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorFailures {
    pub distance: u32,
    pub temp: u32,
    pub light: u32,
}

fn merge<T, E: fmt::Display>(
    name: &str,
    slot: &mut Option<T>,
    failures: &mut u32,
    read: Result<T, E>,
) {
    match read {
        Ok(v) => {
            if *failures > 0 {
                info!("{} recovered after {} failed reads", name, failures);
            }
            *failures = 0;
            *slot = Some(v);
        }
        Err(e) => {
            *failures = failures.saturating_add(1);
            if should_warn(*failures) {
                warn!("{} read failed ({} in a row): {}", name, failures, e);
            } else {
                debug!("{} read failed: {}", name, e);
            }
        }
    }
}

impl SensorSnapshot {
    /// Fold one round of reads in. A failed read keeps the last good value.
    pub fn record<E1, E2, E3>(
        &mut self,
        failures: &mut SensorFailures,
        distance: Result<u16, E1>,
        temp: Result<f32, E2>,
        light: Result<u8, E3>,
    ) where
        E1: fmt::Display,
        E2: fmt::Display,
        E3: fmt::Display,
    {
        merge("LIDAR", &mut self.distance_cm, &mut failures.distance, distance);
        merge("Temperature", &mut self.temp_c, &mut failures.temp, temp);
        merge("Light sensor", &mut self.light_pct, &mut failures.light, light);
    }

    /// Text for the sensors view. Missing values show as `--`.
    pub fn readout(&self) -> String {
        let distance = self
            .distance_cm
            .map(|d| d.to_string())
            .unwrap_or_else(|| "--".to_string());
        let kelvin = self
            .temp_c
            .map(|c| format!("{:.2}", celsius_to_kelvin(c)))
            .unwrap_or_else(|| "--".to_string());
        let light = self
            .light_pct
            .map(|l| format!("{}%", l))
            .unwrap_or_else(|| "--".to_string());
        format!(
            "OBJ DISTANCE:\n{} cm\n\nUNIT TEMP:\n{} K\n\nLIGHT: {}",
            distance, kelvin, light
        )
    }
}
