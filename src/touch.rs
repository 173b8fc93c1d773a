//! FT6206 capacitive touch: register decoding and press/release edges.

use embedded_graphics::prelude::Point;
use embedded_hal::i2c::I2c;
use log::{debug, info};

use crate::debug_flags::{self, DEBUG_TOUCH};
use crate::layout::{SCREEN_H, SCREEN_W};

/// FT6206 capacitive touch controller.
pub const FT6206_ADDR: u8 = 0x38;

/// TD_STATUS followed by P1_XH, P1_XL, P1_YH, P1_YL.
const REG_TD_STATUS: u8 = 0x02;
const REG_CHIP_ID: u8 = 0xA3;
const REG_THRESHOLD: u8 = 0x80;
const DEFAULT_THRESHOLD: u8 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchEdge {
    Pressed(Point),
    Released,
}

/// Decode the five bytes starting at TD_STATUS into raw portrait coordinates.
/// Returns `None` when no touch (or a garbage count) is reported.
pub fn parse_touch(data: &[u8; 5]) -> Option<(u16, u16)> {
    let num_points = data[0] & 0x0F;
    if num_points == 0 || num_points > 2 {
        return None;
    }
    let raw_x = (((data[1] & 0x0F) as u16) << 8) | data[2] as u16;
    let raw_y = (((data[3] & 0x0F) as u16) << 8) | data[4] as u16;
    Some((raw_x, raw_y))
}

/// Rotate from native portrait (240x320) to landscape (320x240).
pub fn to_landscape(raw_x: u16, raw_y: u16) -> Point {
    let lx = (raw_y as i32).clamp(0, SCREEN_W - 1);
    let ly = (SCREEN_H - 1 - raw_x as i32).clamp(0, SCREEN_H - 1);
    Point::new(lx, ly)
}

pub struct Ft6206 {
    addr: u8,
}

impl Ft6206 {
    /// Log the chip ID and set the touch threshold.
    pub fn init<I: I2c>(i2c: &mut I, addr: u8) -> Result<Self, I::Error> {
        let mut id = [0u8; 1];
        i2c.write_read(addr, &[REG_CHIP_ID], &mut id)?;
        info!("FT6206: chip id 0x{:02X}", id[0]);
        i2c.write(addr, &[REG_THRESHOLD, DEFAULT_THRESHOLD])?;
        Ok(Self { addr })
    }

    /// Current landscape touch point, if any.
    pub fn read<I: I2c>(&self, i2c: &mut I) -> Result<Option<Point>, I::Error> {
        let mut data = [0u8; 5];
        i2c.write_read(self.addr, &[REG_TD_STATUS], &mut data)?;
        Ok(parse_touch(&data).map(|(x, y)| to_landscape(x, y)))
    }
}

/// Turns a stream of touch samples into press/release edges.
pub struct TouchTracker {
    pressed: bool,
    last: Point,
    poll_count: u32,
    err_count: u32,
    touch_count: u32,
}

impl TouchTracker {
    pub fn new() -> Self {
        Self {
            pressed: false,
            last: Point::zero(),
            poll_count: 0,
            err_count: 0,
            touch_count: 0,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Feed one sample. Read errors should be passed as `None` after
    /// `record_error`, so a flaky bus ends a touch instead of sticking.
    pub fn update(&mut self, sample: Option<Point>) -> Option<TouchEdge> {
        self.poll_count += 1;

        // Stats every 50 polls
        if self.poll_count % 50 == 0 && debug_flags::is_on(&DEBUG_TOUCH) {
            info!(
                "TOUCH stats: polls={} errs={} touches={}",
                self.poll_count, self.err_count, self.touch_count
            );
        }

        match (sample, self.pressed) {
            (Some(p), false) => {
                self.pressed = true;
                self.touch_count += 1;
                self.last = p;
                debug!("TOUCH down at ({}, {})", p.x, p.y);
                Some(TouchEdge::Pressed(p))
            }
            (Some(p), true) => {
                self.last = p;
                None
            }
            (None, true) => {
                self.pressed = false;
                debug!("TOUCH up at ({}, {})", self.last.x, self.last.y);
                Some(TouchEdge::Released)
            }
            (None, false) => None,
        }
    }

    pub fn record_error(&mut self) {
        self.err_count += 1;
    }

    pub fn stats(&self) -> (u32, u32, u32) {
        (self.poll_count, self.err_count, self.touch_count)
    }
}

impl Default for TouchTracker {
    fn default() -> Self {
        Self::new()
    }
}
