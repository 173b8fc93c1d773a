//! Touchscreen control panel: three views, sensor readouts, a network feed,
//! sound cues and a status LED.
//!
//! Everything here is target-independent so it can be unit tested on the
//! host. The firmware binary owns the ESP-IDF peripherals and calls into
//! these modules.

pub mod buttons;
pub mod config;
pub mod console;
pub mod debug_flags;
pub mod feed;
pub mod framebuffer;
pub mod layout;
pub mod media;
pub mod panel;
pub mod render;
pub mod sensors;
pub mod text;
pub mod touch;
