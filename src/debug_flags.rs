use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Global debug flags toggled via console.
/// When a flag is true, the module logs at info! level instead of being silent.
pub static DEBUG_TOUCH: AtomicBool = AtomicBool::new(false);
pub static DEBUG_SENSORS: AtomicBool = AtomicBool::new(false);
pub static DEBUG_FEED: AtomicBool = AtomicBool::new(false);

/// Request slots: console stores a value, main loop takes it.
/// `NO_REQUEST` marks an empty slot (an f32 NaN pattern no caller produces).
const NO_REQUEST: u32 = u32::MAX;
pub static REQUEST_BACKLIGHT: AtomicU32 = AtomicU32::new(NO_REQUEST);
pub static REQUEST_LED_BRIGHTNESS: AtomicU32 = AtomicU32::new(NO_REQUEST);

pub fn is_on(flag: &AtomicBool) -> bool {
    flag.load(Ordering::Relaxed)
}

pub fn set(flag: &AtomicBool, val: bool) {
    flag.store(val, Ordering::Relaxed);
}

pub fn toggle(flag: &AtomicBool) -> bool {
    let old = flag.load(Ordering::Relaxed);
    flag.store(!old, Ordering::Relaxed);
    !old
}

pub fn set_all(val: bool) {
    for flag in [&DEBUG_TOUCH, &DEBUG_SENSORS, &DEBUG_FEED] {
        set(flag, val);
    }
}

pub fn request(slot: &AtomicU32, value: f32) {
    slot.store(value.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
}

pub fn take_request(slot: &AtomicU32) -> Option<f32> {
    match slot.swap(NO_REQUEST, Ordering::Relaxed) {
        NO_REQUEST => None,
        bits => Some(f32::from_bits(bits)),
    }
}

pub fn status_line() -> String {
    format!(
        "touch={} sensors={} feed={}",
        if is_on(&DEBUG_TOUCH) { "ON" } else { "off" },
        if is_on(&DEBUG_SENSORS) { "ON" } else { "off" },
        if is_on(&DEBUG_FEED) { "ON" } else { "off" },
    )
}
