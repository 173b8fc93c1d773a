use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::pixelcolor::Rgb565;
use profont::PROFONT_14_POINT;

/// Convert 8-bit RGB to Rgb565.
pub const fn rgb(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

/// Convert a packed 0xRRGGBB colour to Rgb565.
pub const fn hex(c: u32) -> Rgb565 {
    rgb((c >> 16) as u8, (c >> 8) as u8, c as u8)
}

// ── Screen ──────────────────────────────────────────────────────────

pub const SCREEN_W: i32 = 320;
pub const SCREEN_H: i32 = 240;

// ── Buttons ─────────────────────────────────────────────────────────

/// Three tabs across the top of the screen.
pub const TABS_HEIGHT: i32 = 40;
pub const TABS_WIDTH: i32 = SCREEN_W / 3;
pub const TABS_Y: i32 = 0;

/// Two big buttons along the bottom (height is screen / 3.2, truncated).
pub const BIG_BUTTON_HEIGHT: i32 = SCREEN_H * 10 / 32;
pub const BIG_BUTTON_WIDTH: i32 = SCREEN_W / 2;
pub const BIG_BUTTON_Y: i32 = SCREEN_H - BIG_BUTTON_HEIGHT;

pub const BUTTON_WIDTH: i32 = 80;
pub const BUTTON_HEIGHT: i32 = 40;
pub const BUTTON_RADIUS: u32 = 10;

// ── Labels ──────────────────────────────────────────────────────────

/// Font of every text box. Line pitch and wrap widths follow its cell size.
pub const LABEL_FONT: MonoFont<'static> = PROFONT_14_POINT;
pub const CHAR_WIDTH: i32 =
    (LABEL_FONT.character_size.width + LABEL_FONT.character_spacing) as i32;
pub const LINE_HEIGHT: i32 = LABEL_FONT.character_size.height as i32;

pub const LABEL_X: i32 = 5;
pub const LABEL_Y: i32 = 50;
pub const TITLE_X: i32 = LABEL_X + 20;

pub const FEED_VALUE_X: i32 = LABEL_X + 15;
pub const FEED_VALUE_Y: i32 = 120;
pub const SENSOR_DATA_X: i32 = LABEL_X + 15;
pub const SENSOR_DATA_Y: i32 = 65;
pub const ICON_X: i32 = 15;
pub const ICON_Y: i32 = 35;
pub const ICON_CAPTION_Y: i32 = 110;

/// Wrap widths (characters) for the text boxes.
pub const TITLE_WRAP: usize = ((SCREEN_W - TITLE_X) / CHAR_WIDTH) as usize;
pub const CAPTION_WRAP: usize = 18;
/// Right-aligned so a full caption line ends at the screen edge.
pub const ICON_CAPTION_X: i32 = SCREEN_W - CAPTION_WRAP as i32 * CHAR_WIDTH;

// ── Colours ─────────────────────────────────────────────────────────

/// Shown when the background bitmap is missing.
pub const BG_FALLBACK: Rgb565 = rgb(8, 10, 16);

pub const TEXT_SENSOR: Rgb565 = hex(0x03AD31);
pub const TEXT_FEED: Rgb565 = hex(0xFFFFFF);

pub const TAB_LABEL: Rgb565 = hex(0xFF7E00);
pub const TAB_FILL: Rgb565 = hex(0x5C5B5C);
pub const TAB_OUTLINE: Rgb565 = hex(0x767676);
pub const TAB_SELECTED_FILL: Rgb565 = hex(0x1A1A1A);
pub const TAB_SELECTED_OUTLINE: Rgb565 = hex(0x2E2E2E);
pub const TAB_SELECTED_LABEL: Rgb565 = hex(0x525252);

pub const ROUND_LABEL: Rgb565 = hex(0xFFFFFF);
pub const ROUND_FILL: Rgb565 = hex(0x8900FF);
pub const ROUND_OUTLINE: Rgb565 = hex(0xBC55FD);
pub const ROUND_SELECTED_FILL: Rgb565 = hex(0x5A5A5A);
pub const ROUND_SELECTED_OUTLINE: Rgb565 = hex(0xFF6600);
pub const ROUND_SELECTED_LABEL: Rgb565 = hex(0x525252);
