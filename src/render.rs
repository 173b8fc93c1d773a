//! Compose the whole panel into a framebuffer.

use embedded_graphics::{
    image::Image,
    mono_font::MonoTextStyle,
    prelude::*,
    primitives::{CornerRadii, PrimitiveStyleBuilder, Rectangle, RoundedRectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use profont::PROFONT_12_POINT;

use crate::buttons::{Button, ButtonStyle};
use crate::framebuffer::Framebuffer;
use crate::layout::*;
use crate::media::{ImageSlot, ImageStore};
use crate::panel::{Panel, View};
use crate::text::TextBox;

pub fn draw_panel(fb: &mut Framebuffer, panel: &Panel, images: &ImageStore) {
    // 1. Background
    match images.get(ImageSlot::Background) {
        Some(bmp) => {
            fb.clear_color(BG_FALLBACK);
            Image::new(&bmp, Point::zero()).draw(fb).ok();
        }
        None => fb.clear_color(BG_FALLBACK),
    }

    // 2. Visible view
    match panel.view {
        View::Handheld => {
            draw_text_box(fb, &panel.title);
            draw_text_box(fb, &panel.feed_value);
        }
        View::Subspace => {
            if let Some(bmp) = images.get(ImageSlot::Icon) {
                Image::new(&bmp, Point::new(ICON_X, ICON_Y)).draw(fb).ok();
            }
            draw_text_box(fb, &panel.icon_caption);
        }
        View::Sensors => draw_text_box(fb, &panel.sensor_data),
    }

    // 3. Buttons on top
    for b in panel.buttons.visible(panel.view) {
        draw_button(fb, b);
    }
}

/// Full-screen bitmap, used for the loading splash before the panel exists.
pub fn draw_splash(fb: &mut Framebuffer, images: &ImageStore, status: &str) {
    fb.clear_color(BG_FALLBACK);
    if let Some(bmp) = images.get(ImageSlot::Background) {
        Image::new(&bmp, Point::zero()).draw(fb).ok();
    }
    Text::with_alignment(
        status,
        Point::new(SCREEN_W / 2, SCREEN_H - 12),
        MonoTextStyle::new(&PROFONT_12_POINT, TEXT_FEED),
        Alignment::Center,
    )
    .draw(fb)
    .ok();
}

fn draw_text_box(fb: &mut Framebuffer, tb: &TextBox) {
    let style = MonoTextStyle::new(&LABEL_FONT, tb.color);
    for (i, line) in tb.lines().iter().enumerate() {
        Text::with_baseline(
            line,
            Point::new(tb.x, tb.y + i as i32 * LINE_HEIGHT),
            style,
            Baseline::Top,
        )
        .draw(fb)
        .ok();
    }
}

fn draw_button(fb: &mut Framebuffer, b: &Button) {
    let (fill, outline, label) = b.colors.resolve(b.selected);
    let style = PrimitiveStyleBuilder::new()
        .fill_color(fill)
        .stroke_color(outline)
        .stroke_width(1)
        .build();

    match b.style {
        ButtonStyle::Rect => {
            b.rect.into_styled(style).draw(fb).ok();
        }
        ButtonStyle::RoundRect => {
            RoundedRectangle::new(b.rect, CornerRadii::new(Size::new(BUTTON_RADIUS, BUTTON_RADIUS)))
                .into_styled(style)
                .draw(fb)
                .ok();
        }
    }

    let text_style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    Text::with_text_style(
        &b.label,
        center(&b.rect),
        MonoTextStyle::new(&PROFONT_12_POINT, label),
        text_style,
    )
    .draw(fb)
    .ok();
}

fn center(r: &Rectangle) -> Point {
    r.top_left + Point::new(r.size.width as i32 / 2, r.size.height as i32 / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons::ButtonId;
    use crate::framebuffer::{FB_HEIGHT, FB_WIDTH};
    use crate::media::tests::solid_bmp;

    fn fb() -> Framebuffer {
        Framebuffer::new(FB_WIDTH, FB_HEIGHT)
    }

    #[test]
    fn missing_background_uses_fallback_colour() {
        let mut f = fb();
        draw_panel(&mut f, &Panel::new(), &ImageStore::new());
        assert_eq!(f.pixel(300, 120), Some(BG_FALLBACK));
    }

    #[test]
    fn background_image_is_drawn_under_everything() {
        let mut images = ImageStore::new();
        images
            .set(ImageSlot::Background, solid_bmp(320, 240, [0, 0, 255]))
            .unwrap();
        let mut f = fb();
        draw_panel(&mut f, &Panel::new(), &images);
        assert_eq!(f.pixel(300, 120), Some(hex(0x0000FF)));
    }

    #[test]
    fn tabs_show_selection_colours() {
        let mut f = fb();
        let panel = Panel::new();
        draw_panel(&mut f, &panel, &ImageStore::new());
        // Interior pixels away from the centred label.
        assert_eq!(f.pixel(5, 5), Some(TAB_FILL));
        assert_eq!(f.pixel(110, 5), Some(TAB_SELECTED_FILL));
        assert_eq!(f.pixel(0, 0), Some(TAB_OUTLINE));
    }

    #[test]
    fn icon_only_drawn_on_subspace_view() {
        let mut images = ImageStore::new();
        images
            .set(ImageSlot::Icon, solid_bmp(20, 20, [255, 0, 0]))
            .unwrap();
        let mut panel = Panel::new();

        let mut f = fb();
        draw_panel(&mut f, &panel, &images);
        assert_eq!(f.pixel(ICON_X + 5, ICON_Y + 5), Some(BG_FALLBACK));

        panel.switch_view(View::Subspace);
        draw_panel(&mut f, &panel, &images);
        assert_eq!(f.pixel(ICON_X + 5, ICON_Y + 5), Some(hex(0xFF0000)));
    }

    #[test]
    fn view_buttons_follow_view() {
        let mut panel = Panel::new();
        panel.switch_view(View::Sensors);
        let mut f = fb();
        draw_panel(&mut f, &panel, &ImageStore::new());
        let sound = panel.buttons.get(ButtonId::Sound).rect;
        assert_eq!(
            f.pixel(sound.top_left.x + 40, sound.top_left.y + 3),
            Some(ROUND_FILL)
        );
        // Big buttons are hidden on view 3.
        assert_eq!(f.pixel(10, 230), Some(BG_FALLBACK));
    }

    #[test]
    fn text_box_lines_step_by_line_height() {
        let mut f = fb();
        f.clear_color(BG_FALLBACK);
        let tb = TextBox::new(0, 0, TEXT_FEED, "M\nM");
        draw_text_box(&mut f, &tb);
        let lit = |y0: i32| {
            (y0..y0 + LINE_HEIGHT).any(|y| (0..10).any(|x| f.pixel(x, y) == Some(TEXT_FEED)))
        };
        assert!(lit(0));
        assert!(lit(LINE_HEIGHT));
    }

    fn right_edge(tb: &TextBox) -> i32 {
        let style = MonoTextStyle::new(&LABEL_FONT, tb.color);
        tb.lines()
            .iter()
            .map(|line| {
                let bb = Text::with_baseline(line, Point::new(tb.x, tb.y), style, Baseline::Top)
                    .bounding_box();
                bb.top_left.x + bb.size.width as i32
            })
            .max()
            .unwrap_or(tb.x)
    }

    #[test]
    fn captions_stay_on_screen_for_every_icon() {
        let mut panel = Panel::new();
        assert!(right_edge(&panel.title) <= SCREEN_W);
        assert!(right_edge(&panel.icon_caption) <= SCREEN_W);

        let tab = center(&panel.buttons.get(ButtonId::Subspace).rect);
        panel.press(tab);
        let icon = center(&panel.buttons.get(ButtonId::Icon).rect);
        for _ in 0..3 {
            panel.press(icon);
            panel.release();
            assert!(panel.icon_caption.lines().len() > 1);
            assert!(
                right_edge(&panel.icon_caption) <= SCREEN_W,
                "caption for {:?} runs off screen",
                panel.icon
            );
        }
    }

    #[test]
    fn sensor_readout_clears_the_sound_button() {
        let mut panel = Panel::new();
        panel.apply_reading(&crate::sensors::SensorSnapshot {
            distance_cm: Some(999),
            temp_c: Some(-40.5),
            light_pct: Some(100),
        });
        let sound = panel.buttons.get(ButtonId::Sound).rect;
        let tb = &panel.sensor_data;
        let bottom = tb.y + tb.lines().len() as i32 * LINE_HEIGHT;
        assert!(bottom <= SCREEN_H);
        // Lines that reach down to the button stay left of it.
        let style = MonoTextStyle::new(&LABEL_FONT, tb.color);
        for (i, line) in tb.lines().iter().enumerate() {
            let top = tb.y + i as i32 * LINE_HEIGHT;
            if top + LINE_HEIGHT > sound.top_left.y {
                let bb = Text::with_baseline(line, Point::new(tb.x, top), style, Baseline::Top)
                    .bounding_box();
                assert!(bb.top_left.x + (bb.size.width as i32) <= sound.top_left.x);
            }
        }
    }
}
