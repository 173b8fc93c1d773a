//! End-to-end flows through the host-testable panel logic.

use embedded_graphics::prelude::*;

use subspace_panel::buttons::ButtonId;
use subspace_panel::feed::parse_last;
use subspace_panel::framebuffer::{Framebuffer, FB_HEIGHT, FB_WIDTH};
use subspace_panel::layout::{BG_FALLBACK, TAB_FILL, TAB_SELECTED_FILL};
use subspace_panel::media::{ImageSlot, ImageStore, Rgb, Sound, SUBSPACE_GRAPHIC};
use subspace_panel::panel::{Effect, Panel, View};
use subspace_panel::render::draw_panel;
use subspace_panel::sensors::SensorSnapshot;
use subspace_panel::touch::{TouchEdge, TouchTracker};

fn centre_of(panel: &Panel, id: ButtonId) -> Point {
    let r = panel.buttons.get(id).rect;
    r.top_left + Point::new(r.size.width as i32 / 2, r.size.height as i32 / 2)
}

/// Drive a tap through the tracker the way the main loop does.
fn tap(panel: &mut Panel, tracker: &mut TouchTracker, p: Point) -> Vec<Effect> {
    let mut effects = Vec::new();
    for sample in [Some(p), Some(p), None] {
        match tracker.update(sample) {
            Some(TouchEdge::Pressed(at)) => effects.extend(panel.press(at)),
            Some(TouchEdge::Released) => effects.extend(panel.release()),
            None => {}
        }
    }
    effects
}

#[test]
fn tab_then_icon_then_sound() {
    let mut panel = Panel::new();
    let mut tracker = TouchTracker::new();

    let p = centre_of(&panel, ButtonId::Subspace);
    let effects = tap(&mut panel, &mut tracker, p);
    assert_eq!(panel.view, View::Subspace);
    assert_eq!(
        effects,
        vec![
            Effect::PlaySound(Sound::Tab),
            Effect::SetImage {
                slot: ImageSlot::Icon,
                path: SUBSPACE_GRAPHIC.to_string(),
            },
            Effect::SetLed(Rgb::RED),
        ]
    );

    let p = centre_of(&panel, ButtonId::Icon);
    let effects = tap(&mut panel, &mut tracker, p);
    assert_eq!(effects[0], Effect::PlaySound(Sound::Beep));
    assert!(matches!(
        &effects[1],
        Effect::SetImage { slot: ImageSlot::Icon, path } if path == "images/Gus.bmp"
    ));
    assert!(panel.icon_caption.text().contains("Say hi to Gus!"));

    // Sound lives on the sensors view only.
    let p = centre_of(&panel, ButtonId::Sound);
    assert!(tap(&mut panel, &mut tracker, p).is_empty());

    let p = centre_of(&panel, ButtonId::Sensors);
    tap(&mut panel, &mut tracker, p);
    let p = centre_of(&panel, ButtonId::Sound);
    assert_eq!(
        tap(&mut panel, &mut tracker, p),
        vec![Effect::PlaySound(Sound::Demo)]
    );
    assert_eq!(tracker.stats().2, 5);
}

#[test]
fn held_finger_fires_once() {
    let mut panel = Panel::new();
    let mut tracker = TouchTracker::new();
    let p = centre_of(&panel, ButtonId::Switch);

    let mut presses = 0;
    for _ in 0..20 {
        if let Some(TouchEdge::Pressed(at)) = tracker.update(Some(p)) {
            panel.press(at);
            presses += 1;
        }
    }
    assert_eq!(presses, 1);
    assert!(panel.switch_on);
    assert_eq!(panel.buttons.get(ButtonId::Switch).label, "ON");
}

#[test]
fn feed_record_reaches_handheld_view() {
    let mut panel = Panel::new();
    panel.dirty = false;

    let record = parse_last(r#"{"id":"0F7A","value":"Engage","created_at":"2024-01-01T00:00:00Z"}"#)
        .unwrap();
    assert!(panel.apply_feed(&record));
    assert!(panel.dirty);
    assert_eq!(panel.feed_value.text(), "Engage");

    // Same record again is not new and changes nothing.
    panel.dirty = false;
    assert!(!panel.apply_feed(&record));
    assert!(!panel.dirty);
}

#[test]
fn sensor_readout_only_redraws_sensors_view() {
    let mut panel = Panel::new();
    panel.dirty = false;
    let snap = SensorSnapshot {
        distance_cm: Some(42),
        temp_c: Some(25.0),
        light_pct: Some(60),
    };
    panel.apply_reading(&snap);
    assert!(!panel.dirty);
    assert!(panel.sensor_data.text().contains("42 cm"));

    panel.switch_view(View::Sensors);
    panel.dirty = false;
    panel.apply_reading(&SensorSnapshot {
        distance_cm: Some(43),
        ..snap
    });
    assert!(panel.dirty);
}

#[test]
fn render_after_tab_switch() {
    let mut panel = Panel::new();
    let mut tracker = TouchTracker::new();
    let p = centre_of(&panel, ButtonId::Sensors);
    tap(&mut panel, &mut tracker, p);

    let mut fb = Framebuffer::new(FB_WIDTH, FB_HEIGHT);
    draw_panel(&mut fb, &panel, &ImageStore::new());

    // Handheld tab is now dimmed, sensors tab is the active one.
    assert_eq!(fb.pixel(5, 5), Some(TAB_SELECTED_FILL));
    assert_eq!(fb.pixel(2 * 106 + 5, 5), Some(TAB_FILL));
    // Big buttons are hidden here.
    assert_eq!(fb.pixel(5, 230), Some(BG_FALLBACK));
}
