//! Panel state: which view is up, the button states, the labels, and what
//! a tap does.
//!
//! Touch handling never touches hardware. `press` and `release` return the
//! side effects in order and the caller runs them.

use embedded_graphics::prelude::Point;
use log::{debug, info};

use crate::buttons::{ButtonId, ButtonSet};
use crate::feed::FeedRecord;
use crate::layout::*;
use crate::media::{ImageSlot, Rgb, Sound, SUBSPACE_GRAPHIC};
use crate::sensors::SensorSnapshot;
use crate::text::TextBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Handheld = 1,
    Subspace = 2,
    Sensors = 3,
}

impl View {
    pub const ALL: [View; 3] = [View::Handheld, View::Subspace, View::Sensors];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn tab(self) -> ButtonId {
        match self {
            View::Handheld => ButtonId::Handheld,
            View::Subspace => ButtonId::Subspace,
            View::Sensors => ButtonId::Sensors,
        }
    }

    /// LED colour shown while the view is up.
    pub fn led(self) -> Rgb {
        match self {
            View::Handheld => Rgb::GREEN,
            View::Subspace => Rgb::RED,
            View::Sensors => Rgb::BLUE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Ruby = 1,
    Gus = 2,
    Billie = 3,
}

impl Icon {
    fn from_number(n: u8) -> Self {
        match n {
            2 => Icon::Gus,
            3 => Icon::Billie,
            _ => Icon::Ruby,
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Icon::Ruby => "Ruby",
            Icon::Gus => "Gus",
            Icon::Billie => "Billie",
        }
    }

    pub fn image_path(self) -> String {
        format!("images/{}.bmp", self.name())
    }

    pub fn next(self) -> Self {
        Icon::from_number(number_up(self.number(), 3))
    }
}

/// Cycle `1..=max`.
pub fn number_up(n: u8, max: u8) -> u8 {
    if n < max {
        n + 1
    } else {
        1
    }
}

/// LED colour for a momentary-button mode.
pub fn mode_color(mode: u8) -> Rgb {
    match mode {
        1 => Rgb::RED,
        2 => Rgb::YELLOW,
        3 => Rgb::GREEN,
        4 => Rgb::BLUE,
        _ => Rgb::PURPLE,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PlaySound(Sound),
    SetLed(Rgb),
    SetImage { slot: ImageSlot, path: String },
}

pub type Effects = Vec<Effect>;

pub struct Panel {
    pub view: View,
    pub icon: Icon,
    pub button_mode: u8,
    pub switch_on: bool,
    pub buttons: ButtonSet,
    pub title: TextBox,
    pub feed_value: TextBox,
    pub icon_caption: TextBox,
    pub sensor_data: TextBox,
    last_feed_id: Option<String>,
    held: Option<ButtonId>,
    pub dirty: bool,
}

impl Panel {
    pub fn new() -> Self {
        let mut title = TextBox::new(TITLE_X, LABEL_Y, TEXT_SENSOR, "");
        title.wrap(LABEL_Y, "Star Fleet Computer", TITLE_WRAP);
        let mut icon_caption = TextBox::new(ICON_CAPTION_X, ICON_CAPTION_Y, TEXT_FEED, "");
        icon_caption.wrap(ICON_CAPTION_Y, "SubSpace Data", CAPTION_WRAP);

        let mut panel = Self {
            view: View::Handheld,
            icon: Icon::Ruby,
            button_mode: 1,
            switch_on: false,
            buttons: ButtonSet::standard(),
            title,
            feed_value: TextBox::new(FEED_VALUE_X, FEED_VALUE_Y, TEXT_SENSOR, "Accessing . . ."),
            icon_caption,
            sensor_data: TextBox::new(SENSOR_DATA_X, SENSOR_DATA_Y, TEXT_SENSOR, "Data View"),
            last_feed_id: None,
            held: None,
            dirty: true,
        };
        panel.switch_view(View::Handheld);
        panel.set_switch(false);
        panel
    }

    /// Show `view`, hide the others, and dim the tabs of the hidden views.
    pub fn switch_view(&mut self, view: View) {
        for v in View::ALL {
            self.buttons.get_mut(v.tab()).selected = v != view;
        }
        self.view = view;
        self.dirty = true;
        info!("View{} On", view.number());
    }

    /// A finger went down at `p`.
    pub fn press(&mut self, p: Point) -> Effects {
        if self.held.is_some() {
            return Vec::new();
        }
        let Some(id) = self.buttons.hit(p, self.view) else {
            return Vec::new();
        };
        debug!("button{} pressed", id.index());

        match id {
            ButtonId::Handheld => self.select_tab(View::Handheld),
            ButtonId::Subspace => self.select_tab(View::Subspace),
            ButtonId::Sensors => self.select_tab(View::Sensors),
            ButtonId::Switch => self.toggle_switch(),
            ButtonId::Momentary => self.momentary_down(),
            ButtonId::Icon => {
                self.hold(ButtonId::Icon);
                vec![Effect::PlaySound(Sound::Beep)]
            }
            ButtonId::Sound => {
                self.hold(ButtonId::Sound);
                Vec::new()
            }
        }
    }

    /// The finger lifted. Finishes whatever `press` started.
    pub fn release(&mut self) -> Effects {
        let Some(id) = self.held.take() else {
            return Vec::new();
        };
        self.buttons.get_mut(id).selected = false;
        self.dirty = true;

        match id {
            ButtonId::Momentary => {
                info!("Button released");
                Vec::new()
            }
            ButtonId::Icon => {
                info!("Icon Button Pressed");
                self.icon = self.icon.next();
                self.icon_caption.wrap(
                    ICON_CAPTION_Y,
                    &format!(
                        "Every time you tap the Icon button the icon image will change. Say hi to {}!",
                        self.icon.name()
                    ),
                    CAPTION_WRAP,
                );
                vec![Effect::SetImage {
                    slot: ImageSlot::Icon,
                    path: self.icon.image_path(),
                }]
            }
            ButtonId::Sound => {
                info!("Sound Button Pressed");
                vec![Effect::PlaySound(Sound::Demo)]
            }
            _ => Vec::new(),
        }
    }

    pub fn is_holding(&self) -> Option<ButtonId> {
        self.held
    }

    pub fn apply_reading(&mut self, snapshot: &SensorSnapshot) {
        let text = snapshot.readout();
        if self.sensor_data.text() != text {
            self.sensor_data.set_text(&text);
            if self.view == View::Sensors {
                self.dirty = true;
            }
        }
    }

    /// Show the record's value. Returns true when it is a new record.
    pub fn apply_feed(&mut self, record: &FeedRecord) -> bool {
        if self.feed_value.text() != record.value {
            self.feed_value.set_text(&record.value);
            if self.view == View::Handheld {
                self.dirty = true;
            }
        }
        if self.last_feed_id.as_deref() == Some(record.id.as_str()) {
            return false;
        }
        info!("New value: {}", record.value);
        self.last_feed_id = Some(record.id.clone());
        true
    }

    fn select_tab(&mut self, view: View) -> Effects {
        if self.view == view {
            return Vec::new();
        }
        let mut effects = vec![Effect::PlaySound(Sound::Tab)];
        self.switch_view(view);
        if view == View::Subspace {
            effects.push(Effect::SetImage {
                slot: ImageSlot::Icon,
                path: SUBSPACE_GRAPHIC.to_string(),
            });
        }
        effects.push(Effect::SetLed(view.led()));
        effects
    }

    fn toggle_switch(&mut self) -> Effects {
        let on = !self.switch_on;
        self.set_switch(on);
        info!("Swich {}", if on { "ON" } else { "OFF" });
        vec![
            Effect::PlaySound(Sound::Beep),
            Effect::SetLed(if on { Rgb::WHITE } else { Rgb::BLACK }),
        ]
    }

    fn momentary_down(&mut self) -> Effects {
        self.hold(ButtonId::Momentary);
        info!("Button Pressed");
        self.button_mode = number_up(self.button_mode, 5);
        self.set_switch(true);
        vec![
            Effect::PlaySound(Sound::Beep),
            Effect::SetLed(mode_color(self.button_mode)),
        ]
    }

    fn set_switch(&mut self, on: bool) {
        self.switch_on = on;
        let b = self.buttons.get_mut(ButtonId::Switch);
        b.label = if on { "ON" } else { "OFF" }.to_string();
        // An "off" switch is drawn in its selected (dimmed) colours.
        b.selected = !on;
        self.dirty = true;
    }

    fn hold(&mut self, id: ButtonId) {
        self.buttons.get_mut(id).selected = true;
        self.held = Some(id);
        self.dirty = true;
    }
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAB2: Point = Point::new(150, 20);
    const TAB3: Point = Point::new(250, 20);
    const ICON: Point = Point::new(170, 75);

    #[test]
    fn number_up_wraps() {
        assert_eq!(number_up(1, 3), 2);
        assert_eq!(number_up(3, 3), 1);
        assert_eq!(number_up(5, 5), 1);
        assert_eq!(number_up(9, 5), 1);
    }

    #[test]
    fn startup_state() {
        let p = Panel::new();
        assert_eq!(p.view, View::Handheld);
        assert!(!p.buttons.get(ButtonId::Handheld).selected);
        assert!(p.buttons.get(ButtonId::Subspace).selected);
        assert!(p.buttons.get(ButtonId::Sensors).selected);
        assert_eq!(p.icon, Icon::Ruby);
        assert_eq!(p.button_mode, 1);
        assert!(!p.switch_on);
        assert_eq!(p.buttons.get(ButtonId::Switch).label, "OFF");
        assert!(p.buttons.get(ButtonId::Switch).selected);
        assert_eq!(p.title.lines(), ["Star Fleet Computer"]);
        assert_eq!(p.icon_caption.lines(), ["SubSpace Data"]);
        assert_eq!(p.feed_value.text(), "Accessing . . .");
        assert!(p.dirty);
    }

    #[test]
    fn switch_view_keeps_exactly_one_tab_active() {
        let mut p = Panel::new();
        for v in View::ALL {
            p.switch_view(v);
            let active: Vec<View> = View::ALL
                .into_iter()
                .filter(|t| !p.buttons.get(t.tab()).selected)
                .collect();
            assert_eq!(active, vec![v]);
        }
    }

    #[test]
    fn tab_press_switches_view_with_sound_and_led() {
        let mut p = Panel::new();
        let fx = p.press(TAB2);
        assert_eq!(
            fx,
            vec![
                Effect::PlaySound(Sound::Tab),
                Effect::SetImage {
                    slot: ImageSlot::Icon,
                    path: SUBSPACE_GRAPHIC.to_string()
                },
                Effect::SetLed(Rgb::RED),
            ]
        );
        assert_eq!(p.view, View::Subspace);
        assert!(p.release().is_empty());

        assert_eq!(
            p.press(TAB3),
            vec![Effect::PlaySound(Sound::Tab), Effect::SetLed(Rgb::BLUE)]
        );
        assert_eq!(p.view, View::Sensors);
    }

    #[test]
    fn tapping_visible_tab_does_nothing() {
        let mut p = Panel::new();
        p.dirty = false;
        assert!(p.press(Point::new(10, 10)).is_empty());
        assert!(!p.dirty);
    }

    #[test]
    fn switch_toggles_label_selection_and_led() {
        let mut p = Panel::new();
        let sw = Point::new(40, 200);
        assert_eq!(
            p.press(sw),
            vec![Effect::PlaySound(Sound::Beep), Effect::SetLed(Rgb::WHITE)]
        );
        assert!(p.switch_on);
        assert_eq!(p.buttons.get(ButtonId::Switch).label, "ON");
        assert!(!p.buttons.get(ButtonId::Switch).selected);
        p.release();

        assert_eq!(
            p.press(sw),
            vec![Effect::PlaySound(Sound::Beep), Effect::SetLed(Rgb::BLACK)]
        );
        assert!(!p.switch_on);
        assert_eq!(p.buttons.get(ButtonId::Switch).label, "OFF");
    }

    #[test]
    fn momentary_cycles_modes_and_forces_switch_on() {
        let mut p = Panel::new();
        let m = Point::new(250, 200);
        let expected = [Rgb::YELLOW, Rgb::GREEN, Rgb::BLUE, Rgb::PURPLE, Rgb::RED, Rgb::YELLOW];
        for color in expected {
            let fx = p.press(m);
            assert_eq!(fx, vec![Effect::PlaySound(Sound::Beep), Effect::SetLed(color)]);
            assert!(p.buttons.get(ButtonId::Momentary).selected);
            assert!(p.switch_on);
            assert_eq!(p.buttons.get(ButtonId::Switch).label, "ON");
            assert!(p.release().is_empty());
            assert!(!p.buttons.get(ButtonId::Momentary).selected);
        }
        assert_eq!(p.button_mode, 2);
    }

    #[test]
    fn icon_advances_on_release() {
        let mut p = Panel::new();
        p.press(TAB2);
        p.release();

        assert_eq!(p.press(ICON), vec![Effect::PlaySound(Sound::Beep)]);
        assert!(p.buttons.get(ButtonId::Icon).selected);
        assert_eq!(p.icon, Icon::Ruby);

        let fx = p.release();
        assert_eq!(p.icon, Icon::Gus);
        assert_eq!(
            fx,
            vec![Effect::SetImage {
                slot: ImageSlot::Icon,
                path: "images/Gus.bmp".to_string()
            }]
        );
        assert!(!p.buttons.get(ButtonId::Icon).selected);
        assert_eq!(p.icon_caption.lines().last().map(String::as_str), Some("Say hi to Gus!"));

        p.press(ICON);
        p.release();
        p.press(ICON);
        p.release();
        assert_eq!(p.icon, Icon::Ruby);
    }

    #[test]
    fn icon_button_is_dead_off_its_view() {
        let mut p = Panel::new();
        assert!(p.press(ICON).is_empty());
        assert!(p.release().is_empty());
        assert_eq!(p.icon, Icon::Ruby);
    }

    #[test]
    fn sound_plays_demo_on_release() {
        let mut p = Panel::new();
        p.press(TAB3);
        p.release();
        let s = Point::new(180, 190);
        assert!(p.press(s).is_empty());
        assert_eq!(p.is_holding(), Some(ButtonId::Sound));
        assert_eq!(p.release(), vec![Effect::PlaySound(Sound::Demo)]);
        assert_eq!(p.is_holding(), None);
    }

    #[test]
    fn second_press_while_holding_is_ignored() {
        let mut p = Panel::new();
        p.press(Point::new(250, 200));
        assert!(p.press(TAB2).is_empty());
        assert_eq!(p.view, View::Handheld);
    }

    #[test]
    fn feed_reports_new_ids_only() {
        let mut p = Panel::new();
        let rec = FeedRecord {
            id: "1".into(),
            value: "Engage".into(),
            created_at: None,
        };
        assert!(p.apply_feed(&rec));
        assert_eq!(p.feed_value.text(), "Engage");
        assert!(!p.apply_feed(&rec));

        let next = FeedRecord {
            id: "2".into(),
            value: "Make it so".into(),
            created_at: None,
        };
        assert!(p.apply_feed(&next));
        assert_eq!(p.feed_value.text(), "Make it so");
    }

    #[test]
    fn reading_marks_dirty_only_when_visible() {
        let mut p = Panel::new();
        p.dirty = false;
        let snap = SensorSnapshot {
            distance_cm: Some(10),
            temp_c: Some(0.0),
            light_pct: None,
        };
        p.apply_reading(&snap);
        assert!(!p.dirty);
        assert!(p.sensor_data.text().starts_with("OBJ DISTANCE:\n10 cm"));

        p.switch_view(View::Sensors);
        p.dirty = false;
        p.apply_reading(&SensorSnapshot {
            distance_cm: Some(11),
            ..snap
        });
        assert!(p.dirty);
    }
}
