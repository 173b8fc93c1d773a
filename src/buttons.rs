//! The seven on-screen buttons and their hit testing.

use embedded_graphics::{pixelcolor::Rgb565, prelude::*, primitives::Rectangle};

use crate::layout::*;
use crate::panel::View;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    Handheld,
    Subspace,
    Sensors,
    Switch,
    Momentary,
    Icon,
    Sound,
}

impl ButtonId {
    /// Registration order, which is also hit-test priority.
    pub const ALL: [ButtonId; 7] = [
        ButtonId::Handheld,
        ButtonId::Subspace,
        ButtonId::Sensors,
        ButtonId::Switch,
        ButtonId::Momentary,
        ButtonId::Icon,
        ButtonId::Sound,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// The view a button lives on, or `None` for the always-visible tabs.
    pub fn home_view(self) -> Option<View> {
        match self {
            ButtonId::Handheld | ButtonId::Subspace | ButtonId::Sensors => None,
            ButtonId::Switch | ButtonId::Momentary => Some(View::Handheld),
            ButtonId::Icon => Some(View::Subspace),
            ButtonId::Sound => Some(View::Sensors),
        }
    }

    pub fn is_tab(self) -> bool {
        self.home_view().is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Rect,
    RoundRect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonColors {
    pub fill: Rgb565,
    pub outline: Rgb565,
    pub label: Rgb565,
    pub selected_fill: Rgb565,
    pub selected_outline: Rgb565,
    pub selected_label: Rgb565,
}

impl ButtonColors {
    pub const TAB: Self = Self {
        fill: TAB_FILL,
        outline: TAB_OUTLINE,
        label: TAB_LABEL,
        selected_fill: TAB_SELECTED_FILL,
        selected_outline: TAB_SELECTED_OUTLINE,
        selected_label: TAB_SELECTED_LABEL,
    };

    pub const ROUND: Self = Self {
        fill: ROUND_FILL,
        outline: ROUND_OUTLINE,
        label: ROUND_LABEL,
        selected_fill: ROUND_SELECTED_FILL,
        selected_outline: ROUND_SELECTED_OUTLINE,
        selected_label: ROUND_SELECTED_LABEL,
    };

    /// `(fill, outline, label)` for the given selection state.
    pub fn resolve(&self, selected: bool) -> (Rgb565, Rgb565, Rgb565) {
        if selected {
            (self.selected_fill, self.selected_outline, self.selected_label)
        } else {
            (self.fill, self.outline, self.label)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub id: ButtonId,
    pub rect: Rectangle,
    pub label: String,
    pub style: ButtonStyle,
    pub colors: ButtonColors,
    pub selected: bool,
}

impl Button {
    fn new(id: ButtonId, x: i32, y: i32, w: i32, h: i32, label: &str, style: ButtonStyle) -> Self {
        let colors = match style {
            ButtonStyle::Rect => ButtonColors::TAB,
            ButtonStyle::RoundRect => ButtonColors::ROUND,
        };
        Self {
            id,
            rect: Rectangle::new(Point::new(x, y), Size::new(w as u32, h as u32)),
            label: label.to_string(),
            style,
            colors,
            selected: false,
        }
    }

    /// Left and top edges are inside, right and bottom edges are not.
    pub fn contains(&self, p: Point) -> bool {
        self.rect.contains(p)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonSet {
    buttons: Vec<Button>,
}

impl ButtonSet {
    /// The standard panel: three tabs, two big buttons, two round buttons.
    pub fn standard() -> Self {
        use ButtonId::*;
        use ButtonStyle::*;

        let buttons = vec![
            Button::new(Handheld, 0, TABS_Y, TABS_WIDTH, TABS_HEIGHT, "HANDHELD", Rect),
            Button::new(Subspace, TABS_WIDTH, TABS_Y, TABS_WIDTH, TABS_HEIGHT, "SUBSPACE", Rect),
            Button::new(Sensors, TABS_WIDTH * 2, TABS_Y, TABS_WIDTH, TABS_HEIGHT, "SENSORS", Rect),
            Button::new(Switch, 0, BIG_BUTTON_Y, BIG_BUTTON_WIDTH, BIG_BUTTON_HEIGHT, "OFF", Rect),
            Button::new(
                Momentary,
                BIG_BUTTON_WIDTH,
                BIG_BUTTON_Y,
                BIG_BUTTON_WIDTH,
                BIG_BUTTON_HEIGHT,
                "Button",
                Rect,
            ),
            Button::new(Icon, 150, 60, BUTTON_WIDTH, BUTTON_HEIGHT, "Icon", RoundRect),
            Button::new(Sound, 150, 170, BUTTON_WIDTH, BUTTON_HEIGHT, "Sound", RoundRect),
        ];
        Self { buttons }
    }

    pub fn get(&self, id: ButtonId) -> &Button {
        &self.buttons[id.index()]
    }

    pub fn get_mut(&mut self, id: ButtonId) -> &mut Button {
        &mut self.buttons[id.index()]
    }

    /// Buttons drawn and hit-testable while `view` is active.
    pub fn visible(&self, view: View) -> impl Iterator<Item = &Button> {
        self.buttons
            .iter()
            .filter(move |b| b.id.is_tab() || b.id.home_view() == Some(view))
    }

    /// First visible button containing `p`, in registration order.
    pub fn hit(&self, p: Point, view: View) -> Option<ButtonId> {
        self.visible(view).find(|b| b.contains(p)).map(|b| b.id)
    }
}
