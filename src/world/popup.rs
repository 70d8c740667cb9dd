//! Popups, exits and triggers.
//!
//! Templates hang off a `BlockDef`; placing the block copies them onto its
//! square so they can be removed with it.

use glam::Vec3;

use crate::world::{
    arena::Handle,
    geometry::{Rgb, UNITS_PER_BLOCK},
    texture::TextureId,
};

pub type SquareCoord = (i32, i32, i32);

/// Hyperlink followed when the player clicks or walks into it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exit {
    pub url: String,
    pub target: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TriggerKind {
    Click,
    Rollover,
    StepOn,
    Proximity { radius: f32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Trigger {
    pub kind: TriggerKind,
    /// Opaque action handed back to the host when the trigger fires.
    pub action: String,
}

/// When a popup is shown.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PopupTrigger {
    Always,
    /// While the mouse is over the owning square.
    Rollover,
    /// While the player is within `radius` units of the owning square.
    Proximity { radius: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Centre,
    /// Anchored at the mouse cursor.
    Mouse,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PopupTemplate {
    pub placement: Placement,
    pub w: u32,
    pub h: u32,
    pub texture: Option<TextureId>,
    pub colour: Rgb,
    pub trigger: PopupTrigger,
    pub exit: Option<Exit>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Popup {
    pub template: PopupTemplate,
    /// Owning square; global popups have none.
    pub square: Option<SquareCoord>,
}

pub type PopupHandle = Handle<Popup>;

impl Popup {
    pub fn global(template: PopupTemplate) -> Self {
        Self {
            template,
            square: None,
        }
    }

    /// World-space centre of the owning square.
    pub fn anchor(&self) -> Option<Vec3> {
        self.square.map(|(c, r, l)| {
            Vec3::new(c as f32, l as f32, r as f32) * UNITS_PER_BLOCK
                + Vec3::splat(UNITS_PER_BLOCK * 0.5)
        })
    }

    /// Visibility for this frame.
    ///
    /// * `player`: viewpoint position.
    /// * `rollover`: square the mouse hovered over in the previous frame.
    pub fn is_visible(&self, player: Vec3, rollover: Option<SquareCoord>) -> bool {
        match self.template.trigger {
            PopupTrigger::Always => true,
            PopupTrigger::Rollover => self.square.is_some() && self.square == rollover,
            PopupTrigger::Proximity { radius } => self
                .anchor()
                .is_none_or(|a| (a - player).length_squared() <= radius * radius),
        }
    }

    /// Offered to the mouse pick. Only popups that lead somewhere take the
    /// click, and a popup riding on the cursor would always cover it.
    pub fn is_pickable(&self) -> bool {
        self.template.exit.is_some() && self.template.placement != Placement::Mouse
    }

    /// Screen rectangle `(x, y, w, h)` for a `screen_w`×`screen_h` frame.
    pub fn screen_rect(&self, screen_w: i32, screen_h: i32, mouse: (i32, i32)) -> (i32, i32, i32, i32) {
        let (w, h) = (self.template.w as i32, self.template.h as i32);
        let (x, y) = match self.template.placement {
            Placement::TopLeft => (0, 0),
            Placement::TopRight => (screen_w - w, 0),
            Placement::BottomLeft => (0, screen_h - h),
            Placement::BottomRight => (screen_w - w, screen_h - h),
            Placement::Centre => ((screen_w - w) / 2, (screen_h - h) / 2),
            Placement::Mouse => (mouse.0, mouse.1),
        };
        (x, y, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(trigger: PopupTrigger) -> PopupTemplate {
        PopupTemplate {
            placement: Placement::BottomRight,
            w: 100,
            h: 40,
            texture: None,
            colour: [10, 20, 30],
            trigger,
            exit: None,
        }
    }

    #[test]
    fn proximity_uses_square_centre() {
        let p = Popup {
            template: template(PopupTrigger::Proximity { radius: 300.0 }),
            square: Some((0, 0, 0)),
        };
        assert!(p.is_visible(Vec3::new(128.0, 128.0, 400.0), None));
        assert!(!p.is_visible(Vec3::new(128.0, 128.0, 500.0), None));
    }

    #[test]
    fn rollover_needs_matching_square() {
        let p = Popup {
            template: template(PopupTrigger::Rollover),
            square: Some((2, 3, 0)),
        };
        assert!(!p.is_visible(Vec3::ZERO, None));
        assert!(!p.is_visible(Vec3::ZERO, Some((2, 3, 1))));
        assert!(p.is_visible(Vec3::ZERO, Some((2, 3, 0))));
    }

    #[test]
    fn placement_rectangles() {
        let p = Popup::global(template(PopupTrigger::Always));
        assert_eq!(p.screen_rect(640, 480, (0, 0)), (540, 440, 100, 40));
        assert!(p.is_visible(Vec3::splat(1e6), None));
    }

    #[test]
    fn only_linked_fixed_popups_take_the_click() {
        let mut p = Popup::global(template(PopupTrigger::Always));
        assert!(!p.is_pickable());
        p.template.exit = Some(Exit {
            url: "http://example.org/".into(),
            target: None,
        });
        assert!(p.is_pickable());
        p.template.placement = Placement::Mouse;
        assert!(!p.is_pickable());
    }
}
