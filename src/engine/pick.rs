//! Mouse picking.
//!
//! Candidates are offered in render order; the first one under the cursor
//! that passes the interactivity gate latches the selection for the rest of
//! the frame.

use crate::{
    engine::clip::ScreenVertex,
    world::{PolygonId, SquareCoord, map::MovableHandle, popup::PopupHandle},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickTarget {
    Square(SquareCoord),
    Movable(MovableHandle),
    Player,
    Popup(PopupHandle),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub target: PickTarget,
    /// The polygon hit, for block targets.
    pub polygon: Option<PolygonId>,
}

#[derive(Clone, Debug, Default)]
pub struct Picker {
    /// Cursor pixel centre.
    cursor: Option<(f32, f32)>,
    found_selection: bool,
    selection: Option<Selection>,
}

impl Picker {
    pub fn reset(&mut self, mouse: Option<(i32, i32)>) {
        self.cursor = mouse.map(|(x, y)| (x as f32 + 0.5, y as f32 + 0.5));
        self.found_selection = false;
        self.selection = None;
    }

    /// Still looking for a hit this frame.
    #[inline]
    pub fn searching(&self) -> bool {
        self.cursor.is_some() && !self.found_selection
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Offer a clipped screen polygon. `passes` is the interactivity gate:
    /// see-through surfaces only count when they lead somewhere.
    pub fn offer_polygon(
        &mut self,
        verts: &[ScreenVertex],
        target: PickTarget,
        polygon: PolygonId,
        passes: bool,
    ) -> bool {
        let Some((px, py)) = self.cursor else {
            return false;
        };
        if self.found_selection || !passes || !point_in_convex(verts, px, py) {
            return false;
        }
        self.latch(Selection {
            target,
            polygon: Some(polygon),
        })
    }

    /// Offer a screen rectangle `(x, y, w, h)`.
    pub fn offer_rect(&mut self, (x, y, w, h): (i32, i32, i32, i32), target: PickTarget) -> bool {
        let Some((px, py)) = self.cursor else {
            return false;
        };
        let inside = px >= x as f32
            && px < (x + w) as f32
            && py >= y as f32
            && py < (y + h) as f32;
        if self.found_selection || !inside {
            return false;
        }
        self.latch(Selection {
            target,
            polygon: None,
        })
    }

    fn latch(&mut self, s: Selection) -> bool {
        self.found_selection = true;
        self.selection = Some(s);
        true
    }
}

/// Convex polygon of either winding contains `(px, py)`.
fn point_in_convex(verts: &[ScreenVertex], px: f32, py: f32) -> bool {
    if verts.len() < 3 {
        return false;
    }
    let (mut pos, mut neg) = (false, false);
    let mut prev = &verts[verts.len() - 1];
    for v in verts {
        let cross = (v.x - prev.x) * (py - prev.y) - (v.y - prev.y) * (px - prev.x);
        if cross > 0.0 {
            pos = true;
        } else if cross < 0.0 {
            neg = true;
        }
        if pos && neg {
            return false;
        }
        prev = v;
    }
    pos || neg
}
