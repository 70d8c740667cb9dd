//! Scan conversion of a clipped, projected convex polygon into spans.
//!
//! Two edge cursors start at the topmost corner and walk the outline in
//! opposite directions; each integer row whose pixel centre lies inside
//! the polygon yields one [`Span`]. Pixel `(x, y)` is covered when its
//! centre `(x + 0.5, y + 0.5)` is.

use std::ops::{Add, Mul, Sub};

use glam::Vec3;

use crate::{engine::clip::ScreenVertex, world::math::EPSILON};

/// Perspective-divided interpolants.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Interp {
    pub inv_z: f32,
    pub u_z: f32,
    pub v_z: f32,
    pub colour_z: Vec3,
}

impl From<&ScreenVertex> for Interp {
    fn from(v: &ScreenVertex) -> Self {
        Self {
            inv_z: v.inv_z,
            u_z: v.u_z,
            v_z: v.v_z,
            colour_z: v.colour_z,
        }
    }
}

impl Add for Interp {
    type Output = Self;
    #[inline]
    fn add(self, o: Self) -> Self {
        Self {
            inv_z: self.inv_z + o.inv_z,
            u_z: self.u_z + o.u_z,
            v_z: self.v_z + o.v_z,
            colour_z: self.colour_z + o.colour_z,
        }
    }
}

impl Sub for Interp {
    type Output = Self;
    #[inline]
    fn sub(self, o: Self) -> Self {
        Self {
            inv_z: self.inv_z - o.inv_z,
            u_z: self.u_z - o.u_z,
            v_z: self.v_z - o.v_z,
            colour_z: self.colour_z - o.colour_z,
        }
    }
}

impl Mul<f32> for Interp {
    type Output = Self;
    #[inline]
    fn mul(self, k: f32) -> Self {
        Self {
            inv_z: self.inv_z * k,
            u_z: self.u_z * k,
            v_z: self.v_z * k,
            colour_z: self.colour_z * k,
        }
    }
}

/// Horizontal pixel run `x0 .. x1` on row `y`.
///
/// Interpolants are anchored at the polygon edge (`edge_x`), so trimming
/// `x0`/`x1` later never disturbs them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    pub y: i32,
    pub x0: i32,
    pub x1: i32,
    pub edge_x: f32,
    pub start: Interp,
    /// Change per pixel along x.
    pub step: Interp,
}

impl Span {
    #[inline]
    pub fn len(&self) -> i32 {
        self.x1 - self.x0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0
    }

    /// Interpolants at the centre of pixel `x`.
    #[inline]
    pub fn at(&self, x: i32) -> Interp {
        self.start + self.step * (x as f32 + 0.5 - self.edge_x)
    }

    /// Same span limited to `x0 .. x1`.
    #[inline]
    pub fn with_range(&self, x0: i32, x1: i32) -> Self {
        Self { x0, x1, ..*self }
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        y == self.y && x >= self.x0 && x < self.x1
    }
}

/// One walking edge of the outline.
struct Chain {
    to: usize,
    dir: usize, // +1 or n-1 (mod n)
    steps: usize,
    active: bool,
    x: f32,
    dx: f32,
    a: Interp,
    da: Interp,
}

impl Chain {
    fn new(top: usize, dir: usize) -> Self {
        Self {
            to: top,
            dir,
            steps: 0,
            active: false,
            x: 0.0,
            dx: 0.0,
            a: Interp::default(),
            da: Interp::default(),
        }
    }

    /// Move onto the edge that crosses row centre `yc`; `false` once the
    /// outline is exhausted.
    fn advance_to(&mut self, verts: &[ScreenVertex], yc: f32) -> bool {
        let n = verts.len();
        while !self.active || verts[self.to].y < yc {
            if self.steps >= n {
                return false;
            }
            let from = self.to;
            self.to = (self.to + self.dir) % n;
            self.steps += 1;

            let (a, b) = (&verts[from], &verts[self.to]);
            let dy = b.y - a.y;
            if dy <= EPSILON {
                continue;
            }
            let inv_dy = 1.0 / dy;
            let pre = yc - a.y;
            self.dx = (b.x - a.x) * inv_dy;
            self.da = (Interp::from(b) - Interp::from(a)) * inv_dy;
            self.x = a.x + self.dx * pre;
            self.a = Interp::from(a) + self.da * pre;
            self.active = true;
        }
        true
    }

    #[inline]
    fn step(&mut self) {
        self.x += self.dx;
        self.a = self.a + self.da;
    }
}

/// Scan `verts` (convex, any winding, already clipped to the screen) and
/// hand every non-empty span to `emit`. Returns the number emitted.
pub fn scan_polygon(verts: &[ScreenVertex], width: i32, mut emit: impl FnMut(Span)) -> usize {
    let n = verts.len();
    if n < 3 {
        return 0;
    }
    let (mut top, mut min_y, mut max_y) = (0, f32::MAX, f32::MIN);
    for (i, v) in verts.iter().enumerate() {
        if v.y < min_y {
            min_y = v.y;
            top = i;
        }
        max_y = max_y.max(v.y);
    }
    let y_start = (min_y - 0.5).ceil() as i32;
    let y_end = (max_y - 0.5).ceil() as i32;
    if y_end <= y_start {
        return 0;
    }

    let mut left = Chain::new(top, n - 1);
    let mut right = Chain::new(top, 1);
    let mut count = 0;
    for y in y_start..y_end {
        let yc = y as f32 + 0.5;
        if !left.advance_to(verts, yc) || !right.advance_to(verts, yc) {
            break;
        }
        let (l, r) = if left.x <= right.x {
            ((left.x, left.a), (right.x, right.a))
        } else {
            ((right.x, right.a), (left.x, left.a))
        };
        let x0 = ((l.0 - 0.5).ceil() as i32).clamp(0, width);
        let x1 = ((r.0 - 0.5).ceil() as i32).clamp(0, width);
        if x1 > x0 {
            let w = r.0 - l.0;
            let step = if w > EPSILON {
                (r.1 - l.1) * (1.0 / w)
            } else {
                Interp::default()
            };
            emit(Span {
                y,
                x0,
                x1,
                edge_x: l.0,
                start: l.1,
                step,
            });
            count += 1;
        }
        left.step();
        right.step();
    }
    count
}
