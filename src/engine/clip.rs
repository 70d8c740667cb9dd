//! Polygon clipping: the 3-D near plane before projection, the four screen
//! edges after it.
//!
//! Both are single-plane Sutherland–Hodgman passes. After projection every
//! interpolant is carried divided by z, so linear interpolation in screen
//! space stays perspective-correct.

use glam::Vec3;

use crate::{
    engine::types::Screen,
    renderer::RenderPath,
    world::{Pixmap, TEXELS_PER_BLOCK},
};

/// Polygon corner in view space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewVertex {
    pub pos: Vec3,
    pub u: f32,
    pub v: f32,
    /// Lit colour, 0–255 per channel.
    pub colour: Vec3,
}

impl ViewVertex {
    #[inline]
    pub fn lerp(&self, o: &Self, t: f32) -> Self {
        Self {
            pos: self.pos.lerp(o.pos, t),
            u: self.u + (o.u - self.u) * t,
            v: self.v + (o.v - self.v) * t,
            colour: self.colour.lerp(o.colour, t),
        }
    }
}

/// Projected corner; everything but `x`/`y` is divided by view z.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenVertex {
    pub x: f32,
    pub y: f32,
    pub inv_z: f32,
    pub u_z: f32,
    pub v_z: f32,
    pub colour_z: Vec3,
}

impl ScreenVertex {
    #[inline]
    pub fn lerp(&self, o: &Self, t: f32) -> Self {
        Self {
            x: self.x + (o.x - self.x) * t,
            y: self.y + (o.y - self.y) * t,
            inv_z: self.inv_z + (o.inv_z - self.inv_z) * t,
            u_z: self.u_z + (o.u_z - self.u_z) * t,
            v_z: self.v_z + (o.v_z - self.v_z) * t,
            colour_z: self.colour_z.lerp(o.colour_z, t),
        }
    }

    /// Undo the 1/z scaling: `(u, v, colour)`.
    #[inline]
    pub fn attributes(&self) -> (f32, f32, Vec3) {
        let z = 1.0 / self.inv_z;
        (self.u_z * z, self.v_z * z, self.colour_z * z)
    }
}

/// One Sutherland–Hodgman pass. `dist` is the signed distance to the
/// clipping edge (≥ 0 keeps), `snap` pins new vertices exactly onto it.
fn clip_pass<V: Copy>(
    input: &[V],
    out: &mut Vec<V>,
    dist: impl Fn(&V) -> f32,
    lerp: impl Fn(&V, &V, f32) -> V,
    snap: impl Fn(&mut V),
) {
    out.clear();
    let Some(mut prev) = input.last() else {
        return;
    };
    let mut d_prev = dist(prev);
    for cur in input {
        let d_cur = dist(cur);
        if (d_prev >= 0.0) != (d_cur >= 0.0) {
            let t = d_prev / (d_prev - d_cur);
            let mut v = lerp(prev, cur, t);
            snap(&mut v);
            out.push(v);
        }
        if d_cur >= 0.0 {
            out.push(*cur);
        }
        prev = cur;
        d_prev = d_cur;
    }
}

/// Clip against the view-space plane `z = near`. Fewer than three
/// surviving corners leaves `out` empty.
pub fn clip_near(input: &[ViewVertex], near: f32, out: &mut Vec<ViewVertex>) {
    clip_pass(
        input,
        out,
        |v| v.pos.z - near,
        |a, b, t| a.lerp(b, t),
        |v| v.pos.z = near,
    );
    if out.len() < 3 {
        out.clear();
    }
}

/// Rescale texture coordinates into the sink's addressing.
///
/// * Software spans address every pixmap in a fixed 256-texel block space;
///   the span filler maps that onto the pixmap's real size.
/// * Hardware textures are padded to power-of-two surfaces, so coordinates
///   shrink by `size / padded_size`.
pub fn scale_texture(verts: &mut [ViewVertex], pixmap: &Pixmap, path: RenderPath) {
    let (su, sv) = match path {
        RenderPath::Software => (TEXELS_PER_BLOCK, TEXELS_PER_BLOCK),
        RenderPath::Hardware => (
            pixmap.w as f32 / pixmap.mipmap_w() as f32,
            pixmap.h as f32 / pixmap.mipmap_h() as f32,
        ),
    };
    for v in verts {
        v.u *= su;
        v.v *= sv;
    }
}

/// Perspective projection of a corner already clipped to `z ≥ 1`.
#[inline]
pub fn project(v: &ViewVertex, screen: &Screen, focal: f32) -> ScreenVertex {
    let inv_z = 1.0 / v.pos.z;
    ScreenVertex {
        x: screen.half_w + v.pos.x * inv_z * focal,
        y: screen.half_h - v.pos.y * inv_z * focal,
        inv_z,
        u_z: v.u * inv_z,
        v_z: v.v * inv_z,
        colour_z: v.colour * inv_z,
    }
}

/// Clip `poly` in place against `[0, w] × [0, h]` (left, right, top,
/// bottom). `scratch` is reused between passes. A polygon reduced below
/// three corners comes back empty.
pub fn clip_2d(poly: &mut Vec<ScreenVertex>, scratch: &mut Vec<ScreenVertex>, w: f32, h: f32) {
    let lerp = |a: &ScreenVertex, b: &ScreenVertex, t: f32| a.lerp(b, t);

    clip_pass(poly, scratch, |v| v.x, lerp, |v| v.x = 0.0);
    std::mem::swap(poly, scratch);
    clip_pass(poly, scratch, |v| w - v.x, lerp, |v| v.x = w);
    std::mem::swap(poly, scratch);
    clip_pass(poly, scratch, |v| v.y, lerp, |v| v.y = 0.0);
    std::mem::swap(poly, scratch);
    clip_pass(poly, scratch, |v| h - v.y, lerp, |v| v.y = h);
    std::mem::swap(poly, scratch);

    if poly.len() < 3 {
        poly.clear();
    }
}
