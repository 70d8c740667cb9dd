//! Light evaluation: ambient + orb + up to three nearby dynamic lights.
//!
//! All colours are 0–255 per channel and only clamped once, after the
//! master brightness has been added.

use glam::Vec3;

use crate::world::{
    Light, LightKind, LightList, Orb, Rgb,
    math::{self, EPSILON},
};

/// Everything the light model reads during a frame.
#[derive(Clone, Copy)]
pub struct Lighting<'a> {
    pub ambient: Vec3,
    /// Added to every channel before clamping.
    pub master: f32,
    pub orb: Option<&'a Orb>,
    pub lights: &'a LightList,
}

/// Scalar intensity (0‥1 times the light's animated intensity) that `light`
/// casts on a surface at `p` with unit normal `n`.
pub fn intensity(light: &Light, p: Vec3, n: Vec3) -> f32 {
    match light.current_kind {
        LightKind::Directional { dir } => {
            (-dir.normalize_or_zero().dot(n)).max(0.0) * light.current_intensity
        }
        LightKind::Point => radial(light, p, n, None),
        LightKind::Spot { dir, cone_deg } => radial(light, p, n, Some((dir, cone_deg))),
    }
}

fn radial(light: &Light, p: Vec3, n: Vec3, cone: Option<(Vec3, f32)>) -> f32 {
    let to_light = light.pos - p;
    let d = math::fast_length(to_light);
    if d >= light.radius {
        return 0.0;
    }
    let dir = if d > EPSILON { to_light / d } else { n };
    let facing = dir.dot(n);
    if facing <= 0.0 {
        return 0.0;
    }
    if let Some((axis, cone_deg)) = cone {
        // angle between the spot axis and the ray travelling to `p`
        let along = (-dir).dot(axis.normalize_or_zero());
        if along < math::cosine(cone_deg * 0.5) {
            return 0.0;
        }
    }
    let falloff = if light.flood {
        1.0
    } else {
        facing * (1.0 - d / light.radius)
    };
    falloff * light.current_intensity
}

impl Lighting<'_> {
    /// Lit colour at `p`, normal `n`, before any material colour is applied.
    pub fn light_point(&self, p: Vec3, n: Vec3) -> Vec3 {
        let mut c = self.ambient;
        if let Some(orb) = self.orb {
            c += orb.colour * (-orb.dir.normalize_or_zero().dot(n)).max(0.0);
        }
        for light in self.lights.find_closest_lights(p) {
            c += light.colour * intensity(light, p, n);
        }
        (c + Vec3::splat(self.master)).clamp(Vec3::ZERO, Vec3::splat(255.0))
    }
}

/// Quantise a lit colour to one of `levels` evenly spaced shades in
/// `0 ..= 255`; textured spans are batched by this value.
pub fn brightness_level(lit: Vec3, levels: u8) -> u8 {
    let steps = f32::from(levels.max(2) - 1);
    let mean = (lit.x + lit.y + lit.z) / (3.0 * 255.0);
    let level = (mean.clamp(0.0, 1.0) * steps).round();
    (level * 255.0 / steps).round() as u8
}

/// Modulate a material colour by a lit colour (255 = unchanged).
pub fn tint(base: Rgb, lit: Vec3) -> Rgb {
    let ch = |b: u8, l: f32| (f32::from(b) * l / 255.0).round().clamp(0.0, 255.0) as u8;
    [ch(base[0], lit.x), ch(base[1], lit.y), ch(base[2], lit.z)]
}
