//! Dynamic lights and the global light list.
//!
//! The list is animated by the host **between** frames and read-only while
//! a frame renders. Lighting evaluation itself lives in `engine::lighting`.

use glam::Vec3;
use smallvec::SmallVec;

use crate::world::{
    arena::{Arena, Handle},
    math,
};

/// Lights considered per lit point.
pub const MAX_CLOSEST_LIGHTS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    /// Shines along `dir` everywhere.
    Directional { dir: Vec3 },
    /// Radiates from the light position.
    Point,
    /// Point light gated by a cone around `dir`.
    Spot { dir: Vec3, cone_deg: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightStyle {
    Static,
    /// Intensity oscillates between `min` and `max` (fractions of the base
    /// intensity).
    Pulsating { min: f32, max: f32, period_ms: u32 },
    /// Direction spins once per period about the vertical axis.
    Revolving { period_ms: u32 },
    /// Direction sweeps back and forth `sweep_deg` either side of its base.
    Searching { sweep_deg: f32, period_ms: u32 },
}

/// Placement-independent light description embedded in a block template.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightTemplate {
    pub kind: LightKind,
    pub style: LightStyle,
    pub colour: Vec3,
    pub intensity: f32,
    pub radius: f32,
    pub flood: bool,
    /// Position relative to the block origin.
    pub offset: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub pos: Vec3,
    pub kind: LightKind,
    pub style: LightStyle,
    /// 0–255 per channel.
    pub colour: Vec3,
    pub intensity: f32,
    pub radius: f32,
    /// No fall-off inside the radius.
    pub flood: bool,
    /// Animated values, refreshed by [`LightList::animate`].
    pub current_intensity: f32,
    pub current_kind: LightKind,
}

impl Light {
    pub fn point(pos: Vec3, colour: Vec3, radius: f32) -> Self {
        Self::new(pos, LightKind::Point, colour, 1.0, radius)
    }

    pub fn new(pos: Vec3, kind: LightKind, colour: Vec3, intensity: f32, radius: f32) -> Self {
        Self {
            pos,
            kind,
            style: LightStyle::Static,
            colour,
            intensity,
            radius,
            flood: false,
            current_intensity: intensity,
            current_kind: kind,
        }
    }

    pub fn from_template(t: &LightTemplate, block_origin: Vec3) -> Self {
        let mut l = Self::new(block_origin + t.offset, t.kind, t.colour, t.intensity, t.radius);
        l.style = t.style;
        l.flood = t.flood;
        l
    }

    /// Refresh the animated intensity / direction for `elapsed_ms`.
    pub fn animate(&mut self, elapsed_ms: u64) {
        let phase = |period_ms: u32| -> f32 {
            if period_ms == 0 {
                0.0
            } else {
                (elapsed_ms % period_ms as u64) as f32 / period_ms as f32
            }
        };
        self.current_intensity = self.intensity;
        self.current_kind = self.kind;
        match self.style {
            LightStyle::Static => {}
            LightStyle::Pulsating { min, max, period_ms } => {
                // triangle wave min → max → min
                let t = phase(period_ms);
                let tri = if t < 0.5 { t * 2.0 } else { 2.0 - t * 2.0 };
                self.current_intensity = self.intensity * (min + (max - min) * tri);
            }
            LightStyle::Revolving { period_ms } => {
                self.current_kind = rotate_kind(self.kind, phase(period_ms) * 360.0);
            }
            LightStyle::Searching {
                sweep_deg,
                period_ms,
            } => {
                let t = phase(period_ms);
                let tri = if t < 0.5 { t * 4.0 - 1.0 } else { 3.0 - t * 4.0 };
                self.current_kind = rotate_kind(self.kind, tri * sweep_deg);
            }
        }
    }
}

fn rotate_kind(kind: LightKind, deg: f32) -> LightKind {
    let rot = |d: Vec3| {
        let (s, c) = (math::sine(deg), math::cosine(deg));
        Vec3::new(d.x * c + d.z * s, d.y, -d.x * s + d.z * c)
    };
    match kind {
        LightKind::Directional { dir } => LightKind::Directional { dir: rot(dir) },
        LightKind::Spot { dir, cone_deg } => LightKind::Spot {
            dir: rot(dir),
            cone_deg,
        },
        LightKind::Point => LightKind::Point,
    }
}

pub type LightHandle = Handle<Light>;

/// Global list of dynamic lights, in insertion order.
///
/// Arena slots are recycled, so `order` keeps the insertion sequence that
/// iteration and distance ties follow.
#[derive(Default)]
pub struct LightList {
    lights: Arena<Light>,
    order: Vec<LightHandle>,
}

impl LightList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, light: Light) -> LightHandle {
        let h = self.lights.acquire(light);
        self.order.push(h);
        h
    }

    pub fn remove(&mut self, h: LightHandle) -> Option<Light> {
        let light = self.lights.release(h)?;
        self.order.retain(|&o| o != h);
        Some(light)
    }

    pub fn get(&self, h: LightHandle) -> Option<&Light> {
        self.lights.get(h)
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Live lights, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (LightHandle, &Light)> + '_ {
        self.order
            .iter()
            .filter_map(|&h| self.lights.get(h).map(|l| (h, l)))
    }

    /// Advance every animated light. Call between frames only.
    pub fn animate(&mut self, elapsed_ms: u64) {
        for (_, l) in self.lights.iter_mut() {
            l.animate(elapsed_ms);
        }
    }

    /// Up to [`MAX_CLOSEST_LIGHTS`] lights nearest to `p`, ascending by
    /// squared distance; equal distances keep list order.
    pub fn find_closest_lights(&self, p: Vec3) -> SmallVec<[&Light; MAX_CLOSEST_LIGHTS]> {
        let mut best: SmallVec<[(f32, &Light); MAX_CLOSEST_LIGHTS]> = SmallVec::new();
        for (_, light) in self.iter() {
            let d2 = (light.pos - p).length_squared();
            // first slot strictly farther than this light; ties stay behind
            let at = best
                .iter()
                .position(|(bd, _)| d2 < *bd)
                .unwrap_or(best.len());
            if at >= MAX_CLOSEST_LIGHTS {
                continue;
            }
            if best.len() == MAX_CLOSEST_LIGHTS {
                best.pop();
            }
            best.insert(at, (d2, light));
        }
        best.into_iter().map(|(_, l)| l).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(xs: &[f32]) -> LightList {
        let mut ll = LightList::new();
        for &x in xs {
            ll.add(Light::point(Vec3::new(x, 0.0, 0.0), Vec3::splat(255.0), 1000.0));
        }
        ll
    }

    #[test]
    fn closest_lights_sorted_and_capped() {
        let ll = list(&[50.0, -10.0, 30.0, 5.0, 400.0]);
        let got: Vec<f32> = ll
            .find_closest_lights(Vec3::ZERO)
            .iter()
            .map(|l| l.pos.x)
            .collect();
        assert_eq!(got, vec![5.0, -10.0, 30.0]);
    }

    #[test]
    fn fewer_lights_than_slots_uses_all() {
        let ll = list(&[7.0, 3.0]);
        let got: Vec<f32> = ll
            .find_closest_lights(Vec3::ZERO)
            .iter()
            .map(|l| l.pos.x)
            .collect();
        assert_eq!(got, vec![3.0, 7.0]);
    }

    #[test]
    fn ties_keep_list_order_and_are_repeatable() {
        let ll = list(&[10.0, -10.0, 10.0, -10.0]);
        let first: Vec<*const Light> = ll
            .find_closest_lights(Vec3::ZERO)
            .iter()
            .map(|l| *l as *const Light)
            .collect();
        let again: Vec<*const Light> = ll
            .find_closest_lights(Vec3::ZERO)
            .iter()
            .map(|l| *l as *const Light)
            .collect();
        assert_eq!(first, again);
        let xs: Vec<f32> = ll
            .find_closest_lights(Vec3::ZERO)
            .iter()
            .map(|l| l.pos.x)
            .collect();
        assert_eq!(xs, vec![10.0, -10.0, 10.0]);
    }

    #[test]
    fn recycled_slot_goes_to_the_back_of_the_order() {
        let mut ll = LightList::new();
        let at = |v: Vec3| Light::point(v, Vec3::splat(255.0), 1000.0);
        let first = ll.add(at(Vec3::new(10.0, 0.0, 0.0)));
        ll.add(at(Vec3::new(-10.0, 0.0, 0.0)));
        ll.add(at(Vec3::new(0.0, 10.0, 0.0)));
        assert!(ll.remove(first).is_some());
        assert!(ll.remove(first).is_none());
        ll.add(at(Vec3::new(0.0, 0.0, 10.0)));

        let closest: Vec<Vec3> = ll
            .find_closest_lights(Vec3::ZERO)
            .iter()
            .map(|l| l.pos)
            .collect();
        let expected = vec![
            Vec3::new(-10.0, 0.0, 0.0),
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::new(0.0, 0.0, 10.0),
        ];
        assert_eq!(closest, expected);
        let listed: Vec<Vec3> = ll.iter().map(|(_, l)| l.pos).collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn pulsating_light_peaks_mid_period() {
        let mut l = Light::point(Vec3::ZERO, Vec3::ONE, 10.0);
        l.style = LightStyle::Pulsating {
            min: 0.2,
            max: 1.0,
            period_ms: 1000,
        };
        l.animate(0);
        assert!((l.current_intensity - 0.2).abs() < 1e-6);
        l.animate(500);
        assert!((l.current_intensity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn revolving_spot_turns_quarter() {
        let mut l = Light::new(
            Vec3::ZERO,
            LightKind::Spot {
                dir: Vec3::Z,
                cone_deg: 30.0,
            },
            Vec3::ONE,
            1.0,
            100.0,
        );
        l.style = LightStyle::Revolving { period_ms: 400 };
        l.animate(100);
        match l.current_kind {
            LightKind::Spot { dir, .. } => assert!((dir - Vec3::X).length() < 1e-5),
            _ => panic!("kind changed"),
        }
    }
}
