//! Six-plane view volume, rebuilt every frame.
//!
//! Corners are fixed in view space (near rectangle at z = 1, far rectangle
//! at z = `far`), moved to world space with the frame's transform, and each
//! plane is taken through a fixed corner triple so its normal points into
//! the volume.

use glam::Vec3;

use crate::{
    engine::{transform::ViewTransform, types::Screen},
    world::math::Plane,
};

pub const NEAR: usize = 0;
pub const FAR: usize = 1;
pub const LEFT: usize = 2;
pub const RIGHT: usize = 3;
pub const TOP: usize = 4;
pub const BOTTOM: usize = 5;

/// Corner triples per plane; `(b - a) × (c - a)` points inwards.
///
/// ```text
///  near: 0 ─ 1      far: 4 ─ 5
///        │   │           │   │
///        3 ─ 2           7 ─ 6
/// ```
const PLANE_CORNERS: [[usize; 3]; 6] = [
    [0, 2, 1], // near
    [4, 5, 6], // far
    [0, 4, 3], // left
    [1, 2, 5], // right
    [0, 1, 4], // top
    [3, 7, 2], // bottom
];

#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
    /// World-space corners, numbered as in the diagram above.
    pub corners: [Vec3; 8],
}

impl Frustum {
    /// Build the frustum for `xf` looking through a `screen` projected with
    /// `focal`, cut off at view depth `far`.
    pub fn new(xf: &ViewTransform, screen: &Screen, focal: f32, far: f32) -> Self {
        let w = screen.half_w / focal;
        let h = screen.half_h / focal;
        let near_rect = [
            Vec3::new(-w, h, 1.0),
            Vec3::new(w, h, 1.0),
            Vec3::new(w, -h, 1.0),
            Vec3::new(-w, -h, 1.0),
        ];
        let mut corners = [Vec3::ZERO; 8];
        for (i, c) in near_rect.iter().enumerate() {
            corners[i] = xf.to_world(*c);
            corners[i + 4] = xf.to_world(*c * far);
        }
        let planes = PLANE_CORNERS.map(|[a, b, c]| {
            Plane::from_points(corners[a], corners[b], corners[c]).unwrap_or_default()
        });
        Self { planes, corners }
    }

    /// Block-level cull over an axis-aligned box.
    ///
    /// The box is rejected when each of its corners is outside *some*
    /// plane, unless the near plane splits the corners. Not an exact
    /// box/frustum test: a large box hugging a frustum edge can be rejected
    /// while a sliver of it is still in view.
    pub fn cull_box(&self, min: Vec3, max: Vec3) -> bool {
        let mut near_out = 0;
        let mut all_out = true;
        for i in 0..8 {
            let p = Vec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            );
            let mut out = false;
            for (k, plane) in self.planes.iter().enumerate() {
                if plane.distance(p) < 0.0 {
                    out = true;
                    if k == NEAR {
                        near_out += 1;
                    }
                }
            }
            all_out &= out;
        }
        all_out && (near_out == 0 || near_out == 8)
    }

    /// Point inside all six planes.
    pub fn contains(&self, p: Vec3) -> bool {
        self.planes.iter().all(|pl| pl.in_front(p))
    }

    /// World-space bounding box of the frustum corners.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.corners
            .iter()
            .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), c| {
                (lo.min(*c), hi.max(*c))
            })
    }
}
