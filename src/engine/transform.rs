//! World → view transform.
//!
//! ```text
//! view = T(-offset) · R_pitch · R_yaw · T(-pos) · world
//! ```
//!
//! View space looks along **+z** with **+y** up and +x to the right. Both
//! back-ends take their sine/cosine from the same table, so they differ only
//! by float rounding.

use glam::{Mat4, Vec3, Vec4};
use serde::Deserialize;

use crate::world::{Camera, math};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformBackend {
    /// Straight-line scalar arithmetic.
    #[default]
    Scalar,
    /// Four chained 4×4 matrix–vector products (SIMD through glam).
    Matrix,
}

#[derive(Clone, Copy, Debug)]
pub struct ViewTransform {
    backend: TransformBackend,
    pos: Vec3,
    offset: Vec3,
    sin_yaw: f32,
    cos_yaw: f32,
    sin_pitch: f32,
    cos_pitch: f32,
    /// T(-pos), R_yaw, R_pitch, T(-offset) in application order.
    chain: [Mat4; 4],
}

impl ViewTransform {
    pub fn new(cam: &Camera, backend: TransformBackend) -> Self {
        let (sy, cy) = (math::sine(cam.yaw()), math::cosine(cam.yaw()));
        let (sp, cp) = (math::sine(cam.pitch()), math::cosine(cam.pitch()));

        #[rustfmt::skip]
        let yaw = Mat4::from_cols_array(&[
            cy,  0.0, sy,  0.0,
            0.0, 1.0, 0.0, 0.0,
            -sy, 0.0, cy,  0.0,
            0.0, 0.0, 0.0, 1.0,
        ]);
        #[rustfmt::skip]
        let pitch = Mat4::from_cols_array(&[
            1.0, 0.0, 0.0, 0.0,
            0.0, cp,  sp,  0.0,
            0.0, -sp, cp,  0.0,
            0.0, 0.0, 0.0, 1.0,
        ]);

        Self {
            backend,
            pos: cam.pos(),
            offset: cam.offset(),
            sin_yaw: sy,
            cos_yaw: cy,
            sin_pitch: sp,
            cos_pitch: cp,
            chain: [
                Mat4::from_translation(-cam.pos()),
                yaw,
                pitch,
                Mat4::from_translation(-cam.offset()),
            ],
        }
    }

    #[inline]
    pub fn backend(&self) -> TransformBackend {
        self.backend
    }

    /// World-space eye: the camera position moved back by the view offset.
    pub fn eye(&self) -> Vec3 {
        self.pos + self.unrotate(self.offset)
    }

    /// Transform a world point into view space.
    #[inline]
    pub fn to_view(&self, p: Vec3) -> Vec3 {
        match self.backend {
            TransformBackend::Scalar => self.to_view_scalar(p),
            TransformBackend::Matrix => self.to_view_matrix(p),
        }
    }

    #[inline]
    fn to_view_scalar(&self, p: Vec3) -> Vec3 {
        self.rotate(p - self.pos) - self.offset
    }

    #[inline]
    fn to_view_matrix(&self, p: Vec3) -> Vec3 {
        let mut v = Vec4::new(p.x, p.y, p.z, 1.0);
        for m in &self.chain {
            v = *m * v;
        }
        v.truncate()
    }

    /// Rotation only; directions and normals.
    #[inline]
    pub fn rotate(&self, d: Vec3) -> Vec3 {
        let x = d.x * self.cos_yaw - d.z * self.sin_yaw;
        let z = d.x * self.sin_yaw + d.z * self.cos_yaw;
        let y = d.y * self.cos_pitch - z * self.sin_pitch;
        let z = d.y * self.sin_pitch + z * self.cos_pitch;
        Vec3::new(x, y, z)
    }

    /// Inverse of [`ViewTransform::rotate`].
    #[inline]
    pub fn unrotate(&self, v: Vec3) -> Vec3 {
        let y = v.y * self.cos_pitch + v.z * self.sin_pitch;
        let z = -v.y * self.sin_pitch + v.z * self.cos_pitch;
        let x = v.x * self.cos_yaw + z * self.sin_yaw;
        let z = -v.x * self.sin_yaw + z * self.cos_yaw;
        Vec3::new(x, y, z)
    }

    /// View space → world space.
    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.unrotate(v + self.offset) + self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        let mut cam = Camera::new(Vec3::new(300.0, 140.0, -75.0), 37.4, 90.0);
        cam.look(-12.3);
        cam.set_offset(Vec3::new(0.0, 20.0, -64.0));
        cam
    }

    #[test]
    fn backends_agree() {
        let cam = camera();
        let s = ViewTransform::new(&cam, TransformBackend::Scalar);
        let m = ViewTransform::new(&cam, TransformBackend::Matrix);
        for p in [
            Vec3::ZERO,
            Vec3::new(512.0, 0.0, 768.0),
            Vec3::new(-1024.0, 300.0, 12.5),
            Vec3::new(2560.0, -256.0, 4096.0),
        ] {
            let (a, b) = (s.to_view(p), m.to_view(p));
            let tol = 1e-5 * p.length().max(1.0) * 10.0;
            assert!((a - b).length() < tol, "{p:?}: {a:?} vs {b:?}");
        }
    }

    #[test]
    fn forward_point_lands_on_view_axis() {
        let mut cam = Camera::new(Vec3::new(10.0, 20.0, 30.0), 90.0, 90.0);
        cam.look(30.0);
        let xf = ViewTransform::new(&cam, TransformBackend::Scalar);
        let v = xf.to_view(cam.pos() + cam.forward() * 100.0);
        assert!(v.x.abs() < 1e-3 && v.y.abs() < 1e-3, "{v:?}");
        assert!((v.z - 100.0).abs() < 1e-3);
        // the camera's right maps to +x
        assert!(xf.to_view(cam.pos() + cam.right()).x > 0.99);
    }

    #[test]
    fn to_world_inverts_to_view() {
        let xf = ViewTransform::new(&camera(), TransformBackend::Scalar);
        let p = Vec3::new(123.0, -45.0, 678.0);
        assert!((xf.to_world(xf.to_view(p)) - p).length() < 1e-3);
        // the eye sits at the view-space origin
        assert!(xf.to_view(xf.eye()).length() < 1e-3);
    }
}
