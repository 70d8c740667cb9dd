use glam::Vec3;

use crate::world::math;

/// Steepest allowed look angle, degrees.
pub const MAX_PITCH: f32 = 89.0;

/// Horizontal field-of-view limits, degrees.
pub const MIN_FOV: f32 = 1.0;
pub const MAX_FOV: f32 = 179.0;
const DEFAULT_FOV: f32 = 90.0;

/// `fov` pulled into `MIN_FOV ..= MAX_FOV`; non-finite input falls back to
/// 90°.
fn sane_fov(fov: f32) -> f32 {
    if fov.is_finite() {
        fov.clamp(MIN_FOV, MAX_FOV)
    } else {
        DEFAULT_FOV
    }
}

/// Player view-point in world space.
///
/// * **yaw** (turn) is a heading in degrees, 0 = looking north (+z),
///   90 = east (+x).
/// * **pitch** (look) is in degrees, positive looks up.
/// * `offset` is applied in view space after rotation (e.g. to pull the
///   eye back behind the player's own sprite).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pos: Vec3,
    yaw: f32,
    pitch: f32,
    prev_yaw: f32,
    prev_pitch: f32,
    offset: Vec3,
    fov: f32, // horizontal, degrees
}

impl Camera {
    /// Create a new camera at `pos`, facing `yaw`, with horizontal FoV `fov`
    /// (all angles in degrees). The FoV is clamped to
    /// [`MIN_FOV`]`..=`[`MAX_FOV`].
    pub fn new(pos: Vec3, yaw: f32, fov: f32) -> Self {
        let yaw = math::normalise_angle(yaw);
        Self {
            pos,
            yaw,
            pitch: 0.0,
            prev_yaw: yaw,
            prev_pitch: 0.0,
            offset: Vec3::ZERO,
            fov: sane_fov(fov),
        }
    }

    #[inline]
    pub fn pos(&self) -> Vec3 {
        self.pos
    }

    #[inline]
    pub fn set_pos(&mut self, pos: Vec3) {
        self.pos = pos;
    }

    #[inline]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    #[inline]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    #[inline]
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    #[inline]
    pub fn set_offset(&mut self, offset: Vec3) {
        self.offset = offset;
    }

    #[inline]
    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Zoom; clamped like [`Camera::new`].
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = sane_fov(fov);
    }

    /// Angles as of the last [`Camera::commit`].
    #[inline]
    pub fn prev_angles(&self) -> (f32, f32) {
        (self.prev_yaw, self.prev_pitch)
    }

    /// Signed (yaw, pitch) change since the last [`Camera::commit`], with the
    /// yaw delta folded into `(-180, 180]`.
    pub fn angle_delta(&self) -> (f32, f32) {
        let mut dy = math::normalise_angle(self.yaw - self.prev_yaw);
        if dy > 180.0 {
            dy -= 360.0;
        }
        (dy, self.pitch - self.prev_pitch)
    }

    /// Latch the current angles as "previous"; the host calls this once per
    /// frame after input has been applied.
    pub fn commit(&mut self) {
        self.prev_yaw = self.yaw;
        self.prev_pitch = self.pitch;
    }

    /*──────────────────────── derived vectors ───────────────────────*/

    /// Unit view direction.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = (math::sine(self.yaw), math::cosine(self.yaw));
        let (sp, cp) = (math::sine(self.pitch), math::cosine(self.pitch));
        Vec3::new(sy * cp, sp, cy * cp)
    }

    /// Horizontal unit vector to the camera's right.
    #[inline]
    pub fn right(&self) -> Vec3 {
        Vec3::new(math::cosine(self.yaw), 0.0, -math::sine(self.yaw))
    }

    /*──────────────────────── movement helpers ──────────────────────*/

    /// Walk `forward` units along the heading and strafe `side` units,
    /// keeping the eye height.
    pub fn step(&mut self, forward: f32, side: f32) {
        let f = Vec3::new(math::sine(self.yaw), 0.0, math::cosine(self.yaw));
        self.pos += f * forward + self.right() * side;
    }

    pub fn rise(&mut self, dy: f32) {
        self.pos.y += dy;
    }

    /// Positive = turn right (clockwise seen from above).
    pub fn turn(&mut self, delta: f32) {
        self.yaw = math::normalise_angle(self.yaw + delta);
    }

    /// Positive = look up; clamped to ±[`MAX_PITCH`].
    pub fn look(&mut self, delta: f32) {
        self.pitch = (self.pitch + delta).clamp(-MAX_PITCH, MAX_PITCH);
    }

    /*───────────────── projection / frustum helpers ─────────────────*/

    /// Pixels per view-space unit at depth 1 for viewport width `w`.
    ///
    /// ```text
    /// focal = w / (2 * tan(fov/2))
    /// ```
    #[inline]
    pub fn screen_scale(&self, w: usize) -> f32 {
        let half = self.fov * 0.5;
        (w as f32) * 0.5 * math::cosine(half) / math::sine(half)
    }
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
