use glam::Vec3;

/// Constants that depend on the *frame-buffer*, not on the world.
#[derive(Clone, Copy, Debug)]
pub struct Screen {
    pub w: usize,
    pub h: usize,
    pub half_h: f32, // pre-derived for speed
    pub half_w: f32, // pre-derived for speed
}

impl Screen {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            half_w: w as f32 * 0.5,
            half_h: h as f32 * 0.5,
        }
    }
}

/// Camera state reused by every raster unit during one frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct Viewer {
    /// Pixels per view unit at depth 1.
    pub focal: f32,
    /// World-space eye position (after the view offset).
    pub eye: Vec3,
}

/// Host input sampled once per frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    /// Milliseconds since the spot was entered; drives animations.
    pub elapsed_ms: u64,
    /// Cursor position in screen pixels, when over the view.
    pub mouse: Option<(i32, i32)>,
}

/// Counters reset at the start of every frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Occupied squares and movables considered for drawing.
    pub blocks_visited: usize,
    /// Of those, rejected by the frustum test.
    pub blocks_culled: usize,
    /// Active polygons that reached the visibility test.
    pub polygons_submitted: usize,
    /// Polygons that produced at least one visible span or screen polygon.
    pub polygons_drawn: usize,
    /// Visible span pieces queued for the software flush.
    pub spans_emitted: usize,
    pub popups_drawn: usize,
}
