//! Numeric kernel shared by the world model and the frame pipeline.
//!
//! * Angles are in **degrees** everywhere; sine/cosine come from a table with
//!   0.1° resolution so the scalar and matrix transform back-ends see the
//!   exact same coefficients.
//! * [`Plane`] stores `normal · p + offset = 0`; the positive half-space is
//!   the polygon's front.

use glam::Vec3;
use once_cell::sync::Lazy;

/// Tolerance used for every "same point" / "on the plane" comparison.
pub const EPSILON: f32 = 1e-4;

/// Table entries per degree.
const TRIG_STEPS_PER_DEG: usize = 10;
const TRIG_ENTRIES: usize = 360 * TRIG_STEPS_PER_DEG;

struct TrigTables {
    sin: Vec<f32>,
    cos: Vec<f32>,
}

static TRIG: Lazy<TrigTables> = Lazy::new(|| {
    let step = (1.0f64 / TRIG_STEPS_PER_DEG as f64).to_radians();
    let (sin, cos) = (0..TRIG_ENTRIES)
        .map(|i| {
            let (s, c) = (i as f64 * step).sin_cos();
            (s as f32, c as f32)
        })
        .unzip();
    TrigTables { sin, cos }
});

/// Wrap `deg` into `[0, 360)`.
#[inline]
pub fn normalise_angle(deg: f32) -> f32 {
    let a = deg.rem_euclid(360.0);
    // rem_euclid may round up to exactly 360 for tiny negative inputs
    if a >= 360.0 { 0.0 } else { a }
}

#[inline]
fn trig_index(deg: f32) -> usize {
    let i = (normalise_angle(deg) * TRIG_STEPS_PER_DEG as f32).round() as usize;
    i % TRIG_ENTRIES
}

/// Table-driven sine of an angle in degrees.
#[inline]
pub fn sine(deg: f32) -> f32 {
    TRIG.sin[trig_index(deg)]
}

/// Table-driven cosine of an angle in degrees.
#[inline]
pub fn cosine(deg: f32) -> f32 {
    TRIG.cos[trig_index(deg)]
}

/// Approximate square root: bit-level initial guess refined by two Newton
/// steps. Relative error stays below 1e-4 for positive finite inputs.
#[inline]
pub fn fast_sqrt(x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    let mut y = f32::from_bits((x.to_bits() >> 1) + 0x1fbd_1df5);
    y = 0.5 * (y + x / y);
    0.5 * (y + x / y)
}

/// Euclidean length using [`fast_sqrt`].
#[inline]
pub fn fast_length(v: Vec3) -> f32 {
    fast_sqrt(v.length_squared())
}

/// Plane equation `normal · p + offset = 0` with a unit normal.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    /// Plane through `a`, `b`, `c`; the normal is `(b - a) × (c - a)`.
    ///
    /// Returns `None` for collinear points.
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Option<Self> {
        let n = (b - a).cross(c - a);
        let len = n.length();
        if len < EPSILON * EPSILON {
            return None;
        }
        let normal = n / len;
        Some(Self {
            normal,
            offset: -normal.dot(a),
        })
    }

    /// Plane through a polygon outline: the first non-degenerate corner
    /// triple wins.
    pub fn from_outline(points: &[Vec3]) -> Option<Self> {
        let a = *points.first()?;
        for i in 1..points.len().saturating_sub(1) {
            if let Some(p) = Self::from_points(a, points[i], points[i + 1]) {
                return Some(p);
            }
        }
        None
    }

    /// Signed distance of `p` (positive = front).
    #[inline(always)]
    pub fn distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.offset
    }

    /// Front-side test biased so that points on the plane count as front.
    #[inline(always)]
    pub fn in_front(&self, p: Vec3) -> bool {
        self.distance(p) >= -EPSILON
    }
}

/// Component-wise equality within [`EPSILON`].
#[inline]
pub fn same_point(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() <= EPSILON
}

/*====================================================================*/
/*                                Tests                                */
/*====================================================================*/
