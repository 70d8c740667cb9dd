// Format-agnostic repository of textures handed over by the image decoder.
// The renderer and world logic interact through `TextureId` / `PixmapRef` only.

use std::collections::HashMap;

/// Runtime handle for a texture in this bank.
///
/// *Guaranteed* to remain stable for the lifetime of the bank.
pub type TextureId = u16;

/// `TextureId` whose pixels are the checkerboard fallback.
/// Always = 0 because `TextureBank::new()` inserts it first.
pub const NO_TEXTURE: TextureId = 0;

/// Texel count along the edge of one block face in software addressing.
pub const TEXELS_PER_BLOCK: f32 = 256.0;

/// Edge lengths a pixmap may be classified into, largest first.
pub const SIZE_CLASSES: [usize; 5] = [256, 128, 64, 32, 16];

/// One animation frame, 32-bit **ARGB** (0xAARRGGBB) in row-major order.
/// Texels with alpha 0 are see-through.
#[derive(Clone, Debug, PartialEq)]
pub struct Pixmap {
    pub w: usize,
    pub h: usize,
    pub pixels: Vec<u32>,
    transparent: bool,
}

impl Pixmap {
    /// Both edges must be non-zero and `pixels` must hold exactly `w * h`
    /// texels, otherwise texel fetches would divide by zero or index past
    /// the end.
    pub fn new(w: usize, h: usize, pixels: Vec<u32>) -> Result<Self, TextureError> {
        if w == 0 || h == 0 || w > i32::MAX as usize || h > i32::MAX as usize {
            return Err(TextureError::BadSize { w, h });
        }
        if pixels.len() != w * h {
            return Err(TextureError::BadLength {
                w,
                h,
                len: pixels.len(),
            });
        }
        let transparent = pixels.iter().any(|&p| p >> 24 == 0);
        Ok(Self {
            w,
            h,
            pixels,
            transparent,
        })
    }

    /// Solid single-colour pixmap.
    pub fn filled(w: usize, h: usize, argb: u32) -> Result<Self, TextureError> {
        Self::new(w, h, vec![argb; w.saturating_mul(h)])
    }

    /// True if any texel is fully transparent.
    #[inline]
    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Smallest size class that holds the larger pixmap edge.
    pub fn size_class(&self) -> usize {
        let edge = self.w.max(self.h);
        SIZE_CLASSES
            .iter()
            .rev()
            .copied()
            .find(|&c| c >= edge)
            .unwrap_or(SIZE_CLASSES[0])
    }

    /// Edge of the power-of-two surface a GPU upload pads this pixmap into.
    #[inline]
    pub fn mipmap_w(&self) -> usize {
        self.w.next_power_of_two()
    }

    #[inline]
    pub fn mipmap_h(&self) -> usize {
        self.h.next_power_of_two()
    }

    /// Wrapped texel fetch in pixmap coordinates.
    #[inline(always)]
    pub fn texel(&self, u: i32, v: i32) -> u32 {
        let x = u.rem_euclid(self.w as i32) as usize;
        let y = v.rem_euclid(self.h as i32) as usize;
        self.pixels[y * self.w + x]
    }
}

/// Convenience checkerboard 8×8 (dark/light grey).
impl Default for Pixmap {
    fn default() -> Self {
        const LIGHT: u32 = 0xFF_A0A0A0;
        const DARK: u32 = 0xFF_505050;
        let mut pix = vec![0u32; 8 * 8];
        for y in 0..8 {
            for x in 0..8 {
                pix[y * 8 + x] = if (x ^ y) & 1 == 0 { LIGHT } else { DARK };
            }
        }
        Pixmap {
            w: 8,
            h: 8,
            pixels: pix,
            transparent: false,
        }
    }
}

/// A texture is one or more pixmaps cycled at a fixed delay.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub frames: Vec<Pixmap>,
    /// Milliseconds each frame stays on screen (0 = static).
    pub frame_ms: u32,
}

impl Texture {
    pub fn still<S: Into<String>>(name: S, pixmap: Pixmap) -> Self {
        Self {
            name: name.into(),
            frames: vec![pixmap],
            frame_ms: 0,
        }
    }

    pub fn animated<S: Into<String>>(
        name: S,
        frames: Vec<Pixmap>,
        frame_ms: u32,
    ) -> Result<Self, TextureError> {
        let name = name.into();
        if frames.is_empty() {
            return Err(TextureError::NoFrames(name));
        }
        Ok(Self {
            name,
            frames,
            frame_ms,
        })
    }

    /// Frame index on screen `elapsed_ms` after the spot started.
    #[inline]
    pub fn frame_at(&self, elapsed_ms: u64) -> usize {
        if self.frames.len() <= 1 || self.frame_ms == 0 {
            return 0;
        }
        ((elapsed_ms / self.frame_ms as u64) % self.frames.len() as u64) as usize
    }
}

/// Identifies one concrete pixmap: the key spans are batched by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixmapRef {
    pub texture: TextureId,
    pub frame: u16,
}

/// Things that can go wrong when using the bank.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    /// Attempted to insert a second texture with an existing name.
    #[error("texture name `{0}` already present in bank")]
    Duplicate(String),

    /// Requested ID is outside `0 .. bank.len()`.
    #[error("texture id {0} out of range")]
    BadId(TextureId),

    /// Animated texture built without any frame.
    #[error("texture `{0}` has no frames")]
    NoFrames(String),

    /// Pixmap with a zero (or absurdly large) edge.
    #[error("pixmap {w}×{h} has an empty or oversized edge")]
    BadSize { w: usize, h: usize },

    /// Texel buffer does not match the pixmap dimensions.
    #[error("pixmap {w}×{h} needs {} texels, got {len}", w * h)]
    BadLength { w: usize, h: usize, len: usize },
}

/// A format-agnostic cache of textures.
///
/// * Does **not** know about GIF, JPEG or ZIP archives; decoding is the loader's job.
/// * Stores exactly one copy of every name.
/// * ID **0** is always the “missing” checkerboard.
///
/// **Thread-safety:** access `TextureBank` from a single thread or wrap it
/// in `RwLock`; it is never mutated during a frame.
pub struct TextureBank {
    by_name: HashMap<String, TextureId>,
    data: Vec<Texture>,
}

impl TextureBank {
    // ---------------------------------------------------------------------
    // Constructors
    // ---------------------------------------------------------------------

    /// Create an empty bank with a mandatory *missing* texture used as
    /// fallback.  The texture is inserted under the fixed name `"MISSING"`
    /// and obtains the handle **0**.
    pub fn new(missing: Pixmap) -> Self {
        let mut by_name = HashMap::new();
        by_name.insert("MISSING".into(), NO_TEXTURE);
        Self {
            by_name,
            data: vec![Texture::still("MISSING", missing)],
        }
    }

    pub fn default_with_checker() -> Self {
        Self::new(Pixmap::default())
    }

    // ---------------------------------------------------------------------
    // Query helpers
    // ---------------------------------------------------------------------

    /// Number of textures stored (including the “missing” one).
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.len() == 1
    } // only checker

    /// Obtain the id for a *loaded* texture by name.
    pub fn id(&self, name: &str) -> Option<TextureId> {
        self.by_name.get(name).copied()
    }

    /// Fallback-safe query: unknown names resolve to the checkerboard id.
    pub fn id_or_missing(&self, name: &str) -> TextureId {
        self.id(name).unwrap_or(NO_TEXTURE)
    }

    /// Borrow a texture by id, with bounds-checking.
    pub fn texture(&self, id: TextureId) -> Result<&Texture, TextureError> {
        self.data.get(id as usize).ok_or(TextureError::BadId(id))
    }

    /// Animation frame of `id` current at `elapsed_ms`; unknown ids resolve
    /// to the checkerboard.
    pub fn current_pixmap(&self, id: TextureId, elapsed_ms: u64) -> PixmapRef {
        let id = if (id as usize) < self.data.len() {
            id
        } else {
            NO_TEXTURE
        };
        PixmapRef {
            texture: id,
            frame: self.data[id as usize].frame_at(elapsed_ms) as u16,
        }
    }

    /// Resolve a [`PixmapRef`] obtained from this bank.
    pub fn pixmap(&self, r: PixmapRef) -> &Pixmap {
        self.data
            .get(r.texture as usize)
            .and_then(|t| t.frames.get(r.frame as usize))
            .unwrap_or(&self.data[NO_TEXTURE as usize].frames[0])
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Insert a texture under its own name.
    ///
    /// * Returns the newly assigned `TextureId`.
    /// * Fails if the name already exists (`Duplicate`).
    pub fn insert(&mut self, tex: Texture) -> Result<TextureId, TextureError> {
        if self.by_name.contains_key(&tex.name) {
            return Err(TextureError::Duplicate(tex.name));
        }
        if tex.frames.is_empty() {
            return Err(TextureError::NoFrames(tex.name));
        }
        let id = self.data.len() as TextureId;
        self.by_name.insert(tex.name.clone(), id);
        self.data.push(tex);
        Ok(id)
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
