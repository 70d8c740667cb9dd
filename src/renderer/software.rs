//! ---------------------------------------------------------------------------
//! Software (CPU) span renderer
//!
//! * Fills an internal **0xAARRGGBB** frame-buffer one horizontal span at a
//!   time, dividing the perspective interpolants back out per pixel.
//! * Keeps a 1/z depth row per scanline so late spans (movables, the
//!   player sprite, transparent surfaces) can be tested against what the
//!   front-to-back map pass already laid down.
//! * [`Software::present`] packs into any [`PixelFormat`] on the way out.
//! ---------------------------------------------------------------------------

use std::marker::PhantomData;

use crate::{
    engine::raster::Span,
    renderer::{
        FrameSink, PixelFormat, QuadFill, RenderPath, Renderer, Rgba, ScreenPolygon, ScreenQuad,
        SpanMode, SpanPaint, pack_rgb,
        pixel::Argb8888,
    },
    world::{Pixmap, TEXELS_PER_BLOCK, TextureBank},
};

/// Span-fill renderer presenting in pixel format `P`.
pub struct Software<P: PixelFormat = Argb8888> {
    scratch: Vec<Rgba>,
    /// 1/z of the nearest opaque surface per pixel (0 = nothing yet).
    depth: Vec<f32>,
    width: usize,
    height: usize,
    clear: Rgba,
    _format: PhantomData<P>,
}

impl<P: PixelFormat> Default for Software<P> {
    fn default() -> Self {
        Self::new(0xFF_202020)
    }
}

impl<P: PixelFormat> Software<P> {
    pub fn new(clear: Rgba) -> Self {
        Self {
            scratch: Vec::new(),
            depth: Vec::new(),
            width: 0,
            height: 0,
            clear,
            _format: PhantomData,
        }
    }

    /// The finished frame, valid between `begin_frame` and the next one.
    pub fn frame(&self) -> &[Rgba] {
        &self.scratch
    }

    /// Copy the frame into `sink`: lock → stride-aware pack → unlock →
    /// display. Returns `false` when the sink refused the lock.
    pub fn present<S: FrameSink<P>>(&self, sink: &mut S) -> bool {
        let (w, h) = (self.width, self.height);
        {
            let Some((dst, stride)) = sink.lock_frame_buffer() else {
                return false;
            };
            if stride >= w {
                for (y, src_row) in self.scratch.chunks_exact(w.max(1)).take(h).enumerate() {
                    let start = y * stride;
                    let Some(dst_row) = dst.get_mut(start..start + w) else {
                        break;
                    };
                    for (d, &s) in dst_row.iter_mut().zip(src_row) {
                        *d = P::pack(s);
                    }
                }
            }
        }
        sink.unlock_frame_buffer();
        sink.display_frame_buffer();
        true
    }
}

/*──────────────────────── Renderer trait impl ────────────────────────*/
impl<P: PixelFormat> Renderer for Software<P> {
    fn path(&self) -> RenderPath {
        RenderPath::Software
    }

    fn begin_frame(&mut self, w: usize, h: usize) {
        // (re)allocate if resolution changed
        if w != self.width || h != self.height {
            self.width = w;
            self.height = h;
            self.scratch.resize(w * h, 0);
            self.depth.resize(w * h, 0.0);
        }
        self.scratch.fill(self.clear);
        self.depth.fill(0.0);
    }

    fn draw_quad(&mut self, q: &ScreenQuad, bank: &TextureBank) {
        let x0 = q.x.clamp(0, self.width as i32);
        let x1 = (q.x + q.w).clamp(0, self.width as i32);
        let y0 = q.y.clamp(0, self.height as i32);
        let y1 = (q.y + q.h).clamp(0, self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        match q.fill {
            QuadFill::Colour(c) => {
                let px = pack_rgb(c);
                for y in y0..y1 {
                    let row = y as usize * self.width;
                    self.scratch[row + x0 as usize..row + x1 as usize].fill(px);
                }
            }
            QuadFill::Texture {
                pixmap,
                u0,
                v0,
                u1,
                v1,
            } => {
                let pix = bank.pixmap(pixmap);
                let (du, dv) = ((u1 - u0) / q.w as f32, (v1 - v0) / q.h as f32);
                for y in y0..y1 {
                    let v = v0 + (y - q.y) as f32 * dv + dv * 0.5;
                    let ty = (v * pix.h as f32).floor() as i32;
                    let row = y as usize * self.width;
                    for x in x0..x1 {
                        let u = u0 + (x - q.x) as f32 * du + du * 0.5;
                        let t = pix.texel((u * pix.w as f32).floor() as i32, ty);
                        if t >> 24 != 0 {
                            self.scratch[row + x as usize] = t;
                        }
                    }
                }
            }
        }
    }

    fn draw_span(&mut self, span: &Span, paint: SpanPaint, mode: SpanMode, bank: &TextureBank) {
        if span.y < 0 || span.y as usize >= self.height || span.is_empty() {
            return;
        }
        let x0 = span.x0.max(0);
        let x1 = span.x1.min(self.width as i32);
        let row = span.y as usize * self.width;

        let mut cur = span.at(x0);
        for x in x0..x1 {
            let i = row + x as usize;
            let inv_z = cur.inv_z;
            let visible = match mode {
                SpanMode::Fill => true,
                SpanMode::DepthTest | SpanMode::Blend { .. } => inv_z >= self.depth[i],
            };
            if visible {
                let src = match paint {
                    SpanPaint::Solid(c) => Some(pack_rgb(c)),
                    SpanPaint::Textured { pixmap, shade } => {
                        let z = 1.0 / inv_z;
                        let t = sample(bank.pixmap(pixmap), cur.u_z * z, cur.v_z * z);
                        (t >> 24 != 0).then(|| shade_texel(t, shade))
                    }
                };
                if let Some(src) = src {
                    match mode {
                        SpanMode::Fill | SpanMode::DepthTest => {
                            self.scratch[i] = src;
                            self.depth[i] = inv_z;
                        }
                        SpanMode::Blend { alpha } => {
                            self.scratch[i] = blend(self.scratch[i], src, alpha);
                        }
                    }
                }
            }
            cur = cur + span.step;
        }
    }

    fn draw_polygon(&mut self, _poly: &ScreenPolygon, _bank: &TextureBank) {
        // spans only on this path
    }

    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize),
    {
        submit(&self.scratch, self.width, self.height);
    }
}

/*──────────────────────── pixel helpers ──────────────────────────────*/

/// Texel at block-space coordinates (256 texels per block edge).
#[inline(always)]
fn sample(pix: &Pixmap, u: f32, v: f32) -> Rgba {
    let tx = (u * pix.w as f32 / TEXELS_PER_BLOCK).floor() as i32;
    let ty = (v * pix.h as f32 / TEXELS_PER_BLOCK).floor() as i32;
    pix.texel(tx, ty)
}

#[inline(always)]
fn shade_texel(t: Rgba, shade: u8) -> Rgba {
    if shade == u8::MAX {
        return t | 0xFF00_0000;
    }
    let s = u32::from(shade);
    let ch = |shift: u32| (((t >> shift) & 0xFF) * s / 255) << shift;
    0xFF00_0000 | ch(16) | ch(8) | ch(0)
}

#[inline(always)]
fn blend(dst: Rgba, src: Rgba, alpha: f32) -> Rgba {
    let a = (alpha.clamp(0.0, 1.0) * 256.0) as u32;
    let ch = |shift: u32| {
        let d = (dst >> shift) & 0xFF;
        let s = (src >> shift) & 0xFF;
        ((s * a + d * (256 - a)) >> 8) << shift
    };
    0xFF00_0000 | ch(16) | ch(8) | ch(0)
}

/*──────────────────────────────── Tests ───────────────────────────────*/
