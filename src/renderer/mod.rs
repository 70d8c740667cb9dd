//! Rendering abstraction layer.
//!
//! *The engine never touches a pixel buffer directly.* It clips, lights and
//! orders geometry, then hands the result to a type implementing
//! [`Renderer`]:
//!
//! * the [`software::Software`] sink fills spans into a CPU frame-buffer;
//! * the [`hardware::Hardware`] sink forwards screen polygons and 2-D quads
//!   to a [`hardware::GpuDevice`].
//!
//! The engine asks [`Renderer::path`] once per frame and produces spans or
//! screen polygons accordingly.

use smallvec::SmallVec;

use crate::{
    engine::{clip::ScreenVertex, raster::Span},
    world::{PixmapRef, Rgb, TextureBank},
};

pub mod hardware;
pub mod pixel;
pub mod software;

pub use pixel::{Argb8888, PixelFormat, Rgb565, Rgb888};

/// Internal frame-buffer pixel, **0xAARRGGBB**.
pub type Rgba = u32;

#[inline]
pub fn pack_rgb(c: Rgb) -> Rgba {
    0xFF00_0000 | (u32::from(c[0]) << 16) | (u32::from(c[1]) << 8) | u32::from(c[2])
}

/// Which representation the sink consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderPath {
    Software,
    Hardware,
}

/// What a span is filled with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpanPaint {
    /// Texels scaled by a quantised shade (255 = unchanged).
    Textured { pixmap: PixmapRef, shade: u8 },
    /// Flat, already lit colour.
    Solid(Rgb),
}

/// How a span interacts with what is already on screen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpanMode {
    /// Unconditional write; records depth.
    Fill,
    /// Write only where nearer than the recorded depth; records depth.
    DepthTest,
    /// Depth-tested blend over the frame, depth left alone. Texels with
    /// alpha 0 are skipped.
    Blend { alpha: f32 },
}

/// Screen-aligned rectangle: sky, orb glyph, popups.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenQuad {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    pub fill: QuadFill,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QuadFill {
    Colour(Rgb),
    /// Texture window `(u0, v0) .. (u1, v1)` in pixmap fractions; values
    /// past 1 repeat.
    Texture {
        pixmap: PixmapRef,
        u0: f32,
        v0: f32,
        u1: f32,
        v1: f32,
    },
}

/// A clipped, projected polygon for the hardware path.
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenPolygon {
    pub verts: SmallVec<[ScreenVertex; 8]>,
    pub pixmap: Option<PixmapRef>,
    /// Material colour for untextured parts.
    pub colour: Rgb,
    /// 1.0 = opaque.
    pub alpha: f32,
}

/// A sink that owns whatever it needs for one frame.
///
/// `end_frame` hands the finished CPU buffer to a user-supplied closure;
/// GPU sinks pass an empty slice because they never allocate one.
pub trait Renderer {
    fn path(&self) -> RenderPath;

    /// (Re)allocate internal scratch for the requested resolution and clear it.
    fn begin_frame(&mut self, width: usize, height: usize);

    fn draw_quad(&mut self, quad: &ScreenQuad, bank: &TextureBank);

    /// Software path only.
    fn draw_span(&mut self, span: &Span, paint: SpanPaint, mode: SpanMode, bank: &TextureBank);

    /// Hardware path only.
    fn draw_polygon(&mut self, poly: &ScreenPolygon, bank: &TextureBank);

    /// Finish the frame and **loan** the finished buffer to `submit`.
    ///
    /// * `submit(&[Rgba], w, h)` is run exactly once per frame.
    /// * Software caller passes `|fb, w, h| window.update_with_buffer(fb, w, h)`.
    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize);
}

/// Batch helpers layered over any [`Renderer`].
pub trait RendererExt: Renderer {
    fn draw_spans(&mut self, spans: &[Span], paint: SpanPaint, mode: SpanMode, bank: &TextureBank) {
        for s in spans {
            self.draw_span(s, paint, mode, bank);
        }
    }

    fn fill_screen(&mut self, width: usize, height: usize, colour: Rgb, bank: &TextureBank) {
        self.draw_quad(
            &ScreenQuad {
                x: 0,
                y: 0,
                w: width as i32,
                h: height as i32,
                fill: QuadFill::Colour(colour),
            },
            bank,
        );
    }
}
impl<T: Renderer + ?Sized> RendererExt for T {}

/// A host frame-buffer the software sink can present into.
pub trait FrameSink<P: PixelFormat> {
    /// Borrow the host pixels and the row stride in pixels; `None` when the
    /// buffer cannot be locked this frame.
    fn lock_frame_buffer(&mut self) -> Option<(&mut [P::Raw], usize)>;

    fn unlock_frame_buffer(&mut self);

    fn display_frame_buffer(&mut self);
}
