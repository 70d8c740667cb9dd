//! Draw-call sink for an external GPU.
//!
//! The engine hands over clipped screen polygons with per-vertex lit
//! colours; this sink converts them to device vertices, uploads each pixmap
//! once and issues the draw calls. Depth ordering is left to the device.

use std::collections::HashMap;

use log::debug;

use crate::{
    engine::raster::Span,
    renderer::{
        QuadFill, RenderPath, Renderer, Rgba, ScreenPolygon, ScreenQuad, SpanMode, SpanPaint,
    },
    world::{Pixmap, PixmapRef, TextureBank},
};

/// Vertex as handed to the device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HwVertex {
    pub x: f32,
    pub y: f32,
    /// Reciprocal view depth (larger = nearer).
    pub inv_z: f32,
    pub u: f32,
    pub v: f32,
    /// RGBA, 0‥1.
    pub colour: [f32; 4],
}

/// The operations a GPU backend exposes.
pub trait GpuDevice {
    type Texture: Copy;

    fn begin_frame(&mut self, width: usize, height: usize);
    fn upload_texture(&mut self, pixmap: &Pixmap) -> Self::Texture;
    fn upload_vertices(&mut self, verts: &[HwVertex]);
    fn bind_texture(&mut self, texture: Option<Self::Texture>);
    /// Draw the uploaded vertices as a triangle fan.
    fn draw_polygon(&mut self, blend: bool);
    fn draw_2d_quad(&mut self, corners: [HwVertex; 4]);
    fn end_frame(&mut self);
}

pub struct Hardware<D: GpuDevice> {
    device: D,
    textures: HashMap<PixmapRef, D::Texture>,
    scratch: Vec<HwVertex>,
    width: usize,
    height: usize,
}

impl<D: GpuDevice> Hardware<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            textures: HashMap::new(),
            scratch: Vec::new(),
            width: 0,
            height: 0,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    fn bind(&mut self, pixmap: Option<PixmapRef>, bank: &TextureBank) {
        let tex = pixmap.map(|r| {
            *self
                .textures
                .entry(r)
                .or_insert_with(|| {
                    let pix = bank.pixmap(r);
                    debug!("uploading {}×{} pixmap {r:?}", pix.w, pix.h);
                    self.device.upload_texture(pix)
                })
        });
        self.device.bind_texture(tex);
    }
}

impl<D: GpuDevice> Renderer for Hardware<D> {
    fn path(&self) -> RenderPath {
        RenderPath::Hardware
    }

    fn begin_frame(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.device.begin_frame(width, height);
    }

    fn draw_quad(&mut self, q: &ScreenQuad, bank: &TextureBank) {
        let (x0, y0) = (q.x as f32, q.y as f32);
        let (x1, y1) = (x0 + q.w as f32, y0 + q.h as f32);
        let (pixmap, colour, (u0, v0, u1, v1)) = match q.fill {
            QuadFill::Colour(c) => (None, unit_rgb(c, 1.0), (0.0, 0.0, 0.0, 0.0)),
            QuadFill::Texture {
                pixmap,
                u0,
                v0,
                u1,
                v1,
            } => {
                let pix = bank.pixmap(pixmap);
                let su = pix.w as f32 / pix.mipmap_w() as f32;
                let sv = pix.h as f32 / pix.mipmap_h() as f32;
                (
                    Some(pixmap),
                    [1.0; 4],
                    (u0 * su, v0 * sv, u1 * su, v1 * sv),
                )
            }
        };
        let corner = |x, y, u, v| HwVertex {
            x,
            y,
            inv_z: 1.0,
            u,
            v,
            colour,
        };
        self.bind(pixmap, bank);
        self.device.draw_2d_quad([
            corner(x0, y0, u0, v0),
            corner(x1, y0, u1, v0),
            corner(x1, y1, u1, v1),
            corner(x0, y1, u0, v1),
        ]);
    }

    fn draw_span(&mut self, _span: &Span, _paint: SpanPaint, _mode: SpanMode, _bank: &TextureBank) {
        // polygons only on this path
    }

    fn draw_polygon(&mut self, poly: &ScreenPolygon, bank: &TextureBank) {
        self.scratch.clear();
        for sv in &poly.verts {
            let (u, v, lit) = sv.attributes();
            let mut rgb = (lit / 255.0).clamp(glam::Vec3::ZERO, glam::Vec3::ONE);
            if poly.pixmap.is_none() {
                rgb *= glam::Vec3::new(
                    f32::from(poly.colour[0]),
                    f32::from(poly.colour[1]),
                    f32::from(poly.colour[2]),
                ) / 255.0;
            }
            self.scratch.push(HwVertex {
                x: sv.x,
                y: sv.y,
                inv_z: sv.inv_z,
                u,
                v,
                colour: [rgb.x, rgb.y, rgb.z, poly.alpha],
            });
        }
        self.device.upload_vertices(&self.scratch);
        self.bind(poly.pixmap, bank);
        let see_through = poly
            .pixmap
            .is_some_and(|r| bank.pixmap(r).is_transparent());
        self.device.draw_polygon(see_through || poly.alpha < 1.0);
    }

    fn end_frame<F>(&mut self, submit: F)
    where
        F: FnOnce(&[Rgba], usize, usize),
    {
        self.device.end_frame();
        submit(&[], self.width, self.height);
    }
}

fn unit_rgb(c: [u8; 3], a: f32) -> [f32; 4] {
    [
        f32::from(c[0]) / 255.0,
        f32::from(c[1]) / 255.0,
        f32::from(c[2]) / 255.0,
        a,
    ]
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use smallvec::smallvec;

    use super::*;
    use crate::{engine::clip::ScreenVertex, world::Texture};

    #[derive(Default)]
    pub struct Recorder {
        pub uploads: usize,
        pub calls: Vec<String>,
        pub last_vertices: Vec<HwVertex>,
    }

    impl GpuDevice for Recorder {
        type Texture = usize;

        fn begin_frame(&mut self, w: usize, h: usize) {
            self.calls.push(format!("begin {w}x{h}"));
        }
        fn upload_texture(&mut self, _pixmap: &Pixmap) -> usize {
            self.uploads += 1;
            self.uploads
        }
        fn upload_vertices(&mut self, verts: &[HwVertex]) {
            self.last_vertices = verts.to_vec();
        }
        fn bind_texture(&mut self, texture: Option<usize>) {
            self.calls.push(format!("bind {texture:?}"));
        }
        fn draw_polygon(&mut self, blend: bool) {
            self.calls.push(format!("poly blend={blend}"));
        }
        fn draw_2d_quad(&mut self, _corners: [HwVertex; 4]) {
            self.calls.push("quad".into());
        }
        fn end_frame(&mut self) {
            self.calls.push("end".into());
        }
    }

    fn vertex(x: f32, y: f32) -> ScreenVertex {
        // z = 2, u = 0.5, lit at 255
        ScreenVertex {
            x,
            y,
            inv_z: 0.5,
            u_z: 0.25,
            v_z: 0.0,
            colour_z: Vec3::splat(127.5),
        }
    }

    #[test]
    fn polygons_upload_once_and_normalise_colour() {
        let mut bank = TextureBank::default_with_checker();
        let id = bank
            .insert(Texture::still("wall", Pixmap::filled(16, 16, 0xFF_FFFFFF).unwrap()))
            .unwrap();
        let mut hw = Hardware::new(Recorder::default());
        hw.begin_frame(64, 48);

        let mut poly = ScreenPolygon {
            verts: smallvec![vertex(0.0, 0.0), vertex(10.0, 0.0), vertex(10.0, 10.0)],
            pixmap: Some(bank.current_pixmap(id, 0)),
            colour: [255, 255, 255],
            alpha: 1.0,
        };
        hw.draw_polygon(&poly, &bank);
        hw.draw_polygon(&poly, &bank);
        assert_eq!(hw.device().uploads, 1);
        let v = hw.device().last_vertices[0];
        assert!((v.u - 0.5).abs() < 1e-6);
        assert!((v.colour[0] - 1.0).abs() < 1e-6);

        // untextured: material colour multiplies the light
        poly.pixmap = None;
        poly.colour = [255, 0, 0];
        poly.alpha = 0.5;
        hw.draw_polygon(&poly, &bank);
        let v = hw.device().last_vertices[0];
        assert_eq!(v.colour, [1.0, 0.0, 0.0, 0.5]);

        let mut frame_len = None;
        hw.end_frame(|fb, _, _| frame_len = Some(fb.len()));
        assert_eq!(frame_len, Some(0));
        let calls = &hw.device().calls;
        assert_eq!(calls.first().map(String::as_str), Some("begin 64x48"));
        assert!(calls.contains(&"poly blend=true".to_string()));
        assert_eq!(calls.last().map(String::as_str), Some("end"));
    }

    #[test]
    fn see_through_pixmaps_draw_blended() {
        let mut bank = TextureBank::default_with_checker();
        let id = bank
            .insert(Texture::still(
                "grille",
                Pixmap::new(2, 1, vec![0x00_000000, 0xFF_FFFFFF]).unwrap(),
            ))
            .unwrap();
        let mut hw = Hardware::new(Recorder::default());
        hw.begin_frame(64, 48);
        let poly = ScreenPolygon {
            verts: smallvec![vertex(0.0, 0.0), vertex(10.0, 0.0), vertex(10.0, 10.0)],
            pixmap: Some(bank.current_pixmap(id, 0)),
            colour: [255, 255, 255],
            alpha: 1.0,
        };
        hw.draw_polygon(&poly, &bank);
        assert_eq!(
            hw.device().calls.last().map(String::as_str),
            Some("poly blend=true")
        );
    }
}
