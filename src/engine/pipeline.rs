//! Per-frame render state and the per-block / per-polygon pipeline:
//!
//! ```text
//! active? → facing? → view space + light → near clip → texture scale
//!         → project → screen clip → pick → spans | screen polygon
//! ```

use glam::Vec3;
use smallvec::SmallVec;

use crate::{
    config::RenderConfig,
    engine::{
        clip::{ScreenVertex, ViewVertex, clip_2d, clip_near, project, scale_texture},
        frustum::Frustum,
        lighting::{Lighting, brightness_level, tint},
        pick::{PickTarget, Picker},
        raster::scan_polygon,
        spans::{Layer, SpanBuffer},
        transform::ViewTransform,
        types::{FrameInput, FrameStats, Screen, Viewer},
    },
    error::RenderError,
    renderer::{QuadFill, RenderPath, Renderer, ScreenPolygon, ScreenQuad, SpanPaint},
    world::{
        Block, BlockType, Camera, FaceMode, Map, Orb, PolygonId, Sky, SpriteKind, SquareCoord,
        TextureBank, UNITS_PER_BLOCK,
        arena::Arena,
        bsp::visit_unordered,
        math::EPSILON,
        popup::{Popup, PopupHandle},
    },
};

/// View-space near plane.
const NEAR: f32 = 1.0;

/// Initial room per pooled list; pools grow on demand after that.
const POOL: usize = 256;

/// Borrowed world state a frame reads.
pub(crate) struct FrameEnv<'a> {
    pub lighting: Lighting<'a>,
    pub bank: &'a TextureBank,
}

/// How a block's polygons are queued and picked.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BlockTag {
    pub layer: Layer,
    pub target: PickTarget,
    /// Square carries an exit or trigger; see-through faces become pickable.
    pub interactive: bool,
}

pub(crate) struct RenderContext {
    pub screen: Screen,
    pub viewer: Viewer,
    pub xf: ViewTransform,
    pub frustum: Frustum,
    pub path: RenderPath,
    pub far: f32,
    pub elapsed_ms: u64,
    pub levels: u8,
    pub spans: SpanBuffer,
    /// Hardware path: opaque polygons in submission order.
    pub polygons: Vec<ScreenPolygon>,
    /// Hardware path: see-through polygons, drawn last and reversed.
    pub blended: Vec<ScreenPolygon>,
    pub picker: Picker,
    pub stats: FrameStats,
    view: Vec<ViewVertex>,
    clipped: Vec<ViewVertex>,
    projected: Vec<ScreenVertex>,
    scratch_2d: Vec<ScreenVertex>,
    order: [Vec<i32>; 3],
}

impl RenderContext {
    pub fn new(config: &RenderConfig) -> Result<Self, RenderError> {
        let screen = Screen::new(config.width, config.height);
        let cam = Camera::new(Vec3::ZERO, 0.0, config.fov_deg);
        let xf = ViewTransform::new(&cam, config.transform_backend);
        let focal = cam.screen_scale(screen.w);
        let frustum = Frustum::new(&xf, &screen, focal, config.far_plane);

        let mut polygons = Vec::new();
        polygons
            .try_reserve(POOL)
            .map_err(RenderError::scratch("screen polygons"))?;
        let mut blended = Vec::new();
        blended
            .try_reserve(POOL)
            .map_err(RenderError::scratch("screen polygons"))?;
        let mut view = Vec::new();
        view.try_reserve(16)
            .map_err(RenderError::scratch("vertex scratch"))?;
        let mut projected = Vec::new();
        projected
            .try_reserve(16)
            .map_err(RenderError::scratch("vertex scratch"))?;

        Ok(Self {
            screen,
            viewer: Viewer { focal, eye: xf.eye() },
            xf,
            frustum,
            path: RenderPath::Software,
            far: config.far_plane,
            elapsed_ms: 0,
            levels: config.brightness_levels,
            spans: SpanBuffer::with_capacity(screen.w, screen.h, screen.h * 4)?,
            polygons,
            blended,
            picker: Picker::default(),
            stats: FrameStats::default(),
            view,
            clipped: Vec::new(),
            projected,
            scratch_2d: Vec::new(),
            order: Default::default(),
        })
    }

    /// Reset transient state and rebuild the view for `camera`.
    pub fn begin(&mut self, camera: &Camera, path: RenderPath, input: &FrameInput) {
        self.path = path;
        self.elapsed_ms = input.elapsed_ms;
        self.xf = ViewTransform::new(camera, self.xf.backend());
        self.viewer = Viewer {
            focal: camera.screen_scale(self.screen.w),
            eye: self.xf.eye(),
        };
        self.frustum = Frustum::new(&self.xf, &self.screen, self.viewer.focal, self.far);
        self.spans.reset(self.screen.w, self.screen.h);
        self.polygons.clear();
        self.blended.clear();
        self.picker.reset(input.mouse);
        self.stats = FrameStats::default();
    }
}

/*──────────────────────────── blocks ────────────────────────────────*/

/// Queue every polygon of `block`, nearest first when it has a tree.
pub(crate) fn render_block(ctx: &mut RenderContext, env: &FrameEnv, block: &Block, tag: BlockTag) {
    let rel_eye = ctx.viewer.eye - block.origin;
    let mut draw = |id: PolygonId| render_polygon(ctx, env, block, id, rel_eye, tag);
    match &block.def.bsp {
        Some(tree) => tree.visit(&block.polygons, rel_eye, &mut draw),
        None => visit_unordered(&block.polygons, &mut draw),
    }
}

fn render_polygon(
    ctx: &mut RenderContext,
    env: &FrameEnv,
    block: &Block,
    id: PolygonId,
    rel_eye: Vec3,
    tag: BlockTag,
) {
    let poly = &block.polygons[id as usize];
    let part = block.def.part(poly.part);
    if !poly.active || poly.len() < 3 || part.faces == FaceMode::None {
        return;
    }
    ctx.stats.polygons_submitted += 1;
    if poly.plane.normal == Vec3::ZERO {
        return;
    }

    let pixmap = part
        .texture
        .map(|t| env.bank.current_pixmap(t, ctx.elapsed_ms));
    let see_through = pixmap.is_some_and(|r| env.bank.pixmap(r).is_transparent());
    let translucent = part.is_translucent();

    let facing = poly.plane.in_front(rel_eye);
    if !facing && part.faces == FaceMode::Single && !see_through && !translucent {
        return;
    }
    let normal = if facing {
        poly.plane.normal
    } else {
        -poly.plane.normal
    };

    // software lights once per polygon, hardware per corner
    let flat = (ctx.path == RenderPath::Software)
        .then(|| env.lighting.light_point(block.origin + poly.centroid, normal));

    ctx.view.clear();
    let mut behind = true;
    for d in &poly.defs {
        let world = block.world_vertex(d.vertex);
        let pos = ctx.xf.to_view(world);
        behind &= pos.z < NEAR;
        let colour = flat.unwrap_or_else(|| env.lighting.light_point(world, normal));
        ctx.view.push(ViewVertex {
            pos,
            u: d.u,
            v: d.v,
            colour,
        });
    }
    if behind {
        return;
    }

    clip_near(&ctx.view, NEAR, &mut ctx.clipped);
    if ctx.clipped.is_empty() {
        return;
    }
    if let Some(r) = pixmap {
        scale_texture(&mut ctx.clipped, env.bank.pixmap(r), ctx.path);
    }
    ctx.projected.clear();
    for v in &ctx.clipped {
        ctx.projected
            .push(project(v, &ctx.screen, ctx.viewer.focal));
    }
    let (w, h) = (ctx.screen.w as f32, ctx.screen.h as f32);
    clip_2d(&mut ctx.projected, &mut ctx.scratch_2d, w, h);
    if ctx.projected.is_empty() {
        return;
    }

    let blended = see_through || translucent;
    if ctx.picker.searching() {
        let passes = !blended || tag.interactive;
        ctx.picker
            .offer_polygon(&ctx.projected, tag.target, id, passes);
    }

    let alpha = if translucent { part.alpha } else { 1.0 };
    match ctx.path {
        RenderPath::Hardware => {
            let sp = ScreenPolygon {
                verts: ctx.projected.iter().copied().collect::<SmallVec<_>>(),
                pixmap,
                colour: part.colour,
                alpha,
            };
            if blended {
                ctx.blended.push(sp);
            } else {
                ctx.polygons.push(sp);
            }
            ctx.stats.polygons_drawn += 1;
        }
        RenderPath::Software => {
            let lit = flat.unwrap_or_default();
            let paint = match pixmap {
                Some(pixmap) => SpanPaint::Textured {
                    pixmap,
                    shade: brightness_level(lit, ctx.levels),
                },
                None => SpanPaint::Solid(tint(part.colour, lit)),
            };
            let blend = blended.then_some(alpha);
            let RenderContext {
                spans,
                projected,
                screen,
                ..
            } = ctx;
            let mut kept = 0;
            scan_polygon(projected, screen.w as i32, |s| {
                kept += spans.insert(s, paint, blend, tag.layer);
            });
            if kept > 0 {
                ctx.stats.polygons_drawn += 1;
                ctx.stats.spans_emitted += kept;
            }
        }
    }
}

/*──────────────────────────── traversal ─────────────────────────────*/

/// Indices `0 .. n` ordered outward from `centre`: centre, +1, −1, +2, …
fn outward(centre: i32, n: u32, out: &mut Vec<i32>) {
    out.clear();
    let n = n as i32;
    if n == 0 {
        return;
    }
    let c = centre.clamp(0, n - 1);
    out.push(c);
    for d in 1..n {
        let (hi, lo) = (c + d, c - d);
        if hi >= n && lo < 0 {
            break;
        }
        if hi < n {
            out.push(hi);
        }
        if lo >= 0 {
            out.push(lo);
        }
    }
}

/// Every occupied square, starting at the viewer's square and working
/// outwards level by level, row by row, column by column.
pub(crate) fn render_blocks_on_map(ctx: &mut RenderContext, env: &FrameEnv, map: &Map) {
    let (sc, sr, sl) = Map::world_to_square(ctx.viewer.eye);
    let (nc, nr, nl) = map.dims();
    let mut order = std::mem::take(&mut ctx.order);
    outward(sc, nc, &mut order[0]);
    outward(sr, nr, &mut order[1]);
    outward(sl, nl, &mut order[2]);
    let [cols, rows, levels] = &order;

    'levels: for &l in levels {
        for &r in rows {
            if ctx.path == RenderPath::Software && ctx.spans.is_full() {
                break 'levels;
            }
            for &c in cols {
                let Some(sq) = map.get_square(c, r, l) else {
                    continue;
                };
                let Some(block) = sq.block.as_ref() else {
                    continue;
                };
                ctx.stats.blocks_visited += 1;
                let (lo, hi) = block.bbox();
                if ctx.frustum.cull_box(lo, hi) {
                    ctx.stats.blocks_culled += 1;
                    continue;
                }
                let tag = BlockTag {
                    layer: Layer::Map,
                    target: PickTarget::Square((c, r, l)),
                    interactive: sq.exit.is_some() || sq.trigger.is_some(),
                };
                render_block(ctx, env, block, tag);
            }
        }
    }
    ctx.order = order;
}

/// Movable blocks whose box overlaps the view volume's box.
pub(crate) fn render_movables(ctx: &mut RenderContext, env: &FrameEnv, map: &Map) {
    let (vlo, vhi) = ctx.frustum.bounds();
    for (h, block) in map.movables() {
        ctx.stats.blocks_visited += 1;
        let (lo, hi) = block.bbox();
        let overlaps = lo.cmple(vhi).all() && hi.cmpge(vlo).all();
        if !overlaps || ctx.frustum.cull_box(lo, hi) {
            ctx.stats.blocks_culled += 1;
            continue;
        }
        let tag = BlockTag {
            layer: Layer::Late,
            target: PickTarget::Movable(h),
            interactive: false,
        };
        render_block(ctx, env, block, tag);
    }
}

/// Heading a sprite should turn to this frame; `None` for structural blocks.
pub(crate) fn sprite_heading(block: &Block, eye: Vec3, elapsed_ms: u64) -> Option<f32> {
    let BlockType::Sprite(kind) = block.def.kind else {
        return None;
    };
    Some(match kind {
        SpriteKind::Facing => {
            let e = eye - (block.origin + Vec3::splat(UNITS_PER_BLOCK * 0.5));
            (-e.x).atan2(-e.z).to_degrees()
        }
        SpriteKind::Revolving { deg_per_sec } => {
            elapsed_ms.saturating_sub(block.state.start_ms) as f32 / 1000.0 * deg_per_sec
        }
        SpriteKind::Angled { deg } => deg,
    })
}

pub(crate) fn orient_sprites<'a>(
    blocks: impl Iterator<Item = &'a mut Block>,
    eye: Vec3,
    elapsed_ms: u64,
) {
    for b in blocks {
        if let Some(deg) = sprite_heading(b, eye, elapsed_ms) {
            b.orient_sprite(deg);
        }
    }
}

/*──────────────────────────── backdrop ──────────────────────────────*/

/// Full-screen sky window: one turn of the texture spans 360° of yaw,
/// its height spans 180° of pitch.
pub(crate) fn render_sky<R: Renderer + ?Sized>(
    ctx: &RenderContext,
    renderer: &mut R,
    sky: &Sky,
    camera: &Camera,
    bank: &TextureBank,
) {
    let (w, h) = (ctx.screen.w as i32, ctx.screen.h as i32);
    let fill = match sky.texture {
        Some(t) => {
            let fov = camera.fov();
            let vfov = fov * h as f32 / w.max(1) as f32;
            let u0 = camera.yaw() / 360.0;
            let v0 = (90.0 - camera.pitch() - vfov * 0.5) / 180.0;
            QuadFill::Texture {
                pixmap: bank.current_pixmap(t, ctx.elapsed_ms),
                u0,
                v0,
                u1: u0 + fov / 360.0,
                v1: v0 + vfov / 180.0,
            }
        }
        None => QuadFill::Colour(sky.colour),
    };
    renderer.draw_quad(
        &ScreenQuad {
            x: 0,
            y: 0,
            w,
            h,
            fill,
        },
        bank,
    );
}

/// Orb glyph where its light comes from, sized by its angular diameter.
pub(crate) fn render_orb<R: Renderer + ?Sized>(
    ctx: &RenderContext,
    renderer: &mut R,
    orb: &Orb,
    camera: &Camera,
    bank: &TextureBank,
) -> bool {
    let v = ctx.xf.rotate(-orb.dir.normalize_or_zero());
    if v.z <= EPSILON {
        return false;
    }
    let sx = ctx.screen.half_w + v.x / v.z * ctx.viewer.focal;
    let sy = ctx.screen.half_h - v.y / v.z * ctx.viewer.focal;
    let size = (orb.size_deg / camera.fov() * ctx.screen.w as f32).max(1.0);
    let fill = match orb.texture {
        Some(t) => QuadFill::Texture {
            pixmap: bank.current_pixmap(t, ctx.elapsed_ms),
            u0: 0.0,
            v0: 0.0,
            u1: 1.0,
            v1: 1.0,
        },
        None => {
            let c = orb.colour.clamp(Vec3::ZERO, Vec3::splat(255.0));
            QuadFill::Colour([c.x as u8, c.y as u8, c.z as u8])
        }
    };
    renderer.draw_quad(
        &ScreenQuad {
            x: (sx - size * 0.5).round() as i32,
            y: (sy - size * 0.5).round() as i32,
            w: size.round() as i32,
            h: size.round() as i32,
            fill,
        },
        bank,
    );
    true
}

/*──────────────────────────── overlay ───────────────────────────────*/

pub(crate) fn popup_rect(ctx: &RenderContext, popup: &Popup, mouse: Option<(i32, i32)>) -> (i32, i32, i32, i32) {
    popup.screen_rect(
        ctx.screen.w as i32,
        ctx.screen.h as i32,
        mouse.unwrap_or_default(),
    )
}

pub(crate) fn render_popup<R: Renderer + ?Sized>(
    ctx: &RenderContext,
    renderer: &mut R,
    popup: &Popup,
    mouse: Option<(i32, i32)>,
    bank: &TextureBank,
) {
    let (x, y, w, h) = popup_rect(ctx, popup, mouse);
    let fill = match popup.template.texture {
        Some(t) => QuadFill::Texture {
            pixmap: bank.current_pixmap(t, ctx.elapsed_ms),
            u0: 0.0,
            v0: 0.0,
            u1: 1.0,
            v1: 1.0,
        },
        None => QuadFill::Colour(popup.template.colour),
    };
    renderer.draw_quad(&ScreenQuad { x, y, w, h, fill }, bank);
}

/// Deferred geometry: spans on the software path, polygons otherwise.
pub(crate) fn flush<R: Renderer + ?Sized>(ctx: &RenderContext, renderer: &mut R, bank: &TextureBank) {
    match ctx.path {
        RenderPath::Software => ctx.spans.flush(renderer, bank),
        RenderPath::Hardware => {
            for p in &ctx.polygons {
                renderer.draw_polygon(p, bank);
            }
            for p in ctx.blended.iter().rev() {
                renderer.draw_polygon(p, bank);
            }
        }
    }
}

/// Handles of popups shown this frame, in draw order.
pub(crate) fn visible_popups(
    popups: &Arena<Popup>,
    player: Vec3,
    rollover: Option<SquareCoord>,
    out: &mut Vec<PopupHandle>,
) {
    out.clear();
    out.extend(
        popups
            .iter()
            .filter(|(_, p)| p.is_visible(player, rollover))
            .map(|(h, _)| h),
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::world::{LightList, Part, shapes};

    fn ctx_for(camera: &Camera, path: RenderPath) -> RenderContext {
        let cfg = RenderConfig {
            width: 160,
            height: 100,
            ..RenderConfig::default()
        };
        let mut ctx = RenderContext::new(&cfg).unwrap();
        ctx.begin(camera, path, &FrameInput::default());
        ctx
    }

    fn env<'a>(lights: &'a LightList, bank: &'a TextureBank) -> FrameEnv<'a> {
        FrameEnv {
            lighting: Lighting {
                ambient: Vec3::splat(255.0),
                master: 0.0,
                orb: None,
                lights,
            },
            bank,
        }
    }

    #[test]
    fn outward_order_covers_every_index_once() {
        let mut out = Vec::new();
        outward(2, 6, &mut out);
        assert_eq!(out, vec![2, 3, 1, 4, 0, 5]);
        outward(-7, 3, &mut out);
        assert_eq!(out, vec![0, 1, 2]);
        outward(0, 0, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn cube_in_front_of_camera_draws_only_its_facing_side() {
        let lights = LightList::new();
        let bank = TextureBank::default_with_checker();
        let def = Arc::new(shapes::cube("c", Part::coloured("p", [255, 0, 0])));
        let block = Block::new(def, Vec3::new(0.0, 0.0, 512.0));
        let cam = Camera::new(Vec3::new(128.0, 128.0, 0.0), 0.0, 90.0);
        let mut ctx = ctx_for(&cam, RenderPath::Software);
        let tag = BlockTag {
            layer: Layer::Map,
            target: PickTarget::Square((0, 2, 0)),
            interactive: false,
        };
        render_block(&mut ctx, &env(&lights, &bank), &block, tag);
        assert_eq!(ctx.stats.polygons_submitted, 6);
        assert_eq!(ctx.stats.polygons_drawn, 1);
        assert!(ctx.spans.is_covered(80, 50));
        assert!(!ctx.spans.is_covered(2, 50));
    }

    #[test]
    fn hardware_path_queues_screen_polygons() {
        let lights = LightList::new();
        let bank = TextureBank::default_with_checker();
        let mut glass = Part::coloured("glass", [0, 0, 255]);
        glass.alpha = 0.5;
        let def = Arc::new(shapes::cube("c", glass));
        let block = Block::new(def, Vec3::new(0.0, 0.0, 512.0));
        let cam = Camera::new(Vec3::new(128.0, 128.0, 0.0), 0.0, 90.0);
        let mut ctx = ctx_for(&cam, RenderPath::Hardware);
        let tag = BlockTag {
            layer: Layer::Map,
            target: PickTarget::Square((0, 2, 0)),
            interactive: false,
        };
        render_block(&mut ctx, &env(&lights, &bank), &block, tag);
        // translucent: back faces are kept, all go to the blended list
        assert!(ctx.polygons.is_empty());
        assert!(ctx.blended.len() >= 2);
        assert!(ctx.blended.iter().all(|p| p.alpha == 0.5));
    }

    #[test]
    fn facing_sprite_turns_to_the_eye() {
        let def = Arc::new(shapes::sprite(
            "s",
            Part::coloured("p", [1, 1, 1]),
            SpriteKind::Facing,
        ));
        let block = Block::new(def, Vec3::ZERO);
        let south = Vec3::new(128.0, 128.0, -500.0);
        assert!(sprite_heading(&block, south, 0).unwrap().abs() < 1e-3);
        let east = Vec3::new(900.0, 128.0, 128.0);
        assert!((sprite_heading(&block, east, 0).unwrap() + 90.0).abs() < 1e-3);
    }
}
